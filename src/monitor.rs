//! Concurrent polling of queued builds until each reaches a terminal state.
//!
//! Every build gets its own task. A task owns its build's state for its
//! whole life and hands the final state back through its join handle;
//! nothing else reads or writes it. The coordinator only assembles the
//! mapping once every task has finished.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::ci::{BuildPlanClient, BuildState, QueuedBuild};

pub struct BuildMonitor {
    client: Arc<dyn BuildPlanClient>,
    poll_interval: Duration,
    running: Vec<(QueuedBuild, JoinHandle<BuildState>)>,
}

impl BuildMonitor {
    pub fn new(client: Arc<dyn BuildPlanClient>, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
            running: Vec::new(),
        }
    }

    /// Spawn one polling task per distinct build and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self, builds: impl IntoIterator<Item = QueuedBuild>) {
        let mut seen: HashSet<QueuedBuild> = self.running.iter().map(|(b, _)| b.clone()).collect();

        for build in builds {
            if !seen.insert(build.clone()) {
                debug!(build = %build, "already monitored");
                continue;
            }
            let span = info_span!("monitor", build = %build);
            let handle = tokio::spawn(
                poll_until_terminal(self.client.clone(), build.clone(), self.poll_interval).instrument(span),
            );
            info!(build = %build, "monitoring started");
            self.running.push((build, handle));
        }
    }

    /// Wait for every polling task and return the final state of each build.
    pub async fn await_completion(self) -> BTreeMap<QueuedBuild, BuildState> {
        let mut states = BTreeMap::new();
        for (build, handle) in self.running {
            let state = match handle.await {
                Ok(state) => state,
                Err(e) => {
                    warn!(build = %build, error = %e, "polling task ended abnormally");
                    BuildState::Error
                }
            };
            states.insert(build, state);
        }
        info!(builds = states.len(), "monitoring finished");
        states
    }
}

/// Poll one build until it is Successful, Failed or Error.
///
/// A failed status fetch is final. There is no iteration limit; the CI
/// server's own build timeout bounds the wait.
async fn poll_until_terminal(
    client: Arc<dyn BuildPlanClient>,
    build: QueuedBuild,
    poll_interval: Duration,
) -> BuildState {
    let Some(result_url) = build.result_url() else {
        warn!("nothing to poll, build was not confirmed by the queue");
        return BuildState::Error;
    };

    loop {
        let state = match client.build_state(result_url).await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "status fetch failed");
                BuildState::Error
            }
        };

        if state.is_terminal() {
            info!(state = %state, "build finished");
            return state;
        }
        debug!(state = %state, "build still running");
        tokio::time::sleep(poll_interval).await;
    }
}
