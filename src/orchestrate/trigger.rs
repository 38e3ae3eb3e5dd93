use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::ci::{BranchShortName, BuildPlanClient, QueuedBuild};

/// Queues builds and turns every outcome into a `QueuedBuild`.
pub struct BuildTrigger {
    client: Arc<dyn BuildPlanClient>,
}

impl BuildTrigger {
    pub fn new(client: Arc<dyn BuildPlanClient>) -> Self {
        Self { client }
    }

    /// Queue a build of `plan_key` (a branch plan key) for `source_branch`.
    ///
    /// A response that cannot be decoded is kept apart from a rejected
    /// request: the former may still have queued a build.
    #[instrument(skip(self))]
    pub async fn trigger(&self, plan_key: &str, source_branch: &str) -> QueuedBuild {
        let branch = BranchShortName::from_source(source_branch);

        match self.client.trigger_build(plan_key, &branch).await {
            Ok(result_url) => {
                info!(result_url = %result_url, "build queued");
                QueuedBuild::Queued(result_url)
            }
            Err(e) if e.is_malformed() => {
                warn!(error = %e, "queue response unreadable, build may still be running");
                QueuedBuild::Unconfirmed {
                    plan_key: plan_key.to_string(),
                    detail: e.to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "build was not queued");
                QueuedBuild::NotQueued {
                    plan_key: plan_key.to_string(),
                    detail: e.to_string(),
                }
            }
        }
    }
}
