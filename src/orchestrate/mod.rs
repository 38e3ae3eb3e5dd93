pub mod reconcile;
pub mod trigger;

pub use reconcile::BranchReconciler;
pub use trigger::BuildTrigger;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::change::{ChangeRequest, ComponentCategory};
use crate::ci::{BranchShortName, BuildPlanClient, BuildState, QueuedBuild};
use crate::monitor::BuildMonitor;

/// A matched change request waiting to be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBuild {
    pub component: String,
    /// Plan whose short name matched the component
    pub plan_key: String,
    /// Branch plan key; `None` when the branch could not be found after reconciliation
    pub branch_key: Option<String>,
    pub source_branch: String,
    pub category: ComponentCategory,
}

/// Matches a work item's change requests to build plans and queues their builds.
pub struct CorrelationEngine {
    client: Arc<dyn BuildPlanClient>,
    reconciler: BranchReconciler,
    trigger: BuildTrigger,
}

impl CorrelationEngine {
    pub fn new(client: Arc<dyn BuildPlanClient>) -> Self {
        Self {
            reconciler: BranchReconciler::new(client.clone()),
            trigger: BuildTrigger::new(client.clone()),
            client,
        }
    }

    /// Queue one build per change request that matches a plan.
    ///
    /// Builds are queued only after every change request has been matched,
    /// in matching order. Failed triggers are returned too, so the monitor
    /// can report them. An empty result means nothing needs verifying.
    #[instrument(skip(self, changes, plan_keys), fields(changes = changes.len(), plans = plan_keys.len()))]
    pub async fn correlate(
        &self,
        work_item_key: &str,
        changes: &[ChangeRequest],
        plan_keys: &[String],
    ) -> Vec<QueuedBuild> {
        let pending = self.match_plans(changes, plan_keys).await;
        if pending.is_empty() {
            info!("no change request matched a build plan");
            return Vec::new();
        }

        let mut queued = Vec::with_capacity(pending.len());
        for build in &pending {
            queued.push(self.queue(build).await);
        }
        queued
    }

    /// Pair each buildable change request with the first plan whose short
    /// name equals its component, and get its branch ready on that plan.
    pub async fn match_plans(&self, changes: &[ChangeRequest], plan_keys: &[String]) -> Vec<PendingBuild> {
        let mut pending = Vec::new();

        for change in changes {
            if !change.category.is_buildable() {
                debug!(url = %change.url, category = %change.category, "not built");
                continue;
            }

            let Some(plan_key) = self.find_plan(&change.component, plan_keys).await else {
                info!(component = %change.component, "no plan matches component");
                continue;
            };

            self.reconciler
                .validate_branch(&plan_key, &change.source_branch)
                .await;
            let branch_key = self.branch_key(&plan_key, &change.source_branch).await;

            info!(
                component = %change.component,
                plan = %plan_key,
                branch_key = branch_key.as_deref().unwrap_or("-"),
                source_branch = %change.source_branch,
                "adding build to run list"
            );
            pending.push(PendingBuild {
                component: change.component.clone(),
                plan_key,
                branch_key,
                source_branch: change.source_branch.clone(),
                category: change.category,
            });
        }

        pending
    }

    /// First plan, in listing order, whose short name matches `component`
    /// ignoring case. Plans whose metadata cannot be fetched are skipped.
    async fn find_plan(&self, component: &str, plan_keys: &[String]) -> Option<String> {
        let component = component.to_lowercase();
        for plan_key in plan_keys {
            match self.client.fetch_plan_short_name(plan_key).await {
                Ok(short_name) if short_name.to_lowercase() == component => {
                    return Some(plan_key.clone());
                }
                Ok(short_name) => debug!(plan = %plan_key, short_name = %short_name, "plan does not match"),
                Err(e) => warn!(plan = %plan_key, error = %e, "skipping plan"),
            }
        }
        None
    }

    async fn branch_key(&self, plan_key: &str, source_branch: &str) -> Option<String> {
        let branch = BranchShortName::from_source(source_branch);
        match self.client.list_branches(plan_key).await {
            Ok(branches) => branches
                .into_iter()
                .find(|b| b.short_name == branch.as_str())
                .map(|b| b.key),
            Err(e) => {
                warn!(plan = %plan_key, error = %e, "could not resolve branch key");
                None
            }
        }
    }

    async fn queue(&self, build: &PendingBuild) -> QueuedBuild {
        info!(
            component = %build.component,
            category = %build.category,
            source_branch = %build.source_branch,
            "queueing build"
        );
        match &build.branch_key {
            Some(branch_key) => self.trigger.trigger(branch_key, &build.source_branch).await,
            None => QueuedBuild::NotQueued {
                plan_key: build.plan_key.clone(),
                detail: format!(
                    "branch {} is not registered on the plan",
                    BranchShortName::from_source(&build.source_branch)
                ),
            },
        }
    }
}

/// Correlate a work item and wait for every queued build to finish.
///
/// Returns an empty mapping, without starting a monitor, when nothing was queued.
pub async fn verify(
    client: Arc<dyn BuildPlanClient>,
    work_item_key: &str,
    changes: &[ChangeRequest],
    plan_keys: &[String],
    poll_interval: Duration,
) -> BTreeMap<QueuedBuild, BuildState> {
    let engine = CorrelationEngine::new(client.clone());
    let queued = engine.correlate(work_item_key, changes, plan_keys).await;
    if queued.is_empty() {
        return BTreeMap::new();
    }

    info!(builds = queued.len(), "monitoring queued builds");
    let mut monitor = BuildMonitor::new(client, poll_interval);
    monitor.start(queued);
    monitor.await_completion().await
}
