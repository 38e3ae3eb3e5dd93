use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::ci::{BranchShortName, BuildPlanClient};

/// Makes sure a source branch is registered and enabled on a plan.
pub struct BranchReconciler {
    client: Arc<dyn BuildPlanClient>,
}

impl BranchReconciler {
    pub fn new(client: Arc<dyn BuildPlanClient>) -> Self {
        Self { client }
    }

    /// Register or enable `source_branch` on `plan_key` when needed.
    ///
    /// Never fails: problems are logged and reported as `false` so the
    /// caller can carry on with its other change requests. An already
    /// enabled branch causes no write.
    #[instrument(skip(self))]
    pub async fn validate_branch(&self, plan_key: &str, source_branch: &str) -> bool {
        let branch = BranchShortName::from_source(source_branch);

        let existing = match self.client.list_branches(plan_key).await {
            Ok(branches) => branches.into_iter().find(|b| b.short_name == branch.as_str()),
            Err(e) => {
                warn!(error = %e, "could not list plan branches, assuming branch is missing");
                None
            }
        };

        match existing {
            Some(found) if found.enabled => {
                info!(branch = %branch, branch_key = %found.key, "branch already enabled");
                return true;
            }
            Some(found) => info!(branch = %branch, branch_key = %found.key, "branch disabled, enabling"),
            None => info!(branch = %branch, "branch not registered, creating"),
        }

        match self.client.create_or_enable_branch(plan_key, &branch).await {
            Ok(true) => {
                info!(branch = %branch, "branch enabled");
                true
            }
            Ok(false) => {
                warn!(branch = %branch, "branch registered but left disabled");
                false
            }
            Err(e) => {
                warn!(branch = %branch, error = %e, "failed to enable branch");
                false
            }
        }
    }
}
