use serde::Deserialize;

use super::classify::ComponentCategory;

/// Lifecycle state of a change request as the source-control host reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeRequestState {
    Open,
    Merged,
    Declined,
    Superseded,
    #[serde(other)]
    Unknown,
}

/// A pull request linked to a work item.
///
/// Built once per run and not modified afterwards. Requests that could
/// not be parsed or fetched keep an empty source branch and carry the
/// `Invalid` or `Error` category.
#[derive(Debug, Clone)]
pub struct ChangeRequest {
    /// URL as linked from the work item
    pub url: String,
    /// Branch the pull request merges from (e.g. "feature/retry")
    pub source_branch: String,
    pub state: ChangeRequestState,
    /// Repository slug, matched against plan short names
    pub component: String,
    pub category: ComponentCategory,
}

/// Parsed components of a pull request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequestUrl {
    pub workspace: String,
    pub repo: String,
    pub id: u64,
}

impl ChangeRequestUrl {
    /// Path of the pull request below the REST API root.
    pub fn api_path(&self) -> String {
        format!(
            "repositories/{}/{}/pullrequests/{}",
            self.workspace, self.repo, self.id
        )
    }
}

// Wire schema of the pull request endpoint.

#[derive(Debug, Deserialize)]
pub(crate) struct PullRequestResponse {
    pub state: ChangeRequestState,
    pub source: SourceRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SourceRef {
    pub branch: BranchRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchRef {
    pub name: String,
}
