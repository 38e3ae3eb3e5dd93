use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkItemError {
    #[error("Failed to read work item manifest: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse work item manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Work item {0} is not listed in the manifest")]
    NotFound(String),
}

/// Links of one work item: its pull requests and the CI plans that build them.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkItem {
    /// Issue tracker key, e.g. "PAY-123"
    pub key: String,
    /// Pull request URLs
    #[serde(default)]
    pub change_requests: Vec<String>,
    /// Plan browse URLs (http://ci/browse/PAY-BACK) or bare plan keys
    #[serde(default)]
    pub plans: Vec<String>,
}

impl WorkItem {
    /// Plan keys in listing order, without duplicates.
    pub fn plan_keys(&self) -> Vec<String> {
        dedup(self.plans.iter().filter_map(|plan| plan_key_from_ref(plan)))
    }

    /// Pull request URLs in listing order, without duplicates.
    pub fn change_request_urls(&self) -> Vec<String> {
        dedup(
            self.change_requests
                .iter()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
        )
    }
}

/// Manifest file listing work items, e.g.
///
/// ```toml
/// [[work_item]]
/// key = "PAY-123"
/// change_requests = ["https://bitbucket.org/acme/payments-back/pull-requests/42"]
/// plans = ["http://bamboo.internal:8085/browse/PAY-BACK"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkItemManifest {
    #[serde(default, rename = "work_item")]
    pub work_items: Vec<WorkItem>,
}

impl WorkItemManifest {
    pub fn load(path: &Path) -> Result<WorkItemManifest, WorkItemError> {
        let contents = fs::read_to_string(path)?;
        let manifest = toml::from_str(&contents)?;
        Ok(manifest)
    }

    pub fn find(&self, key: &str) -> Result<&WorkItem, WorkItemError> {
        self.work_items
            .iter()
            .find(|item| item.key.eq_ignore_ascii_case(key))
            .ok_or_else(|| WorkItemError::NotFound(key.to_string()))
    }
}

/// Extract the plan key from a browse URL, or accept a bare key.
fn plan_key_from_ref(plan: &str) -> Option<String> {
    let plan = plan.trim();
    if plan.is_empty() {
        return None;
    }
    match reqwest::Url::parse(plan) {
        Ok(url) => {
            let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
            segments.find(|s| *s == "browse")?;
            segments.next().map(str::to_string)
        }
        Err(_) => Some(plan.to_string()),
    }
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}
