use serde::Deserialize;
use std::fmt;

/// Branch name as the CI server registers it.
///
/// Plan branches cannot contain path separators, so every `/` of the
/// source branch becomes `-`. This is the only way to build one, which
/// keeps raw source branch names out of the CI client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchShortName(String);

impl BranchShortName {
    pub fn from_source(source_branch: &str) -> Self {
        Self(source_branch.replace('/', "-"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A branch registered on a build plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanBranch {
    pub short_name: String,
    /// Plan key of the branch plan (e.g. "PAY-BACK12"), used to queue builds.
    pub key: String,
    pub enabled: bool,
}

/// Observed state of a queued build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Unknown,
    /// Percentage completed, 0-100.
    InProgress(u8),
    Successful,
    Failed,
    Error,
}

impl BuildState {
    /// Terminal states end polling; no further change is expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildState::Successful | BuildState::Failed | BuildState::Error)
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildState::Unknown => write!(f, "Unknown"),
            BuildState::InProgress(pct) => write!(f, "InProgress ({}%)", pct),
            BuildState::Successful => write!(f, "Successful"),
            BuildState::Failed => write!(f, "Failed"),
            BuildState::Error => write!(f, "Error"),
        }
    }
}

/// Reference to a build handed to the CI queue.
///
/// Only `Queued` carries a pollable result URL. The other two record a
/// trigger that did not yield one and are reported as `Error` by the
/// monitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueuedBuild {
    /// Accepted by the queue; the URL points at the build result resource.
    Queued(String),
    /// The queue answered but the response could not be decoded, so the
    /// build may still be running upstream.
    Unconfirmed { plan_key: String, detail: String },
    /// The build was never queued.
    NotQueued { plan_key: String, detail: String },
}

impl QueuedBuild {
    pub fn result_url(&self) -> Option<&str> {
        match self {
            QueuedBuild::Queued(url) => Some(url),
            _ => None,
        }
    }

    /// Build result key (e.g. "PAY-BACK12-7"), the last path segment of the result URL.
    pub fn result_key(&self) -> Option<&str> {
        self.result_url()
            .and_then(|url| url.trim_end_matches('/').rsplit('/').next())
            .filter(|key| !key.is_empty())
    }
}

impl fmt::Display for QueuedBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueuedBuild::Queued(url) => f.write_str(url),
            QueuedBuild::Unconfirmed { plan_key, detail } => {
                write!(f, "{} (unconfirmed: {})", plan_key, detail)
            }
            QueuedBuild::NotQueued { plan_key, detail } => {
                write!(f, "{} (not queued: {})", plan_key, detail)
            }
        }
    }
}

// Wire schemas for the CI REST API (JSON representation).

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlanResponse {
    pub short_name: String,
}

impl PlanResponse {
    /// The server appends descriptive text after the short name; keep the first token.
    pub fn short_name_token(&self) -> Option<&str> {
        self.short_name.split_whitespace().next()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchListResponse {
    pub branches: BranchList,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchList {
    #[serde(default)]
    pub branch: Vec<BranchEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BranchEntry {
    pub short_name: String,
    pub key: String,
    #[serde(default)]
    pub enabled: bool,
}

impl From<BranchEntry> for PlanBranch {
    fn from(entry: BranchEntry) -> Self {
        PlanBranch {
            short_name: entry.short_name,
            key: entry.key,
            enabled: entry.enabled,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueResponse {
    pub link: Option<Link>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Link {
    pub href: Option<String>,
}

impl QueueResponse {
    pub fn href(&self) -> Option<&str> {
        self.link
            .as_ref()
            .and_then(|link| link.href.as_deref())
            .filter(|href| !href.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultResponse {
    pub build_state: String,
    pub life_cycle_state: Option<String>,
    pub progress: Option<Progress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Progress {
    /// Fraction of the average build duration elapsed; exceeds 1.0 on slow builds.
    pub percentage_completed: Option<f64>,
}

impl ResultResponse {
    pub fn state(&self) -> BuildState {
        match self.build_state.as_str() {
            "Successful" => BuildState::Successful,
            "Failed" => BuildState::Failed,
            _ if self.life_cycle_state.as_deref() == Some("InProgress") => {
                let fraction = self
                    .progress
                    .as_ref()
                    .and_then(|p| p.percentage_completed)
                    .unwrap_or(0.0);
                BuildState::InProgress((fraction * 100.0).clamp(0.0, 100.0).round() as u8)
            }
            _ => BuildState::Unknown,
        }
    }
}
