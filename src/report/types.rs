use crate::ci::BuildState;

/// Overall outcome of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No change request needed a build.
    NothingToVerify,
    /// Every build succeeded.
    Passed,
    Failed,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::NothingToVerify => write!(f, "NOTHING TO VERIFY"),
            Verdict::Passed => write!(f, "PASSED"),
            Verdict::Failed => write!(f, "FAILED"),
        }
    }
}

/// Final state of one build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Result URL, or a description of why the build has none
    pub reference: String,
    pub state: BuildState,
    /// CI page of the build result, when it was queued
    pub browse_url: Option<String>,
}

/// Complete verification report for one work item.
#[derive(Debug)]
pub struct Report {
    pub work_item: String,
    pub builds: Vec<BuildOutcome>,
    pub verdict: Verdict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::NothingToVerify.to_string(), "NOTHING TO VERIFY");
        assert_eq!(Verdict::Passed.to_string(), "PASSED");
        assert_eq!(Verdict::Failed.to_string(), "FAILED");
    }
}
