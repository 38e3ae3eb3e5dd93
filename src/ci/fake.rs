//! In-memory `BuildPlanClient` that records every call.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BranchShortName, BuildPlanClient, BuildState, CiError, PlanBranch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PlanShortName(String),
    ListBranches(String),
    CreateOrEnable(String, String),
    Trigger(String, String),
    BuildState(String),
}

/// Scripted reply for a status poll.
#[derive(Debug, Clone, Copy)]
pub enum Poll {
    State(BuildState),
    Fail,
}

#[derive(Default)]
struct FakeState {
    plans: HashMap<String, String>,
    branches: HashMap<String, Vec<PlanBranch>>,
    failing_enable: HashSet<String>,
    malformed_trigger: HashSet<String>,
    failing_trigger: HashSet<String>,
    polls: HashMap<String, VecDeque<Poll>>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeCiClient {
    state: Mutex<FakeState>,
}

fn not_found(url: &str) -> CiError {
    CiError::Status {
        url: url.to_string(),
        status: 404,
    }
}

impl FakeCiClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(self, plan_key: &str, short_name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .plans
            .insert(plan_key.to_string(), short_name.to_string());
        self
    }

    pub fn with_branch(self, plan_key: &str, short_name: &str, key: &str, enabled: bool) -> Self {
        self.state
            .lock()
            .unwrap()
            .branches
            .entry(plan_key.to_string())
            .or_default()
            .push(PlanBranch {
                short_name: short_name.to_string(),
                key: key.to_string(),
                enabled,
            });
        self
    }

    pub fn with_failing_enable(self, plan_key: &str) -> Self {
        self.state.lock().unwrap().failing_enable.insert(plan_key.to_string());
        self
    }

    pub fn with_malformed_trigger(self, plan_key: &str) -> Self {
        self.state.lock().unwrap().malformed_trigger.insert(plan_key.to_string());
        self
    }

    pub fn with_failing_trigger(self, plan_key: &str) -> Self {
        self.state.lock().unwrap().failing_trigger.insert(plan_key.to_string());
        self
    }

    /// Replies for successive polls of `url`; the last one repeats.
    pub fn with_polls(self, url: &str, polls: Vec<Poll>) -> Self {
        self.state
            .lock()
            .unwrap()
            .polls
            .insert(url.to_string(), polls.into());
        self
    }

    /// Result URL the fake hands out when queueing `plan_key`.
    pub fn result_url(plan_key: &str) -> String {
        format!("http://ci.test/rest/api/latest/result/{}-1", plan_key)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }
}

#[async_trait]
impl BuildPlanClient for FakeCiClient {
    async fn fetch_plan_short_name(&self, plan_key: &str) -> Result<String, CiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::PlanShortName(plan_key.to_string()));
        state.plans.get(plan_key).cloned().ok_or_else(|| not_found(plan_key))
    }

    async fn list_branches(&self, plan_key: &str) -> Result<Vec<PlanBranch>, CiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListBranches(plan_key.to_string()));
        Ok(state.branches.get(plan_key).cloned().unwrap_or_default())
    }

    async fn create_or_enable_branch(
        &self,
        plan_key: &str,
        branch: &BranchShortName,
    ) -> Result<bool, CiError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::CreateOrEnable(plan_key.to_string(), branch.to_string()));
        if state.failing_enable.contains(plan_key) {
            return Err(CiError::Status {
                url: plan_key.to_string(),
                status: 500,
            });
        }

        let branches = state.branches.entry(plan_key.to_string()).or_default();
        match branches.iter_mut().find(|b| b.short_name == branch.as_str()) {
            Some(existing) => existing.enabled = true,
            None => {
                let key = format!("{}{}", plan_key, branches.len() + 1);
                branches.push(PlanBranch {
                    short_name: branch.to_string(),
                    key,
                    enabled: true,
                });
            }
        }
        Ok(true)
    }

    async fn trigger_build(&self, plan_key: &str, branch: &BranchShortName) -> Result<String, CiError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::Trigger(plan_key.to_string(), branch.to_string()));
        if state.failing_trigger.contains(plan_key) {
            return Err(CiError::Status {
                url: plan_key.to_string(),
                status: 503,
            });
        }
        if state.malformed_trigger.contains(plan_key) {
            return Err(CiError::MalformedResponse {
                url: plan_key.to_string(),
                detail: "queue response has no result link".to_string(),
            });
        }
        Ok(Self::result_url(plan_key))
    }

    async fn build_state(&self, result_url: &str) -> Result<BuildState, CiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::BuildState(result_url.to_string()));
        let script = state.polls.get_mut(result_url).ok_or_else(|| not_found(result_url))?;
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().copied()
        };
        match next {
            Some(Poll::State(build_state)) => Ok(build_state),
            Some(Poll::Fail) => Err(CiError::MalformedResponse {
                url: result_url.to_string(),
                detail: "unexpected payload".to_string(),
            }),
            None => Err(not_found(result_url)),
        }
    }
}
