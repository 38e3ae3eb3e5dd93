use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::JiraConfig;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Jira API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Jira rejected every transition for {issue} (tried {tried})")]
    TransitionsExhausted { issue: String, tried: usize },

    #[error("Jira url, email or token missing from config and environment")]
    MissingCredentials,
}

/// A subtask of a work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtask {
    pub key: String,
    pub summary: String,
    pub status_name: String,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    #[serde(default)]
    subtasks: Vec<SubtaskEntry>,
}

#[derive(Debug, Deserialize)]
struct SubtaskEntry {
    key: String,
    fields: SubtaskFields,
}

#[derive(Debug, Deserialize)]
struct SubtaskFields {
    #[serde(default)]
    summary: String,
    status: StatusRef,
}

#[derive(Debug, Deserialize)]
struct StatusRef {
    id: String,
    #[serde(default)]
    name: String,
}

/// Jira REST client authenticated with email and API token.
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    token: String,
}

impl JiraClient {
    pub fn from_config(config: &JiraConfig) -> Result<Self, TrackerError> {
        match (&config.url, &config.email, &config.token) {
            (Some(url), Some(email), Some(token)) => Ok(Self {
                http: reqwest::Client::new(),
                base_url: url.trim_end_matches('/').to_string(),
                email: email.clone(),
                token: token.clone(),
            }),
            _ => Err(TrackerError::MissingCredentials),
        }
    }

    /// Apply the first transition the issue accepts, trying `transition_ids` in order.
    ///
    /// Returns the id that was applied.
    #[instrument(skip(self))]
    pub async fn transition_issue(
        &self,
        issue_key: &str,
        transition_ids: &[String],
    ) -> Result<String, TrackerError> {
        let url = format!("{}/issue/{}/transitions", self.base_url, issue_key);

        for id in transition_ids {
            let response = self
                .http
                .post(&url)
                .basic_auth(&self.email, Some(&self.token))
                .header("Accept", "application/json")
                .json(&json!({ "transition": { "id": id } }))
                .send()
                .await?;

            if response.status().is_success() {
                info!(transition = %id, "issue transitioned");
                return Ok(id.clone());
            }
            warn!(transition = %id, status = response.status().as_u16(), "transition rejected");
        }

        Err(TrackerError::TransitionsExhausted {
            issue: issue_key.to_string(),
            tried: transition_ids.len(),
        })
    }

    /// Subtasks of `issue_key` whose status id is `status_id`.
    #[instrument(skip(self))]
    pub async fn list_subtasks(&self, issue_key: &str, status_id: &str) -> Result<Vec<Subtask>, TrackerError> {
        let url = format!("{}/issue/{}", self.base_url, issue_key);
        let issue = self
            .http
            .get(&url)
            .basic_auth(&self.email, Some(&self.token))
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<IssueResponse>()
            .await?;

        if issue.fields.subtasks.is_empty() {
            info!("issue has no subtasks");
            return Ok(Vec::new());
        }
        debug!(subtasks = issue.fields.subtasks.len(), "fetched subtasks");

        let matching = issue
            .fields
            .subtasks
            .into_iter()
            .filter(|entry| entry.fields.status.id == status_id)
            .map(|entry| Subtask {
                key: entry.key,
                summary: entry.fields.summary,
                status_name: entry.fields.status.name,
            })
            .inspect(|subtask| {
                info!(key = %subtask.key, summary = %subtask.summary, status = %subtask.status_name, "subtask to process")
            })
            .collect();

        Ok(matching)
    }
}
