pub mod classify;
pub mod types;

pub use classify::{classify, ComponentCategory};
pub use types::{ChangeRequest, ChangeRequestState, ChangeRequestUrl};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::BitbucketConfig;
use types::PullRequestResponse;

#[derive(Debug, Error)]
pub enum ChangeRequestError {
    #[error("Bitbucket API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid pull request URL: {0}")]
    InvalidUrl(String),

    #[error("Bitbucket token not found in config or environment")]
    MissingToken,
}

/// Parse a Bitbucket pull request URL into its component parts.
///
/// Accepts both the web form
/// `https://bitbucket.org/{workspace}/{repo}/pull-requests/{id}[/...]`
/// and the REST form
/// `https://api.bitbucket.org/2.0/repositories/{workspace}/{repo}/pullrequests/{id}`.
pub fn parse_change_request_url(url: &str) -> Result<ChangeRequestUrl, ChangeRequestError> {
    let invalid = || ChangeRequestError::InvalidUrl(url.to_string());
    let parsed = reqwest::Url::parse(url).map_err(|_| invalid())?;

    let segments: Vec<_> = parsed
        .path_segments()
        .ok_or_else(invalid)?
        .filter(|segment| !segment.is_empty())
        .collect();

    let (workspace, repo, id) = match (parsed.host_str(), segments.as_slice()) {
        (Some("bitbucket.org"), [workspace, repo, "pull-requests", id, ..]) => (workspace, repo, id),
        (Some("api.bitbucket.org"), [_, "repositories", workspace, repo, "pullrequests", id, ..]) => {
            (workspace, repo, id)
        }
        _ => return Err(invalid()),
    };

    let id = id.parse::<u64>().map_err(|_| invalid())?;

    Ok(ChangeRequestUrl {
        workspace: workspace.to_string(),
        repo: repo.to_string(),
        id,
    })
}

/// Fetch the source branch and state of one pull request and classify its component.
#[instrument(skip(config), fields(workspace = %pr_url.workspace, repo = %pr_url.repo, pr = pr_url.id))]
pub async fn fetch_change_request(
    raw_url: &str,
    pr_url: &ChangeRequestUrl,
    config: &BitbucketConfig,
) -> Result<ChangeRequest, ChangeRequestError> {
    let token = config.token.as_deref().ok_or(ChangeRequestError::MissingToken)?;
    let endpoint = format!("{}/{}", config.api_url.trim_end_matches('/'), pr_url.api_path());

    debug!("fetching pull request metadata from Bitbucket API");
    let metadata = reqwest::Client::new()
        .get(&endpoint)
        .header("Accept", "application/json")
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .json::<PullRequestResponse>()
        .await?;
    debug!(source_branch = %metadata.source.branch.name, state = ?metadata.state, "received pull request metadata");

    Ok(ChangeRequest {
        url: raw_url.to_string(),
        source_branch: metadata.source.branch.name,
        state: metadata.state,
        component: pr_url.repo.clone(),
        category: classify(&pr_url.repo),
    })
}

/// Resolve every linked pull request, in order.
///
/// Never fails as a whole: an unparseable URL yields an `Invalid` entry
/// and a failed fetch an `Error` entry, both of which correlation skips.
pub async fn resolve_all(urls: &[String], config: &BitbucketConfig) -> Vec<ChangeRequest> {
    let mut resolved = Vec::with_capacity(urls.len());

    for url in urls {
        let entry = match parse_change_request_url(url) {
            Err(e) => {
                warn!(url = %url, error = %e, "skipping pull request link");
                unresolved(url, String::new(), ComponentCategory::Invalid)
            }
            Ok(pr_url) => match fetch_change_request(url, &pr_url, config).await {
                Ok(change) => change,
                Err(e) => {
                    warn!(url = %url, error = %e, "could not fetch pull request");
                    unresolved(url, pr_url.repo, ComponentCategory::Error)
                }
            },
        };
        info!(
            url = %entry.url,
            component = %entry.component,
            category = %entry.category,
            source_branch = %entry.source_branch,
            state = ?entry.state,
            "resolved change request"
        );
        resolved.push(entry);
    }

    resolved
}

fn unresolved(url: &str, component: String, category: ComponentCategory) -> ChangeRequest {
    ChangeRequest {
        url: url.to_string(),
        source_branch: String::new(),
        state: ChangeRequestState::Unknown,
        component,
        category,
    }
}
