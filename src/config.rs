use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .release-verifier.toml.
///
/// All fields are optional. Credentials missing from the file are
/// picked up from the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bamboo: BambooConfig,

    #[serde(default)]
    pub bitbucket: BitbucketConfig,

    #[serde(default)]
    pub jira: JiraConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BambooConfig {
    /// Server root, e.g. http://bamboo.example.net:8085
    #[serde(default = "default_bamboo_url")]
    pub url: String,
    /// Falls back to BAMBOO_USER.
    pub user: Option<String>,
    /// Falls back to BAMBOO_PASSWORD.
    pub password: Option<String>,
}

impl Default for BambooConfig {
    fn default() -> Self {
        Self {
            url: default_bamboo_url(),
            user: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketConfig {
    /// REST API root used to fetch pull request metadata.
    #[serde(default = "default_bitbucket_api_url")]
    pub api_url: String,
    /// Falls back to BITBUCKET_TOKEN.
    pub token: Option<String>,
}

impl Default for BitbucketConfig {
    fn default() -> Self {
        Self {
            api_url: default_bitbucket_api_url(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
    /// REST API root, e.g. https://example.atlassian.net/rest/api/3
    pub url: Option<String>,
    /// Falls back to JIRA_EMAIL.
    pub email: Option<String>,
    /// Falls back to JIRA_TOKEN.
    pub token: Option<String>,
    /// Transition ids tried in order until one is accepted.
    #[serde(default = "default_transitions")]
    pub transitions: Vec<String>,
    /// Status id of the subtasks reported by --list-subtasks.
    #[serde(default = "default_ready_status_id")]
    pub ready_status_id: String,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            url: None,
            email: None,
            token: None,
            transitions: default_transitions(),
            ready_status_id: default_ready_status_id(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between two status polls of the same build.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_bamboo_url() -> String {
    "http://localhost:8085".to_string()
}

fn default_bitbucket_api_url() -> String {
    "https://api.bitbucket.org/2.0".to_string()
}

fn default_transitions() -> Vec<String> {
    vec!["91".to_string(), "641".to_string()]
}

fn default_ready_status_id() -> String {
    "10047".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from .release-verifier.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".release-verifier.toml");
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill credentials that the file left empty from the environment.
    fn apply_env(&mut self) {
        fill_from_env(&mut self.bamboo.user, "BAMBOO_USER");
        fill_from_env(&mut self.bamboo.password, "BAMBOO_PASSWORD");
        fill_from_env(&mut self.bitbucket.token, "BITBUCKET_TOKEN");
        fill_from_env(&mut self.jira.email, "JIRA_EMAIL");
        fill_from_env(&mut self.jira.token, "JIRA_TOKEN");
    }
}

fn fill_from_env(slot: &mut Option<String>, var: &str) {
    if slot.is_none() {
        if let Ok(value) = std::env::var(var) {
            *slot = Some(value);
        }
    }
}
