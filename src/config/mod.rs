pub mod parser;

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://api.green-coding.io/";
pub const DEFAULT_TIMEOUT: u64 = 30;
pub const DEFAULT_SCHEDULE_MODE: &str = "one-off";
pub const TOKEN_ENV: &str = "GMT_AUTH_TOKEN";

pub const SCHEDULE_MODES: &[&str] = &[
    "one-off",
    "variance",
    "daily",
    "weekly",
    "commit",
    "commit-variance",
    "tag",
    "tag-variance",
    "statistical-significance",
];

/// How tip commits are resolved.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InspectorKind {
    /// Ask the remote itself for its advertised refs (`git ls-remote`).
    #[default]
    Git,
    /// Ask the GitHub / GitLab REST API for the latest commit.
    Forge,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ApiConfig {
    pub api_url: String,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WatchConfig {
    pub api: ApiConfig,
    /// Upper bound, in seconds, for every repository query and submission.
    pub timeout: u64,
    pub inspector: InspectorKind,
    pub repos: Vec<RepoWatch>,
}

impl WatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// One monitored (repository, branch) pair and the runs it triggers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RepoWatch {
    #[serde(default)]
    pub name: Option<String>,
    pub repo_to_watch: String,
    pub branch_to_watch: String,
    #[serde(default)]
    pub runs: Vec<RunSpec>,
}

impl RepoWatch {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.repo_to_watch)
    }

    pub fn key(&self) -> WatchKey {
        WatchKey::new(&self.repo_to_watch, &self.branch_to_watch)
    }
}

/// One benchmark submission template. `variables` values may embed `__GIT_HASH__`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub repo_to_run: String,
    pub branch_to_run: String,
    pub machine_id: String,
    pub email: String,
    pub filename: String,
    pub schedule_mode: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Identity of a watch in the state store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchKey {
    pub repo: String,
    pub branch: String,
}

impl WatchKey {
    pub fn new(repo: &str, branch: &str) -> Self {
        Self {
            repo: repo.to_string(),
            branch: branch.to_string(),
        }
    }
}

impl fmt::Display for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.branch)
    }
}
