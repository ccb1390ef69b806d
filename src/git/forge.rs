use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use crate::{
    error::RepositoryUnavailableError,
    git::{Inspector, non_empty_tip, utiles::parse_remote},
};

const GITHUB_API: &str = "https://api.github.com";

/// Which REST API answers for a remote, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForgeEndpoint {
    /// `GET /repos/{owner}/{repo}/commits`, hash in `sha`.
    GitHub(Url),
    /// `GET /api/v4/projects/{id}/repository/commits`, hash in `id`.
    GitLab(Url),
}

impl ForgeEndpoint {
    /// Builds the "latest commits" URL for `repo`, including the branch filter.
    pub fn for_repo(repo: &str, branch: &str) -> Result<Self, RepositoryUnavailableError> {
        Self::with_github_api(GITHUB_API, repo, branch)
    }

    /// Same as [`ForgeEndpoint::for_repo`], with GitHub answering at `github_api`.
    pub fn with_github_api(
        github_api: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Self, RepositoryUnavailableError> {
        let invalid = || RepositoryUnavailableError::InvalidUrl(repo.to_string());
        let remote = parse_remote(repo).map_err(|_| invalid())?;

        if remote.host.contains("github.com") {
            let segments = remote.segments();
            let (owner, name) = match segments.as_slice() {
                [owner, name, ..] => (*owner, *name),
                _ => return Err(invalid()),
            };
            let mut url = Url::parse(github_api).map_err(|_| invalid())?;
            url.path_segments_mut()
                .map_err(|_| invalid())?
                .extend(["repos", owner, name, "commits"]);
            url.query_pairs_mut()
                .append_pair("per_page", "1")
                .append_pair("sha", branch);
            return Ok(ForgeEndpoint::GitHub(url));
        }

        if remote.host.contains("gitlab") {
            let mut url = Url::parse(&format!("{}://{}/", remote.scheme, remote.host))
                .map_err(|_| invalid())?;
            // the project path is a single, percent-encoded segment
            url.path_segments_mut()
                .map_err(|_| invalid())?
                .pop_if_empty()
                .extend(["api", "v4", "projects", remote.path.as_str(), "repository", "commits"]);
            url.query_pairs_mut()
                .append_pair("per_page", "1")
                .append_pair("ref_name", branch);
            return Ok(ForgeEndpoint::GitLab(url));
        }

        Err(RepositoryUnavailableError::UnsupportedHost(repo.to_string()))
    }

    pub fn url(&self) -> &Url {
        match self {
            ForgeEndpoint::GitHub(url) | ForgeEndpoint::GitLab(url) => url,
        }
    }

    fn hash_field(&self) -> &'static str {
        match self {
            ForgeEndpoint::GitHub(_) => "sha",
            ForgeEndpoint::GitLab(_) => "id",
        }
    }

    /// Picks the hash of the first commit in a commit list response.
    pub fn extract_hash(&self, body: &Value) -> Option<String> {
        body.as_array()?
            .first()?
            .get(self.hash_field())?
            .as_str()
            .map(str::to_string)
    }
}

/// Resolves tips through the GitHub / GitLab commit APIs.
#[derive(Debug, Clone)]
pub struct ForgeInspector {
    client: Client,
    timeout: Duration,
    github_api: String,
}

impl ForgeInspector {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_github_api(GITHUB_API, timeout)
    }

    pub fn with_github_api(github_api: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("benchwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            timeout,
            github_api: github_api.to_string(),
        })
    }
}

#[async_trait]
impl Inspector for ForgeInspector {
    async fn tip_of(
        &self,
        repo: &str,
        branch: &str,
    ) -> Result<String, RepositoryUnavailableError> {
        let endpoint = ForgeEndpoint::with_github_api(&self.github_api, repo, branch)?;
        let unreachable = |reason: String| RepositoryUnavailableError::Unreachable {
            repo: repo.to_string(),
            reason,
        };

        let resp = self
            .client
            .get(endpoint.url().clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RepositoryUnavailableError::Timeout {
                        repo: repo.to_string(),
                        secs: self.timeout.as_secs(),
                    }
                } else {
                    unreachable(e.to_string())
                }
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RepositoryUnavailableError::BranchNotFound {
                repo: repo.to_string(),
                branch: branch.to_string(),
            });
        }
        if status != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(unreachable(format!("API error {status}: {snippet}")));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| unreachable(format!("invalid commit list: {e}")))?;

        if body.as_array().is_some_and(|a| a.is_empty()) {
            return Err(RepositoryUnavailableError::EmptyRepository {
                repo: repo.to_string(),
                branch: branch.to_string(),
            });
        }

        let hash = endpoint
            .extract_hash(&body)
            .ok_or_else(|| unreachable("commit without hash in API response".to_string()))?;
        non_empty_tip(repo, branch, hash)
    }
}
