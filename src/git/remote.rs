use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use dirs::home_dir;
use git2::{Cred, CredentialType, Direction, Remote, RemoteCallbacks};

use crate::{
    error::RepositoryUnavailableError,
    git::{Inspector, non_empty_tip},
};

const MAX_AUTH_ATTEMPTS: u8 = 3;

/// Resolves tips by listing the refs a remote advertises, like `git ls-remote`.
#[derive(Debug, Clone)]
pub struct GitRemoteInspector {
    timeout: Duration,
}

impl GitRemoteInspector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Inspector for GitRemoteInspector {
    async fn tip_of(
        &self,
        repo: &str,
        branch: &str,
    ) -> Result<String, RepositoryUnavailableError> {
        let (url, branch_name) = (repo.to_string(), branch.to_string());
        // libgit2 blocks on the network
        let task = tokio::task::spawn_blocking(move || get_remote_branch_hash(&url, &branch_name));

        let hash = match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                return Err(RepositoryUnavailableError::Timeout {
                    repo: repo.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
            Ok(Err(join_err)) => {
                return Err(RepositoryUnavailableError::Unreachable {
                    repo: repo.to_string(),
                    reason: join_err.to_string(),
                });
            }
            Ok(Ok(res)) => res?,
        };

        non_empty_tip(repo, branch, hash)
    }
}

fn find_ssh_key() -> Option<PathBuf> {
    let home = home_dir()?;
    ["id_ed25519", "id_rsa"]
        .iter()
        .map(|k| home.join(".ssh").join(k))
        .find(|p| p.exists())
}

fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0u8;

    callbacks.credentials(move |_url, username_from_url, allowed_types| {
        // libgit2 keeps asking while credentials are rejected
        attempts += 1;
        if attempts > MAX_AUTH_ATTEMPTS {
            return Err(git2::Error::from_str("Authentication failed"));
        }
        let username = username_from_url.unwrap_or("git");

        if attempts == 1
            && allowed_types.contains(CredentialType::SSH_KEY)
            && let Some(ssh_key_path) = find_ssh_key()
            && let Ok(cred) = Cred::ssh_key(username, None, &ssh_key_path, None)
        {
            return Ok(cred);
        }

        if allowed_types.contains(CredentialType::DEFAULT)
            && let Ok(cred) = Cred::default()
        {
            return Ok(cred);
        }

        if allowed_types.contains(CredentialType::SSH_KEY)
            && let Ok(cred) = Cred::ssh_key_from_agent(username)
        {
            return Ok(cred);
        }

        Err(git2::Error::from_str("No authentication methods available"))
    });

    callbacks
}

/// Returns the commit `refs/heads/<branch>` points to on the remote at `url`.
///
/// `url` can be anything libgit2 can fetch from, local paths included.
pub fn get_remote_branch_hash(
    url: &str,
    branch: &str,
) -> Result<String, RepositoryUnavailableError> {
    let unreachable = |e: git2::Error| RepositoryUnavailableError::Unreachable {
        repo: url.to_string(),
        reason: e.message().to_string(),
    };

    let mut remote = Remote::create_detached(url).map_err(unreachable)?;
    let connection = remote
        .connect_auth(Direction::Fetch, Some(remote_callbacks()), None)
        .map_err(unreachable)?;

    let ref_to_find = format!("refs/heads/{branch}");
    let found = connection
        .list()
        .map_err(unreachable)?
        .iter()
        .find(|r| r.name() == ref_to_find)
        .map(|r| r.oid());

    drop(connection);

    match found {
        Some(oid) if oid.is_zero() => Err(RepositoryUnavailableError::EmptyTip {
            repo: url.to_string(),
            branch: branch.to_string(),
        }),
        Some(oid) => Ok(oid.to_string()),
        None => Err(RepositoryUnavailableError::BranchNotFound {
            repo: url.to_string(),
            branch: branch.to_string(),
        }),
    }
}
