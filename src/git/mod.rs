pub mod forge;
pub mod remote;
pub mod utiles;

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    config::InspectorKind,
    error::RepositoryUnavailableError,
    git::{forge::ForgeInspector, remote::GitRemoteInspector},
};

/// Read-only view of a live repository: the current tip of a branch.
#[async_trait]
pub trait Inspector: Send + Sync {
    /// Commit hash at the tip of `branch` in `repo`. Never returns an empty hash.
    async fn tip_of(&self, repo: &str, branch: &str) -> Result<String, RepositoryUnavailableError>;
}

pub fn build_inspector(
    kind: InspectorKind,
    timeout: Duration,
) -> Result<Box<dyn Inspector>, reqwest::Error> {
    Ok(match kind {
        InspectorKind::Git => Box::new(GitRemoteInspector::new(timeout)),
        InspectorKind::Forge => Box::new(ForgeInspector::new(timeout)?),
    })
}

fn non_empty_tip(
    repo: &str,
    branch: &str,
    hash: String,
) -> Result<String, RepositoryUnavailableError> {
    let hash = hash.trim().to_string();
    if hash.is_empty() {
        return Err(RepositoryUnavailableError::EmptyTip {
            repo: repo.to_string(),
            branch: branch.to_string(),
        });
    }
    Ok(hash)
}
