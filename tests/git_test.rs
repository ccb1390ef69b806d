use std::{path::Path, time::Duration};

use anyhow::Result;
use core_lib::{
    error::RepositoryUnavailableError,
    git::{Inspector, remote::GitRemoteInspector},
};
use git2::{Oid, Repository, Signature};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn commit_on(repo: &Repository, branch: &str, message: &str) -> Result<Oid> {
    let sig = Signature::now("bench", "bench@example.com")?;
    let tree_id = repo.index()?.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let refname = format!("refs/heads/{branch}");

    let parent = match repo.refname_to_id(&refname) {
        Ok(id) => Some(repo.find_commit(id)?),
        Err(_) => None,
    };
    let parents: Vec<_> = parent.iter().collect();

    Ok(repo.commit(Some(&refname), &sig, &sig, message, &tree, &parents)?)
}

fn url(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn inspector() -> GitRemoteInspector {
    GitRemoteInspector::new(Duration::from_secs(30))
}

#[tokio::test]
async fn test_tip_of_local_branch() -> Result<()> {
    let dir = tempdir()?;
    let repo = Repository::init(dir.path())?;
    let oid = commit_on(&repo, "main", "init")?;

    let tip = inspector().tip_of(&url(dir.path()), "main").await?;
    assert_eq!(tip, oid.to_string());
    assert_eq!(tip.len(), 40);
    Ok(())
}

#[tokio::test]
async fn test_tip_follows_new_commits() -> Result<()> {
    let dir = tempdir()?;
    let repo = Repository::init(dir.path())?;
    let first = commit_on(&repo, "main", "first")?;

    let tip = inspector().tip_of(&url(dir.path()), "main").await?;
    assert_eq!(tip, first.to_string());

    let second = commit_on(&repo, "main", "second")?;
    let tip = inspector().tip_of(&url(dir.path()), "main").await?;
    assert_eq!(tip, second.to_string());
    assert_ne!(first, second);
    Ok(())
}

#[tokio::test]
async fn test_branches_are_resolved_separately() -> Result<()> {
    let dir = tempdir()?;
    let repo = Repository::init(dir.path())?;
    let main = commit_on(&repo, "main", "on main")?;
    let dev = commit_on(&repo, "dev", "on dev")?;

    assert_eq!(
        inspector().tip_of(&url(dir.path()), "main").await?,
        main.to_string()
    );
    assert_eq!(
        inspector().tip_of(&url(dir.path()), "dev").await?,
        dev.to_string()
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_branch() -> Result<()> {
    let dir = tempdir()?;
    let repo = Repository::init(dir.path())?;
    commit_on(&repo, "main", "init")?;

    let err = inspector()
        .tip_of(&url(dir.path()), "does-not-exist")
        .await
        .unwrap_err();
    assert!(
        matches!(err, RepositoryUnavailableError::BranchNotFound { ref branch, .. } if branch == "does-not-exist")
    );
    Ok(())
}

#[tokio::test]
async fn test_unreachable_repository() -> Result<()> {
    let dir = tempdir()?;
    let missing = dir.path().join("nothing-here");

    let err = inspector()
        .tip_of(&url(&missing), "main")
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryUnavailableError::Unreachable { .. }));
    Ok(())
}
