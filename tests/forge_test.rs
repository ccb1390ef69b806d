use std::time::Duration;

use core_lib::{
    error::RepositoryUnavailableError,
    git::{Inspector, forge::ForgeInspector},
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPO: &str = "https://github.com/green-coding/bench.git";
const COMMITS_PATH: &str = "/repos/green-coding/bench/commits";

fn inspector(mock_server: &MockServer) -> anyhow::Result<ForgeInspector> {
    Ok(ForgeInspector::with_github_api(
        &mock_server.uri(),
        Duration::from_secs(5),
    )?)
}

async fn mount_commits(mock_server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(COMMITS_PATH))
        .and(query_param("per_page", "1"))
        .and(query_param("sha", "dev"))
        .respond_with(response)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_tip_is_first_commit_sha() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_commits(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!([
            {"sha": "0123456789abcdef0123456789abcdef01234567"},
            {"sha": "older"},
        ])),
    )
    .await;

    let tip = inspector(&mock_server)?.tip_of(REPO, "dev").await?;
    assert_eq!(tip, "0123456789abcdef0123456789abcdef01234567");
    Ok(())
}

#[tokio::test]
async fn test_not_found_is_missing_branch() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_commits(&mock_server, ResponseTemplate::new(404)).await;

    let err = inspector(&mock_server)?
        .tip_of(REPO, "dev")
        .await
        .unwrap_err();
    assert!(
        matches!(err, RepositoryUnavailableError::BranchNotFound { ref branch, .. } if branch == "dev")
    );
    Ok(())
}

#[tokio::test]
async fn test_empty_commit_list_is_empty_repository() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_commits(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!([])),
    )
    .await;

    let err = inspector(&mock_server)?
        .tip_of(REPO, "dev")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryUnavailableError::EmptyRepository { .. }
    ));
    Ok(())
}

#[tokio::test]
async fn test_server_error_is_unreachable_with_body() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_commits(
        &mock_server,
        ResponseTemplate::new(503).set_body_string("upstream overloaded"),
    )
    .await;

    let err = inspector(&mock_server)?
        .tip_of(REPO, "dev")
        .await
        .unwrap_err();
    match err {
        RepositoryUnavailableError::Unreachable { reason, .. } => {
            assert!(reason.contains("503"), "{reason}");
            assert!(reason.contains("upstream overloaded"), "{reason}");
        }
        other => panic!("expected Unreachable, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_commit_without_hash_is_unreachable() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_commits(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!([{"commit": {"message": "x"}}])),
    )
    .await;

    let err = inspector(&mock_server)?
        .tip_of(REPO, "dev")
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryUnavailableError::Unreachable { .. }));
    Ok(())
}

#[tokio::test]
async fn test_blank_hash_is_empty_tip() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_commits(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!([{"sha": "  "}])),
    )
    .await;

    let err = inspector(&mock_server)?
        .tip_of(REPO, "dev")
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryUnavailableError::EmptyTip { .. }));
    Ok(())
}

#[tokio::test]
async fn test_slow_api_times_out() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;
    mount_commits(
        &mock_server,
        ResponseTemplate::new(200)
            .set_body_json(json!([{"sha": "abc"}]))
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let inspector =
        ForgeInspector::with_github_api(&mock_server.uri(), Duration::from_millis(300))?;
    let err = inspector.tip_of(REPO, "dev").await.unwrap_err();
    assert!(matches!(err, RepositoryUnavailableError::Timeout { .. }));
    Ok(())
}

#[tokio::test]
async fn test_unsupported_host_makes_no_request() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    let err = inspector(&mock_server)?
        .tip_of("https://bitbucket.org/a/b", "dev")
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryUnavailableError::UnsupportedHost(_)));
    assert!(
        mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty()
    );
    Ok(())
}
