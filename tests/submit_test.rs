use std::{collections::BTreeMap, time::Duration};

use core_lib::{
    api::{SubmissionResult, Submitter, client::ApiClient},
    config::ApiConfig,
    error::SubmissionError,
    exec::template::ExpandedRun,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(url: &str, token: Option<&str>, timeout: Duration) -> anyhow::Result<ApiClient> {
    let api = ApiConfig {
        api_url: url.to_string(),
        token: token.map(str::to_string),
    };
    Ok(ApiClient::new(&api, timeout)?)
}

fn expanded_run() -> ExpandedRun {
    ExpandedRun {
        name: "app".to_string(),
        repo_to_run: "https://github.com/org/bench".to_string(),
        branch_to_run: "main".to_string(),
        machine_id: "7".to_string(),
        email: "ops@example.com".to_string(),
        filename: "usage_scenario.yml".to_string(),
        schedule_mode: "one-off".to_string(),
        variables: BTreeMap::from([("__GMT_VAR_COMMIT".to_string(), "abc123".to_string())]),
    }
}

#[tokio::test]
async fn test_submit_posts_payload_with_token() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/software/add"))
        .and(header("X-Authentication", "secret"))
        .and(body_json(json!({
            "name": "app",
            "repo_url": "https://github.com/org/bench",
            "machine_id": "7",
            "branch": "main",
            "filename": "usage_scenario.yml",
            "email": "ops@example.com",
            "schedule_mode": "one-off",
            "usage_scenario_variables": {"__GMT_VAR_COMMIT": "abc123"},
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server.uri(), Some("secret"), Duration::from_secs(5))?
        .submit(&expanded_run())
        .await?;

    assert_eq!(result, SubmissionResult::Accepted);
    Ok(())
}

#[tokio::test]
async fn test_submit_without_token_sends_no_auth_header() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/software/add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server.uri(), None, Duration::from_secs(5))?
        .submit(&expanded_run())
        .await?;
    assert_eq!(result, SubmissionResult::Ok(json!({"success": true})));

    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("x-authentication"));
    Ok(())
}

#[tokio::test]
async fn test_submit_no_content_is_success() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/software/add"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server.uri(), None, Duration::from_secs(5))?
        .submit(&expanded_run())
        .await?;
    assert_eq!(result, SubmissionResult::NoContent);
    Ok(())
}

#[tokio::test]
async fn test_submit_error_status() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/software/add"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"err": "bad machine"})))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri(), None, Duration::from_secs(5))?
        .submit(&expanded_run())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "HTTP 422: bad machine");
    Ok(())
}

#[tokio::test]
async fn test_submit_rejected_by_api() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/software/add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "err": [{"msg": "machine offline"}],
        })))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri(), None, Duration::from_secs(5))?
        .submit(&expanded_run())
        .await
        .unwrap_err();

    assert!(matches!(err, SubmissionError::Rejected(ref m) if m == "machine offline"));
    Ok(())
}

#[tokio::test]
async fn test_submit_slow_api_times_out() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/software/add"))
        .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri(), None, Duration::from_millis(300))?
        .submit(&expanded_run())
        .await
        .unwrap_err();

    assert!(matches!(err, SubmissionError::Timeout));
    Ok(())
}

#[tokio::test]
async fn test_submit_unreachable_is_transport_error() -> anyhow::Result<()> {
    // bind then drop so nothing listens on the port
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let uri = format!("http://{}", listener.local_addr()?);
    drop(listener);

    let err = client(&uri, None, Duration::from_secs(5))?
        .submit(&expanded_run())
        .await
        .unwrap_err();
    assert!(matches!(err, SubmissionError::Transport(_)));
    Ok(())
}

#[tokio::test]
async fn test_list_machines_filters_inactive() -> anyhow::Result<()> {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/machines"))
        .and(header("X-Authentication", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [[1, "bench-1", true], [2, "bench-2", false]],
        })))
        .mount(&mock_server)
        .await;

    let api = client(&mock_server.uri(), Some("secret"), Duration::from_secs(5))?;

    let active = api.list_machines(false).await?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "bench-1");

    let all = api.list_machines(true).await?;
    assert_eq!(all.len(), 2);
    Ok(())
}
