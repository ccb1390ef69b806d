use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::{
    api::{SubmissionResult, Submitter},
    config::ApiConfig,
    error::SubmissionError,
    exec::template::ExpandedRun,
};

pub const SUBMIT_PATH: &str = "/v1/software/add";
pub const MACHINES_PATH: &str = "/v1/machines";

/// Body of `POST /v1/software/add`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SoftwarePayload {
    pub name: String,
    pub repo_url: String,
    pub machine_id: String,
    pub branch: String,
    pub filename: String,
    pub email: String,
    pub schedule_mode: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub usage_scenario_variables: BTreeMap<String, String>,
}

impl From<&ExpandedRun> for SoftwarePayload {
    fn from(run: &ExpandedRun) -> Self {
        Self {
            name: run.name.trim().to_string(),
            repo_url: run.repo_to_run.trim().to_string(),
            machine_id: run.machine_id.trim().to_string(),
            branch: run.branch_to_run.trim().to_string(),
            filename: run.filename.trim().to_string(),
            email: run.email.trim().to_string(),
            schedule_mode: run.schedule_mode.trim().to_string(),
            usage_scenario_variables: run.variables.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    pub id: Value,
    pub name: String,
    pub active: bool,
}

/// Client for the job-queue HTTP API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(api: &ApiConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api.api_url.trim_end_matches('/').to_string(),
            token: api.token.clone(),
        })
    }

    /// Request to `path` under the API root, authenticated when a token is set.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .client
            .request(method, format!("{}{}", self.api_url, path));
        match &self.token {
            Some(token) => req.header("X-Authentication", token),
            None => req,
        }
    }

    /// Lists measurement machines, active ones only unless `all`.
    pub async fn list_machines(&self, all: bool) -> Result<Vec<Machine>, SubmissionError> {
        let resp = self.request(Method::GET, MACHINES_PATH).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        let data = match interpret_response(status, &text)? {
            SubmissionResult::Ok(body) => body,
            SubmissionResult::Accepted | SubmissionResult::NoContent => return Ok(Vec::new()),
        };

        Ok(parse_machines(&data)
            .into_iter()
            .filter(|m| all || m.active)
            .collect())
    }
}

#[async_trait]
impl Submitter for ApiClient {
    async fn submit(&self, run: &ExpandedRun) -> Result<SubmissionResult, SubmissionError> {
        let payload = SoftwarePayload::from(run);

        let resp = self
            .request(Method::POST, SUBMIT_PATH)
            .json(&payload)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        interpret_response(status, &text)
    }
}

/// Maps an API answer onto a result.
///
/// 202 and 204 carry no body. Any other 2xx must be JSON with `success: true`;
/// otherwise the `err` field (or its first `msg`) becomes the error message.
pub fn interpret_response(
    status: StatusCode,
    body: &str,
) -> Result<SubmissionResult, SubmissionError> {
    if status == StatusCode::NO_CONTENT {
        return Ok(SubmissionResult::NoContent);
    }
    if status == StatusCode::ACCEPTED {
        return Ok(SubmissionResult::Accepted);
    }

    let parsed: Result<Value, _> = serde_json::from_str(body);

    if !status.is_success() {
        let message = match parsed {
            Ok(data) => match data.get("err") {
                Some(err) => value_message(err),
                None => data.to_string(),
            },
            Err(_) => body.to_string(),
        };
        return Err(SubmissionError::Http {
            status: status.as_u16(),
            message,
        });
    }

    let data = parsed.map_err(|_| {
        SubmissionError::InvalidResponse(format!("{}...", body.chars().take(200).collect::<String>()))
    })?;

    if data.is_object() && data.get("success") != Some(&Value::Bool(true)) {
        let err = data.get("err").cloned().unwrap_or(Value::Null);
        let message = match err.as_array().and_then(|a| a.first()) {
            Some(first) => first
                .get("msg")
                .map(value_message)
                .unwrap_or_else(|| value_message(first)),
            None => value_message(&err),
        };
        return Err(SubmissionError::Rejected(message));
    }

    Ok(SubmissionResult::Ok(data))
}

fn value_message(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Machines come as rows: `[id, name, active, ...]`.
pub fn parse_machines(data: &Value) -> Vec<Machine> {
    let Some(rows) = data.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(Value::as_array)
        .map(|row| Machine {
            id: row.first().cloned().unwrap_or(Value::Null),
            name: row
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            active: row.get(2).map(truthy).unwrap_or(false),
        })
        .collect()
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}
