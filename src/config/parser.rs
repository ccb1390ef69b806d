use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use serde::Deserialize;
use serde_yaml::Value;

use crate::{
    config::{
        ApiConfig, DEFAULT_API_URL, DEFAULT_SCHEDULE_MODE, DEFAULT_TIMEOUT, InspectorKind,
        RepoWatch, RunSpec, SCHEDULE_MODES, TOKEN_ENV, WatchConfig,
    },
    error::ConfigError,
};

#[derive(Debug, Deserialize, Default)]
struct RawApi {
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    api: RawApi,
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    inspector: InspectorKind,
    #[serde(default)]
    repos: Vec<RawWatch>,
}

#[derive(Debug, Deserialize)]
struct RawWatch {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    repo_to_watch: Option<String>,
    #[serde(default)]
    branch_to_watch: Option<String>,
    #[serde(default)]
    runs: Vec<RawRun>,
}

#[derive(Debug, Deserialize)]
struct RawRun {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    repo_to_run: Option<String>,
    #[serde(default)]
    branch_to_run: Option<String>,
    #[serde(default)]
    machine_id: Option<Value>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    schedule_mode: Option<String>,
    #[serde(default)]
    variables: BTreeMap<String, Value>,
}

/// Reads and validates the watch configuration at `path`.
///
/// The document is YAML, so a JSON config is accepted as is.
pub fn load_config(path: &Path) -> Result<WatchConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let raw: RawConfig = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate(raw)
}

fn validate(raw: RawConfig) -> Result<WatchConfig, ConfigError> {
    if raw.repos.is_empty() {
        return Err(ConfigError::NoRepos);
    }

    let mut repos = Vec::with_capacity(raw.repos.len());
    let mut seen: HashMap<(String, String), usize> = HashMap::new();

    for (w, watch) in raw.repos.into_iter().enumerate() {
        let repo_to_watch = required(watch.repo_to_watch).ok_or(ConfigError::MissingWatchField {
            watch: w,
            field: "repo_to_watch",
        })?;
        let branch_to_watch =
            required(watch.branch_to_watch).ok_or(ConfigError::MissingWatchField {
                watch: w,
                field: "branch_to_watch",
            })?;

        if let Some(&first) = seen.get(&(repo_to_watch.clone(), branch_to_watch.clone())) {
            return Err(ConfigError::DuplicateWatch {
                watch: w,
                first,
                repo: repo_to_watch,
                branch: branch_to_watch,
            });
        }
        seen.insert((repo_to_watch.clone(), branch_to_watch.clone()), w);

        let runs = watch
            .runs
            .into_iter()
            .enumerate()
            .map(|(r, run)| validate_run(w, r, run))
            .collect::<Result<Vec<_>, _>>()?;

        repos.push(RepoWatch {
            name: required(watch.name),
            repo_to_watch,
            branch_to_watch,
            runs,
        });
    }

    let api = ApiConfig {
        api_url: required(raw.api.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        token: resolve_token(raw.api.token)?,
    };

    Ok(WatchConfig {
        api,
        timeout: raw.timeout.or(raw.api.timeout).unwrap_or(DEFAULT_TIMEOUT),
        inspector: raw.inspector,
        repos,
    })
}

fn validate_run(watch: usize, run: usize, raw: RawRun) -> Result<RunSpec, ConfigError> {
    let missing = |field| ConfigError::MissingRunField { watch, run, field };

    let repo_to_run = required(raw.repo_to_run).ok_or_else(|| missing("repo_to_run"))?;
    let machine_id = raw
        .machine_id
        .as_ref()
        .and_then(scalar_to_string)
        .and_then(|id| required(Some(id)))
        .ok_or_else(|| missing("machine_id"))?;
    let email = required(raw.email).ok_or_else(|| missing("email"))?;
    let branch_to_run = required(raw.branch_to_run).ok_or_else(|| missing("branch_to_run"))?;
    let filename = required(raw.filename).ok_or_else(|| missing("filename"))?;

    let schedule_mode =
        required(raw.schedule_mode).unwrap_or_else(|| DEFAULT_SCHEDULE_MODE.to_string());
    if !SCHEDULE_MODES.contains(&schedule_mode.as_str()) {
        return Err(ConfigError::InvalidScheduleMode {
            watch,
            run,
            mode: schedule_mode,
        });
    }

    let variables = raw
        .variables
        .into_iter()
        .map(|(name, value)| match scalar_to_string(&value) {
            Some(v) => Ok((name, v)),
            None => Err(ConfigError::InvalidVariable { watch, run, name }),
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(RunSpec {
        name: required(raw.name),
        repo_to_run,
        branch_to_run,
        machine_id,
        email,
        filename,
        schedule_mode,
        variables,
    })
}

/// Trimmed value, or `None` when absent or blank.
fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `$NAME` reads the token from `NAME`, a bare `$` from `GMT_AUTH_TOKEN`.
/// Without a configured token, `GMT_AUTH_TOKEN` is used when set.
fn resolve_token(token: Option<String>) -> Result<Option<String>, ConfigError> {
    match required(token) {
        Some(t) if t.starts_with('$') => {
            let env_key = if t.len() == 1 { TOKEN_ENV } else { &t[1..] };
            extract_env_value(env_key).map(Some)
        }
        Some(t) => Ok(Some(t)),
        None => Ok(required(std::env::var(TOKEN_ENV).ok())),
    }
}

fn extract_env_value(env_key: &str) -> Result<String, ConfigError> {
    required(std::env::var(env_key).ok()).ok_or_else(|| ConfigError::MissingEnv(env_key.into()))
}
