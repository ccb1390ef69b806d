use std::path::PathBuf;

use thiserror::Error;

/// Invalid or unreadable watch configuration. Fatal for the whole invocation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error reading config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing configuration file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No repos configured under `repos`")]
    NoRepos,

    #[error("repos[{watch}]: missing required field `{field}`")]
    MissingWatchField { watch: usize, field: &'static str },

    #[error("repos[{watch}].runs[{run}]: missing required field `{field}`")]
    MissingRunField {
        watch: usize,
        run: usize,
        field: &'static str,
    },

    #[error("repos[{watch}].runs[{run}]: unknown schedule_mode `{mode}`")]
    InvalidScheduleMode {
        watch: usize,
        run: usize,
        mode: String,
    },

    #[error("repos[{watch}].runs[{run}].variables.{name}: value must be a string")]
    InvalidVariable {
        watch: usize,
        run: usize,
        name: String,
    },

    #[error("repos[{watch}]: {repo}#{branch} is already watched by repos[{first}]")]
    DuplicateWatch {
        watch: usize,
        first: usize,
        repo: String,
        branch: String,
    },

    #[error("api.token: environment variable `{0}` is not set")]
    MissingEnv(String),
}

/// The persisted state cannot be read or written. Fatal for the whole invocation.
#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("Failed to read state file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write state file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The tip of a watched branch could not be resolved. Scoped to one watch.
#[derive(Debug, Error)]
pub enum RepositoryUnavailableError {
    #[error("{repo}: unreachable: {reason}")]
    Unreachable { repo: String, reason: String },

    #[error("{repo}: branch `{branch}` not found")]
    BranchNotFound { repo: String, branch: String },

    #[error("{repo}: no commits found on `{branch}` (empty repository?)")]
    EmptyRepository { repo: String, branch: String },

    #[error("{repo}: empty commit hash reported for `{branch}`")]
    EmptyTip { repo: String, branch: String },

    #[error("{0}: repository URL seems incomplete")]
    InvalidUrl(String),

    #[error("{0}: unsupported git host (only GitHub/GitLab are supported)")]
    UnsupportedHost(String),

    #[error("{repo}: no answer after {secs}s")]
    Timeout { repo: String, secs: u64 },
}

/// The job-queue service refused or never answered a submission. Scoped to one watch.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("API error: {0}")]
    Rejected(String),

    #[error("Expected JSON but got: {0}")]
    InvalidResponse(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for SubmissionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SubmissionError::Timeout
        } else {
            SubmissionError::Transport(e)
        }
    }
}

/// Errors that stop an invocation before or while watches are processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateStoreError),
}

/// Why one watch failed. Other watches are still processed.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Repository(#[from] RepositoryUnavailableError),

    #[error("run {run}: {source}")]
    Submission {
        run: usize,
        #[source]
        source: SubmissionError,
    },
}
