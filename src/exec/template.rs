use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::RunSpec;

/// Placeholder replaced by the detected commit hash in run variables.
pub const GIT_HASH_TOKEN: &str = "__GIT_HASH__";

/// A run ready for submission: every variable has the commit substituted.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ExpandedRun {
    pub name: String,
    pub repo_to_run: String,
    pub branch_to_run: String,
    pub machine_id: String,
    pub email: String,
    pub filename: String,
    pub schedule_mode: String,
    pub variables: BTreeMap<String, String>,
}

/// Replaces every occurrence of [`GIT_HASH_TOKEN`] in `value` with `commit`.
pub fn substitute(value: &str, commit: &str) -> String {
    value.replace(GIT_HASH_TOKEN, commit)
}

/// Expands `run` for `commit`. Fields other than `variables` are copied verbatim;
/// an unnamed run takes `default_name` (the watch name).
pub fn expand(run: &RunSpec, default_name: &str, commit: &str) -> ExpandedRun {
    ExpandedRun {
        name: run.name.clone().unwrap_or_else(|| default_name.to_string()),
        repo_to_run: run.repo_to_run.clone(),
        branch_to_run: run.branch_to_run.clone(),
        machine_id: run.machine_id.clone(),
        email: run.email.clone(),
        filename: run.filename.clone(),
        schedule_mode: run.schedule_mode.clone(),
        variables: run
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), substitute(v, commit)))
            .collect(),
    }
}
