use std::path::Path;

use anyhow::Result;

use crate::{
    api::client::ApiClient,
    cli::{Cli, Commands},
    config::parser::load_config,
    core::{
        manager::{Orchestrator, Summary},
        state::{StateStore, get_state_path},
    },
    git::{build_inspector, utiles::extract_repo_path},
    log::logger::Logger,
};

pub const EXIT_OK: i32 = 0;
/// At least one watch failed; its state was left for the next invocation.
pub const EXIT_WATCH_FAILED: i32 = 1;
/// Config or state unusable; no watch was processed to completion.
pub const EXIT_FATAL: i32 = 2;

/// Dispatches a CLI command and returns the process exit code.
pub async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Check {
            config,
            state,
            log_file,
        } => {
            let logger = match log_file {
                Some(path) => Logger::new(&path).await?,
                None => Logger::stdout(),
            };
            let state_path = state.unwrap_or_else(get_state_path);
            Ok(check(&config, &state_path, &logger).await)
        }
        Commands::Machines { config, all } => {
            handle_machines(&config, all).await?;
            Ok(EXIT_OK)
        }
        Commands::State { state } => {
            handle_state(&state.unwrap_or_else(get_state_path)).await?;
            Ok(EXIT_OK)
        }
        Commands::Forget {
            repo,
            branch,
            state,
        } => {
            handle_forget(&state.unwrap_or_else(get_state_path), &repo, &branch).await?;
            Ok(EXIT_OK)
        }
    }
}

/// Runs one check and maps its outcome onto the process exit code.
pub async fn check(config_path: &Path, state_path: &Path, logger: &Logger) -> i32 {
    match handle_check(config_path, state_path, logger).await {
        Ok(summary) if summary.is_success() => EXIT_OK,
        Ok(_) => EXIT_WATCH_FAILED,
        Err(e) => {
            let _ = logger.error(&format!("Invocation aborted: {e:#}")).await;
            eprintln!("❌ Invocation aborted: {e:#}");
            EXIT_FATAL
        }
    }
}

/// One pipeline invocation. Config and state errors abort before any watch runs.
pub async fn handle_check(
    config_path: &Path,
    state_path: &Path,
    logger: &Logger,
) -> Result<Summary> {
    let config = load_config(config_path)?;
    let mut store = StateStore::open(state_path).await?;

    let inspector = build_inspector(config.inspector, config.timeout())?;
    let client = ApiClient::new(&config.api, config.timeout())?;

    let _ = logger
        .info(&format!(
            "Checking {} watch(es), state in {}",
            config.repos.len(),
            store.path().display()
        ))
        .await;

    let mut orchestrator =
        Orchestrator::new(inspector.as_ref(), &client, &mut store, logger.clone());
    Ok(orchestrator.run(&config.repos).await?)
}

async fn handle_machines(config_path: &Path, all: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let client = ApiClient::new(&config.api, config.timeout())?;
    let machines = client.list_machines(all).await?;

    if machines.is_empty() {
        println!("No machines returned.");
        return Ok(());
    }

    println!("{:<10}  {:<7}  NAME", "ID", "ACTIVE");
    println!("{}", "-".repeat(60));
    for m in machines {
        let id = match &m.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        println!("{id:<10}  {:<7}  {}", m.active.to_string(), m.name);
    }
    Ok(())
}

async fn handle_state(state_path: &Path) -> Result<()> {
    let store = StateStore::open(state_path).await?;
    if store.records().next().is_none() {
        println!("No commit recorded yet ({}).", state_path.display());
        return Ok(());
    }

    println!("{:<50}  {:<12}  UPDATED", "WATCH", "COMMIT");
    for (key, record) in store.records() {
        let (repo, branch) = key.rsplit_once('#').unwrap_or((key, ""));
        let label = match extract_repo_path(repo) {
            Ok(short) => format!("{short}#{branch}"),
            Err(_) => key.to_string(),
        };
        let short_commit: String = record.last_commit.chars().take(12).collect();
        let updated = record
            .updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{label:<50}  {short_commit:<12}  {updated}");
    }
    Ok(())
}

async fn handle_forget(state_path: &Path, repo: &str, branch: &str) -> Result<()> {
    let mut store = StateStore::open(state_path).await?;
    if store.remove(repo, branch).await? {
        println!("Forgot {repo}#{branch}; its current tip will be submitted on the next check.");
    } else {
        println!("No record for {repo}#{branch}.");
    }
    Ok(())
}
