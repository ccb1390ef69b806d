use std::io;

use crate::{
    api::{SubmissionResult, Submitter},
    config::{RepoWatch, WatchKey},
    core::{
        state::StateStore,
        watcher::{Detection, detect},
    },
    error::{PipelineError, WatchError},
    exec::template::expand,
    git::Inspector,
    log::logger::Logger,
};

#[derive(Debug)]
pub enum WatchStatus {
    /// New tip, every run accepted, state advanced.
    Submitted { commit: String, runs: usize },
    /// Tip already acted on.
    Unchanged { commit: String },
    /// Inspection or a submission failed, state left as it was.
    Failed,
}

#[derive(Debug)]
pub struct WatchOutcome {
    pub watch: WatchKey,
    pub name: String,
    pub status: WatchStatus,
    pub error: Option<WatchError>,
}

impl WatchOutcome {
    fn failed(watch: &RepoWatch, error: WatchError) -> Self {
        Self {
            watch: watch.key(),
            name: watch.display_name().to_string(),
            status: WatchStatus::Failed,
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, WatchStatus::Failed)
    }
}

/// Per-watch results of one invocation, in configuration order.
#[derive(Debug, Default)]
pub struct Summary {
    pub outcomes: Vec<WatchOutcome>,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        !self.outcomes.iter().any(WatchOutcome::is_failed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &WatchOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// Number of runs accepted by the job queue.
    pub fn submissions(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                WatchStatus::Submitted { runs, .. } => runs,
                _ => 0,
            })
            .sum()
    }

    fn counts(&self) -> (usize, usize, usize) {
        self.outcomes
            .iter()
            .fold((0, 0, 0), |(s, u, f), o| match o.status {
                WatchStatus::Submitted { .. } => (s + 1, u, f),
                WatchStatus::Unchanged { .. } => (s, u + 1, f),
                WatchStatus::Failed => (s, u, f + 1),
            })
    }
}

/// One pass over every watch: inspect, detect, submit, record.
///
/// A watch's state only moves once all of its runs were accepted, so a failed
/// watch is retried as a whole by the next invocation.
pub struct Orchestrator<'a> {
    inspector: &'a dyn Inspector,
    submitter: &'a dyn Submitter,
    store: &'a mut StateStore,
    logger: Logger,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        inspector: &'a dyn Inspector,
        submitter: &'a dyn Submitter,
        store: &'a mut StateStore,
        logger: Logger,
    ) -> Self {
        Self {
            inspector,
            submitter,
            store,
            logger,
        }
    }

    /// Processes `watches` in order. Only a state write failure stops the pass.
    pub async fn run(&mut self, watches: &[RepoWatch]) -> Result<Summary, PipelineError> {
        let mut summary = Summary::default();
        for watch in watches {
            let outcome = self.process_watch(watch).await?;
            summary.outcomes.push(outcome);
        }
        self.report(&summary).await;
        Ok(summary)
    }

    async fn process_watch(&mut self, watch: &RepoWatch) -> Result<WatchOutcome, PipelineError> {
        let name = watch.display_name();
        let (repo, branch) = (&watch.repo_to_watch, &watch.branch_to_watch);
        let logger = &self.logger;

        best_effort(
            logger
                .info(&format!("Checking repo: {name} ({repo}:{branch})"))
                .await,
        );

        let tip = match self.inspector.tip_of(repo, branch).await {
            Ok(tip) => tip,
            Err(e) => {
                best_effort(logger.error(&format!("[{name}] {e}")).await);
                return Ok(WatchOutcome::failed(watch, e.into()));
            }
        };

        let previous = self.store.get(repo, branch).map(str::to_string);
        let seen = previous.as_deref().unwrap_or("-");
        best_effort(
            logger
                .info(&format!("[{name}] last seen: {seen}, latest: {tip}"))
                .await,
        );

        if detect(previous.as_deref(), &tip) == Detection::Unchanged {
            best_effort(
                logger
                    .info(&format!("[{name}] No new commits. Nothing to do."))
                    .await,
            );
            return Ok(WatchOutcome {
                watch: watch.key(),
                name: name.to_string(),
                status: WatchStatus::Unchanged { commit: tip },
                error: None,
            });
        }

        let announced = if watch.runs.is_empty() {
            logger
                .warning(&format!(
                    "[{name}] New commit detected but no runs are configured."
                ))
                .await
        } else {
            logger
                .info(&format!(
                    "[{name}] New commit detected. Submitting {} run(s).",
                    watch.runs.len()
                ))
                .await
        };
        best_effort(announced);

        for (i, run) in watch.runs.iter().enumerate() {
            let index = i + 1;
            let expanded = expand(run, name, &tip);
            best_effort(
                logger
                    .submit(&format!(
                        "[{name}] Run {index}: {} ({}, {}) on machine {}",
                        expanded.repo_to_run,
                        expanded.branch_to_run,
                        expanded.filename,
                        expanded.machine_id
                    ))
                    .await,
            );

            match self.submitter.submit(&expanded).await {
                Ok(result) => {
                    let detail = match result {
                        SubmissionResult::Accepted => "accepted (202), queued",
                        SubmissionResult::NoContent => "API returned 204 No Content",
                        SubmissionResult::Ok(_) => "accepted",
                    };
                    best_effort(
                        logger
                            .info(&format!("[{name}] Run {index}: {detail}"))
                            .await,
                    );
                }
                Err(source) => {
                    let error = WatchError::Submission { run: index, source };
                    best_effort(
                        logger
                            .error(&format!(
                                "[{name}] {error}. Remaining runs skipped, state not updated."
                            ))
                            .await,
                    );
                    return Ok(WatchOutcome::failed(watch, error));
                }
            }
        }

        self.store.set(repo, branch, &tip).await?;
        best_effort(
            self.logger
                .info(&format!("[{name}] Updated state: last_commit = {tip}"))
                .await,
        );

        Ok(WatchOutcome {
            watch: watch.key(),
            name: name.to_string(),
            status: WatchStatus::Submitted {
                commit: tip,
                runs: watch.runs.len(),
            },
            error: None,
        })
    }

    async fn report(&self, summary: &Summary) {
        let (submitted, unchanged, failed) = summary.counts();
        best_effort(
            self.logger
                .summary(&format!(
                    "{} watch(es): {submitted} submitted, {unchanged} unchanged, {failed} failed",
                    summary.outcomes.len()
                ))
                .await,
        );

        for outcome in &summary.outcomes {
            let label = format!("{} ({})", outcome.name, outcome.watch);
            let line = match (&outcome.status, &outcome.error) {
                (WatchStatus::Submitted { commit, runs }, _) => {
                    format!("{label}: {runs} run(s) submitted for {commit}")
                }
                (WatchStatus::Unchanged { commit }, _) => {
                    format!("{label}: no new commit ({commit})")
                }
                (WatchStatus::Failed, Some(e)) => format!("{label}: FAILED: {e}"),
                (WatchStatus::Failed, None) => format!("{label}: FAILED"),
            };
            best_effort(self.logger.summary(&line).await);
        }
    }
}

/// A failing log sink never changes what gets submitted or recorded.
fn best_effort(written: io::Result<()>) {
    if let Err(e) = written {
        eprintln!("benchwatch: failed to write log: {e}");
    }
}
