pub mod client;

use async_trait::async_trait;
use serde_json::Value;

use crate::{error::SubmissionError, exec::template::ExpandedRun};

/// What the job queue answered to an accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    /// HTTP 202, the run was queued.
    Accepted,
    /// HTTP 204.
    NoContent,
    /// 2xx with a JSON body reporting `success: true`.
    Ok(Value),
}

/// Sends one expanded run to the job-queue service. No retries.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, run: &ExpandedRun) -> Result<SubmissionResult, SubmissionError>;
}
