//! Summary generation against a locked issue row.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use streetfix_core::IssueId;

use crate::backend::{BackendError, ChatRequest, SummaryBackend};
use crate::prompt::{summary_prompt, SYSTEM_PROMPT};
use crate::store::{IssueStore, StoreError};

/// Immutable generator configuration, injected at construction.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    /// Model identifier sent to the backend.
    pub model: String,
    /// Bound on each backend call. Also bounds how long the row lock is
    /// held across the call.
    pub request_timeout: Duration,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// What a generation run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// The record already carried a non-empty summary; nothing was written
    /// and the backend was not called.
    AlreadySummarized,
    /// The description was empty after trimming; the summary was written
    /// (or confirmed) empty and the backend was not called.
    EmptyDescription,
    /// A summary was generated and persisted.
    Generated { summary: String },
}

/// Why a generation run failed. Nothing here escapes the subsystem: the
/// [`SummaryGenerator::generate`] wrapper logs and swallows every variant.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("issue {0} not found")]
    NotFound(IssueId),

    #[error("summarisation backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("persisting summary failed: {0}")]
    Persistence(StoreError),
}

impl SummaryError {
    fn from_store(issue_id: IssueId, err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound(issue_id),
            other => Self::Persistence(other),
        }
    }
}

/// Produces and persists the AI summary for one issue at a time.
///
/// Each run is a single store transaction holding the row's write lock from
/// fetch to commit. The lock is what serializes duplicate dispatches and
/// retries for the same id: whichever run wins re-checks `ai_summary` under
/// the lock and every loser sees the committed value and backs off without
/// touching the backend.
///
/// The lock is deliberately held across the backend call. The call is
/// bounded by `SummaryConfig::request_timeout` and contention on a single
/// issue's summary is rare, so serializing backend latency against other
/// writers of that row is an accepted trade-off.
pub struct SummaryGenerator<S, B> {
    store: S,
    backend: B,
    config: SummaryConfig,
}

impl<S, B> SummaryGenerator<S, B>
where
    S: IssueStore,
    B: SummaryBackend,
{
    pub fn new(store: S, backend: B, config: SummaryConfig) -> Self {
        Self {
            store,
            backend,
            config,
        }
    }

    /// Run one generation attempt and report the typed outcome.
    ///
    /// Exactly one field (`ai_summary`) is written per successful run, and
    /// at most one backend call is made. Any failure aborts the transaction,
    /// leaving the record as it was.
    pub async fn run(&self, issue_id: IssueId) -> Result<SummaryOutcome, SummaryError> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| SummaryError::from_store(issue_id, e))?;

        let issue = tx
            .lock(issue_id)
            .await
            .map_err(|e| SummaryError::from_store(issue_id, e))?;

        // Re-checked under the lock, not before it: a competing run may have
        // committed a summary while we waited.
        if !issue.ai_summary.is_empty() {
            tx.commit()
                .await
                .map_err(|e| SummaryError::from_store(issue_id, e))?;
            return Ok(SummaryOutcome::AlreadySummarized);
        }

        let description = issue.description.trim();
        if description.is_empty() {
            // Nothing to summarise; make sure the field stays empty.
            tx.store_summary(issue_id, "")
                .await
                .map_err(|e| SummaryError::from_store(issue_id, e))?;
            tx.commit()
                .await
                .map_err(|e| SummaryError::from_store(issue_id, e))?;
            return Ok(SummaryOutcome::EmptyDescription);
        }

        let request = ChatRequest::new(&self.config.model, self.config.request_timeout)
            .system(SYSTEM_PROMPT)
            .user(summary_prompt(description));

        debug!(issue_id = %issue_id, model = %request.model, "requesting summary from backend");
        let completion = self.backend.complete(&request).await?;
        let summary = completion
            .first_content()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(BackendError::EmptyResponse)?
            .to_string();

        tx.store_summary(issue_id, &summary)
            .await
            .map_err(|e| SummaryError::from_store(issue_id, e))?;
        tx.commit()
            .await
            .map_err(|e| SummaryError::from_store(issue_id, e))?;

        Ok(SummaryOutcome::Generated { summary })
    }

    /// Run one generation attempt, reporting every outcome through logging.
    ///
    /// Never returns an error: this is the entry point for detached
    /// execution, where no caller is left to act on a failure.
    pub async fn generate(&self, issue_id: IssueId) {
        match self.run(issue_id).await {
            Ok(SummaryOutcome::Generated { summary }) => {
                info!(issue_id = %issue_id, summary = %summary, "stored generated summary");
            }
            Ok(SummaryOutcome::EmptyDescription) => {
                info!(issue_id = %issue_id, "no description to summarise; summary left empty");
            }
            Ok(SummaryOutcome::AlreadySummarized) => {
                debug!(issue_id = %issue_id, "summary already present; nothing to do");
            }
            Err(err) => {
                warn!(issue_id = %issue_id, error = %err, "summary generation failed");
            }
        }
    }
}
