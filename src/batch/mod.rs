//! Batch lookups over a list of queries
//!
//! A [`BatchCoordinator`] runs each batch on one background task. Queries are
//! processed strictly in input order, one at a time, so every request goes
//! through the shared rate limiter in a predictable sequence.
//!
//! ```text
//!   start(queries) ──▶ worker task ──▶ lookup(q1) ──▶ lookup(q2) ──▶ ...
//!        │                 │                │              │
//!        ▼                 ▼                ▼              ▼
//!   BatchHandle ◀── watch<JobState>   ProgressEvent  ProgressEvent
//!                                      (bounded mpsc, in order)
//! ```
//!
//! Per-item errors become [`ItemOutcome::Failed`] and never stop the batch.
//! Cancellation is checked between items; the in-flight lookup always
//! finishes first.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use masothue::batch::{BatchConfig, BatchCoordinator};
//! use masothue::client::Client;
//! use masothue::config::Config;
//!
//! # async fn example() -> masothue::error::Result<()> {
//! let client = Client::from_config(&Config::default())?;
//! let coordinator = BatchCoordinator::new(Arc::new(client), BatchConfig::default());
//!
//! let mut handle = coordinator.start(vec!["3604062974".to_string()]);
//! while let Some(event) = handle.next_event().await {
//!     println!("{}/{} {}", event.index, event.total, event.query);
//! }
//! let report = handle.wait().await;
//! println!("{} succeeded", report.success_count());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::CompanyLookup;
use crate::error::{Error, ErrorKind, MasothueErrorTrait};
use crate::models::CompanyRecord;

// ============================================================================
// Configuration
// ============================================================================

/// Batch configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Progress channel capacity
    pub channel_capacity: usize,

    /// How long a progress send may wait on a full channel
    pub send_timeout: Duration,

    /// Cancel the job after the first CAPTCHA challenge
    pub stop_on_captcha: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            send_timeout: Duration::from_secs(5),
            stop_on_captcha: false,
        }
    }
}

// ============================================================================
// Job state and outcomes
// ============================================================================

/// Lifecycle of a batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Cancelled,
    /// The job itself broke (progress channel closed, worker panicked)
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Success { record: CompanyRecord },
    /// Nothing to look up (blank input line)
    Skipped { reason: String },
    Failed { kind: ErrorKind, message: String },
}

impl ItemOutcome {
    pub fn failed(error: &Error) -> Self {
        Self::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure kind, if the item failed
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Progress notification, one per processed item, in input order
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub job_id: Uuid,
    /// 1-based position in the input
    pub index: usize,
    pub total: usize,
    pub query: String,
    pub outcome: ItemOutcome,
}

/// One input query and what became of it
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub query: String,
    pub outcome: ItemOutcome,
}

/// Final result of a batch job
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub job_id: Uuid,
    pub state: JobState,
    /// Outcomes for the processed prefix of the input
    pub outcomes: Vec<ItemResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Why the job failed, when `state` is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Success { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|r| pred(&r.outcome)).count()
    }
}

// ============================================================================
// Handles
// ============================================================================

/// Cloneable cancellation flag for a running job
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Request cancellation; takes effect before the next item starts
    ///
    /// The item in flight always finishes. If it is the last one, the job
    /// ends `Completed`, not `Cancelled`.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Caller's view of a started job
pub struct BatchHandle {
    job_id: Uuid,
    cancel: CancelHandle,
    state: watch::Receiver<JobState>,
    events: mpsc::Receiver<ProgressEvent>,
    join: JoinHandle<BatchReport>,
    started_at: DateTime<Utc>,
}

impl BatchHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Stop the job before its next item
    ///
    /// The item in flight finishes and is recorded. A cancel that arrives
    /// while the last item is running leaves the job `Completed`, since no
    /// item was left unprocessed.
    pub fn cancel(&self) {
        info!(job_id = %self.job_id, "Batch cancellation requested");
        self.cancel.cancel();
    }

    /// Cancellation flag that can be moved to another task
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change
    pub fn state_watch(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    /// Next progress event; `None` once the job has finished
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// Drain remaining events and wait for the final report
    pub async fn wait(mut self) -> BatchReport {
        while self.events.recv().await.is_some() {}

        match self.join.await {
            Ok(report) => report,
            Err(e) => {
                warn!(job_id = %self.job_id, error = %e, "Batch worker terminated abnormally");
                BatchReport {
                    job_id: self.job_id,
                    state: JobState::Failed,
                    outcomes: Vec::new(),
                    started_at: self.started_at,
                    finished_at: Utc::now(),
                    failure: Some(e.to_string()),
                }
            }
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Starts batch jobs against a shared lookup client
#[derive(Clone)]
pub struct BatchCoordinator {
    lookup: Arc<dyn CompanyLookup>,
    config: BatchConfig,
}

impl BatchCoordinator {
    pub fn new(lookup: Arc<dyn CompanyLookup>, config: BatchConfig) -> Self {
        Self { lookup, config }
    }

    /// Spawn a worker for `queries` and return its handle
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(&self, queries: Vec<String>) -> BatchHandle {
        let job_id = Uuid::new_v4();
        let started_at = Utc::now();
        let (events_tx, events_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(JobState::Pending);
        let cancel = CancelHandle::default();

        let worker = Worker {
            job_id,
            lookup: Arc::clone(&self.lookup),
            config: self.config.clone(),
            cancel: cancel.clone(),
            state: state_tx,
            events: events_tx,
        };

        let join = tokio::spawn(worker.run(queries, started_at));

        BatchHandle {
            job_id,
            cancel,
            state: state_rx,
            events: events_rx,
            join,
            started_at,
        }
    }
}

struct Worker {
    job_id: Uuid,
    lookup: Arc<dyn CompanyLookup>,
    config: BatchConfig,
    cancel: CancelHandle,
    state: watch::Sender<JobState>,
    events: mpsc::Sender<ProgressEvent>,
}

/// The progress receiver is gone
struct ChannelClosed;

impl Worker {
    async fn run(self, queries: Vec<String>, started_at: DateTime<Utc>) -> BatchReport {
        let total = queries.len();
        self.state.send_replace(JobState::Running);
        info!(job_id = %self.job_id, total = total, "Batch started");

        let mut outcomes = Vec::with_capacity(total);
        let mut state = JobState::Completed;
        let mut failure = None;

        for (i, query) in queries.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                state = JobState::Cancelled;
                break;
            }

            let outcome = self.process(&query).await;
            let captcha = outcome.error_kind() == Some(ErrorKind::CaptchaRequired);

            info!(
                job_id = %self.job_id,
                index = i + 1,
                total = total,
                outcome = outcome.label(),
                "Batch item processed"
            );

            let event = ProgressEvent {
                job_id: self.job_id,
                index: i + 1,
                total,
                query: query.clone(),
                outcome: outcome.clone(),
            };
            outcomes.push(ItemResult { query, outcome });

            if self.emit(event).await.is_err() {
                warn!(job_id = %self.job_id, "Progress receiver dropped, aborting batch");
                state = JobState::Failed;
                failure = Some("progress channel closed".to_string());
                break;
            }

            if captcha && self.config.stop_on_captcha {
                warn!(job_id = %self.job_id, index = i + 1, "CAPTCHA challenge, stopping batch");
                self.cancel.cancel();
                state = JobState::Cancelled;
                break;
            }
        }

        self.state.send_replace(state);

        let report = BatchReport {
            job_id: self.job_id,
            state,
            outcomes,
            started_at,
            finished_at: Utc::now(),
            failure,
        };

        info!(
            job_id = %self.job_id,
            state = %state,
            success = report.success_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            "Batch finished"
        );

        report
    }

    async fn process(&self, query: &str) -> ItemOutcome {
        if query.trim().is_empty() {
            return ItemOutcome::Skipped {
                reason: "empty query".to_string(),
            };
        }

        match self.lookup.lookup(query).await {
            Ok(Some(record)) => ItemOutcome::Success { record },
            Ok(None) => ItemOutcome::Failed {
                kind: ErrorKind::NotFound,
                message: format!("no search results for '{}'", query.trim()),
            },
            Err(e) => {
                warn!(job_id = %self.job_id, query = %query, kind = %e.kind(), error = %e, "Lookup failed");
                ItemOutcome::failed(&e)
            }
        }
    }

    /// Send with a bounded wait; a slow consumer loses the event, not the outcome
    async fn emit(&self, event: ProgressEvent) -> Result<(), ChannelClosed> {
        match self.events.send_timeout(event, self.config.send_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(event)) => {
                warn!(
                    job_id = %self.job_id,
                    index = event.index,
                    "Progress consumer too slow, event dropped"
                );
                Ok(())
            }
            Err(SendTimeoutError::Closed(_)) => Err(ChannelClosed),
        }
    }
}
