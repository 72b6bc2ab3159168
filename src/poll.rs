//! Completion polling for remote dubbing jobs.
//!
//! [`PollMachine`] holds the state transitions and [`CompletionPoller`] drives
//! it against a [`JobLookup`] on a [`Clock`], so tests can run the loop on
//! virtual time.

use crate::api::models::UNKNOWN_STATUS;
use crate::api::{Job, JobStatus};
use crate::error::Result;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Source of job snapshots keyed by correlation id.
#[async_trait]
pub trait JobLookup: Send + Sync {
    async fn find_job(&self, correlation_id: &str) -> Result<Option<Job>>;
}

/// Time source and sleeper used by the poll loop.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_wait: Duration,
    pub check_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(60 * 60),
            check_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending,
    InProgress,
    Complete,
    Failed,
    TimedOut,
}

/// How a wait ended. A timeout is an outcome here, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Complete(Job),
    Failed(Job),
    TimedOut { last: Option<Job>, waited: Duration },
}

impl PollOutcome {
    pub fn state(&self) -> PollState {
        match self {
            PollOutcome::Complete(_) => PollState::Complete,
            PollOutcome::Failed(_) => PollState::Failed,
            PollOutcome::TimedOut { .. } => PollState::TimedOut,
        }
    }
}

/// Rough progress for diagnostics: 50% once the job reports any
/// non-terminal status other than `UNKNOWN`.
pub fn estimate_progress(status: &JobStatus) -> u8 {
    match status {
        JobStatus::Other(raw) if !raw.is_empty() && raw != UNKNOWN_STATUS => 50,
        _ => 0,
    }
}

/// Remaining time extrapolated from elapsed time and a progress percentage.
pub fn estimate_remaining(elapsed: Duration, progress: u8) -> Option<Duration> {
    if progress == 0 || progress >= 100 {
        return None;
    }
    let total = elapsed.as_secs_f64() * 100.0 / f64::from(progress);
    Some(Duration::from_secs_f64(total - elapsed.as_secs_f64()))
}

/// Poll state plus the bookkeeping the client keeps per wait.
#[derive(Debug)]
pub struct PollMachine {
    state: PollState,
    polls: u32,
    last: Option<Job>,
}

impl Default for PollMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PollMachine {
    pub fn new() -> Self {
        Self {
            state: PollState::Pending,
            polls: 0,
            last: None,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn last(&self) -> Option<&Job> {
        self.last.as_ref()
    }

    /// Apply one lookup result. Returns the outcome when it is terminal.
    ///
    /// A miss or a lookup error never ends the wait.
    pub fn observe(
        &mut self,
        snapshot: Result<Option<Job>>,
        elapsed: Duration,
    ) -> Option<PollOutcome> {
        self.polls += 1;

        let job = match snapshot {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!("Poll #{} - job not visible yet, will retry", self.polls);
                self.state = PollState::InProgress;
                return None;
            }
            Err(e) => {
                warn!("Poll #{} - lookup failed: {}, will retry", self.polls, e);
                self.state = PollState::InProgress;
                return None;
            }
        };

        let status = job.status.clone();
        match status {
            JobStatus::Complete => {
                info!(
                    "Poll #{} - job {} completed after {:.1} minutes",
                    self.polls,
                    job.id,
                    elapsed.as_secs_f64() / 60.0
                );
                self.state = PollState::Complete;
                Some(PollOutcome::Complete(job))
            }
            JobStatus::Failed => {
                warn!("Poll #{} - job {} failed remotely", self.polls, job.id);
                self.state = PollState::Failed;
                Some(PollOutcome::Failed(job))
            }
            JobStatus::Other(_) => {
                let progress = estimate_progress(&status);
                let remaining = estimate_remaining(elapsed, progress)
                    .map(|d| format!("~{} minutes", (d.as_secs() + 59) / 60))
                    .unwrap_or_else(|| "unknown".to_string());
                info!(
                    "Poll #{} - status {}, progress {}%, estimated time remaining {}",
                    self.polls, status, progress, remaining
                );
                self.state = PollState::InProgress;
                self.last = Some(job);
                None
            }
        }
    }

    /// Finish a wait whose deadline passed before a terminal status was seen.
    ///
    /// `observe` ignores the deadline, so a lookup that returns `COMPLETE`
    /// after the deadline has already passed still ends the wait as complete.
    pub fn expire(mut self, waited: Duration) -> PollOutcome {
        self.state = PollState::TimedOut;
        PollOutcome::TimedOut {
            last: self.last.take(),
            waited,
        }
    }
}

/// Repeatedly looks up a job until it is terminal or the deadline passes.
pub struct CompletionPoller<'a> {
    lookup: &'a dyn JobLookup,
    clock: &'a dyn Clock,
    config: PollConfig,
}

impl<'a> CompletionPoller<'a> {
    pub fn new(lookup: &'a dyn JobLookup, clock: &'a dyn Clock, config: PollConfig) -> Self {
        Self {
            lookup,
            clock,
            config,
        }
    }

    /// Wait for the job with `correlation_id` to finish.
    pub async fn wait(&self, correlation_id: &str) -> PollOutcome {
        info!(
            "Waiting for job {} (max wait {:.1} minutes, interval {}s)",
            correlation_id,
            self.config.max_wait.as_secs_f64() / 60.0,
            self.config.check_interval.as_secs()
        );

        let start = self.clock.now();
        let mut machine = PollMachine::new();

        loop {
            let elapsed = self.clock.now().saturating_duration_since(start);
            if elapsed >= self.config.max_wait {
                warn!(
                    "Poll #{} - maximum wait of {:.1} minutes exceeded for job {}",
                    machine.polls(),
                    self.config.max_wait.as_secs_f64() / 60.0,
                    correlation_id
                );
                return machine.expire(elapsed);
            }

            debug!(
                "Poll #{} - checking status ({:.1}s elapsed)",
                machine.polls() + 1,
                elapsed.as_secs_f64()
            );
            let snapshot = self.lookup.find_job(correlation_id).await;
            let elapsed = self.clock.now().saturating_duration_since(start);
            if let Some(outcome) = machine.observe(snapshot, elapsed) {
                return outcome;
            }

            self.clock.sleep(self.config.check_interval).await;
        }
    }
}
