//! Polling driver: the external caller that moves a course forward one chunk
//! at a time, pausing between calls and giving up after a budget.

use super::executor::{ChunkResult, ChunkStepper};
use crate::course::CourseId;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Caller-side pacing. The engine never times a course out; only the driver gives up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverPolicy {
    /// Pause after a committed chunk
    pub success_delay_ms: u64,
    /// Pause before retrying after a retryable error
    pub error_delay_ms: u64,
    pub max_attempts: u32,
    pub max_elapsed_secs: u64,
}

impl Default for DriverPolicy {
    fn default() -> Self {
        Self {
            success_delay_ms: 1_000,
            error_delay_ms: 5_000,
            max_attempts: 200,
            max_elapsed_secs: 1_800,
        }
    }
}

impl DriverPolicy {
    /// No pauses; for tests and local runs.
    pub fn immediate() -> Self {
        Self {
            success_delay_ms: 0,
            error_delay_ms: 0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DriveOutcome {
    Complete,
    Failed { error: String },
    /// Budget exhausted; the course stays resumable.
    TakingLonger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveReport {
    pub outcome: DriveOutcome,
    pub attempts: u32,
    pub committed: u32,
    pub errors: u32,
    /// Percent reported by every chunk call, in order.
    pub percents: Vec<u8>,
    pub last: Option<ChunkResult>,
}

pub struct PollingDriver {
    policy: DriverPolicy,
}

impl PollingDriver {
    pub fn new(policy: DriverPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DriverPolicy {
        &self.policy
    }

    /// Call `stepper` until the course is complete, failed, or the budget runs out.
    ///
    /// Retryable errors (transport, validation, conflict) are retried after the error
    /// delay. Any other refusal ends the drive with that error.
    pub async fn drive<S: ChunkStepper + ?Sized>(
        &self,
        stepper: &S,
        course_id: &CourseId,
    ) -> Result<DriveReport, ApiError> {
        let started = Instant::now();
        let budget = Duration::from_secs(self.policy.max_elapsed_secs);
        let mut report = DriveReport {
            outcome: DriveOutcome::TakingLonger,
            attempts: 0,
            committed: 0,
            errors: 0,
            percents: Vec::new(),
            last: None,
        };

        loop {
            if report.attempts >= self.policy.max_attempts || started.elapsed() >= budget {
                warn!(
                    course_id = %course_id,
                    attempts = report.attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Generation is taking longer than expected"
                );
                report.outcome = DriveOutcome::TakingLonger;
                return Ok(report);
            }
            report.attempts += 1;

            let delay = match stepper.step(course_id).await {
                Ok(result) => {
                    report.percents.push(result.percent);
                    let pause = if result.complete {
                        report.committed += 1;
                        report.outcome = DriveOutcome::Complete;
                        None
                    } else if result.is_failed() {
                        report.outcome = DriveOutcome::Failed {
                            error: result.error.clone().unwrap_or_default(),
                        };
                        None
                    } else if result.error.is_some() {
                        report.errors += 1;
                        Some(self.policy.error_delay_ms)
                    } else {
                        report.committed += 1;
                        Some(self.policy.success_delay_ms)
                    };
                    debug!(
                        course_id = %course_id,
                        attempt = report.attempts,
                        percent = result.percent,
                        status = %result.status,
                        "Chunk call returned"
                    );
                    report.last = Some(result);
                    match pause {
                        Some(ms) => ms,
                        None => {
                            info!(
                                course_id = %course_id,
                                attempts = report.attempts,
                                outcome = ?report.outcome,
                                "Generation drive finished"
                            );
                            return Ok(report);
                        }
                    }
                }
                Err(err) if err.is_retryable() => {
                    report.errors += 1;
                    debug!(course_id = %course_id, error = %err, "Chunk call refused; retrying");
                    self.policy.error_delay_ms
                }
                Err(err) => return Err(err),
            };

            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}
