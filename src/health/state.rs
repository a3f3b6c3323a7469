//! Per-backend health state tracking.

use super::config::HealthConfig;
use crate::registry::BackendStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tracks dispatch outcomes for a single backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendHealthState {
    /// Count of consecutive failed attempts
    pub consecutive_failures: u32,
    /// Count of consecutive successful attempts
    pub consecutive_successes: u32,
    /// When the last outcome was recorded
    pub last_outcome_time: Option<DateTime<Utc>>,
    /// Last known status (for detecting transitions)
    pub last_status: BackendStatus,
}

impl BackendHealthState {
    pub fn new(status: BackendStatus) -> Self {
        Self {
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_outcome_time: None,
            last_status: status,
        }
    }

    /// Apply one attempt outcome and determine if status should transition.
    /// Returns Some(new_status) if transition should occur, None otherwise.
    pub fn apply_outcome(
        &mut self,
        success: bool,
        config: &HealthConfig,
    ) -> Option<BackendStatus> {
        self.last_outcome_time = Some(Utc::now());

        let next = if success {
            self.consecutive_failures = 0;
            self.consecutive_successes += 1;

            match self.last_status {
                BackendStatus::Degraded | BackendStatus::Unavailable
                    if self.consecutive_successes >= config.recovery_after =>
                {
                    Some(BackendStatus::Available)
                }
                _ => None,
            }
        } else {
            self.consecutive_successes = 0;
            self.consecutive_failures += 1;

            match self.last_status {
                BackendStatus::Available | BackendStatus::Degraded
                    if self.consecutive_failures >= config.unavailable_after =>
                {
                    Some(BackendStatus::Unavailable)
                }
                BackendStatus::Available if self.consecutive_failures >= config.degraded_after => {
                    Some(BackendStatus::Degraded)
                }
                _ => None,
            }
        };

        if let Some(status) = next {
            self.last_status = status;
        }
        next
    }
}
