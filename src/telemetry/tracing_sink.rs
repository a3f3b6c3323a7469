use super::{AttemptEvent, DispatchOutcome, DispatchSpan, DispatchSummary, TelemetrySink};

/// Logs dispatch events with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn dispatch_started(&self, span: &DispatchSpan) {
        tracing::debug!(
            dispatch_id = %span.dispatch_id,
            capability = %span.capability,
            actor_id = %span.actor_id,
            "Dispatch started"
        );
    }

    fn attempt_recorded(&self, event: &AttemptEvent) {
        if event.outcome.is_failure() {
            tracing::debug!(
                dispatch_id = %event.dispatch_id,
                capability = %event.capability,
                backend_id = %event.backend_id,
                outcome = %event.outcome,
                latency_ms = event.latency_ms,
                "Attempt failed, advancing to next candidate"
            );
        } else {
            tracing::debug!(
                dispatch_id = %event.dispatch_id,
                capability = %event.capability,
                backend_id = %event.backend_id,
                outcome = %event.outcome,
                latency_ms = event.latency_ms,
                "Attempt completed"
            );
        }
    }

    fn dispatch_finished(&self, summary: &DispatchSummary) {
        match summary.outcome {
            DispatchOutcome::Success => tracing::info!(
                dispatch_id = %summary.dispatch_id,
                capability = %summary.capability,
                backend_id = summary.backend_id.as_deref().unwrap_or(""),
                attempts = summary.attempts,
                duration_ms = summary.duration_ms,
                "Dispatch succeeded"
            ),
            outcome => tracing::warn!(
                dispatch_id = %summary.dispatch_id,
                capability = %summary.capability,
                outcome = %outcome,
                attempts = summary.attempts,
                duration_ms = summary.duration_ms,
                "Dispatch failed"
            ),
        }
    }
}
