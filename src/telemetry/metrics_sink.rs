use crate::metrics::LabelCache;

use super::{AttemptEvent, DispatchOutcome, DispatchSpan, DispatchSummary, TelemetrySink};

/// Records dispatch counters and attempt latency through the `metrics` facade.
///
/// Without an installed recorder every call is a no-op.
#[derive(Default)]
pub struct MetricsSink {
    labels: LabelCache,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetrySink for MetricsSink {
    fn dispatch_started(&self, _span: &DispatchSpan) {}

    fn attempt_recorded(&self, event: &AttemptEvent) {
        let capability = self.labels.sanitize(&event.capability);
        let backend = self.labels.sanitize(&event.backend_id);

        metrics::counter!(
            "switchyard_attempts_total",
            "capability" => capability,
            "backend" => backend.clone(),
            "outcome" => event.outcome.as_str()
        )
        .increment(1);
        metrics::histogram!("switchyard_attempt_duration_seconds", "backend" => backend)
            .record(event.latency_ms as f64 / 1000.0);
    }

    fn dispatch_finished(&self, summary: &DispatchSummary) {
        let capability = self.labels.sanitize(&summary.capability);

        metrics::counter!(
            "switchyard_dispatch_total",
            "capability" => capability.clone(),
            "outcome" => summary.outcome.as_str()
        )
        .increment(1);

        if summary.outcome == DispatchOutcome::Success && summary.attempts > 1 {
            metrics::counter!("switchyard_fallbacks_total", "capability" => capability)
                .increment(1);
        }
    }
}
