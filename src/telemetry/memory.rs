use parking_lot::Mutex;

use super::{AttemptEvent, DispatchSpan, DispatchSummary, TelemetrySink};

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    spans: Mutex<Vec<DispatchSpan>>,
    attempts: Mutex<Vec<AttemptEvent>>,
    summaries: Mutex<Vec<DispatchSummary>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<DispatchSpan> {
        self.spans.lock().clone()
    }

    pub fn attempts(&self) -> Vec<AttemptEvent> {
        self.attempts.lock().clone()
    }

    pub fn summaries(&self) -> Vec<DispatchSummary> {
        self.summaries.lock().clone()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn dispatch_started(&self, span: &DispatchSpan) {
        self.spans.lock().push(span.clone());
    }

    fn attempt_recorded(&self, event: &AttemptEvent) {
        self.attempts.lock().push(event.clone());
    }

    fn dispatch_finished(&self, summary: &DispatchSummary) {
        self.summaries.lock().push(summary.clone());
    }
}
