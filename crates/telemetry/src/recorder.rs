//! Thread-safe trace recorder shared by the concurrent agent calls of one
//! query.

use crate::TelemetryError;
use crate::model::*;
use std::sync::Mutex;
use tracing::debug;

/// Collects spans for a single query.
///
/// Parallel phases record into the same recorder, so spans appear in
/// completion order rather than start order.
pub struct TraceRecorder {
    trace: Mutex<Trace>,
}

impl TraceRecorder {
    /// Start recording a trace for `query`.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            trace: Mutex::new(Trace::new(query)),
        }
    }

    /// Add a finished span.
    pub fn record(&self, span: Span) {
        debug!(
            kind = %span.kind,
            role = ?span.role,
            duration_ms = span.duration_ms.unwrap_or(0),
            success = span.success.unwrap_or(false),
            "Span recorded"
        );
        self.lock().add_span(span);
    }

    /// Number of spans recorded so far.
    pub fn span_count(&self) -> usize {
        self.lock().spans.len()
    }

    /// A copy of the trace as it stands.
    pub fn snapshot(&self) -> Trace {
        self.lock().clone()
    }

    /// End the trace and return it.
    pub fn finish(self) -> Trace {
        let mut trace = self.trace.into_inner().unwrap_or_else(|e| e.into_inner());
        trace.end();
        trace
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Trace> {
        // Spans are pushed whole, so a poisoned trace is still consistent.
        self.trace.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Serialize a trace for export.
pub fn export_json(trace: &Trace) -> Result<String, TelemetryError> {
    Ok(serde_json::to_string_pretty(trace)?)
}
