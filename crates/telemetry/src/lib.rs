//! Execution tracing for Mizan queries.
//!
//! Every backend call made while answering a query is recorded as a span
//! (role, tier, model, duration, outcome). The finished trace carries the
//! wall-clock time that the self-evaluation step is shown.

pub mod model;
pub mod recorder;

pub use model::{Span, SpanKind, Trace};
pub use recorder::{TraceRecorder, export_json};

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
