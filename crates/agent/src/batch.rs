//! Sequential batch runs with a timing summary.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::orchestrator::ResearchOrchestrator;

/// Summary written after a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Wall-clock time for the whole batch, formatted as `"12.34s"`.
    pub total_execution_time: String,
    pub average_time_per_query: String,
    /// One entry per query, in input order.
    pub results: Vec<serde_json::Value>,
    #[serde(skip)]
    pub failures: usize,
}

/// Run `queries` one after another.
///
/// Each entry is the query's result object extended with `query` and
/// `execution_time`. A failed query is reported with an `error` field and
/// the batch continues.
pub async fn run_batch(orchestrator: &ResearchOrchestrator, queries: &[String]) -> BatchReport {
    let batch_started = Instant::now();
    let mut results = Vec::with_capacity(queries.len());
    let mut failures = 0;

    for (i, query) in queries.iter().enumerate() {
        info!(index = i + 1, total = queries.len(), query = %query, "Batch query");
        let started = Instant::now();
        let entry = match orchestrator.run(query).await {
            Ok(outcome) => outcome.result.to_json(),
            Err(e) => {
                warn!(query = %query, error = %e, "Batch query failed");
                failures += 1;
                serde_json::json!({ "error": e.to_string() })
            }
        };
        results.push(with_run_info(entry, query, started.elapsed()));
    }

    let total = batch_started.elapsed();
    let average = if queries.is_empty() {
        Duration::ZERO
    } else {
        total / queries.len() as u32
    };

    BatchReport {
        total_execution_time: format_secs(total),
        average_time_per_query: format_secs(average),
        results,
        failures,
    }
}

fn with_run_info(result: serde_json::Value, query: &str, elapsed: Duration) -> serde_json::Value {
    let mut map = match result {
        serde_json::Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("result".into(), other);
            map
        }
    };
    map.insert("query".into(), query.into());
    map.insert("execution_time".into(), format_secs(elapsed).into());
    serde_json::Value::Object(map)
}

/// Seconds with two decimals and an `s` suffix.
pub fn format_secs(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}
