//! Structured fan-out for the parallel phases.

use std::future::Future;

/// Run two fallible futures concurrently and wait for both.
///
/// Returns both results once both succeed. The first error wins and the
/// other future is dropped, so nothing outlives the call.
pub async fn join_pair<A, B, E>(
    left: impl Future<Output = Result<A, E>>,
    right: impl Future<Output = Result<B, E>>,
) -> Result<(A, B), E> {
    tokio::try_join!(left, right)
}
