//! Per-call deadlines for backend requests.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Await a backend call, turning its error or an expired deadline into a
/// message suitable for a report.
pub(crate) async fn within<T, E: Display>(
    limit: Duration,
    call: impl Future<Output = Result<T, E>>,
) -> Result<T, String> {
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {limit:?}")),
    }
}
