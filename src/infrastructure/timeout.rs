//! Deadline enforcement for collaborator calls

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::domain::DomainError;

/// Runs `future` with a deadline, mapping elapsed time to [`DomainError::Timeout`]
pub async fn with_timeout<T, F>(operation: &str, limit: Duration, future: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    match timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::timeout(operation, limit.as_millis() as u64)),
    }
}
