//! Deadlines for database operations.
//!
//! The seating screens poll every few seconds, so a stuck query must fail
//! quickly instead of piling up requests behind it.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Deadline for single-statement queries
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for multi-statement transactions (snapshots, moves)
pub const TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for timeout operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Run a database future, failing with [`TimeoutError::Timeout`] after `duration`.
///
/// # Example
///
/// ```no_run
/// use conseater::db::timeouts::{with_timeout, QUERY_TIMEOUT};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// with_timeout(
///     QUERY_TIMEOUT,
///     sqlx::query("SELECT name FROM table_types").fetch_all(pool),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(TimeoutError::Database),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

/// [`with_timeout`] using [`QUERY_TIMEOUT`]
pub async fn with_query_timeout<F, T>(future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(QUERY_TIMEOUT, future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slow_future_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, sqlx::Error>(1)
        };
        let err = with_timeout(Duration::from_millis(10), slow).await.unwrap_err();
        assert!(matches!(err, TimeoutError::Timeout(d) if d == Duration::from_millis(10)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_database_error_passes_through() {
        let failing = async { Err::<i32, _>(sqlx::Error::RowNotFound) };
        let err = with_query_timeout(failing).await.unwrap_err();
        assert!(matches!(err, TimeoutError::Database(sqlx::Error::RowNotFound)));
    }

    #[tokio::test]
    async fn test_fast_future_completes() {
        let value = with_query_timeout(async { Ok::<_, sqlx::Error>(42) }).await.unwrap();
        assert_eq!(value, 42);
    }
}
