use crate::error::ApiError;

/// Runs a synchronous ledger or raffle call on the blocking pool.
///
/// Store calls block on network I/O, and each core operation must finish without yielding
/// between its read and its write.
pub async fn run_blocking<T, E, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
        .map_err(Into::into)
}
