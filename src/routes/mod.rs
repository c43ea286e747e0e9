//! HTTP route handlers
//!
//! Every interaction with an edit session is one request. Handlers lock the
//! session, run the blocking editor operation on the blocking thread pool
//! and return JSON (or a binary download).

pub mod export;
pub mod health;
pub mod ocr;
pub mod pages;
pub mod sessions;

use axum::{routing::get, Router};
use tokio::time::{timeout, Duration};

use crate::error::{AppError, Result};
use crate::session::{EditSession, EditorError, SharedSession};
use crate::state::AppState;

/// Upper bound for stateless blocking work (opening an upload, encoding an export)
const BLOCKING_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/health", get(health::health_check))
        .nest("/api/v1/ocr", ocr::router())
        .nest(
            "/api/v1/sessions",
            sessions::router(&state).merge(pages::router()).merge(export::router()),
        )
        .with_state(state)
}

/// Run stateless CPU-bound work off the async runtime, bounded by a timeout.
///
/// A timed-out task keeps running to completion on the blocking pool, so
/// this must never be used for work that mutates a session.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    run_blocking_within(BLOCKING_TIMEOUT, f).await
}

async fn run_blocking_within<F, T>(limit: Duration, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match timeout(limit, tokio::task::spawn_blocking(f)).await {
        Ok(join_result) => join_result.map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?,
        Err(_) => Err(AppError::Timeout(format!(
            "operation exceeded {} seconds",
            limit.as_secs()
        ))),
    }
}

/// Run work on the blocking pool and wait for it, however long it takes
pub(crate) async fn run_to_completion<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
}

/// Lock a session and apply an editor operation to it.
///
/// Not time-limited: the response always reflects what happened to the session.
pub(crate) async fn with_session<F, T>(session: SharedSession, op: F) -> Result<T>
where
    F: FnOnce(&mut EditSession) -> std::result::Result<T, EditorError> + Send + 'static,
    T: Send + 'static,
{
    let mut guard = session.lock_owned().await;
    run_to_completion(move || op(&mut guard).map_err(AppError::from)).await
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pdf::fake::FakePages;
    use crate::session::EditorSettings;

    #[tokio::test]
    async fn test_stateless_work_times_out() {
        let result = run_blocking_within(Duration::from_millis(20), || {
            std::thread::sleep(std::time::Duration::from_millis(200));
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(AppError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_session_ops_report_their_outcome() {
        let session: SharedSession = Arc::new(tokio::sync::Mutex::new(EditSession::new(
            uuid::Uuid::new_v4(),
            "slow.pdf",
            Arc::new(FakePages::new(3, 40, 30)),
            EditorSettings::default(),
        )));

        let selection = with_session(session.clone(), |s| {
            std::thread::sleep(std::time::Duration::from_millis(50));
            s.navigate(2).cloned()
        })
        .await
        .unwrap();

        assert_eq!(selection.current_page, 2);
        assert_eq!(session.lock().await.selection().current_page, 2);
    }
}
