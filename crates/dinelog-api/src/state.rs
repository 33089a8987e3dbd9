use std::sync::Arc;

use chrono::Duration;
use tracing::error;

use dinelog_db::Database;

use crate::error::{ApiError, ApiResult};

pub type AppState = Arc<AppStateInner>;

/// Application context built once at startup and handed to every handler.
pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub session_ttl: Duration,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: String, session_ttl: Duration) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret,
            session_ttl,
        })
    }
}

/// Run blocking DB work off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&AppStateInner) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("Internal error".into())
        })?
}
