//! HTTP API for the bazaar classifieds backend.
//!
//! Identity comes from a bearer token resolved by [`session::resolve`];
//! deletes and role changes check [`policy`] before touching the store.

pub mod ads;
pub mod auth;
pub mod comments;
pub mod config;
mod convert;
pub mod error;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod repository;
pub mod routes;
pub mod session;
pub mod token;
pub mod users;

pub use auth::{AppState, AppStateInner};
pub use config::AuthConfig;
pub use error::{ApiError, ApiResult};
pub use routes::router;

use tracing::error;

/// Run blocking DB or hashing work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.to_string())
    })?
}
