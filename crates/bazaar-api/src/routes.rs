use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{ads, comments, users};

/// All API routes. Reads of ads and comments are public; everything that
/// writes, plus `/users/*`, goes through [`require_auth`].
pub fn router(state: AppState) -> Router {
    let authed = middleware::from_fn_with_state(state.clone(), require_auth);

    Router::new()
        .route("/health", get(health))
        .route("/register", post(auth::register))
        .route("/token", post(auth::login))
        .route("/users/me", get(users::me).layer(authed.clone()))
        .route("/users/{id}", patch(users::promote).layer(authed.clone()))
        .route("/ads", get(ads::list_ads))
        .route("/ads", post(ads::create_ad).layer(authed.clone()))
        .route("/ads/{id}", get(ads::get_ad))
        .route("/ads/{id}", delete(ads::delete_ad).layer(authed.clone()))
        .route("/ads/{id}/comments", get(comments::list_ad_comments))
        .route("/comments", get(comments::list_comments))
        .route("/comments/{id}", get(comments::get_comment))
        .route("/comments/{id}", post(comments::create_comment).layer(authed.clone()))
        .route("/comments/{id}", delete(comments::delete_comment).layer(authed))
        .with_state(state)
}

/// GET /health. Liveness check, no auth.
pub async fn health() -> &'static str {
    "ok"
}
