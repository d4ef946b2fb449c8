use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;

use bazaar_types::api::{ProfileResponse, UserResponse};
use bazaar_types::models::User;

use crate::auth::AppState;
use crate::convert::user_response;
use crate::error::{ApiError, ApiResult};
use crate::repository::Repository;
use crate::run_blocking;

/// GET /users/me. The caller with their ads and comments.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = run_blocking(move || {
        let repo = Repository::new(&state.db);
        Ok(ProfileResponse {
            ads: repo.list_ads_by_owner(user.id)?,
            comments: repo.list_comments_by_owner(user.id)?,
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        })
    })
    .await?;

    Ok(Json(profile))
}

/// PATCH /users/{id}. Promote a user to admin. Admin only.
pub async fn promote(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<i64>, ApiError>,
    Extension(actor): Extension<User>,
) -> ApiResult<Json<UserResponse>> {
    let promoted =
        run_blocking(move || Repository::new(&state.db).promote_to_admin(&actor, user_id)).await?;
    Ok(Json(user_response(&promoted)))
}
