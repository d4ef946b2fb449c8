use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use bazaar_types::api::{CommentResponse, CreateCommentRequest, DetailResponse};
use bazaar_types::models::User;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::repository::Repository;
use crate::run_blocking;

const MAX_COMMENT_LEN: usize = 1000;

pub async fn list_comments(State(state): State<AppState>) -> ApiResult<Json<Vec<CommentResponse>>> {
    let comments = run_blocking(move || Repository::new(&state.db).list_comments()).await?;
    Ok(Json(comments))
}

pub async fn list_ad_comments(
    State(state): State<AppState>,
    WithRejection(Path(ad_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    let comments =
        run_blocking(move || Repository::new(&state.db).list_comments_for_ad(ad_id)).await?;
    Ok(Json(comments))
}

pub async fn get_comment(
    State(state): State<AppState>,
    WithRejection(Path(comment_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<CommentResponse>> {
    let comment = run_blocking(move || Repository::new(&state.db).get_comment(comment_id)).await?;
    Ok(Json(comment))
}

/// POST /comments/{ad_id}. Comment on an existing ad.
pub async fn create_comment(
    State(state): State<AppState>,
    WithRejection(Path(ad_id), _): WithRejection<Path<i64>, ApiError>,
    Extension(user): Extension<User>,
    WithRejection(Json(req), _): WithRejection<Json<CreateCommentRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let text = req.text.trim().to_string();
    if text.is_empty() || text.chars().count() > MAX_COMMENT_LEN {
        return Err(ApiError::Validation(format!(
            "Comment must be 1 to {} characters",
            MAX_COMMENT_LEN
        )));
    }

    let comment = run_blocking(move || {
        Repository::new(&state.db).create_comment(&user, ad_id, &text)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /comments/{id}. Only the author or an admin may delete.
pub async fn delete_comment(
    State(state): State<AppState>,
    WithRejection(Path(comment_id), _): WithRejection<Path<i64>, ApiError>,
    Extension(user): Extension<User>,
) -> ApiResult<Json<DetailResponse>> {
    run_blocking(move || Repository::new(&state.db).delete_comment(&user, comment_id)).await?;
    Ok(Json(DetailResponse {
        detail: "Comment deleted".to_string(),
    }))
}
