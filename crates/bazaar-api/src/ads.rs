use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use bazaar_types::api::{AdResponse, CreateAdRequest, DetailResponse};
use bazaar_types::models::User;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::repository::Repository;
use crate::run_blocking;

const TITLE_LEN: std::ops::RangeInclusive<usize> = 1..=100;
const DESCRIPTION_LEN: std::ops::RangeInclusive<usize> = 5..=250;

pub async fn list_ads(State(state): State<AppState>) -> ApiResult<Json<Vec<AdResponse>>> {
    let ads = run_blocking(move || Repository::new(&state.db).list_ads()).await?;
    Ok(Json(ads))
}

pub async fn get_ad(
    State(state): State<AppState>,
    WithRejection(Path(ad_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<AdResponse>> {
    let ad = run_blocking(move || Repository::new(&state.db).get_ad(ad_id)).await?;
    Ok(Json(ad))
}

pub async fn create_ad(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Json(req), _): WithRejection<Json<CreateAdRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let title = req.title.trim().to_string();
    if !TITLE_LEN.contains(&title.chars().count()) {
        return Err(ApiError::Validation(format!(
            "Title must be {} to {} characters",
            TITLE_LEN.start(),
            TITLE_LEN.end()
        )));
    }

    let description = req.description.trim().to_string();
    if !DESCRIPTION_LEN.contains(&description.chars().count()) {
        return Err(ApiError::Validation(format!(
            "Description must be {} to {} characters",
            DESCRIPTION_LEN.start(),
            DESCRIPTION_LEN.end()
        )));
    }

    let ad = run_blocking(move || {
        Repository::new(&state.db).create_ad(&user, &title, req.kind, &description)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(ad)))
}

/// DELETE /ads/{id}. Only the owner or an admin may delete; comments on the ad go with it.
pub async fn delete_ad(
    State(state): State<AppState>,
    WithRejection(Path(ad_id), _): WithRejection<Path<i64>, ApiError>,
    Extension(user): Extension<User>,
) -> ApiResult<Json<DetailResponse>> {
    run_blocking(move || Repository::new(&state.db).delete_ad(&user, ad_id)).await?;
    Ok(Json(DetailResponse {
        detail: "Ad deleted".to_string(),
    }))
}
