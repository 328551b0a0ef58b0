//! `admin.*` procedures, all restricted to the admin role

use axum::extract::State;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    extract::Json,
    middleware::AuthUser,
    models::{
        SuccessResponse,
        case_study::{CaseStudy, CaseStudyIdInput, CaseStudyView, SetRecommendedInput},
    },
    state::AppState,
};

/// `admin.posts`: every post, most reported first
pub async fn posts(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<CaseStudyView>>> {
    user.require_admin()?;

    let posts = state
        .case_study_repository
        .list_for_moderation(user.id())
        .await?;

    Ok(Json(posts))
}

/// `admin.deletePost`
pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CaseStudyIdInput>,
) -> ApiResult<Json<SuccessResponse>> {
    user.require_admin()?;

    if !state.case_study_repository.delete(input.id).await? {
        return Err(ApiError::NotFound("Case study"));
    }

    info!("Admin {} removed case study {}", user.id(), input.id);
    Ok(Json(SuccessResponse::ok()))
}

/// `admin.setRecommended`
pub async fn set_recommended(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<SetRecommendedInput>,
) -> ApiResult<Json<CaseStudy>> {
    user.require_admin()?;

    let post = state
        .case_study_repository
        .set_recommended(input.id, input.recommended)
        .await?
        .ok_or(ApiError::NotFound("Case study"))?;

    info!(
        "Admin {} set recommended={} on case study {}",
        user.id(),
        input.recommended,
        post.id
    );
    Ok(Json(post))
}
