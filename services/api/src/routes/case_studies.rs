//! `caseStudies.*` procedures

use axum::extract::State;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    extract::{Json, Query},
    middleware::AuthUser,
    models::{
        SuccessResponse,
        case_study::{
            CaseStudy, CaseStudyDraft, CaseStudyIdInput, CaseStudyView, FavoriteToggle,
            ListCaseStudiesQuery, ReportOutcome, ReportResponse, ToggleFavoriteResponse,
            UpdateCaseStudyInput,
        },
    },
    state::AppState,
    validation,
};

/// `caseStudies.list`: the feed, annotated for the caller when signed in
pub async fn list(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Query(query): Query<ListCaseStudiesQuery>,
) -> ApiResult<Json<Vec<CaseStudyView>>> {
    let viewer_id = viewer.as_ref().map(AuthUser::id);

    match state
        .case_study_repository
        .list(viewer_id, query.category)
        .await
    {
        Ok(items) => Ok(Json(items)),
        Err(e) if e.is_unavailable() => {
            warn!("Case study feed served empty, store unavailable: {}", e);
            Ok(Json(Vec::new()))
        }
        Err(e) => Err(e.into()),
    }
}

/// `caseStudies.getById`
pub async fn get_by_id(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Query(input): Query<CaseStudyIdInput>,
) -> ApiResult<Json<CaseStudyView>> {
    let viewer_id = viewer.as_ref().map(AuthUser::id);

    let view = state
        .case_study_repository
        .get_view(input.id, viewer_id)
        .await?
        .ok_or(ApiError::NotFound("Case study"))?;

    Ok(Json(view))
}

/// `caseStudies.favorites`: posts the caller has favorited
pub async fn favorites(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<CaseStudyView>>> {
    let items = state.case_study_repository.list_favorites(user.id()).await?;
    Ok(Json(items))
}

/// `caseStudies.create`
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CaseStudyDraft>,
) -> ApiResult<Json<CaseStudy>> {
    let draft = input.normalized();
    validation::validate_case_study(&draft).map_err(ApiError::BadRequest)?;

    let created = state
        .case_study_repository
        .create(user.id(), &draft)
        .await?;

    Ok(Json(created))
}

/// `caseStudies.update`: owner only, fields left out keep their value
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<UpdateCaseStudyInput>,
) -> ApiResult<Json<CaseStudy>> {
    let existing = state
        .case_study_repository
        .find_by_id(input.id)
        .await?
        .ok_or(ApiError::NotFound("Case study"))?;

    if existing.user_id != user.id() {
        return Err(ApiError::Forbidden("only the author can edit a post"));
    }

    let draft = CaseStudyDraft::merged(&existing, input).normalized();
    validation::validate_case_study(&draft).map_err(ApiError::BadRequest)?;

    let updated = state
        .case_study_repository
        .update(existing.id, &draft)
        .await?
        .ok_or(ApiError::NotFound("Case study"))?;

    Ok(Json(updated))
}

/// `caseStudies.delete`: author or admin
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CaseStudyIdInput>,
) -> ApiResult<Json<SuccessResponse>> {
    let existing = state
        .case_study_repository
        .find_by_id(input.id)
        .await?
        .ok_or(ApiError::NotFound("Case study"))?;

    if existing.user_id != user.id() && !user.is_admin() {
        return Err(ApiError::Forbidden("only the author can delete a post"));
    }

    if !state.case_study_repository.delete(existing.id).await? {
        return Err(ApiError::NotFound("Case study"));
    }

    info!("User {} deleted case study {}", user.id(), existing.id);
    Ok(Json(SuccessResponse::ok()))
}

/// `caseStudies.toggleFavorite`
pub async fn toggle_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CaseStudyIdInput>,
) -> ApiResult<Json<ToggleFavoriteResponse>> {
    state
        .case_study_repository
        .find_by_id(input.id)
        .await?
        .ok_or(ApiError::NotFound("Case study"))?;

    let outcome = state
        .case_study_repository
        .toggle_favorite(user.id(), input.id)
        .await?;
    let favorite_count = state.case_study_repository.favorite_count(input.id).await?;

    Ok(Json(ToggleFavoriteResponse {
        is_favorite: outcome == FavoriteToggle::Added,
        favorite_count,
    }))
}

/// `caseStudies.report`: once per user and post, never on one's own post
pub async fn report(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CaseStudyIdInput>,
) -> ApiResult<Json<ReportResponse>> {
    let post = state
        .case_study_repository
        .find_by_id(input.id)
        .await?
        .ok_or(ApiError::NotFound("Case study"))?;

    if post.user_id == user.id() {
        return Err(ApiError::BadRequest(
            "You cannot report your own post".to_string(),
        ));
    }

    let outcome = state
        .case_study_repository
        .report(user.id(), post.id)
        .await?;
    let report_count = state.case_study_repository.report_count(post.id).await?;

    Ok(Json(ReportResponse {
        success: outcome == ReportOutcome::Reported,
        already_reported: outcome == ReportOutcome::AlreadyReported,
        report_count,
    }))
}
