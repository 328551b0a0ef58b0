//! `profile.*` procedures

use axum::extract::State;
use common::users::User;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    extract::{Json, Query},
    middleware::AuthUser,
    models::{ProfileView, PublicUser, UpdateNameInput, UserIdQuery, case_study::CaseStudyView},
    state::AppState,
    validation,
};

/// `profile.byUserId`: public profile with the user's posts
pub async fn by_user_id(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Query(query): Query<UserIdQuery>,
) -> ApiResult<Json<ProfileView>> {
    let user = state
        .user_repository
        .find_by_id(query.user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let viewer_id = viewer.as_ref().map(AuthUser::id);
    let posts = state
        .case_study_repository
        .list_by_author(user.id, viewer_id)
        .await?;

    Ok(Json(ProfileView {
        user: PublicUser::from(&user),
        posts,
    }))
}

/// `profile.myPosts`
pub async fn my_posts(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<CaseStudyView>>> {
    let posts = state
        .case_study_repository
        .list_by_author(user.id(), Some(user.id()))
        .await?;

    Ok(Json(posts))
}

/// `profile.updateName`: the caller renames themselves
pub async fn update_name(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<UpdateNameInput>,
) -> ApiResult<Json<User>> {
    let name = input.name.trim();
    validation::validate_display_name(name).map_err(ApiError::BadRequest)?;

    let updated = state
        .user_repository
        .update_name(user.id(), name)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!("User {} changed their display name", updated.id);
    Ok(Json(updated))
}
