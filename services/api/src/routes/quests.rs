//! `quests.*` procedures

use axum::extract::State;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    extract::{Json, Query},
    middleware::AuthUser,
    models::quest::{
        AnswerQuestInput, CloseOutcome, CloseQuestInput, CloseQuestResponse, CreateQuestInput,
        ListQuestsQuery, Quest, QuestAnswer, QuestDetail, QuestIdQuery, QuestStatus, QuestView,
    },
    state::AppState,
    validation,
};

/// `quests.list`: the board, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuestsQuery>,
) -> ApiResult<Json<Vec<QuestView>>> {
    match state.quest_repository.list(query.status).await {
        Ok(items) => Ok(Json(items)),
        Err(e) if e.is_unavailable() => {
            warn!("Quest board served empty, store unavailable: {}", e);
            Ok(Json(Vec::new()))
        }
        Err(e) => Err(e.into()),
    }
}

/// `quests.getById`: the quest and its answers
pub async fn get_by_id(
    State(state): State<AppState>,
    Query(query): Query<QuestIdQuery>,
) -> ApiResult<Json<QuestDetail>> {
    let quest = state
        .quest_repository
        .get_view(query.id)
        .await?
        .ok_or(ApiError::NotFound("Quest"))?;
    let answers = state.quest_repository.answers(query.id).await?;

    Ok(Json(QuestDetail { quest, answers }))
}

/// `quests.create`
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateQuestInput>,
) -> ApiResult<Json<Quest>> {
    let title = input.title.trim();
    let content = input.content.trim();
    validation::validate_quest(title, content).map_err(ApiError::BadRequest)?;

    let quest = state
        .quest_repository
        .create(user.id(), title, content)
        .await?;

    Ok(Json(quest))
}

/// `quests.answer`: only while the quest is open
pub async fn answer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<AnswerQuestInput>,
) -> ApiResult<Json<QuestAnswer>> {
    let content = input.content.trim();
    validation::validate_answer(content).map_err(ApiError::BadRequest)?;

    let quest = state
        .quest_repository
        .find_by_id(input.quest_id)
        .await?
        .ok_or(ApiError::NotFound("Quest"))?;

    if quest.status.is_terminal() {
        return Err(closed_quest());
    }

    // The quest can close between the read above and the insert.
    let answer = state
        .quest_repository
        .add_answer(quest.id, user.id(), content)
        .await?
        .ok_or_else(closed_quest)?;

    Ok(Json(answer))
}

/// `quests.close`: the author moves an open quest to a terminal status.
///
/// `finished` names the answer that solved the quest, which must belong to
/// it. Closing an already closed quest changes nothing and says so.
pub async fn close(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CloseQuestInput>,
) -> ApiResult<Json<CloseQuestResponse>> {
    let quest = state
        .quest_repository
        .find_by_id(input.quest_id)
        .await?
        .ok_or(ApiError::NotFound("Quest"))?;

    if quest.user_id != user.id() {
        return Err(ApiError::Forbidden("only the author can close a quest"));
    }

    if input.status == QuestStatus::Open {
        return Err(ApiError::BadRequest(
            "Choose finished, suspended or unsolved to close a quest".to_string(),
        ));
    }

    let outcome = if quest.status.is_terminal() {
        CloseOutcome::AlreadyClosed
    } else {
        let solved_answer = match input.status {
            QuestStatus::Finished => {
                Some(solved_answer(&state, &quest, input.solved_answer_id).await?)
            }
            _ => None,
        };

        state
            .quest_repository
            .close(quest.id, input.status, solved_answer.as_ref())
            .await?
    };

    if outcome == CloseOutcome::AlreadyClosed {
        info!("Quest {} was already closed", quest.id);
    }

    let view = state
        .quest_repository
        .get_view(quest.id)
        .await?
        .ok_or(ApiError::NotFound("Quest"))?;

    Ok(Json(CloseQuestResponse {
        success: outcome == CloseOutcome::Closed,
        already_closed: outcome == CloseOutcome::AlreadyClosed,
        quest: view,
    }))
}

async fn solved_answer(
    state: &AppState,
    quest: &Quest,
    answer_id: Option<i64>,
) -> ApiResult<QuestAnswer> {
    if state.quest_repository.answer_count(quest.id).await? == 0 {
        return Err(ApiError::BadRequest(
            "A quest without answers cannot be finished".to_string(),
        ));
    }

    let answer_id = answer_id.ok_or_else(|| {
        ApiError::BadRequest("Pick the answer that solved the quest".to_string())
    })?;

    match state.quest_repository.find_answer(answer_id).await? {
        Some(answer) if answer.quest_id == quest.id => Ok(answer),
        _ => Err(ApiError::BadRequest(
            "The chosen answer does not belong to this quest".to_string(),
        )),
    }
}

fn closed_quest() -> ApiError {
    ApiError::BadRequest("This quest is closed".to_string())
}
