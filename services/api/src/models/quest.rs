//! Quest board models for the API service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a quest. `Open` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    Open,
    Finished,
    Suspended,
    Unsolved,
}

impl QuestStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::Open => "open",
            QuestStatus::Finished => "finished",
            QuestStatus::Suspended => "suspended",
            QuestStatus::Unsolved => "unsolved",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        !matches!(self, QuestStatus::Open)
    }
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(QuestStatus::Open),
            "finished" => Ok(QuestStatus::Finished),
            "suspended" => Ok(QuestStatus::Suspended),
            "unsolved" => Ok(QuestStatus::Unsolved),
            other => Err(format!("unknown quest status '{}'", other)),
        }
    }
}

/// Quest row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub status: QuestStatus,
    pub solved_answer_id: Option<i64>,
    pub solver_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Quest joined with its author and answer count
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestView {
    #[serde(flatten)]
    pub quest: Quest,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub answer_count: i64,
}

/// Answer row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestAnswer {
    pub id: i64,
    pub quest_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Answer joined with its author
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestAnswerView {
    #[serde(flatten)]
    pub answer: QuestAnswer,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
}

/// A quest with its answers, oldest answer first
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestDetail {
    pub quest: QuestView,
    pub answers: Vec<QuestAnswerView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestInput {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerQuestInput {
    pub quest_id: i64,
    pub content: String,
}

/// Closing request. `solved_answer_id` is required for `finished` and
/// ignored for the other outcomes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseQuestInput {
    pub quest_id: i64,
    pub status: QuestStatus,
    pub solved_answer_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuestIdQuery {
    pub id: i64,
}

/// Query parameters for the quest board
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListQuestsQuery {
    pub status: Option<QuestStatus>,
}

/// Result of a close attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    AlreadyClosed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseQuestResponse {
    pub success: bool,
    pub already_closed: bool,
    pub quest: QuestView,
}
