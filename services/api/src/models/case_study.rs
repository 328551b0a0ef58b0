//! Case study models for the API service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Feed a case study is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Prompt,
    Automation,
    Tools,
    Business,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Prompt,
        Category::Automation,
        Category::Tools,
        Category::Business,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Prompt => "prompt",
            Category::Automation => "automation",
            Category::Tools => "tools",
            Category::Business => "business",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// Case study row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudy {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub tools: Vec<String>,
    pub steps: Vec<String>,
    pub tags: Vec<String>,
    pub challenge: String,
    pub solution: String,
    pub impact: String,
    pub is_recommended: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Case study joined with its author and annotated for the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyView {
    #[serde(flatten)]
    pub case_study: CaseStudy,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub favorite_count: i64,
    pub report_count: i64,
    pub is_favorite: bool,
    pub is_reported: bool,
}

/// Writable fields of a case study
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub challenge: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub impact: String,
}

impl CaseStudyDraft {
    /// Trim text fields and drop blank list entries
    pub fn normalized(self) -> Self {
        fn clean(items: Vec<String>) -> Vec<String> {
            items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        }

        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category,
            tools: clean(self.tools),
            steps: clean(self.steps),
            tags: clean(self.tags),
            challenge: self.challenge.trim().to_string(),
            solution: self.solution.trim().to_string(),
            impact: self.impact.trim().to_string(),
        }
    }

    /// Apply a partial update on top of an existing post
    pub fn merged(existing: &CaseStudy, update: UpdateCaseStudyInput) -> Self {
        Self {
            title: update.title.unwrap_or_else(|| existing.title.clone()),
            description: update
                .description
                .unwrap_or_else(|| existing.description.clone()),
            category: update.category.unwrap_or(existing.category),
            tools: update.tools.unwrap_or_else(|| existing.tools.clone()),
            steps: update.steps.unwrap_or_else(|| existing.steps.clone()),
            tags: update.tags.unwrap_or_else(|| existing.tags.clone()),
            challenge: update.challenge.unwrap_or_else(|| existing.challenge.clone()),
            solution: update.solution.unwrap_or_else(|| existing.solution.clone()),
            impact: update.impact.unwrap_or_else(|| existing.impact.clone()),
        }
    }
}

/// Partial update of a case study
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCaseStudyInput {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub tools: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub challenge: Option<String>,
    pub solution: Option<String>,
    pub impact: Option<String>,
}

/// Input naming a single case study
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyIdInput {
    pub id: i64,
}

/// Query parameters for the case study feed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCaseStudiesQuery {
    pub category: Option<Category>,
}

/// Input for the recommended flag
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRecommendedInput {
    pub id: i64,
    pub recommended: bool,
}

/// Result of a favorite toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}

/// Result of a report attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Reported,
    AlreadyReported,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFavoriteResponse {
    pub is_favorite: bool,
    pub favorite_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub success: bool,
    pub already_reported: bool,
    pub report_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_through_text() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        assert!("marketing".parse::<Category>().is_err());
    }

    #[test]
    fn test_draft_deserializes_with_defaults() {
        let draft: CaseStudyDraft = serde_json::from_value(serde_json::json!({
            "title": "Prompt chaining",
            "description": "Splitting a long task",
            "category": "prompt"
        }))
        .unwrap();

        assert_eq!(draft.category, Category::Prompt);
        assert!(draft.tools.is_empty());
        assert!(draft.impact.is_empty());
    }

    #[test]
    fn test_normalized_trims_and_drops_blanks() {
        let draft = CaseStudyDraft {
            title: "  Title ".to_string(),
            description: "desc\n".to_string(),
            category: Category::Tools,
            tools: vec![" ChatGPT ".to_string(), "   ".to_string()],
            steps: vec![],
            tags: vec!["".to_string(), "ai".to_string()],
            challenge: String::new(),
            solution: String::new(),
            impact: String::new(),
        }
        .normalized();

        assert_eq!(draft.title, "Title");
        assert_eq!(draft.description, "desc");
        assert_eq!(draft.tools, vec!["ChatGPT".to_string()]);
        assert_eq!(draft.tags, vec!["ai".to_string()]);
    }
}
