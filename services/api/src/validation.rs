//! Input validation utilities
//!
//! Every mutation validates its input here before the store is touched.
//! Errors are short, user-facing sentences.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::case_study::CaseStudyDraft;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 1_000;
pub const MAX_BODY_CHARS: usize = 10_000;
pub const MAX_NAME_CHARS: usize = 50;

const MAX_TOOLS: usize = 20;
const MAX_STEPS: usize = 30;
const MAX_TAGS: usize = 10;
const MAX_TOOL_CHARS: usize = 100;
const MAX_STEP_CHARS: usize = 1_000;
const MAX_TAG_CHARS: usize = 30;

/// Validate a required free-text field
pub fn validate_text(field: &str, value: &str, max_chars: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }

    validate_length(field, value, max_chars)
}

fn validate_length(field: &str, value: &str, max_chars: usize) -> Result<(), String> {
    if value.chars().count() > max_chars {
        return Err(format!(
            "{} must be at most {} characters long",
            field, max_chars
        ));
    }

    Ok(())
}

fn validate_list(
    field: &str,
    items: &[String],
    max_items: usize,
    max_chars: usize,
) -> Result<(), String> {
    if items.len() > max_items {
        return Err(format!("{} can have at most {} entries", field, max_items));
    }

    for item in items {
        if item.trim().is_empty() {
            return Err(format!("{} cannot contain empty entries", field));
        }
        validate_length(field, item, max_chars)?;
    }

    Ok(())
}

/// Validate a display name
pub fn validate_display_name(name: &str) -> Result<(), String> {
    let name = name.trim();

    if name.is_empty() {
        return Err("Name is required".to_string());
    }

    if name.chars().count() > MAX_NAME_CHARS {
        return Err(format!(
            "Name must be at most {} characters long",
            MAX_NAME_CHARS
        ));
    }

    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NAME_REGEX
        .get_or_init(|| Regex::new(r"^[^\p{Cc}\p{Cf}]+$").expect("Failed to compile name regex"));

    if !regex.is_match(name) {
        return Err("Name cannot contain control characters".to_string());
    }

    Ok(())
}

/// Validate a case study about to be written
pub fn validate_case_study(draft: &CaseStudyDraft) -> Result<(), String> {
    validate_text("Title", &draft.title, MAX_TITLE_CHARS)?;
    validate_text("Description", &draft.description, MAX_DESCRIPTION_CHARS)?;
    validate_length("Challenge", &draft.challenge, MAX_BODY_CHARS)?;
    validate_length("Solution", &draft.solution, MAX_BODY_CHARS)?;
    validate_length("Impact", &draft.impact, MAX_BODY_CHARS)?;
    validate_list("Tools", &draft.tools, MAX_TOOLS, MAX_TOOL_CHARS)?;
    validate_list("Steps", &draft.steps, MAX_STEPS, MAX_STEP_CHARS)?;
    validate_list("Tags", &draft.tags, MAX_TAGS, MAX_TAG_CHARS)?;

    Ok(())
}

/// Validate a quest before it is opened
pub fn validate_quest(title: &str, content: &str) -> Result<(), String> {
    validate_text("Title", title, MAX_TITLE_CHARS)?;
    validate_text("Question", content, MAX_BODY_CHARS)
}

/// Validate an answer body
pub fn validate_answer(content: &str) -> Result<(), String> {
    validate_text("Answer", content, MAX_BODY_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::case_study::Category;

    fn draft() -> CaseStudyDraft {
        CaseStudyDraft {
            title: "Weekly report automation".to_string(),
            description: "Generating the weekly sales report".to_string(),
            category: Category::Automation,
            tools: vec!["ChatGPT".to_string()],
            steps: vec!["Export CSV".to_string(), "Summarize".to_string()],
            tags: vec!["sales".to_string()],
            challenge: "Took three hours".to_string(),
            solution: "Prompt template".to_string(),
            impact: "Twenty minutes now".to_string(),
        }
    }

    #[test]
    fn test_valid_case_study() {
        assert!(validate_case_study(&draft()).is_ok());
    }

    #[test]
    fn test_case_study_requires_title_and_description() {
        let mut missing_title = draft();
        missing_title.title = "   ".to_string();
        assert_eq!(
            validate_case_study(&missing_title),
            Err("Title is required".to_string())
        );

        let mut missing_description = draft();
        missing_description.description = String::new();
        assert!(validate_case_study(&missing_description).is_err());
    }

    #[test]
    fn test_case_study_limits() {
        let mut long_title = draft();
        long_title.title = "x".repeat(MAX_TITLE_CHARS + 1);
        assert!(validate_case_study(&long_title).is_err());

        let mut too_many_tags = draft();
        too_many_tags.tags = (0..=MAX_TAGS).map(|i| format!("tag{}", i)).collect();
        assert!(validate_case_study(&too_many_tags).is_err());

        let mut blank_step = draft();
        blank_step.steps.push(" ".to_string());
        assert!(validate_case_study(&blank_step).is_err());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let title = "あ".repeat(MAX_TITLE_CHARS);
        assert!(validate_text("Title", &title, MAX_TITLE_CHARS).is_ok());
    }

    #[test]
    fn test_display_name() {
        assert!(validate_display_name("Ada Lovelace").is_ok());
        assert!(validate_display_name("  ").is_err());
        assert!(validate_display_name(&"n".repeat(MAX_NAME_CHARS + 1)).is_err());
        assert!(validate_display_name("bad\u{0007}name").is_err());
    }

    #[test]
    fn test_quest_and_answer() {
        assert!(validate_quest("How do I chain prompts?", "Details").is_ok());
        assert!(validate_quest("", "Details").is_err());
        assert!(validate_answer("").is_err());
        assert!(validate_answer(&"a".repeat(MAX_BODY_CHARS + 1)).is_err());
    }
}
