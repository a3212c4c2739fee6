//! Course document parsing and per-question validation.
//!
//! A course document is a JSON array of question objects:
//!
//! ```json
//! [
//!   {
//!     "index": 1,
//!     "question": "Capital of France?",
//!     "options": ["Paris", "Lyon"],
//!     "correct_option": "Paris",
//!     "explanation": "Paris has been the capital since 987."
//!   }
//! ]
//! ```
//!
//! `index` is tolerated and ignored. Entries that fail validation are
//! skipped and reported; they never fail the whole document.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ErrorCode, QuizError, QuizResult};
use crate::types::NewQuestion;

/// A question entry as it appears in a course document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_option: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    /// Position hint some exporters write. Not used.
    #[serde(default, skip_serializing)]
    pub index: Option<serde_json::Value>,
}

impl From<NewQuestion> for RawQuestion {
    fn from(q: NewQuestion) -> Self {
        Self {
            question: Some(q.question),
            options: Some(q.options),
            correct_option: Some(q.correct_option),
            explanation: Some(q.explanation),
            index: None,
        }
    }
}

/// Why an input entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Zero-based position in the input list.
    pub index: usize,
    pub reason: String,
}

impl ValidationIssue {
    fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

/// Valid questions in input order plus the entries that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuestions {
    pub questions: Vec<NewQuestion>,
    pub errors: Vec<ValidationIssue>,
}

/// Check one entry. Returns the validated question or the first rule it breaks.
pub fn validate_question(raw: RawQuestion) -> Result<NewQuestion, String> {
    let question = raw.question.unwrap_or_default();
    if question.trim().is_empty() {
        return Err("question text is empty".to_string());
    }

    let options = raw.options.unwrap_or_default();
    if options.len() < 2 {
        return Err(format!(
            "at least 2 options are required, found {}",
            options.len()
        ));
    }
    let mut seen = HashSet::with_capacity(options.len());
    if let Some(dup) = options.iter().find(|o| !seen.insert(o.as_str())) {
        return Err(format!("duplicate option '{dup}'"));
    }

    let correct_option = match raw.correct_option {
        Some(c) if !c.is_empty() => c,
        _ => return Err("correct_option is missing".to_string()),
    };
    if !options.iter().any(|o| *o == correct_option) {
        return Err(format!(
            "correct_option '{correct_option}' does not match any option"
        ));
    }

    let explanation = match raw.explanation {
        Some(e) if !e.trim().is_empty() => e,
        _ => return Err("explanation is missing".to_string()),
    };

    Ok(NewQuestion {
        question,
        options,
        correct_option,
        explanation,
    })
}

/// Validate a list of entries, keeping the valid ones in order.
pub fn validate_questions(raw: impl IntoIterator<Item = RawQuestion>) -> ParsedQuestions {
    let mut parsed = ParsedQuestions::default();
    for (index, entry) in raw.into_iter().enumerate() {
        match validate_question(entry) {
            Ok(q) => parsed.questions.push(q),
            Err(reason) => {
                warn!(index, reason = %reason, "Skipping invalid question");
                parsed.errors.push(ValidationIssue::new(index, reason));
            }
        }
    }
    parsed
}

/// Parse and validate a course document.
///
/// Fails only when the text is not JSON or its root is not an array.
/// Entries with the wrong shape (e.g. `options` not a list of strings) are
/// reported as issues like any other invalid entry.
pub fn parse_questions_json(text: &str) -> QuizResult<ParsedQuestions> {
    let root: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        QuizError::validation_with_code(
            format!("Course document is not valid JSON: {e}"),
            ErrorCode::ValInvalidFormat,
        )
    })?;

    let serde_json::Value::Array(entries) = root else {
        return Err(QuizError::validation_with_suggestion(
            "Course document root must be a JSON array",
            "Wrap the question objects in [ ... ]",
        ));
    };

    let mut parsed = ParsedQuestions::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let outcome = serde_json::from_value::<RawQuestion>(entry)
            .map_err(|e| format!("malformed entry: {e}"))
            .and_then(validate_question);
        match outcome {
            Ok(q) => parsed.questions.push(q),
            Err(reason) => {
                warn!(index, reason = %reason, "Skipping invalid question");
                parsed.errors.push(ValidationIssue::new(index, reason));
            }
        }
    }
    Ok(parsed)
}
