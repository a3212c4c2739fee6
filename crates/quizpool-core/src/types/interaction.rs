//! Append-only answer log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Pool, QuestionId, SelectionStrategy};

/// One answer submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub course_id: String,
    pub question_id: QuestionId,
    pub timestamp: DateTime<Utc>,
    pub answer_given: String,
    pub correct: bool,
    /// Snooze applied by this answer, in minutes.
    pub snooze_minutes: i64,
    /// Strategy that selected the question.
    pub strategy: SelectionStrategy,
    /// Pool the question was in when answered.
    pub pool: Pool,
}

impl Interaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        course_id: impl Into<String>,
        question_id: QuestionId,
        timestamp: DateTime<Utc>,
        answer_given: impl Into<String>,
        correct: bool,
        snooze_minutes: i64,
        strategy: SelectionStrategy,
        pool: Pool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            course_id: course_id.into(),
            question_id,
            timestamp,
            answer_given: answer_given.into(),
            correct,
            snooze_minutes,
            strategy,
            pool,
        }
    }
}
