//! Question content and per-question progress state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Pool;

/// Identifier of a question within its course. Numbered from 1 in load order.
pub type QuestionId = u32;

/// A validated question ready to be stored in a new course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: String,
    pub explanation: String,
}

/// Immutable multiple-choice question content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub course_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: String,
    pub explanation: String,
}

impl Question {
    /// Build stored content from a validated input question.
    pub fn from_new(course_id: impl Into<String>, id: QuestionId, new: NewQuestion) -> Self {
        Self {
            id,
            course_id: course_id.into(),
            question: new.question,
            options: new.options,
            correct_option: new.correct_option,
            explanation: new.explanation,
        }
    }

    /// Whether `answer` is exactly the designated correct option.
    pub fn is_correct(&self, answer: &str) -> bool {
        answer == self.correct_option
    }

    /// Whether `answer` is one of this question's options.
    pub fn has_option(&self, answer: &str) -> bool {
        self.options.iter().any(|o| o == answer)
    }
}

/// Mutable progress record, one per question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionState {
    pub question_id: QuestionId,
    pub pool: Pool,
    /// `None` means never shown.
    pub last_shown: Option<DateTime<Utc>>,
    /// `None` means not snoozed.
    pub snooze_until: Option<DateTime<Utc>>,
    /// Permanently excluded from scheduling once set.
    pub hidden: bool,
    #[serde(default)]
    pub notes: String,
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
    pub total_interactions: u32,
    /// Fell out of Learned or Master on a wrong answer and has not been
    /// promoted since.
    pub was_demoted: bool,
}

impl QuestionState {
    /// Initial state: Latent, never shown, all counters zero.
    pub fn new(question_id: QuestionId) -> Self {
        Self {
            question_id,
            pool: Pool::Latent,
            last_shown: None,
            snooze_until: None,
            hidden: false,
            notes: String::new(),
            consecutive_correct: 0,
            consecutive_incorrect: 0,
            total_interactions: 0,
            was_demoted: false,
        }
    }

    /// Whether the question is cooling down at `now`.
    pub fn is_snoozed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.snooze_until, Some(until) if until > now)
    }

    /// Eligible for scheduling: not hidden and not snoozed.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        !self.hidden && !self.is_snoozed(now)
    }

    /// Return to the initial state, as done by a course reset.
    pub fn reset(&mut self) {
        *self = Self::new(self.question_id);
    }
}

/// Partial update of a [`QuestionState`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<Pool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_shown: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snooze_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consecutive_correct: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consecutive_incorrect: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_interactions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_demoted: Option<bool>,
}

impl StateUpdate {
    /// Apply the set fields to `state`.
    pub fn apply_to(&self, state: &mut QuestionState) {
        if let Some(pool) = self.pool {
            state.pool = pool;
        }
        if let Some(last_shown) = self.last_shown {
            state.last_shown = Some(last_shown);
        }
        if let Some(snooze_until) = self.snooze_until {
            state.snooze_until = Some(snooze_until);
        }
        if let Some(n) = self.consecutive_correct {
            state.consecutive_correct = n;
        }
        if let Some(n) = self.consecutive_incorrect {
            state.consecutive_incorrect = n;
        }
        if let Some(n) = self.total_interactions {
            state.total_interactions = n;
        }
        if let Some(flag) = self.was_demoted {
            state.was_demoted = flag;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_state_is_latent_and_zeroed() {
        let state = QuestionState::new(7);
        assert_eq!(state.question_id, 7);
        assert_eq!(state.pool, Pool::Latent);
        assert!(state.last_shown.is_none());
        assert!(state.snooze_until.is_none());
        assert!(!state.hidden);
        assert_eq!(state.total_interactions, 0);
        assert!(!state.was_demoted);
    }

    #[test]
    fn test_availability_respects_snooze_boundary() {
        let now = Utc::now();
        let mut state = QuestionState::new(1);
        assert!(state.is_available(now));

        state.snooze_until = Some(now + Duration::minutes(5));
        assert!(!state.is_available(now));

        // snooze_until == now is already eligible
        state.snooze_until = Some(now);
        assert!(state.is_available(now));

        state.snooze_until = None;
        state.hidden = true;
        assert!(!state.is_available(now));
    }

    #[test]
    fn test_update_only_touches_set_fields() {
        let mut state = QuestionState::new(1);
        state.notes = "keep me".to_string();
        state.consecutive_incorrect = 3;

        let update = StateUpdate {
            pool: Some(Pool::Test),
            consecutive_correct: Some(2),
            ..Default::default()
        };
        update.apply_to(&mut state);

        assert_eq!(state.pool, Pool::Test);
        assert_eq!(state.consecutive_correct, 2);
        assert_eq!(state.consecutive_incorrect, 3);
        assert_eq!(state.notes, "keep me");
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut state = QuestionState::new(4);
        state.pool = Pool::Master;
        state.hidden = true;
        state.notes = "tricky".to_string();
        state.total_interactions = 12;
        state.reset();
        assert_eq!(state, QuestionState::new(4));
    }

    #[test]
    fn test_question_correctness_is_exact() {
        let q = Question::from_new(
            "c1",
            1,
            NewQuestion {
                question: "2 + 2?".to_string(),
                options: vec!["3".to_string(), "4".to_string()],
                correct_option: "4".to_string(),
                explanation: "arithmetic".to_string(),
            },
        );
        assert!(q.is_correct("4"));
        assert!(!q.is_correct("4 "));
        assert!(q.has_option("3"));
        assert!(!q.has_option("5"));
    }
}
