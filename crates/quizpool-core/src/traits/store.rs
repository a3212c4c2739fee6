//! Storage contract the engine is written against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::error::QuizResult;
use crate::types::{
    Course, CourseStats, CourseSummary, EventRecord, Interaction, NewQuestion, Pool, Question,
    QuestionId, QuestionState, StateUpdate,
};

/// Everything produced by one answer, persisted as a unit.
///
/// Stores must write all of it or none of it: an answer that is abandoned
/// halfway must leave no trace.
#[derive(Debug, Clone)]
pub struct AnswerCommit {
    pub course_id: String,
    pub question_id: QuestionId,
    pub update: StateUpdate,
    /// `(from, to)` when the answer moved the question between pools.
    pub transition: Option<(Pool, Pool)>,
    pub interaction: Interaction,
    pub events: Vec<EventRecord>,
}

/// Course, question, state, interaction, event and config persistence.
///
/// Implementations serialize their own writes; the engine assumes exclusive
/// access to a course for the duration of one operation and never retries.
/// Every write that changes a question's pool also adjusts the course's
/// [`CourseStats`] in the same atomic unit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Create a course with its questions (numbered from 1) in Latent.
    ///
    /// Fails with a conflict if the name is taken; nothing is written then.
    async fn create_course(
        &self,
        name: &str,
        questions: Vec<NewQuestion>,
        now: DateTime<Utc>,
    ) -> QuizResult<Course>;

    /// Get course metadata.
    async fn get_course(&self, course_id: &str) -> QuizResult<Option<Course>>;

    /// List every course with its cached counts.
    async fn list_courses(&self) -> QuizResult<Vec<CourseSummary>>;

    /// Record that the course was used at `now`.
    async fn touch_course(&self, course_id: &str, now: DateTime<Utc>) -> QuizResult<()>;

    /// Return every question to its initial state and clear the course's
    /// interactions and events.
    async fn reset_course(&self, course_id: &str) -> QuizResult<()>;

    /// Remove the course and everything attached to it.
    async fn delete_course(&self, course_id: &str) -> QuizResult<()>;

    /// Cached per-pool counts.
    async fn get_course_stats(&self, course_id: &str) -> QuizResult<CourseStats>;

    /// Get question content.
    async fn get_question(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Option<Question>>;

    /// Get question progress state.
    async fn get_question_state(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Option<QuestionState>>;

    /// Apply a partial update that keeps the question in its pool.
    ///
    /// An update that changes the pool is rejected; use
    /// [`CourseStore::update_question_state_with_pool_transition`].
    async fn update_question_state(
        &self,
        course_id: &str,
        question_id: QuestionId,
        update: &StateUpdate,
    ) -> QuizResult<()>;

    /// Apply a partial update that moves the question from `from` to `to`,
    /// adjusting the cached counts atomically with the state write.
    async fn update_question_state_with_pool_transition(
        &self,
        course_id: &str,
        question_id: QuestionId,
        update: &StateUpdate,
        from: Pool,
        to: Pool,
    ) -> QuizResult<()>;

    /// Move a batch of questions currently in `from` to `to`.
    ///
    /// Questions not in `from` are skipped. Returns the number moved.
    async fn transition_pool(
        &self,
        course_id: &str,
        question_ids: &[QuestionId],
        from: Pool,
        to: Pool,
    ) -> QuizResult<usize>;

    /// Hide a question permanently.
    ///
    /// Returns the pool it was in, or `None` if it was already hidden.
    async fn hide_question(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Option<Pool>>;

    /// Replace a question's free-text notes.
    async fn update_notes(
        &self,
        course_id: &str,
        question_id: QuestionId,
        notes: &str,
    ) -> QuizResult<()>;

    /// Append an interaction record.
    async fn record_interaction(&self, interaction: &Interaction) -> QuizResult<()>;

    /// All interactions for a question, oldest first.
    async fn get_question_history(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Vec<Interaction>>;

    /// States in `pool` that are neither hidden nor snoozed at `now`,
    /// ordered by question id.
    async fn get_available_questions(
        &self,
        course_id: &str,
        pool: Pool,
        now: DateTime<Utc>,
    ) -> QuizResult<Vec<QuestionState>>;

    /// Every state in `pool`, hidden and snoozed included, ordered by
    /// question id.
    async fn get_all_questions(&self, course_id: &str, pool: Pool) -> QuizResult<Vec<QuestionState>>;

    /// Persist an answer's state update, count adjustment, interaction and
    /// events as one unit.
    async fn commit_answer(&self, commit: &AnswerCommit) -> QuizResult<()>;

    /// The active engine configuration. Not found if none was ever saved.
    async fn get_config(&self) -> QuizResult<EngineConfig>;

    /// Replace the engine configuration.
    async fn save_config(&self, config: &EngineConfig) -> QuizResult<()>;

    /// Append an event record.
    async fn log_event(&self, event: &EventRecord) -> QuizResult<()>;

    /// A page of the course's event log, newest first.
    async fn get_event_log(
        &self,
        course_id: &str,
        limit: usize,
        offset: usize,
    ) -> QuizResult<Vec<EventRecord>>;
}
