//! Engine facade.
//!
//! [`QuizEngine`] is the entry point for hosts. It owns a store, a clock and
//! a random source, reads the configuration once per operation and hands it
//! to the scheduler and the transition function.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ConfigPatch, EngineConfig};
use crate::course::{self, CreateCourseReport, ParsedQuestions, RawQuestion};
use crate::error::{ErrorCode, QuizError, QuizResult};
use crate::mastery::{self, AnswerOutcome, RefillTrigger, SelectedQuestion};
use crate::storage::{MemoryStore, SqliteStore};
use crate::traits::{
    AnswerCommit, Clock, CourseStore, RandomSource, RngSource, SystemClock,
};
use crate::types::{
    Course, CourseStats, CourseSummary, DomainEvent, EventRecord, EventType, Interaction, Pool,
    Question, QuestionId, QuestionState, StateUpdate,
};

/// Counts reported when a drill session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub answered: u32,
    pub correct: u32,
}

impl SessionSummary {
    /// Tally one answer.
    pub fn record(&mut self, correct: bool) {
        self.answered += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Fraction answered correctly, 0.0 when nothing was answered.
    pub fn accuracy(&self) -> f64 {
        if self.answered == 0 {
            0.0
        } else {
            self.correct as f64 / self.answered as f64
        }
    }
}

/// Spaced-repetition quiz engine.
pub struct QuizEngine {
    store: Arc<dyn CourseStore>,
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn RandomSource>>,
    initial_config: EngineConfig,
}

impl QuizEngine {
    /// Create an engine over `store` with the system clock and an
    /// entropy-seeded random source.
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            rng: Mutex::new(Box::new(RngSource::from_entropy())),
            initial_config: EngineConfig::default(),
        }
    }

    /// Build an engine from host configuration.
    pub fn from_app_config(app: &AppConfig) -> QuizResult<Self> {
        let store: Arc<dyn CourseStore> = if app.in_memory {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(SqliteStore::new(&app.db_path)?)
        };

        let mut engine = Self::new(store);
        if let Some(seed) = app.rng_seed {
            engine = engine.with_random_source(Box::new(RngSource::seeded(seed)));
        }
        if let Some(config) = &app.engine {
            config.validate()?;
            engine = engine.with_initial_config(config.clone());
        }
        Ok(engine)
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the random source used for pool and strategy draws.
    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Configuration saved to the store the first time none is found.
    pub fn with_initial_config(mut self, config: EngineConfig) -> Self {
        self.initial_config = config;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn CourseStore> {
        &self.store
    }

    // =========================================================================
    // Courses
    // =========================================================================

    /// Validate `questions` and create a course from the valid ones.
    pub async fn create_course(
        &self,
        name: &str,
        questions: Vec<RawQuestion>,
    ) -> QuizResult<CreateCourseReport> {
        let parsed = course::validate_questions(questions);
        course::create_course(self.store.as_ref(), name, parsed, self.clock.now()).await
    }

    /// Create a course from a JSON course document.
    pub async fn create_course_from_json(
        &self,
        name: &str,
        document: &str,
    ) -> QuizResult<CreateCourseReport> {
        let parsed: ParsedQuestions = course::parse_questions_json(document)?;
        course::create_course(self.store.as_ref(), name, parsed, self.clock.now()).await
    }

    pub async fn list_courses(&self) -> QuizResult<Vec<CourseSummary>> {
        self.store.list_courses().await
    }

    /// Course metadata, or not found.
    pub async fn get_course(&self, course_id: &str) -> QuizResult<Course> {
        self.store
            .get_course(course_id)
            .await?
            .ok_or_else(|| QuizError::course_not_found(course_id))
    }

    /// Send every question back to Latent and clear the course's history.
    pub async fn reset_course(&self, course_id: &str) -> QuizResult<()> {
        course::reset_course(self.store.as_ref(), course_id, self.clock.now()).await
    }

    pub async fn delete_course(&self, course_id: &str) -> QuizResult<()> {
        self.store.delete_course(course_id).await?;
        info!(course_id, "Course deleted");
        Ok(())
    }

    /// Cached per-pool counts.
    pub async fn course_stats(&self, course_id: &str) -> QuizResult<CourseStats> {
        self.store.get_course_stats(course_id).await
    }

    // =========================================================================
    // Questions
    // =========================================================================

    pub async fn get_question(&self, course_id: &str, question_id: QuestionId) -> QuizResult<Question> {
        self.store
            .get_question(course_id, question_id)
            .await?
            .ok_or_else(|| QuizError::question_not_found(course_id, question_id))
    }

    pub async fn get_question_state(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<QuestionState> {
        self.store
            .get_question_state(course_id, question_id)
            .await?
            .ok_or_else(|| QuizError::question_not_found(course_id, question_id))
    }

    pub async fn update_question_state(
        &self,
        course_id: &str,
        question_id: QuestionId,
        update: &StateUpdate,
    ) -> QuizResult<()> {
        self.store
            .update_question_state(course_id, question_id, update)
            .await
    }

    pub async fn update_question_state_with_pool_transition(
        &self,
        course_id: &str,
        question_id: QuestionId,
        update: &StateUpdate,
        from: Pool,
        to: Pool,
    ) -> QuizResult<()> {
        self.store
            .update_question_state_with_pool_transition(course_id, question_id, update, from, to)
            .await
    }

    /// Hide a question permanently. Returns `false` if it was already hidden.
    pub async fn hide_question(&self, course_id: &str, question_id: QuestionId) -> QuizResult<bool> {
        let config = self.get_config().await?;
        course::hide_question(
            self.store.as_ref(),
            course_id,
            question_id,
            &config,
            self.clock.now(),
        )
        .await
    }

    pub async fn update_notes(
        &self,
        course_id: &str,
        question_id: QuestionId,
        notes: &str,
    ) -> QuizResult<()> {
        self.store.update_notes(course_id, question_id, notes).await
    }

    pub async fn record_interaction(&self, interaction: &Interaction) -> QuizResult<()> {
        self.store.record_interaction(interaction).await
    }

    /// Every answer given to a question, oldest first.
    pub async fn get_question_history(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Vec<Interaction>> {
        self.store.get_question_history(course_id, question_id).await
    }

    /// Questions in `pool` that could be scheduled right now.
    pub async fn get_available_questions(
        &self,
        course_id: &str,
        pool: Pool,
    ) -> QuizResult<Vec<QuestionState>> {
        self.store
            .get_available_questions(course_id, pool, self.clock.now())
            .await
    }

    /// Every question in `pool`, hidden and snoozed included.
    pub async fn get_all_questions(&self, course_id: &str, pool: Pool) -> QuizResult<Vec<QuestionState>> {
        self.store.get_all_questions(course_id, pool).await
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Pick the next question to show, or `None` if everything is snoozed,
    /// hidden or not yet introduced.
    pub async fn find_next_question(&self, course_id: &str) -> QuizResult<Option<SelectedQuestion>> {
        let config = self.get_config().await?;
        let now = self.clock.now();

        let selected = {
            let mut rng = self.rng.lock().await;
            mastery::find_next_question(self.store.as_ref(), course_id, &config, &mut **rng, now)
                .await?
        };

        self.store.touch_course(course_id, now).await?;
        Ok(selected)
    }

    /// Grade `answer` for a scheduled question and persist the outcome.
    ///
    /// The state update, the interaction and any promotion or demotion
    /// event are committed together. A promotion out of Test is followed by
    /// a best-effort refill.
    pub async fn submit_answer(
        &self,
        course_id: &str,
        selected: &SelectedQuestion,
        answer: &str,
    ) -> QuizResult<AnswerOutcome> {
        if selected.question.course_id != course_id {
            return Err(QuizError::question_not_found(course_id, selected.question.id));
        }
        if !selected.question.has_option(answer) {
            return Err(QuizError::validation_with_code(
                format!(
                    "'{}' is not an option of question {}",
                    answer, selected.question.id
                ),
                ErrorCode::ValInvalidAnswer,
            ));
        }

        let config = self.get_config().await?;
        let now = self.clock.now();
        let outcome = mastery::process_answer(selected, answer, &config, now);

        let question_id = selected.state.question_id;
        let commit = AnswerCommit {
            course_id: course_id.to_string(),
            question_id,
            update: outcome.update.clone(),
            transition: outcome.transition(),
            interaction: Interaction::new(
                course_id,
                question_id,
                now,
                answer,
                outcome.correct,
                outcome.snooze_minutes,
                selected.strategy,
                outcome.old_pool,
            ),
            events: outcome
                .events
                .iter()
                .map(|e| e.to_record(course_id, now))
                .collect(),
        };
        self.store.commit_answer(&commit).await?;

        debug!(
            course_id,
            question_id,
            correct = outcome.correct,
            snooze_minutes = outcome.snooze_minutes,
            "Answer recorded"
        );
        for event in &outcome.events {
            match event {
                DomainEvent::Promotion { from, to, .. } => {
                    info!(course_id, question_id, from = %from, to = %to, "Question promoted")
                }
                DomainEvent::Demotion { from, to, .. } => {
                    info!(course_id, question_id, from = %from, to = %to, "Question demoted")
                }
            }
        }

        if outcome.needs_refill {
            // The answer is committed; find_next_question refills again if
            // this one fails.
            if let Err(err) = mastery::refill_test_pool(
                self.store.as_ref(),
                course_id,
                &config,
                RefillTrigger::Promotion,
                now,
            )
            .await
            {
                warn!(course_id, question_id, error = %err, "Refill after promotion failed");
            }
        }

        Ok(outcome)
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// The active configuration.
    ///
    /// A store without one gets the initial configuration saved first.
    pub async fn get_config(&self) -> QuizResult<EngineConfig> {
        match self.store.get_config().await {
            Ok(config) => Ok(config),
            Err(e) if e.is_not_found() => {
                debug!("No engine configuration stored, saving initial one");
                self.store.save_config(&self.initial_config).await?;
                Ok(self.initial_config.clone())
            }
            Err(e) => Err(e),
        }
    }

    /// Merge `patch` into the active configuration and save it.
    ///
    /// Takes effect on the next scheduling or answer call; existing state is
    /// not recomputed.
    pub async fn update_config(&self, patch: &ConfigPatch) -> QuizResult<EngineConfig> {
        let mut config = self.get_config().await?;
        config.apply(patch)?;
        self.store.save_config(&config).await?;
        info!("Engine configuration updated");
        Ok(config)
    }

    // =========================================================================
    // Event log
    // =========================================================================

    pub async fn log_event(
        &self,
        course_id: &str,
        event_type: EventType,
        details: serde_json::Value,
    ) -> QuizResult<EventRecord> {
        let event = EventRecord::new(course_id, event_type, details, self.clock.now());
        self.store.log_event(&event).await?;
        Ok(event)
    }

    /// A page of the course's event log, newest first.
    pub async fn get_event_log(
        &self,
        course_id: &str,
        limit: usize,
        offset: usize,
    ) -> QuizResult<Vec<EventRecord>> {
        self.store.get_event_log(course_id, limit, offset).await
    }

    pub async fn start_session(&self, course_id: &str) -> QuizResult<EventRecord> {
        let stats = self.store.get_course_stats(course_id).await?;
        let event = self
            .log_event(
                course_id,
                EventType::SessionStart,
                serde_json::json!({ "stats": stats }),
            )
            .await?;
        info!(course_id, "Session started");
        Ok(event)
    }

    pub async fn end_session(
        &self,
        course_id: &str,
        summary: SessionSummary,
    ) -> QuizResult<EventRecord> {
        let event = self
            .log_event(
                course_id,
                EventType::SessionEnd,
                serde_json::json!({
                    "answered": summary.answered,
                    "correct": summary.correct,
                    "accuracy": summary.accuracy(),
                }),
            )
            .await?;
        info!(
            course_id,
            answered = summary.answered,
            correct = summary.correct,
            "Session ended"
        );
        Ok(event)
    }

    /// Record a free-form UI interaction (skip, reveal, ...).
    pub async fn log_user_interaction(
        &self,
        course_id: &str,
        details: serde_json::Value,
    ) -> QuizResult<EventRecord> {
        self.log_event(course_id, EventType::UserInteraction, details)
            .await
    }
}
