//! In-memory course store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{ensure_in_pool, ensure_same_pool};
use crate::config::EngineConfig;
use crate::error::{QuizError, QuizResult};
use crate::traits::{AnswerCommit, CourseStore};
use crate::types::{
    Course, CourseStats, CourseSummary, EventRecord, Interaction, NewQuestion, Pool, Question,
    QuestionId, QuestionState, StateUpdate,
};

struct CourseData {
    course: Course,
    questions: BTreeMap<QuestionId, Question>,
    states: BTreeMap<QuestionId, QuestionState>,
    stats: CourseStats,
    interactions: Vec<Interaction>,
    events: Vec<EventRecord>,
}

impl CourseData {
    fn state(&self, question_id: QuestionId) -> QuizResult<&QuestionState> {
        self.states
            .get(&question_id)
            .ok_or_else(|| QuizError::question_not_found(&self.course.id, question_id))
    }

    fn state_mut(&mut self, question_id: QuestionId) -> QuizResult<&mut QuestionState> {
        let course_id = &self.course.id;
        self.states
            .get_mut(&question_id)
            .ok_or_else(|| QuizError::question_not_found(course_id, question_id))
    }

    /// Apply an update that moves a question between pools.
    fn move_question(
        &mut self,
        question_id: QuestionId,
        update: &StateUpdate,
        from: Pool,
        to: Pool,
    ) -> QuizResult<()> {
        let course_id = self.course.id.clone();
        let state = self.state_mut(question_id)?;
        ensure_in_pool(&course_id, question_id, state, from)?;
        update.apply_to(state);
        state.pool = to;
        let hidden = state.hidden;
        if !hidden {
            self.stats.transfer(from, to, 1);
        }
        Ok(())
    }
}

#[derive(Default)]
struct Inner {
    courses: HashMap<String, CourseData>,
    config: Option<EngineConfig>,
}

impl Inner {
    fn course(&self, course_id: &str) -> QuizResult<&CourseData> {
        self.courses
            .get(course_id)
            .ok_or_else(|| QuizError::course_not_found(course_id))
    }

    fn course_mut(&mut self, course_id: &str) -> QuizResult<&mut CourseData> {
        self.courses
            .get_mut(course_id)
            .ok_or_else(|| QuizError::course_not_found(course_id))
    }
}

/// [`CourseStore`] that keeps everything in process memory.
///
/// Each operation takes the lock once, so every write is atomic with respect
/// to other callers.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        debug!("Creating in-memory course store");
        Self::default()
    }

    /// A store with `config` already saved.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                courses: HashMap::new(),
                config: Some(config),
            }),
        }
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn create_course(
        &self,
        name: &str,
        questions: Vec<NewQuestion>,
        now: DateTime<Utc>,
    ) -> QuizResult<Course> {
        let mut inner = self.inner.write().await;
        if inner.courses.values().any(|c| c.course.name == name) {
            return Err(QuizError::duplicate_course(name));
        }

        let course = Course::new(name, now);
        let mut data = CourseData {
            course: course.clone(),
            questions: BTreeMap::new(),
            states: BTreeMap::new(),
            stats: CourseStats::with_latent(questions.len() as u32),
            interactions: Vec::new(),
            events: Vec::new(),
        };
        for (id, new) in (1..).zip(questions) {
            data.questions
                .insert(id, Question::from_new(&course.id, id, new));
            data.states.insert(id, QuestionState::new(id));
        }
        inner.courses.insert(course.id.clone(), data);
        Ok(course)
    }

    async fn get_course(&self, course_id: &str) -> QuizResult<Option<Course>> {
        let inner = self.inner.read().await;
        Ok(inner.courses.get(course_id).map(|c| c.course.clone()))
    }

    async fn list_courses(&self) -> QuizResult<Vec<CourseSummary>> {
        let inner = self.inner.read().await;
        let mut courses: Vec<CourseSummary> = inner
            .courses
            .values()
            .map(|c| CourseSummary::new(c.course.clone(), c.stats))
            .collect();
        courses.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(courses)
    }

    async fn touch_course(&self, course_id: &str, now: DateTime<Utc>) -> QuizResult<()> {
        let mut inner = self.inner.write().await;
        inner.course_mut(course_id)?.course.last_accessed = Some(now);
        Ok(())
    }

    async fn reset_course(&self, course_id: &str) -> QuizResult<()> {
        let mut inner = self.inner.write().await;
        let data = inner.course_mut(course_id)?;
        data.states.values_mut().for_each(QuestionState::reset);
        data.stats = CourseStats::with_latent(data.states.len() as u32);
        data.interactions.clear();
        data.events.clear();
        Ok(())
    }

    async fn delete_course(&self, course_id: &str) -> QuizResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .courses
            .remove(course_id)
            .map(|_| ())
            .ok_or_else(|| QuizError::course_not_found(course_id))
    }

    async fn get_course_stats(&self, course_id: &str) -> QuizResult<CourseStats> {
        let inner = self.inner.read().await;
        Ok(inner.course(course_id)?.stats)
    }

    async fn get_question(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Option<Question>> {
        let inner = self.inner.read().await;
        Ok(inner.course(course_id)?.questions.get(&question_id).cloned())
    }

    async fn get_question_state(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Option<QuestionState>> {
        let inner = self.inner.read().await;
        Ok(inner.course(course_id)?.states.get(&question_id).cloned())
    }

    async fn update_question_state(
        &self,
        course_id: &str,
        question_id: QuestionId,
        update: &StateUpdate,
    ) -> QuizResult<()> {
        let mut inner = self.inner.write().await;
        let state = inner.course_mut(course_id)?.state_mut(question_id)?;
        ensure_same_pool(state, update)?;
        update.apply_to(state);
        Ok(())
    }

    async fn update_question_state_with_pool_transition(
        &self,
        course_id: &str,
        question_id: QuestionId,
        update: &StateUpdate,
        from: Pool,
        to: Pool,
    ) -> QuizResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .course_mut(course_id)?
            .move_question(question_id, update, from, to)
    }

    async fn transition_pool(
        &self,
        course_id: &str,
        question_ids: &[QuestionId],
        from: Pool,
        to: Pool,
    ) -> QuizResult<usize> {
        let mut inner = self.inner.write().await;
        let data = inner.course_mut(course_id)?;
        let mut moved = 0u32;
        for id in question_ids {
            if let Some(state) = data.states.get_mut(id) {
                if state.pool == from && !state.hidden {
                    state.pool = to;
                    moved += 1;
                }
            }
        }
        data.stats.transfer(from, to, moved);
        Ok(moved as usize)
    }

    async fn hide_question(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Option<Pool>> {
        let mut inner = self.inner.write().await;
        let data = inner.course_mut(course_id)?;
        let state = data.state_mut(question_id)?;
        if state.hidden {
            return Ok(None);
        }
        state.hidden = true;
        let pool = state.pool;
        data.stats.remove(pool);
        Ok(Some(pool))
    }

    async fn update_notes(
        &self,
        course_id: &str,
        question_id: QuestionId,
        notes: &str,
    ) -> QuizResult<()> {
        let mut inner = self.inner.write().await;
        inner.course_mut(course_id)?.state_mut(question_id)?.notes = notes.to_string();
        Ok(())
    }

    async fn record_interaction(&self, interaction: &Interaction) -> QuizResult<()> {
        let mut inner = self.inner.write().await;
        let data = inner.course_mut(&interaction.course_id)?;
        data.state(interaction.question_id)?;
        data.interactions.push(interaction.clone());
        Ok(())
    }

    async fn get_question_history(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Vec<Interaction>> {
        let inner = self.inner.read().await;
        let mut history: Vec<Interaction> = inner
            .course(course_id)?
            .interactions
            .iter()
            .filter(|i| i.question_id == question_id)
            .cloned()
            .collect();
        history.sort_by_key(|i| i.timestamp);
        Ok(history)
    }

    async fn get_available_questions(
        &self,
        course_id: &str,
        pool: Pool,
        now: DateTime<Utc>,
    ) -> QuizResult<Vec<QuestionState>> {
        let inner = self.inner.read().await;
        Ok(inner
            .course(course_id)?
            .states
            .values()
            .filter(|s| s.pool == pool && s.is_available(now))
            .cloned()
            .collect())
    }

    async fn get_all_questions(&self, course_id: &str, pool: Pool) -> QuizResult<Vec<QuestionState>> {
        let inner = self.inner.read().await;
        Ok(inner
            .course(course_id)?
            .states
            .values()
            .filter(|s| s.pool == pool)
            .cloned()
            .collect())
    }

    async fn commit_answer(&self, commit: &AnswerCommit) -> QuizResult<()> {
        let mut inner = self.inner.write().await;
        let data = inner.course_mut(&commit.course_id)?;

        // Validate before touching anything so a failure writes nothing.
        let state = data.state(commit.question_id)?;
        match commit.transition {
            Some((from, _)) => ensure_in_pool(&commit.course_id, commit.question_id, state, from)?,
            None => ensure_same_pool(state, &commit.update)?,
        }

        match commit.transition {
            Some((from, to)) => data.move_question(commit.question_id, &commit.update, from, to)?,
            None => commit.update.apply_to(data.state_mut(commit.question_id)?),
        }
        data.interactions.push(commit.interaction.clone());
        data.events.extend(commit.events.iter().cloned());
        Ok(())
    }

    async fn get_config(&self) -> QuizResult<EngineConfig> {
        let inner = self.inner.read().await;
        inner.config.clone().ok_or_else(QuizError::config_not_found)
    }

    async fn save_config(&self, config: &EngineConfig) -> QuizResult<()> {
        let mut inner = self.inner.write().await;
        inner.config = Some(config.clone());
        Ok(())
    }

    async fn log_event(&self, event: &EventRecord) -> QuizResult<()> {
        let mut inner = self.inner.write().await;
        inner.course_mut(&event.course_id)?.events.push(event.clone());
        Ok(())
    }

    async fn get_event_log(
        &self,
        course_id: &str,
        limit: usize,
        offset: usize,
    ) -> QuizResult<Vec<EventRecord>> {
        let inner = self.inner.read().await;
        // Appended in time order; a stable sort keeps insertion order on ties.
        let mut events: Vec<&EventRecord> = inner.course(course_id)?.events.iter().collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events
            .into_iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
