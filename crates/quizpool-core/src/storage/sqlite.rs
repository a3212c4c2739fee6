//! SQLite-backed course store.
//!
//! One connection behind a mutex. Timestamps are stored as fixed-width
//! RFC 3339 text (nanosecond precision, `Z` suffix) so string comparison in
//! SQL matches chronological order. Multi-row writes run in a transaction.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{ensure_in_pool, ensure_same_pool};
use crate::config::EngineConfig;
use crate::error::{QuizError, QuizResult};
use crate::traits::{AnswerCommit, CourseStore};
use crate::types::{
    Course, CourseStats, CourseSummary, EventRecord, Interaction, NewQuestion, Pool, Question,
    QuestionId, QuestionState, StateUpdate,
};

const STATE_COLUMNS: &str = "question_id, pool, last_shown, snooze_until, hidden, notes,
     consecutive_correct, consecutive_incorrect, total_interactions, was_demoted";

const INTERACTION_COLUMNS: &str =
    "id, course_id, question_id, timestamp, answer_given, correct, snooze_minutes, strategy, pool";

/// Persistent [`CourseStore`].
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// Missing parent directories are created.
    pub fn new<P: AsRef<Path>>(path: P) -> QuizResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening SQLite course store");
        Connection::open(path)
            .and_then(Self::from_connection)
            .map_err(|e| QuizError::connection_failed(path.display().to_string(), e))
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> QuizResult<Self> {
        Connection::open_in_memory()
            .and_then(Self::from_connection)
            .map_err(|e| QuizError::connection_failed(":memory:", e))
    }

    fn from_connection(conn: Connection) -> rusqlite::Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> QuizResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| QuizError::database(e.to_string()))
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            last_accessed TEXT,
            latent_count INTEGER NOT NULL DEFAULT 0,
            test_count INTEGER NOT NULL DEFAULT 0,
            learned_count INTEGER NOT NULL DEFAULT 0,
            master_count INTEGER NOT NULL DEFAULT 0,
            total_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS questions (
            course_id TEXT NOT NULL,
            id INTEGER NOT NULL,
            question TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_option TEXT NOT NULL,
            explanation TEXT NOT NULL,
            PRIMARY KEY (course_id, id)
        );

        CREATE TABLE IF NOT EXISTS question_states (
            course_id TEXT NOT NULL,
            question_id INTEGER NOT NULL,
            pool TEXT NOT NULL DEFAULT 'latent',
            last_shown TEXT,
            snooze_until TEXT,
            hidden INTEGER NOT NULL DEFAULT 0,
            notes TEXT NOT NULL DEFAULT '',
            consecutive_correct INTEGER NOT NULL DEFAULT 0,
            consecutive_incorrect INTEGER NOT NULL DEFAULT 0,
            total_interactions INTEGER NOT NULL DEFAULT 0,
            was_demoted INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (course_id, question_id)
        );

        CREATE INDEX IF NOT EXISTS idx_question_states_pool
            ON question_states(course_id, pool, hidden);

        CREATE TABLE IF NOT EXISTS interactions (
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            question_id INTEGER NOT NULL,
            timestamp TEXT NOT NULL,
            answer_given TEXT NOT NULL,
            correct INTEGER NOT NULL,
            snooze_minutes INTEGER NOT NULL,
            strategy TEXT NOT NULL,
            pool TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_interactions_question
            ON interactions(course_id, question_id, timestamp);

        CREATE TABLE IF NOT EXISTS events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            course_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            details TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_events_course ON events(course_id, timestamp);

        CREATE TABLE IF NOT EXISTS engine_config (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            data TEXT NOT NULL
        );
        ",
    )?;

    Ok(())
}

fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_err<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value.map(|s| parse_ts(idx, &s)).transpose()
}

fn parse_text<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value: String = row.get(idx)?;
    value.parse().map_err(|e| conversion_err(idx, e))
}

fn state_from_row(row: &Row<'_>) -> rusqlite::Result<QuestionState> {
    Ok(QuestionState {
        question_id: row.get(0)?,
        pool: parse_text(row, 1)?,
        last_shown: opt_ts(row, 2)?,
        snooze_until: opt_ts(row, 3)?,
        hidden: row.get(4)?,
        notes: row.get(5)?,
        consecutive_correct: row.get(6)?,
        consecutive_incorrect: row.get(7)?,
        total_interactions: row.get(8)?,
        was_demoted: row.get(9)?,
    })
}

fn interaction_from_row(row: &Row<'_>) -> rusqlite::Result<Interaction> {
    let timestamp: String = row.get(3)?;
    Ok(Interaction {
        id: row.get(0)?,
        course_id: row.get(1)?,
        question_id: row.get(2)?,
        timestamp: parse_ts(3, &timestamp)?,
        answer_given: row.get(4)?,
        correct: row.get(5)?,
        snooze_minutes: row.get(6)?,
        strategy: parse_text(row, 7)?,
        pool: parse_text(row, 8)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRecord> {
    let details: String = row.get(3)?;
    let timestamp: String = row.get(4)?;
    Ok(EventRecord {
        id: row.get(0)?,
        course_id: row.get(1)?,
        event_type: parse_text(row, 2)?,
        details: serde_json::from_str(&details).map_err(|e| conversion_err(3, e))?,
        timestamp: parse_ts(4, &timestamp)?,
    })
}

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<(Course, CourseStats)> {
    let created_at: String = row.get(2)?;
    let course = Course {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_ts(2, &created_at)?,
        last_accessed: opt_ts(row, 3)?,
    };
    let stats = CourseStats {
        latent: row.get(4)?,
        test: row.get(5)?,
        learned: row.get(6)?,
        master: row.get(7)?,
        total: row.get(8)?,
    };
    Ok((course, stats))
}

fn ensure_course(conn: &Connection, course_id: &str) -> QuizResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?1)",
        params![course_id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(QuizError::course_not_found(course_id))
    }
}

fn load_stats(conn: &Connection, course_id: &str) -> QuizResult<CourseStats> {
    conn.query_row(
        "SELECT latent_count, test_count, learned_count, master_count, total_count
         FROM courses WHERE id = ?1",
        params![course_id],
        |row| {
            Ok(CourseStats {
                latent: row.get(0)?,
                test: row.get(1)?,
                learned: row.get(2)?,
                master: row.get(3)?,
                total: row.get(4)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| QuizError::course_not_found(course_id))
}

fn save_stats(conn: &Connection, course_id: &str, stats: &CourseStats) -> QuizResult<()> {
    conn.execute(
        "UPDATE courses SET latent_count = ?2, test_count = ?3, learned_count = ?4,
             master_count = ?5, total_count = ?6
         WHERE id = ?1",
        params![
            course_id,
            stats.latent,
            stats.test,
            stats.learned,
            stats.master,
            stats.total
        ],
    )?;
    Ok(())
}

fn load_state(
    conn: &Connection,
    course_id: &str,
    question_id: QuestionId,
) -> QuizResult<Option<QuestionState>> {
    let sql = format!(
        "SELECT {STATE_COLUMNS} FROM question_states WHERE course_id = ?1 AND question_id = ?2"
    );
    Ok(conn
        .query_row(&sql, params![course_id, question_id], state_from_row)
        .optional()?)
}

fn require_state(
    conn: &Connection,
    course_id: &str,
    question_id: QuestionId,
) -> QuizResult<QuestionState> {
    ensure_course(conn, course_id)?;
    load_state(conn, course_id, question_id)?
        .ok_or_else(|| QuizError::question_not_found(course_id, question_id))
}

fn write_state(conn: &Connection, course_id: &str, state: &QuestionState) -> QuizResult<()> {
    conn.execute(
        "UPDATE question_states SET pool = ?3, last_shown = ?4, snooze_until = ?5, hidden = ?6,
             notes = ?7, consecutive_correct = ?8, consecutive_incorrect = ?9,
             total_interactions = ?10, was_demoted = ?11
         WHERE course_id = ?1 AND question_id = ?2",
        params![
            course_id,
            state.question_id,
            state.pool.as_str(),
            state.last_shown.as_ref().map(ts),
            state.snooze_until.as_ref().map(ts),
            state.hidden,
            state.notes,
            state.consecutive_correct,
            state.consecutive_incorrect,
            state.total_interactions,
            state.was_demoted,
        ],
    )?;
    Ok(())
}

fn insert_interaction(conn: &Connection, interaction: &Interaction) -> QuizResult<()> {
    conn.execute(
        &format!("INSERT INTO interactions ({INTERACTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            interaction.id,
            interaction.course_id,
            interaction.question_id,
            ts(&interaction.timestamp),
            interaction.answer_given,
            interaction.correct,
            interaction.snooze_minutes,
            interaction.strategy.as_str(),
            interaction.pool.as_str(),
        ],
    )?;
    Ok(())
}

fn insert_event(conn: &Connection, event: &EventRecord) -> QuizResult<()> {
    conn.execute(
        "INSERT INTO events (id, course_id, event_type, details, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.id,
            event.course_id,
            event.event_type.as_str(),
            serde_json::to_string(&event.details)?,
            ts(&event.timestamp),
        ],
    )?;
    Ok(())
}

/// Move one question between pools, keeping the counts in step.
fn move_state(
    conn: &Connection,
    course_id: &str,
    question_id: QuestionId,
    update: &StateUpdate,
    from: Pool,
    to: Pool,
) -> QuizResult<()> {
    let mut state = require_state(conn, course_id, question_id)?;
    ensure_in_pool(course_id, question_id, &state, from)?;
    update.apply_to(&mut state);
    state.pool = to;
    write_state(conn, course_id, &state)?;

    if !state.hidden {
        let mut stats = load_stats(conn, course_id)?;
        stats.transfer(from, to, 1);
        save_stats(conn, course_id, &stats)?;
    }
    Ok(())
}

#[async_trait]
impl CourseStore for SqliteStore {
    async fn create_course(
        &self,
        name: &str,
        questions: Vec<NewQuestion>,
        now: DateTime<Utc>,
    ) -> QuizResult<Course> {
        let mut conn = self.lock()?;

        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM courses WHERE name = ?1)",
            params![name],
            |row| row.get(0),
        )?;
        if taken {
            return Err(QuizError::duplicate_course(name));
        }

        let course = Course::new(name, now);
        let stats = CourseStats::with_latent(questions.len() as u32);

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO courses (id, name, created_at, last_accessed, latent_count, total_count)
             VALUES (?1, ?2, ?3, NULL, ?4, ?5)",
            params![course.id, course.name, ts(&course.created_at), stats.latent, stats.total],
        )?;
        {
            let mut insert_question = tx.prepare(
                "INSERT INTO questions (course_id, id, question, options, correct_option, explanation)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            let mut insert_state = tx.prepare(
                "INSERT INTO question_states (course_id, question_id) VALUES (?1, ?2)",
            )?;
            for (id, q) in (1u32..).zip(questions) {
                insert_question.execute(params![
                    course.id,
                    id,
                    q.question,
                    serde_json::to_string(&q.options)?,
                    q.correct_option,
                    q.explanation,
                ])?;
                insert_state.execute(params![course.id, id])?;
            }
        }
        tx.commit()?;

        Ok(course)
    }

    async fn get_course(&self, course_id: &str) -> QuizResult<Option<Course>> {
        let conn = self.lock()?;
        let course = conn
            .query_row(
                "SELECT id, name, created_at, last_accessed, latent_count, test_count,
                        learned_count, master_count, total_count
                 FROM courses WHERE id = ?1",
                params![course_id],
                course_from_row,
            )
            .optional()?;
        Ok(course.map(|(course, _)| course))
    }

    async fn list_courses(&self) -> QuizResult<Vec<CourseSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, created_at, last_accessed, latent_count, test_count,
                    learned_count, master_count, total_count
             FROM courses ORDER BY created_at, name",
        )?;
        let rows = stmt.query_map([], course_from_row)?;

        let mut courses = Vec::new();
        for row in rows {
            let (course, stats) = row?;
            courses.push(CourseSummary::new(course, stats));
        }
        Ok(courses)
    }

    async fn touch_course(&self, course_id: &str, now: DateTime<Utc>) -> QuizResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE courses SET last_accessed = ?2 WHERE id = ?1",
            params![course_id, ts(&now)],
        )?;
        if updated == 0 {
            return Err(QuizError::course_not_found(course_id));
        }
        Ok(())
    }

    async fn reset_course(&self, course_id: &str) -> QuizResult<()> {
        let mut conn = self.lock()?;
        ensure_course(&conn, course_id)?;

        let tx = conn.transaction()?;
        let count = tx.execute(
            "UPDATE question_states SET pool = 'latent', last_shown = NULL, snooze_until = NULL,
                 hidden = 0, notes = '', consecutive_correct = 0, consecutive_incorrect = 0,
                 total_interactions = 0, was_demoted = 0
             WHERE course_id = ?1",
            params![course_id],
        )?;
        tx.execute("DELETE FROM interactions WHERE course_id = ?1", params![course_id])?;
        tx.execute("DELETE FROM events WHERE course_id = ?1", params![course_id])?;
        save_stats(&tx, course_id, &CourseStats::with_latent(count as u32))?;
        tx.commit()?;
        Ok(())
    }

    async fn delete_course(&self, course_id: &str) -> QuizResult<()> {
        let mut conn = self.lock()?;
        ensure_course(&conn, course_id)?;

        let tx = conn.transaction()?;
        for table in ["question_states", "questions", "interactions", "events"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE course_id = ?1"),
                params![course_id],
            )?;
        }
        tx.execute("DELETE FROM courses WHERE id = ?1", params![course_id])?;
        tx.commit()?;
        Ok(())
    }

    async fn get_course_stats(&self, course_id: &str) -> QuizResult<CourseStats> {
        let conn = self.lock()?;
        load_stats(&conn, course_id)
    }

    async fn get_question(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Option<Question>> {
        let conn = self.lock()?;
        ensure_course(&conn, course_id)?;
        let question = conn
            .query_row(
                "SELECT course_id, id, question, options, correct_option, explanation
                 FROM questions WHERE course_id = ?1 AND id = ?2",
                params![course_id, question_id],
                |row| {
                    let options: String = row.get(3)?;
                    Ok(Question {
                        course_id: row.get(0)?,
                        id: row.get(1)?,
                        question: row.get(2)?,
                        options: serde_json::from_str(&options)
                            .map_err(|e| conversion_err(3, e))?,
                        correct_option: row.get(4)?,
                        explanation: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(question)
    }

    async fn get_question_state(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Option<QuestionState>> {
        let conn = self.lock()?;
        ensure_course(&conn, course_id)?;
        load_state(&conn, course_id, question_id)
    }

    async fn update_question_state(
        &self,
        course_id: &str,
        question_id: QuestionId,
        update: &StateUpdate,
    ) -> QuizResult<()> {
        let conn = self.lock()?;
        let mut state = require_state(&conn, course_id, question_id)?;
        ensure_same_pool(&state, update)?;
        update.apply_to(&mut state);
        write_state(&conn, course_id, &state)
    }

    async fn update_question_state_with_pool_transition(
        &self,
        course_id: &str,
        question_id: QuestionId,
        update: &StateUpdate,
        from: Pool,
        to: Pool,
    ) -> QuizResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        move_state(&tx, course_id, question_id, update, from, to)?;
        tx.commit()?;
        Ok(())
    }

    async fn transition_pool(
        &self,
        course_id: &str,
        question_ids: &[QuestionId],
        from: Pool,
        to: Pool,
    ) -> QuizResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut stats = load_stats(&tx, course_id)?;

        let mut moved = 0usize;
        {
            let mut stmt = tx.prepare(
                "UPDATE question_states SET pool = ?4
                 WHERE course_id = ?1 AND question_id = ?2 AND pool = ?3 AND hidden = 0",
            )?;
            for id in question_ids {
                moved += stmt.execute(params![course_id, id, from.as_str(), to.as_str()])?;
            }
        }

        stats.transfer(from, to, moved as u32);
        save_stats(&tx, course_id, &stats)?;
        tx.commit()?;
        Ok(moved)
    }

    async fn hide_question(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Option<Pool>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut state = require_state(&tx, course_id, question_id)?;
        if state.hidden {
            return Ok(None);
        }
        state.hidden = true;
        write_state(&tx, course_id, &state)?;

        let mut stats = load_stats(&tx, course_id)?;
        stats.remove(state.pool);
        save_stats(&tx, course_id, &stats)?;
        tx.commit()?;
        Ok(Some(state.pool))
    }

    async fn update_notes(
        &self,
        course_id: &str,
        question_id: QuestionId,
        notes: &str,
    ) -> QuizResult<()> {
        let conn = self.lock()?;
        let mut state = require_state(&conn, course_id, question_id)?;
        state.notes = notes.to_string();
        write_state(&conn, course_id, &state)
    }

    async fn record_interaction(&self, interaction: &Interaction) -> QuizResult<()> {
        let conn = self.lock()?;
        require_state(&conn, &interaction.course_id, interaction.question_id)?;
        insert_interaction(&conn, interaction)
    }

    async fn get_question_history(
        &self,
        course_id: &str,
        question_id: QuestionId,
    ) -> QuizResult<Vec<Interaction>> {
        let conn = self.lock()?;
        ensure_course(&conn, course_id)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {INTERACTION_COLUMNS} FROM interactions
             WHERE course_id = ?1 AND question_id = ?2
             ORDER BY timestamp, rowid"
        ))?;
        let history = stmt
            .query_map(params![course_id, question_id], interaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(history)
    }

    async fn get_available_questions(
        &self,
        course_id: &str,
        pool: Pool,
        now: DateTime<Utc>,
    ) -> QuizResult<Vec<QuestionState>> {
        let conn = self.lock()?;
        ensure_course(&conn, course_id)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STATE_COLUMNS} FROM question_states
             WHERE course_id = ?1 AND pool = ?2 AND hidden = 0
               AND (snooze_until IS NULL OR snooze_until <= ?3)
             ORDER BY question_id"
        ))?;
        let states = stmt
            .query_map(params![course_id, pool.as_str(), ts(&now)], state_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(states)
    }

    async fn get_all_questions(&self, course_id: &str, pool: Pool) -> QuizResult<Vec<QuestionState>> {
        let conn = self.lock()?;
        ensure_course(&conn, course_id)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STATE_COLUMNS} FROM question_states
             WHERE course_id = ?1 AND pool = ?2
             ORDER BY question_id"
        ))?;
        let states = stmt
            .query_map(params![course_id, pool.as_str()], state_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(states)
    }

    async fn commit_answer(&self, commit: &AnswerCommit) -> QuizResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        match commit.transition {
            Some((from, to)) => {
                move_state(&tx, &commit.course_id, commit.question_id, &commit.update, from, to)?
            }
            None => {
                let mut state = require_state(&tx, &commit.course_id, commit.question_id)?;
                ensure_same_pool(&state, &commit.update)?;
                commit.update.apply_to(&mut state);
                write_state(&tx, &commit.course_id, &state)?;
            }
        }
        insert_interaction(&tx, &commit.interaction)?;
        for event in &commit.events {
            insert_event(&tx, event)?;
        }

        // Dropping an uncommitted transaction rolls it back, so any early
        // return above leaves the database untouched.
        tx.commit()?;
        Ok(())
    }

    async fn get_config(&self) -> QuizResult<EngineConfig> {
        let conn = self.lock()?;
        let data: Option<String> = conn
            .query_row("SELECT data FROM engine_config WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        match data {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Err(QuizError::config_not_found()),
        }
    }

    async fn save_config(&self, config: &EngineConfig) -> QuizResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO engine_config (id, data) VALUES (1, ?1)",
            params![serde_json::to_string(config)?],
        )?;
        Ok(())
    }

    async fn log_event(&self, event: &EventRecord) -> QuizResult<()> {
        let conn = self.lock()?;
        ensure_course(&conn, &event.course_id)?;
        insert_event(&conn, event)
    }

    async fn get_event_log(
        &self,
        course_id: &str,
        limit: usize,
        offset: usize,
    ) -> QuizResult<Vec<EventRecord>> {
        let conn = self.lock()?;
        ensure_course(&conn, course_id)?;
        let mut stmt = conn.prepare(
            "SELECT id, course_id, event_type, details, timestamp FROM events
             WHERE course_id = ?1
             ORDER BY timestamp DESC, seq DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let events = stmt
            .query_map(
                params![course_id, limit as i64, offset as i64],
                event_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}
