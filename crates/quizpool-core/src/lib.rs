//! quizpool-core - spaced-repetition engine for multiple-choice courses.
//!
//! Questions live in one of four pools (Latent, Test, Learned, Master).
//! The scheduler keeps Test topped up from Latent, draws a pool by weight
//! and a question from it by strategy mix; answers promote, demote and
//! snooze questions.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quizpool_core::{MemoryStore, QuizEngine};
//!
//! let engine = QuizEngine::new(Arc::new(MemoryStore::new()));
//! let report = engine.create_course_from_json("Capitals", &document).await?;
//!
//! while let Some(next) = engine.find_next_question(&report.course_id).await? {
//!     let outcome = engine.submit_answer(&report.course_id, &next, "Paris").await?;
//!     println!("correct: {}", outcome.correct);
//! }
//! ```

pub mod config;
pub mod course;
pub mod engine;
pub mod error;
pub mod mastery;
pub mod storage;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, ConfigPatch, EngineConfig};
pub use course::{parse_questions_json, CreateCourseReport, ParsedQuestions, RawQuestion, ValidationIssue};
pub use engine::{QuizEngine, SessionSummary};
pub use error::{ErrorCode, QuizError, QuizResult};
pub use mastery::{find_next_question, process_answer, AnswerOutcome, SelectedQuestion};
pub use storage::{MemoryStore, SqliteStore};
pub use traits::{
    AnswerCommit, Clock, CourseStore, ManualClock, RandomSource, RngSource, SequenceSource,
    SystemClock,
};
pub use types::{
    Course, CourseStats, CourseSummary, DomainEvent, EventRecord, EventType, Interaction,
    NewQuestion, Pool, Question, QuestionId, QuestionState, SelectionStrategy, StateUpdate,
};
