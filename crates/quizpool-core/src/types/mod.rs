//! Core types for quizpool.

mod course;
mod event;
mod interaction;
mod pool;
mod question;

pub use course::{Course, CourseStats, CourseSummary};
pub use event::{DomainEvent, EventRecord, EventType};
pub use interaction::Interaction;
pub use pool::{Pool, SelectionStrategy};
pub use question::{NewQuestion, Question, QuestionId, QuestionState, StateUpdate};
