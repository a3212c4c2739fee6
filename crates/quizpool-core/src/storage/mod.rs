//! [`CourseStore`](crate::traits::CourseStore) implementations.
//!
//! - [`MemoryStore`]: plain maps behind a lock, for tests and throwaway
//!   sessions.
//! - [`SqliteStore`]: persistent, file-backed or in-memory SQLite.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::{QuizError, QuizResult};
use crate::types::{Pool, QuestionId, QuestionState, StateUpdate};

/// Reject a plain update that would move the question to another pool.
pub(crate) fn ensure_same_pool(
    state: &QuestionState,
    update: &StateUpdate,
) -> QuizResult<()> {
    match update.pool {
        Some(pool) if pool != state.pool => Err(QuizError::validation_with_suggestion(
            format!(
                "Update moves question {} from {} to {}",
                state.question_id, state.pool, pool
            ),
            "Use update_question_state_with_pool_transition for pool changes",
        )),
        _ => Ok(()),
    }
}

/// Reject a transition whose source pool does not match the stored state.
pub(crate) fn ensure_in_pool(
    course_id: &str,
    question_id: QuestionId,
    state: &QuestionState,
    from: Pool,
) -> QuizResult<()> {
    if state.pool == from {
        Ok(())
    } else {
        Err(QuizError::validation(format!(
            "Question {} in course '{}' is in {}, not {}",
            question_id, course_id, state.pool, from
        )))
    }
}
