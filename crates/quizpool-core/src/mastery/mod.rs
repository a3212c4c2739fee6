//! Spaced-repetition core: question scheduling and answer transitions.
//!
//! Questions move through four pools:
//!
//! ```text
//! Latent --refill--> Test <--> Learned <--> Master
//! ```
//!
//! - [`find_next_question`] tops Test up from Latent, then draws a pool by
//!   weight and a question from it by strategy mix.
//! - [`process_answer`] is a pure function that turns an answer into a
//!   state update, a snooze and at most one promotion or demotion.
//!
//! Both take the configuration and the current time explicitly; neither
//! reads a clock or global state.

mod scheduler;
mod transition;

pub use scheduler::{
    choose_pool, choose_question, effective_weight, find_next_question, refill_test_pool,
    RefillReport, RefillTrigger, SelectedQuestion,
};
pub use transition::{correct_snooze_minutes, process_answer, AnswerOutcome};
