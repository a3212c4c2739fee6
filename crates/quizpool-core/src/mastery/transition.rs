//! Answer transition function.
//!
//! Given the question the scheduler picked, the learner's answer, the
//! configuration and the current time, computes the new pool, snooze and
//! counters plus any promotion/demotion event. Pure: no I/O and no
//! randomness, so the caller decides whether (and when) to persist.
//!
//! Streak rules:
//! - correct answers grow `consecutive_correct`; reaching
//!   `promotion_consecutive_correct` promotes Test -> Learned -> Master
//! - wrong answers grow `consecutive_incorrect`; reaching
//!   `demotion_incorrect_count` demotes Master -> Learned -> Test
//! - Test is the demotion floor and Master the promotion ceiling

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::SelectedQuestion;
use crate::config::{EngineConfig, MINUTES_PER_DAY, MINUTES_PER_HOUR};
use crate::types::{DomainEvent, Pool, StateUpdate};

/// Result of processing one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub old_pool: Pool,
    pub new_pool: Pool,
    pub snooze_until: DateTime<Utc>,
    /// Snooze applied, in minutes.
    pub snooze_minutes: i64,
    /// Fields to write back to the question state.
    pub update: StateUpdate,
    /// The question left Test, so refill should top Test up from Latent.
    pub needs_refill: bool,
    /// At most one promotion or demotion.
    pub events: Vec<DomainEvent>,
}

impl AnswerOutcome {
    /// `(from, to)` when the pool changed.
    pub fn transition(&self) -> Option<(Pool, Pool)> {
        (self.old_pool != self.new_pool).then_some((self.old_pool, self.new_pool))
    }
}

/// Snooze, in minutes, for a correct answer given in `pool`.
pub fn correct_snooze_minutes(pool: Pool, config: &EngineConfig) -> i64 {
    match pool {
        Pool::Latent | Pool::Test => config.snooze_test_correct_minutes as i64,
        Pool::Learned => config.snooze_learned_correct_hours as i64 * MINUTES_PER_HOUR,
        Pool::Master => config.snooze_master_correct_days as i64 * MINUTES_PER_DAY,
    }
}

/// `now + minutes`, saturating at the latest representable instant.
fn snooze_expiry(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    Duration::try_minutes(minutes)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Compute the state transition for `answer` to the selected question.
pub fn process_answer(
    selected: &SelectedQuestion,
    answer: &str,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> AnswerOutcome {
    let state = &selected.state;
    let question_id = state.question_id;
    let old_pool = state.pool;
    let correct = selected.question.is_correct(answer);

    let mut new_pool = old_pool;
    let mut consecutive_correct = state.consecutive_correct;
    let mut consecutive_incorrect = state.consecutive_incorrect;
    let mut was_demoted = None;
    let mut needs_refill = false;
    let mut events = Vec::new();

    let snooze_minutes = if correct {
        consecutive_correct += 1;
        consecutive_incorrect = 0;

        if consecutive_correct >= config.promotion_consecutive_correct {
            if let Some(to) = old_pool.promoted() {
                new_pool = to;
                consecutive_correct = 0;
                was_demoted = Some(false);
                needs_refill = old_pool == Pool::Test;
                events.push(DomainEvent::Promotion {
                    question_id,
                    from: old_pool,
                    to,
                });
            }
        }

        correct_snooze_minutes(old_pool, config)
    } else {
        consecutive_correct = 0;
        consecutive_incorrect += 1;

        if consecutive_incorrect >= config.demotion_incorrect_count {
            if let Some(to) = old_pool.demoted() {
                new_pool = to;
                consecutive_incorrect = 0;
                was_demoted = Some(true);
                events.push(DomainEvent::Demotion {
                    question_id,
                    from: old_pool,
                    to,
                });
            }
        }

        config.snooze_incorrect_minutes as i64
    };

    let snooze_until = snooze_expiry(now, snooze_minutes);

    let update = StateUpdate {
        pool: Some(new_pool),
        last_shown: Some(now),
        snooze_until: Some(snooze_until),
        consecutive_correct: Some(consecutive_correct),
        consecutive_incorrect: Some(consecutive_incorrect),
        total_interactions: Some(state.total_interactions + 1),
        was_demoted,
    };

    AnswerOutcome {
        correct,
        old_pool,
        new_pool,
        snooze_until,
        snooze_minutes,
        update,
        needs_refill,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewQuestion, Question, QuestionState, SelectionStrategy};

    fn selected(pool: Pool) -> SelectedQuestion {
        let question = Question::from_new(
            "course",
            1,
            NewQuestion {
                question: "Capital of France?".to_string(),
                options: vec!["Paris".to_string(), "Lyon".to_string()],
                correct_option: "Paris".to_string(),
                explanation: "Paris is the capital.".to_string(),
            },
        );
        let mut state = QuestionState::new(1);
        state.pool = pool;
        SelectedQuestion {
            question,
            state,
            strategy: SelectionStrategy::Oldest,
        }
    }

    /// Apply an outcome to the selection, as a caller persisting it would.
    fn advance(sel: &mut SelectedQuestion, outcome: &AnswerOutcome) {
        outcome.update.apply_to(&mut sel.state);
    }

    #[test]
    fn test_correct_streak_promotes_test_once() {
        let config = EngineConfig {
            promotion_consecutive_correct: 3,
            ..Default::default()
        };
        let now = Utc::now();
        let mut sel = selected(Pool::Test);

        for i in 1..=2 {
            let outcome = process_answer(&sel, "Paris", &config, now);
            assert!(outcome.correct);
            assert_eq!(outcome.new_pool, Pool::Test);
            assert!(outcome.events.is_empty());
            assert!(!outcome.needs_refill);
            advance(&mut sel, &outcome);
            assert_eq!(sel.state.consecutive_correct, i);
        }

        let outcome = process_answer(&sel, "Paris", &config, now);
        assert_eq!(outcome.old_pool, Pool::Test);
        assert_eq!(outcome.new_pool, Pool::Learned);
        assert!(outcome.needs_refill);
        assert_eq!(
            outcome.events,
            vec![DomainEvent::Promotion {
                question_id: 1,
                from: Pool::Test,
                to: Pool::Learned
            }]
        );
        assert_eq!(outcome.update.consecutive_correct, Some(0));
        assert_eq!(outcome.update.was_demoted, Some(false));
        assert_eq!(outcome.transition(), Some((Pool::Test, Pool::Learned)));
    }

    #[test]
    fn test_learned_promotion_does_not_request_refill() {
        let config = EngineConfig {
            promotion_consecutive_correct: 1,
            ..Default::default()
        };
        let outcome = process_answer(&selected(Pool::Learned), "Paris", &config, Utc::now());
        assert_eq!(outcome.new_pool, Pool::Master);
        assert!(!outcome.needs_refill);
        assert_eq!(outcome.events.len(), 1);
    }

    #[test]
    fn test_master_is_promotion_ceiling() {
        let config = EngineConfig {
            promotion_consecutive_correct: 1,
            ..Default::default()
        };
        let mut sel = selected(Pool::Master);
        sel.state.consecutive_correct = 5;
        let outcome = process_answer(&sel, "Paris", &config, Utc::now());
        assert_eq!(outcome.new_pool, Pool::Master);
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.update.consecutive_correct, Some(6));
        assert_eq!(outcome.update.was_demoted, None);
    }

    #[test]
    fn test_snooze_durations_per_pool() {
        let config = EngineConfig {
            snooze_test_correct_minutes: 10,
            snooze_learned_correct_hours: 2,
            snooze_master_correct_days: 3,
            snooze_incorrect_minutes: 1,
            promotion_consecutive_correct: 99,
            demotion_incorrect_count: 99,
            ..Default::default()
        };
        let now = Utc::now();

        let test = process_answer(&selected(Pool::Test), "Paris", &config, now);
        assert_eq!(test.snooze_minutes, 10);
        assert_eq!(test.snooze_until, now + Duration::minutes(10));

        let learned = process_answer(&selected(Pool::Learned), "Paris", &config, now);
        assert_eq!(learned.snooze_minutes, 120);

        let master = process_answer(&selected(Pool::Master), "Paris", &config, now);
        assert_eq!(master.snooze_minutes, 3 * 1440);
        assert_eq!(
            master.snooze_until.timestamp_millis() - now.timestamp_millis(),
            3 * 1440 * 60_000
        );

        let wrong = process_answer(&selected(Pool::Master), "Lyon", &config, now);
        assert!(!wrong.correct);
        assert_eq!(wrong.snooze_minutes, 1);
    }

    #[test]
    fn test_incorrect_in_test_never_demotes() {
        for threshold in [1, 2, 5] {
            let config = EngineConfig {
                demotion_incorrect_count: threshold,
                ..Default::default()
            };
            let mut sel = selected(Pool::Test);
            for _ in 0..10 {
                let outcome = process_answer(&sel, "Lyon", &config, Utc::now());
                assert_eq!(outcome.new_pool, Pool::Test);
                assert!(outcome.events.is_empty());
                assert_eq!(outcome.update.was_demoted, None);
                advance(&mut sel, &outcome);
            }
            assert_eq!(sel.state.consecutive_incorrect, 10);
        }
    }

    #[test]
    fn test_master_demotes_to_learned_and_flags() {
        let config = EngineConfig::default();
        let mut sel = selected(Pool::Master);
        sel.state.consecutive_correct = 4;

        let outcome = process_answer(&sel, "Lyon", &config, Utc::now());
        assert_eq!(outcome.new_pool, Pool::Learned);
        assert_eq!(outcome.update.consecutive_correct, Some(0));
        assert_eq!(outcome.update.consecutive_incorrect, Some(0));
        assert_eq!(outcome.update.was_demoted, Some(true));
        assert!(!outcome.needs_refill);
        assert_eq!(
            outcome.events,
            vec![DomainEvent::Demotion {
                question_id: 1,
                from: Pool::Master,
                to: Pool::Learned
            }]
        );
    }

    #[test]
    fn test_learned_demotion_waits_for_threshold() {
        let config = EngineConfig {
            demotion_incorrect_count: 2,
            ..Default::default()
        };
        let mut sel = selected(Pool::Learned);

        let first = process_answer(&sel, "Lyon", &config, Utc::now());
        assert_eq!(first.new_pool, Pool::Learned);
        advance(&mut sel, &first);

        let second = process_answer(&sel, "Lyon", &config, Utc::now());
        assert_eq!(second.new_pool, Pool::Test);
        assert_eq!(second.update.was_demoted, Some(true));
    }

    #[test]
    fn test_promotion_clears_demoted_flag() {
        let config = EngineConfig {
            promotion_consecutive_correct: 1,
            ..Default::default()
        };
        let mut sel = selected(Pool::Test);
        sel.state.was_demoted = true;
        let outcome = process_answer(&sel, "Paris", &config, Utc::now());
        assert_eq!(outcome.update.was_demoted, Some(false));
        advance(&mut sel, &outcome);
        assert!(!sel.state.was_demoted);
    }

    #[test]
    fn test_total_interactions_and_last_shown_always_update() {
        let now = Utc::now();
        let mut sel = selected(Pool::Test);
        sel.state.total_interactions = 7;
        for answer in ["Paris", "Lyon", "not an option"] {
            let outcome = process_answer(&sel, answer, &EngineConfig::default(), now);
            assert_eq!(outcome.update.total_interactions, Some(8));
            assert_eq!(outcome.update.last_shown, Some(now));
            assert_eq!(outcome.update.snooze_until, Some(outcome.snooze_until));
        }
    }

    #[test]
    fn test_deterministic() {
        let now = Utc::now();
        let sel = selected(Pool::Learned);
        let config = EngineConfig::default();
        assert_eq!(
            process_answer(&sel, "Lyon", &config, now),
            process_answer(&sel, "Lyon", &config, now)
        );
    }

    #[test]
    fn test_huge_snooze_saturates() {
        // Unvalidated configs can still reach the transition function.
        let config = EngineConfig {
            snooze_master_correct_days: u32::MAX,
            ..Default::default()
        };
        let now = Utc::now();
        let outcome = process_answer(&selected(Pool::Master), "Paris", &config, now);
        assert_eq!(outcome.snooze_minutes, u32::MAX as i64 * MINUTES_PER_DAY);
        assert_eq!(outcome.snooze_until, DateTime::<Utc>::MAX_UTC);

        let near_end = DateTime::<Utc>::MAX_UTC - Duration::minutes(1);
        let outcome = process_answer(&selected(Pool::Test), "Lyon", &EngineConfig::default(), near_end);
        assert_eq!(outcome.snooze_until, DateTime::<Utc>::MAX_UTC);
    }
}
