//! Next-question selection.
//!
//! Each call runs three steps:
//!
//! 1. **Refill**: top the Test pool up to `test_pool_target_size` from
//!    Latent, lowest question id first.
//! 2. **Pool draw**: roulette over Test, Learned and Master. A pool's weight
//!    is its configured base weight, scaled down linearly when it has fewer
//!    than `pool_penalty_threshold` available questions. Pools with nothing
//!    available are skipped.
//! 3. **Question draw**: within the pool, pick by strategy mix (oldest,
//!    recovery of demoted questions, uniform random).
//!
//! Having nothing to show is `Ok(None)`, never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{QuizError, QuizResult};
use crate::traits::{pick_index, CourseStore, RandomSource};
use crate::types::{
    EventRecord, EventType, Pool, Question, QuestionId, QuestionState, SelectionStrategy,
};

/// A scheduled question, its state snapshot and how it was picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedQuestion {
    pub question: Question,
    pub state: QuestionState,
    pub strategy: SelectionStrategy,
}

impl SelectedQuestion {
    pub fn pool(&self) -> Pool {
        self.state.pool
    }
}

/// What caused a refill; recorded in the `latent_promotion` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefillTrigger {
    /// Part of a scheduling call.
    Schedule,
    /// A Test question was promoted by an answer.
    Promotion,
    /// A Test question was hidden.
    Hidden,
}

/// Outcome of a refill step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefillReport {
    /// Questions moved from Latent to Test, ascending.
    pub promoted: Vec<QuestionId>,
    /// Non-hidden Test count after the refill.
    pub test_count: u32,
}

/// Top the Test pool up from Latent.
///
/// Moves the lowest-numbered non-hidden Latent questions into Test until
/// Test holds `test_pool_target_size` non-hidden questions or Latent runs
/// out. Emits one `latent_promotion` event when anything moved.
pub async fn refill_test_pool(
    store: &dyn CourseStore,
    course_id: &str,
    config: &EngineConfig,
    trigger: RefillTrigger,
    now: DateTime<Utc>,
) -> QuizResult<RefillReport> {
    let current = store
        .get_all_questions(course_id, Pool::Test)
        .await?
        .iter()
        .filter(|s| !s.hidden)
        .count() as u32;

    let target = config.test_pool_target_size;
    if current >= target {
        return Ok(RefillReport {
            promoted: Vec::new(),
            test_count: current,
        });
    }

    let mut latent: Vec<QuestionId> = store
        .get_all_questions(course_id, Pool::Latent)
        .await?
        .into_iter()
        .filter(|s| !s.hidden)
        .map(|s| s.question_id)
        .collect();
    latent.sort_unstable();
    latent.truncate((target - current) as usize);

    if latent.is_empty() {
        debug!(course_id, test_count = current, "Latent pool exhausted, Test stays below target");
        return Ok(RefillReport {
            promoted: Vec::new(),
            test_count: current,
        });
    }

    let moved = store
        .transition_pool(course_id, &latent, Pool::Latent, Pool::Test)
        .await?;

    store
        .log_event(&EventRecord::new(
            course_id,
            EventType::LatentPromotion,
            serde_json::json!({
                "count": moved,
                "question_ids": latent,
                "reason": trigger,
            }),
            now,
        ))
        .await?;

    info!(course_id, count = moved, reason = %trigger, "Refilled Test pool from Latent");

    Ok(RefillReport {
        promoted: latent,
        test_count: current + moved as u32,
    })
}

/// Roulette weight for a pool with `available` eligible questions.
pub fn effective_weight(base: f64, available: usize, penalty_threshold: u32) -> f64 {
    if available == 0 {
        return 0.0;
    }
    let threshold = penalty_threshold.max(1) as usize;
    if available >= threshold {
        base
    } else {
        base * (available as f64 / threshold as f64)
    }
}

/// Draw a pool from `(pool, available_count)` candidates.
///
/// Candidates are walked in the given order. Returns `None` when every
/// candidate is empty. If the non-empty pools all weigh zero the first
/// non-empty one is used.
pub fn choose_pool(
    candidates: &[(Pool, usize)],
    config: &EngineConfig,
    rng: &mut dyn RandomSource,
) -> Option<Pool> {
    let weighted: Vec<(Pool, f64)> = candidates
        .iter()
        .filter(|(_, available)| *available > 0)
        .map(|(pool, available)| {
            (
                *pool,
                effective_weight(config.pool_weight(*pool), *available, config.pool_penalty_threshold),
            )
        })
        .collect();

    let first = weighted.first()?.0;
    let total: f64 = weighted.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return Some(first);
    }

    let r = rng.next_unit() * total;
    let mut cumulative = 0.0;
    for (pool, weight) in &weighted {
        cumulative += weight;
        if cumulative > r {
            return Some(*pool);
        }
    }

    // Rounding can leave r at the very top of the range.
    weighted.iter().rev().find(|(_, w)| *w > 0.0).map(|(p, _)| *p)
}

/// Least recently shown state; never-shown first, ties by question id.
fn oldest<'a>(states: impl Iterator<Item = &'a QuestionState>) -> Option<&'a QuestionState> {
    states.min_by_key(|s| (s.last_shown, s.question_id))
}

/// Pick a question from a pool's available states by strategy mix.
///
/// Returns the index into `available` and the strategy that actually
/// produced the pick.
pub fn choose_question(
    available: &[QuestionState],
    config: &EngineConfig,
    rng: &mut dyn RandomSource,
) -> Option<(usize, SelectionStrategy)> {
    if available.is_empty() {
        return None;
    }

    let s = rng.next_unit() * 100.0;
    let oldest_cut = config.strategy_oldest_pct as f64;
    let recovery_cut = oldest_cut + config.strategy_demoted_pct as f64;

    let index_of = |picked: &QuestionState| {
        available
            .iter()
            .position(|st| st.question_id == picked.question_id)
    };

    if s < oldest_cut {
        let picked = oldest(available.iter())?;
        return index_of(picked).map(|i| (i, SelectionStrategy::Oldest));
    }

    if s < recovery_cut {
        if let Some(picked) = oldest(available.iter().filter(|st| st.was_demoted)) {
            return index_of(picked).map(|i| (i, SelectionStrategy::Recovery));
        }
    }

    let idx = pick_index(rng.next_unit(), available.len());
    Some((idx, SelectionStrategy::Random))
}

/// Choose the next question for a course.
///
/// Runs the refill step, then the pool and question draws. Fails if the
/// course does not exist or storage fails; returns `Ok(None)` if nothing is
/// available right now.
pub async fn find_next_question(
    store: &dyn CourseStore,
    course_id: &str,
    config: &EngineConfig,
    rng: &mut dyn RandomSource,
    now: DateTime<Utc>,
) -> QuizResult<Option<SelectedQuestion>> {
    if store.get_course(course_id).await?.is_none() {
        return Err(QuizError::course_not_found(course_id));
    }

    refill_test_pool(store, course_id, config, RefillTrigger::Schedule, now).await?;

    let mut pools = Vec::with_capacity(Pool::SCHEDULABLE.len());
    for pool in Pool::SCHEDULABLE {
        let available = store.get_available_questions(course_id, pool, now).await?;
        pools.push((pool, available));
    }

    let counts: Vec<(Pool, usize)> = pools.iter().map(|(p, a)| (*p, a.len())).collect();
    let Some(pool) = choose_pool(&counts, config, rng) else {
        debug!(course_id, "No question available");
        return Ok(None);
    };

    let Some(available) = pools
        .into_iter()
        .find_map(|(p, available)| (p == pool).then_some(available))
    else {
        return Ok(None);
    };

    let Some((idx, strategy)) = choose_question(&available, config, rng) else {
        return Ok(None);
    };
    let state = available[idx].clone();

    let question = store
        .get_question(course_id, state.question_id)
        .await?
        .ok_or_else(|| QuizError::question_not_found(course_id, state.question_id))?;

    debug!(
        course_id,
        question_id = state.question_id,
        pool = %pool,
        strategy = %strategy,
        "Selected next question"
    );

    Ok(Some(SelectedQuestion {
        question,
        state,
        strategy,
    }))
}
