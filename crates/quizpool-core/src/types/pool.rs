//! Mastery pools and within-pool selection strategies.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Mastery tier a question belongs to.
///
/// Ordered from least to most mastered. `Latent` questions are never drawn
/// from directly; they only feed `Test` through refill.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Pool {
    /// Loaded but not yet introduced to the learner.
    Latent,
    /// Actively being tested.
    Test,
    /// Answered correctly often enough to space out.
    Learned,
    /// Long-interval review only.
    Master,
}

impl Pool {
    /// Pools the scheduler draws from, in roulette walk order.
    pub const SCHEDULABLE: [Pool; 3] = [Pool::Test, Pool::Learned, Pool::Master];

    /// The pool a promotion leads to, if any.
    ///
    /// Latent is left only through refill, and Master is terminal.
    pub fn promoted(&self) -> Option<Pool> {
        match self {
            Pool::Test => Some(Pool::Learned),
            Pool::Learned => Some(Pool::Master),
            Pool::Latent | Pool::Master => None,
        }
    }

    /// The pool a demotion leads to, if any. Test is the floor.
    pub fn demoted(&self) -> Option<Pool> {
        match self {
            Pool::Master => Some(Pool::Learned),
            Pool::Learned => Some(Pool::Test),
            Pool::Latent | Pool::Test => None,
        }
    }

    /// Stable lowercase name, used as the storage representation.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// How the scheduler picked a question inside its pool.
///
/// Recorded on every interaction. It names the strategy that actually
/// produced the pick, so a recovery draw with no demoted candidates is
/// reported as `Random`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SelectionStrategy {
    /// Least recently shown question (never-shown first).
    Oldest,
    /// A question that was demoted out of Learned or Master.
    Recovery,
    /// Uniformly random available question.
    Random,
}

impl SelectionStrategy {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_pool_ordering_follows_mastery() {
        let pools: Vec<Pool> = Pool::iter().collect();
        assert_eq!(pools, vec![Pool::Latent, Pool::Test, Pool::Learned, Pool::Master]);
        assert!(Pool::Latent < Pool::Test);
        assert!(Pool::Learned < Pool::Master);
    }

    #[test]
    fn test_promotion_and_demotion_edges() {
        assert_eq!(Pool::Test.promoted(), Some(Pool::Learned));
        assert_eq!(Pool::Learned.promoted(), Some(Pool::Master));
        assert_eq!(Pool::Master.promoted(), None);
        assert_eq!(Pool::Latent.promoted(), None);

        assert_eq!(Pool::Master.demoted(), Some(Pool::Learned));
        assert_eq!(Pool::Learned.demoted(), Some(Pool::Test));
        assert_eq!(Pool::Test.demoted(), None);
    }

    #[test]
    fn test_pool_string_round_trip() {
        for pool in Pool::iter() {
            assert_eq!(Pool::from_str(pool.as_str()).unwrap(), pool);
        }
        assert_eq!(Pool::Learned.to_string(), "learned");
        assert!(Pool::from_str("mastered").is_err());
    }

    #[test]
    fn test_strategy_serializes_snake_case() {
        let json = serde_json::to_string(&SelectionStrategy::Recovery).unwrap();
        assert_eq!(json, "\"recovery\"");
        assert_eq!(SelectionStrategy::from_str("oldest").unwrap(), SelectionStrategy::Oldest);
    }
}
