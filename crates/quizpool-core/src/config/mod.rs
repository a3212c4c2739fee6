//! Configuration system for quizpool.
//!
//! [`EngineConfig`] holds the scheduling and transition tunables. It is
//! persisted by the store and read once per engine operation, then passed
//! explicitly to the scheduler and the answer transition function.
//!
//! [`AppConfig`] describes the host: where the database lives and how the
//! random source is seeded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{QuizError, QuizResult};
use crate::types::Pool;

pub(crate) const MINUTES_PER_HOUR: i64 = 60;
pub(crate) const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

/// Longest snooze any single setting may produce.
pub const MAX_SNOOZE_MINUTES: i64 = 100 * 365 * MINUTES_PER_DAY;

/// Scheduling and mastery-transition parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of non-hidden questions refill keeps in Test.
    pub test_pool_target_size: u32,
    pub snooze_incorrect_minutes: u32,
    pub snooze_test_correct_minutes: u32,
    pub snooze_learned_correct_hours: u32,
    pub snooze_master_correct_days: u32,
    pub pool_weight_test: f64,
    pub pool_weight_learned: f64,
    pub pool_weight_master: f64,
    /// Pools with fewer available questions than this get a proportional
    /// weight penalty.
    pub pool_penalty_threshold: u32,
    pub strategy_oldest_pct: u32,
    pub strategy_demoted_pct: u32,
    pub promotion_consecutive_correct: u32,
    pub demotion_incorrect_count: u32,
    pub auto_advance_on_correct: bool,
    pub auto_advance_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            test_pool_target_size: 40,
            snooze_incorrect_minutes: 1,
            snooze_test_correct_minutes: 10,
            snooze_learned_correct_hours: 24,
            snooze_master_correct_days: 7,
            pool_weight_test: 12.0,
            pool_weight_learned: 4.0,
            pool_weight_master: 1.0,
            pool_penalty_threshold: 8,
            strategy_oldest_pct: 30,
            strategy_demoted_pct: 30,
            promotion_consecutive_correct: 2,
            demotion_incorrect_count: 1,
            auto_advance_on_correct: true,
            auto_advance_delay_ms: 1500,
        }
    }
}

impl EngineConfig {
    /// Base roulette weight of a schedulable pool. Latent is never drawn.
    pub fn pool_weight(&self, pool: Pool) -> f64 {
        match pool {
            Pool::Test => self.pool_weight_test,
            Pool::Learned => self.pool_weight_learned,
            Pool::Master => self.pool_weight_master,
            Pool::Latent => 0.0,
        }
    }

    /// Share of strategy draws that fall through to uniform random.
    pub fn strategy_random_pct(&self) -> u32 {
        100u32.saturating_sub(
            self.strategy_oldest_pct
                .saturating_add(self.strategy_demoted_pct),
        )
    }

    /// Check invariants the scheduler and transition function rely on.
    pub fn validate(&self) -> QuizResult<()> {
        for (field, pct) in [
            ("strategy_oldest_pct", self.strategy_oldest_pct),
            ("strategy_demoted_pct", self.strategy_demoted_pct),
        ] {
            if pct > 100 {
                return Err(QuizError::invalid_config(
                    field,
                    format!("{} is {}, must be at most 100", field, pct),
                ));
            }
        }
        let strategy_total = self.strategy_oldest_pct + self.strategy_demoted_pct;
        if strategy_total > 100 {
            return Err(QuizError::invalid_config(
                "strategy_oldest_pct",
                format!(
                    "strategy percentages sum to {}, must be at most 100",
                    strategy_total
                ),
            ));
        }
        for (field, minutes) in [
            ("snooze_incorrect_minutes", self.snooze_incorrect_minutes as i64),
            ("snooze_test_correct_minutes", self.snooze_test_correct_minutes as i64),
            (
                "snooze_learned_correct_hours",
                self.snooze_learned_correct_hours as i64 * MINUTES_PER_HOUR,
            ),
            (
                "snooze_master_correct_days",
                self.snooze_master_correct_days as i64 * MINUTES_PER_DAY,
            ),
        ] {
            if minutes > MAX_SNOOZE_MINUTES {
                return Err(QuizError::invalid_config(
                    field,
                    format!("{} exceeds the longest snooze of 100 years", field),
                ));
            }
        }
        if self.pool_penalty_threshold == 0 {
            return Err(QuizError::invalid_config(
                "pool_penalty_threshold",
                "pool_penalty_threshold must be greater than 0",
            ));
        }
        if self.promotion_consecutive_correct == 0 {
            return Err(QuizError::invalid_config(
                "promotion_consecutive_correct",
                "promotion_consecutive_correct must be greater than 0",
            ));
        }
        if self.demotion_incorrect_count == 0 {
            return Err(QuizError::invalid_config(
                "demotion_incorrect_count",
                "demotion_incorrect_count must be greater than 0",
            ));
        }
        for (field, weight) in [
            ("pool_weight_test", self.pool_weight_test),
            ("pool_weight_learned", self.pool_weight_learned),
            ("pool_weight_master", self.pool_weight_master),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(QuizError::invalid_config(
                    field,
                    format!("{} must be a non-negative number", field),
                ));
            }
        }
        if self.pool_weight_test + self.pool_weight_learned + self.pool_weight_master <= 0.0 {
            return Err(QuizError::invalid_config(
                "pool_weight_test",
                "at least one pool weight must be positive",
            ));
        }
        Ok(())
    }

    /// Merge a partial update and validate the result.
    ///
    /// On failure `self` is left unchanged.
    pub fn apply(&mut self, patch: &ConfigPatch) -> QuizResult<()> {
        let mut next = self.clone();
        patch.merge_into(&mut next);
        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// Partial configuration update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigPatch {
    pub test_pool_target_size: Option<u32>,
    pub snooze_incorrect_minutes: Option<u32>,
    pub snooze_test_correct_minutes: Option<u32>,
    pub snooze_learned_correct_hours: Option<u32>,
    pub snooze_master_correct_days: Option<u32>,
    pub pool_weight_test: Option<f64>,
    pub pool_weight_learned: Option<f64>,
    pub pool_weight_master: Option<f64>,
    pub pool_penalty_threshold: Option<u32>,
    pub strategy_oldest_pct: Option<u32>,
    pub strategy_demoted_pct: Option<u32>,
    pub promotion_consecutive_correct: Option<u32>,
    pub demotion_incorrect_count: Option<u32>,
    pub auto_advance_on_correct: Option<bool>,
    pub auto_advance_delay_ms: Option<u64>,
}

macro_rules! merge_fields {
    ($patch:expr, $target:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $target.$field = value;
            }
        )+
    };
}

impl ConfigPatch {
    fn merge_into(&self, config: &mut EngineConfig) {
        merge_fields!(
            self,
            config,
            test_pool_target_size,
            snooze_incorrect_minutes,
            snooze_test_correct_minutes,
            snooze_learned_correct_hours,
            snooze_master_correct_days,
            pool_weight_test,
            pool_weight_learned,
            pool_weight_master,
            pool_penalty_threshold,
            strategy_oldest_pct,
            strategy_demoted_pct,
            promotion_consecutive_correct,
            demotion_incorrect_count,
            auto_advance_on_correct,
            auto_advance_delay_ms,
        );
    }

    /// Whether the patch sets nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database path.
    pub db_path: PathBuf,
    /// Use a throwaway in-memory store instead of `db_path`.
    pub in_memory: bool,
    /// Seed for the scheduler's random source. Unset means thread RNG.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
    /// Engine configuration written to a store that has none yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".quizpool"))
            .unwrap_or_else(|| PathBuf::from(".quizpool"));

        Self {
            db_path: data_dir.join("quizpool.db"),
            in_memory: false,
            rng_seed: None,
            engine: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> QuizResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| QuizError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| QuizError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| QuizError::Configuration(e.to_string()))?,
            _ => {
                return Err(QuizError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        if let Some(engine) = &config.engine {
            engine.validate()?;
        }
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Reads:
    /// - `QUIZPOOL_CONFIG_FILE` (base file, optional)
    /// - `QUIZPOOL_DB_PATH` (default: `~/.quizpool/quizpool.db`)
    /// - `QUIZPOOL_IN_MEMORY` (set to use an in-memory store)
    /// - `QUIZPOOL_RNG_SEED` (default: unseeded)
    pub fn from_env() -> QuizResult<Self> {
        let mut config = match std::env::var("QUIZPOOL_CONFIG_FILE") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(path) = std::env::var("QUIZPOOL_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if std::env::var("QUIZPOOL_IN_MEMORY").is_ok() {
            config.in_memory = true;
        }

        if let Ok(seed) = std::env::var("QUIZPOOL_RNG_SEED") {
            let seed = seed.parse().map_err(|_| {
                QuizError::Configuration(format!("QUIZPOOL_RNG_SEED is not a number: {}", seed))
            })?;
            config.rng_seed = Some(seed);
        }

        Ok(config)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// Builder for AppConfig.
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set database path.
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_path = path.into();
        self
    }

    /// Use an in-memory store.
    pub fn in_memory(mut self) -> Self {
        self.config.in_memory = true;
        self
    }

    /// Seed the scheduler's random source.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.config.rng_seed = Some(seed);
        self
    }

    /// Set the initial engine configuration.
    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.config.engine = Some(engine);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> AppConfig {
        self.config
    }
}
