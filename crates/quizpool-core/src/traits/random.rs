//! Random source used by pool and strategy selection.
//!
//! The scheduler never touches a global RNG. It pulls unit draws from a
//! [`RandomSource`] so tests can replay a fixed sequence and hit every
//! branch on purpose.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Source of uniform draws in `[0, 1)`.
#[cfg_attr(test, mockall::automock)]
pub trait RandomSource: Send {
    /// Next uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

/// Scale a unit draw to an index in `0..len`. `len` must be non-zero.
pub fn pick_index(unit: f64, len: usize) -> usize {
    let idx = (unit.clamp(0.0, 1.0) * len as f64).floor() as usize;
    idx.min(len - 1)
}

/// [`RandomSource`] backed by a `rand` generator.
pub struct RngSource<R> {
    rng: R,
}

impl<R: RngCore> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    /// Seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + Send> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
///
/// Values are clamped into `[0, 1)`.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<f64>,
    pos: usize,
}

impl SequenceSource {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            pos: 0,
        }
    }
}

impl RandomSource for SequenceSource {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.pos % self.values.len()];
        self.pos += 1;
        value.clamp(0.0, 1.0 - f64::EPSILON)
    }
}
