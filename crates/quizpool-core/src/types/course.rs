//! Course metadata and cached per-pool counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Pool;

/// Course metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl Course {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now,
            last_accessed: None,
        }
    }
}

/// Cached per-pool counts of non-hidden questions.
///
/// Kept in step with every pool transition so listing courses never has to
/// scan question states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseStats {
    pub latent: u32,
    pub test: u32,
    pub learned: u32,
    pub master: u32,
    pub total: u32,
}

impl CourseStats {
    /// Stats for a freshly created course: everything Latent.
    pub fn with_latent(count: u32) -> Self {
        Self {
            latent: count,
            total: count,
            ..Default::default()
        }
    }

    pub fn count(&self, pool: Pool) -> u32 {
        match pool {
            Pool::Latent => self.latent,
            Pool::Test => self.test,
            Pool::Learned => self.learned,
            Pool::Master => self.master,
        }
    }

    fn slot(&mut self, pool: Pool) -> &mut u32 {
        match pool {
            Pool::Latent => &mut self.latent,
            Pool::Test => &mut self.test,
            Pool::Learned => &mut self.learned,
            Pool::Master => &mut self.master,
        }
    }

    /// Move `n` questions from one pool count to another.
    pub fn transfer(&mut self, from: Pool, to: Pool, n: u32) {
        if from == to || n == 0 {
            return;
        }
        let src = self.slot(from);
        *src = src.saturating_sub(n);
        *self.slot(to) += n;
    }

    /// Drop one question from `pool` and from the total (question hidden).
    pub fn remove(&mut self, pool: Pool) {
        let slot = self.slot(pool);
        *slot = slot.saturating_sub(1);
        self.total = self.total.saturating_sub(1);
    }
}

/// A row of the course list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
    pub stats: CourseStats,
}

impl CourseSummary {
    pub fn new(course: Course, stats: CourseStats) -> Self {
        Self {
            id: course.id,
            name: course.name,
            created_at: course.created_at,
            last_accessed: course.last_accessed,
            stats,
        }
    }

    pub fn total_questions(&self) -> u32 {
        self.stats.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_moves_counts() {
        let mut stats = CourseStats::with_latent(10);
        stats.transfer(Pool::Latent, Pool::Test, 4);
        assert_eq!(stats.latent, 6);
        assert_eq!(stats.test, 4);
        assert_eq!(stats.total, 10);

        stats.transfer(Pool::Test, Pool::Learned, 1);
        assert_eq!(stats.count(Pool::Test), 3);
        assert_eq!(stats.count(Pool::Learned), 1);
    }

    #[test]
    fn test_transfer_same_pool_is_noop() {
        let mut stats = CourseStats::with_latent(3);
        stats.transfer(Pool::Latent, Pool::Latent, 2);
        assert_eq!(stats, CourseStats::with_latent(3));
    }

    #[test]
    fn test_remove_decrements_pool_and_total() {
        let mut stats = CourseStats::with_latent(2);
        stats.transfer(Pool::Latent, Pool::Test, 1);
        stats.remove(Pool::Test);
        assert_eq!(stats.test, 0);
        assert_eq!(stats.latent, 1);
        assert_eq!(stats.total, 1);
    }
}
