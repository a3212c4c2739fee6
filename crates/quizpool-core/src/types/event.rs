//! Audit log events.
//!
//! [`DomainEvent`] is what the answer transition function emits; the store
//! persists everything as [`EventRecord`] rows with a free-form payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::{Pool, QuestionId};

/// Kind of an audit log entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    CourseCreated,
    CourseReset,
    Promotion,
    Demotion,
    /// Latent questions moved into Test by refill.
    LatentPromotion,
    QuestionHidden,
    SessionStart,
    SessionEnd,
    UserInteraction,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A persisted log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub course_id: String,
    pub event_type: EventType,
    #[serde(default)]
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(
        course_id: impl Into<String>,
        event_type: EventType,
        details: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            course_id: course_id.into(),
            event_type,
            details,
            timestamp,
        }
    }
}

/// Pool transition emitted by an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Promotion {
        question_id: QuestionId,
        from: Pool,
        to: Pool,
    },
    Demotion {
        question_id: QuestionId,
        from: Pool,
        to: Pool,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Promotion { .. } => EventType::Promotion,
            Self::Demotion { .. } => EventType::Demotion,
        }
    }

    pub fn from_pool(&self) -> Pool {
        match self {
            Self::Promotion { from, .. } | Self::Demotion { from, .. } => *from,
        }
    }

    pub fn to_pool(&self) -> Pool {
        match self {
            Self::Promotion { to, .. } | Self::Demotion { to, .. } => *to,
        }
    }

    /// Convert into a log record for `course_id`.
    pub fn to_record(&self, course_id: &str, timestamp: DateTime<Utc>) -> EventRecord {
        let question_id = match self {
            Self::Promotion { question_id, .. } | Self::Demotion { question_id, .. } => *question_id,
        };
        EventRecord::new(
            course_id,
            self.event_type(),
            serde_json::json!({
                "question_id": question_id,
                "from": self.from_pool(),
                "to": self.to_pool(),
            }),
            timestamp,
        )
    }
}
