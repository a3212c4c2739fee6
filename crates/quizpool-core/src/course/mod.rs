//! Course lifecycle: import, reset and hiding questions.
//!
//! These functions sit between the engine facade and the store. They own the
//! rules that span more than one store call (validation before creation,
//! the audit events, refilling Test after a hide).

mod import;

pub use import::{
    parse_questions_json, validate_question, validate_questions, ParsedQuestions, RawQuestion,
    ValidationIssue,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{ErrorCode, QuizError, QuizResult};
use crate::mastery::{refill_test_pool, RefillTrigger};
use crate::traits::CourseStore;
use crate::types::{EventRecord, EventType, Pool, QuestionId};

/// Result of creating a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCourseReport {
    pub course_id: String,
    pub total_loaded: usize,
    pub total_skipped: usize,
    pub validation_errors: Vec<ValidationIssue>,
}

/// Validate `parsed` and store the valid questions as a new course.
///
/// Fails if the name is empty or taken, or if no question survived
/// validation. Skipped entries are returned in the report. The
/// `course_created` event is best-effort, like every audit event here.
pub async fn create_course(
    store: &dyn CourseStore,
    name: &str,
    parsed: ParsedQuestions,
    now: DateTime<Utc>,
) -> QuizResult<CreateCourseReport> {
    let name = name.trim();
    if name.is_empty() {
        return Err(QuizError::validation("Course name must not be empty"));
    }
    if parsed.questions.is_empty() {
        let mut err = QuizError::validation_with_code(
            format!(
                "Course '{}' has no valid questions ({} skipped)",
                name,
                parsed.errors.len()
            ),
            ErrorCode::ValInvalidInput,
        );
        if let QuizError::Validation { details, .. } = &mut err {
            for issue in &parsed.errors {
                details.insert(issue.index.to_string(), issue.reason.clone());
            }
        }
        return Err(err);
    }

    let total_loaded = parsed.questions.len();
    let total_skipped = parsed.errors.len();
    let course = store.create_course(name, parsed.questions, now).await?;

    log_audit_event(
        store,
        EventRecord::new(
            &course.id,
            EventType::CourseCreated,
            serde_json::json!({
                "name": course.name,
                "total_loaded": total_loaded,
                "total_skipped": total_skipped,
            }),
            now,
        ),
    )
    .await;

    info!(
        course_id = %course.id,
        name = %course.name,
        count = total_loaded,
        skipped = total_skipped,
        "Course created"
    );

    Ok(CreateCourseReport {
        course_id: course.id,
        total_loaded,
        total_skipped,
        validation_errors: parsed.errors,
    })
}

/// Return a course to its freshly imported state.
pub async fn reset_course(
    store: &dyn CourseStore,
    course_id: &str,
    now: DateTime<Utc>,
) -> QuizResult<()> {
    let stats = store.get_course_stats(course_id).await?;
    store.reset_course(course_id).await?;
    log_audit_event(
        store,
        EventRecord::new(
            course_id,
            EventType::CourseReset,
            serde_json::json!({ "previous": stats }),
            now,
        ),
    )
    .await;
    info!(course_id, "Course reset");
    Ok(())
}

/// Hide a question for good, refilling Test if it left a gap there.
///
/// Hiding an already hidden question changes nothing and returns `false`.
pub async fn hide_question(
    store: &dyn CourseStore,
    course_id: &str,
    question_id: QuestionId,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> QuizResult<bool> {
    let Some(pool) = store.hide_question(course_id, question_id).await? else {
        return Ok(false);
    };

    log_audit_event(
        store,
        EventRecord::new(
            course_id,
            EventType::QuestionHidden,
            serde_json::json!({ "question_id": question_id, "pool": pool }),
            now,
        ),
    )
    .await;
    info!(course_id, question_id, pool = %pool, "Question hidden");

    if pool == Pool::Test {
        // Scheduling refills again before every draw.
        if let Err(err) =
            refill_test_pool(store, course_id, config, RefillTrigger::Hidden, now).await
        {
            warn!(course_id, question_id, error = %err, "Refill after hide failed");
        }
    }
    Ok(true)
}

/// Append an audit event for a change that is already committed.
///
/// Failures are logged, not returned; the caller's write stands either way.
async fn log_audit_event(store: &dyn CourseStore, event: EventRecord) {
    if let Err(err) = store.log_event(&event).await {
        warn!(
            course_id = %event.course_id,
            event_type = %event.event_type,
            error = %err,
            "Failed to log audit event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::traits::MockCourseStore;
    use crate::types::{Course, NewQuestion};

    fn parsed(n: usize) -> ParsedQuestions {
        ParsedQuestions {
            questions: (0..n)
                .map(|i| NewQuestion {
                    question: format!("Q{i}"),
                    options: vec!["a".into(), "b".into()],
                    correct_option: "a".into(),
                    explanation: "a".into(),
                })
                .collect(),
            errors: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_course_survives_audit_failure() {
        let now = Utc::now();
        let mut store = MockCourseStore::new();
        store
            .expect_create_course()
            .times(1)
            .returning(|name, _, now| Ok(Course::new(name, now)));
        store
            .expect_log_event()
            .times(1)
            .returning(|_| Err(QuizError::database("disk full")));

        let report = create_course(&store, "Rust", parsed(2), now).await.unwrap();
        assert_eq!(report.total_loaded, 2);
        assert!(!report.course_id.is_empty());
    }

    #[tokio::test]
    async fn test_create_course_rejects_empty_name_and_no_questions() {
        let store = MemoryStore::new();
        let now = Utc::now();
        assert!(create_course(&store, "  ", parsed(1), now).await.is_err());

        let err = create_course(&store, "Empty", parsed(0), now).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(store.list_courses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hide_survives_refill_failure() {
        let mut store = MockCourseStore::new();
        store
            .expect_hide_question()
            .times(1)
            .returning(|_, _| Ok(Some(Pool::Test)));
        store.expect_log_event().returning(|_| Ok(()));
        store
            .expect_get_all_questions()
            .returning(|_, _| Err(QuizError::database("locked")));

        let hidden = hide_question(&store, "course", 3, &EngineConfig::default(), Utc::now())
            .await
            .unwrap();
        assert!(hidden);
    }
}
