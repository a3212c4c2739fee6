//! End-to-end scheduling scenarios.
//!
//! Every scenario runs against both the in-memory and the SQLite store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use quizpool_core::{
    Clock, CourseStore, EngineConfig, EventType, ManualClock, MemoryStore, Pool, QuizEngine,
    RawQuestion, RngSource, SequenceSource, SqliteStore, StateUpdate,
};

fn raw(i: usize) -> RawQuestion {
    RawQuestion {
        question: Some(format!("Question {i}")),
        options: Some(vec!["right".into(), "wrong".into(), "other".into()]),
        correct_option: Some("right".into()),
        explanation: Some("Because.".into()),
        index: None,
    }
}

fn raws(n: usize) -> Vec<RawQuestion> {
    (0..n).map(raw).collect()
}

/// Engine with a frozen clock. Draws of 0.0 always pick the first non-empty
/// pool and the oldest question.
fn engine(store: Arc<dyn CourseStore>, config: EngineConfig) -> (QuizEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = QuizEngine::new(store)
        .with_initial_config(config)
        .with_clock(clock.clone())
        .with_random_source(Box::new(SequenceSource::new(vec![0.0])));
    (engine, clock)
}

async fn ten_questions_target_five(store: Arc<dyn CourseStore>) {
    let config = EngineConfig {
        test_pool_target_size: 5,
        promotion_consecutive_correct: 1,
        ..Default::default()
    };
    let (engine, _) = engine(store, config);
    let course = engine.create_course("Ten", raws(10)).await.unwrap().course_id;

    let first = engine.find_next_question(&course).await.unwrap().unwrap();
    let stats = engine.course_stats(&course).await.unwrap();
    assert_eq!((stats.test, stats.latent), (5, 5));
    assert_eq!(first.question.id, 1);

    for expected in 1..=5 {
        let next = engine.find_next_question(&course).await.unwrap().unwrap();
        assert_eq!(next.question.id, expected);
        assert_eq!(next.pool(), Pool::Test);

        let outcome = engine.submit_answer(&course, &next, "right").await.unwrap();
        assert_eq!(outcome.new_pool, Pool::Learned);
        assert!(outcome.needs_refill);

        let stats = engine.course_stats(&course).await.unwrap();
        assert_eq!(stats.test, 5, "Test refilled after answer {expected}");
        assert_eq!(stats.learned, expected);
    }

    let stats = engine.course_stats(&course).await.unwrap();
    assert_eq!((stats.latent, stats.test, stats.learned, stats.master), (0, 5, 5, 0));
    let test_ids: Vec<u32> = engine
        .get_all_questions(&course, Pool::Test)
        .await
        .unwrap()
        .iter()
        .map(|s| s.question_id)
        .collect();
    assert_eq!(test_ids, vec![6, 7, 8, 9, 10]);

    let log = engine.get_event_log(&course, 100, 0).await.unwrap();
    let refills: Vec<_> = log
        .iter()
        .filter(|e| e.event_type == EventType::LatentPromotion)
        .collect();
    assert_eq!(refills.len(), 6);
    // Newest first: the last refill was triggered by a promotion, the first
    // by scheduling.
    assert_eq!(refills[0].details["reason"], "promotion");
    assert_eq!(refills[0].details["question_ids"], serde_json::json!([10]));
    assert_eq!(refills[5].details["reason"], "schedule");
    assert_eq!(refills[5].details["count"], 5);
    assert_eq!(
        log.iter()
            .filter(|e| e.event_type == EventType::Promotion)
            .count(),
        5
    );
}

async fn single_question_snoozes(store: Arc<dyn CourseStore>) {
    let config = EngineConfig {
        test_pool_target_size: 1,
        snooze_test_correct_minutes: 60,
        ..Default::default()
    };
    let (engine, clock) = engine(store, config);
    let course = engine.create_course("One", raws(1)).await.unwrap().course_id;

    let next = engine.find_next_question(&course).await.unwrap().unwrap();
    engine.submit_answer(&course, &next, "right").await.unwrap();
    assert!(engine.find_next_question(&course).await.unwrap().is_none());

    clock.advance(Duration::minutes(59));
    assert!(engine.find_next_question(&course).await.unwrap().is_none());

    clock.advance(Duration::minutes(1));
    let again = engine.find_next_question(&course).await.unwrap().unwrap();
    assert_eq!(again.state.consecutive_correct, 1);
}

async fn snooze_holds_across_pool_transitions(store: Arc<dyn CourseStore>) {
    let config = EngineConfig {
        test_pool_target_size: 1,
        promotion_consecutive_correct: 1,
        ..Default::default()
    };
    let (engine, clock) = engine(store, config);
    let course = engine.create_course("Move", raws(1)).await.unwrap().course_id;

    // Promotion Test -> Learned.
    let next = engine.find_next_question(&course).await.unwrap().unwrap();
    let outcome = engine.submit_answer(&course, &next, "right").await.unwrap();
    assert_eq!(outcome.new_pool, Pool::Learned);
    assert!(engine.find_next_question(&course).await.unwrap().is_none());

    // Move it to Master, then demote it with a wrong answer.
    clock.advance(Duration::minutes(10));
    engine
        .update_question_state_with_pool_transition(
            &course,
            1,
            &StateUpdate::default(),
            Pool::Learned,
            Pool::Master,
        )
        .await
        .unwrap();
    let next = engine.find_next_question(&course).await.unwrap().unwrap();
    assert_eq!(next.pool(), Pool::Master);
    let outcome = engine.submit_answer(&course, &next, "wrong").await.unwrap();
    assert_eq!(outcome.new_pool, Pool::Learned);
    assert!(engine.find_next_question(&course).await.unwrap().is_none());

    clock.advance(Duration::minutes(1));
    let back = engine.find_next_question(&course).await.unwrap().unwrap();
    assert!(back.state.was_demoted);
    assert_eq!(back.pool(), Pool::Learned);
}

async fn hidden_questions_are_never_scheduled(store: Arc<dyn CourseStore>) {
    let config = EngineConfig {
        test_pool_target_size: 3,
        ..Default::default()
    };
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = QuizEngine::new(store)
        .with_initial_config(config)
        .with_clock(clock.clone())
        .with_random_source(Box::new(RngSource::seeded(7)));
    let course = engine.create_course("Hide", raws(5)).await.unwrap().course_id;

    engine.find_next_question(&course).await.unwrap();
    let before = engine.course_stats(&course).await.unwrap();
    assert_eq!((before.test, before.latent, before.total), (3, 2, 5));

    assert!(engine.hide_question(&course, 2).await.unwrap());
    assert!(!engine.hide_question(&course, 2).await.unwrap());

    let after = engine.course_stats(&course).await.unwrap();
    assert_eq!(after.total, before.total - 1);
    // The gap in Test was refilled from Latent straight away.
    assert_eq!((after.test, after.latent), (3, 1));

    let available = engine.get_available_questions(&course, Pool::Test).await.unwrap();
    assert!(available.iter().all(|s| s.question_id != 2));

    for _ in 0..50 {
        let next = engine.find_next_question(&course).await.unwrap().unwrap();
        assert_ne!(next.question.id, 2);
        clock.advance(Duration::seconds(1));
    }

    let log = engine.get_event_log(&course, 100, 0).await.unwrap();
    assert!(log.iter().any(|e| e.event_type == EventType::QuestionHidden));
}

async fn refill_skips_hidden_latent(store: Arc<dyn CourseStore>) {
    let config = EngineConfig {
        test_pool_target_size: 4,
        ..Default::default()
    };
    let (engine, _) = engine(store, config);
    let course = engine.create_course("Refill", raws(10)).await.unwrap().course_id;

    engine.hide_question(&course, 1).await.unwrap();
    engine.hide_question(&course, 3).await.unwrap();
    engine.find_next_question(&course).await.unwrap();

    let test: Vec<u32> = engine
        .get_all_questions(&course, Pool::Test)
        .await
        .unwrap()
        .iter()
        .filter(|s| !s.hidden)
        .map(|s| s.question_id)
        .collect();
    assert_eq!(test, vec![2, 4, 5, 6]);

    // A second call changes nothing.
    engine.find_next_question(&course).await.unwrap();
    assert_eq!(engine.course_stats(&course).await.unwrap().test, 4);
}

async fn import_reports_skipped_entries(store: Arc<dyn CourseStore>) {
    let (engine, _) = engine(store, EngineConfig::default());
    let document = serde_json::json!([
        {"index": 0, "question": "A?", "options": ["x", "y"], "correct_option": "x", "explanation": "x"},
        {"index": 1, "question": "B?", "options": ["x"], "correct_option": "x", "explanation": "x"},
        {"index": 2, "question": "C?", "options": ["x", "y"], "correct_option": "y", "explanation": "y"},
    ])
    .to_string();

    let report = engine.create_course_from_json("Import", &document).await.unwrap();
    assert_eq!(report.total_loaded, 2);
    assert_eq!(report.total_skipped, 1);
    assert_eq!(report.validation_errors[0].index, 1);

    let second = engine.get_question(&report.course_id, 2).await.unwrap();
    assert_eq!(second.question, "C?");
    assert!(engine.get_question(&report.course_id, 3).await.unwrap_err().is_not_found());

    let err = engine
        .create_course_from_json("Import", &document)
        .await
        .unwrap_err();
    assert!(matches!(err, quizpool_core::QuizError::Conflict { .. }));
    assert_eq!(engine.list_courses().await.unwrap().len(), 1);
}

async fn reset_and_delete(store: Arc<dyn CourseStore>) {
    let config = EngineConfig {
        test_pool_target_size: 2,
        ..Default::default()
    };
    let (engine, clock) = engine(store, config);
    let course = engine.create_course("Reset", raws(3)).await.unwrap().course_id;
    let created_at = engine.get_course(&course).await.unwrap().created_at;

    let next = engine.find_next_question(&course).await.unwrap().unwrap();
    engine.submit_answer(&course, &next, "wrong").await.unwrap();
    engine.update_notes(&course, 1, "revisit").await.unwrap();
    engine.hide_question(&course, 3).await.unwrap();

    clock.advance(Duration::hours(1));
    engine.reset_course(&course).await.unwrap();

    let stats = engine.course_stats(&course).await.unwrap();
    assert_eq!((stats.latent, stats.total), (3, 3));
    let state = engine.get_question_state(&course, 1).await.unwrap();
    assert_eq!(state.total_interactions, 0);
    assert!(state.notes.is_empty());
    assert!(engine.get_question_history(&course, 1).await.unwrap().is_empty());
    assert_eq!(engine.get_course(&course).await.unwrap().created_at, created_at);

    let log = engine.get_event_log(&course, 10, 0).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].event_type, EventType::CourseReset);
    assert_eq!(log[0].timestamp, clock.now());

    engine.delete_course(&course).await.unwrap();
    assert!(engine.list_courses().await.unwrap().is_empty());
    assert!(engine.find_next_question(&course).await.unwrap_err().is_not_found());
}

macro_rules! store_scenarios {
    ($($scenario:ident),+ $(,)?) => {
        mod memory_store {
            use super::*;
            $(
                #[tokio::test]
                async fn $scenario() {
                    super::$scenario(Arc::new(MemoryStore::new())).await;
                }
            )+
        }

        mod sqlite_store {
            use super::*;
            $(
                #[tokio::test]
                async fn $scenario() {
                    super::$scenario(Arc::new(SqliteStore::in_memory().unwrap())).await;
                }
            )+
        }
    };
}

store_scenarios!(
    ten_questions_target_five,
    single_question_snoozes,
    snooze_holds_across_pool_transitions,
    hidden_questions_are_never_scheduled,
    refill_skips_hidden_latent,
    import_reports_skipped_entries,
    reset_and_delete,
);
