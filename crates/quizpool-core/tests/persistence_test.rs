//! File-backed persistence across engine instances.

use std::sync::Arc;

use quizpool_core::{
    AppConfig, ConfigPatch, EngineConfig, Pool, QuizEngine, RawQuestion, SequenceSource,
    SqliteStore,
};
use tempfile::TempDir;

fn questions(n: usize) -> Vec<RawQuestion> {
    (0..n)
        .map(|i| RawQuestion {
            question: Some(format!("Capital #{i}?")),
            options: Some(vec!["Paris".into(), "Rome".into()]),
            correct_option: Some("Paris".into()),
            explanation: Some("Paris.".into()),
            index: None,
        })
        .collect()
}

#[tokio::test]
async fn test_progress_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("quizpool.db");

    let course_id = {
        let store = Arc::new(SqliteStore::new(&db_path).unwrap());
        let engine = QuizEngine::new(store)
            .with_random_source(Box::new(SequenceSource::new(vec![0.0])));
        engine
            .update_config(&ConfigPatch {
                test_pool_target_size: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();

        let report = engine.create_course("Capitals", questions(4)).await.unwrap();
        let next = engine
            .find_next_question(&report.course_id)
            .await
            .unwrap()
            .unwrap();
        engine
            .submit_answer(&report.course_id, &next, "Paris")
            .await
            .unwrap();
        report.course_id
    };

    let engine = QuizEngine::new(Arc::new(SqliteStore::new(&db_path).unwrap()));
    assert_eq!(engine.get_config().await.unwrap().test_pool_target_size, 2);

    let courses = engine.list_courses().await.unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].name, "Capitals");
    assert_eq!((courses[0].stats.test, courses[0].stats.latent), (2, 2));
    assert!(courses[0].last_accessed.is_some());

    let state = engine.get_question_state(&course_id, 1).await.unwrap();
    assert_eq!(state.pool, Pool::Test);
    assert_eq!(state.consecutive_correct, 1);
    assert!(state.snooze_until.is_some());
    assert_eq!(engine.get_question_history(&course_id, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_engine_from_app_config_file() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("app.db");
    let config_path = dir.path().join("quizpool.toml");
    std::fs::write(
        &config_path,
        format!(
            "db_path = {:?}\nrng_seed = 42\n\n[engine]\ntest_pool_target_size = 7\n",
            db_path.display().to_string()
        ),
    )
    .unwrap();

    let app = AppConfig::from_file(&config_path).unwrap();
    assert_eq!(app.rng_seed, Some(42));

    let engine = QuizEngine::from_app_config(&app).unwrap();
    let config = engine.get_config().await.unwrap();
    assert_eq!(config.test_pool_target_size, 7);
    assert_eq!(config.pool_weight_test, EngineConfig::default().pool_weight_test);
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_in_memory_app_config() {
    let app = AppConfig::builder().in_memory().rng_seed(1).build();
    let engine = QuizEngine::from_app_config(&app).unwrap();
    let report = engine.create_course("Scratch", questions(3)).await.unwrap();
    assert_eq!(report.total_loaded, 3);
    assert!(engine
        .find_next_question(&report.course_id)
        .await
        .unwrap()
        .is_some());
}
