//! Failure injection: transport errors commit nothing, rejected content is counted,
//! and a course picks up exactly where its checkpoint says.

use crate::integration::test_utils::{api_with, course_provider, temporary_store, test_settings};
use std::sync::Arc;
use std::time::Duration;
use syllabus::api::CourseApi;
use syllabus::config::QuizSettings;
use syllabus::course::{CourseBrief, GenerationStatus};
use syllabus::error::ApiError;
use syllabus::generation::{DriveOutcome, DriverPolicy, PollingDriver};
use syllabus::provider::{CompletionOptions, ModelProviderClient, ScriptedProvider};
use syllabus::store::Store;
use tempfile::TempDir;

fn quizless(topic: &str, chapters: usize, sections: usize) -> CourseBrief {
    let mut brief = CourseBrief::new(topic, chapters, sections);
    brief.include_quiz = false;
    brief
}

#[tokio::test]
async fn transport_failure_leaves_checkpoint_untouched() {
    let provider = Arc::new(course_provider());
    let api = api_with(temporary_store(), provider.clone());
    let id = api.create_course(quizless("Knots", 1, 2)).unwrap().course_id;
    for _ in 0..3 {
        api.execute_next_chunk(&id).await.unwrap();
    }
    let before = api.store().courses.raw(&id).unwrap().unwrap();
    assert_eq!(api.get_progress(&id).unwrap().percent_complete, 55);

    provider.fail_next(ApiError::ProviderRequestFailed("connection reset".to_string()));
    let result = api.execute_next_chunk(&id).await.unwrap();
    assert!(result.retryable);
    assert_eq!(result.error_kind.as_deref(), Some("transport"));
    assert_eq!(result.percent, 55);
    assert_eq!(result.status, GenerationStatus::ExpandingContent);

    let after = api.store().courses.raw(&id).unwrap().unwrap();
    assert_eq!(before, after);

    let events = api.journal(&id).unwrap();
    let failed = events.iter().find(|e| e.event_type == "chunk_failed").unwrap();
    assert_eq!(failed.data["error_kind"], "transport");

    // The retry performs the same unit, once.
    let calls = provider.call_count();
    let result = api.execute_next_chunk(&id).await.unwrap();
    assert!(result.error.is_none());
    assert_eq!(result.percent, 90);
    assert_eq!(provider.call_count(), calls + 1);
    let course = api.get_course(&id).unwrap();
    assert!(course.chapters[0].sections.iter().all(|s| s.is_expanded()));
}

#[tokio::test]
async fn rejected_content_is_counted_until_the_course_fails() {
    let provider = Arc::new(course_provider());
    let api = api_with(temporary_store(), provider.clone());
    let id = api.create_course(quizless("Knots", 1, 1)).unwrap().course_id;
    api.execute_next_chunk(&id).await.unwrap();
    api.execute_next_chunk(&id).await.unwrap();

    let too_short = r#"{"introduction":"Intro","content":"tiny"}"#;
    for _ in 0..3 {
        provider.push_response(too_short);
    }

    for expected in 1..=2u32 {
        let result = api.execute_next_chunk(&id).await.unwrap();
        assert!(result.retryable);
        assert_eq!(result.error_kind.as_deref(), Some("validation"));
        assert_eq!(result.percent, 20);
        let state = api.get_progress(&id).unwrap();
        assert_eq!(state.status, GenerationStatus::ExpandingContent);
        assert_eq!(state.validation_failures, expected);
    }

    let result = api.execute_next_chunk(&id).await.unwrap();
    assert!(result.is_failed());
    assert!(!result.retryable);
    let state = api.get_progress(&id).unwrap();
    assert_eq!(state.status, GenerationStatus::Failed);
    assert_eq!(state.percent_complete, 20);
    assert!(state.error.unwrap().contains("rejected 3 times"));

    let err = api.execute_next_chunk(&id).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
}

#[tokio::test]
async fn one_rejection_then_success_resets_the_counter() {
    let provider = Arc::new(course_provider());
    let api = api_with(temporary_store(), provider.clone());
    let id = api.create_course(quizless("Knots", 1, 1)).unwrap().course_id;
    api.execute_next_chunk(&id).await.unwrap();
    api.execute_next_chunk(&id).await.unwrap();

    provider.push_response("not json at all");
    let rejected = api.execute_next_chunk(&id).await.unwrap();
    assert_eq!(rejected.error_kind.as_deref(), Some("validation"));
    assert_eq!(api.get_progress(&id).unwrap().validation_failures, 1);

    let accepted = api.execute_next_chunk(&id).await.unwrap();
    assert!(accepted.error.is_none());
    let state = api.get_progress(&id).unwrap();
    assert_eq!(state.validation_failures, 0);
    assert_eq!(state.status, GenerationStatus::Finalizing);
}

#[tokio::test]
async fn driver_retries_through_injected_failures() {
    let provider = Arc::new(course_provider());
    provider.fail_next(ApiError::ProviderRateLimit("slow down".to_string()));
    provider.fail_next(ApiError::ProviderError("empty reply".to_string()));
    let api = api_with(temporary_store(), provider.clone());
    let id = api.create_course(quizless("Knots", 1, 2)).unwrap().course_id;

    let report = PollingDriver::new(DriverPolicy::immediate())
        .drive(&api, &id)
        .await
        .unwrap();

    assert_eq!(report.outcome, DriveOutcome::Complete);
    assert_eq!(report.errors, 2);
    assert_eq!(report.committed, 5);
    assert_eq!(report.attempts, 7);
    assert_eq!(report.percents, vec![0, 0, 10, 20, 55, 90, 100]);
}

#[tokio::test]
async fn exhausted_budget_leaves_course_resumable() {
    let provider = Arc::new(course_provider());
    let api = api_with(temporary_store(), provider);
    let id = api.create_course(quizless("Knots", 1, 1)).unwrap().course_id;

    let short = DriverPolicy {
        max_attempts: 2,
        ..DriverPolicy::immediate()
    };
    let report = PollingDriver::new(short).drive(&api, &id).await.unwrap();
    assert_eq!(report.outcome, DriveOutcome::TakingLonger);
    assert_eq!(api.get_progress(&id).unwrap().status, GenerationStatus::ExpandingContent);

    let report = PollingDriver::new(DriverPolicy::immediate())
        .drive(&api, &id)
        .await
        .unwrap();
    assert_eq!(report.outcome, DriveOutcome::Complete);
    assert_eq!(report.percents, vec![90, 100]);
}

#[tokio::test]
async fn generation_resumes_after_reopening_the_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store");
    let provider = Arc::new(course_provider());

    let open_api = |provider: Arc<ScriptedProvider>| {
        let store = Store::open(&path, Duration::from_secs(60)).unwrap();
        CourseApi::with_parts(
            store,
            Some(provider as Arc<dyn ModelProviderClient>),
            None,
            test_settings(),
            QuizSettings::default(),
            CompletionOptions::default(),
        )
    };

    let id = {
        let api = open_api(provider.clone());
        let id = api.create_course(quizless("Knots", 2, 1)).unwrap().course_id;
        for _ in 0..3 {
            api.execute_next_chunk(&id).await.unwrap();
        }
        api.store().flush().unwrap();
        id
    };

    let api = open_api(provider.clone());
    let state = api.get_progress(&id).unwrap();
    assert_eq!(state.percent_complete, 55);
    assert_eq!(state.current_chapter_index, 1);

    let calls = provider.call_count();
    let report = PollingDriver::new(DriverPolicy::immediate())
        .drive(&api, &id)
        .await
        .unwrap();
    assert_eq!(report.outcome, DriveOutcome::Complete);
    assert_eq!(report.percents, vec![90, 100]);
    assert_eq!(provider.call_count(), calls + 1);
}
