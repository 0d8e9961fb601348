//! End-to-end chunked generation against a scripted provider

use crate::integration::test_utils::{course_provider, task_lines, temporary_store, api_with};
use std::sync::Arc;
use syllabus::course::{CourseBrief, GenerationStatus};
use syllabus::error::ApiError;
use syllabus::generation::prompts::{TASK_ANALYZE, TASK_OUTLINE, TASK_QUIZ, TASK_SECTION};

#[tokio::test]
async fn three_by_two_course_completes_in_nine_calls() {
    let provider = Arc::new(course_provider());
    let api = api_with(temporary_store(), provider.clone());
    let created = api.create_course(CourseBrief::new("Knots", 3, 2)).unwrap();
    assert_eq!(created.percent, 0);

    let mut percents = Vec::new();
    let mut statuses = Vec::new();
    for _ in 0..9 {
        let result = api.execute_next_chunk(&created.course_id).await.unwrap();
        assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
        percents.push(result.percent);
        statuses.push(result.status);
    }

    assert_eq!(percents, vec![10, 20, 31, 43, 55, 66, 78, 90, 100]);
    assert_eq!(statuses[0], GenerationStatus::GeneratingOutline);
    assert_eq!(statuses[1], GenerationStatus::ExpandingContent);
    assert_eq!(statuses[7], GenerationStatus::Finalizing);
    assert_eq!(statuses[8], GenerationStatus::Complete);
    assert_eq!(provider.call_count(), 9);

    let course = api.get_course(&created.course_id).unwrap();
    assert_eq!(course.title, "Knots for Sailors");
    assert_eq!(course.chapters.len(), 3);
    for chapter in &course.chapters {
        assert_eq!(chapter.sections.len(), 2);
        assert!(!chapter.introduction.is_empty());
        assert!(chapter.sections.iter().all(|s| s.is_expanded()));
    }
    let quiz = course.quiz.as_ref().unwrap();
    let ids: Vec<_> = quiz.questions.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids, vec!["q1", "q2", "q3"]);
    assert!(!course.estimated_time.is_empty());
    assert!(course.generation.error.is_none());
}

#[tokio::test]
async fn prompts_follow_the_unit_order() {
    let provider = Arc::new(course_provider());
    let api = api_with(temporary_store(), provider.clone());
    let created = api.create_course(CourseBrief::new("Knots", 2, 2)).unwrap();
    while !api.execute_next_chunk(&created.course_id).await.unwrap().complete {}

    let mut expected = vec![TASK_ANALYZE, TASK_OUTLINE];
    expected.extend(std::iter::repeat(TASK_SECTION).take(4));
    expected.push(TASK_QUIZ);
    assert_eq!(task_lines(&provider), expected);

    let prompts = provider.prompts();
    assert!(prompts[2].contains("Write chapter 1 \"Chapter topic 1\", section 1"));
    assert!(prompts[3].contains("Write chapter 1 \"Chapter topic 1\", section 2"));
    assert!(prompts[4].contains("Write chapter 2 \"Chapter topic 2\", section 1"));
    assert!(prompts[1].contains("exactly 2 chapters with exactly 2 sections"));
}

#[tokio::test]
async fn course_without_quiz_finalizes_without_a_provider_call() {
    let provider = Arc::new(course_provider());
    let api = api_with(temporary_store(), provider.clone());
    let mut brief = CourseBrief::new("Knots", 2, 1);
    brief.include_quiz = false;
    let created = api.create_course(brief).unwrap();

    let mut percents = Vec::new();
    loop {
        let result = api.execute_next_chunk(&created.course_id).await.unwrap();
        percents.push(result.percent);
        if result.complete {
            break;
        }
    }

    assert_eq!(percents, vec![10, 20, 55, 90, 100]);
    assert_eq!(provider.call_count(), 4);
    let course = api.get_course(&created.course_id).unwrap();
    assert!(course.quiz.is_none());
    assert_eq!(course.generation.status, GenerationStatus::Complete);
}

#[tokio::test]
async fn finished_course_refuses_more_work() {
    let provider = Arc::new(course_provider());
    let api = api_with(temporary_store(), provider.clone());
    let mut brief = CourseBrief::new("Knots", 1, 1);
    brief.include_quiz = false;
    let created = api.create_course(brief).unwrap();
    while !api.execute_next_chunk(&created.course_id).await.unwrap().complete {}

    let calls = provider.call_count();
    let err = api.execute_next_chunk(&created.course_id).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
    assert_eq!(provider.call_count(), calls);
    assert_eq!(api.get_progress(&created.course_id).unwrap().percent_complete, 100);
}

#[tokio::test]
async fn permanent_provider_failure_fails_the_course() {
    let provider = Arc::new(course_provider());
    provider.fail_next(ApiError::ProviderAuthFailed("invalid api key".to_string()));
    let api = api_with(temporary_store(), provider.clone());
    let created = api.create_course(CourseBrief::new("Knots", 1, 1)).unwrap();

    let result = api.execute_next_chunk(&created.course_id).await.unwrap();
    assert!(result.is_failed());
    assert!(!result.retryable);
    assert_eq!(result.error_kind.as_deref(), Some("provider"));

    let state = api.get_progress(&created.course_id).unwrap();
    assert_eq!(state.status, GenerationStatus::Failed);
    assert!(state.error.unwrap().contains("invalid api key"));
}

#[tokio::test]
async fn journal_records_every_committed_chunk() {
    let provider = Arc::new(course_provider());
    let api = api_with(temporary_store(), provider);
    let mut brief = CourseBrief::new("Knots", 1, 2);
    brief.include_quiz = false;
    let created = api.create_course(brief).unwrap();
    while !api.execute_next_chunk(&created.course_id).await.unwrap().complete {}

    let events: Vec<_> = api
        .journal(&created.course_id)
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(events.first().map(String::as_str), Some("course_created"));
    assert_eq!(events.iter().filter(|e| *e == "chunk_committed").count(), 5);
    assert_eq!(events.last().map(String::as_str), Some("generation_completed"));
}

#[tokio::test]
async fn unknown_course_is_not_found() {
    let api = api_with(temporary_store(), Arc::new(course_provider()));
    let missing = syllabus::course::CourseId::from("crs-missing");
    let err = api.execute_next_chunk(&missing).await.unwrap_err();
    assert!(matches!(err, ApiError::CourseNotFound(_)));
    assert!(matches!(api.get_progress(&missing), Err(ApiError::CourseNotFound(_))));
}
