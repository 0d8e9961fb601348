//! Property-based tests for chunked generation under injected failures

use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use syllabus::api::CourseApi;
use syllabus::config::{GenerationSettings, QuizSettings};
use syllabus::course::{CourseBrief, GenerationStatus};
use syllabus::error::ApiError;
use syllabus::generation::prompts::{TASK_ANALYZE, TASK_OUTLINE, TASK_QUIZ};
use syllabus::generation::{DriveOutcome, DriverPolicy, PollingDriver};
use syllabus::provider::{
    ChatMessage, CompletionOptions, MessageRole, ModelProviderClient, ScriptedProvider,
};
use syllabus::store::Store;

/// What the provider does on one call.
#[derive(Debug, Clone, Copy)]
enum Fault {
    None,
    Transport,
    Garbage,
}

fn fault() -> impl Strategy<Value = Fault> {
    prop_oneof![
        6 => Just(Fault::None),
        2 => Just(Fault::Transport),
        1 => Just(Fault::Garbage),
    ]
}

fn reply(messages: &[ChatMessage]) -> String {
    let prompt = messages
        .iter()
        .find(|m| m.role == MessageRole::User)
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    if prompt.starts_with(TASK_ANALYZE) {
        r#"{"title":"Knots","description":"Tying things","learningObjectives":["Bowline"]}"#
            .to_string()
    } else if prompt.starts_with(TASK_OUTLINE) {
        let chapters: Vec<_> = (1..=5)
            .map(|c| serde_json::json!({"title": format!("Ch {c}"), "sections": ["a", "b", "c", "d", "e"]}))
            .collect();
        serde_json::json!({ "chapters": chapters }).to_string()
    } else if prompt.starts_with(TASK_QUIZ) {
        r#"{"questions":[{"question":"Fixed loop?","type":"true-false","correctAnswer":true}]}"#
            .to_string()
    } else {
        r#"{"introduction":"Opening words","content":"A section body that is long enough."}"#
            .to_string()
    }
}

fn faulty_provider(faults: Vec<Fault>) -> ScriptedProvider {
    let calls = Arc::new(AtomicUsize::new(0));
    ScriptedProvider::new().with_responder(move |messages| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        match faults.get(n).copied().unwrap_or(Fault::None) {
            Fault::None => Ok(reply(messages)),
            Fault::Transport => Err(ApiError::ProviderRequestFailed("reset".to_string())),
            Fault::Garbage => Ok("I cannot answer that".to_string()),
        }
    })
}

/// Percent after each committed unit of a fault-free run.
fn committed_percents(chapters: usize, sections: usize) -> Vec<u8> {
    let units = chapters * sections;
    let mut out = vec![10, 20];
    out.extend((1..=units).map(|done| (20 + 70 * done / units) as u8));
    out.push(100);
    out
}

#[test]
fn test_percent_never_decreases_under_failures() {
    let mut runner = TestRunner::new(Config {
        cases: 32,
        ..Config::default()
    });
    let strategy = (
        1usize..=3,
        1usize..=3,
        any::<bool>(),
        prop::collection::vec(fault(), 0..24),
    );

    runner
        .run(&strategy, |(chapters, sections, include_quiz, faults)| {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            runtime.block_on(async {
                let provider = Arc::new(faulty_provider(faults));
                let api = CourseApi::with_parts(
                    Store::temporary(Duration::from_secs(60)).unwrap(),
                    Some(provider.clone() as Arc<dyn ModelProviderClient>),
                    None,
                    GenerationSettings {
                        min_section_chars: 20,
                        ..GenerationSettings::default()
                    },
                    QuizSettings::default(),
                    CompletionOptions::default(),
                );
                let mut brief = CourseBrief::new("Knots", chapters, sections);
                brief.include_quiz = include_quiz;
                let id = api.create_course(brief).unwrap().course_id;

                let report = PollingDriver::new(DriverPolicy::immediate())
                    .drive(&api, &id)
                    .await
                    .unwrap();

                prop_assert!(report.percents.windows(2).all(|w| w[0] <= w[1]));

                let mut seen: Vec<u8> = report.percents.iter().copied().filter(|p| *p > 0).collect();
                seen.dedup();
                let expected = committed_percents(chapters, sections);
                prop_assert!(expected.starts_with(&seen), "{:?} vs {:?}", seen, expected);

                let course = api.get_course(&id).unwrap();
                match report.outcome {
                    DriveOutcome::Complete => {
                        prop_assert_eq!(seen, expected);
                        prop_assert_eq!(course.chapters.len(), chapters);
                        prop_assert!(course
                            .chapters
                            .iter()
                            .all(|c| c.sections.iter().all(|s| s.is_expanded())));
                        prop_assert_eq!(course.quiz.is_some(), include_quiz);
                    }
                    DriveOutcome::Failed { .. } => {
                        prop_assert_eq!(course.generation.status, GenerationStatus::Failed);
                        prop_assert_eq!(course.generation.validation_failures, 3);
                    }
                    DriveOutcome::TakingLonger => {
                        prop_assert!(false, "drive ran out of attempts");
                    }
                }
                Ok(())
            })
        })
        .unwrap();
}
