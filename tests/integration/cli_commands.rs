//! CLI commands through the route table, backed by a scripted provider

use crate::integration::test_utils::{api_with, course_provider, temporary_store, test_settings};
use clap::Parser;
use serde_json::Value;
use std::sync::Arc;
use syllabus::cli::{exit_code, map_error, Cli, Commands, RunContext};
use syllabus::config::SyllabusConfig;
use syllabus::error::ApiError;

fn context() -> RunContext {
    let api = api_with(temporary_store(), Arc::new(course_provider()));
    let config = SyllabusConfig {
        generation: test_settings(),
        ..SyllabusConfig::default()
    };
    RunContext::from_parts(Arc::new(api), config)
}

fn parse(args: &[&str]) -> Commands {
    let mut argv = vec!["syllabus"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap().command
}

async fn run_json(context: &RunContext, args: &[&str]) -> Value {
    let output = context.execute_async(&parse(args)).await.unwrap();
    serde_json::from_str(&output).unwrap()
}

#[test]
fn test_global_flags_and_create_arguments_parse() {
    let cli = Cli::try_parse_from([
        "syllabus",
        "--workspace",
        "/tmp/courses",
        "--quiet",
        "create",
        "Knots",
        "--chapters",
        "2",
        "--no-quiz",
    ])
    .unwrap();
    assert!(cli.quiet);
    assert_eq!(cli.workspace.to_str(), Some("/tmp/courses"));
    match cli.command {
        Commands::Create {
            topic,
            chapters,
            sections,
            no_quiz,
            ..
        } => {
            assert_eq!(topic, "Knots");
            assert_eq!(chapters, Some(2));
            assert_eq!(sections, None);
            assert!(no_quiz);
        }
        _ => panic!("expected create"),
    }

    let cli = Cli::try_parse_from([
        "syllabus", "quiz", "crs-1", "--answer", "q1=2", "--answer", "q2=0",
    ])
    .unwrap();
    match cli.command {
        Commands::Quiz { answers, user, .. } => {
            assert_eq!(answers, vec!["q1=2", "q2=0"]);
            assert!(user.is_none());
        }
        _ => panic!("expected quiz"),
    }
}

#[tokio::test]
async fn test_create_run_and_learn_through_the_cli() {
    let context = context();

    let created = run_json(
        &context,
        &["create", "Knots", "--chapters", "1", "--sections", "2", "--format", "json"],
    )
    .await;
    let id = created["course_id"].as_str().unwrap().to_string();
    assert_eq!(created["percent"], 0);

    let step = run_json(&context, &["step", &id, "--format", "json"]).await;
    assert_eq!(step["percent"], 10);
    assert_eq!(step["status"], "generating_outline");

    let report = run_json(&context, &["run", &id, "--no-delay", "--format", "json"]).await;
    assert_eq!(report["outcome"]["outcome"], "complete");
    assert_eq!(report["percents"].as_array().unwrap().last().unwrap(), 100);

    let status = run_json(&context, &["status", &id, "--format", "json"]).await;
    assert_eq!(status["percent_complete"], 100);

    let page = context.execute_async(&parse(&["show", &id])).await.unwrap();
    assert!(page.starts_with("# Knots for Sailors"));

    for section in ["chapter-0-section-0", "chapter-0-section-1"] {
        context
            .execute_async(&parse(&["complete", &id, section, "--user", "ada"]))
            .await
            .unwrap();
    }
    let quiz = run_json(
        &context,
        &[
            "quiz", &id, "--answer", "q1=1", "--answer", "q2=0", "--answer", "q3=0", "--user",
            "ada", "--format", "json",
        ],
    )
    .await;
    assert_eq!(quiz["score_percent"], 100);
    assert_eq!(quiz["passed"], true);

    let check = run_json(
        &context,
        &["certificate", &id, "--user", "ada", "--check", "--format", "json"],
    )
    .await;
    assert_eq!(check["eligible"], true);

    let certificate = run_json(
        &context,
        &["certificate", &id, "--user", "ada", "--name", "Ada L.", "--format", "json"],
    )
    .await;
    assert_eq!(certificate["learner_name"], "Ada L.");

    let listed = context.execute_async(&parse(&["list"])).await.unwrap();
    assert!(listed.contains("Knots for Sailors"));
    assert!(listed.contains("Total: 1 course(s)"));

    let journal = run_json(&context, &["log", &id, "--format", "json"]).await;
    let types: Vec<_> = journal
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap().to_string())
        .collect();
    assert!(types.contains(&"certificate_issued".to_string()));
}

#[tokio::test]
async fn test_edit_requires_a_change_and_a_finished_course() {
    let context = context();
    let created = run_json(&context, &["create", "Knots", "--format", "json"]).await;
    let id = created["course_id"].as_str().unwrap().to_string();

    let err = context
        .execute_async(&parse(&["edit", &id]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let err = context
        .execute_async(&parse(&["edit", &id, "--title", "Other"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidState(_)));
}

#[tokio::test]
async fn test_errors_map_to_messages_and_exit_codes() {
    let context = context();

    let err = context
        .execute_async(&parse(&["status", "not a course id"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
    assert_eq!(exit_code(&err), 1);

    let err = context
        .execute_async(&parse(&["status", "crs-0000000000000000"]))
        .await
        .unwrap_err();
    assert_eq!(exit_code(&err), 2);
    assert!(map_error(&err).starts_with("error[not_found]"));

    let err = context
        .execute_async(&parse(&["quiz", "crs-0000000000000000", "--answer", "q1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let err = context
        .execute_async(&parse(&["publish", "crs-0000000000000000"]))
        .await
        .unwrap_err();
    assert_eq!(exit_code(&err), 4);
}

#[tokio::test]
async fn test_edit_file_with_null_removes_quiz_and_cover() {
    let context = context();
    let created = run_json(
        &context,
        &["create", "Knots", "--chapters", "1", "--sections", "1", "--format", "json"],
    )
    .await;
    let id = created["course_id"].as_str().unwrap().to_string();
    run_json(&context, &["run", &id, "--no-delay", "--format", "json"]).await;

    let course_id = syllabus::course::CourseId::from(id.as_str());
    assert!(context.api().get_course(&course_id).unwrap().quiz.is_some());

    let dir = tempfile::TempDir::new().unwrap();
    let edits = dir.path().join("edits.json");
    std::fs::write(&edits, r#"{"quiz": null, "cover_image": null}"#).unwrap();
    context
        .execute_async(&parse(&["edit", &id, "--file", edits.to_str().unwrap()]))
        .await
        .unwrap();

    let course = context.api().get_course(&course_id).unwrap();
    assert_eq!(course.quiz, None);
    assert_eq!(course.cover_image, None);
    assert!(!context
        .execute_async(&parse(&["show", &id]))
        .await
        .unwrap()
        .contains("## Quiz"));
}
