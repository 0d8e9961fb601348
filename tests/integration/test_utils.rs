//! Shared test utilities for integration tests
//!
//! Provides centralized setup/teardown for XDG directories, a canned provider that
//! answers every chunk kind, and course API builders over temporary stores.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use syllabus::api::CourseApi;
use syllabus::config::{GenerationSettings, QuizSettings};
use syllabus::course::{BaseUrlImageResolver, CourseBrief, CourseId};
use syllabus::error::ApiError;
use syllabus::generation::prompts::{
    TASK_ANALYZE, TASK_INTRODUCTION, TASK_OUTLINE, TASK_QUIZ, TASK_SECTION,
};
use syllabus::generation::{DriveOutcome, DriverPolicy, PollingDriver};
use syllabus::provider::{
    ChatMessage, CompletionOptions, MessageRole, ModelProviderClient, ScriptedProvider,
};
use syllabus::publish::{DirectoryTarget, PublicationTarget};
use syllabus::store::Store;
use tempfile::TempDir;

/// Global mutex to serialize XDG environment variable access across all tests
/// This prevents race conditions when tests run in parallel
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Environment variable state to restore after test
struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
    xdg_data_home: Option<String>,
    extra: Vec<(String, Option<String>)>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
            xdg_data_home: std::env::var("XDG_DATA_HOME").ok(),
            extra: Vec::new(),
        }
    }

    fn capture_var(&mut self, key: &str) {
        self.extra.push((key.to_string(), std::env::var(key).ok()));
    }

    fn restore(self) {
        if let Some(orig) = self.home {
            std::env::set_var("HOME", orig);
        } else {
            std::env::remove_var("HOME");
        }

        if let Some(orig) = self.xdg_config_home {
            std::env::set_var("XDG_CONFIG_HOME", orig);
        } else {
            std::env::remove_var("XDG_CONFIG_HOME");
        }

        if let Some(orig) = self.xdg_data_home {
            std::env::set_var("XDG_DATA_HOME", orig);
        } else {
            std::env::remove_var("XDG_DATA_HOME");
        }

        for (key, value) in self.extra {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Set up isolated XDG directories for a test with automatic cleanup
///
/// This function:
/// - Creates isolated XDG_CONFIG_HOME and XDG_DATA_HOME directories in the temp dir
/// - Sets HOME to ensure fallback paths work correctly
/// - Automatically restores original environment variables after the test
/// - Uses a global mutex to prevent race conditions in parallel test execution
///
/// # Example
/// ```
/// use tempfile::TempDir;
/// use crate::integration::test_utils::with_xdg_env;
///
/// let test_dir = TempDir::new().unwrap();
/// with_xdg_env(&test_dir, || {
///     // Your test code here
///     // XDG_CONFIG_HOME and XDG_DATA_HOME are set to test_dir
/// });
/// // Environment automatically restored
/// ```
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    // Set up test directories
    let test_config_home = test_dir.path().to_path_buf();
    let test_data_home = test_dir.path().join("data");
    let test_home = test_dir.path().join("home");

    std::fs::create_dir_all(&test_data_home).unwrap();
    std::fs::create_dir_all(&test_home).unwrap();

    // Set environment variables
    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_config_home.to_str().unwrap());
    std::env::set_var("XDG_DATA_HOME", test_data_home.to_str().unwrap());

    // Run test
    let result = f();

    // Restore original environment
    env_state.restore();

    result
}

/// Like [`with_xdg_env`], with extra environment variables set for the duration.
pub fn with_xdg_env_vars<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let mut env_state = EnvState::capture();
    for (key, _) in vars {
        env_state.capture_var(key);
    }

    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_home).unwrap();
    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().to_str().unwrap());
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = f();

    env_state.restore();

    result
}

pub const MIN_SECTION_CHARS: usize = 40;

pub fn analysis_json(title: &str) -> String {
    serde_json::json!({
        "title": title,
        "description": format!("A practical introduction to {}", title),
        "targetAudience": "Curious beginners",
        "difficulty": "beginner",
        "estimatedTime": "2 hours",
        "learningObjectives": ["Know the basics", "Practice safely"],
    })
    .to_string()
}

/// Outline with `chapters` x `sections` titles.
pub fn outline_json(chapters: usize, sections: usize) -> String {
    let chapters: Vec<_> = (1..=chapters)
        .map(|c| {
            serde_json::json!({
                "title": format!("Chapter topic {}", c),
                "sections": (1..=sections).map(|s| format!("Lesson {}.{}", c, s)).collect::<Vec<_>>(),
            })
        })
        .collect();
    serde_json::json!({ "chapters": chapters }).to_string()
}

pub fn section_json(label: &str) -> String {
    serde_json::json!({
        "introduction": format!("This chapter opens with {}.", label),
        "content": format!("## {}\n\nA worked explanation of {} with enough detail to read.", label, label),
    })
    .to_string()
}

pub fn introduction_json() -> String {
    serde_json::json!({ "introduction": "What this chapter covers and why it matters." }).to_string()
}

/// Three questions; the correct answers are q1=1, q2=0, q3=0.
pub fn quiz_json() -> String {
    serde_json::json!({
        "description": "Check what you learned",
        "questions": [
            {
                "question": "Which knot makes a fixed loop?",
                "type": "multiple-choice",
                "options": ["Clove hitch", "Bowline", "Sheet bend"],
                "correctAnswer": 1
            },
            {
                "question": "A reef knot joins two ropes of equal size.",
                "type": "true-false",
                "correctAnswer": true
            },
            {
                "question": "Pick the figure-eight.",
                "type": "image-choice",
                "image_options": ["figure-eight.png", "granny.png"],
                "correctAnswer": 0
            }
        ]
    })
    .to_string()
}

/// Correct answers for [`quiz_json`].
pub fn correct_answers() -> std::collections::BTreeMap<String, usize> {
    [("q1", 1), ("q2", 0), ("q3", 0)]
        .into_iter()
        .map(|(id, answer)| (id.to_string(), answer))
        .collect()
}

fn user_prompt(messages: &[ChatMessage]) -> &str {
    messages
        .iter()
        .find(|m| m.role == MessageRole::User)
        .map(|m| m.content.as_str())
        .unwrap_or_default()
}

/// Answers each chunk kind by its `TASK:` line. The outline is oversized and gets truncated
/// to whatever the brief asked for.
pub fn course_responder(messages: &[ChatMessage]) -> Result<String, ApiError> {
    let prompt = user_prompt(messages);
    if prompt.starts_with(TASK_ANALYZE) {
        Ok(analysis_json("Knots for Sailors"))
    } else if prompt.starts_with(TASK_OUTLINE) {
        Ok(outline_json(10, 10))
    } else if prompt.starts_with(TASK_SECTION) {
        Ok(section_json("a lesson"))
    } else if prompt.starts_with(TASK_INTRODUCTION) {
        Ok(introduction_json())
    } else if prompt.starts_with(TASK_QUIZ) {
        Ok(quiz_json())
    } else {
        Err(ApiError::ProviderError(format!(
            "unexpected prompt: {}",
            prompt.lines().next().unwrap_or_default()
        )))
    }
}

pub fn course_provider() -> ScriptedProvider {
    ScriptedProvider::new().with_responder(course_responder)
}

/// The `TASK:` line of every prompt the provider has seen.
pub fn task_lines(provider: &ScriptedProvider) -> Vec<String> {
    provider
        .prompts()
        .iter()
        .map(|p| p.lines().next().unwrap_or_default().to_string())
        .collect()
}

pub fn test_settings() -> GenerationSettings {
    GenerationSettings {
        min_section_chars: MIN_SECTION_CHARS,
        driver: DriverPolicy::immediate(),
        ..GenerationSettings::default()
    }
}

pub fn temporary_store() -> Store {
    Store::temporary(Duration::from_secs(60)).unwrap()
}

pub fn api_with(store: Store, provider: Arc<ScriptedProvider>) -> CourseApi {
    CourseApi::with_parts(
        store,
        Some(provider as Arc<dyn ModelProviderClient>),
        None,
        test_settings(),
        QuizSettings::default(),
        CompletionOptions::default(),
    )
}

pub fn directory_target(output_dir: &Path) -> Arc<dyn PublicationTarget> {
    Arc::new(DirectoryTarget::new(
        output_dir,
        "https://learn.example.com/courses",
        Box::new(BaseUrlImageResolver::new("https://cdn.example.com/uploads")),
    ))
}

pub fn publishing_api(provider: Arc<ScriptedProvider>, output_dir: &Path) -> CourseApi {
    CourseApi::with_parts(
        temporary_store(),
        Some(provider as Arc<dyn ModelProviderClient>),
        Some(directory_target(output_dir)),
        test_settings(),
        QuizSettings::default(),
        CompletionOptions::default(),
    )
}

/// Create a course and drive it to completion.
pub async fn generate_course(api: &CourseApi, brief: CourseBrief) -> CourseId {
    let created = api.create_course(brief).unwrap();
    let report = PollingDriver::new(DriverPolicy::immediate())
        .drive(api, &created.course_id)
        .await
        .unwrap();
    assert_eq!(report.outcome, DriveOutcome::Complete);
    created.course_id
}
