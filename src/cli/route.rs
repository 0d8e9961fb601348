//! CLI route: single route table and run context. Dispatches to the course API and presentation.

use crate::api::CourseApi;
use crate::config::{ConfigLoader, SyllabusConfig};
use crate::course::{BaseUrlImageResolver, CourseBrief, CourseEdits, CourseId};
use crate::error::ApiError;
use crate::generation::PollingDriver;
use crate::provider::{ModelProviderClient, ProviderFactory};
use crate::store::Store;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_certificate, format_chunk_result, format_course, format_course_list, format_created,
    format_drive_report, format_eligibility, format_journal, format_progress,
    format_progress_summary, format_publish_result, format_quiz_result, OutputFormat,
};

/// Runtime context for CLI execution: loaded configuration and the course API.
pub struct RunContext {
    api: Arc<CourseApi>,
    config: SyllabusConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        if let Err(errors) = config.validate() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(ApiError::ConfigError(messages.join("; ")));
        }

        let store_path = config.storage.resolve_store_path(&workspace_root);
        let store = Store::open(
            &store_path,
            Duration::from_secs(config.generation.lease_ttl_secs),
        )?;
        let provider: Option<Arc<dyn ModelProviderClient>> = config
            .provider
            .as_ref()
            .map(ProviderFactory::create_client)
            .transpose()?;
        debug!(
            store = ?store_path,
            provider = provider.as_ref().map(|p| p.provider_name()).unwrap_or("none"),
            "Run context ready"
        );

        let api = CourseApi::new(store, provider, &config);
        Ok(Self::from_parts(Arc::new(api), config))
    }

    pub fn from_parts(api: Arc<CourseApi>, config: SyllabusConfig) -> Self {
        Self { api, config }
    }

    /// Reference to the underlying course API.
    pub fn api(&self) -> &CourseApi {
        &self.api
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::ConfigError(format!("Failed to start async runtime: {}", e)))?;
        runtime.block_on(self.execute_async(command))
    }

    /// Same as [`RunContext::execute`], for callers already inside a runtime.
    pub async fn execute_async(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = self.execute_inner(command).await;
        debug!(
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Create {
                topic,
                chapters,
                sections,
                audience,
                difficulty,
                language,
                notes,
                no_quiz,
                questions,
                format,
            } => {
                let settings = &self.config.generation;
                let mut brief = CourseBrief::new(
                    topic.clone(),
                    chapters.unwrap_or(settings.default_chapters),
                    sections.unwrap_or(settings.default_sections_per_chapter),
                );
                brief.audience = audience.clone();
                brief.difficulty = difficulty.clone();
                brief.language = language.clone();
                brief.notes = notes.clone();
                brief.include_quiz = settings.include_quiz && !*no_quiz;
                brief.quiz_questions = questions.unwrap_or(settings.quiz_questions);
                let created = self.api.create_course(brief)?;
                format_created(&created, OutputFormat::parse(format))
            }
            Commands::Step { course_id, format } => {
                let id = parse_course_id(course_id)?;
                let result = self.api.execute_next_chunk(&id).await?;
                format_chunk_result(&result, OutputFormat::parse(format))
            }
            Commands::Run {
                course_id,
                max_attempts,
                no_delay,
                format,
            } => {
                let id = parse_course_id(course_id)?;
                let mut policy = self.config.generation.driver.clone();
                if *no_delay {
                    policy.success_delay_ms = 0;
                    policy.error_delay_ms = 0;
                }
                if let Some(max) = max_attempts {
                    policy.max_attempts = *max;
                }
                info!(course_id = %id, max_attempts = policy.max_attempts, "Driving generation");
                let report = PollingDriver::new(policy).drive(self.api.as_ref(), &id).await?;
                format_drive_report(&report, OutputFormat::parse(format))
            }
            Commands::Status { course_id, format } => {
                let id = parse_course_id(course_id)?;
                let state = self.api.get_progress(&id)?;
                format_progress(&id, &state, OutputFormat::parse(format))
            }
            Commands::Show { course_id, format } => {
                let id = parse_course_id(course_id)?;
                let course = self.api.get_course(&id)?;
                let resolver = BaseUrlImageResolver::new(self.config.images.base_url.clone());
                format_course(&course, OutputFormat::parse(format), &resolver)
            }
            Commands::List { format } => {
                let courses = self.api.list_courses()?;
                format_course_list(&courses, OutputFormat::parse(format))
            }
            Commands::Edit {
                course_id,
                file,
                title,
                description,
                format,
            } => {
                let id = parse_course_id(course_id)?;
                let mut edits = match file {
                    Some(path) => read_edits(path)?,
                    None => CourseEdits::default(),
                };
                if title.is_some() {
                    edits.title = title.clone();
                }
                if description.is_some() {
                    edits.description = description.clone();
                }
                if edits.is_empty() {
                    return Err(ApiError::InvalidInput(
                        "no edits given; use --file, --title or --description".to_string(),
                    ));
                }
                let course = self.api.update_course(&id, &edits)?;
                match OutputFormat::parse(format) {
                    OutputFormat::Json => crate::cli::presentation::to_json(&course.summary()),
                    OutputFormat::Text => Ok(format!("Updated course {}", course.id)),
                }
            }
            Commands::Delete { course_id } => {
                let id = parse_course_id(course_id)?;
                self.api.delete_course(&id)?;
                Ok(format!("Deleted course {}", id))
            }
            Commands::Publish { course_id, format } => {
                let id = parse_course_id(course_id)?;
                let result = self.api.publish(&id)?;
                format_publish_result(&result, OutputFormat::parse(format))
            }
            Commands::Unpublish { course_id } => {
                let id = parse_course_id(course_id)?;
                self.api.unpublish(&id)?;
                Ok(format!("Unpublished course {}", id))
            }
            Commands::Complete {
                course_id,
                section_id,
                user,
                format,
            } => {
                let id = parse_course_id(course_id)?;
                let summary = self.api.mark_section_complete(&id, user, section_id)?;
                format_progress_summary(&summary, OutputFormat::parse(format))
            }
            Commands::Incomplete {
                course_id,
                section_id,
                user,
                format,
            } => {
                let id = parse_course_id(course_id)?;
                let summary = self.api.mark_section_incomplete(&id, user, section_id)?;
                format_progress_summary(&summary, OutputFormat::parse(format))
            }
            Commands::Quiz {
                course_id,
                answers,
                user,
                format,
            } => {
                let id = parse_course_id(course_id)?;
                let answers = parse_answers(answers)?;
                let result = match user {
                    Some(user) => self.api.submit_quiz(&id, user, &answers)?,
                    None => self.api.grade_quiz(&id, &answers)?,
                };
                format_quiz_result(&result, OutputFormat::parse(format))
            }
            Commands::Certificate {
                course_id,
                user,
                name,
                check,
                format,
            } => {
                let id = parse_course_id(course_id)?;
                if *check {
                    let eligible = self.api.certificate_eligible(&id, user)?;
                    return format_eligibility(user, eligible, OutputFormat::parse(format));
                }
                let certificate =
                    self.api
                        .issue_certificate(&id, user, name.as_deref().unwrap_or(user))?;
                format_certificate(&certificate, OutputFormat::parse(format))
            }
            Commands::Log { course_id, format } => {
                let id = parse_course_id(course_id)?;
                let events = self.api.journal(&id)?;
                format_journal(&events, OutputFormat::parse(format))
            }
        }
    }
}

fn parse_course_id(raw: &str) -> Result<CourseId, ApiError> {
    CourseId::parse(raw).map_err(ApiError::InvalidInput)
}

/// Parse `question=index` pairs. A repeated question keeps its last answer.
pub fn parse_answers(raw: &[String]) -> Result<BTreeMap<String, usize>, ApiError> {
    let mut answers = BTreeMap::new();
    for pair in raw {
        let (question, index) = pair.split_once('=').ok_or_else(|| {
            ApiError::InvalidInput(format!("answer must look like q1=2, got {}", pair))
        })?;
        let index = index.trim().parse::<usize>().map_err(|_| {
            ApiError::InvalidInput(format!("answer index must be a number, got {}", pair))
        })?;
        answers.insert(question.trim().to_string(), index);
    }
    Ok(answers)
}

/// Edits file in TOML (by extension) or JSON.
fn read_edits(path: &Path) -> Result<CourseEdits, ApiError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ApiError::InvalidInput(format!("Failed to read edits file {:?}: {}", path, e))
    })?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    if is_toml {
        toml::from_str(&raw)
            .map_err(|e| ApiError::InvalidInput(format!("Invalid edits file {:?}: {}", path, e)))
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| ApiError::InvalidInput(format!("Invalid edits file {:?}: {}", path, e)))
    }
}
