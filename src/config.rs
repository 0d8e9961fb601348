//! Configuration System
//!
//! Layered configuration for the generation engine, the text-generation provider,
//! quiz grading, publication and logging. Built-in defaults are overridden by the
//! global config file, then the workspace config files, then `SYLLABUS__*`
//! environment variables.

use crate::course::BriefLimits;
use crate::generation::driver::DriverPolicy;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge;
mod paths;
mod sources;

pub use facade::ConfigLoader;

/// XDG path helpers
pub mod xdg {
    pub use super::paths::*;
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyllabusConfig {
    /// Text-generation provider; generation commands fail without one.
    #[serde(default)]
    pub provider: Option<ProviderConfig>,

    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub quiz: QuizSettings,

    #[serde(default)]
    pub publication: PublicationSettings,

    #[serde(default)]
    pub images: ImageSettings,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chunk sizing, validation bounds and the per-course lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub default_chapters: usize,
    pub default_sections_per_chapter: usize,
    pub max_chapters: usize,
    pub max_sections_per_chapter: usize,
    /// Minimum characters for an expanded section to be accepted
    pub min_section_chars: usize,
    /// Rejected responses tolerated for one unit before the course fails
    pub max_validation_retries: u32,
    /// Lease expiry; must outlive one provider request
    pub lease_ttl_secs: u64,
    pub include_quiz: bool,
    pub quiz_questions: usize,
    pub max_quiz_questions: usize,
    pub words_per_minute: usize,
    pub driver: DriverPolicy,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            default_chapters: 3,
            default_sections_per_chapter: 3,
            max_chapters: 20,
            max_sections_per_chapter: 10,
            min_section_chars: 200,
            max_validation_retries: 3,
            lease_ttl_secs: 300,
            include_quiz: true,
            quiz_questions: 5,
            max_quiz_questions: 20,
            words_per_minute: 200,
            driver: DriverPolicy::default(),
        }
    }
}

impl GenerationSettings {
    pub fn brief_limits(&self) -> BriefLimits {
        BriefLimits {
            max_chapters: self.max_chapters,
            max_sections_per_chapter: self.max_sections_per_chapter,
            max_quiz_questions: self.max_quiz_questions,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_chapters == 0 || self.max_sections_per_chapter == 0 {
            return Err("max_chapters and max_sections_per_chapter must be positive".to_string());
        }
        if self.default_chapters == 0 || self.default_chapters > self.max_chapters {
            return Err(format!(
                "default_chapters must be between 1 and {}",
                self.max_chapters
            ));
        }
        if self.default_sections_per_chapter == 0
            || self.default_sections_per_chapter > self.max_sections_per_chapter
        {
            return Err(format!(
                "default_sections_per_chapter must be between 1 and {}",
                self.max_sections_per_chapter
            ));
        }
        if self.max_validation_retries == 0 {
            return Err("max_validation_retries must be at least 1".to_string());
        }
        if self.lease_ttl_secs == 0 {
            return Err("lease_ttl_secs must be positive".to_string());
        }
        if self.words_per_minute == 0 {
            return Err("words_per_minute must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
    /// Minimum score percentage to pass, compared with `>=`
    pub pass_threshold: u8,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self { pass_threshold: 70 }
    }
}

/// Where published courses are materialized. Both fields are required to publish.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationSettings {
    pub output_dir: Option<PathBuf>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub base_url: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            base_url: "/uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Course store location, relative paths resolve against the workspace root
    pub store_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(".syllabus/store"),
        }
    }
}

impl StorageConfig {
    pub fn resolve_store_path(&self, workspace_root: &Path) -> PathBuf {
        if self.store_path.is_absolute() {
            self.store_path.clone()
        } else {
            workspace_root.join(&self.store_path)
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String),
    Generation(String),
    Quiz(String),
    Publication(String),
    Storage(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Quiz(msg) => write!(f, "Quiz: {}", msg),
            ValidationError::Publication(msg) => write!(f, "Publication: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl SyllabusConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(provider) = &self.provider {
            if let Err(e) = provider.validate() {
                errors.push(ValidationError::Provider(e));
            }
        }

        if let Err(e) = self.generation.validate() {
            errors.push(ValidationError::Generation(e));
        }

        if self.quiz.pass_threshold > 100 {
            errors.push(ValidationError::Quiz(format!(
                "pass_threshold must be between 0 and 100 (got {})",
                self.quiz.pass_threshold
            )));
        }

        if let Some(base_url) = &self.publication.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                errors.push(ValidationError::Publication(format!(
                    "base_url must be an http(s) URL (got {})",
                    base_url
                )));
            }
        }

        if self.storage.store_path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage(
                "store_path cannot be empty".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
