//! Error types for the Syllabus course generation engine.

use crate::course::CourseId;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document changed concurrently: {0}")]
    ConcurrentModification(String),

    #[error("Corrupt document {key}: {message}")]
    Corrupt { key: String, message: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn from_sled(err: sled::Error) -> Self {
        StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            err.to_string(),
        ))
    }

    pub(crate) fn from_json(err: serde_json::Error) -> Self {
        StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err.to_string(),
        ))
    }
}

/// Surface errors for every course operation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Course not found: {0}")]
    CourseNotFound(CourseId),

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Question not found: {0}")]
    QuestionNotFound(String),

    #[error("Invalid course brief: {0}")]
    InvalidBrief(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Generated content rejected: {0}")]
    Validation(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Publication target not configured: {0}")]
    PublicationNotConfigured(String),

    #[error("Publication failed: {0}")]
    PublicationFailed(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ApiError {
    /// Transport and validation failures leave the course resumable; the
    /// caller may retry the same chunk.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::ProviderError(_)
            | ApiError::ProviderRequestFailed(_)
            | ApiError::ProviderRateLimit(_)
            | ApiError::Validation(_)
            | ApiError::Conflict(_) => true,
            ApiError::StorageError(StorageError::ConcurrentModification(_)) => true,
            _ => false,
        }
    }

    /// Provider failures that no amount of retrying will fix.
    pub fn is_irrecoverable_provider_error(&self) -> bool {
        matches!(
            self,
            ApiError::ProviderAuthFailed(_) | ApiError::ProviderModelNotFound(_)
        )
    }

    /// Short machine-readable category, used in chunk results and the journal.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::ProviderError(_)
            | ApiError::ProviderRequestFailed(_)
            | ApiError::ProviderRateLimit(_) => "transport",
            ApiError::ProviderAuthFailed(_) | ApiError::ProviderModelNotFound(_) => "provider",
            ApiError::Validation(_) => "validation",
            ApiError::InvalidBrief(_) => "invalid_brief",
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::CourseNotFound(_)
            | ApiError::SectionNotFound(_)
            | ApiError::QuestionNotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::StorageError(StorageError::ConcurrentModification(_)) => "conflict",
            ApiError::InvalidState(_) => "invalid_state",
            ApiError::PublicationNotConfigured(_) | ApiError::ConfigError(_) => "configuration",
            ApiError::PublicationFailed(_) => "publication",
            ApiError::StorageError(_) => "storage",
        }
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
