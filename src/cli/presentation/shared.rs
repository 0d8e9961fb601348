//! Shared presentation helpers.

use crate::course::GenerationStatus;
use crate::error::{ApiError, StorageError};
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Anything other than "json" is text.
    pub fn parse(format: &str) -> Self {
        if format.eq_ignore_ascii_case("json") {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::StorageError(StorageError::from_json(e)))
}

pub(super) fn status_label(status: GenerationStatus) -> String {
    match status {
        GenerationStatus::Complete => status.as_str().green().to_string(),
        GenerationStatus::Failed => status.as_str().red().to_string(),
        _ => status.as_str().yellow().to_string(),
    }
}

pub(super) fn heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Text-mode progress bar, `width` cells wide.
pub(super) fn percent_bar(percent: u8, width: usize) -> String {
    let filled = (percent.min(100) as usize * width) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        percent
    )
}
