//! Course command presentation: create, step, run, status, list, show, publish, log.

use super::shared::{heading, percent_bar, status_label, to_json, OutputFormat};
use crate::api::{CourseCreated, PublishResult};
use crate::course::{
    render_markdown, Course, CourseId, CourseSummary, GenerationState, GenerationStatus,
    ImageResolver,
};
use crate::error::ApiError;
use crate::generation::{ChunkResult, DriveOutcome, DriveReport};
use crate::store::JournalEvent;
use chrono::{TimeZone, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

pub fn format_created(created: &CourseCreated, format: OutputFormat) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => to_json(created),
        OutputFormat::Text => Ok(format!(
            "Created course {}\n{}\n\nRun 'syllabus run {}' to generate it.",
            created.course_id.bold(),
            created.message,
            created.course_id
        )),
    }
}

pub fn format_chunk_result(result: &ChunkResult, format: OutputFormat) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(result);
    }
    let mut out = format!(
        "{} {}  {}",
        percent_bar(result.percent, 30),
        status_label(result.status),
        result.message
    );
    if let Some(error) = &result.error {
        let hint = if result.is_failed() {
            "generation failed"
        } else if result.retryable {
            "retry the same chunk"
        } else {
            "not retryable"
        };
        out.push_str(&format!("\n{} {} ({})", "error:".red(), error, hint));
    }
    Ok(out)
}

pub fn format_drive_report(report: &DriveReport, format: OutputFormat) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(report);
    }
    let headline = match &report.outcome {
        DriveOutcome::Complete => format!("{}", "Course complete".green().bold()),
        DriveOutcome::Failed { error } => format!("{} {}", "Generation failed:".red().bold(), error),
        DriveOutcome::TakingLonger => format!(
            "{}",
            "Generation is taking longer than expected; the course stays resumable. Run the command again to continue."
                .yellow()
        ),
    };
    let mut out = headline;
    out.push_str(&format!(
        "\n  Chunk calls: {}\n  Committed:   {}\n  Errors:      {}",
        report.attempts, report.committed, report.errors
    ));
    if let Some(last) = &report.last {
        out.push_str(&format!("\n  Progress:    {}", percent_bar(last.percent, 30)));
    }
    Ok(out)
}

pub fn format_progress(
    course_id: &CourseId,
    state: &GenerationState,
    format: OutputFormat,
) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(state);
    }
    let mut out = format!("{}\n", heading(&format!("Course {}", course_id)));
    out.push_str(&format!("  Status:   {}\n", status_label(state.status)));
    out.push_str(&format!("  Progress: {}\n", percent_bar(state.percent_complete, 30)));
    out.push_str(&format!("  Task:     {}\n", state.current_task));
    if state.status == GenerationStatus::ExpandingContent {
        out.push_str(&format!(
            "  Cursor:   chapter {} of {}\n",
            state.current_chapter_index + 1,
            state.total_chapters
        ));
    }
    if state.validation_failures > 0 {
        out.push_str(&format!("  Rejected responses: {}\n", state.validation_failures));
    }
    if let Some(error) = &state.error {
        out.push_str(&format!("  {} {}\n", "Error:".red(), error));
    }
    Ok(out.trim_end().to_string())
}

pub fn format_course_list(
    courses: &[CourseSummary],
    format: OutputFormat,
) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(courses);
    }
    if courses.is_empty() {
        return Ok("No courses found.\n\nUse 'syllabus create <topic>' to start one.".to_string());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Course", "Title", "Status", "%", "Sections", "Quiz", "Published"]);
    for course in courses {
        table.add_row(vec![
            course.id.to_string(),
            course.title.clone(),
            course.status.to_string(),
            course.percent_complete.to_string(),
            course.sections.to_string(),
            if course.has_quiz { "yes" } else { "no" }.to_string(),
            if course.published { "yes" } else { "no" }.to_string(),
        ]);
    }
    Ok(format!("{}\n\nTotal: {} course(s)", table, courses.len()))
}

/// Markdown for learners; json is the stored document.
pub fn format_course(
    course: &Course,
    format: OutputFormat,
    resolver: &dyn ImageResolver,
) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => to_json(course),
        OutputFormat::Text => Ok(render_markdown(course, resolver)),
    }
}

pub fn format_publish_result(
    result: &PublishResult,
    format: OutputFormat,
) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => to_json(result),
        OutputFormat::Text => Ok(format!("Published {} at {}", result.course_id, result.permalink)),
    }
}

pub fn format_journal(events: &[JournalEvent], format: OutputFormat) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(events);
    }
    if events.is_empty() {
        return Ok("Journal is empty.".to_string());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Seq", "Time", "Event", "Details"]);
    for event in events {
        let time = Utc
            .timestamp_millis_opt(event.ts_ms as i64)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| event.ts_ms.to_string());
        let details = if event.data.is_null() {
            String::new()
        } else {
            event.data.to_string()
        };
        table.add_row(vec![
            event.seq.to_string(),
            time,
            event.event_type.clone(),
            details,
        ]);
    }
    Ok(table.to_string())
}
