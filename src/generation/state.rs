//! Generation state machine.
//!
//! Pure functions over the course document: which unit runs next, how a
//! finished unit transforms the document, and the deterministic progress
//! percentage. Nothing here performs I/O.

use super::parse::{Analysis, Outline, SectionDraft};
use crate::course::{
    Chapter, Course, GenerationState, GenerationStatus, Quiz, Section, INTRO_SENTINEL,
};
use crate::error::ApiError;

pub const ANALYZED_PERCENT: u8 = 10;
pub const OUTLINED_PERCENT: u8 = 20;
const EXPANSION_SPAN: usize = 70;
pub const EXPANDED_PERCENT: u8 = OUTLINED_PERCENT + EXPANSION_SPAN as u8;
pub const COMPLETE_PERCENT: u8 = 100;

/// The single unit of work the checkpoint points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkAction {
    Analyze,
    Outline,
    /// Section 0 of a chapter also writes the chapter introduction.
    ExpandSection { chapter: usize, section: usize },
    /// Introduction of a chapter that has no sections.
    ExpandIntroduction { chapter: usize },
    Finalize,
}

impl ChunkAction {
    pub fn name(&self) -> &'static str {
        match self {
            ChunkAction::Analyze => "analyze",
            ChunkAction::Outline => "outline",
            ChunkAction::ExpandSection { .. } => "expand_section",
            ChunkAction::ExpandIntroduction { .. } => "expand_introduction",
            ChunkAction::Finalize => "finalize",
        }
    }
}

/// Expansion cursor position after a unit commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    At { chapter: usize, section: usize },
    Done,
}

/// Read the checkpoint and name the next unit. Terminal courses have none.
pub fn next_action(course: &Course) -> Result<Option<ChunkAction>, ApiError> {
    let state = &course.generation;
    match state.status {
        GenerationStatus::Analyzing => Ok(Some(ChunkAction::Analyze)),
        GenerationStatus::GeneratingOutline => Ok(Some(ChunkAction::Outline)),
        GenerationStatus::ExpandingContent => {
            let chapter = state.current_chapter_index;
            let Some(ch) = course.chapters.get(chapter) else {
                return Err(ApiError::InvalidState(format!(
                    "cursor chapter {} is outside the outline ({} chapters)",
                    chapter,
                    course.chapters.len()
                )));
            };
            let section = state.current_section_index;
            if section == INTRO_SENTINEL {
                return Ok(Some(ChunkAction::ExpandIntroduction { chapter }));
            }
            if section >= ch.sections.len() {
                return Err(ApiError::InvalidState(format!(
                    "cursor section {} is outside chapter {} ({} sections)",
                    section,
                    chapter,
                    ch.sections.len()
                )));
            }
            Ok(Some(ChunkAction::ExpandSection { chapter, section }))
        }
        GenerationStatus::Finalizing => Ok(Some(ChunkAction::Finalize)),
        GenerationStatus::Complete | GenerationStatus::Failed => Ok(None),
    }
}

/// Expansion units a chapter contributes; an empty chapter still needs its introduction.
fn chapter_units(chapter: &Chapter) -> usize {
    chapter.sections.len().max(1)
}

pub fn total_units(chapters: &[Chapter]) -> usize {
    chapters.iter().map(chapter_units).sum()
}

/// Units finished before the cursor at (`chapter`, `section`).
pub fn units_before(chapters: &[Chapter], chapter: usize, section: usize) -> usize {
    let earlier: usize = chapters.iter().take(chapter).map(chapter_units).sum();
    if section == INTRO_SENTINEL {
        earlier
    } else {
        earlier + section
    }
}

pub fn expansion_percent(done_units: usize, total_units: usize) -> u8 {
    if total_units == 0 {
        return EXPANDED_PERCENT;
    }
    let done = done_units.min(total_units);
    (OUTLINED_PERCENT as usize + EXPANSION_SPAN * done / total_units) as u8
}

/// First unit of `chapter`, or the next chapter's when it does not exist.
fn chapter_start(chapters: &[Chapter], chapter: usize) -> Cursor {
    match chapters.get(chapter) {
        None => Cursor::Done,
        Some(ch) if ch.sections.is_empty() => Cursor::At {
            chapter,
            section: INTRO_SENTINEL,
        },
        Some(_) => Cursor::At { chapter, section: 0 },
    }
}

/// Cursor after the unit at (`chapter`, `section`) has been completed.
pub fn advance(chapters: &[Chapter], chapter: usize, section: usize) -> Cursor {
    let sections = chapters.get(chapter).map(|c| c.sections.len()).unwrap_or(0);
    if section == INTRO_SENTINEL || section + 1 >= sections {
        chapter_start(chapters, chapter + 1)
    } else {
        Cursor::At {
            chapter,
            section: section + 1,
        }
    }
}

fn raise_percent(state: &mut GenerationState, percent: u8) {
    state.percent_complete = state.percent_complete.max(percent);
}

fn section_task(course: &Course, chapter: usize, section: usize) -> String {
    let chapter_title = course
        .chapters
        .get(chapter)
        .map(|c| c.title.as_str())
        .unwrap_or_default();
    if section == INTRO_SENTINEL {
        return format!("Writing chapter {} introduction: {}", chapter + 1, chapter_title);
    }
    let section_title = course
        .chapters
        .get(chapter)
        .and_then(|c| c.sections.get(section))
        .map(|s| s.title.as_str())
        .unwrap_or_default();
    format!(
        "Writing chapter {}, section {}: {}",
        chapter + 1,
        section + 1,
        section_title
    )
}

/// Point the checkpoint at `cursor`, or move to `finalizing` when expansion is done.
fn move_cursor(course: &mut Course, cursor: Cursor) {
    let total = total_units(&course.chapters);
    match cursor {
        Cursor::At { chapter, section } => {
            let done = units_before(&course.chapters, chapter, section);
            let task = section_task(course, chapter, section);
            let sections = course
                .chapters
                .get(chapter)
                .map(|c| c.sections.len())
                .unwrap_or(0);
            let state = &mut course.generation;
            state.status = GenerationStatus::ExpandingContent;
            state.current_chapter_index = chapter;
            state.current_section_index = section;
            state.total_sections_in_current_chapter = sections;
            state.current_task = task;
            raise_percent(state, expansion_percent(done, total));
        }
        Cursor::Done => {
            let state = &mut course.generation;
            state.status = GenerationStatus::Finalizing;
            state.current_task = "Writing quiz and course summary".to_string();
            raise_percent(state, expansion_percent(total, total));
        }
    }
}

fn succeeded(course: &mut Course) {
    course.generation.validation_failures = 0;
    course.generation.error = None;
}

pub fn apply_analysis(course: &Course, analysis: Analysis) -> Course {
    let mut next = course.clone();
    next.title = analysis.title;
    next.description = analysis.description;
    if let Some(audience) = analysis.target_audience.filter(|a| !a.trim().is_empty()) {
        next.target_audience = audience;
    }
    if let Some(difficulty) = analysis.difficulty.filter(|d| !d.trim().is_empty()) {
        next.difficulty = difficulty;
    }
    if let Some(estimated_time) = analysis.estimated_time {
        next.estimated_time = estimated_time;
    }
    next.learning_objectives = analysis.learning_objectives;
    next.generation.status = GenerationStatus::GeneratingOutline;
    next.generation.current_task = "Generating course outline".to_string();
    raise_percent(&mut next.generation, ANALYZED_PERCENT);
    succeeded(&mut next);
    next
}

pub fn apply_outline(course: &Course, outline: Outline) -> Course {
    let mut next = course.clone();
    next.chapters = outline
        .chapters
        .into_iter()
        .map(|chapter| Chapter {
            title: chapter.title,
            introduction: String::new(),
            sections: chapter.sections.into_iter().map(Section::titled).collect(),
        })
        .collect();
    next.generation.total_chapters = next.chapters.len();
    raise_percent(&mut next.generation, OUTLINED_PERCENT);
    let start = chapter_start(&next.chapters, 0);
    move_cursor(&mut next, start);
    succeeded(&mut next);
    next
}

/// Fill one section; the draft's introduction is only used for section 0.
pub fn apply_section(course: &Course, chapter: usize, section: usize, draft: SectionDraft) -> Course {
    let mut next = course.clone();
    if let Some(ch) = next.chapters.get_mut(chapter) {
        if section == 0 {
            if let Some(introduction) = draft.introduction {
                ch.introduction = introduction;
            }
        }
        if let Some(target) = ch.sections.get_mut(section) {
            target.content = draft.content;
            if draft.image.is_some() {
                target.image = draft.image;
            }
        }
    }
    let cursor = advance(&next.chapters, chapter, section);
    move_cursor(&mut next, cursor);
    succeeded(&mut next);
    next
}

pub fn apply_introduction(course: &Course, chapter: usize, introduction: String) -> Course {
    let mut next = course.clone();
    if let Some(ch) = next.chapters.get_mut(chapter) {
        ch.introduction = introduction;
    }
    let cursor = advance(&next.chapters, chapter, INTRO_SENTINEL);
    move_cursor(&mut next, cursor);
    succeeded(&mut next);
    next
}

pub fn apply_finalization(course: &Course, quiz: Option<Quiz>, words_per_minute: usize) -> Course {
    let mut next = course.clone();
    next.quiz = quiz;
    next.estimated_time = estimated_time(next.word_count(), words_per_minute);
    let state = &mut next.generation;
    state.status = GenerationStatus::Complete;
    state.current_task = "Course complete".to_string();
    state.percent_complete = COMPLETE_PERCENT;
    succeeded(&mut next);
    next
}

/// Record a rejected response. Returns true when the retry budget is spent.
pub fn record_validation_failure(
    course: &Course,
    error: &str,
    max_retries: u32,
) -> (Course, bool) {
    let failures = course.generation.validation_failures + 1;
    if failures >= max_retries {
        let mut next = mark_failed(
            course,
            &format!("generated content rejected {} times: {}", failures, error),
        );
        next.generation.validation_failures = failures;
        return (next, true);
    }
    let mut next = course.clone();
    next.generation.validation_failures = failures;
    (next, false)
}

/// Terminal failure. Cursor and percentage stay where they were.
pub fn mark_failed(course: &Course, error: &str) -> Course {
    let mut next = course.clone();
    next.generation.status = GenerationStatus::Failed;
    next.generation.error = Some(error.to_string());
    next.generation.current_task = "Generation failed".to_string();
    next
}

/// `"45 minutes"`, `"1 hour"`, `"2 hours 10 minutes"`.
pub fn estimated_time(words: usize, words_per_minute: usize) -> String {
    let minutes = words.div_ceil(words_per_minute.max(1)).max(1);
    let (hours, rest) = (minutes / 60, minutes % 60);
    let plural = |n: usize, unit: &str| {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    };
    match (hours, rest) {
        (0, m) => plural(m, "minute"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "minute")),
    }
}
