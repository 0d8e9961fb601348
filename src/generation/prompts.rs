//! Prompt construction, one builder per chunk kind.
//!
//! Every user prompt starts with a `TASK:` line naming the chunk kind, followed by
//! the brief and the JSON shape the reply must have.

use super::state::ChunkAction;
use crate::course::{Course, CourseBrief};
use crate::provider::ChatMessage;

pub const TASK_ANALYZE: &str = "TASK: analyze course brief";
pub const TASK_OUTLINE: &str = "TASK: course outline";
pub const TASK_SECTION: &str = "TASK: write section";
pub const TASK_INTRODUCTION: &str = "TASK: write chapter introduction";
pub const TASK_QUIZ: &str = "TASK: write quiz";

const SYSTEM_PROMPT: &str = "You are an experienced instructional designer writing self-paced \
online courses. Answer with a single JSON object and nothing else.";

fn brief_block(brief: &CourseBrief) -> String {
    let mut lines = vec![format!("Topic: {}", brief.topic)];
    if let Some(audience) = &brief.audience {
        lines.push(format!("Audience: {}", audience));
    }
    if let Some(difficulty) = &brief.difficulty {
        lines.push(format!("Difficulty: {}", difficulty));
    }
    if let Some(language) = &brief.language {
        lines.push(format!("Write in: {}", language));
    }
    if let Some(notes) = &brief.notes {
        lines.push(format!("Author notes: {}", notes));
    }
    lines.join("\n")
}

fn course_context(course: &Course) -> String {
    let mut out = format!("Course: {}\n{}", course.title, course.description);
    for (ci, chapter) in course.chapters.iter().enumerate() {
        out.push_str(&format!("\nChapter {}: {}", ci + 1, chapter.title));
        for (si, section) in chapter.sections.iter().enumerate() {
            out.push_str(&format!("\n  {}.{} {}", ci + 1, si + 1, section.title));
        }
    }
    out
}

pub fn analyze(course: &Course) -> String {
    format!(
        "{TASK_ANALYZE}\n\n{}\n\nDescribe the course this brief asks for. Reply as:\n\
{{\"title\": string, \"description\": string, \"targetAudience\": string, \
\"difficulty\": string, \"estimatedTime\": string, \"learningObjectives\": [string]}}",
        brief_block(&course.brief)
    )
}

pub fn outline(course: &Course) -> String {
    format!(
        "{TASK_OUTLINE}\n\n{}\n\nCourse title: {}\n{}\n\nPlan exactly {} chapters with exactly {} \
sections each. Titles only. Reply as:\n\
{{\"chapters\": [{{\"title\": string, \"sections\": [string]}}]}}",
        brief_block(&course.brief),
        course.title,
        course.description,
        course.brief.chapter_count,
        course.brief.sections_per_chapter
    )
}

pub fn section(course: &Course, chapter: usize, section: usize, min_chars: usize) -> String {
    let chapter_title = course
        .chapters
        .get(chapter)
        .map(|c| c.title.as_str())
        .unwrap_or_default();
    let section_title = course
        .chapters
        .get(chapter)
        .and_then(|c| c.sections.get(section))
        .map(|s| s.title.as_str())
        .unwrap_or_default();
    let shape = if section == 0 {
        "{\"introduction\": string, \"content\": string}\n\
The introduction opens the chapter; the content is the section body."
    } else {
        "{\"content\": string}"
    };
    format!(
        "{TASK_SECTION}\n\n{}\n\n{}\n\nWrite chapter {} \"{}\", section {} \"{}\". \
Use Markdown, at least {} characters. Reply as:\n{}",
        brief_block(&course.brief),
        course_context(course),
        chapter + 1,
        chapter_title,
        section + 1,
        section_title,
        min_chars,
        shape
    )
}

pub fn introduction(course: &Course, chapter: usize) -> String {
    let chapter_title = course
        .chapters
        .get(chapter)
        .map(|c| c.title.as_str())
        .unwrap_or_default();
    format!(
        "{TASK_INTRODUCTION}\n\n{}\n\n{}\n\nWrite the introduction of chapter {} \"{}\". Reply as:\n\
{{\"introduction\": string}}",
        brief_block(&course.brief),
        course_context(course),
        chapter + 1,
        chapter_title
    )
}

pub fn quiz(course: &Course) -> String {
    let mut content = course_context(course);
    for chapter in &course.chapters {
        for section in &chapter.sections {
            content.push_str(&format!("\n\n## {}\n{}", section.title, section.content));
        }
    }
    format!(
        "{TASK_QUIZ}\n\n{}\n\nWrite {} quiz questions covering the course below. Types: \
\"multiple-choice\" (options), \"true-false\" (index 0 = true, 1 = false), \"image-choice\" \
(image_options). correctAnswer is a zero-based index. Reply as:\n\
{{\"description\": string, \"questions\": [{{\"question\": string, \"type\": string, \
\"options\": [string], \"correctAnswer\": number}}]}}\n\n{}",
        brief_block(&course.brief),
        course.brief.quiz_questions,
        content
    )
}

/// Messages for one chunk.
pub fn messages_for(action: ChunkAction, course: &Course, min_chars: usize) -> Vec<ChatMessage> {
    let user = match action {
        ChunkAction::Analyze => analyze(course),
        ChunkAction::Outline => outline(course),
        ChunkAction::ExpandSection { chapter, section: s } => section(course, chapter, s, min_chars),
        ChunkAction::ExpandIntroduction { chapter } => introduction(course, chapter),
        ChunkAction::Finalize => quiz(course),
    };
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}
