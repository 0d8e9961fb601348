//! Course Document
//!
//! The canonical, persisted record for one course: descriptive fields, the ordered
//! chapter/section content, the optional quiz, the generation checkpoint and the
//! publication back-reference. One document per [`CourseId`].

pub mod edit;
pub mod id;
pub mod render;

pub use edit::{CourseEdits, SectionEdit};
pub use id::CourseId;
pub use render::{render_markdown, BaseUrlImageResolver, ImageResolver};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cursor section index meaning "expand this chapter's introduction".
///
/// Only used for chapters whose skeleton declared no sections; for every other
/// chapter the introduction is written together with its first section.
pub const INTRO_SENTINEL: usize = usize::MAX;

/// Generation lifecycle. Ordering follows the forward direction of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Analyzing,
    GeneratingOutline,
    ExpandingContent,
    Finalizing,
    Complete,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Analyzing => "analyzing",
            GenerationStatus::GeneratingOutline => "generating_outline",
            GenerationStatus::ExpandingContent => "expanding_content",
            GenerationStatus::Finalizing => "finalizing",
            GenerationStatus::Complete => "complete",
            GenerationStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationStatus::Complete | GenerationStatus::Failed)
    }

    /// Forward-only transitions, plus `failed` from any non-terminal state.
    pub fn can_transition_to(self, next: GenerationStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == GenerationStatus::Failed {
            return true;
        }
        next >= self
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The generation checkpoint, co-written with the rest of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationState {
    pub status: GenerationStatus,
    pub current_chapter_index: usize,
    pub current_section_index: usize,
    pub total_chapters: usize,
    pub total_sections_in_current_chapter: usize,
    pub percent_complete: u8,
    pub current_task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Rejected AI responses for the unit under the cursor.
    #[serde(default)]
    pub validation_failures: u32,
}

impl GenerationState {
    pub fn new() -> Self {
        Self {
            status: GenerationStatus::Analyzing,
            current_chapter_index: 0,
            current_section_index: 0,
            total_chapters: 0,
            total_sections_in_current_chapter: 0,
            percent_complete: 0,
            current_task: "Analyzing course brief".to_string(),
            error: None,
            validation_failures: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_complete(&self) -> bool {
        self.status == GenerationStatus::Complete
    }
}

impl Default for GenerationState {
    fn default() -> Self {
        Self::new()
    }
}

/// What the learner asked for. Stored on the document so every chunk can rebuild prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseBrief {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub chapter_count: usize,
    pub sections_per_chapter: usize,
    #[serde(default = "default_true")]
    pub include_quiz: bool,
    #[serde(default = "default_quiz_questions")]
    pub quiz_questions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_quiz_questions() -> usize {
    5
}

/// Bounds a brief has to respect, taken from the generation config.
#[derive(Debug, Clone, Copy)]
pub struct BriefLimits {
    pub max_chapters: usize,
    pub max_sections_per_chapter: usize,
    pub max_quiz_questions: usize,
}

impl CourseBrief {
    pub fn new(topic: impl Into<String>, chapter_count: usize, sections_per_chapter: usize) -> Self {
        Self {
            topic: topic.into(),
            audience: None,
            difficulty: None,
            chapter_count,
            sections_per_chapter,
            include_quiz: true,
            quiz_questions: default_quiz_questions(),
            language: None,
            notes: None,
        }
    }

    pub fn validate(&self, limits: &BriefLimits) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("topic must not be empty".to_string());
        }
        if self.chapter_count == 0 || self.chapter_count > limits.max_chapters {
            return Err(format!(
                "chapter_count must be between 1 and {} (got {})",
                limits.max_chapters, self.chapter_count
            ));
        }
        if self.sections_per_chapter == 0
            || self.sections_per_chapter > limits.max_sections_per_chapter
        {
            return Err(format!(
                "sections_per_chapter must be between 1 and {} (got {})",
                limits.max_sections_per_chapter, self.sections_per_chapter
            ));
        }
        if self.include_quiz
            && (self.quiz_questions == 0 || self.quiz_questions > limits.max_quiz_questions)
        {
            return Err(format!(
                "quiz_questions must be between 1 and {} (got {})",
                limits.max_quiz_questions, self.quiz_questions
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Section {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
            image: None,
        }
    }

    pub fn is_expanded(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: String,
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// Answer encoding per question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        #[serde(rename = "correctAnswer")]
        correct_answer: usize,
    },
    TrueFalse {
        #[serde(rename = "correctAnswer")]
        correct_answer: usize,
    },
    ImageChoice {
        image_options: Vec<String>,
        #[serde(rename = "correctAnswer")]
        correct_answer: usize,
    },
}

impl QuestionKind {
    pub fn correct_answer(&self) -> usize {
        match self {
            QuestionKind::MultipleChoice { correct_answer, .. }
            | QuestionKind::TrueFalse { correct_answer }
            | QuestionKind::ImageChoice { correct_answer, .. } => *correct_answer,
        }
    }

    /// Number of selectable answers; true/false is always binary.
    pub fn option_count(&self) -> usize {
        match self {
            QuestionKind::MultipleChoice { options, .. } => options.len(),
            QuestionKind::TrueFalse { .. } => 2,
            QuestionKind::ImageChoice { image_options, .. } => image_options.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub question: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    pub fn is_correct(&self, selected: usize) -> bool {
        self.kind.correct_answer() == selected
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err(format!("question {} has no text", self.id));
        }
        let count = self.kind.option_count();
        match &self.kind {
            QuestionKind::MultipleChoice { options, .. } => {
                if options.len() < 2 {
                    return Err(format!("question {} needs at least two options", self.id));
                }
                if options.iter().any(|o| o.trim().is_empty()) {
                    return Err(format!("question {} has an empty option", self.id));
                }
            }
            QuestionKind::ImageChoice { image_options, .. } => {
                if image_options.len() < 2 {
                    return Err(format!(
                        "question {} needs at least two image options",
                        self.id
                    ));
                }
            }
            QuestionKind::TrueFalse { .. } => {}
        }
        if self.kind.correct_answer() >= count {
            return Err(format!(
                "question {} answer index {} is out of range (options: {})",
                self.id,
                self.kind.correct_answer(),
                count
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn validate(&self) -> Result<(), String> {
        if self.questions.is_empty() {
            return Err("quiz has no questions".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(format!("duplicate question id {}", question.id));
            }
            question.validate()?;
        }
        Ok(())
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// Back-reference to the public content entity, independent of generation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub permalink: String,
    pub published: bool,
    pub content_id: String,
    pub published_at: DateTime<Utc>,
}

/// Stable identifier of one section inside a course (`chapter-{c}-section-{s}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionRef {
    pub chapter: usize,
    pub section: usize,
}

impl SectionRef {
    pub fn new(chapter: usize, section: usize) -> Self {
        Self { chapter, section }
    }
}

impl fmt::Display for SectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chapter-{}-section-{}", self.chapter, self.section)
    }
}

impl FromStr for SectionRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("chapter-")
            .ok_or_else(|| format!("invalid section id: {s}"))?;
        let (chapter, section) = rest
            .split_once("-section-")
            .ok_or_else(|| format!("invalid section id: {s}"))?;
        let chapter = chapter
            .parse()
            .map_err(|_| format!("invalid chapter index in section id: {s}"))?;
        let section = section
            .parse()
            .map_err(|_| format!("invalid section index in section id: {s}"))?;
        Ok(SectionRef { chapter, section })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub brief: CourseBrief,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Quiz>,
    pub generation: GenerationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<Publication>,
}

impl Course {
    /// Seed a new document in `analyzing`.
    pub fn seed(id: CourseId, brief: CourseBrief, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: brief.topic.clone(),
            description: String::new(),
            target_audience: brief.audience.clone().unwrap_or_default(),
            difficulty: brief.difficulty.clone().unwrap_or_default(),
            estimated_time: String::new(),
            cover_image: None,
            created_at: now,
            updated_at: now,
            brief,
            learning_objectives: Vec::new(),
            chapters: Vec::new(),
            quiz: None,
            generation: GenerationState::new(),
            publication: None,
        }
    }

    pub fn total_sections(&self) -> usize {
        self.chapters.iter().map(|c| c.sections.len()).sum()
    }

    /// All section ids in course order.
    pub fn section_refs(&self) -> Vec<SectionRef> {
        self.chapters
            .iter()
            .enumerate()
            .flat_map(|(ci, chapter)| {
                (0..chapter.sections.len()).map(move |si| SectionRef::new(ci, si))
            })
            .collect()
    }

    pub fn section(&self, section: SectionRef) -> Option<&Section> {
        self.chapters
            .get(section.chapter)
            .and_then(|c| c.sections.get(section.section))
    }

    pub fn is_published(&self) -> bool {
        self.publication.as_ref().map(|p| p.published).unwrap_or(false)
    }

    pub fn word_count(&self) -> usize {
        self.chapters
            .iter()
            .map(|chapter| {
                chapter.introduction.split_whitespace().count()
                    + chapter
                        .sections
                        .iter()
                        .map(|s| s.content.split_whitespace().count())
                        .sum::<usize>()
            })
            .sum()
    }

    pub fn summary(&self) -> CourseSummary {
        CourseSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.generation.status,
            percent_complete: self.generation.percent_complete,
            chapters: self.chapters.len(),
            sections: self.total_sections(),
            has_quiz: self.quiz.is_some(),
            published: self.is_published(),
            updated_at: self.updated_at,
        }
    }
}

/// Listing row for a stored course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: CourseId,
    pub title: String,
    pub status: GenerationStatus,
    pub percent_complete: u8,
    pub chapters: usize,
    pub sections: usize,
    pub has_quiz: bool,
    pub published: bool,
    pub updated_at: DateTime<Utc>,
}
