//! Response validation: turn raw model text into typed drafts, or a
//! `Validation` error naming what was wrong with it.

use crate::course::{Question, QuestionKind, Quiz};
use crate::error::ApiError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Analysis {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "targetAudience")]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default, alias = "estimatedTime")]
    pub estimated_time: Option<String>,
    #[serde(default, alias = "learningObjectives")]
    pub learning_objectives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineChapter {
    pub title: String,
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    pub chapters: Vec<OutlineChapter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDraft {
    pub content: String,
    pub introduction: Option<String>,
    pub image: Option<String>,
}

fn invalid(message: impl Into<String>) -> ApiError {
    ApiError::Validation(message.into())
}

/// Locate the JSON object in a reply that may be wrapped in prose or a code fence.
pub fn extract_json(raw: &str) -> Result<Value, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty response"));
    }
    let start = trimmed
        .find('{')
        .ok_or_else(|| invalid("response contains no JSON object"))?;
    let end = trimmed
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| invalid("response JSON object is not terminated"))?;
    serde_json::from_str(&trimmed[start..=end])
        .map_err(|e| invalid(format!("response is not valid JSON: {}", e)))
}

fn decode<T: for<'de> Deserialize<'de>>(raw: &str, what: &str) -> Result<T, ApiError> {
    let value = extract_json(raw)?;
    serde_json::from_value(value).map_err(|e| invalid(format!("malformed {}: {}", what, e)))
}

fn non_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn parse_analysis(raw: &str) -> Result<Analysis, ApiError> {
    let mut analysis: Analysis = decode(raw, "course analysis")?;
    if !non_empty(&analysis.title) {
        return Err(invalid("course analysis has no title"));
    }
    if !non_empty(&analysis.description) {
        return Err(invalid("course analysis has no description"));
    }
    analysis.title = analysis.title.trim().to_string();
    analysis.learning_objectives.retain(|o| non_empty(o));
    Ok(analysis)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSectionTitle {
    Plain(String),
    Titled { title: String },
}

#[derive(Deserialize)]
struct RawChapter {
    title: String,
    #[serde(default)]
    sections: Vec<RawSectionTitle>,
}

#[derive(Deserialize)]
struct RawOutline {
    chapters: Vec<RawChapter>,
}

/// Fewer chapters or sections than requested is rejected; extras are dropped.
pub fn parse_outline(
    raw: &str,
    chapter_count: usize,
    sections_per_chapter: usize,
) -> Result<Outline, ApiError> {
    let outline: RawOutline = decode(raw, "outline")?;
    if outline.chapters.len() < chapter_count {
        return Err(invalid(format!(
            "outline has {} chapters, expected {}",
            outline.chapters.len(),
            chapter_count
        )));
    }

    let mut chapters = Vec::with_capacity(chapter_count);
    for (ci, chapter) in outline.chapters.into_iter().take(chapter_count).enumerate() {
        if !non_empty(&chapter.title) {
            return Err(invalid(format!("outline chapter {} has no title", ci + 1)));
        }
        if chapter.sections.len() < sections_per_chapter {
            return Err(invalid(format!(
                "outline chapter {} has {} sections, expected {}",
                ci + 1,
                chapter.sections.len(),
                sections_per_chapter
            )));
        }
        let mut sections = Vec::with_capacity(sections_per_chapter);
        for (si, section) in chapter.sections.into_iter().take(sections_per_chapter).enumerate() {
            let title = match section {
                RawSectionTitle::Plain(title) | RawSectionTitle::Titled { title } => title,
            };
            if !non_empty(&title) {
                return Err(invalid(format!(
                    "outline chapter {} section {} has no title",
                    ci + 1,
                    si + 1
                )));
            }
            sections.push(title.trim().to_string());
        }
        chapters.push(OutlineChapter {
            title: chapter.title.trim().to_string(),
            sections,
        });
    }
    Ok(Outline { chapters })
}

#[derive(Deserialize)]
struct RawSection {
    #[serde(default)]
    content: String,
    #[serde(default)]
    introduction: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

/// Section body of at least `min_chars` characters; `with_introduction` also
/// requires the chapter introduction.
pub fn parse_section(
    raw: &str,
    min_chars: usize,
    with_introduction: bool,
) -> Result<SectionDraft, ApiError> {
    let section: RawSection = decode(raw, "section")?;
    let content = section.content.trim().to_string();
    let length = content.chars().count();
    if length < min_chars {
        return Err(invalid(format!(
            "section content is {} characters, minimum is {}",
            length, min_chars
        )));
    }
    let introduction = section
        .introduction
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty());
    if with_introduction && introduction.is_none() {
        return Err(invalid("chapter introduction is missing"));
    }
    Ok(SectionDraft {
        content,
        introduction,
        image: section.image.filter(|i| non_empty(i)),
    })
}

pub fn parse_introduction(raw: &str) -> Result<String, ApiError> {
    #[derive(Deserialize)]
    struct RawIntroduction {
        #[serde(default)]
        introduction: String,
    }
    let intro: RawIntroduction = decode(raw, "chapter introduction")?;
    let text = intro.introduction.trim().to_string();
    if text.is_empty() {
        return Err(invalid("chapter introduction is empty"));
    }
    Ok(text)
}

#[derive(Deserialize)]
struct RawQuestion {
    #[serde(default)]
    question: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default, alias = "imageOptions")]
    image_options: Vec<String>,
    #[serde(alias = "correctAnswer", alias = "correct_answer")]
    answer: Value,
}

#[derive(Deserialize)]
struct RawQuiz {
    #[serde(default)]
    description: String,
    questions: Vec<RawQuestion>,
}

/// True/false answers may come as an index, a boolean or a word; index 0 is "True".
fn answer_index(value: &Value, true_false: bool) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::Bool(b) if true_false => Some(if *b { 0 } else { 1 }),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" if true_false => Some(0),
            "false" if true_false => Some(1),
            other => other.parse().ok(),
        },
        _ => None,
    }
}

/// Questions get ids `q1..qN` in order; extras beyond `max_questions` are dropped.
pub fn parse_quiz(raw: &str, max_questions: usize) -> Result<Quiz, ApiError> {
    let quiz: RawQuiz = decode(raw, "quiz")?;
    if quiz.questions.is_empty() {
        return Err(invalid("quiz has no questions"));
    }

    let mut questions = Vec::new();
    for (index, raw_question) in quiz.questions.into_iter().take(max_questions).enumerate() {
        let id = format!("q{}", index + 1);
        let true_false = raw_question.kind == "true-false";
        let correct_answer = answer_index(&raw_question.answer, true_false)
            .ok_or_else(|| invalid(format!("question {} has an unreadable answer", id)))?;
        let kind = match raw_question.kind.as_str() {
            "multiple-choice" => QuestionKind::MultipleChoice {
                options: raw_question.options,
                correct_answer,
            },
            "true-false" => QuestionKind::TrueFalse { correct_answer },
            "image-choice" => QuestionKind::ImageChoice {
                image_options: raw_question.image_options,
                correct_answer,
            },
            other => {
                return Err(invalid(format!(
                    "question {} has unknown type {}",
                    id, other
                )))
            }
        };
        let question = Question {
            id,
            question: raw_question.question.trim().to_string(),
            kind,
        };
        question.validate().map_err(invalid)?;
        questions.push(question);
    }

    Ok(Quiz {
        description: quiz.description.trim().to_string(),
        questions,
    })
}
