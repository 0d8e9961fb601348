//! Manual post-generation edits. These bypass the state machine entirely.

use super::{Course, Quiz, SectionRef};
use serde::{Deserialize, Deserializer, Serialize};

/// A present key, `null` included, becomes `Some`; a missing key stays `None`
/// through `#[serde(default)]`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEdit {
    pub chapter: usize,
    pub section: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// `null` clears the image.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterEdit {
    pub chapter: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduction: Option<String>,
}

/// A patch over a finished course. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEdits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub cover_image: Option<Option<String>>,
    #[serde(default)]
    pub chapters: Vec<ChapterEdit>,
    #[serde(default)]
    pub sections: Vec<SectionEdit>,
    /// `null` removes the quiz.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub quiz: Option<Option<Quiz>>,
}

impl CourseEdits {
    pub fn is_empty(&self) -> bool {
        *self == CourseEdits::default()
    }

    /// Apply onto a copy of the course; the original is untouched on error.
    pub fn apply(&self, course: &Course) -> Result<Course, String> {
        let mut next = course.clone();

        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err("title must not be empty".to_string());
            }
            next.title = title.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(audience) = &self.target_audience {
            next.target_audience = audience.clone();
        }
        if let Some(difficulty) = &self.difficulty {
            next.difficulty = difficulty.clone();
        }
        if let Some(estimated_time) = &self.estimated_time {
            next.estimated_time = estimated_time.clone();
        }
        if let Some(cover) = &self.cover_image {
            next.cover_image = cover.clone();
        }

        for edit in &self.chapters {
            let chapter = next
                .chapters
                .get_mut(edit.chapter)
                .ok_or_else(|| format!("chapter {} does not exist", edit.chapter))?;
            if let Some(title) = &edit.title {
                if title.trim().is_empty() {
                    return Err(format!("chapter {} title must not be empty", edit.chapter));
                }
                chapter.title = title.clone();
            }
            if let Some(introduction) = &edit.introduction {
                chapter.introduction = introduction.clone();
            }
        }

        for edit in &self.sections {
            let id = SectionRef::new(edit.chapter, edit.section);
            let section = next
                .chapters
                .get_mut(edit.chapter)
                .and_then(|c| c.sections.get_mut(edit.section))
                .ok_or_else(|| format!("section {id} does not exist"))?;
            if let Some(title) = &edit.title {
                if title.trim().is_empty() {
                    return Err(format!("section {id} title must not be empty"));
                }
                section.title = title.clone();
            }
            if let Some(content) = &edit.content {
                if content.trim().is_empty() {
                    return Err(format!("section {id} content must not be empty"));
                }
                section.content = content.clone();
            }
            if let Some(image) = &edit.image {
                section.image = image.clone();
            }
        }

        if let Some(quiz) = &self.quiz {
            if let Some(quiz) = quiz {
                quiz.validate()?;
            }
            next.quiz = quiz.clone();
        }

        Ok(next)
    }
}
