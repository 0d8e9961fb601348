//! Render-time view of a course: Markdown page body with image references resolved.

use super::{Course, QuestionKind};

const INLINE_IMAGE_MARKER: &str = "](image:";

/// Turns a stored image reference into a fetchable URL.
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Option<String>;
}

/// Resolves filenames and `attachment:{id}` tokens against an uploads base URL.
/// Absolute URLs pass through unchanged.
#[derive(Debug, Clone)]
pub struct BaseUrlImageResolver {
    base_url: String,
}

impl BaseUrlImageResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ImageResolver for BaseUrlImageResolver {
    fn resolve(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Some(reference.to_string());
        }
        if let Some(id) = reference.strip_prefix("attachment:") {
            return Some(format!("{}/attachments/{}", self.base_url, id.trim()));
        }
        Some(format!(
            "{}/{}",
            self.base_url,
            reference.trim_start_matches('/')
        ))
    }
}

/// Rewrite `![alt](image:file)` references embedded in rich text.
/// Unresolvable references are left as written.
pub fn resolve_inline_images(text: &str, resolver: &dyn ImageResolver) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(INLINE_IMAGE_MARKER) {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);
        let after = &tail[INLINE_IMAGE_MARKER.len()..];
        match after.find(')') {
            Some(end) => {
                let reference = &after[..end];
                match resolver.resolve(reference) {
                    Some(url) => {
                        out.push_str("](");
                        out.push_str(&url);
                        out.push(')');
                    }
                    None => {
                        out.push_str(INLINE_IMAGE_MARKER);
                        out.push_str(reference);
                        out.push(')');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Full learner-facing page. Quiz answers are not included.
pub fn render_markdown(course: &Course, resolver: &dyn ImageResolver) -> String {
    let mut page = String::new();
    page.push_str(&format!("# {}\n\n", course.title));

    if let Some(url) = course.cover_image.as_deref().and_then(|c| resolver.resolve(c)) {
        page.push_str(&format!("![{}]({})\n\n", course.title, url));
    }
    if !course.description.is_empty() {
        page.push_str(&format!("{}\n\n", course.description));
    }

    let mut facts = Vec::new();
    if !course.target_audience.is_empty() {
        facts.push(format!("- **Audience:** {}", course.target_audience));
    }
    if !course.difficulty.is_empty() {
        facts.push(format!("- **Difficulty:** {}", course.difficulty));
    }
    if !course.estimated_time.is_empty() {
        facts.push(format!("- **Estimated time:** {}", course.estimated_time));
    }
    if !facts.is_empty() {
        page.push_str(&facts.join("\n"));
        page.push_str("\n\n");
    }

    if !course.learning_objectives.is_empty() {
        page.push_str("## What you will learn\n\n");
        for objective in &course.learning_objectives {
            page.push_str(&format!("- {}\n", objective));
        }
        page.push('\n');
    }

    for (ci, chapter) in course.chapters.iter().enumerate() {
        page.push_str(&format!("## Chapter {}: {}\n\n", ci + 1, chapter.title));
        if !chapter.introduction.is_empty() {
            page.push_str(&resolve_inline_images(&chapter.introduction, resolver));
            page.push_str("\n\n");
        }
        for (si, section) in chapter.sections.iter().enumerate() {
            page.push_str(&format!("### {}.{} {}\n\n", ci + 1, si + 1, section.title));
            if let Some(url) = section.image.as_deref().and_then(|i| resolver.resolve(i)) {
                page.push_str(&format!("![{}]({})\n\n", section.title, url));
            }
            page.push_str(&resolve_inline_images(&section.content, resolver));
            page.push_str("\n\n");
        }
    }

    if let Some(quiz) = &course.quiz {
        page.push_str("## Quiz\n\n");
        if !quiz.description.is_empty() {
            page.push_str(&format!("{}\n\n", quiz.description));
        }
        for (qi, question) in quiz.questions.iter().enumerate() {
            page.push_str(&format!("{}. {}\n", qi + 1, question.question));
            match &question.kind {
                QuestionKind::MultipleChoice { options, .. } => {
                    for option in options {
                        page.push_str(&format!("   - {}\n", option));
                    }
                }
                QuestionKind::TrueFalse { .. } => {
                    page.push_str("   - True\n   - False\n");
                }
                QuestionKind::ImageChoice { image_options, .. } => {
                    for image in image_options {
                        let url = resolver.resolve(image).unwrap_or_else(|| image.clone());
                        page.push_str(&format!("   - ![option]({})\n", url));
                    }
                }
            }
        }
        page.push('\n');
    }

    page.trim_end().to_string() + "\n"
}
