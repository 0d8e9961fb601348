//! Publication
//!
//! Materializes a finished course as a publicly addressable page and removes it
//! again. Publication state lives in the document's `publication` field only;
//! generation state and learner progress are never touched here.

use crate::config::{ImageSettings, PublicationSettings};
use crate::course::{render_markdown, BaseUrlImageResolver, Course, CourseId, ImageResolver};
use crate::error::ApiError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Somewhere a rendered course can be made public.
pub trait PublicationTarget: Send + Sync {
    /// Create or replace the page for `content_id`. Returns the permalink.
    fn upsert(&self, course: &Course, content_id: &str) -> Result<String, ApiError>;

    /// Remove the page. Removing a page that does not exist is not an error.
    fn remove(&self, content_id: &str) -> Result<(), ApiError>;
}

/// Writes `{output_dir}/{content_id}.md`, served at `{base_url}/{content_id}/`.
pub struct DirectoryTarget {
    output_dir: PathBuf,
    base_url: String,
    resolver: Box<dyn ImageResolver>,
}

impl DirectoryTarget {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        base_url: impl Into<String>,
        resolver: Box<dyn ImageResolver>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            resolver,
        }
    }

    /// Both `output_dir` and `base_url` must be configured.
    pub fn from_settings(
        publication: &PublicationSettings,
        images: &ImageSettings,
    ) -> Result<Self, ApiError> {
        let output_dir = publication.output_dir.clone().ok_or_else(|| {
            ApiError::PublicationNotConfigured("publication.output_dir is not set".to_string())
        })?;
        let base_url = publication.base_url.clone().ok_or_else(|| {
            ApiError::PublicationNotConfigured("publication.base_url is not set".to_string())
        })?;
        Ok(Self::new(
            output_dir,
            base_url,
            Box::new(BaseUrlImageResolver::new(images.base_url.clone())),
        ))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn page_path(&self, content_id: &str) -> PathBuf {
        self.output_dir.join(format!("{content_id}.md"))
    }

    pub fn permalink(&self, content_id: &str) -> String {
        format!("{}/{}/", self.base_url, content_id)
    }
}

impl PublicationTarget for DirectoryTarget {
    fn upsert(&self, course: &Course, content_id: &str) -> Result<String, ApiError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            ApiError::PublicationFailed(format!(
                "Failed to create output directory {:?}: {}",
                self.output_dir, e
            ))
        })?;

        let permalink = self.permalink(content_id);
        let title = serde_json::to_string(&course.title)
            .map_err(|e| ApiError::PublicationFailed(e.to_string()))?;
        let page = format!(
            "---\ntitle: {}\npermalink: {}\ncourse_id: {}\n---\n\n{}",
            title,
            permalink,
            course.id,
            render_markdown(course, self.resolver.as_ref())
        );

        let path = self.page_path(content_id);
        let temp_path = path.with_extension("md.tmp");
        fs::write(&temp_path, page).map_err(|e| {
            ApiError::PublicationFailed(format!("Failed to write {:?}: {}", temp_path, e))
        })?;
        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            ApiError::PublicationFailed(format!("Failed to move page into {:?}: {}", path, e))
        })?;
        debug!(course_id = %course.id, page = ?path, "Page written");
        Ok(permalink)
    }

    fn remove(&self, content_id: &str) -> Result<(), ApiError> {
        let path = self.page_path(content_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::PublicationFailed(format!(
                "Failed to remove {:?}: {}",
                path, e
            ))),
        }
    }
}

/// URL-safe slug from a title, suffixed with the tail of the course id so two
/// courses with the same title never share a page.
pub fn slugify(title: &str, id: &CourseId) -> String {
    let mut slug = String::new();
    for word in title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.push_str(&word.to_ascii_lowercase());
    }
    if slug.is_empty() {
        slug.push_str("course");
    }
    format!("{}-{}", slug, id.short())
}

/// A course keeps its first content id, so renaming it republishes in place.
pub fn content_id_for(course: &Course) -> String {
    course
        .publication
        .as_ref()
        .map(|p| p.content_id.clone())
        .unwrap_or_else(|| slugify(&course.title, &course.id))
}
