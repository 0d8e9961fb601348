//! Publishing to a directory target, republish on edit, unpublish and delete

use crate::integration::test_utils::{
    course_provider, directory_target, generate_course, publishing_api, temporary_store,
    test_settings,
};
use std::sync::Arc;
use syllabus::api::CourseApi;
use syllabus::config::QuizSettings;
use syllabus::course::{Course, CourseBrief, CourseEdits, SectionEdit};
use syllabus::error::ApiError;
use syllabus::provider::{CompletionOptions, ModelProviderClient};
use syllabus::publish::PublicationTarget;
use syllabus::store::{CourseStore, SledCourseStore};
use tempfile::TempDir;

/// Writes pages normally, but touches the stored course first, as another
/// writer would between publish's read and its commit.
struct RacingTarget {
    inner: Arc<dyn PublicationTarget>,
    courses: Arc<SledCourseStore>,
}

impl PublicationTarget for RacingTarget {
    fn upsert(&self, course: &Course, content_id: &str) -> Result<String, ApiError> {
        let current = self.courses.load(&course.id).unwrap().unwrap();
        let mut next = current.course.clone();
        next.description = "Edited elsewhere".to_string();
        self.courses.commit(&current, &next).unwrap();
        self.inner.upsert(course, content_id)
    }

    fn remove(&self, content_id: &str) -> Result<(), ApiError> {
        self.inner.remove(content_id)
    }
}

#[tokio::test]
async fn publish_writes_one_page_and_is_idempotent() {
    let out = TempDir::new().unwrap();
    let api = publishing_api(Arc::new(course_provider()), out.path());
    let id = generate_course(&api, CourseBrief::new("Knots", 2, 1)).await;

    let first = api.publish(&id).unwrap();
    assert!(first.content_id.starts_with("knots-for-sailors-"));
    assert_eq!(
        first.permalink,
        format!("https://learn.example.com/courses/{}/", first.content_id)
    );

    let page_path = out.path().join(format!("{}.md", first.content_id));
    let page = std::fs::read_to_string(&page_path).unwrap();
    assert!(page.starts_with("---\ntitle: \"Knots for Sailors\"\n"));
    assert!(page.contains(&format!("course_id: {}", id)));
    assert!(page.contains("## Chapter 1: Chapter topic 1"));
    assert!(page.contains("## Quiz"));
    assert!(page.contains("https://cdn.example.com/uploads/figure-eight.png"));

    let second = api.publish(&id).unwrap();
    assert_eq!(second.content_id, first.content_id);
    let pages = std::fs::read_dir(out.path()).unwrap().count();
    assert_eq!(pages, 1);

    let course = api.get_course(&id).unwrap();
    let publication = course.publication.unwrap();
    assert!(publication.published);
    assert_eq!(publication.permalink, first.permalink);
}

#[tokio::test]
async fn publish_requires_a_complete_course() {
    let out = TempDir::new().unwrap();
    let api = publishing_api(Arc::new(course_provider()), out.path());
    let id = api.create_course(CourseBrief::new("Knots", 1, 1)).unwrap().course_id;

    assert!(matches!(api.publish(&id), Err(ApiError::InvalidState(_))));
    assert_eq!(std::fs::read_dir(out.path()).map(|d| d.count()).unwrap_or(0), 0);
}

#[tokio::test]
async fn unpublish_keeps_content_and_learners() {
    let out = TempDir::new().unwrap();
    let api = publishing_api(Arc::new(course_provider()), out.path());
    let id = generate_course(&api, CourseBrief::new("Knots", 1, 2)).await;
    api.mark_section_complete(&id, "ada", "chapter-0-section-0").unwrap();
    let published = api.publish(&id).unwrap();
    let before = api.get_course(&id).unwrap();

    api.unpublish(&id).unwrap();
    assert!(!out.path().join(format!("{}.md", published.content_id)).exists());

    let after = api.get_course(&id).unwrap();
    assert!(after.publication.is_none());
    assert_eq!(after.chapters, before.chapters);
    assert_eq!(after.quiz, before.quiz);
    assert_eq!(api.learner_progress(&id, "ada").unwrap().completed, 1);

    // Nothing left to remove.
    api.unpublish(&id).unwrap();
}

#[tokio::test]
async fn edits_republish_under_the_same_content_id() {
    let out = TempDir::new().unwrap();
    let api = publishing_api(Arc::new(course_provider()), out.path());
    let id = generate_course(&api, CourseBrief::new("Knots", 1, 1)).await;
    let published = api.publish(&id).unwrap();

    let edits = CourseEdits {
        title: Some("Knots at Sea".to_string()),
        sections: vec![SectionEdit {
            chapter: 0,
            section: 0,
            content: Some("Rewritten lesson body about the bowline.".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let course = api.update_course(&id, &edits).unwrap();
    assert_eq!(course.title, "Knots at Sea");
    assert_eq!(
        course.publication.as_ref().unwrap().content_id,
        published.content_id
    );

    let page =
        std::fs::read_to_string(out.path().join(format!("{}.md", published.content_id))).unwrap();
    assert!(page.contains("title: \"Knots at Sea\""));
    assert!(page.contains("Rewritten lesson body about the bowline."));

    let bad = CourseEdits {
        title: Some("   ".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        api.update_course(&id, &bad),
        Err(ApiError::InvalidInput(_))
    ));
    assert_eq!(api.get_course(&id).unwrap().title, "Knots at Sea");
}

#[tokio::test]
async fn delete_removes_the_public_page() {
    let out = TempDir::new().unwrap();
    let api = publishing_api(Arc::new(course_provider()), out.path());
    let id = generate_course(&api, CourseBrief::new("Knots", 1, 1)).await;
    let published = api.publish(&id).unwrap();
    api.mark_section_complete(&id, "ada", "chapter-0-section-0").unwrap();

    api.delete_course(&id).unwrap();
    assert!(!out.path().join(format!("{}.md", published.content_id)).exists());
    assert!(matches!(api.get_course(&id), Err(ApiError::CourseNotFound(_))));
    assert!(api.store().learners.get(&id, "ada").unwrap().is_none());
    assert!(api.store().journal.read(&id).unwrap().is_empty());
    assert!(api.list_courses().unwrap().is_empty());
}

#[tokio::test]
async fn refused_publish_leaves_no_page_behind() {
    let out = TempDir::new().unwrap();
    let store = temporary_store();
    let target = RacingTarget {
        inner: directory_target(out.path()),
        courses: store.courses.clone(),
    };
    let api = CourseApi::with_parts(
        store,
        Some(Arc::new(course_provider()) as Arc<dyn ModelProviderClient>),
        Some(Arc::new(target) as Arc<dyn PublicationTarget>),
        test_settings(),
        QuizSettings::default(),
        CompletionOptions::default(),
    );
    let id = generate_course(&api, CourseBrief::new("Knots", 1, 1)).await;

    let err = api.publish(&id).unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);

    let course = api.get_course(&id).unwrap();
    assert!(course.publication.is_none());
    assert_eq!(course.description, "Edited elsewhere");
}
