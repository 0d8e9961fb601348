//! Course API
//!
//! The single facade over the engine: course lifecycle, chunked generation,
//! progress reads, manual edits, publication and the learner surfaces. Every
//! mutation of a stored course goes through a compare-and-swap commit.

use crate::config::{GenerationSettings, QuizSettings, SyllabusConfig};
use crate::course::{
    Course, CourseBrief, CourseEdits, CourseId, CourseSummary, GenerationState, GenerationStatus,
    Publication, SectionRef,
};
use crate::error::{ApiError, StorageError};
use crate::generation::executor::next_holder_id;
use crate::generation::{ChunkExecutor, ChunkResult, ChunkStepper};
use crate::learning::{
    certificate_eligible, grade_quiz, summarize_progress, Certificate, ProgressSummary,
    QuizResult,
};
use crate::provider::{CompletionOptions, ModelProviderClient};
use crate::publish::{content_id_for, DirectoryTarget, PublicationTarget};
use crate::store::{CourseStore, JournalEvent, QuizAttempt, Store, VersionedCourse};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Returned by [`CourseApi::create_course`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCreated {
    pub course_id: CourseId,
    pub percent: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub course_id: CourseId,
    pub permalink: String,
    pub content_id: String,
}

pub struct CourseApi {
    store: Store,
    executor: Option<ChunkExecutor>,
    publisher: Option<Arc<dyn PublicationTarget>>,
    settings: GenerationSettings,
    quiz: QuizSettings,
}

impl CourseApi {
    /// Build the facade from loaded configuration. Without a provider, generation
    /// calls fail with a configuration error; everything else works.
    pub fn new(
        store: Store,
        provider: Option<Arc<dyn ModelProviderClient>>,
        config: &SyllabusConfig,
    ) -> Self {
        let options = config
            .provider
            .as_ref()
            .map(|p| p.default_options.clone())
            .unwrap_or_default();
        let publisher = DirectoryTarget::from_settings(&config.publication, &config.images)
            .ok()
            .map(|target| Arc::new(target) as Arc<dyn PublicationTarget>);
        Self::with_parts(
            store,
            provider,
            publisher,
            config.generation.clone(),
            config.quiz.clone(),
            options,
        )
    }

    pub fn with_parts(
        store: Store,
        provider: Option<Arc<dyn ModelProviderClient>>,
        publisher: Option<Arc<dyn PublicationTarget>>,
        settings: GenerationSettings,
        quiz: QuizSettings,
        options: CompletionOptions,
    ) -> Self {
        let executor = provider
            .map(|provider| ChunkExecutor::new(&store, provider, settings.clone(), options));
        Self {
            store,
            executor,
            publisher,
            settings,
            quiz,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Validate the brief and seed a course in `analyzing`. Nothing is stored
    /// when the brief is rejected.
    pub fn create_course(&self, brief: CourseBrief) -> Result<CourseCreated, ApiError> {
        brief
            .validate(&self.settings.brief_limits())
            .map_err(ApiError::InvalidBrief)?;

        let course = Course::seed(CourseId::mint(&brief.topic), brief, Utc::now());
        self.store.courses.insert(&course)?;
        self.emit_event_best_effort(
            &course.id,
            "course_created",
            json!({
                "topic": course.brief.topic,
                "chapters": course.brief.chapter_count,
                "sections_per_chapter": course.brief.sections_per_chapter,
                "include_quiz": course.brief.include_quiz,
            }),
        );
        info!(course_id = %course.id, topic = %course.brief.topic, "Course created");

        Ok(CourseCreated {
            course_id: course.id.clone(),
            percent: course.generation.percent_complete,
            message: course.generation.current_task.clone(),
        })
    }

    pub async fn execute_next_chunk(&self, course_id: &CourseId) -> Result<ChunkResult, ApiError> {
        let executor = self.executor.as_ref().ok_or_else(|| {
            ApiError::ConfigError("no text-generation provider is configured".to_string())
        })?;
        executor.execute_next_chunk(course_id).await
    }

    /// Checkpoint snapshot; never triggers work.
    pub fn get_progress(&self, course_id: &CourseId) -> Result<GenerationState, ApiError> {
        Ok(self.get_course(course_id)?.generation)
    }

    pub fn get_course(&self, course_id: &CourseId) -> Result<Course, ApiError> {
        Ok(self.load(course_id)?.course)
    }

    pub fn list_courses(&self) -> Result<Vec<CourseSummary>, ApiError> {
        Ok(self
            .store
            .courses
            .list()?
            .iter()
            .map(Course::summary)
            .collect())
    }

    /// Manual edits to a finished course. A published course is republished.
    pub fn update_course(
        &self,
        course_id: &CourseId,
        edits: &CourseEdits,
    ) -> Result<Course, ApiError> {
        let versioned = self.load(course_id)?;
        if !versioned.course.generation.is_terminal() {
            return Err(ApiError::InvalidState(format!(
                "course {} is still generating ({})",
                course_id, versioned.course.generation.status
            )));
        }
        if edits.is_empty() {
            return Ok(versioned.course);
        }

        let mut next = edits.apply(&versioned.course).map_err(ApiError::InvalidInput)?;
        next.updated_at = Utc::now();
        let mut course = self.commit(&versioned, &next)?.course;
        self.emit_event_best_effort(course_id, "course_updated", Value::Null);

        if course.is_published() {
            let result = self.publish(course_id)?;
            info!(course_id = %course_id, permalink = %result.permalink, "Republished after edit");
            course = self.get_course(course_id)?;
        }
        Ok(course)
    }

    /// Unpublish, then remove the document, its learner records, lease and journal.
    /// A chunk in flight makes this a conflict.
    pub fn delete_course(&self, course_id: &CourseId) -> Result<(), ApiError> {
        let lease = self
            .store
            .leases
            .acquire(course_id, &next_holder_id("delete"))?;
        let course = self.get_course(course_id)?;

        if let Some(publication) = &course.publication {
            self.publisher()?.remove(&publication.content_id)?;
        }
        self.store.courses.remove(course_id)?;
        let learners = self.store.learners.remove_course(course_id)?;
        self.store.journal.remove_course(course_id)?;
        drop(lease);
        self.store.leases.clear(course_id)?;

        info!(course_id = %course_id, learners, "Course deleted");
        Ok(())
    }

    /// Create or refresh the public page of a complete course.
    pub fn publish(&self, course_id: &CourseId) -> Result<PublishResult, ApiError> {
        let publisher = self.publisher()?;
        let versioned = self.load(course_id)?;
        self.require_complete(&versioned.course)?;

        let content_id = content_id_for(&versioned.course);
        let permalink = publisher.upsert(&versioned.course, &content_id)?;

        let mut next = versioned.course.clone();
        next.publication = Some(Publication {
            permalink: permalink.clone(),
            published: true,
            content_id: content_id.clone(),
            published_at: Utc::now(),
        });
        if let Err(err) = self.commit(&versioned, &next) {
            let was_published = versioned
                .course
                .publication
                .as_ref()
                .is_some_and(|p| p.content_id == content_id);
            if !was_published {
                if let Err(cleanup) = publisher.remove(&content_id) {
                    warn!(
                        course_id = %course_id,
                        error = %cleanup,
                        "failed to remove page after a refused publish"
                    );
                }
            }
            return Err(err);
        }
        self.emit_event_best_effort(
            course_id,
            "course_published",
            json!({ "permalink": permalink, "content_id": content_id }),
        );
        info!(course_id = %course_id, permalink = %permalink, "Course published");

        Ok(PublishResult {
            course_id: course_id.clone(),
            permalink,
            content_id,
        })
    }

    /// Remove the public page. Content, quiz and learner progress are kept.
    pub fn unpublish(&self, course_id: &CourseId) -> Result<(), ApiError> {
        let versioned = self.load(course_id)?;
        let Some(publication) = versioned.course.publication.clone() else {
            return Ok(());
        };
        self.publisher()?.remove(&publication.content_id)?;

        let mut next = versioned.course.clone();
        next.publication = None;
        self.commit(&versioned, &next)?;
        self.emit_event_best_effort(
            course_id,
            "course_unpublished",
            json!({ "content_id": publication.content_id }),
        );
        info!(course_id = %course_id, "Course unpublished");
        Ok(())
    }

    /// Grade answers without recording anything.
    pub fn grade_quiz(
        &self,
        course_id: &CourseId,
        answers: &BTreeMap<String, usize>,
    ) -> Result<QuizResult, ApiError> {
        let course = self.get_course(course_id)?;
        let quiz = course.quiz.as_ref().ok_or_else(|| {
            ApiError::InvalidState(format!("course {} has no quiz", course_id))
        })?;
        grade_quiz(quiz, answers, self.quiz.pass_threshold)
    }

    /// Grade answers and record the attempt for `user`.
    pub fn submit_quiz(
        &self,
        course_id: &CourseId,
        user: &str,
        answers: &BTreeMap<String, usize>,
    ) -> Result<QuizResult, ApiError> {
        let course = self.get_course(course_id)?;
        self.require_complete(&course)?;
        let result = self.grade_quiz(course_id, answers)?;
        let attempt = QuizAttempt {
            score_percent: result.score_percent,
            passed: result.passed,
            answers: answers.clone(),
            submitted_at: Utc::now(),
        };
        self.store
            .learners
            .update(course_id, user, |progress| progress.quiz_attempts.push(attempt.clone()))?;
        info!(
            course_id = %course_id,
            user = %user,
            score_percent = result.score_percent,
            passed = result.passed,
            "Quiz attempt recorded"
        );
        Ok(result)
    }

    pub fn mark_section_complete(
        &self,
        course_id: &CourseId,
        user: &str,
        section_id: &str,
    ) -> Result<ProgressSummary, ApiError> {
        self.set_section_completion(course_id, user, section_id, true)
    }

    pub fn mark_section_incomplete(
        &self,
        course_id: &CourseId,
        user: &str,
        section_id: &str,
    ) -> Result<ProgressSummary, ApiError> {
        self.set_section_completion(course_id, user, section_id, false)
    }

    pub fn learner_progress(
        &self,
        course_id: &CourseId,
        user: &str,
    ) -> Result<ProgressSummary, ApiError> {
        let course = self.get_course(course_id)?;
        let progress = self.store.learners.get(course_id, user)?;
        Ok(summarize_progress(&course, progress.as_ref()))
    }

    /// Recomputed from stored progress on every call.
    pub fn certificate_eligible(&self, course_id: &CourseId, user: &str) -> Result<bool, ApiError> {
        let course = self.get_course(course_id)?;
        let progress = self.store.learners.get(course_id, user)?;
        Ok(course.generation.is_complete() && certificate_eligible(&course, progress.as_ref()))
    }

    pub fn issue_certificate(
        &self,
        course_id: &CourseId,
        user: &str,
        learner_name: &str,
    ) -> Result<Certificate, ApiError> {
        let course = self.get_course(course_id)?;
        self.require_complete(&course)?;
        let progress = self
            .store
            .learners
            .get(course_id, user)?
            .filter(|progress| certificate_eligible(&course, Some(progress)))
            .ok_or_else(|| {
                ApiError::InvalidState(format!(
                    "{} is not yet eligible for a certificate in course {}",
                    user, course_id
                ))
            })?;

        let name = if learner_name.trim().is_empty() {
            user
        } else {
            learner_name.trim()
        };
        let certificate = Certificate::issue(&course, &progress, name, Utc::now());
        self.emit_event_best_effort(
            course_id,
            "certificate_issued",
            json!({ "user": user, "certificate_id": certificate.id }),
        );
        Ok(certificate)
    }

    pub fn journal(&self, course_id: &CourseId) -> Result<Vec<JournalEvent>, ApiError> {
        self.load(course_id)?;
        Ok(self.store.journal.read(course_id)?)
    }

    fn set_section_completion(
        &self,
        course_id: &CourseId,
        user: &str,
        section_id: &str,
        complete: bool,
    ) -> Result<ProgressSummary, ApiError> {
        let course = self.get_course(course_id)?;
        self.require_complete(&course)?;
        let section = section_id
            .parse::<SectionRef>()
            .ok()
            .filter(|r| course.section(*r).is_some())
            .ok_or_else(|| ApiError::SectionNotFound(section_id.to_string()))?;

        let key = section.to_string();
        let progress = self.store.learners.update(course_id, user, |progress| {
            if complete {
                progress.completed_sections.insert(key.clone());
            } else {
                progress.completed_sections.remove(&key);
            }
        })?;
        Ok(summarize_progress(&course, Some(&progress)))
    }

    fn load(&self, course_id: &CourseId) -> Result<VersionedCourse, ApiError> {
        self.store
            .courses
            .load(course_id)?
            .ok_or_else(|| ApiError::CourseNotFound(course_id.clone()))
    }

    fn commit(&self, expected: &VersionedCourse, next: &Course) -> Result<VersionedCourse, ApiError> {
        self.store.courses.commit(expected, next).map_err(|err| match err {
            StorageError::ConcurrentModification(id) => {
                ApiError::Conflict(format!("course {} changed concurrently", id))
            }
            other => ApiError::StorageError(other),
        })
    }

    fn require_complete(&self, course: &Course) -> Result<(), ApiError> {
        if course.generation.status != GenerationStatus::Complete {
            return Err(ApiError::InvalidState(format!(
                "course {} is not complete ({})",
                course.id, course.generation.status
            )));
        }
        Ok(())
    }

    fn publisher(&self) -> Result<&Arc<dyn PublicationTarget>, ApiError> {
        self.publisher.as_ref().ok_or_else(|| {
            ApiError::PublicationNotConfigured(
                "set publication.output_dir and publication.base_url".to_string(),
            )
        })
    }

    fn emit_event_best_effort(&self, course_id: &CourseId, event_type: &str, data: Value) {
        if let Err(err) = self.store.journal.append(course_id, event_type, data) {
            warn!(
                course_id = %course_id,
                event_type = %event_type,
                error = %err,
                "failed to append journal event"
            );
        }
    }
}

#[async_trait]
impl ChunkStepper for CourseApi {
    async fn step(&self, course_id: &CourseId) -> Result<ChunkResult, ApiError> {
        self.execute_next_chunk(course_id).await
    }
}
