//! Chunk executor: one unit of generation work per call.
//!
//! Each call takes the course lease, reads the checkpoint, performs at most one
//! provider request, validates the reply and commits document plus checkpoint in
//! a single compare-and-swap. Transport failures commit nothing.

use super::parse;
use super::prompts;
use super::state::{self, ChunkAction};
use crate::config::GenerationSettings;
use crate::course::{Course, CourseId, GenerationStatus};
use crate::error::{ApiError, StorageError};
use crate::provider::{CompletionOptions, ModelProviderClient};
use crate::store::{CourseStore, GenerationJournal, LeaseManager, Store, VersionedCourse};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

static HOLDER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Lease holder id, unique within the process: `{role}-{pid}-{n}`.
pub(crate) fn next_holder_id(role: &str) -> String {
    format!(
        "{}-{}-{}",
        role,
        std::process::id(),
        HOLDER_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// Progress snapshot returned by every chunk call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub course_id: CourseId,
    pub percent: u8,
    pub message: String,
    pub status: GenerationStatus,
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// The same chunk may be attempted again.
    pub retryable: bool,
}

impl ChunkResult {
    pub fn snapshot(course: &Course) -> Self {
        let state = &course.generation;
        let failed = state.status == GenerationStatus::Failed;
        Self {
            course_id: course.id.clone(),
            percent: state.percent_complete,
            message: state.current_task.clone(),
            status: state.status,
            complete: state.status == GenerationStatus::Complete,
            error: if failed { state.error.clone() } else { None },
            error_kind: None,
            retryable: false,
        }
    }

    fn with_error(course: &Course, err: &ApiError, retryable: bool) -> Self {
        let mut result = Self::snapshot(course);
        if result.error.is_none() {
            result.error = Some(err.to_string());
        }
        result.error_kind = Some(err.kind().to_string());
        result.retryable = retryable;
        result
    }

    pub fn is_failed(&self) -> bool {
        self.status == GenerationStatus::Failed
    }
}

/// Anything that can advance a course by one chunk.
#[async_trait]
pub trait ChunkStepper: Send + Sync {
    async fn step(&self, course_id: &CourseId) -> Result<ChunkResult, ApiError>;
}

pub struct ChunkExecutor {
    courses: Arc<dyn CourseStore>,
    leases: Arc<LeaseManager>,
    journal: Arc<GenerationJournal>,
    provider: Arc<dyn ModelProviderClient>,
    settings: GenerationSettings,
    options: CompletionOptions,
}

impl ChunkExecutor {
    pub fn new(
        store: &Store,
        provider: Arc<dyn ModelProviderClient>,
        settings: GenerationSettings,
        options: CompletionOptions,
    ) -> Self {
        Self {
            courses: store.courses.clone(),
            leases: store.leases.clone(),
            journal: store.journal.clone(),
            provider,
            settings,
            options,
        }
    }

    /// Perform the next unit of work for a course.
    ///
    /// `Err` means the call was refused (unknown course, terminal course, lease
    /// held, document changed underneath). A chunk that ran but failed comes back
    /// as `Ok` with `error` set and `retryable` telling the caller what to do.
    pub async fn execute_next_chunk(&self, course_id: &CourseId) -> Result<ChunkResult, ApiError> {
        let holder = next_holder_id("chunk");
        let lease = self.leases.acquire(course_id, &holder)?;

        let versioned = self
            .courses
            .load(course_id)?
            .ok_or_else(|| ApiError::CourseNotFound(course_id.clone()))?;
        let course = &versioned.course;
        let Some(action) = state::next_action(course)? else {
            return Err(ApiError::InvalidState(format!(
                "course {} generation is already {}",
                course_id, course.generation.status
            )));
        };

        info!(
            course_id = %course_id,
            status = %course.generation.status,
            action = action.name(),
            chapter = course.generation.current_chapter_index,
            section = course.generation.current_section_index,
            attempt = course.generation.validation_failures + 1,
            "Executing generation chunk"
        );

        let result = self.run_action(&versioned, action).await;
        if let Err(err) = lease.release() {
            warn!(course_id = %course_id, error = %err, "failed to release course lease");
        }
        result
    }

    async fn run_action(
        &self,
        versioned: &VersionedCourse,
        action: ChunkAction,
    ) -> Result<ChunkResult, ApiError> {
        let course = &versioned.course;

        if action == ChunkAction::Analyze {
            if let Err(reason) = course.brief.validate(&self.settings.brief_limits()) {
                let err = ApiError::InvalidBrief(reason);
                return self.fail(versioned, action, &err);
            }
        }

        if action == ChunkAction::Finalize && !course.brief.include_quiz {
            let next = state::apply_finalization(course, None, self.settings.words_per_minute);
            return self.commit_success(versioned, action, next, 0);
        }

        let messages = prompts::messages_for(action, course, self.settings.min_section_chars);
        let started = Instant::now();
        let response = self
            .provider
            .complete(messages, self.options.clone())
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let response = match response {
            Ok(response) => response,
            Err(err) if err.is_irrecoverable_provider_error() => {
                warn!(
                    course_id = %course.id,
                    provider = self.provider.provider_name(),
                    model = self.provider.model_name(),
                    error = %err,
                    duration_ms,
                    "Provider rejected request permanently"
                );
                return self.fail(versioned, action, &err);
            }
            Err(err) => {
                warn!(
                    course_id = %course.id,
                    provider = self.provider.provider_name(),
                    error = %err,
                    duration_ms,
                    "Provider call failed; checkpoint unchanged"
                );
                self.emit_event_best_effort(
                    &course.id,
                    "chunk_failed",
                    json!({
                        "action": action.name(),
                        "error_kind": err.kind(),
                        "error": err.to_string(),
                        "percent": course.generation.percent_complete,
                    }),
                );
                return Ok(ChunkResult::with_error(course, &err, true));
            }
        };

        debug!(
            course_id = %course.id,
            provider = self.provider.provider_name(),
            model = %response.model,
            completion_tokens = response.usage.completion_tokens,
            duration_ms,
            "Provider call completed"
        );

        match self.apply_response(course, action, &response.content) {
            Ok(next) => self.commit_success(versioned, action, next, duration_ms),
            Err(err @ ApiError::Validation(_)) => self.reject(versioned, action, &err),
            Err(err) => Err(err),
        }
    }

    fn apply_response(
        &self,
        course: &Course,
        action: ChunkAction,
        raw: &str,
    ) -> Result<Course, ApiError> {
        let settings = &self.settings;
        Ok(match action {
            ChunkAction::Analyze => state::apply_analysis(course, parse::parse_analysis(raw)?),
            ChunkAction::Outline => {
                let outline = parse::parse_outline(
                    raw,
                    course.brief.chapter_count,
                    course.brief.sections_per_chapter,
                )?;
                state::apply_outline(course, outline)
            }
            ChunkAction::ExpandSection { chapter, section } => {
                let draft = parse::parse_section(raw, settings.min_section_chars, section == 0)?;
                state::apply_section(course, chapter, section, draft)
            }
            ChunkAction::ExpandIntroduction { chapter } => {
                state::apply_introduction(course, chapter, parse::parse_introduction(raw)?)
            }
            ChunkAction::Finalize => {
                let quiz = parse::parse_quiz(raw, course.brief.quiz_questions)?;
                state::apply_finalization(course, Some(quiz), settings.words_per_minute)
            }
        })
    }

    fn commit(&self, versioned: &VersionedCourse, mut next: Course) -> Result<Course, ApiError> {
        let from = versioned.course.generation.status;
        let to = next.generation.status;
        if !from.can_transition_to(to) {
            return Err(ApiError::InvalidState(format!(
                "course {} cannot move from {} to {}",
                next.id, from, to
            )));
        }
        next.updated_at = Utc::now();
        match self.courses.commit(versioned, &next) {
            Ok(committed) => Ok(committed.course),
            Err(StorageError::ConcurrentModification(_)) => Err(ApiError::Conflict(format!(
                "course {} changed while a chunk was running",
                next.id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    fn commit_success(
        &self,
        versioned: &VersionedCourse,
        action: ChunkAction,
        next: Course,
        duration_ms: u64,
    ) -> Result<ChunkResult, ApiError> {
        let committed = self.commit(versioned, next)?;
        let state = &committed.generation;
        info!(
            course_id = %committed.id,
            action = action.name(),
            status = %state.status,
            percent = state.percent_complete,
            chapter = state.current_chapter_index,
            section = state.current_section_index,
            duration_ms,
            "Committed generation chunk"
        );
        self.emit_event_best_effort(
            &committed.id,
            "chunk_committed",
            json!({
                "action": action.name(),
                "status": state.status,
                "percent": state.percent_complete,
                "duration_ms": duration_ms,
            }),
        );
        if state.status == GenerationStatus::Complete {
            self.emit_event_best_effort(
                &committed.id,
                "generation_completed",
                json!({
                    "chapters": committed.chapters.len(),
                    "sections": committed.total_sections(),
                    "questions": committed.quiz.as_ref().map(|q| q.questions.len()).unwrap_or(0),
                }),
            );
        }
        Ok(ChunkResult::snapshot(&committed))
    }

    /// Count a rejected reply; fails the course once the budget is spent.
    fn reject(
        &self,
        versioned: &VersionedCourse,
        action: ChunkAction,
        err: &ApiError,
    ) -> Result<ChunkResult, ApiError> {
        let (next, exhausted) = state::record_validation_failure(
            &versioned.course,
            &err.to_string(),
            self.settings.max_validation_retries,
        );
        let committed = self.commit(versioned, next)?;
        warn!(
            course_id = %committed.id,
            action = action.name(),
            failures = committed.generation.validation_failures,
            max_retries = self.settings.max_validation_retries,
            error = %err,
            "Generated content rejected"
        );
        if exhausted {
            self.emit_failed(&committed, action, err);
            return Ok(ChunkResult::with_error(&committed, err, false));
        }
        self.emit_event_best_effort(
            &committed.id,
            "chunk_failed",
            json!({
                "action": action.name(),
                "error_kind": err.kind(),
                "error": err.to_string(),
                "failures": committed.generation.validation_failures,
            }),
        );
        Ok(ChunkResult::with_error(&committed, err, true))
    }

    fn fail(
        &self,
        versioned: &VersionedCourse,
        action: ChunkAction,
        err: &ApiError,
    ) -> Result<ChunkResult, ApiError> {
        let next = state::mark_failed(&versioned.course, &err.to_string());
        let committed = self.commit(versioned, next)?;
        warn!(
            course_id = %committed.id,
            action = action.name(),
            error = %err,
            "Course generation failed"
        );
        self.emit_failed(&committed, action, err);
        Ok(ChunkResult::with_error(&committed, err, false))
    }

    fn emit_failed(&self, course: &Course, action: ChunkAction, err: &ApiError) {
        self.emit_event_best_effort(
            &course.id,
            "generation_failed",
            json!({
                "action": action.name(),
                "error_kind": err.kind(),
                "error": course.generation.error,
                "percent": course.generation.percent_complete,
            }),
        );
    }

    fn emit_event_best_effort(&self, course_id: &CourseId, event_type: &str, data: Value) {
        if let Err(err) = self.journal.append(course_id, event_type, data) {
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
impl ChunkStepper for ChunkExecutor {
    async fn step(&self, course_id: &CourseId) -> Result<ChunkResult, ApiError> {
        self.execute_next_chunk(course_id).await
    }
}
