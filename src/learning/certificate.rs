//! Certificate eligibility and issuance.

use super::progress::summarize_progress;
use crate::course::{Course, CourseId};
use crate::store::LearnerProgress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every section completed, and the latest quiz attempt passed when the course has a quiz.
pub fn certificate_eligible(course: &Course, progress: Option<&LearnerProgress>) -> bool {
    let Some(progress) = progress else {
        return false;
    };
    let summary = summarize_progress(course, Some(progress));
    if summary.completed != summary.total {
        return false;
    }
    match &course.quiz {
        None => true,
        Some(_) => progress.last_attempt().map(|a| a.passed).unwrap_or(false),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Same course and user always yield the same id.
    pub id: String,
    pub course_id: CourseId,
    pub course_title: String,
    pub user: String,
    pub learner_name: String,
    pub score_percent: Option<u8>,
    pub issued_at: DateTime<Utc>,
}

impl Certificate {
    pub fn issue(
        course: &Course,
        progress: &LearnerProgress,
        learner_name: &str,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: certificate_id(&course.id, &progress.user),
            course_id: course.id.clone(),
            course_title: course.title.clone(),
            user: progress.user.clone(),
            learner_name: learner_name.to_string(),
            score_percent: progress.last_attempt().map(|a| a.score_percent),
            issued_at,
        }
    }
}

pub fn certificate_id(course_id: &CourseId, user: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(course_id.as_str().as_bytes());
    hasher.update(&[0]);
    hasher.update(user.as_bytes());
    let digest = hex::encode(hasher.finalize().as_bytes());
    format!("cert-{}", &digest[..16])
}
