//! Learner progress, one record per (course, user), kept apart from the course document.

use crate::course::CourseId;
use crate::error::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Tree;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub score_percent: u8,
    pub passed: bool,
    #[serde(default)]
    pub answers: BTreeMap<String, usize>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerProgress {
    pub course_id: CourseId,
    pub user: String,
    /// Section ids (`chapter-{c}-section-{s}`)
    #[serde(default)]
    pub completed_sections: BTreeSet<String>,
    #[serde(default)]
    pub quiz_attempts: Vec<QuizAttempt>,
    pub updated_at: DateTime<Utc>,
}

impl LearnerProgress {
    pub fn new(course_id: CourseId, user: impl Into<String>) -> Self {
        Self {
            course_id,
            user: user.into(),
            completed_sections: BTreeSet::new(),
            quiz_attempts: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn last_attempt(&self) -> Option<&QuizAttempt> {
        self.quiz_attempts.last()
    }
}

pub struct LearnerStore {
    tree: Tree,
}

fn record_key(course_id: &CourseId, user: &str) -> String {
    format!("{}:{}", course_id, user)
}

impl LearnerStore {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }

    pub fn get(
        &self,
        course_id: &CourseId,
        user: &str,
    ) -> Result<Option<LearnerProgress>, StorageError> {
        let key = record_key(course_id, user);
        let Some(raw) = self.tree.get(key.as_bytes()).map_err(StorageError::from_sled)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(|e| StorageError::Corrupt {
            key,
            message: e.to_string(),
        })?;
        Ok(Some(parsed))
    }

    /// Read-modify-write of one learner record; created on first use.
    pub fn update<F>(
        &self,
        course_id: &CourseId,
        user: &str,
        mut mutate: F,
    ) -> Result<LearnerProgress, StorageError>
    where
        F: FnMut(&mut LearnerProgress),
    {
        let key = record_key(course_id, user);
        loop {
            let current = self.tree.get(key.as_bytes()).map_err(StorageError::from_sled)?;
            let mut progress = match &current {
                Some(raw) => serde_json::from_slice(raw).map_err(|e| StorageError::Corrupt {
                    key: key.clone(),
                    message: e.to_string(),
                })?,
                None => LearnerProgress::new(course_id.clone(), user),
            };
            mutate(&mut progress);
            progress.updated_at = Utc::now();
            let value = serde_json::to_vec(&progress).map_err(StorageError::from_json)?;
            let swapped = self
                .tree
                .compare_and_swap(key.as_bytes(), current, Some(value))
                .map_err(StorageError::from_sled)?;
            if swapped.is_ok() {
                return Ok(progress);
            }
        }
    }

    /// Remove every learner record of a course. Returns how many were removed.
    pub fn remove_course(&self, course_id: &CourseId) -> Result<usize, StorageError> {
        let prefix = format!("{}:", course_id);
        let keys: Vec<sled::IVec> = self
            .tree
            .scan_prefix(prefix.as_bytes())
            .keys()
            .collect::<Result<_, _>>()
            .map_err(StorageError::from_sled)?;
        for key in &keys {
            self.tree.remove(key).map_err(StorageError::from_sled)?;
        }
        Ok(keys.len())
    }
}
