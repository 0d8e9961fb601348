//! Per-course mutual exclusion for chunk execution.
//!
//! A lease is a small record in its own tree, taken with compare-and-swap and
//! expiring after a TTL so a crashed holder cannot block a course forever.

use super::now_millis;
use crate::course::CourseId;
use crate::error::{ApiError, StorageError};
use serde::{Deserialize, Serialize};
use sled::Tree;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub holder: String,
    pub acquired_at_ms: u64,
    pub expires_at_ms: u64,
}

impl Lease {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms <= now_ms
    }
}

pub struct LeaseManager {
    tree: Tree,
    ttl: Duration,
}

impl LeaseManager {
    pub fn new(tree: Tree, ttl: Duration) -> Self {
        Self { tree, ttl }
    }

    /// Take the course lease for `holder`.
    ///
    /// An unexpired lease held by someone else yields `Conflict`; an expired one
    /// is taken over.
    pub fn acquire(&self, course_id: &CourseId, holder: &str) -> Result<LeaseGuard, ApiError> {
        let key = course_id.as_str().as_bytes();
        loop {
            let now = now_millis();
            let current = self.tree.get(key).map_err(StorageError::from_sled)?;

            if let Some(raw) = &current {
                match serde_json::from_slice::<Lease>(raw) {
                    Ok(existing) if existing.holder != holder && !existing.is_expired(now) => {
                        return Err(ApiError::Conflict(format!(
                            "course {} is locked by {} for another {}ms",
                            course_id,
                            existing.holder,
                            existing.expires_at_ms.saturating_sub(now)
                        )));
                    }
                    Ok(existing) if existing.holder != holder => {
                        warn!(
                            course_id = %course_id,
                            previous_holder = %existing.holder,
                            "taking over expired course lease"
                        );
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(course_id = %course_id, error = %err, "discarding unreadable course lease");
                    }
                }
            }

            let lease = Lease {
                holder: holder.to_string(),
                acquired_at_ms: now,
                expires_at_ms: now.saturating_add(self.ttl.as_millis() as u64),
            };
            let value: sled::IVec = serde_json::to_vec(&lease)
                .map_err(StorageError::from_json)?
                .into();

            let swapped = self
                .tree
                .compare_and_swap(key, current, Some(value.clone()))
                .map_err(StorageError::from_sled)?;
            if swapped.is_ok() {
                debug!(course_id = %course_id, holder = %holder, "course lease acquired");
                return Ok(LeaseGuard {
                    tree: self.tree.clone(),
                    course_id: course_id.clone(),
                    written: value,
                    released: false,
                });
            }
            // Lost a race with another acquirer; re-read and decide again.
        }
    }

    pub fn current(&self, course_id: &CourseId) -> Result<Option<Lease>, StorageError> {
        let Some(raw) = self
            .tree
            .get(course_id.as_str().as_bytes())
            .map_err(StorageError::from_sled)?
        else {
            return Ok(None);
        };
        Ok(serde_json::from_slice(&raw).ok())
    }

    /// Drop any lease on the course regardless of holder.
    pub fn clear(&self, course_id: &CourseId) -> Result<(), StorageError> {
        self.tree
            .remove(course_id.as_str().as_bytes())
            .map_err(StorageError::from_sled)?;
        Ok(())
    }
}

/// Held lease. Released on drop, but only while the stored record is still ours.
pub struct LeaseGuard {
    tree: Tree,
    course_id: CourseId,
    written: sled::IVec,
    released: bool,
}

impl LeaseGuard {
    pub fn release(mut self) -> Result<(), StorageError> {
        self.released = true;
        self.release_inner()
    }

    fn release_inner(&self) -> Result<(), StorageError> {
        let result = self
            .tree
            .compare_and_swap(
                self.course_id.as_str().as_bytes(),
                Some(self.written.clone()),
                None as Option<sled::IVec>,
            )
            .map_err(StorageError::from_sled)?;
        if result.is_err() {
            debug!(course_id = %self.course_id, "course lease already taken over");
        }
        Ok(())
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.release_inner() {
            warn!(course_id = %self.course_id, error = %err, "failed to release course lease");
        }
    }
}
