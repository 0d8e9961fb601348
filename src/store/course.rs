//! Course documents keyed by id, committed with compare-and-swap.

use crate::course::{Course, CourseId};
use crate::error::StorageError;
use sled::Tree;

/// A document together with the exact bytes it was decoded from. Commits use
/// those bytes as the expected value.
#[derive(Debug, Clone)]
pub struct VersionedCourse {
    pub course: Course,
    raw: sled::IVec,
}

impl VersionedCourse {
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// Document store with atomic single-document read-modify-write.
pub trait CourseStore: Send + Sync {
    fn load(&self, id: &CourseId) -> Result<Option<VersionedCourse>, StorageError>;

    /// Store a new document; fails if the id is taken.
    fn insert(&self, course: &Course) -> Result<VersionedCourse, StorageError>;

    /// Replace `expected` with `next`. Fails with `ConcurrentModification` when the
    /// stored bytes are no longer the ones `expected` was read from.
    fn commit(
        &self,
        expected: &VersionedCourse,
        next: &Course,
    ) -> Result<VersionedCourse, StorageError>;

    fn remove(&self, id: &CourseId) -> Result<bool, StorageError>;

    fn list(&self) -> Result<Vec<Course>, StorageError>;
}

pub struct SledCourseStore {
    tree: Tree,
}

impl SledCourseStore {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }

    /// Stored bytes for a course, exactly as persisted.
    pub fn raw(&self, id: &CourseId) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .tree
            .get(id.as_str().as_bytes())
            .map_err(StorageError::from_sled)?
            .map(|v| v.to_vec()))
    }

    fn decode(key: &str, raw: sled::IVec) -> Result<VersionedCourse, StorageError> {
        let course: Course = serde_json::from_slice(&raw).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(VersionedCourse { course, raw })
    }

    fn encode(course: &Course) -> Result<sled::IVec, StorageError> {
        Ok(serde_json::to_vec(course)
            .map_err(StorageError::from_json)?
            .into())
    }
}

impl CourseStore for SledCourseStore {
    fn load(&self, id: &CourseId) -> Result<Option<VersionedCourse>, StorageError> {
        let Some(raw) = self
            .tree
            .get(id.as_str().as_bytes())
            .map_err(StorageError::from_sled)?
        else {
            return Ok(None);
        };
        Ok(Some(Self::decode(id.as_str(), raw)?))
    }

    fn insert(&self, course: &Course) -> Result<VersionedCourse, StorageError> {
        let value = Self::encode(course)?;
        self.tree
            .compare_and_swap(
                course.id.as_str().as_bytes(),
                None as Option<&[u8]>,
                Some(value.clone()),
            )
            .map_err(StorageError::from_sled)?
            .map_err(|_| {
                StorageError::ConcurrentModification(format!(
                    "course {} already exists",
                    course.id
                ))
            })?;
        Ok(VersionedCourse {
            course: course.clone(),
            raw: value,
        })
    }

    fn commit(
        &self,
        expected: &VersionedCourse,
        next: &Course,
    ) -> Result<VersionedCourse, StorageError> {
        let value = Self::encode(next)?;
        self.tree
            .compare_and_swap(
                next.id.as_str().as_bytes(),
                Some(expected.raw.clone()),
                Some(value.clone()),
            )
            .map_err(StorageError::from_sled)?
            .map_err(|_| StorageError::ConcurrentModification(next.id.to_string()))?;
        Ok(VersionedCourse {
            course: next.clone(),
            raw: value,
        })
    }

    fn remove(&self, id: &CourseId) -> Result<bool, StorageError> {
        Ok(self
            .tree
            .remove(id.as_str().as_bytes())
            .map_err(StorageError::from_sled)?
            .is_some())
    }

    fn list(&self) -> Result<Vec<Course>, StorageError> {
        let mut courses = Vec::new();
        for item in self.tree.iter() {
            let (key, value) = item.map_err(StorageError::from_sled)?;
            let key = String::from_utf8_lossy(&key).to_string();
            courses.push(Self::decode(&key, value)?.course);
        }
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses)
    }
}
