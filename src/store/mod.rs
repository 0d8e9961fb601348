//! Course Store
//!
//! One sled database per workspace, split into trees: course documents, learner
//! progress, per-course leases and the generation journal. Documents are JSON.

pub mod course;
pub mod journal;
pub mod learner;
pub mod lease;

pub use course::{CourseStore, SledCourseStore, VersionedCourse};
pub use journal::{GenerationJournal, JournalEvent};
pub use learner::{LearnerProgress, LearnerStore, QuizAttempt};
pub use lease::{Lease, LeaseGuard, LeaseManager};

use crate::error::StorageError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const TREE_COURSES: &str = "courses";
const TREE_LEARNERS: &str = "learner_progress";
const TREE_LEASES: &str = "course_leases";
const TREE_JOURNAL: &str = "journal_events";
const TREE_JOURNAL_META: &str = "journal_meta";

/// Every tree the engine uses, opened over one database.
#[derive(Clone)]
pub struct Store {
    db: sled::Db,
    pub courses: Arc<SledCourseStore>,
    pub learners: Arc<LearnerStore>,
    pub leases: Arc<LeaseManager>,
    pub journal: Arc<GenerationJournal>,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P, lease_ttl: Duration) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(path).map_err(StorageError::from_sled)?;
        Self::from_db(db, lease_ttl)
    }

    /// In-memory database removed on drop.
    pub fn temporary(lease_ttl: Duration) -> Result<Self, StorageError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(StorageError::from_sled)?;
        Self::from_db(db, lease_ttl)
    }

    pub fn from_db(db: sled::Db, lease_ttl: Duration) -> Result<Self, StorageError> {
        let open = |name: &str| db.open_tree(name).map_err(StorageError::from_sled);
        let courses = Arc::new(SledCourseStore::new(open(TREE_COURSES)?));
        let learners = Arc::new(LearnerStore::new(open(TREE_LEARNERS)?));
        let leases = Arc::new(LeaseManager::new(open(TREE_LEASES)?, lease_ttl));
        let journal = Arc::new(GenerationJournal::new(
            open(TREE_JOURNAL)?,
            open(TREE_JOURNAL_META)?,
        ));
        Ok(Self {
            db,
            courses,
            learners,
            leases,
            journal,
        })
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(StorageError::from_sled)?;
        Ok(())
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
