//! Append-only audit log of generation and lifecycle events per course.

use super::now_millis;
use crate::course::CourseId;
use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sled::Tree;

const EVENT_KEY_PAD: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEvent {
    pub course_id: CourseId,
    pub seq: u64,
    pub ts_ms: u64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

pub struct GenerationJournal {
    events: Tree,
    meta: Tree,
}

fn encode_event_key(course_id: &CourseId, seq: u64) -> String {
    format!("{}:{:0width$}", course_id, seq, width = EVENT_KEY_PAD)
}

impl GenerationJournal {
    pub fn new(events: Tree, meta: Tree) -> Self {
        Self { events, meta }
    }

    pub fn append(
        &self,
        course_id: &CourseId,
        event_type: &str,
        data: Value,
    ) -> Result<JournalEvent, StorageError> {
        let seq = self.next_seq(course_id)?;
        let event = JournalEvent {
            course_id: course_id.clone(),
            seq,
            ts_ms: now_millis(),
            event_type: event_type.to_string(),
            data,
        };
        let value = serde_json::to_vec(&event).map_err(StorageError::from_json)?;
        self.events
            .insert(encode_event_key(course_id, seq).as_bytes(), value)
            .map_err(StorageError::from_sled)?;
        Ok(event)
    }

    pub fn read(&self, course_id: &CourseId) -> Result<Vec<JournalEvent>, StorageError> {
        self.read_after(course_id, 0)
    }

    pub fn read_after(
        &self,
        course_id: &CourseId,
        after_seq: u64,
    ) -> Result<Vec<JournalEvent>, StorageError> {
        let prefix = format!("{}:", course_id);
        let mut out = Vec::new();
        for item in self.events.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item.map_err(StorageError::from_sled)?;
            let event: JournalEvent =
                serde_json::from_slice(&value).map_err(StorageError::from_json)?;
            if event.seq > after_seq {
                out.push(event);
            }
        }
        out.sort_by_key(|e| e.seq);
        Ok(out)
    }

    pub fn remove_course(&self, course_id: &CourseId) -> Result<(), StorageError> {
        let prefix = format!("{}:", course_id);
        let keys: Vec<sled::IVec> = self
            .events
            .scan_prefix(prefix.as_bytes())
            .keys()
            .collect::<Result<_, _>>()
            .map_err(StorageError::from_sled)?;
        for key in keys {
            self.events.remove(key).map_err(StorageError::from_sled)?;
        }
        self.meta
            .remove(course_id.as_str().as_bytes())
            .map_err(StorageError::from_sled)?;
        Ok(())
    }

    /// Sequence numbers start at 1 and are allocated atomically per course.
    fn next_seq(&self, course_id: &CourseId) -> Result<u64, StorageError> {
        let updated = self
            .meta
            .update_and_fetch(course_id.as_str().as_bytes(), |old| {
                let current = old
                    .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
                    .map(u64::from_be_bytes)
                    .unwrap_or(0);
                Some((current + 1).to_be_bytes().to_vec())
            })
            .map_err(StorageError::from_sled)?;
        Ok(updated
            .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_ref()).ok())
            .map(u64::from_be_bytes)
            .unwrap_or(1))
    }
}
