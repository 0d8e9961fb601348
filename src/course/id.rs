//! Course identifiers: opaque, unique, filesystem and URL safe tokens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static MINT_COUNTER: AtomicU64 = AtomicU64::new(1);

const ID_PREFIX: &str = "crs-";
const ID_HEX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    /// Mint a fresh id. The seed (usually the brief topic) only adds entropy.
    pub fn mint(seed: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let seq = MINT_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut hasher = blake3::Hasher::new();
        hasher.update(seed.as_bytes());
        hasher.update(&nanos.to_le_bytes());
        hasher.update(&std::process::id().to_le_bytes());
        hasher.update(&seq.to_le_bytes());
        let digest = hex::encode(hasher.finalize().as_bytes());
        CourseId(format!("{ID_PREFIX}{}", &digest[..ID_HEX_LEN]))
    }

    /// Accepts ids typed by a caller; rejects anything that cannot be a store key.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("course id must not be empty".to_string());
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!("course id contains invalid characters: {raw}"));
        }
        Ok(CourseId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last characters of the id, used to keep published slugs unique.
    pub fn short(&self) -> &str {
        let start = self.0.len().saturating_sub(6);
        &self.0[start..]
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourseId {
    fn from(value: &str) -> Self {
        CourseId(value.to_string())
    }
}
