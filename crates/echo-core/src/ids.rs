//! Entry identifiers — integer-valued, derived from creation time, strictly
//! increasing within a process.

use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of one entry. Its decimal form is the entry's directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EntryId(u64);

impl EntryId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid entry id: {0:?}")]
pub struct InvalidEntryId(pub String);

impl FromStr for EntryId {
    type Err = InvalidEntryId;

    /// Only the canonical decimal form is accepted, so "007" or "+7" never
    /// alias the directory named "7".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s.parse().map_err(|_| InvalidEntryId(s.to_string()))?;
        if value.to_string() != s {
            return Err(InvalidEntryId(s.to_string()));
        }
        Ok(Self(value))
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for EntryId {
    type Error = InvalidEntryId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Hands out millisecond-epoch ids, bumping past the last issued id when the
/// clock has not moved (or moved backwards).
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: Mutex<u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> EntryId {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.next_at(now)
    }

    fn next_at(&self, now_ms: u64) -> EntryId {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let value = now_ms.max(last.saturating_add(1));
        *last = value;
        EntryId(value)
    }
}
