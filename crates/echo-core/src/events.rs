//! JournalEvent enum — broadcast from the store to frontends via tokio::broadcast.

use serde::{Deserialize, Serialize};

use crate::ids::EntryId;
use crate::types::{EntryRecord, JobState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobUpdate {
    pub id: EntryId,
    pub state: JobState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsData {
    pub in_flight: usize,
}

/// Events broadcast to all subscribers (WebSocket clients, tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum JournalEvent {
    /// The cache was rebuilt; carries the full snapshot.
    #[serde(rename = "entries")]
    Entries(Vec<EntryRecord>),

    /// A job moved to a new state.
    #[serde(rename = "job")]
    Job(JobUpdate),

    /// The in-flight set changed size.
    #[serde(rename = "jobs")]
    Jobs(JobsData),
}

impl JournalEvent {
    /// Serialize to the JSON format the frontend expects:
    /// `{"event": "...", "data": {...}}`
    pub fn to_ws_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_event_shape() {
        let event = JournalEvent::Job(JobUpdate {
            id: EntryId::new(1700000000000),
            state: JobState::AnalysisRequested,
        });
        let json = event.to_ws_json();
        assert_eq!(json["event"], "job");
        assert_eq!(json["data"]["id"], "1700000000000");
        assert_eq!(json["data"]["state"], "analysis_requested");
    }

    #[test]
    fn test_jobs_event_shape() {
        let json = JournalEvent::Jobs(JobsData { in_flight: 2 }).to_ws_json();
        assert_eq!(json["event"], "jobs");
        assert_eq!(json["data"]["in_flight"], 2);
    }
}
