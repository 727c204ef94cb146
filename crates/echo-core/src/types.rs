//! Core types — entry fields, records, analysis payloads, job states.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::EntryId;

/// Canonical name of the recording blob inside an entry directory.
pub const RECORDING_FILENAME: &str = "recording.m4a";

// ── Fields ──

/// A single named text attribute of an entry, persisted as its own file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryField {
    Title,
    Description,
    Transcript,
    Summary,
    Quote,
    Sentiment,
}

impl EntryField {
    pub const ALL: [EntryField; 6] = [
        EntryField::Title,
        EntryField::Description,
        EntryField::Transcript,
        EntryField::Summary,
        EntryField::Quote,
        EntryField::Sentiment,
    ];

    /// Fields written back by the analysis collaborator.
    pub const ANALYSIS: [EntryField; 4] = [
        EntryField::Transcript,
        EntryField::Summary,
        EntryField::Quote,
        EntryField::Sentiment,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            EntryField::Title => "title.txt",
            EntryField::Description => "description.txt",
            EntryField::Transcript => "transcript.txt",
            EntryField::Summary => "summary.txt",
            EntryField::Quote => "quote.txt",
            EntryField::Sentiment => "sentiment.txt",
        }
    }
}

impl std::fmt::Display for EntryField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.file_name().trim_end_matches(".txt");
        write!(f, "{}", name)
    }
}

// ── Records ──

/// One hydrated journal entry. Every text field is independently optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: EntryId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub quote: Option<String>,
    pub sentiment: Option<String>,
    /// Where the recording lives by convention; the blob itself may be missing.
    pub recording: PathBuf,
}

impl EntryRecord {
    pub fn empty(id: EntryId, recording: PathBuf) -> Self {
        Self {
            id,
            title: None,
            description: None,
            transcript: None,
            summary: None,
            quote: None,
            sentiment: None,
            recording,
        }
    }

    pub fn field(&self, field: EntryField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set_field(&mut self, field: EntryField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    /// True once any analysis field has landed.
    pub fn has_analysis(&self) -> bool {
        EntryField::ANALYSIS.iter().any(|f| self.field(*f).is_some())
    }

    fn slot(&self, field: EntryField) -> &Option<String> {
        match field {
            EntryField::Title => &self.title,
            EntryField::Description => &self.description,
            EntryField::Transcript => &self.transcript,
            EntryField::Summary => &self.summary,
            EntryField::Quote => &self.quote,
            EntryField::Sentiment => &self.sentiment,
        }
    }

    fn slot_mut(&mut self, field: EntryField) -> &mut Option<String> {
        match field {
            EntryField::Title => &mut self.title,
            EntryField::Description => &mut self.description,
            EntryField::Transcript => &mut self.transcript,
            EntryField::Summary => &mut self.summary,
            EntryField::Quote => &mut self.quote,
            EntryField::Sentiment => &mut self.sentiment,
        }
    }
}

// ── Analysis collaborator payloads ──

/// Response of the `/analyze` endpoint. A missing key is treated like null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
}

impl AnalysisResult {
    pub fn fields(&self) -> [(EntryField, Option<&str>); 4] {
        [
            (EntryField::Transcript, self.transcript.as_deref()),
            (EntryField::Summary, self.summary.as_deref()),
            (EntryField::Quote, self.quote.as_deref()),
            (EntryField::Sentiment, self.sentiment.as_deref()),
        ]
    }
}

/// Response of the `/highlight` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub quote: Option<String>,
}

// ── Job state machine ──

/// Progress of one `save_entry` job. `AnalysisApplied` and `AnalysisFailed`
/// are terminal and the entry stays usable in both. `CommitFailed` is terminal
/// too: the local commit broke off and the collaborator was never asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Draft,
    DirectoryCreated,
    RecordingIngested,
    LocalFieldsWritten,
    AnalysisRequested,
    AnalysisApplied,
    AnalysisFailed,
    CommitFailed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::AnalysisApplied | JobState::AnalysisFailed | JobState::CommitFailed
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Draft => write!(f, "draft"),
            JobState::DirectoryCreated => write!(f, "directory_created"),
            JobState::RecordingIngested => write!(f, "recording_ingested"),
            JobState::LocalFieldsWritten => write!(f, "local_fields_written"),
            JobState::AnalysisRequested => write!(f, "analysis_requested"),
            JobState::AnalysisApplied => write!(f, "analysis_applied"),
            JobState::AnalysisFailed => write!(f, "analysis_failed"),
            JobState::CommitFailed => write!(f, "commit_failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_file_names_are_distinct() {
        let mut names: Vec<&str> = EntryField::ALL.iter().map(|f| f.file_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), EntryField::ALL.len());
        assert!(!names.contains(&RECORDING_FILENAME));
    }

    #[test]
    fn test_record_field_accessors() {
        let mut record = EntryRecord::empty(EntryId::new(1), PathBuf::from("1/recording.m4a"));
        assert!(!record.has_analysis());

        record.set_field(EntryField::Title, Some("Entry on 1/1/2024".into()));
        assert_eq!(record.field(EntryField::Title), Some("Entry on 1/1/2024"));
        assert!(!record.has_analysis());

        record.set_field(EntryField::Quote, Some("I went to the park.".into()));
        assert!(record.has_analysis());
    }

    #[test]
    fn test_analysis_result_missing_keys_are_null() {
        let parsed: AnalysisResult =
            serde_json::from_str(r#"{"transcript": "hello", "sentiment": "hopeful"}"#).unwrap();
        assert_eq!(parsed.transcript.as_deref(), Some("hello"));
        assert_eq!(parsed.summary, None);
        assert_eq!(parsed.quote, None);
        assert_eq!(parsed.sentiment.as_deref(), Some("hopeful"));
    }

    #[test]
    fn test_record_serializes_absent_fields_as_null() {
        let record = EntryRecord::empty(EntryId::new(42), PathBuf::from("42/recording.m4a"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "42");
        assert!(json["transcript"].is_null());
    }

    #[test]
    fn test_job_state_terminal() {
        assert!(JobState::AnalysisApplied.is_terminal());
        assert!(JobState::AnalysisFailed.is_terminal());
        assert!(JobState::CommitFailed.is_terminal());
        assert!(!JobState::AnalysisRequested.is_terminal());
        assert_eq!(JobState::LocalFieldsWritten.to_string(), "local_fields_written");
    }
}
