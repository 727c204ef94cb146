//! Error taxonomy for the store and the analysis collaborator.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::ids::EntryId;

/// Failures that can stop a store operation or a job's local commit.
/// Plain field reads never produce these; absence resolves to `None`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entry {0} not found")]
    NotFound(EntryId),

    #[error("failed to write {what} for entry {id}")]
    WriteFailed { id: EntryId, what: String },

    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing recording {}: {reason}", .path.display())]
    RejectedSource { path: PathBuf, reason: &'static str },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

/// Failures of a call to the remote analysis collaborator.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not read recording: {0}")]
    Recording(#[from] std::io::Error),

    #[error("analysis service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed analysis response: {0}")]
    Parse(String),

    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),
}
