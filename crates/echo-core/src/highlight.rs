//! One-shot "highlight" read: asks the collaborator to pick the most
//! uplifting entry from the current summaries and quotes.

use tracing::info;

use crate::analysis::AnalysisClient;
use crate::error::AnalysisError;
use crate::types::{EntryRecord, Highlight};

/// Summaries and quotes are sent as parallel lists in snapshot order, nulls
/// included, so the collaborator's pick indexes both consistently.
pub async fn fetch_highlight(
    client: &dyn AnalysisClient,
    entries: &[EntryRecord],
) -> Result<Highlight, AnalysisError> {
    if entries.is_empty() {
        return Ok(Highlight::default());
    }
    let summaries: Vec<Option<String>> = entries.iter().map(|e| e.summary.clone()).collect();
    let quotes: Vec<Option<String>> = entries.iter().map(|e| e.quote.clone()).collect();

    info!("Requesting highlight over {} entries", entries.len());
    client.highlight(&summaries, &quotes).await
}
