//! Entry aggregator — hydrates every stored entry into one snapshot,
//! newest first.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::ids::EntryId;
use crate::repository::EntryRepository;
use crate::types::{EntryField, EntryRecord, RECORDING_FILENAME};

pub struct EntryAggregator {
    repo: Arc<dyn EntryRepository>,
}

impl EntryAggregator {
    pub fn new(repo: Arc<dyn EntryRepository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<dyn EntryRepository> {
        &self.repo
    }

    /// List and hydrate all entries, strictly descending by numeric id.
    ///
    /// Reads fan out across entries and fields with no throttling. The result
    /// is not atomic against concurrent writers: an entry saved mid-listing
    /// may or may not appear, and may appear with only some fields.
    pub async fn list_entries(&self) -> Vec<EntryRecord> {
        let ids = sorted_ids(self.repo.list_entry_ids().await);
        let records = join_all(ids.into_iter().map(|id| self.hydrate(id))).await;
        debug!("Aggregated {} entries", records.len());
        records
    }

    /// Hydrate a single entry, or `None` when it does not exist.
    pub async fn load_entry(&self, id: EntryId) -> Option<EntryRecord> {
        if !self.repo.entry_exists(id).await {
            return None;
        }
        Some(self.hydrate(id).await)
    }

    async fn hydrate(&self, id: EntryId) -> EntryRecord {
        let values = join_all(
            EntryField::ALL
                .iter()
                .map(|field| self.repo.read_field(id, *field)),
        )
        .await;

        let mut record = EntryRecord::empty(id, self.repo.binary_path(id, RECORDING_FILENAME));
        for (field, value) in EntryField::ALL.iter().zip(values) {
            record.set_field(*field, value);
        }
        record
    }
}

/// Parse raw entry names and sort them newest first. Names that are not
/// canonical integers are skipped.
fn sorted_ids(names: Vec<String>) -> Vec<EntryId> {
    let mut ids: Vec<EntryId> = names
        .iter()
        .filter_map(|name| match name.parse::<EntryId>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Skipping storage directory: {}", e);
                None
            }
        })
        .collect();
    ids.sort_by(|a, b| b.cmp(a));
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::FsEntryRepository;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<FsEntryRepository>, EntryAggregator) {
        let tmp = TempDir::new().unwrap();
        let repo = Arc::new(FsEntryRepository::new(tmp.path().join("entries")));
        let aggregator = EntryAggregator::new(repo.clone());
        (tmp, repo, aggregator)
    }

    #[test]
    fn test_sorted_ids_numeric_descending() {
        let names = vec!["1000".into(), "2000".into(), "999".into(), "10000".into()];
        let ids: Vec<u64> = sorted_ids(names).into_iter().map(|id| id.value()).collect();
        assert_eq!(ids, vec![10000, 2000, 1000, 999]);
    }

    #[test]
    fn test_sorted_ids_skips_garbage() {
        let names = vec!["1000".into(), ".DS_Store".into(), "draft".into(), "0042".into()];
        let ids: Vec<u64> = sorted_ids(names).into_iter().map(|id| id.value()).collect();
        assert_eq!(ids, vec![1000]);
    }

    #[tokio::test]
    async fn test_list_entries_orders_newest_first() {
        let (_tmp, repo, aggregator) = setup();
        for raw in [1000u64, 2000] {
            let id = EntryId::new(raw);
            repo.create_entry(id).await;
            repo.write_field(id, EntryField::Title, &format!("entry {}", raw)).await;
        }

        let entries = aggregator.list_entries().await;
        let ids: Vec<String> = entries.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["2000", "1000"]);
        assert_eq!(entries[0].title.as_deref(), Some("entry 2000"));
    }

    #[tokio::test]
    async fn test_partial_entry_has_null_fields() {
        let (_tmp, repo, aggregator) = setup();
        let id = EntryId::new(1234);
        repo.create_entry(id).await;
        repo.write_field(id, EntryField::Description, "only this").await;

        let entries = aggregator.list_entries().await;
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.description.as_deref(), Some("only this"));
        assert_eq!(entry.title, None);
        assert_eq!(entry.transcript, None);
        assert_eq!(entry.sentiment, None);
        assert_eq!(entry.recording, repo.root().join("1234").join("recording.m4a"));
    }

    #[tokio::test]
    async fn test_unreadable_fields_degrade_to_none() {
        let (_tmp, repo, aggregator) = setup();
        let id = EntryId::new(4321);
        repo.create_entry(id).await;
        repo.write_field(id, EntryField::Description, "ok").await;

        let dir = repo.root().join("4321");
        // not UTF-8, so read_to_string fails with InvalidData
        tokio::fs::write(dir.join("title.txt"), [0xff, 0xfe, 0xfd]).await.unwrap();
        // a directory where a field file belongs
        tokio::fs::create_dir(dir.join("summary.txt")).await.unwrap();

        let entries = aggregator.list_entries().await;
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.id, id);
        assert_eq!(entry.title, None);
        assert_eq!(entry.summary, None);
        assert_eq!(entry.description.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_non_numeric_directories_do_not_break_listing() {
        let (_tmp, repo, aggregator) = setup();
        repo.create_entry(EntryId::new(5)).await;
        tokio::fs::create_dir_all(repo.root().join("scratch")).await.unwrap();

        let entries = aggregator.list_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, EntryId::new(5));
    }

    #[tokio::test]
    async fn test_load_entry() {
        let (_tmp, repo, aggregator) = setup();
        let id = EntryId::new(9);
        assert!(aggregator.load_entry(id).await.is_none());

        repo.create_entry(id).await;
        repo.write_field(id, EntryField::Quote, "a quote").await;
        let entry = aggregator.load_entry(id).await.unwrap();
        assert_eq!(entry.quote.as_deref(), Some("a quote"));
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (_tmp, _repo, aggregator) = setup();
        assert!(aggregator.list_entries().await.is_empty());
    }
}
