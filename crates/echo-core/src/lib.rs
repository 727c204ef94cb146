//! echo-core — the journal store and its analysis pipeline, no UI.
//!
//! Entries live on disk as one directory per entry, one file per field.
//! `AnalysisPipeline` commits new entries locally, then enriches them with
//! results from a remote analysis collaborator in the background. Frontends
//! read the `StateCache` snapshot and subscribe to `JournalEvent`s via
//! tokio::broadcast.

pub mod aggregator;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod highlight;
pub mod ids;
pub mod ingest;
pub mod jobs;
pub mod pipeline;
pub mod prompts;
pub mod repository;
pub mod types;
