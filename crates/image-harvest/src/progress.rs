//! Progress event types and broadcast channel for acquisition and batch runs.
//!
//! The controller and the batch runner emit `ProgressEvent`s through a
//! `tokio::sync::broadcast` channel. Sending never blocks, so rayon workers
//! can emit directly. When no subscriber exists, events are dropped.

use serde::{Deserialize, Serialize};

/// A progress event emitted during acquisition or batch processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    /// An adapter was invoked with this quota.
    SourceStarted { source: String, quota: usize },
    /// Discovery finished for one adapter.
    UrlsDiscovered { source: String, count: usize },
    /// One image was written to the acquisition folder.
    ImageSaved { source: String, index: usize },
    /// One download failed and was skipped.
    DownloadFailed { source: String, url: String },
    /// An adapter returned.
    SourceFinished { source: String, saved: usize },
    /// Batch processing started for this many eligible files.
    BatchStarted { total: usize },
    /// One image went through the whole chain.
    ImageProcessed { file: String, artifacts: usize },
    /// One file was skipped or failed.
    ImageSkipped { file: String, reason: String },
    /// Batch processing finished.
    BatchComplete {
        processed: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress channel with a bounded buffer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(1024)
}

/// Emit an event, ignoring send errors (no receivers listening).
pub fn emit(tx: &Option<ProgressSender>, event: ProgressEvent) {
    if let Some(ref sender) = tx {
        let _ = sender.send(event);
    }
}
