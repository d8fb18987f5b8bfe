//! File service: announcements, blocks, and delivery of completed files.

use std::time::Instant;

use skycast_core::{CompletedFile, Counters, ReceiverConfig};
use skycast_wire::FileRecord;

use crate::emitter::FileSink;
use crate::router::ServiceHandler;
use crate::tracker::FileTracker;

/// Handler for the file service: parses records, drives the tracker, and
/// delivers completed files to the sink.
pub struct FileService<S> {
    tracker: FileTracker,
    sink: S,
    counters: Counters,
}

impl<S: FileSink> FileService<S> {
    /// Create a file service delivering into `sink`.
    pub fn new(config: ReceiverConfig, sink: S, counters: Counters) -> Self {
        Self {
            tracker: FileTracker::new(config, counters.clone()),
            sink,
            counters,
        }
    }

    /// The underlying tracker, for inspection.
    #[must_use]
    pub fn tracker(&self) -> &FileTracker {
        &self.tracker
    }

    fn deliver(&mut self, file: &CompletedFile) {
        match self.sink.deliver(file) {
            Ok(path) => {
                self.counters.files_completed();
                tracing::info!(
                    key = %file.key,
                    name = %file.name,
                    bytes = file.bytes.len(),
                    path = %path.display(),
                    "file reconstructed"
                );
            }
            Err(err) => {
                self.counters.output_errors();
                tracing::error!(key = %file.key, name = %file.name, error = %err, "delivery failed");
            }
        }
    }
}

impl<S: FileSink> ServiceHandler for FileService<S> {
    fn handle(&mut self, payload: &[u8]) {
        self.tracker.prune(Instant::now());
        let completed = match FileRecord::decode(payload) {
            Ok(FileRecord::Announcement(announcement)) => {
                self.tracker.on_announcement(announcement)
            }
            Ok(FileRecord::Block(block)) => self.tracker.on_block(block),
            Err(err) => {
                self.counters.malformed_records();
                tracing::debug!(error = %err, "malformed file record");
                None
            }
        };
        if let Some(file) = completed {
            self.deliver(&file);
        }
    }
}
