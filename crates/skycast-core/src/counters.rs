//! Drop and progress counters.
//!
//! Every per-frame, per-record, and per-block drop class in the error
//! taxonomy is counted here so that loss is observable from the logs
//! without stopping the pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

macro_rules! counters {
    ($($(#[$doc:meta])* $name:ident),+ $(,)?) => {
        /// Shared pipeline counters. Cheap to clone; all clones observe the
        /// same values.
        #[derive(Debug, Default, Clone)]
        pub struct Counters {
            inner: Arc<CounterCells>,
        }

        #[derive(Debug, Default)]
        struct CounterCells {
            $($name: AtomicU64,)+
        }

        /// Point-in-time copy of all counters.
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub struct CountersSnapshot {
            $($(#[$doc])* pub $name: u64,)+
        }

        impl Counters {
            $(
                $(#[$doc])*
                pub fn $name(&self) {
                    self.inner.$name.fetch_add(1, Ordering::Relaxed);
                }
            )+

            /// Copy out the current values.
            #[must_use]
            pub fn snapshot(&self) -> CountersSnapshot {
                CountersSnapshot {
                    $($name: self.inner.$name.load(Ordering::Relaxed),)+
                }
            }
        }
    };
}

counters! {
    /// Frame below the minimum link-frame length.
    short_frames,
    /// Frame with a bad trailing CRC-16.
    bad_frame_crc,
    /// Undefined KISS escape pair; the frame in progress is dropped.
    bad_escapes,
    /// Empty KISS frame (delimiter immediately after delimiter).
    empty_frames,
    /// File-service or time-service record that failed to parse.
    malformed_records,
    /// Block with a bad inner CRC-8.
    bad_block_crc,
    /// Block already stored with an identical payload.
    duplicate_blocks,
    /// Block index seen twice with different payloads; last write wins.
    conflicting_blocks,
    /// Block buffered while waiting for its announcement.
    orphans_buffered,
    /// Orphan dropped (buffer overflow or eviction).
    orphans_dropped,
    /// Orphan admitted into an assembly after its announcement arrived.
    orphans_admitted,
    /// Payload routed to a service id with no handler.
    unknown_services,
    /// Unrecognised time-service descriptor.
    unknown_descriptors,
    /// Assembly evicted because the tracker was full.
    assemblies_evicted,
    /// Assembly discarded by the age-out policy.
    assemblies_expired,
    /// File reconstructed and delivered.
    files_completed,
    /// Completion that needed the LDPC decoder (not the fast path).
    fec_recoveries,
    /// Completed file that could not be written to the sink.
    output_errors,
}
