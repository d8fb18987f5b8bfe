//! Decoded service events.

use chrono::{DateTime, Utc};

use crate::AssemblyKey;

/// A wall-clock instant decoded from the broadcast time service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEvent {
    /// Broadcast time at one-second resolution.
    pub instant: DateTime<Utc>,
}

/// Identity string announced by the broadcast time server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdEvent {
    /// Server identity, free-form UTF-8.
    pub id: String,
}

/// A fully reconstructed file ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFile {
    /// Reassembly key the file was tracked under.
    pub key: AssemblyKey,
    /// Announced file name, not yet sanitised.
    pub name: String,
    /// File contents, truncated to the announced length.
    pub bytes: Vec<u8>,
}
