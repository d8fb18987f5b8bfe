//! Pipeline error types.

use thiserror::Error;

/// Frame source errors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The underlying transport ended; the pipeline drains and exits
    /// cleanly.
    #[error("frame source closed")]
    Closed,

    /// Unrecoverable transport failure; the only error that escapes the
    /// pipeline.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

/// File delivery errors. Logged and counted; the pipeline continues.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Nothing left of the announced name after removing unsafe path
    /// components.
    #[error("announced file name {name:?} has no safe path components")]
    UnsafeName {
        /// The announced name.
        name: String,
    },

    /// Filesystem failure while writing the completed file.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(SourceError::Closed.to_string(), "frame source closed");
        let err = OutputError::UnsafeName {
            name: "../..".to_owned(),
        };
        assert!(err.to_string().contains("../.."));
    }
}
