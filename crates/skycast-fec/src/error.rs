//! FEC error types.

use thiserror::Error;

/// LDPC code and decode errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FecError {
    /// The announced parameters do not describe a constructible code.
    #[error("invalid code parameters: {reason}")]
    InvalidCode {
        /// Which constraint was violated.
        reason: &'static str,
    },

    /// A supplied block does not match the code's symbol size.
    #[error("block {index} has length {got}, expected {expected}")]
    BlockLength {
        /// Coded block index.
        index: u16,
        /// Expected symbol length.
        expected: usize,
        /// Received length.
        got: usize,
    },

    /// The received equations do not determine all missing blocks.
    ///
    /// Not fatal: the assembly stays open and more blocks may arrive.
    #[error("insufficient blocks: {missing} systematic blocks undetermined")]
    Insufficient {
        /// Systematic blocks still unknown when peeling stalled.
        missing: usize,
    },
}
