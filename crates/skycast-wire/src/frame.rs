//! Link-frame envelope parsing and serialization.
//!
//! # Wire Format
//!
//! ```text
//! LINK FRAME
//!
//!   Byte  0:      Service id
//!   Bytes 1..N-2: Service payload
//!   Bytes N-2..N: CRC-16/CCITT-FALSE (big-endian) over bytes 0..N-2
//!
//!   Minimum frame: 3 bytes (service id + empty payload + CRC)
//! ```
//!
//! Decoding is pure and idempotent; a frame that decodes once decodes the
//! same way forever.

use thiserror::Error;

use crate::crc::link_crc;

/// Time service: wall-clock beacons and server identity.
pub const SERVICE_TIME: u8 = 0x81;
/// File service: announcements and file blocks.
pub const SERVICE_FILE: u8 = 0x18;
/// Signaling services observed in captures; routed to a stub handler,
/// never decoded.
pub const SERVICE_SIGNALING: [u8; 2] = [0x42, 0x5A];

/// Minimum length of a link frame.
pub const MIN_FRAME_LEN: usize = 3;

/// Link-frame validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Frame shorter than the fixed envelope.
    #[error("frame too short (len {len}, min {min})")]
    ShortFrame {
        /// Received length.
        len: usize,
        /// Minimum acceptable length.
        min: usize,
    },

    /// Trailing CRC-16 does not match the tagged payload.
    #[error("bad frame crc (expected {expected:#06x}, got {got:#06x})")]
    BadCrc {
        /// CRC computed over the frame contents.
        expected: u16,
        /// CRC carried by the frame.
        got: u16,
    },
}

/// A validated link frame borrowing the raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkFrame<'a> {
    /// Service the payload is addressed to.
    pub service_id: u8,
    /// Service payload with envelope stripped.
    pub payload: &'a [u8],
}

impl<'a> LinkFrame<'a> {
    /// Validate a raw frame and strip its envelope.
    ///
    /// # Errors
    /// Returns `ShortFrame` for frames below [`MIN_FRAME_LEN`] and `BadCrc`
    /// when the trailing checksum does not match.
    pub fn decode(bytes: &'a [u8]) -> Result<Self, FrameError> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(FrameError::ShortFrame {
                len: bytes.len(),
                min: MIN_FRAME_LEN,
            });
        }
        let (tagged, crc_bytes) = bytes.split_at(bytes.len() - 2);
        let got = u16::from_be_bytes([crc_bytes[0], crc_bytes[1]]);
        let expected = link_crc(tagged);
        if got != expected {
            return Err(FrameError::BadCrc { expected, got });
        }
        Ok(Self {
            service_id: tagged[0],
            payload: &tagged[1..],
        })
    }
}

/// Serialize a service payload into a link frame.
#[must_use]
pub fn encode_frame(service_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + MIN_FRAME_LEN);
    out.push(service_id);
    out.extend_from_slice(payload);
    let crc = link_crc(&out);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let bytes = encode_frame(SERVICE_FILE, b"hello");
        let frame = LinkFrame::decode(&bytes).unwrap();
        assert_eq!(frame.service_id, SERVICE_FILE);
        assert_eq!(frame.payload, b"hello");
    }

    #[test]
    fn empty_payload_is_valid() {
        let bytes = encode_frame(SERVICE_TIME, &[]);
        assert_eq!(bytes.len(), MIN_FRAME_LEN);
        let frame = LinkFrame::decode(&bytes).unwrap();
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn golden_time_frame() {
        // Precomputed: CRC-16 of 81 02 00 00 00 10 is 0xC922.
        let bytes = [0x81, 0x02, 0x00, 0x00, 0x00, 0x10, 0xC9, 0x22];
        let frame = LinkFrame::decode(&bytes).unwrap();
        assert_eq!(frame.service_id, SERVICE_TIME);
        assert_eq!(frame.payload, &bytes[1..6]);
    }

    #[test]
    fn short_frame_rejected() {
        assert_eq!(
            LinkFrame::decode(&[0x18, 0x00]),
            Err(FrameError::ShortFrame { len: 2, min: 3 })
        );
    }

    #[test]
    fn corrupt_crc_rejected() {
        let mut bytes = encode_frame(SERVICE_FILE, b"payload");
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(matches!(
            LinkFrame::decode(&bytes),
            Err(FrameError::BadCrc { .. })
        ));
    }

    #[test]
    fn corrupt_payload_rejected() {
        let mut bytes = encode_frame(SERVICE_FILE, b"payload");
        bytes[3] ^= 0x40;
        assert!(matches!(
            LinkFrame::decode(&bytes),
            Err(FrameError::BadCrc { .. })
        ));
    }

    #[test]
    fn decode_is_idempotent() {
        let bytes = encode_frame(0x42, &[1, 2, 3]);
        let first = LinkFrame::decode(&bytes).unwrap();
        let second = LinkFrame::decode(&bytes).unwrap();
        assert_eq!(first, second);
    }
}
