//! File-service and time-service record codecs.
//!
//! # Wire Formats
//!
//! All integers are big-endian.
//!
//! ```text
//! ANNOUNCEMENT RECORD (discriminant 0x69)
//!
//!   Byte  0:      0x69
//!   Byte  1:      Carousel id
//!   Bytes 2-5:    File id (u32)
//!   Bytes 6-7:    Total block count N (u16, systematic + parity)
//!   Bytes 8-9:    Block size in bytes (u16)
//!   Bytes 10-13:  File length in bytes (u32)
//!   Byte  14:     Name length
//!   ...           Name (UTF-8)
//!   2 bytes       Signature length (u16)
//!   ...           Signature (opaque, not validated)
//!   2 bytes       Systematic block count K (u16)
//!   1 byte        LDPC column weight N1
//!   4 bytes       LDPC PRNG seed (u32)
//!
//! BLOCK RECORD (discriminant 0x18)
//!
//!   Byte  0:      0x18
//!   Byte  1:      Carousel id
//!   Bytes 2-5:    File id (u32)
//!   Bytes 6-7:    Block index (u16, 0-based over both ranges)
//!   Bytes 8..L-1: Block payload
//!   Byte  L-1:    CRC-8 over index || payload
//!
//! TIME PAYLOAD: a sequence of descriptors
//!
//!   [id:1][len:1][data:len] ...
//!
//!   0x01  server id, UTF-8
//!   0x02  wall clock, u32 seconds since the Unix epoch (len must be 4)
//! ```

use thiserror::Error;

use crate::crc::block_crc;

/// Discriminant of an announcement record.
pub const REC_ANNOUNCEMENT: u8 = 0x69;
/// Discriminant of a block record.
pub const REC_BLOCK: u8 = 0x18;

/// Server-identity time descriptor.
pub const DESC_SERVER_ID: u8 = 0x01;
/// Wall-clock time descriptor.
pub const DESC_WALL_CLOCK: u8 = 0x02;

const ANNOUNCEMENT_HEAD_LEN: usize = 15;
const ANNOUNCEMENT_TAIL_LEN: usize = 7;
const BLOCK_HEAD_LEN: usize = 8;
const MIN_BLOCK_LEN: usize = BLOCK_HEAD_LEN + 1;

/// Record parsing errors. All of them count as one malformed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Record shorter than its fixed layout.
    #[error("record too short (len {len}, min {min})")]
    TooShort {
        /// Received length.
        len: usize,
        /// Minimum acceptable length.
        min: usize,
    },

    /// First byte is not a known record discriminant.
    #[error("unknown record discriminant {got:#04x}")]
    UnknownDiscriminant {
        /// The unrecognised discriminant.
        got: u8,
    },

    /// Variable-length fields do not add up to the record length.
    #[error("record length mismatch (expected {expected}, got {got})")]
    LengthMismatch {
        /// Length implied by the length-prefixed fields.
        expected: usize,
        /// Received length.
        got: usize,
    },

    /// A field value violates the announcement constraints.
    #[error("invalid announcement field: {field}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A string field is not valid UTF-8.
    #[error("invalid utf-8 string")]
    InvalidUtf8,

    /// A descriptor's declared length overruns the payload.
    #[error("truncated descriptor (id {id:#04x})")]
    TruncatedDescriptor {
        /// Descriptor id that overran.
        id: u8,
    },
}

/// File descriptor broadcast before and during a file's transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementRecord {
    /// Carousel the file is broadcast on.
    pub carousel_id: u8,
    /// File transmission id within the carousel.
    pub file_id: u32,
    /// Total transmitted block count N (systematic + parity).
    pub total_blocks: u16,
    /// Block size in bytes.
    pub block_size: u16,
    /// File length in bytes.
    pub file_len: u32,
    /// Announced file name or path.
    pub name: String,
    /// Signature bytes; captured but never validated.
    pub signature: Vec<u8>,
    /// Systematic block count K.
    pub sys_blocks: u16,
    /// LDPC column weight (ones per systematic column).
    pub n1: u8,
    /// LDPC PRNG seed.
    pub seed: u32,
}

impl AnnouncementRecord {
    /// Number of parity blocks.
    #[must_use]
    pub const fn parity_blocks(&self) -> u16 {
        self.total_blocks - self.sys_blocks
    }

    /// Unpadded length of a systematic block at `index`; the terminal block
    /// may be shorter than the block size.
    #[must_use]
    pub fn systematic_len(&self, index: u16) -> usize {
        let start = u64::from(index) * u64::from(self.block_size);
        let remaining = u64::from(self.file_len).saturating_sub(start);
        remaining.min(u64::from(self.block_size)) as usize
    }

    fn decode(payload: &[u8]) -> Result<Self, RecordError> {
        let min = ANNOUNCEMENT_HEAD_LEN + 2 + ANNOUNCEMENT_TAIL_LEN;
        if payload.len() < min {
            return Err(RecordError::TooShort {
                len: payload.len(),
                min,
            });
        }

        let carousel_id = payload[1];
        let file_id = u32::from_be_bytes([payload[2], payload[3], payload[4], payload[5]]);
        let total_blocks = u16::from_be_bytes([payload[6], payload[7]]);
        let block_size = u16::from_be_bytes([payload[8], payload[9]]);
        let file_len = u32::from_be_bytes([payload[10], payload[11], payload[12], payload[13]]);
        let name_len = usize::from(payload[14]);

        let sig_len_at = ANNOUNCEMENT_HEAD_LEN + name_len;
        if payload.len() < sig_len_at + 2 {
            return Err(RecordError::LengthMismatch {
                expected: sig_len_at + 2 + ANNOUNCEMENT_TAIL_LEN,
                got: payload.len(),
            });
        }
        let sig_len = usize::from(u16::from_be_bytes([payload[sig_len_at], payload[sig_len_at + 1]]));
        let tail_at = sig_len_at + 2 + sig_len;
        if payload.len() != tail_at + ANNOUNCEMENT_TAIL_LEN {
            return Err(RecordError::LengthMismatch {
                expected: tail_at + ANNOUNCEMENT_TAIL_LEN,
                got: payload.len(),
            });
        }

        let name = std::str::from_utf8(&payload[ANNOUNCEMENT_HEAD_LEN..sig_len_at])
            .map_err(|_| RecordError::InvalidUtf8)?
            .to_owned();
        let signature = payload[sig_len_at + 2..tail_at].to_vec();

        let tail = &payload[tail_at..];
        let sys_blocks = u16::from_be_bytes([tail[0], tail[1]]);
        let n1 = tail[2];
        let seed = u32::from_be_bytes([tail[3], tail[4], tail[5], tail[6]]);

        let record = Self {
            carousel_id,
            file_id,
            total_blocks,
            block_size,
            file_len,
            name,
            signature,
            sys_blocks,
            n1,
            seed,
        };
        record.validate()?;
        Ok(record)
    }

    fn validate(&self) -> Result<(), RecordError> {
        if self.block_size == 0 {
            return Err(RecordError::InvalidField {
                field: "block_size",
            });
        }
        if self.file_len == 0 {
            return Err(RecordError::InvalidField { field: "file_len" });
        }
        if self.sys_blocks == 0 || self.sys_blocks > self.total_blocks {
            return Err(RecordError::InvalidField {
                field: "sys_blocks",
            });
        }
        let expected_k = u64::from(self.file_len).div_ceil(u64::from(self.block_size));
        if u64::from(self.sys_blocks) != expected_k {
            return Err(RecordError::InvalidField {
                field: "sys_blocks",
            });
        }
        // Parity-carrying codes must be able to place N1 ones per column
        // into N-K rows; the matrix construction does not terminate
        // otherwise.
        let parity = self.parity_blocks();
        if parity > 0 && (self.n1 == 0 || u16::from(self.n1) > parity) {
            return Err(RecordError::InvalidField { field: "n1" });
        }
        // Seeds congruent to 0 mod 2^31-1 collapse the code PRNG to a
        // fixed point.
        if parity > 0 && self.seed % 0x7FFF_FFFF == 0 {
            return Err(RecordError::InvalidField { field: "seed" });
        }
        Ok(())
    }

    /// Serialize, for capture tooling and tests.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            ANNOUNCEMENT_HEAD_LEN + self.name.len() + 2 + self.signature.len() + ANNOUNCEMENT_TAIL_LEN,
        );
        out.push(REC_ANNOUNCEMENT);
        out.push(self.carousel_id);
        out.extend_from_slice(&self.file_id.to_be_bytes());
        out.extend_from_slice(&self.total_blocks.to_be_bytes());
        out.extend_from_slice(&self.block_size.to_be_bytes());
        out.extend_from_slice(&self.file_len.to_be_bytes());
        out.push(self.name.len() as u8);
        out.extend_from_slice(self.name.as_bytes());
        out.extend_from_slice(&(self.signature.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.sys_blocks.to_be_bytes());
        out.push(self.n1);
        out.extend_from_slice(&self.seed.to_be_bytes());
        out
    }
}

/// One transmitted piece of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    /// Carousel the block belongs to.
    pub carousel_id: u8,
    /// File transmission id within the carousel.
    pub file_id: u32,
    /// 0-based block index over both the systematic and parity ranges.
    pub block_index: u16,
    /// Block payload.
    pub payload: Vec<u8>,
    /// Inner CRC-8 as received; verified by the tracker, not the parser.
    pub crc: u8,
}

impl BlockRecord {
    /// Whether the carried CRC matches the index and payload.
    #[must_use]
    pub fn crc_ok(&self) -> bool {
        block_crc(self.block_index, &self.payload) == self.crc
    }

    fn decode(payload: &[u8]) -> Result<Self, RecordError> {
        if payload.len() < MIN_BLOCK_LEN {
            return Err(RecordError::TooShort {
                len: payload.len(),
                min: MIN_BLOCK_LEN,
            });
        }
        let carousel_id = payload[1];
        let file_id = u32::from_be_bytes([payload[2], payload[3], payload[4], payload[5]]);
        let block_index = u16::from_be_bytes([payload[6], payload[7]]);
        let body = &payload[BLOCK_HEAD_LEN..payload.len() - 1];
        let crc = payload[payload.len() - 1];
        Ok(Self {
            carousel_id,
            file_id,
            block_index,
            payload: body.to_vec(),
            crc,
        })
    }

    /// Serialize with a freshly computed CRC, for capture tooling and tests.
    #[must_use]
    pub fn encode(carousel_id: u8, file_id: u32, block_index: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_BLOCK_LEN + payload.len());
        out.push(REC_BLOCK);
        out.push(carousel_id);
        out.extend_from_slice(&file_id.to_be_bytes());
        out.extend_from_slice(&block_index.to_be_bytes());
        out.extend_from_slice(payload);
        out.push(block_crc(block_index, payload));
        out
    }
}

/// A parsed file-service record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRecord {
    /// File descriptor.
    Announcement(AnnouncementRecord),
    /// File block.
    Block(BlockRecord),
}

impl FileRecord {
    /// Parse a file-service payload by its discriminant.
    ///
    /// # Errors
    /// Returns `RecordError` for unknown discriminants, short records, and
    /// field-constraint violations; callers drop such records and count
    /// them as malformed.
    pub fn decode(payload: &[u8]) -> Result<Self, RecordError> {
        match payload.first() {
            None => Err(RecordError::TooShort { len: 0, min: 1 }),
            Some(&REC_ANNOUNCEMENT) => AnnouncementRecord::decode(payload).map(Self::Announcement),
            Some(&REC_BLOCK) => BlockRecord::decode(payload).map(Self::Block),
            Some(&got) => Err(RecordError::UnknownDiscriminant { got }),
        }
    }
}

/// One decoded time-service descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeDescriptor {
    /// Broadcast server identity.
    ServerId(String),
    /// Seconds since the Unix epoch.
    WallClock(u32),
    /// Recognised framing, unknown semantics.
    Unknown {
        /// Descriptor id.
        id: u8,
        /// Raw descriptor data.
        data: Vec<u8>,
    },
}

/// Parse a time-service payload into its descriptor sequence.
///
/// # Errors
/// Returns `TruncatedDescriptor` when a declared length overruns the
/// payload; the whole record is then dropped as malformed.
pub fn decode_time_descriptors(payload: &[u8]) -> Result<Vec<TimeDescriptor>, RecordError> {
    let mut descriptors = Vec::new();
    let mut rest = payload;
    while !rest.is_empty() {
        if rest.len() < 2 {
            return Err(RecordError::TooShort {
                len: rest.len(),
                min: 2,
            });
        }
        let (id, len) = (rest[0], usize::from(rest[1]));
        if rest.len() < 2 + len {
            return Err(RecordError::TruncatedDescriptor { id });
        }
        let data = &rest[2..2 + len];
        rest = &rest[2 + len..];
        descriptors.push(match id {
            DESC_SERVER_ID => TimeDescriptor::ServerId(
                std::str::from_utf8(data)
                    .map_err(|_| RecordError::InvalidUtf8)?
                    .to_owned(),
            ),
            DESC_WALL_CLOCK if len == 4 => {
                TimeDescriptor::WallClock(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
            }
            _ => TimeDescriptor::Unknown {
                id,
                data: data.to_vec(),
            },
        });
    }
    Ok(descriptors)
}

/// Serialize a descriptor sequence, for capture tooling and tests.
#[must_use]
pub fn encode_time_descriptors(descriptors: &[TimeDescriptor]) -> Vec<u8> {
    let mut out = Vec::new();
    for descriptor in descriptors {
        match descriptor {
            TimeDescriptor::ServerId(id) => {
                out.push(DESC_SERVER_ID);
                out.push(id.len() as u8);
                out.extend_from_slice(id.as_bytes());
            }
            TimeDescriptor::WallClock(seconds) => {
                out.push(DESC_WALL_CLOCK);
                out.push(4);
                out.extend_from_slice(&seconds.to_be_bytes());
            }
            TimeDescriptor::Unknown { id, data } => {
                out.push(*id);
                out.push(data.len() as u8);
                out.extend_from_slice(data);
            }
        }
    }
    out
}
