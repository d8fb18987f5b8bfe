//! Wire formats of the skycast broadcast.
//!
//! Bit-exact codecs for the link-layer framing and the service payloads
//! carried inside it: KISS byte-stuffing for recorded captures, the
//! CRC-protected link frame, file-service announcement and block records,
//! and the time-service descriptor stream.
//!
//! Everything here is pure: decoding never allocates global state and
//! round-trips with the matching encoder.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod crc;
mod frame;
mod kiss;
mod records;

pub use crc::*;
pub use frame::*;
pub use kiss::*;
pub use records::*;
