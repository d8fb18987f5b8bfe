//! Core types for the skycast broadcast receiver.
//!
//! This crate provides the identifiers, events, counters, and configuration
//! shared by the wire, FEC, and pipeline crates.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod counters;
mod event;
mod ids;

pub use config::*;
pub use counters::*;
pub use event::*;
pub use ids::*;

// Re-export commonly used external types
pub use chrono::{DateTime, Utc};
