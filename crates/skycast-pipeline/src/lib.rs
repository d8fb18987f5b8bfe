//! The skycast reassembly pipeline.
//!
//! A single-threaded, cooperative pull loop: one frame is drawn from a
//! [`FrameSource`], validated, routed by service id, and processed to
//! completion before the next frame is drawn. The only blocking point is
//! the transport read at the head of the pipeline, and the only error that
//! escapes is a transport failure; everything else is counted and dropped
//! at the layer that can classify it.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod emitter;
mod error;
mod file;
mod pipeline;
mod router;
mod signaling;
mod source;
mod time;
mod tracker;

pub use emitter::*;
pub use error::*;
pub use file::*;
pub use pipeline::*;
pub use router::*;
pub use signaling::*;
pub use source::*;
pub use time::*;
pub use tracker::*;
