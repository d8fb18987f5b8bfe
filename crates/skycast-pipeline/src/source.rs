//! Frame sources: live UDP and KISS capture replay.
//!
//! Both variants share one contract: an unending sequence of raw frame
//! payloads, ending in `SourceError::Closed` when the transport drains
//! (replay) or `SourceError::Io` on unrecoverable failure.

use std::collections::VecDeque;
use std::io::Read;
use std::net::{ToSocketAddrs, UdpSocket};

use skycast_core::Counters;
use skycast_wire::{Deframer, DeframerStats};

use crate::error::SourceError;

/// Receive buffer size; comfortably above the broadcast MTU.
const RECV_BUF_LEN: usize = 4096;

/// A source of raw link frames.
pub trait FrameSource {
    /// Block until the next frame is available.
    ///
    /// # Errors
    /// `Closed` when the transport ends, `Io` on unrecoverable failure.
    fn next_frame(&mut self) -> Result<Vec<u8>, SourceError>;
}

/// Live source: each UDP datagram is exactly one link frame.
#[derive(Debug)]
pub struct UdpFrameSource {
    socket: UdpSocket,
    buf: [u8; RECV_BUF_LEN],
}

impl UdpFrameSource {
    /// Bind the listening endpoint.
    ///
    /// # Errors
    /// Returns the bind failure as-is.
    pub fn bind(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        Ok(Self {
            socket,
            buf: [0; RECV_BUF_LEN],
        })
    }

    /// The bound local address.
    ///
    /// # Errors
    /// Propagates the socket query failure.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }
}

impl FrameSource for UdpFrameSource {
    fn next_frame(&mut self) -> Result<Vec<u8>, SourceError> {
        let (len, _peer) = self.socket.recv_from(&mut self.buf)?;
        Ok(self.buf[..len].to_vec())
    }
}

/// Replay source: KISS-deframes a recorded byte stream.
pub struct CaptureFrameSource<R> {
    reader: R,
    deframer: Deframer,
    pending: VecDeque<Vec<u8>>,
    counters: Counters,
    reported: DeframerStats,
}

impl<R: Read> CaptureFrameSource<R> {
    /// Wrap a capture reader. Deframing drops (bad escapes, empty frames)
    /// are forwarded into the shared counters.
    pub fn new(reader: R, counters: Counters) -> Self {
        Self {
            reader,
            deframer: Deframer::new(),
            pending: VecDeque::new(),
            counters,
            reported: DeframerStats::default(),
        }
    }

    fn forward_stats(&mut self) {
        let stats = self.deframer.stats();
        for _ in self.reported.bad_escapes..stats.bad_escapes {
            self.counters.bad_escapes();
        }
        for _ in self.reported.empty_frames..stats.empty_frames {
            self.counters.empty_frames();
        }
        self.reported = stats;
    }
}

impl<R: Read> FrameSource for CaptureFrameSource<R> {
    fn next_frame(&mut self) -> Result<Vec<u8>, SourceError> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }
            let mut chunk = [0u8; RECV_BUF_LEN];
            let len = self.reader.read(&mut chunk)?;
            if len == 0 {
                return Err(SourceError::Closed);
            }
            self.pending.extend(self.deframer.push(&chunk[..len]));
            self.forward_stats();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use skycast_wire::frame;

    use super::*;

    #[test]
    fn capture_replays_frames_in_order() {
        let mut stream = Vec::new();
        stream.extend(frame(&[1, 2, 3]));
        stream.extend(frame(&[4, 5]));
        let mut source = CaptureFrameSource::new(Cursor::new(stream), Counters::default());

        assert_eq!(source.next_frame().unwrap(), vec![1, 2, 3]);
        assert_eq!(source.next_frame().unwrap(), vec![4, 5]);
        assert!(matches!(source.next_frame(), Err(SourceError::Closed)));
    }

    #[test]
    fn capture_eof_is_closed_not_io() {
        let mut source = CaptureFrameSource::new(Cursor::new(Vec::new()), Counters::default());
        assert!(matches!(source.next_frame(), Err(SourceError::Closed)));
    }

    #[test]
    fn capture_forwards_framing_drops() {
        let counters = Counters::default();
        // A bad escape pair inside a frame, then a good frame.
        let stream = vec![0xC0, 0x01, 0xDB, 0x00, 0xC0, 0x07, 0xC0];
        let mut source = CaptureFrameSource::new(Cursor::new(stream), counters.clone());

        assert_eq!(source.next_frame().unwrap(), vec![0x07]);
        assert!(matches!(source.next_frame(), Err(SourceError::Closed)));
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.bad_escapes, 1);
        assert_eq!(snapshot.empty_frames, 1);
    }

    #[test]
    fn udp_source_yields_datagrams() {
        let mut source = UdpFrameSource::bind("127.0.0.1:0").unwrap();
        let addr = source.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        sender.send_to(&[0xAA, 0xBB, 0xCC], addr).unwrap();
        assert_eq!(source.next_frame().unwrap(), vec![0xAA, 0xBB, 0xCC]);
    }
}
