//! The pull-loop pipeline: frame in, events out.

use skycast_core::{Counters, ReceiverConfig};
use skycast_wire::{FrameError, LinkFrame, SERVICE_FILE, SERVICE_SIGNALING, SERVICE_TIME};

use crate::emitter::FileSink;
use crate::error::SourceError;
use crate::file::FileService;
use crate::router::ServiceRouter;
use crate::signaling::SignalingService;
use crate::source::FrameSource;
use crate::time::TimeService;

/// The assembled receiver: link-frame validation in front of the service
/// router, with the time and file services registered.
pub struct Receiver {
    router: ServiceRouter,
    counters: Counters,
}

impl Receiver {
    /// Build a receiver delivering completed files into `sink`.
    pub fn new(config: ReceiverConfig, sink: impl FileSink + 'static) -> Self {
        let counters = Counters::default();
        let mut router = ServiceRouter::new(counters.clone());
        router.register(SERVICE_TIME, Box::new(TimeService::new(counters.clone())));
        router.register(
            SERVICE_FILE,
            Box::new(FileService::new(config, sink, counters.clone())),
        );
        for service_id in SERVICE_SIGNALING {
            router.register(service_id, Box::new(SignalingService::new()));
        }
        Self { router, counters }
    }

    /// The shared pipeline counters.
    #[must_use]
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Consume one raw frame to completion.
    pub fn process_frame(&mut self, frame: &[u8]) {
        match LinkFrame::decode(frame) {
            Ok(link) => self.router.route(link.service_id, link.payload),
            Err(err @ FrameError::ShortFrame { .. }) => {
                self.counters.short_frames();
                tracing::debug!(error = %err, "dropping frame");
            }
            Err(err @ FrameError::BadCrc { .. }) => {
                self.counters.bad_frame_crc();
                tracing::debug!(error = %err, "dropping frame");
            }
        }
    }

    /// Drain the source until it closes.
    ///
    /// Frames are drawn and processed one at a time; the transport read is
    /// the only blocking point.
    ///
    /// # Errors
    /// Only `SourceError::Io` escapes; a closed source is a clean exit.
    pub fn run(&mut self, source: &mut dyn FrameSource) -> Result<(), SourceError> {
        loop {
            match source.next_frame() {
                Ok(frame) => self.process_frame(&frame),
                Err(SourceError::Closed) => {
                    let snapshot = self.counters.snapshot();
                    tracing::info!(?snapshot, "frame source closed");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use skycast_wire::encode_frame;

    use crate::emitter::MemorySink;

    use super::*;

    #[test]
    fn short_and_corrupt_frames_are_counted() {
        let mut receiver = Receiver::new(ReceiverConfig::default(), MemorySink::new());

        receiver.process_frame(&[0x18]);
        let mut bad = encode_frame(SERVICE_FILE, b"xyz");
        bad[1] ^= 0x01;
        receiver.process_frame(&bad);

        let snapshot = receiver.counters().snapshot();
        assert_eq!(snapshot.short_frames, 1);
        assert_eq!(snapshot.bad_frame_crc, 1);
    }

    #[test]
    fn unknown_service_routed_not_fatal() {
        let mut receiver = Receiver::new(ReceiverConfig::default(), MemorySink::new());
        receiver.process_frame(&encode_frame(0x21, &[0xAA; 8]));
        receiver.process_frame(&encode_frame(0x99, &[]));
        assert_eq!(receiver.counters().snapshot().unknown_services, 2);
    }

    #[test]
    fn signaling_services_have_a_registered_stub() {
        let mut receiver = Receiver::new(ReceiverConfig::default(), MemorySink::new());
        for service_id in SERVICE_SIGNALING {
            receiver.process_frame(&encode_frame(service_id, &[0xC3; 16]));
        }
        assert_eq!(receiver.counters().snapshot().unknown_services, 0);
    }
}
