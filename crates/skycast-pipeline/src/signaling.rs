//! Signaling service stub.
//!
//! Two observed service ids carry signaling records whose semantics are
//! not decoded. Registering them keeps the traffic out of the
//! unknown-service counter; the payload is dumped at debug level and
//! dropped without any state change.

use crate::router::ServiceHandler;

/// No-op handler for the observed signaling services.
#[derive(Debug, Default)]
pub struct SignalingService;

impl SignalingService {
    /// Create the stub handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ServiceHandler for SignalingService {
    fn handle(&mut self, payload: &[u8]) {
        tracing::info!(len = payload.len(), "signaling record received (not decoded)");
        tracing::debug!(dump = hex::encode(payload), "signaling payload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_any_payload() {
        let mut service = SignalingService::new();
        service.handle(&[]);
        service.handle(&[0xAA; 64]);
    }
}
