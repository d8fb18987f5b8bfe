//! Service demultiplexer.

use std::collections::HashMap;

use skycast_core::Counters;

/// Handler for one service id's payloads.
pub trait ServiceHandler {
    /// Process one service payload to completion.
    fn handle(&mut self, payload: &[u8]);
}

/// Routes link-frame payloads to the handler registered for their service
/// id. Dispatch is synchronous and in frame-arrival order. Unknown ids are
/// never fatal: they are counted and their payload dumped at debug level.
pub struct ServiceRouter {
    handlers: HashMap<u8, Box<dyn ServiceHandler>>,
    counters: Counters,
}

impl ServiceRouter {
    /// Create an empty router.
    #[must_use]
    pub fn new(counters: Counters) -> Self {
        Self {
            handlers: HashMap::new(),
            counters,
        }
    }

    /// Register the handler for a service id, replacing any previous one.
    pub fn register(&mut self, service_id: u8, handler: Box<dyn ServiceHandler>) {
        self.handlers.insert(service_id, handler);
    }

    /// Dispatch one payload.
    pub fn route(&mut self, service_id: u8, payload: &[u8]) {
        if let Some(handler) = self.handlers.get_mut(&service_id) {
            handler.handle(payload);
        } else {
            self.counters.unknown_services();
            tracing::debug!(
                service_id = format!("{service_id:#04x}"),
                len = payload.len(),
                dump = hex::encode(payload),
                "unknown service"
            );
        }
    }
}
