//! Time service: wall-clock beacons and server identity.

use chrono::DateTime;
use skycast_core::{Counters, ServerIdEvent, TimeEvent};
use skycast_wire::{decode_time_descriptors, TimeDescriptor};

use crate::router::ServiceHandler;

/// Observer of decoded time-service events.
pub trait TimeObserver {
    /// A wall-clock beacon was decoded.
    fn on_time(&mut self, _event: &TimeEvent) {}

    /// A server-identity descriptor was decoded.
    fn on_server_id(&mut self, _event: &ServerIdEvent) {}
}

/// Handler for the time service. Never touches file state.
pub struct TimeService {
    observers: Vec<Box<dyn TimeObserver>>,
    counters: Counters,
}

impl TimeService {
    /// Create a time service with no observers.
    #[must_use]
    pub fn new(counters: Counters) -> Self {
        Self {
            observers: Vec::new(),
            counters,
        }
    }

    /// Register an observer for decoded events.
    pub fn register(&mut self, observer: Box<dyn TimeObserver>) {
        self.observers.push(observer);
    }
}

impl ServiceHandler for TimeService {
    fn handle(&mut self, payload: &[u8]) {
        let descriptors = match decode_time_descriptors(payload) {
            Ok(descriptors) => descriptors,
            Err(err) => {
                self.counters.malformed_records();
                tracing::debug!(error = %err, "malformed time payload");
                return;
            }
        };
        for descriptor in descriptors {
            match descriptor {
                TimeDescriptor::WallClock(seconds) => {
                    let Some(instant) = DateTime::from_timestamp(i64::from(seconds), 0) else {
                        continue;
                    };
                    tracing::info!(time = %instant, "server time");
                    let event = TimeEvent { instant };
                    for observer in &mut self.observers {
                        observer.on_time(&event);
                    }
                }
                TimeDescriptor::ServerId(id) => {
                    tracing::info!(server = %id, "time server id");
                    let event = ServerIdEvent { id };
                    for observer in &mut self.observers {
                        observer.on_server_id(&event);
                    }
                }
                TimeDescriptor::Unknown { id, data } => {
                    self.counters.unknown_descriptors();
                    tracing::debug!(
                        id = format!("{id:#04x}"),
                        dump = hex::encode(&data),
                        "unknown time descriptor"
                    );
                }
            }
        }
    }
}
