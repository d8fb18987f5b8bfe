//! Receiver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tracker resource bounds and policies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Maximum number of concurrent file assemblies. The least-recently
    /// touched assembly is evicted on overflow.
    ///
    /// Default: 64
    pub max_assemblies: usize,

    /// Capacity of the orphan-block buffer (blocks received before their
    /// announcement). FIFO, drop-oldest on overflow.
    ///
    /// Default: 256
    pub orphan_capacity: usize,

    /// Discard assemblies with no block activity for this long. `None`
    /// keeps assemblies forever, which suits long carousels.
    ///
    /// Default: None
    #[serde(default, with = "opt_duration_secs")]
    pub assembly_ttl: Option<Duration>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            max_assemblies: 64,
            orphan_capacity: 256,
            assembly_ttl: None,
        }
    }
}

mod opt_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs: Option<u64> = Option::deserialize(d)?;
        Ok(secs.map(Duration::from_secs))
    }
}
