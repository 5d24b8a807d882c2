//! Runtime configuration: the authoritative in-memory copy, its fixed-layout
//! persisted record, and the serial upload protocol that replaces it.
//!
//! ## Defaults
//!
//! Without a persisted record the device runs in monitoring mode (accept all),
//! standard identifiers, no accepted IDs, 500 kbps.
pub mod protocol;
pub mod record;
pub mod store;

use crate::error::ValidationError;
use crate::ingestion::filter::FilterConfig;
use crate::transport::settings::Bitrate;

/// Namespace of the configuration in the persistent store.
pub const STORE_NAMESPACE: &str = "can_config";
/// Key of the configuration record inside [`STORE_NAMESPACE`].
pub const STORE_KEY: &str = "config";
/// Bitrate used when none is configured (bps).
pub const DEFAULT_BITRATE: u32 = 500_000;

//==================================================================================BUS_CONFIG
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Bus speed as configured (raw bps, validated against [`Bitrate`]).
pub struct BusConfig {
    pub bitrate: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bitrate: DEFAULT_BITRATE,
        }
    }
}

impl BusConfig {
    /// Typed bitrate; fails for values outside the supported set.
    pub fn bitrate(&self) -> Result<Bitrate, ValidationError> {
        Bitrate::try_from(self.bitrate)
    }
}

//==================================================================================CAN_CONFIG
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Complete runtime configuration: software filter plus bus speed.
pub struct CanConfig {
    pub filter: FilterConfig,
    pub bus: BusConfig,
}

impl CanConfig {
    /// Build a configuration from its parts.
    pub const fn new(filter: FilterConfig, bitrate: u32) -> Self {
        Self {
            filter,
            bus: BusConfig { bitrate },
        }
    }

    /// Check bitrate then filter invariants. Pure; never mutates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.bus.bitrate()?;
        self.filter.validate()
    }
}
