//! Authoritative in-memory configuration backed by the persistent store.
//!
//! The store passed in is expected to be scoped to
//! [`STORE_NAMESPACE`](crate::config::STORE_NAMESPACE); the record lives under
//! [`STORE_KEY`].
use alloc::string::String;

use serde::Serialize;

use crate::config::{
    record::{self, RECORD_SIZE},
    CanConfig, STORE_KEY,
};
use crate::error::{RecordError, ValidationError};
use crate::ingestion::filter::FilterConfig;
use crate::transport::traits::persistent_store::PersistentStore;

//==================================================================================LOAD_OUTCOME
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// What [`ConfigStore::load`] found. Every variant leaves a usable
/// configuration in memory.
pub enum LoadOutcome {
    /// Record decoded as stored.
    Loaded,
    /// Record decoded; its unsupported bitrate was replaced by the default.
    BitrateReplaced { stored: u32 },
    /// No record; defaults in effect.
    Absent,
    /// Record present but unusable; defaults in effect.
    Invalid(RecordError),
}

//==================================================================================CONFIG_STORE
/// Owns the persistent store and the current [`CanConfig`].
pub struct ConfigStore<S: PersistentStore> {
    store: S,
    config: CanConfig,
}

impl<S: PersistentStore> ConfigStore<S> {
    /// Wrap `store` with defaults in memory. Call [`load`](Self::load) to pick
    /// up the persisted record.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: CanConfig::default(),
        }
    }

    /// Replace the in-memory configuration with the persisted one. Missing or
    /// corrupted records fall back to defaults; this never fails.
    pub fn load(&mut self) -> LoadOutcome {
        let mut buffer = [0u8; RECORD_SIZE];

        let outcome = match self.store.get_bytes(STORE_KEY, &mut buffer) {
            None => {
                self.config = CanConfig::default();
                LoadOutcome::Absent
            }
            Some(len) if len != RECORD_SIZE => {
                self.config = CanConfig::default();
                LoadOutcome::Invalid(RecordError::InvalidSize { len })
            }
            Some(_) => match record::decode(&buffer) {
                Ok(decoded) if decoded.bitrate_replaced() => {
                    self.config = decoded.config;
                    LoadOutcome::BitrateReplaced {
                        stored: decoded.stored_bitrate,
                    }
                }
                Ok(decoded) => {
                    self.config = decoded.config;
                    LoadOutcome::Loaded
                }
                Err(error) => {
                    self.config = CanConfig::default();
                    LoadOutcome::Invalid(error)
                }
            },
        };

        #[cfg(feature = "defmt")]
        match outcome {
            LoadOutcome::Loaded => defmt::info!("Configuration loaded"),
            LoadOutcome::BitrateReplaced { stored } => defmt::warn!(
                "Stored bitrate {} unsupported - using {}",
                stored,
                self.config.bus.bitrate
            ),
            LoadOutcome::Absent => defmt::info!("No stored configuration - using defaults"),
            LoadOutcome::Invalid(error) => {
                defmt::warn!("Stored configuration invalid ({}) - using defaults", error)
            }
        }

        outcome
    }

    /// Write the in-memory configuration. Saving twice stores the same bytes.
    pub fn save(&mut self) -> Result<(), S::Error> {
        let bytes = record::encode(&self.config);
        self.store.set_bytes(STORE_KEY, &bytes)?;

        #[cfg(feature = "defmt")]
        defmt::info!("Configuration saved");

        Ok(())
    }

    /// Remove the persisted record and return to defaults in memory.
    pub fn clear(&mut self) -> Result<(), S::Error> {
        self.store.remove(STORE_KEY)?;
        self.config = CanConfig::default();

        #[cfg(feature = "defmt")]
        defmt::info!("Configuration cleared");

        Ok(())
    }

    /// Check a candidate without touching any state.
    pub fn validate(candidate: &CanConfig) -> Result<(), ValidationError> {
        candidate.validate()
    }

    /// Validate then adopt `candidate` in memory. On failure nothing changes.
    /// Persisting is a separate [`save`](Self::save).
    pub fn apply(&mut self, candidate: CanConfig) -> Result<(), ValidationError> {
        Self::validate(&candidate)?;
        self.config = candidate;
        Ok(())
    }

    /// Put back a configuration that was valid before (used to undo an
    /// `apply` whose `save` failed).
    pub(crate) fn restore(&mut self, previous: CanConfig) {
        self.config = previous;
    }

    //==============================================================================ACCESSORS
    pub fn config(&self) -> &CanConfig {
        &self.config
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.config.filter
    }

    /// Configured bitrate in bps.
    pub fn bitrate(&self) -> u32 {
        self.config.bus.bitrate
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Current configuration as a single-line JSON object:
    /// `{"mode":..,"extended":..,"bitrate":..,"ids":[..]}`.
    pub fn summary_json(&self) -> String {
        let filter = &self.config.filter;
        let summary = Summary {
            mode: filter.mode.as_str(),
            extended: filter.extended,
            bitrate: self.config.bus.bitrate,
            ids: filter.ids.as_slice(),
        };
        serde_json::to_string(&summary).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    mode: &'a str,
    extended: bool,
    bitrate: u32,
    ids: &'a [u32],
}
