//! `can-ingest` library: the core of a CAN bus receiver in a `no_std`
//! environment. The crate exposes the peripheral abstractions (frames, alerts,
//! bus settings), the ingestion engine with its software acceptance filter,
//! the bus-health monitor, and the persisted runtime configuration with its
//! serial upload protocol.
#![no_std]
//==================================================================================
extern crate alloc;
//==================================================================================
/// Runtime configuration: persisted record, store, and upload protocol.
pub mod config;
/// Error types for start-up, validation, record decoding, and uploads.
pub mod error;
/// Receive loop, software filter, and bounded delivery queue.
pub mod ingestion;
/// Start/stop bookkeeping shared by the background runners.
pub mod lifecycle;
/// Bus alert polling and bus-off recovery.
pub mod monitor;
/// Loss and failure counters.
pub mod stats;
/// CAN frames, alerts, bus settings, and the collaborator traits.
pub mod transport;
//==================================================================================
pub use config::{
    protocol::{apply_to_bus, ConfigProtocol, UploadOutcome},
    store::{ConfigStore, LoadOutcome},
    CanConfig,
};
pub use ingestion::{
    filter::{FilterConfig, FilterMode},
    IngestionEngine, IngestionRunner,
};
pub use lifecycle::{StopOutcome, TaskState};
pub use monitor::{AlertMonitor, AlertRunner};
pub use transport::{frame::Frame, transmitter::Transmitter};
