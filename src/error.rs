//! Error definitions shared across library modules.
//! Each type models one failure class: peripheral start-up, task/queue
//! allocation, configuration validation, persisted record decoding, upload
//! request rejection, and bus restart.
use thiserror_no_std::Error;

//==================================================================================TASK_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Reasons a background runner could not be allocated.
pub enum ResourceError {
    /// The delivery queue was declared with a capacity of zero.
    #[error("Delivery queue has zero capacity")]
    ZeroCapacity,
    /// A runner from a previous start has not exited yet.
    #[error("Previous runner is still active")]
    RunnerActive,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Failures while starting the ingestion engine. The engine stays stopped.
pub enum IngestionError {
    /// The frame source is not started or not ready to deliver frames.
    #[error("Frame source is not ready")]
    Init,
    /// The delivery queue or the runner slot could not be allocated.
    #[error("Resource error: {0}")]
    Resource(ResourceError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Failures while starting the alert monitor. The monitor stays stopped.
pub enum MonitorError {
    /// The frame source is not started or cannot report alerts.
    #[error("Frame source is not ready")]
    Init,
    /// The runner slot could not be allocated.
    #[error("Resource error: {0}")]
    Resource(ResourceError),
}

//==================================================================================CONFIG_ERRORS
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// A configuration candidate was rejected. Nothing was mutated.
pub enum ValidationError {
    /// Bitrate outside {125000, 250000, 500000, 1000000}.
    #[error("Unsupported bitrate {bitrate} (must be 125000, 250000, 500000 or 1000000)")]
    UnsupportedBitrate { bitrate: u32 },
    /// Specific mode requires at least one accepted identifier.
    #[error("Specific mode requires at least one ID")]
    NoIds,
    /// More identifiers than the accepted-ID set can hold.
    #[error("Too many IDs: {count} (max 5)")]
    TooManyIds { count: usize },
    /// Identifier does not fit the configured frame format.
    #[error("ID {index} out of range: {id:#X} > {max:#X}")]
    IdOutOfRange { index: usize, id: u32, max: u32 },
    /// The same identifier appears twice.
    #[error("Duplicate ID {id:#X}")]
    DuplicateId { id: u32 },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Problems found while decoding a persisted configuration record.
pub enum RecordError {
    /// Stored blob does not have the fixed record size.
    #[error("Invalid record size: {len} bytes")]
    InvalidSize { len: usize },
    /// Mode byte is neither 0 (monitoring) nor 1 (specific).
    #[error("Invalid mode byte {0}")]
    InvalidMode(u8),
    /// ID count exceeds the five available slots.
    #[error("Invalid ID count {0}")]
    InvalidIdCount(u8),
    /// Decoded filter violates the filter invariants.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Reasons an uploaded configuration line was refused.
pub enum RequestError {
    /// The line is not a JSON object of the expected shape.
    #[error("Invalid JSON")]
    InvalidJson,
    /// The `mode` field is absent.
    #[error("Missing 'mode' field")]
    MissingMode,
    /// The `mode` field is neither "monitoring" nor "specific".
    #[error("Invalid mode")]
    UnknownMode,
    /// Specific mode without an `ids` array.
    #[error("Missing 'ids' array")]
    MissingIds,
    /// Specific mode whose `ids` array holds no usable identifier.
    #[error("No valid IDs in specific mode")]
    NoValidIds,
    /// The line exceeded the upload buffer before its terminator.
    #[error("Line too long")]
    LineTooLong,
    /// The candidate failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// The candidate was valid but could not be written to the store.
    #[error("Failed to persist configuration")]
    Persist,
}

//==================================================================================BUS_ERRORS
#[derive(Error, Debug)]
/// Errors raised while pushing the stored configuration to the bus.
pub enum ApplyError<E: core::fmt::Debug> {
    /// The frame source could not restart at the requested bitrate.
    #[error("Bus restart failed: {0:?}")]
    BusRestart(E),
    /// The stored filter was rejected by the engine.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
