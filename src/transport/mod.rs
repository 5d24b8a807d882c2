//! CAN transport layer: frame representation, alert bits, bus settings,
//! collaborator traits and the accounted transmit path.
//!
//! ## Timing Constants
//!
//! These constants bound how long the background runners may block, and
//! therefore how quickly they react to a stop request.

pub mod alerts;
pub mod frame;
pub mod settings;
pub mod traits;
pub mod transmitter;

use embassy_time::Duration;

/// Receive timeout used by the ingestion runner between stop-flag checks (ms).
///
/// Bounds shutdown latency: a stop request is observed at most one timeout
/// after it was raised, plus the time needed to drain a burst.
pub const RECEIVE_TIMEOUT_MS: u64 = 10;

/// Alert poll timeout used by the alert monitor between stop-flag checks (ms).
pub const ALERT_POLL_TIMEOUT_MS: u64 = 10;

/// Timeout for handing a single frame to the controller (ms).
///
/// Prevents indefinite blocking when the bus is faulty, disconnected, or
/// saturated (e.g. during bus-off).
pub const TRANSMIT_TIMEOUT_MS: u64 = 1000;

/// Grace period granted to a runner to observe a stop request (ms).
///
/// Must exceed both [`RECEIVE_TIMEOUT_MS`] and [`ALERT_POLL_TIMEOUT_MS`].
pub const STOP_GRACE_MS: u64 = 50;

/// Number of ingestion iterations between two headroom samples.
pub const HEADROOM_SAMPLE_INTERVAL: u32 = 256;

/// [`RECEIVE_TIMEOUT_MS`] as a `Duration`.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_millis(RECEIVE_TIMEOUT_MS);
/// [`ALERT_POLL_TIMEOUT_MS`] as a `Duration`.
pub const ALERT_POLL_TIMEOUT: Duration = Duration::from_millis(ALERT_POLL_TIMEOUT_MS);
/// [`TRANSMIT_TIMEOUT_MS`] as a `Duration`.
pub const TRANSMIT_TIMEOUT: Duration = Duration::from_millis(TRANSMIT_TIMEOUT_MS);
/// [`STOP_GRACE_MS`] as a `Duration`.
pub const STOP_GRACE: Duration = Duration::from_millis(STOP_GRACE_MS);
