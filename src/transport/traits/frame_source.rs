//! Minimal abstraction over the CAN peripheral driver. Lets the ingestion
//! engine and the alert monitor share one controller (TWAI, bxCAN, SocketCAN
//! bridge, test double...).
//!
//! Methods take `&self`: the engine, the monitor and the application all hold
//! a shared reference to the same source, so implementations synchronize
//! internally exactly as the underlying driver does.
use core::future::Future;

use embassy_time::Duration;

use crate::transport::{
    alerts::AlertMask,
    frame::Frame,
    settings::{BusSettings, BusStatus},
};

/// Contract of the peripheral feeding the ingestion core.
pub trait FrameSource {
    type Error: core::fmt::Debug;

    /// Install and start the controller with the given settings.
    fn start(&self, settings: &BusSettings) -> Result<(), Self::Error>;

    /// Stop and uninstall the controller. No-op when already stopped.
    fn stop(&self);

    /// `true` once `start` succeeded and frames can be received.
    fn is_ready(&self) -> bool;

    /// Queue a frame for transmission, waiting at most `timeout` for room.
    fn transmit<'a>(
        &'a self,
        frame: &'a Frame,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;

    /// Wait up to `timeout` for the next received frame.
    fn receive(&self, timeout: Duration) -> impl Future<Output = Option<Frame>> + '_;

    /// Pop an already-received frame without waiting.
    fn try_receive(&self) -> Option<Frame>;

    /// Current controller status.
    fn status(&self) -> BusStatus;

    /// Wait up to `timeout` for alerts; returns an empty mask on timeout.
    fn read_alerts(&self, timeout: Duration) -> impl Future<Output = AlertMask> + '_;

    /// Ask the controller to start bus-off recovery.
    fn initiate_recovery(&self);
}
