//! Transmit path with failure accounting: every frame the controller refuses
//! or fails to send within the timeout bumps the shared
//! `transmit_failures` counter.
use embassy_time::Duration;

use crate::{
    stats::Statistics,
    transport::{frame::Frame, traits::frame_source::FrameSource, TRANSMIT_TIMEOUT},
};

/// Application-side sender. The transmitting context is the only writer of
/// the `transmit_failures` counter.
pub struct Transmitter<'a, F: FrameSource> {
    source: &'a F,
    stats: &'a Statistics,
    timeout: Duration,
}

impl<'a, F: FrameSource> Transmitter<'a, F> {
    /// Sender using the default [`TRANSMIT_TIMEOUT`].
    pub fn new(source: &'a F, stats: &'a Statistics) -> Self {
        Self {
            source,
            stats,
            timeout: TRANSMIT_TIMEOUT,
        }
    }

    /// Override the per-frame transmit timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send one frame. Failures are counted, then returned to the caller.
    pub async fn send(&self, frame: &Frame) -> Result<(), F::Error> {
        match self.source.transmit(frame, self.timeout).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.stats.record_transmit_failure();
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "TX failed - id: {=u32:#x}, failures: {}",
                    frame.id,
                    self.stats.transmit_failures()
                );
                Err(err)
            }
        }
    }
}
