//! Bus-health supervisor: polls the frame source for alerts, forwards them to
//! an optional callback, and requests bus-off recovery once per episode.
//!
//! Independent of the ingestion engine: it shares the frame source but no
//! mutable state, and has its own start/stop lifecycle.
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_time::Duration;

use crate::{
    error::MonitorError,
    lifecycle::{StopOutcome, TaskControl, TaskState},
    transport::{
        alerts::AlertMask, traits::frame_source::FrameSource, traits::timer::Timer,
        ALERT_POLL_TIMEOUT,
    },
};

/// Callback invoked from the monitor runner for every non-empty alert mask.
///
/// Same contract as [`FrameCallback`](crate::ingestion::FrameCallback):
/// bounded sub-millisecond execution, no blocking, no allocation.
pub type AlertCallback<'a> = dyn Fn(AlertMask) + Sync + 'a;

//==================================================================================MONITOR
/// Shared monitor state.
pub struct AlertMonitor {
    control: TaskControl,
    bus_off: AtomicBool,
    recovery_requests: AtomicU32,
    last_alerts: AtomicU32,
}

impl Default for AlertMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertMonitor {
    pub const fn new() -> Self {
        Self {
            control: TaskControl::new(),
            bus_off: AtomicBool::new(false),
            recovery_requests: AtomicU32::new(0),
            last_alerts: AtomicU32::new(0),
        }
    }

    /// Enter `Running` and return the runner to spawn.
    pub fn start<'a, F: FrameSource>(
        &'a self,
        source: &'a F,
        callback: Option<&'a AlertCallback<'a>>,
    ) -> Result<AlertRunner<'a, F>, MonitorError> {
        if !source.is_ready() {
            return Err(MonitorError::Init);
        }
        self.control.claim().map_err(MonitorError::Resource)?;
        self.bus_off.store(false, Ordering::Release);

        #[cfg(feature = "defmt")]
        defmt::info!("Alert monitor started");

        Ok(AlertRunner {
            monitor: self,
            source,
            callback,
            poll_timeout: ALERT_POLL_TIMEOUT,
        })
    }

    /// Ask the runner to stop and wait up to `grace` for it to exit.
    pub async fn stop<T: Timer>(&self, timer: &mut T, grace: Duration) -> StopOutcome {
        let outcome = self.control.shutdown(timer, grace, || {}).await;

        #[cfg(feature = "defmt")]
        if outcome == StopOutcome::TimedOut {
            defmt::warn!("Alert monitor did not stop in time");
        }

        outcome
    }

    pub fn state(&self) -> TaskState {
        self.control.state()
    }

    /// `true` between a BUS_OFF alert and the matching BUS_RECOVERED alert.
    pub fn is_bus_off(&self) -> bool {
        self.bus_off.load(Ordering::Acquire)
    }

    /// Number of recovery requests issued since the monitor was created.
    pub fn recovery_requests(&self) -> u32 {
        self.recovery_requests.load(Ordering::Relaxed)
    }

    /// Most recent non-empty alert mask.
    pub fn last_alerts(&self) -> AlertMask {
        AlertMask(self.last_alerts.load(Ordering::Relaxed))
    }
}

//==================================================================================RUNNER
/// Background half of the monitor.
pub struct AlertRunner<'a, F: FrameSource> {
    monitor: &'a AlertMonitor,
    source: &'a F,
    callback: Option<&'a AlertCallback<'a>>,
    poll_timeout: Duration,
}

impl<'a, F: FrameSource> AlertRunner<'a, F> {
    /// Override the alert poll timeout (bounds stop latency).
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Drive the monitor loop until [`AlertMonitor::stop`] is called.
    pub async fn run(self) {
        while !self.monitor.control.stop_requested() {
            let alerts = self.source.read_alerts(self.poll_timeout).await;
            if !alerts.is_empty() {
                self.handle(alerts);
            }
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("Alert monitor exiting");
    }

    fn handle(&self, alerts: AlertMask) {
        let monitor = self.monitor;
        monitor.last_alerts.store(alerts.bits(), Ordering::Relaxed);

        if let Some(callback) = self.callback {
            callback(alerts);
        }

        // Only the first BUS_OFF of an episode triggers recovery.
        if alerts.contains(AlertMask::BUS_OFF) && !monitor.bus_off.swap(true, Ordering::AcqRel) {
            #[cfg(feature = "defmt")]
            defmt::warn!("BUS-OFF -> initiating recovery");

            self.source.initiate_recovery();
            monitor.recovery_requests.fetch_add(1, Ordering::Relaxed);
        }

        if alerts.contains(AlertMask::BUS_RECOVERED) {
            monitor.bus_off.store(false, Ordering::Release);

            #[cfg(feature = "defmt")]
            defmt::info!("Bus recovered");
        }

        #[cfg(feature = "defmt")]
        self.log_details(alerts);
    }

    #[cfg(feature = "defmt")]
    fn log_details(&self, alerts: AlertMask) {
        let status = self.source.status();
        if alerts.contains(AlertMask::ERR_PASSIVE) {
            defmt::warn!("Error passive state");
        }
        if alerts.contains(AlertMask::BUS_ERROR) {
            defmt::warn!("Bus error - count: {}", status.bus_error_count);
        }
        if alerts.contains(AlertMask::RX_QUEUE_FULL) {
            defmt::warn!(
                "RX queue full - buffered: {} missed: {} overrun: {}",
                status.rx_queued,
                status.rx_missed_count,
                status.rx_overrun_count
            );
        }
        if alerts.contains(AlertMask::TX_FAILED) {
            defmt::warn!(
                "TX failed - buffered: {} errors: {} failed: {}",
                status.tx_queued,
                status.tx_error_counter,
                status.tx_failed_count
            );
        }
    }
}

impl<F: FrameSource> Drop for AlertRunner<'_, F> {
    fn drop(&mut self) {
        self.monitor.control.release();
    }
}
