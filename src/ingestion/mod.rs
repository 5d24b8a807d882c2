//! Ingestion engine: drains the frame source, applies the software filter and
//! forwards accepted frames to a bounded delivery queue read by the
//! application.
//!
//! The engine itself is a passive shared object (queue, counters, filter
//! snapshot, lifecycle flags). [`IngestionEngine::start`] hands out an
//! [`IngestionRunner`] whose [`run`](IngestionRunner::run) future must be
//! driven by the firmware's executor, typically from a dedicated task:
//!
//! ```rust,ignore
//! static ENGINE: IngestionEngine = IngestionEngine::new();
//!
//! let runner = ENGINE.start(&CAN, Some(&on_frame))?;
//! spawner.spawn(ingest_task(runner)).unwrap();
//! // ...
//! while let Some(frame) = ENGINE.pop() { /* ... */ }
//! ```
//!
//! Overflow policy: when the queue is full the newest frame is dropped and
//! `frames_dropped` is incremented. The runner never blocks on the queue.
pub mod filter;
mod handoff;

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_time::Duration;

use crate::{
    error::{IngestionError, ResourceError, ValidationError},
    ingestion::{
        filter::{AcceptedIds, FilterConfig, FilterMode},
        handoff::FilterHandoff,
    },
    lifecycle::{StopOutcome, TaskControl, TaskState},
    stats::{Statistics, StatisticsSnapshot},
    transport::{
        frame::Frame, traits::frame_source::FrameSource, traits::timer::Timer,
        HEADROOM_SAMPLE_INTERVAL, RECEIVE_TIMEOUT,
    },
};

/// Default delivery queue depth.
pub const DELIVERY_QUEUE_CAPACITY: usize = 16;

/// Callback invoked from the runner for every accepted frame, before it is
/// queued.
///
/// Contract: must return in bounded, sub-millisecond time; no blocking I/O,
/// no allocation, no waiting on the delivery queue. The engine calls it
/// synchronously and does not police it.
pub type FrameCallback<'a> = dyn Fn(&Frame) + Sync + 'a;

/// Probe returning the remaining execution headroom of the ingestion task
/// (e.g. free stack bytes). Same timing contract as [`FrameCallback`].
pub type HeadroomProbe<'a> = dyn Fn() -> u32 + Sync + 'a;

const HEADROOM_UNKNOWN: u32 = u32::MAX;

//==================================================================================ENGINE
/// Shared ingestion state. Create once (usually in a `static`) and share by
/// reference between the runner and the application.
pub struct IngestionEngine<const CAP: usize = DELIVERY_QUEUE_CAPACITY> {
    queue: Channel<CriticalSectionRawMutex, Frame, CAP>,
    control: TaskControl,
    filter: FilterHandoff,
    stats: Statistics,
    headroom: AtomicU32,
}

impl<const CAP: usize> Default for IngestionEngine<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAP: usize> IngestionEngine<CAP> {
    /// Stopped engine with an accept-all filter.
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
            control: TaskControl::new(),
            filter: FilterHandoff::new(FilterConfig::monitoring()),
            stats: Statistics::new(),
            headroom: AtomicU32::new(HEADROOM_UNKNOWN),
        }
    }

    //==============================================================================LIFECYCLE
    /// Enter `Running` and return the runner to spawn.
    ///
    /// Fails with [`IngestionError::Init`] when the source is not ready and
    /// with [`IngestionError::Resource`] when the queue has no capacity or a
    /// previous runner is still alive. On failure the engine stays stopped.
    pub fn start<'a, F: FrameSource>(
        &'a self,
        source: &'a F,
        callback: Option<&'a FrameCallback<'a>>,
    ) -> Result<IngestionRunner<'a, F, CAP>, IngestionError> {
        if !source.is_ready() {
            return Err(IngestionError::Init);
        }
        if CAP == 0 {
            return Err(IngestionError::Resource(ResourceError::ZeroCapacity));
        }
        self.control.claim().map_err(IngestionError::Resource)?;
        self.drain_queue();

        #[cfg(feature = "defmt")]
        defmt::info!("Ingestion started - queue capacity: {}", CAP);

        Ok(IngestionRunner {
            engine: self,
            source,
            callback,
            probe: None,
            receive_timeout: RECEIVE_TIMEOUT,
        })
    }

    /// Ask the runner to stop, wait up to `grace` for it to exit, then release
    /// the delivery queue. Safe to call when already stopped.
    ///
    /// A [`StopOutcome::TimedOut`] result means the runner has not observed the
    /// request yet; queued frames are discarded regardless and the engine
    /// cannot be restarted until that runner returns.
    pub async fn stop<T: Timer>(&self, timer: &mut T, grace: Duration) -> StopOutcome {
        let outcome = self
            .control
            .shutdown(timer, grace, || self.drain_queue())
            .await;

        #[cfg(feature = "defmt")]
        match outcome {
            StopOutcome::Stopped => defmt::info!("Ingestion stopped"),
            StopOutcome::TimedOut => defmt::warn!("Ingestion runner did not stop in time"),
            StopOutcome::AlreadyStopped => {}
        }

        outcome
    }

    pub fn state(&self) -> TaskState {
        self.control.state()
    }

    //==============================================================================QUEUE
    /// Number of frames waiting in the delivery queue; `0` when not running.
    pub fn queued_count(&self) -> usize {
        if !self.control.is_running() {
            return 0;
        }
        self.queue.len()
    }

    /// Pop the oldest queued frame without waiting; `None` when the queue is
    /// empty or the engine is not running.
    pub fn pop(&self) -> Option<Frame> {
        if !self.control.is_running() {
            return None;
        }
        self.queue.try_receive().ok()
    }

    /// Capacity of the delivery queue.
    pub const fn capacity(&self) -> usize {
        CAP
    }

    fn drain_queue(&self) {
        while self.queue.try_receive().is_ok() {}
    }

    //==============================================================================FILTER
    /// Filter currently published to the runner.
    pub fn filter(&self) -> FilterConfig {
        self.filter.current()
    }

    /// Validate and publish a complete filter. The runner picks it up before
    /// the next frame it processes; a burst already in progress finishes with
    /// the previous snapshot.
    pub fn set_filter(&self, config: FilterConfig) -> Result<(), ValidationError> {
        config.validate()?;
        self.filter.publish(config);

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Filter published - mode: {}, ids: {}",
            config.mode,
            config.ids.len()
        );

        Ok(())
    }

    /// Switch the filter mode, keeping the accepted-ID set.
    pub fn set_filter_mode(&self, mode: FilterMode) -> Result<(), ValidationError> {
        let mut config = self.filter();
        config.mode = mode;
        self.set_filter(config)
    }

    /// Replace the accepted-ID set and its frame format, keeping the mode.
    pub fn set_accepted_ids(&self, ids: &[u32], extended: bool) -> Result<(), ValidationError> {
        let mut config = self.filter();
        config.ids = AcceptedIds::from_slice(ids)?;
        config.extended = extended;
        self.set_filter(config)
    }

    //==============================================================================STATISTICS
    /// Live counters, shared with [`Transmitter`](crate::transport::transmitter::Transmitter).
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn statistics_snapshot(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    /// Last headroom sample published by the runner, if any.
    pub fn headroom(&self) -> Option<u32> {
        match self.headroom.load(Ordering::Relaxed) {
            HEADROOM_UNKNOWN => None,
            value => Some(value),
        }
    }
}

//==================================================================================RUNNER
/// Background half of the engine. Dropping it without running releases the
/// runner slot.
pub struct IngestionRunner<'a, F: FrameSource, const CAP: usize = DELIVERY_QUEUE_CAPACITY> {
    engine: &'a IngestionEngine<CAP>,
    source: &'a F,
    callback: Option<&'a FrameCallback<'a>>,
    probe: Option<&'a HeadroomProbe<'a>>,
    receive_timeout: Duration,
}

impl<'a, F: FrameSource, const CAP: usize> IngestionRunner<'a, F, CAP> {
    /// Override the blocking receive timeout (bounds stop latency).
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Sample `probe` every [`HEADROOM_SAMPLE_INTERVAL`] iterations.
    pub fn with_headroom_probe(mut self, probe: &'a HeadroomProbe<'a>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Drive the ingestion loop until [`IngestionEngine::stop`] is called.
    pub async fn run(self) {
        let engine = self.engine;
        let mut filter = engine.filter.reader();
        let mut iterations: u32 = 0;

        while !engine.control.stop_requested() {
            if let Some(frame) = self.source.receive(self.receive_timeout).await {
                filter.refresh(&engine.filter);
                self.dispatch(&frame, filter.config());

                // Burst drain: empty the hardware queue before yielding again.
                while let Some(frame) = self.source.try_receive() {
                    self.dispatch(&frame, filter.config());
                }
            }

            iterations = iterations.wrapping_add(1);
            if iterations % HEADROOM_SAMPLE_INTERVAL == 0 {
                self.sample_headroom();
            }
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("Ingestion runner exiting after {} iterations", iterations);
    }

    /// Filter, notify, enqueue.
    #[inline]
    fn dispatch(&self, frame: &Frame, config: &FilterConfig) {
        if !config.accepts(frame) {
            return;
        }
        if let Some(callback) = self.callback {
            callback(frame);
        }
        if self.engine.queue.try_send(*frame).is_err() {
            self.engine.stats.record_drop();

            #[cfg(feature = "defmt")]
            defmt::trace!("Delivery queue full - dropped id: {=u32:#x}", frame.id);
        }
    }

    fn sample_headroom(&self) {
        if let Some(probe) = self.probe {
            let headroom = probe().min(HEADROOM_UNKNOWN - 1);
            self.engine.headroom.store(headroom, Ordering::Relaxed);
        }
    }
}

impl<F: FrameSource, const CAP: usize> Drop for IngestionRunner<'_, F, CAP> {
    fn drop(&mut self) {
        self.engine.control.release();
    }
}
