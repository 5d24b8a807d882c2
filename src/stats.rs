//! Loss and failure counters shared between the runners and the application.
//!
//! Each counter has exactly one writer (the ingestion runner for
//! `frames_dropped`, the transmitting context for `transmit_failures`) and any
//! number of readers, so plain atomic increments are sufficient.
use core::sync::atomic::{AtomicU32, Ordering};

/// Live counters.
#[derive(Debug, Default)]
pub struct Statistics {
    frames_dropped: AtomicU32,
    transmit_failures: AtomicU32,
}

/// Point-in-time copy of [`Statistics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatisticsSnapshot {
    /// Accepted frames lost because the delivery queue was full.
    pub frames_dropped: u32,
    /// Frames the controller failed to transmit.
    pub transmit_failures: u32,
}

impl Statistics {
    pub const fn new() -> Self {
        Self {
            frames_dropped: AtomicU32::new(0),
            transmit_failures: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn frames_dropped(&self) -> u32 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn transmit_failures(&self) -> u32 {
        self.transmit_failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            frames_dropped: self.frames_dropped(),
            transmit_failures: self.transmit_failures(),
        }
    }

    /// Operator reset. The only way counters go down.
    pub fn reset(&self) {
        self.frames_dropped.store(0, Ordering::Relaxed);
        self.transmit_failures.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_drop(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_transmit_failure(&self) {
        self.transmit_failures.fetch_add(1, Ordering::Relaxed);
    }
}
