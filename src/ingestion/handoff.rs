//! Versioned hand-off of filter parameters from the control context to the
//! ingestion runner.
//!
//! Writers publish a complete [`FilterConfig`] and bump the version; the runner
//! keeps a private copy and only takes the (short, critical-section) lock when
//! the version it last saw is stale. The per-frame cost is one atomic load.
use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use crate::ingestion::filter::FilterConfig;

pub(crate) struct FilterHandoff {
    version: AtomicU32,
    slot: Mutex<CriticalSectionRawMutex, Cell<FilterConfig>>,
}

impl FilterHandoff {
    pub(crate) const fn new(initial: FilterConfig) -> Self {
        Self {
            version: AtomicU32::new(0),
            slot: Mutex::new(Cell::new(initial)),
        }
    }

    /// Replace the published configuration.
    pub(crate) fn publish(&self, config: FilterConfig) {
        self.slot.lock(|slot| {
            slot.set(config);
            self.version.fetch_add(1, Ordering::Release);
        });
    }

    /// Latest published configuration.
    pub(crate) fn current(&self) -> FilterConfig {
        self.slot.lock(Cell::get)
    }

    /// Reader starting from the latest published snapshot.
    pub(crate) fn reader(&self) -> FilterReader {
        let (version, config) = self.load();
        FilterReader { version, config }
    }

    fn load(&self) -> (u32, FilterConfig) {
        self.slot
            .lock(|slot| (self.version.load(Ordering::Acquire), slot.get()))
    }
}

/// Runner-local copy of the filter.
pub(crate) struct FilterReader {
    version: u32,
    config: FilterConfig,
}

impl FilterReader {
    /// Reload the snapshot if a newer one was published.
    #[inline]
    pub(crate) fn refresh(&mut self, handoff: &FilterHandoff) {
        if handoff.version.load(Ordering::Acquire) != self.version {
            let (version, config) = handoff.load();
            self.version = version;
            self.config = config;
        }
    }

    #[inline]
    pub(crate) fn config(&self) -> &FilterConfig {
        &self.config
    }
}
