//! Start/stop bookkeeping shared by the background runners.
//!
//! A runner is claimed by `start`, marks itself released when it exits (or is
//! dropped without running), and is asked to stop through a flag it checks on
//! every loop iteration. Shutdown waits for the release signal for a bounded
//! grace period and reports whether the runner actually exited.
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::Duration;
use futures_util::{
    future::{select, Either},
    pin_mut,
};

use crate::error::ResourceError;
use crate::transport::traits::timer::Timer;

//==================================================================================STATE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Lifecycle state of a background component.
pub enum TaskState {
    Stopped,
    Running,
    /// Stop requested; waiting for the runner and releasing resources.
    Draining,
}

impl TaskState {
    const fn to_raw(self) -> u8 {
        match self {
            TaskState::Stopped => 0,
            TaskState::Running => 1,
            TaskState::Draining => 2,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => TaskState::Running,
            2 => TaskState::Draining,
            _ => TaskState::Stopped,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Result of a stop request.
pub enum StopOutcome {
    /// The runner observed the request and exited within the grace period.
    Stopped,
    /// Nothing to do: the component was not running.
    AlreadyStopped,
    /// The runner did not exit in time. Resources were released anyway; the
    /// runner slot stays claimed until the runner finally returns.
    TimedOut,
}

//==================================================================================TASK_CONTROL
pub(crate) struct TaskControl {
    state: AtomicU8,
    stop_requested: AtomicBool,
    claimed: AtomicBool,
    exited: Signal<CriticalSectionRawMutex, ()>,
}

impl TaskControl {
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicU8::new(TaskState::Stopped.to_raw()),
            stop_requested: AtomicBool::new(false),
            claimed: AtomicBool::new(false),
            exited: Signal::new(),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> TaskState {
        TaskState::from_raw(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    #[inline]
    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Reserve the single runner slot and enter `Running`.
    pub(crate) fn claim(&self) -> Result<(), ResourceError> {
        if self.state() != TaskState::Stopped {
            return Err(ResourceError::RunnerActive);
        }
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ResourceError::RunnerActive)?;
        self.exited.reset();
        self.stop_requested.store(false, Ordering::Release);
        self.state
            .store(TaskState::Running.to_raw(), Ordering::Release);
        Ok(())
    }

    /// Called by the runner on exit (or drop).
    pub(crate) fn release(&self) {
        self.claimed.store(false, Ordering::Release);
        self.exited.signal(());
    }

    /// Raise the stop flag, wait up to `grace` for the runner to release its
    /// slot, run `release_resources`, then enter `Stopped`.
    pub(crate) async fn shutdown<T: Timer>(
        &self,
        timer: &mut T,
        grace: Duration,
        release_resources: impl FnOnce(),
    ) -> StopOutcome {
        if self.state() != TaskState::Running {
            return StopOutcome::AlreadyStopped;
        }
        self.state
            .store(TaskState::Draining.to_raw(), Ordering::Release);
        self.stop_requested.store(true, Ordering::Release);

        let exited = if self.claimed.load(Ordering::Acquire) {
            let wait = self.exited.wait();
            let deadline = timer.delay(grace);
            pin_mut!(wait);
            pin_mut!(deadline);
            matches!(select(wait, deadline).await, Either::Left(_))
        } else {
            true
        };

        release_resources();
        self.state
            .store(TaskState::Stopped.to_raw(), Ordering::Release);

        if exited {
            StopOutcome::Stopped
        } else {
            StopOutcome::TimedOut
        }
    }
}
