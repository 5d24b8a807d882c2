//! Asynchronous timer abstraction providing the waits required by shutdown
//! grace periods and the configuration upload window.
use core::future::Future;

use embassy_time::Duration;

/// Clock used to bound waits: the runner stop grace period and the
/// configuration upload window. `delay` must complete once `duration` has
/// elapsed and may be dropped early when the awaited event wins the race.
pub trait Timer {
    /// Asynchronously wait for `duration`.
    fn delay(&mut self, duration: Duration) -> impl Future<Output = ()> + '_;
}
