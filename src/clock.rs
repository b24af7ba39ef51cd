//! Cancellable periodic tick source shared by the recorder and the player.

use std::ops::ControlFlow;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Produces tick indices `0, 1, 2, ...` at a fixed interval on a background
/// task. The first tick fires one interval after [`ProgressClock::spawn`].
#[derive(Debug, Clone, Copy)]
pub struct ProgressClock {
    interval: Duration,
}

impl ProgressClock {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start ticking.
    ///
    /// Every index up to and including the first one greater than `limit` is
    /// passed to `on_tick`; after that tick the stream completes and
    /// `on_complete` runs. Returning `ControlFlow::Break` from `on_tick` ends
    /// the stream without calling `on_complete`.
    pub fn spawn<T, C>(&self, limit: u64, mut on_tick: T, on_complete: C) -> ClockHandle
    where
        T: FnMut(u64) -> ControlFlow<()> + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut index = 0u64;
            loop {
                ticker.tick().await;

                if on_tick(index).is_break() {
                    return;
                }
                if index > limit {
                    break;
                }
                index += 1;
            }

            on_complete();
        });

        ClockHandle { task }
    }
}

/// Owner of a running clock. Cancelling (or dropping) the handle stops
/// further ticks; a tick callback already executing runs to completion.
#[derive(Debug)]
pub struct ClockHandle {
    task: JoinHandle<()>,
}

impl ClockHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
