// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::time::Duration;

use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::debug;

/// An armed timer.
struct Timer {
    handle: JoinHandle<()>,
    period: Duration,
}

/// A repeating wall-clock timer. At most one timer is outstanding at a time:
/// starting an armed scheduler cancels the old timer first, and a timer's
/// period is never changed in flight.
pub struct BeatScheduler {
    runtime: Handle,
    timer: Option<Timer>,
}

impl BeatScheduler {
    /// Creates a scheduler whose timers run on the given runtime.
    pub fn new(runtime: Handle) -> BeatScheduler {
        BeatScheduler {
            runtime,
            timer: None,
        }
    }

    /// Arms a timer that calls `on_tick` every `period`. The first call comes
    /// one full period after this returns.
    pub fn start<F>(&mut self, period: Duration, mut on_tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.stop();

        let first_tick = Instant::now() + period;
        let handle = self.runtime.spawn(async move {
            let mut interval = time::interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                on_tick();
            }
        });

        debug!(period_ms = period.as_secs_f64() * 1000.0, "Beat timer armed.");
        self.timer = Some(Timer { handle, period });
    }

    /// Cancels the outstanding timer, if any. No tick starts after this
    /// returns.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
            debug!("Beat timer cancelled.");
        }
    }

    /// Returns true if a timer is outstanding.
    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// The period of the outstanding timer.
    pub fn period(&self) -> Option<Duration> {
        self.timer.as_ref().map(|timer| timer.period)
    }
}

impl Drop for BeatScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;

    use tokio::runtime::Handle;

    use super::BeatScheduler;

    fn counting(scheduler: &mut BeatScheduler, period: Duration) -> Arc<AtomicUsize> {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        scheduler.start(period, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        ticks
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let mut scheduler = BeatScheduler::new(Handle::current());
        let ticks = counting(&mut scheduler, Duration::from_millis(500));
        assert_eq!(scheduler.period(), Some(Duration::from_millis(500)));

        // No tick at start.
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1601)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels() {
        let mut scheduler = BeatScheduler::new(Handle::current());
        let ticks = counting(&mut scheduler, Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        scheduler.stop();
        assert!(!scheduler.is_armed());
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_timer() {
        let mut scheduler = BeatScheduler::new(Handle::current());
        let old_ticks = counting(&mut scheduler, Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(old_ticks.load(Ordering::SeqCst), 1);

        let new_ticks = counting(&mut scheduler, Duration::from_millis(300));
        assert_eq!(scheduler.period(), Some(Duration::from_millis(300)));
        tokio::time::sleep(Duration::from_millis(1000)).await;

        // The old timer never fires again; the new one fired at 300, 600, 900.
        assert_eq!(old_ticks.load(Ordering::SeqCst), 1);
        assert_eq!(new_ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let ticks = {
            let mut scheduler = BeatScheduler::new(Handle::current());
            counting(&mut scheduler, Duration::from_millis(100))
        };
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
