use std::{
    collections::VecDeque,
    thread,
    time::{Duration, Instant},
};

/// One refresh signal, stamped with the time elapsed since the clock started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick {
    pub timestamp: Duration,
}

impl Tick {
    pub fn at(timestamp: Duration) -> Self {
        Self { timestamp }
    }
}

/// Source of per-frame ticks whose rate the scheduling loop does not control.
pub trait FrameClock: Send {
    /// Blocks until the next refresh. `None` once the clock has shut down.
    fn request_next_tick(&mut self) -> Option<Tick>;
}

impl<K: FrameClock + ?Sized> FrameClock for Box<K> {
    fn request_next_tick(&mut self) -> Option<Tick> {
        (**self).request_next_tick()
    }
}

/// Paces ticks to a fixed refresh interval on the wall clock, like a display timer.
#[derive(Debug)]
pub struct DisplayClock {
    interval: Duration,
    origin: Instant,
    next_deadline: Instant,
}

impl DisplayClock {
    pub fn new(refresh_hz: f64) -> Self {
        let interval = Duration::from_secs_f64(1.0 / refresh_hz.max(1.0));
        let origin = Instant::now();
        Self {
            interval,
            origin,
            next_deadline: origin,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl FrameClock for DisplayClock {
    fn request_next_tick(&mut self) -> Option<Tick> {
        let now = Instant::now();
        if now < self.next_deadline {
            thread::sleep(self.next_deadline - now);
        }
        let fired = Instant::now();
        self.next_deadline += self.interval;
        // Skip missed refreshes instead of bursting to catch up.
        if self.next_deadline < fired {
            self.next_deadline = fired + self.interval;
        }
        Some(Tick::at(fired.duration_since(self.origin)))
    }
}

/// Deterministic tick source for tests and offline runs; never sleeps.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    pending: VecDeque<Duration>,
}

impl ManualClock {
    /// `count` ticks spaced `interval` apart, starting at zero.
    pub fn fixed_rate(interval: Duration, count: usize) -> Self {
        let pending = (0..count).map(|i| interval * i as u32).collect();
        Self { pending }
    }

    /// Ticks at `refresh_hz` covering `duration` of simulated time.
    pub fn simulate(refresh_hz: f64, duration: Duration) -> Self {
        let interval = Duration::from_secs_f64(1.0 / refresh_hz);
        let count = (duration.as_secs_f64() * refresh_hz).floor() as usize;
        Self::fixed_rate(interval, count)
    }

    pub fn from_timestamps<I: IntoIterator<Item = Duration>>(timestamps: I) -> Self {
        Self {
            pending: timestamps.into_iter().collect(),
        }
    }

    pub fn push(&mut self, timestamp: Duration) {
        self.pending.push_back(timestamp);
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameClock for ManualClock {
    fn request_next_tick(&mut self) -> Option<Tick> {
        self.pending.pop_front().map(Tick::at)
    }
}
