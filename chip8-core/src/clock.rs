//! Frame clock.
use std::{
    thread,
    time::{Duration, Instant},
};

use crate::conf::Hz;

/// Timer to pace a driver loop in real time.
///
/// The delay and sound timers of the machine count down at 60Hz
/// of wall-clock time, regardless of how many instructions execute,
/// so the driver waits on this clock between frames.
///
/// When the caller stalls for longer than a cycle, for example when
/// paused in a debugger, the clock resets rather than trying to catch
/// up with a burst of frames.
pub struct Clock {
    start: Instant,
    interval: Duration,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(frequency: Hz) -> Self {
        Self::from_interval(frequency.into())
    }

    pub fn from_interval(interval: Duration) -> Self {
        Self {
            start: Instant::now(),
            interval,
        }
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.start = Instant::now()
    }

    /// Check, without blocking, whether a cycle has elapsed.
    ///
    /// Resets the clock when it returns `true`.
    pub fn tick(&mut self) -> bool {
        if self.start.elapsed() >= self.interval {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&mut self) {
        loop {
            let elapsed = self.start.elapsed();
            if elapsed < self.interval {
                let remaining = self.interval - elapsed;
                if remaining > Duration::from_millis(2) {
                    // Sleep is too coarse to land on the cycle exactly,
                    // so stop short and yield for the remainder.
                    thread::sleep(remaining - Duration::from_millis(2));
                } else {
                    thread::yield_now();
                }
            } else {
                self.reset();
                return;
            }
        }
    }
}
