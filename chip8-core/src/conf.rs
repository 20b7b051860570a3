//! VM configuration.
use std::time::Duration;

use crate::constants::*;

/// VM Configuration Parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Chip8Conf {
    /// Interpreter steps executed per frame, before the timers tick.
    pub steps_per_frame: usize,
    /// Rate at which the driver runs frames and the timers count down.
    pub frame_rate: Hz,
    /// Fixed seed for the random number generator used by `RND`.
    ///
    /// When `None` the generator is seeded from system entropy.
    pub rng_seed: Option<u64>,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            steps_per_frame: DEFAULT_STEPS_PER_FRAME,
            frame_rate: Hz(DELAY_FREQUENCY),
            rng_seed: None,
        }
    }
}

/// Clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}
