//! Run configuration, loaded from YAML.
use chip8_core::prelude::*;
use serde::Deserialize;

use crate::error::AppError;

/// Number of frames to run when the config does not say, 10 seconds at 60Hz.
const DEFAULT_FRAMES: u64 = 600;

/// Settings for a headless run.
///
/// ```yaml
/// steps_per_frame: 12
/// frame_rate: 60
/// rng_seed: 1337
/// frames: 1200
/// keys: [5]
/// throttle: false
/// ```
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunConf {
    /// Machine settings share the top level of the document.
    #[serde(flatten)]
    pub vm: Chip8Conf,
    /// Frames to run before stopping and printing the display.
    pub frames: u64,
    /// Keycodes held down for the whole run.
    pub keys: Vec<u8>,
    /// Pace frames at the configured frame rate. When off, the machine
    /// runs as fast as possible, but timers still count per frame.
    pub throttle: bool,
}

impl Default for RunConf {
    fn default() -> Self {
        Self {
            vm: Chip8Conf::default(),
            frames: DEFAULT_FRAMES,
            keys: vec![],
            throttle: true,
        }
    }
}

impl RunConf {
    pub fn from_file(filepath: &str) -> Result<Self, AppError> {
        let file = std::fs::File::open(filepath)?;
        let conf: RunConf = serde_yaml::from_reader(file)?;
        log::debug!("loaded run config: {:#?}", conf);
        Ok(conf)
    }

    /// Keypad state to hand to the machine every frame.
    pub fn key_state(&self) -> Result<[bool; 16], AppError> {
        let mut keys = [false; 16];
        for key_id in &self.keys {
            let keycode = KeyCode::try_from(*key_id).map_err(Chip8Error::from)?;
            keys[keycode.as_u8() as usize] = true;
        }
        Ok(keys)
    }
}
