use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::control::{validate_frequency, DEFAULT_CPU_FREQUENCY};
use crate::error::ConfigError;
use crate::video::PalettePolicy;

/// Studio settings, read from an optional JSON file and then overridden from
/// the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frequency_hz: i64,
    pub palette: PalettePolicy,
    /// start stepping immediately instead of paused
    pub start_running: bool,
    /// beep through the PC speaker
    pub sound: bool,
    /// front end redraw rate
    pub frame_rate: f64,
    /// program image to boot, raw bytes
    pub rom: Option<PathBuf>,
    /// hex listing to assemble and boot; wins over `rom`
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frequency_hz: i64::from(DEFAULT_CPU_FREQUENCY.get()),
            palette: PalettePolicy::default(),
            start_running: false,
            sound: false,
            frame_rate: 60.0,
            rom: None,
            source: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// check everything that must hold before the scheduler starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_frequency(self.frequency_hz)?;
        if !(self.frame_rate > 0.0 && self.frame_rate.is_finite()) {
            return Err(ConfigError::FrameRate(self.frame_rate));
        }
        Ok(())
    }
}
