use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::assembler::Diagnostic;

/// Rejected configuration. Raised where a value is configured, never from
/// inside a scheduler tick.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cpu frequency must be a positive integer, got {0}")]
    NonPositiveFrequency(i64),

    #[error("cpu frequency {0} Hz is out of range")]
    FrequencyOutOfRange(i64),

    #[error("frame rate must be positive, got {0}")]
    FrameRate(f64),

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The studio could not be brought up.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start the scheduler thread: {0}")]
    Spawn(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("single step was not completed within {0:?}")]
    StepTimeout(Duration),
}

/// Assembly did not produce a replacement program; the loaded one is kept.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("assembly failed with {} diagnostic(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),

    #[error("assembly produced no output")]
    Empty,
}

impl AssembleError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            AssembleError::Diagnostics(d) => d,
            AssembleError::Empty => &[],
        }
    }
}
