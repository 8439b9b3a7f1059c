#![forbid(unsafe_code)]

use std::io;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////

/// Why a compress or decompress session failed.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("buffer capacity must be positive")]
    InvalidCapacity,

    #[error("failed to initialize {direction} engine: {message}")]
    EngineInit {
        direction: &'static str,
        message: String,
    },

    #[error("codec error: {0}")]
    Codec(String),

    #[error("failed to read source: {0}")]
    IoRead(#[source] io::Error),

    #[error("short write: {written} of {requested} bytes reached the sink")]
    IoWrite { requested: usize, written: usize },

    #[error("failed to tear down engine: {0}")]
    EngineTeardown(String),
}

impl SessionError {
    /// Stable diagnostic code, printed next to the message in logs.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidCapacity => -6,
            Self::EngineInit { .. } => -1,
            Self::Codec(_) => -2,
            Self::IoWrite { .. } => -3,
            Self::IoRead(_) => -4,
            Self::EngineTeardown(_) => -5,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
