#![forbid(unsafe_code)]

use std::io::{Read, Write};

pub mod cli;
pub mod driver;
pub mod engine;
pub mod error;
pub mod session;
mod tracking_writer;
pub mod zlib;

pub use driver::{compress_with, decompress_with, Report};
pub use engine::{Direction, Flate2, Level};
pub use error::SessionError;
pub use session::{SessionConfig, DEFAULT_CAPACITY};

pub fn compress<R: Read, W: Write>(
    input: R,
    output: W,
    level: Level,
    config: &SessionConfig,
) -> Result<Report, SessionError> {
    compress_with(&Flate2, input, output, level, config)
}

pub fn decompress<R: Read, W: Write>(
    input: R,
    output: W,
    config: &SessionConfig,
) -> Result<Report, SessionError> {
    decompress_with(&Flate2, input, output, config)
}
