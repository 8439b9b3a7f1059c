#![forbid(unsafe_code)]

//! Codec engines driven by the streaming loop.
//!
//! The driver only sees the [`Engine`] trait: it hands over an input chunk and
//! some free output space, and gets back how much of each was used together
//! with the stream status. [`Flate2`] builds engines backed by the zlib state
//! machines of the `flate2` crate.

use std::{fmt, str::FromStr};

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress};
use log::*;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Compress,
    Decompress,
}

impl Direction {
    pub fn engine_name(self) -> &'static str {
        match self {
            Self::Compress => "deflate",
            Self::Decompress => "inflate",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.engine_name())
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Compression level, as selected by the `-l` digit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Level {
    NoCompression,
    BestSpeed,
    BestCompression,
    #[default]
    Default,
}

impl Level {
    pub const ALL: [Level; 4] = [
        Level::NoCompression,
        Level::BestSpeed,
        Level::BestCompression,
        Level::Default,
    ];
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown level: {0}")]
pub struct UnknownLevel(pub String);

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Self::NoCompression),
            "1" => Ok(Self::BestSpeed),
            "2" => Ok(Self::BestCompression),
            "3" => Ok(Self::Default),
            other => Err(UnknownLevel(other.to_owned())),
        }
    }
}

impl From<Level> for Compression {
    fn from(level: Level) -> Compression {
        match level {
            Level::NoCompression => Compression::none(),
            Level::BestSpeed => Compression::fast(),
            Level::BestCompression => Compression::best(),
            Level::Default => Compression::default(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Whether more input will follow the current step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Flush {
    #[default]
    NoFlush,
    Finish,
}

impl From<Flush> for FlushCompress {
    fn from(flush: Flush) -> FlushCompress {
        match flush {
            Flush::NoFlush => FlushCompress::None,
            Flush::Finish => FlushCompress::Finish,
        }
    }
}

impl From<Flush> for FlushDecompress {
    fn from(flush: Flush) -> FlushDecompress {
        match flush {
            Flush::NoFlush => FlushDecompress::None,
            Flush::Finish => FlushDecompress::Finish,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    StreamComplete,
}

/// Outcome of a single [`Engine::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub consumed: usize,
    pub produced: usize,
    pub status: Status,
}

/// Diagnostic message reported by an engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

////////////////////////////////////////////////////////////////////////////////

pub trait Engine {
    /// Consume a prefix of `input` and fill a prefix of `output`.
    fn step(&mut self, input: &[u8], output: &mut [u8], flush: Flush)
        -> Result<Step, EngineError>;

    /// Release engine state. Called once per engine.
    fn teardown(&mut self) -> Result<(), EngineError>;
}

pub trait EngineFactory {
    type Engine: Engine;

    fn init(&self, direction: Direction, level: Level) -> Result<Self::Engine, EngineError>;
}

////////////////////////////////////////////////////////////////////////////////

/// Builds zlib-format engines on top of `flate2`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Flate2;

impl EngineFactory for Flate2 {
    type Engine = ZlibEngine;

    fn init(&self, direction: Direction, level: Level) -> Result<ZlibEngine, EngineError> {
        debug!("{} engine, level {:?}", direction, level);
        Ok(match direction {
            Direction::Compress => ZlibEngine::Deflate {
                stream: Compress::new(level.into(), true),
                finished: false,
            },
            Direction::Decompress => ZlibEngine::Inflate {
                stream: Decompress::new(true),
                finished: false,
            },
        })
    }
}

pub enum ZlibEngine {
    Deflate { stream: Compress, finished: bool },
    Inflate { stream: Decompress, finished: bool },
}

impl Engine for ZlibEngine {
    fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: Flush,
    ) -> Result<Step, EngineError> {
        match self {
            Self::Deflate { stream, finished } => {
                let before_in = stream.total_in();
                let before_out = stream.total_out();
                let status = stream
                    .compress(input, output, flush.into())
                    .map_err(|err| EngineError(err.to_string()))?;
                let consumed = (stream.total_in() - before_in) as usize;
                let produced = (stream.total_out() - before_out) as usize;
                let step = classify(status, consumed, produced, "deflate made no progress")?;
                *finished |= step.status == Status::StreamComplete;
                Ok(step)
            }
            Self::Inflate { stream, finished } => {
                let before_in = stream.total_in();
                let before_out = stream.total_out();
                let status = stream
                    .decompress(input, output, flush.into())
                    .map_err(|err| match err.needs_dictionary() {
                        Some(adler) => {
                            EngineError(format!("preset dictionary {:#010x} required", adler))
                        }
                        None => EngineError(err.to_string()),
                    })?;
                let consumed = (stream.total_in() - before_in) as usize;
                let produced = (stream.total_out() - before_out) as usize;
                let step = classify(
                    status,
                    consumed,
                    produced,
                    "unexpected end of compressed stream",
                )?;
                *finished |= step.status == Status::StreamComplete;
                Ok(step)
            }
        }
    }

    fn teardown(&mut self) -> Result<(), EngineError> {
        match self {
            Self::Deflate { finished, .. } if !*finished => {
                Err(EngineError("deflate stream freed prematurely".to_owned()))
            }
            _ => Ok(()),
        }
    }
}

/// A buffer error is only fatal when the engine could do nothing at all.
fn classify(
    status: flate2::Status,
    consumed: usize,
    produced: usize,
    stalled: &str,
) -> Result<Step, EngineError> {
    let status = match status {
        flate2::Status::Ok => Status::Ok,
        flate2::Status::StreamEnd => Status::StreamComplete,
        flate2::Status::BufError if consumed > 0 || produced > 0 => Status::Ok,
        flate2::Status::BufError => return Err(EngineError(stalled.to_owned())),
    };
    Ok(Step {
        consumed,
        produced,
        status,
    })
}

////////////////////////////////////////////////////////////////////////////////
