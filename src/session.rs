#![forbid(unsafe_code)]

use log::*;

use crate::engine::{Direction, Engine, EngineFactory, Flush, Level, Status, Step};
use crate::error::SessionError;

////////////////////////////////////////////////////////////////////////////////

pub const DEFAULT_CAPACITY: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Size of both the input and the output buffer.
    pub capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Bytes `offset..offset + len` of a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Chunk {
    pub offset: usize,
    pub len: usize,
}

impl Chunk {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Drop the first `n` bytes.
    pub fn advance(&mut self, n: usize) {
        assert!(n <= self.len);
        self.offset += n;
        self.len -= n;
    }
}

////////////////////////////////////////////////////////////////////////////////

/// One compress or decompress operation: the engine and both buffers.
///
/// The engine is torn down exactly once, either by an explicit [`release`] or
/// when the session is dropped, whichever comes first.
///
/// [`release`]: Session::release
pub struct Session<E: Engine> {
    direction: Direction,
    engine: Option<E>,
    input: Vec<u8>,
    output: Vec<u8>,
    pending_in: Chunk,
    filled_out: usize,
    complete: bool,
    released: bool,
}

impl<E: Engine> Session<E> {
    pub fn open<F>(
        factory: &F,
        direction: Direction,
        level: Level,
        config: &SessionConfig,
    ) -> Result<Self, SessionError>
    where
        F: EngineFactory<Engine = E>,
    {
        if config.capacity == 0 {
            return Err(SessionError::InvalidCapacity);
        }
        let engine = factory
            .init(direction, level)
            .map_err(|err| SessionError::EngineInit {
                direction: direction.engine_name(),
                message: err.0,
            })?;
        info!(
            "opened {} session, {} byte buffers",
            direction, config.capacity
        );
        Ok(Self {
            direction,
            engine: Some(engine),
            input: vec![0; config.capacity],
            output: vec![0; config.capacity],
            pending_in: Chunk::default(),
            filled_out: 0,
            complete: false,
            released: false,
        })
    }

    pub fn capacity(&self) -> usize {
        self.input.len()
    }

    pub fn available_in(&self) -> usize {
        self.pending_in.len
    }

    pub fn available_out(&self) -> usize {
        self.output.len() - self.filled_out
    }

    pub fn is_output_full(&self) -> bool {
        self.available_out() == 0
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Whole input buffer, to be refilled from the source.
    pub fn input_mut(&mut self) -> &mut [u8] {
        &mut self.input
    }

    /// Mark the first `len` bytes of the input buffer as pending.
    pub fn set_input(&mut self, len: usize) {
        assert!(len <= self.input.len());
        self.pending_in = Chunk::new(0, len);
    }

    pub fn input(&self) -> &[u8] {
        &self.input[self.pending_in.offset..self.pending_in.end()]
    }

    /// Bytes produced by the engine and not yet drained.
    pub fn output(&self) -> &[u8] {
        &self.output[..self.filled_out]
    }

    pub fn reset_output(&mut self) {
        self.filled_out = 0;
    }

    /// Run the engine once over the pending input and the free output space.
    pub fn step(&mut self, flush: Flush) -> Result<Step, SessionError> {
        if self.complete {
            return Err(SessionError::Codec(
                "engine stepped after end of stream".to_owned(),
            ));
        }
        let engine = self
            .engine
            .as_mut()
            .ok_or_else(|| SessionError::Codec("session already released".to_owned()))?;

        let input = &self.input[self.pending_in.offset..self.pending_in.end()];
        let output = &mut self.output[self.filled_out..];
        let step = engine
            .step(input, output, flush)
            .map_err(|err| SessionError::Codec(err.0))?;
        if step.consumed > self.pending_in.len {
            return Err(SessionError::Codec(
                "engine consumed more than offered".to_owned(),
            ));
        }
        if step.produced > self.output.len() - self.filled_out {
            return Err(SessionError::Codec(
                "engine produced more than it had room for".to_owned(),
            ));
        }

        self.pending_in.advance(step.consumed);
        self.filled_out += step.produced;
        self.complete = step.status == Status::StreamComplete;
        trace!(
            "{} step: consumed {}, produced {}, {:?}",
            self.direction,
            step.consumed,
            step.produced,
            step.status
        );
        Ok(step)
    }

    /// Tear down the engine and free both buffers. Only the first call does
    /// anything; later calls return `Ok(())`.
    pub fn release(&mut self) -> Result<(), SessionError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.input = Vec::new();
        self.output = Vec::new();
        self.pending_in = Chunk::default();
        self.filled_out = 0;

        let result = match self.engine.take() {
            Some(mut engine) => engine
                .teardown()
                .map_err(|err| SessionError::EngineTeardown(err.0)),
            None => Ok(()),
        };
        debug!("released {} session", self.direction);
        result
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("[{}] {}", err.code(), err);
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
