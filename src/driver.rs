#![forbid(unsafe_code)]

//! Bounded-buffer streaming loops for both directions.

use std::io::{self, Read, Write};

use log::*;

use crate::engine::{Direction, Engine, EngineFactory, Flush, Level};
use crate::error::SessionError;
use crate::session::{Session, SessionConfig};
use crate::tracking_writer::TrackingWriter;
use crate::zlib::{self, ZlibHeader, HEADER_LEN, TRAILER_LEN};

////////////////////////////////////////////////////////////////////////////////

/// What a finished session moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Report {
    pub direction: Direction,
    pub bytes_read: u64,
    pub bytes_written: u64,
    /// CRC-32 of everything the sink accepted.
    pub crc32: u32,
    /// Source reads issued, including the final short or empty one. The
    /// source is never polled again after a short read.
    pub reads: usize,
    /// Drains the sink did not fully accept. Always zero for compression.
    pub short_writes: usize,
}

struct Pump<R, W> {
    source: R,
    sink: TrackingWriter<W>,
    bytes_read: u64,
    reads: usize,
    exhausted: bool,
    /// Last bytes the sink accepted, at most `TRAILER_LEN`.
    tail: Vec<u8>,
}

impl<R: Read, W: Write> Pump<R, W> {
    fn new(source: R, sink: W) -> Self {
        Self {
            source,
            sink: TrackingWriter::new(sink),
            bytes_read: 0,
            reads: 0,
            exhausted: false,
            tail: Vec::with_capacity(TRAILER_LEN),
        }
    }

    /// Fill `buf` from the source, stopping early only at end of input.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, SessionError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(SessionError::IoRead(err)),
            }
        }
        self.reads += 1;
        self.bytes_read += filled as u64;
        if filled < buf.len() {
            self.exhausted = true;
        }
        debug!("read {} bytes from source", filled);
        Ok(filled)
    }

    fn refill<E: Engine>(&mut self, session: &mut Session<E>) -> Result<usize, SessionError> {
        let n = if self.exhausted {
            0
        } else {
            self.read_chunk(session.input_mut())?
        };
        session.set_input(n);
        Ok(n)
    }

    /// Hand the produced bytes to the sink. `Err` carries the short write,
    /// the caller decides whether it is fatal.
    fn drain<E: Engine>(&mut self, session: &mut Session<E>) -> Result<(), SessionError> {
        let requested = session.output().len();
        let written = self.sink.write_chunk(session.output());
        let accepted = &session.output()[..written];
        self.tail
            .extend_from_slice(&accepted[accepted.len().saturating_sub(TRAILER_LEN)..]);
        let excess = self.tail.len().saturating_sub(TRAILER_LEN);
        self.tail.drain(..excess);
        session.reset_output();
        if written == requested {
            Ok(())
        } else {
            Err(SessionError::IoWrite { requested, written })
        }
    }

    fn finish(self, direction: Direction) -> Report {
        let short_writes = self.sink.short_writes();
        let bytes_written = self.sink.byte_count();
        let (crc32, mut sink) = self.sink.crc32();
        if let Err(err) = sink.flush() {
            warn!("failed to flush sink: {}", err);
        }
        Report {
            direction,
            bytes_read: self.bytes_read,
            bytes_written,
            crc32,
            reads: self.reads,
            short_writes,
        }
    }
}

fn log_header(bytes: &[u8]) {
    match ZlibHeader::parse(bytes) {
        Ok(header) => debug!(
            "zlib header: {:?}, window {}, dictionary {}, level {:?}",
            header.compression_method, header.window_size, header.has_dictionary, header.level
        ),
        Err(err) => debug!("no valid zlib header: {}", err),
    }
}

fn log_trailer(tail: &[u8]) {
    match zlib::read_trailer(tail) {
        Ok(adler) => debug!("zlib trailer: adler32 {:#010x}", adler),
        Err(err) => debug!("no zlib trailer: {}", err),
    }
}

////////////////////////////////////////////////////////////////////////////////

fn pump_compress<E, R, W>(
    session: &mut Session<E>,
    pump: &mut Pump<R, W>,
) -> Result<(), SessionError>
where
    E: Engine,
    R: Read,
    W: Write,
{
    let mut flush = Flush::NoFlush;
    let mut header_seen = false;

    loop {
        if session.available_in() == 0 {
            let n = pump.refill(session)?;
            if n < session.capacity() && flush == Flush::NoFlush {
                debug!("end of input, finishing stream");
                flush = Flush::Finish;
            }
        }

        session.step(flush)?;

        if !header_seen && session.output().len() >= HEADER_LEN {
            header_seen = true;
            log_header(session.output());
        }

        if session.is_output_full() {
            pump.drain(session)?;
        }

        if session.is_complete() {
            break;
        }
    }

    pump.drain(session)?;
    log_trailer(&pump.tail);
    Ok(())
}

fn pump_decompress<E, R, W>(
    session: &mut Session<E>,
    pump: &mut Pump<R, W>,
) -> Result<(), SessionError>
where
    E: Engine,
    R: Read,
    W: Write,
{
    let mut first_read = true;

    loop {
        if session.available_in() == 0 {
            pump.refill(session)?;
            if first_read {
                first_read = false;
                log_header(session.input());
            }
        }

        session.step(Flush::NoFlush)?;

        if session.is_output_full() {
            if let Err(err) = pump.drain(session) {
                warn!("[{}] {}", err.code(), err);
            }
        }

        if session.is_complete() {
            break;
        }
    }

    if session.available_in() > 0 {
        debug!("ignoring {} bytes after end of stream", session.available_in());
    }

    if let Err(err) = pump.drain(session) {
        warn!("[{}] {}", err.code(), err);
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////

type PumpFn<E, R, W> = fn(&mut Session<E>, &mut Pump<R, W>) -> Result<(), SessionError>;

fn run<F, R, W>(
    factory: &F,
    direction: Direction,
    level: Level,
    source: R,
    sink: W,
    config: &SessionConfig,
    pump_fn: PumpFn<F::Engine, R, W>,
) -> Result<Report, SessionError>
where
    F: EngineFactory,
    R: Read,
    W: Write,
{
    let mut session = match Session::open(factory, direction, level, config) {
        Ok(session) => session,
        Err(err) => {
            error!("[{}] {}", err.code(), err);
            return Err(err);
        }
    };
    let mut pump = Pump::new(source, sink);

    let result = pump_fn(&mut session, &mut pump).and_then(|()| session.release());
    if let Err(err) = result {
        if let Err(teardown) = session.release() {
            debug!("ignoring teardown failure after error: {}", teardown);
        }
        error!("[{}] {} failed: {}", err.code(), direction, err);
        return Err(err);
    }

    let report = pump.finish(direction);
    info!(
        "{}: {} bytes in, {} bytes out, crc32 {:#010x}",
        direction, report.bytes_read, report.bytes_written, report.crc32
    );
    Ok(report)
}

/// Compress `source` into a zlib stream on `sink` with engines from `factory`.
///
/// A sink that does not take a whole chunk aborts the session.
pub fn compress_with<F, R, W>(
    factory: &F,
    source: R,
    sink: W,
    level: Level,
    config: &SessionConfig,
) -> Result<Report, SessionError>
where
    F: EngineFactory,
    R: Read,
    W: Write,
{
    run(
        factory,
        Direction::Compress,
        level,
        source,
        sink,
        config,
        pump_compress,
    )
}

/// Decode the zlib stream in `source` onto `sink` with engines from `factory`.
///
/// Stops at the end of the first stream; trailing bytes are ignored. Short
/// writes to the sink are logged and counted in the report, not fatal.
pub fn decompress_with<F, R, W>(
    factory: &F,
    source: R,
    sink: W,
    config: &SessionConfig,
) -> Result<Report, SessionError>
where
    F: EngineFactory,
    R: Read,
    W: Write,
{
    run(
        factory,
        Direction::Decompress,
        Level::default(),
        source,
        sink,
        config,
        pump_decompress,
    )
}

////////////////////////////////////////////////////////////////////////////////
