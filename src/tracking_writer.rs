#![forbid(unsafe_code)]

use std::io::{self, Write};

use crc::{Crc, Digest};
use log::*;

////////////////////////////////////////////////////////////////////////////////

static CRC: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// Counts and hashes every byte the inner writer accepts.
pub struct TrackingWriter<T> {
    inner: T,
    byte_count: u64,
    short_writes: usize,
    digest: Digest<'static, u32>,
}

impl<T: Write> Write for TrackingWriter<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written_len = self.inner.write(buf)?;
        self.digest.update(&buf[..written_len]);
        self.byte_count += written_len as u64;
        Ok(written_len)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<T: Write> TrackingWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            byte_count: 0,
            short_writes: 0,
            digest: CRC.digest(),
        }
    }

    /// Write the whole chunk, retrying partial writes, and return how many
    /// bytes the inner writer took. Stops early when the writer accepts
    /// nothing or fails.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> usize {
        let mut written = 0;
        while written < chunk.len() {
            match self.write(&chunk[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    debug!("sink write failed: {}", err);
                    break;
                }
            }
        }
        if written < chunk.len() {
            self.short_writes += 1;
        }
        written
    }

    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    pub fn short_writes(&self) -> usize {
        self.short_writes
    }

    pub fn crc32(self) -> (u32, T) {
        (self.digest.finalize(), self.inner)
    }
}

////////////////////////////////////////////////////////////////////////////////
