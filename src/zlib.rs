#![forbid(unsafe_code)]

use std::io::Read;

use anyhow::{ensure, Result};
use byteorder::{BigEndian, ReadBytesExt};

////////////////////////////////////////////////////////////////////////////////

const CM_DEFLATE: u8 = 8;
const MAX_CINFO: u8 = 7;

const FDICT_OFFSET: u8 = 5;
const FLEVEL_OFFSET: u8 = 6;

pub const HEADER_LEN: usize = 2;
pub const TRAILER_LEN: usize = 4;

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionMethod {
    Deflate,
    Unknown(u8),
}

impl From<u8> for CompressionMethod {
    fn from(value: u8) -> Self {
        match value {
            CM_DEFLATE => Self::Deflate,
            x => Self::Unknown(x),
        }
    }
}

/// The FLEVEL hint written by the compressor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelHint {
    Fastest,
    Fast,
    Default,
    Maximum,
}

impl From<u8> for LevelHint {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            _ => Self::Maximum,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// The two leading bytes of a zlib stream (RFC 1950).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZlibHeader {
    pub compression_method: CompressionMethod,
    pub window_size: usize,
    pub has_dictionary: bool,
    pub level: LevelHint,
}

impl ZlibHeader {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let word = reader.read_u16::<BigEndian>()?;
        ensure!(word % 31 == 0, "header check failed");

        let [cmf, flg] = word.to_be_bytes();
        let compression_method = CompressionMethod::from(cmf & 0x0f);
        ensure!(
            compression_method == CompressionMethod::Deflate,
            "unsupported compression method"
        );
        let cinfo = cmf >> 4;
        ensure!(cinfo <= MAX_CINFO, "window size too large");

        Ok(Self {
            compression_method,
            window_size: 1 << (cinfo + 8),
            has_dictionary: (flg >> FDICT_OFFSET) & 1 != 0,
            level: LevelHint::from(flg >> FLEVEL_OFFSET),
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        ensure!(bytes.len() >= HEADER_LEN, "stream too short for a header");
        Self::read(&mut &bytes[..HEADER_LEN])
    }
}

/// Adler-32 of the uncompressed data, stored big-endian in the last four
/// bytes of `stream`.
pub fn read_trailer(stream: &[u8]) -> Result<u32> {
    ensure!(stream.len() >= TRAILER_LEN, "stream too short for a trailer");
    let mut tail = &stream[stream.len() - TRAILER_LEN..];
    Ok(tail.read_u32::<BigEndian>()?)
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_header() -> Result<()> {
        let header = ZlibHeader::parse(&[0x78, 0x9c])?;
        assert_eq!(header.compression_method, CompressionMethod::Deflate);
        assert_eq!(header.window_size, 32768);
        assert!(!header.has_dictionary);
        assert_eq!(header.level, LevelHint::Default);
        Ok(())
    }

    #[test]
    fn parse_level_hints() -> Result<()> {
        assert_eq!(ZlibHeader::parse(&[0x78, 0x01])?.level, LevelHint::Fastest);
        assert_eq!(ZlibHeader::parse(&[0x78, 0x5e])?.level, LevelHint::Fast);
        assert_eq!(ZlibHeader::parse(&[0x78, 0xda])?.level, LevelHint::Maximum);
        Ok(())
    }

    #[test]
    fn parse_dictionary_flag() -> Result<()> {
        let header = ZlibHeader::parse(&[0x78, 0xbb])?;
        assert!(header.has_dictionary);
        Ok(())
    }

    #[test]
    fn reject_bad_headers() {
        assert!(ZlibHeader::parse(&[0x78]).is_err());
        assert!(ZlibHeader::parse(&[0x78, 0x9d]).is_err());
        assert!(ZlibHeader::parse(&[0x1f, 0x8b]).is_err());
        // CM = 15, checksum valid.
        assert!(ZlibHeader::parse(&[0x7f, 0x07]).is_err());
    }

    #[test]
    fn trailer() -> Result<()> {
        // zlib stream of the single byte "a".
        let stream = [0x78, 0x9c, 0x4b, 0x04, 0x00, 0x00, 0x62, 0x00, 0x62];
        assert_eq!(read_trailer(&stream)?, 0x0062_0062);
        assert_eq!(read_trailer(&stream[5..])?, 0x0062_0062);
        assert!(read_trailer(&stream[..3]).is_err());
        Ok(())
    }
}
