#![forbid(unsafe_code)]

//! Command-line surface: option parsing, interactive file name prompts and
//! the file-to-file conversion used by the binary.

use std::fs::File;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::*;
use structopt::{clap::AppSettings, StructOpt};

use crate::engine::{Direction, Level};
use crate::session::{SessionConfig, DEFAULT_CAPACITY};
use crate::Report;

////////////////////////////////////////////////////////////////////////////////

/// Longest file name accepted from an interactive prompt, in bytes.
pub const MAX_LINE_LEN: usize = DEFAULT_CAPACITY - 1;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "ripdeflate",
    about = "Compress or decompress a file as a zlib stream.",
    global_settings = &[AppSettings::DisableVersion]
)]
pub struct Opts {
    /// Compress (default)
    #[structopt(short = "c")]
    pub compress: bool,

    /// Decompress
    #[structopt(short = "d")]
    pub decompress: bool,

    /// Compression level: 0 none, 1 best speed, 2 best compression, 3 default
    #[structopt(short = "l", default_value = "3")]
    pub level: Level,

    /// Print version information
    #[structopt(short = "v")]
    pub print_version: bool,

    /// Size of the input and output buffers, in bytes
    #[structopt(
        short = "b",
        long = "buffer-size",
        default_value = "4096",
        parse(try_from_str = parse_capacity)
    )]
    pub buffer_size: usize,

    /// More log output, repeat for more
    #[structopt(long = "verbose", parse(from_occurrences))]
    pub verbose: usize,

    /// No log output at all
    #[structopt(short = "q", long = "quiet")]
    pub quiet: bool,

    /// Source and destination; prompted for when omitted
    #[structopt(parse(from_os_str))]
    pub paths: Vec<PathBuf>,
}

fn parse_capacity(s: &str) -> Result<usize> {
    let capacity: usize = s.parse().context("buffer size must be a number")?;
    if capacity == 0 {
        bail!("buffer size must be positive");
    }
    Ok(capacity)
}

impl Opts {
    /// `-d` wins over `-c`.
    pub fn direction(&self) -> Direction {
        if self.decompress {
            Direction::Decompress
        } else {
            Direction::Compress
        }
    }

    pub fn config(&self) -> SessionConfig {
        SessionConfig {
            capacity: self.buffer_size,
        }
    }

    /// Errors and warnings by default.
    pub fn log_verbosity(&self) -> usize {
        1 + self.verbose
    }

    /// Source and destination given on the command line, `None` when they
    /// have to be prompted for.
    pub fn given_paths(&self) -> Result<Option<(PathBuf, PathBuf)>> {
        match self.paths.as_slice() {
            [] => Ok(None),
            [src, dst] => Ok(Some((src.clone(), dst.clone()))),
            other => bail!("expected a source and a destination, got {} paths", other.len()),
        }
    }
}

pub fn version_text() -> String {
    format!(
        "{} {}\ncodec: flate2 (zlib format)",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

////////////////////////////////////////////////////////////////////////////////

/// Print `prompt`, then read one line. The newline is dropped and the rest is
/// cut to [`MAX_LINE_LEN`] bytes.
pub fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> Result<String> {
    write!(output, "{}", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line).context("failed to read file name")?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }

    if line.len() > MAX_LINE_LEN {
        let mut end = MAX_LINE_LEN;
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        line.truncate(end);
    }
    Ok(line)
}

pub fn prompt_paths<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<(PathBuf, PathBuf)> {
    let src = prompt_line(input, output, "Input Source File Name:      ")?;
    let dst = prompt_line(input, output, "Input Destination File Name: ")?;
    Ok((src.into(), dst.into()))
}

////////////////////////////////////////////////////////////////////////////////

/// Convert the file at `src` into `dst`, creating or truncating `dst`.
pub fn convert(
    direction: Direction,
    level: Level,
    src: &Path,
    dst: &Path,
    config: &SessionConfig,
) -> Result<Report> {
    let input = File::open(src)
        .with_context(|| format!("cannot open source file: {}", src.display()))?;
    let output = File::create(dst)
        .with_context(|| format!("cannot open destination file: {}", dst.display()))?;
    info!("{} {} -> {}", direction, src.display(), dst.display());

    let report = match direction {
        Direction::Compress => crate::compress(input, output, level, config),
        Direction::Decompress => crate::decompress(input, output, config),
    };
    report.with_context(|| match direction {
        Direction::Compress => "compress error",
        Direction::Decompress => "decompress error",
    })
}

////////////////////////////////////////////////////////////////////////////////
