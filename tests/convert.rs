use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use ripdeflate::cli::{convert, Opts};
use ripdeflate::{Direction, Level, SessionConfig};

////////////////////////////////////////////////////////////////////////////////

struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    fn new(name: &str) -> Result<Self> {
        let dir = std::env::temp_dir()
            .join(format!("ripdeflate-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

////////////////////////////////////////////////////////////////////////////////

#[test]
fn file_round_trip() -> Result<()> {
    let scratch = Scratch::new("round-trip")?;
    let original = b"streaming through fixed buffers\n".repeat(1000);
    fs::write(scratch.path("plain"), &original)?;

    let config = SessionConfig::default();
    let report = convert(
        Direction::Compress,
        Level::BestCompression,
        &scratch.path("plain"),
        &scratch.path("packed.z"),
        &config,
    )?;
    let packed = fs::read(scratch.path("packed.z"))?;
    assert_eq!(report.bytes_written, packed.len() as u64);
    assert!(packed.len() < original.len());

    convert(
        Direction::Decompress,
        Level::Default,
        &scratch.path("packed.z"),
        &scratch.path("unpacked"),
        &config,
    )?;
    assert_eq!(fs::read(scratch.path("unpacked"))?, original);
    Ok(())
}

#[test]
fn missing_source() -> Result<()> {
    let scratch = Scratch::new("missing")?;
    let err = convert(
        Direction::Compress,
        Level::Default,
        &scratch.path("nope"),
        &scratch.path("out"),
        &SessionConfig::default(),
    )
    .unwrap_err();
    assert!(err.to_string().starts_with("cannot open source file"));
    assert!(!scratch.path("out").exists());
    Ok(())
}

#[test]
fn corrupt_input_reports_decompress_error() -> Result<()> {
    let scratch = Scratch::new("corrupt")?;
    fs::write(scratch.path("bad.z"), b"\x78\x9cgarbage")?;
    let err = convert(
        Direction::Decompress,
        Level::Default,
        &scratch.path("bad.z"),
        &scratch.path("out"),
        &SessionConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "decompress error");
    assert!(format!("{:#}", err).contains("codec error"));
    Ok(())
}

#[test]
fn invalid_level_fails_before_any_io() -> Result<()> {
    let scratch = Scratch::new("level")?;
    let src = scratch.path("src");
    let dst = scratch.path("dst");
    let args = [
        "ripdeflate".into(),
        "-l".into(),
        "9".into(),
        src.into_os_string(),
        dst.clone().into_os_string(),
    ];
    assert!(Opts::from_iter_safe(args).is_err());
    assert!(!dst.exists());
    Ok(())
}
