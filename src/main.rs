#![forbid(unsafe_code)]

use std::io;

use anyhow::{Context, Result};
use log::*;
use structopt::StructOpt;

use ripdeflate::cli::{self, Opts};

fn main() -> Result<()> {
    let opts = Opts::from_args();

    stderrlog::new()
        .module("ripdeflate")
        .verbosity(opts.log_verbosity())
        .quiet(opts.quiet)
        .init()
        .context("failed to initialize logging")?;

    if opts.print_version {
        println!("{}", cli::version_text());
        return Ok(());
    }

    let (src, dst) = match opts.given_paths() {
        Ok(Some((src, dst))) => {
            println!("src: {}", src.display());
            println!("dst: {}", dst.display());
            (src, dst)
        }
        Ok(None) => cli::prompt_paths(&mut io::stdin().lock(), &mut io::stdout())?,
        Err(err) => {
            eprintln!("{}", err);
            Opts::clap()
                .write_help(&mut io::stderr())
                .context("failed to print usage")?;
            eprintln!();
            std::process::exit(1);
        }
    };

    // Session failures are logged, not turned into an exit code.
    if let Err(err) = cli::convert(opts.direction(), opts.level, &src, &dst, &opts.config()) {
        error!("{:#}", err);
    }
    Ok(())
}
