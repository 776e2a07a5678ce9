//! xrd-rs - Main Entry Point
//!
//! Parses the command line and hands over to [`xrd_rs::app::run_main`].

use clap::Parser;
use xrd_rs::cli::Args;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    xrd_rs::app::run_main(args)?;
    Ok(())
}
