//! Command-line arguments

use clap::Parser;
use rhai::Map;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Parser)]
#[command(name = "xrd-rs")]
#[command(about = "X-ray diffraction modelling shell")]
#[command(version)]
pub struct Args {
    /// A project filename
    pub filename: Option<PathBuf>,

    /// A script containing a run(args) function
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// Run in debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// Clear the cache (only relevant if using the filesystem cache)
    #[arg(short, long)]
    pub clear_cache: bool,
}

impl Args {
    /// Arguments as the map passed to a user script's `run`
    pub fn to_script_map(&self) -> Map {
        let path_text = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        let mut map = Map::new();
        map.insert("filename".into(), path_text(&self.filename).into());
        map.insert("script".into(), path_text(&self.script).into());
        map.insert("debug".into(), self.debug.into());
        map.insert("clear_cache".into(), self.clear_cache.into());
        map
    }
}
