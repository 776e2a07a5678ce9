//! Application bootstrap
//!
//! Startup order:
//!
//! 1. Parse arguments and load settings
//! 2. Apply runtime settings and set up logging
//! 3. Start the worker pool
//! 4. Cache housekeeping (file cache only)
//! 5. Run the user script, or the headless session
//!
//! The pool is closed and joined on the way out, however step 5 ends. The
//! log writer outlives the pool so its shutdown is logged too.

use crate::cache::ComputationCache;
use crate::cli::Args;
use crate::config::Settings;
use crate::error::{Result, XrdError};
use crate::logging::setup_logging;
use crate::pool::{PoolConfig, WorkerPool};
use crate::scripting::ScriptRunner;
use crate::session::run_session;
use std::io::Write;
use tracing_appender::non_blocking::WorkerGuard;

/// Run with settings from the default location
pub fn run_main(args: Args) -> Result<()> {
    let settings = Settings::load_or_default();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_with_settings(&args, settings, &mut out)
}

/// Run with explicit settings, writing session output to `out`
pub fn run_with_settings(args: &Args, mut settings: Settings, out: &mut dyn Write) -> Result<()> {
    settings.apply_runtime_settings(args.script.is_some(), args.debug);
    let _guard = init_logging(&settings);

    WorkerPool::scope(PoolConfig::from_settings(&settings), |pool| {
        let cache = ComputationCache::from_settings(&settings)?;
        cache.housekeeping(args.clear_cache, settings.cache_size)?;

        match &args.script {
            Some(script) => {
                let runner = ScriptRunner::load(script)?;
                let result = runner.run(args.to_script_map())?;
                tracing::debug!("Script returned {}", result);
                Ok(())
            }
            None => {
                run_session(args.filename.as_deref(), pool, &cache, out)?;
                Ok(())
            }
        }
    })
}

fn init_logging(settings: &Settings) -> Option<WorkerGuard> {
    match setup_logging(settings.debug, &settings.log_filename) {
        Ok(guard) => Some(guard),
        Err(XrdError::Configuration(msg)) => {
            tracing::debug!("{}", msg);
            None
        }
        Err(e) => {
            eprintln!("Could not set up logging to {:?}: {}", settings.log_filename, e);
            None
        }
    }
}
