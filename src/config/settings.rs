//! Application settings
//!
//! Settings are read from `settings.toml` in the app data directory. Every
//! field has a default, so a partial (or missing) file is fine.
//!
//! # Cache modes
//!
//! - `FILE` - results are read from and written to the on-disk cache
//! - `FILE_FETCH_ONLY` - the on-disk cache is read but never written
//! - `MEMORY` - an in-process cache, dropped on exit
//!
//! Worker threads run with [`Settings::for_worker`], which turns `FILE` into
//! `FILE_FETCH_ONLY` so only the main thread writes to disk.

use crate::config::{app_data_dir, ensure_app_data_dir, SETTINGS_FILE};
use crate::error::{Result, XrdError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default cache size ceiling (500 MB)
pub const DEFAULT_CACHE_SIZE: u64 = 500 * 1024 * 1024;

/// Default number of tasks a worker runs before it is replaced
pub const DEFAULT_MAX_TASKS_PER_WORKER: usize = 100;

/// Where computation results are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheMode {
    #[default]
    File,
    Memory,
    FileFetchOnly,
}

impl std::fmt::Display for CacheMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheMode::File => write!(f, "FILE"),
            CacheMode::Memory => write!(f, "MEMORY"),
            CacheMode::FileFetchOnly => write!(f, "FILE_FETCH_ONLY"),
        }
    }
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Verbose logging on the console and in the log file
    pub debug: bool,

    /// Running without an interactive frontend (scripts, workers)
    pub no_gui: bool,

    pub cache: CacheMode,

    /// Size ceiling in bytes; a larger on-disk cache is cleared at startup
    pub cache_size: u64,

    pub cache_dir: PathBuf,

    /// Log file, truncated at startup
    pub log_filename: PathBuf,

    /// Worker threads in the pool (number of CPUs when unset)
    pub pool_workers: Option<usize>,

    pub max_tasks_per_worker: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let base = app_data_dir().unwrap_or_else(|| std::env::temp_dir().join(super::APP_ID));
        Self {
            debug: false,
            no_gui: false,
            cache: CacheMode::default(),
            cache_size: DEFAULT_CACHE_SIZE,
            cache_dir: base.join("cache"),
            log_filename: base.join("logs").join("errors.log"),
            pool_workers: None,
            max_tasks_per_worker: DEFAULT_MAX_TASKS_PER_WORKER,
        }
    }
}

impl Settings {
    /// Path of the settings file in the app data directory
    pub fn default_path() -> Option<PathBuf> {
        app_data_dir().map(|p| p.join(SETTINGS_FILE))
    }

    /// Load settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            XrdError::Configuration(format!("Failed to read settings {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            XrdError::Configuration(format!("Failed to parse settings {:?}: {}", path, e))
        })
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save settings as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| XrdError::Serialization(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|e| {
            XrdError::Configuration(format!("Failed to write settings {:?}: {}", path, e))
        })
    }

    /// Save settings to the default location
    pub fn save_default(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save(dir.join(SETTINGS_FILE))
    }

    /// Apply command-line overrides
    pub fn apply_runtime_settings(&mut self, no_gui: bool, debug: bool) {
        self.no_gui = no_gui;
        self.debug = self.debug || debug;
        tracing::debug!(
            "Runtime settings: no_gui={}, debug={}, cache={}",
            self.no_gui,
            self.debug,
            self.cache
        );
    }

    /// Copy of these settings for a pool worker
    pub fn for_worker(&self) -> Self {
        let mut settings = self.clone();
        if settings.cache == CacheMode::File {
            settings.cache = CacheMode::FileFetchOnly;
        }
        settings.no_gui = true;
        settings
    }
}
