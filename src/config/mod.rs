//! Configuration module for xrd-rs
//!
//! Settings file and application data directory. Data lives under the
//! platform data directory:
//! - **Linux**: `~/.local/share/org.pyxrd.xrd-rs/`
//! - **macOS**: `~/Library/Application Support/org.pyxrd.xrd-rs/`
//! - **Windows**: `%APPDATA%\org.pyxrd.xrd-rs\`
//!
//! # Files
//!
//! - `settings.toml` - [`Settings`]
//! - `cache/` - on-disk computation cache
//! - `logs/errors.log` - log file, truncated on every start

pub mod settings;

pub use settings::*;

use crate::error::{Result, XrdError};
use std::path::PathBuf;

/// Application identifier for data directories
pub const APP_ID: &str = "org.pyxrd.xrd-rs";

/// Settings filename
pub const SETTINGS_FILE: &str = "settings.toml";

/// Platform data directory for this application
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// [`app_data_dir`], created if missing
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        XrdError::Configuration("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            XrdError::Configuration(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Byte count with a binary unit, e.g. `500.00 MB`
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} bytes", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}
