//! User automation scripts
//!
//! A user script is a Rhai file defining a `run(args)` function. It is run
//! instead of the interactive session when `--script` is given; `args` is a
//! map of the command-line arguments (`filename`, `script`, `debug`,
//! `clear_cache`).
//!
//! ## Example Script
//!
//! ```rhai
//! fn run(args) {
//!     let project = load_project(args.filename);
//!     for phase in project.phases {
//!         print(phase.name + ": " + mt_frac(phase.weight_fraction));
//!     }
//! }
//! ```
//!
//! See [`engine`] for the functions available to scripts.

pub mod engine;

pub use engine::create_engine;

use crate::error::{Result, ResultExt, XrdError};
use rhai::{Dynamic, Engine, Map, Scope, AST};
use std::path::{Path, PathBuf};

/// Name of the entry point a script must define
pub const ENTRY_POINT: &str = "run";

/// A compiled user script
pub struct ScriptRunner {
    engine: Engine,
    ast: AST,
    path: PathBuf,
}

impl ScriptRunner {
    /// Compile a script file and check that it defines `run(args)`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let context = || format!("Error when trying to import {}", path.display());

        let engine = create_engine();
        let ast = engine
            .compile_file(path.to_path_buf())
            .with_context(context)?;

        let has_entry = ast
            .iter_functions()
            .any(|f| f.name == ENTRY_POINT && f.params.len() == 1);
        if !has_entry {
            return Err(XrdError::Script(format!(
                "script does not define {}(args)",
                ENTRY_POINT
            ))
            .with_context(context()));
        }

        tracing::debug!("Loaded user script {:?}", path);
        Ok(Self {
            engine,
            ast,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Call `run(args)`
    pub fn run(&self, args: Map) -> Result<Dynamic> {
        tracing::info!("Running user script {:?}", self.path);
        let mut scope = Scope::new();
        self.engine
            .call_fn::<Dynamic>(&mut scope, &self.ast, ENTRY_POINT, (args,))
            .with_context(|| format!("Error while running {}", self.path.display()))
    }
}

impl std::fmt::Debug for ScriptRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRunner")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, source: &str) -> PathBuf {
        let path = dir.path().join("user_script.rhai");
        std::fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_run_receives_args() {
        let dir = TempDir::new().unwrap();
        let path = write_script(
            &dir,
            r#"
            fn run(args) {
                if args.debug { "debug" } else { "quiet" }
            }
            "#,
        );
        let runner = ScriptRunner::load(&path).unwrap();

        let mut args = Map::new();
        args.insert("debug".into(), true.into());
        let result = runner.run(args).unwrap();
        assert_eq!(result.into_string().unwrap(), "debug");
    }

    #[test]
    fn test_missing_entry_point() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "fn main() { 1 }");
        let err = ScriptRunner::load(&path).unwrap_err();
        assert!(err.to_string().contains("Error when trying to import"));
        assert!(err.to_string().contains("user_script.rhai"));
        assert!(matches!(err.root(), XrdError::Script(_)));
    }

    #[test]
    fn test_syntax_error_is_annotated() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, "fn run(args) { let = ; }");
        let err = ScriptRunner::load(&path).unwrap_err();
        assert!(err.to_string().starts_with("Error when trying to import"));
    }

    #[test]
    fn test_missing_file_is_annotated() {
        let err = ScriptRunner::load("/no/such/script.rhai").unwrap_err();
        assert!(err.to_string().contains("/no/such/script.rhai"));
    }

    #[test]
    fn test_runtime_error() {
        let dir = TempDir::new().unwrap();
        let path = write_script(&dir, r#"fn run(args) { throw "nope"; }"#);
        let runner = ScriptRunner::load(&path).unwrap();
        assert!(runner.run(Map::new()).is_err());
    }
}
