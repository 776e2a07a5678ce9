//! # xrd-rs: X-ray diffraction modelling shell
//!
//! The application shell of an XRD modelling tool: bootstrap, settings,
//! logging, computation cache, worker pool and user scripts, plus the pieces
//! a tabular frontend builds on.
//!
//! ## Architecture
//!
//! - **Model**: domain objects described by static schemas, held in
//!   observable [`model::ObjectList`]s
//! - **Store**: [`store::ObjectListStore`] mirrors an object list into typed
//!   table columns and stays in sync through list notifications
//! - **Mathtext**: translation of label markup for plots and plain text
//! - **Pool**: explicit worker pool handle with recycled workers
//! - **Scripting**: Rhai user scripts with a `run(args)` entry point
//!
//! ## Configuration
//!
//! Settings live in `settings.toml` in the platform data directory under
//! `org.pyxrd.xrd-rs`:
//!
//! - **Linux**: `~/.local/share/org.pyxrd.xrd-rs/`
//! - **macOS**: `~/Library/Application Support/org.pyxrd.xrd-rs/`
//! - **Windows**: `%APPDATA%\org.pyxrd.xrd-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use xrd_rs::project::{Phase, Project};
//! use xrd_rs::store::ObjectStoreBuilder;
//!
//! let mut project = Project::new("Clay mix");
//! let store = ObjectStoreBuilder::new()
//!     .list_property(&mut project, "phases")
//!     .build()?;
//!
//! project.phases.push(Phase::new("Illite", 0.7));
//! assert_eq!(store.borrow().len(), 1);
//! ```

pub mod app;
pub mod binding;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mathtext;
pub mod model;
pub mod pool;
pub mod project;
pub mod scripting;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use binding::ChoiceBinding;
pub use config::Settings;
pub use error::{Result, XrdError};
pub use mathtext::{handle_customs, plot_safe, string_safe};
pub use model::{Model, ModelType, ObjectList, Schema};
pub use pool::WorkerPool;
pub use store::{ObjectListStore, ObjectStoreBuilder};
pub use types::{ColumnType, ObjectRef, Value};
