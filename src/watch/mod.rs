//! File watching and build driving.
//!
//! # Data Flow
//! ```text
//! notify (watch.paths)
//!     → watcher.rs (ignore patterns, per-path debounce) → FileChange
//!     → driver.rs
//!         configuration file             → WatchEvent::Build (no compile)
//!         source extension → compiler.rs → WatchEvent::Build
//!         anything else                  → WatchEvent::Change
//!     → reload::Orchestrator
//!
//! WatchEvent::Change → assets.rs (css → public/main.css, others no-op)
//! ```

pub mod assets;
pub mod compiler;
pub mod driver;
pub mod watcher;

pub use assets::{AssetAction, AssetError, AssetHandlers};
pub use compiler::{CommandCompiler, CompileReport, Compiler};
pub use driver::BuildDriver;
pub use watcher::{project_relative, FileChange, ProjectWatcher};
