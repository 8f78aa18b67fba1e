//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! hotdev.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DevConfig (validated, immutable)
//!
//! On every reload cycle:
//!     orchestrator re-reads the file
//!     → loader.rs / validation.rs
//!     → fresh resource list for the route table
//!     (a broken file keeps the previous resources)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes are picked up by the next reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CompilerConfig, DevConfig, InvalidationMode, ObservabilityConfig, ProjectConfig,
    ReloadConfig, ServerConfig, WatchConfig,
};
pub use validation::ValidationError;
