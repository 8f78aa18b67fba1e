//! hotdev: a development server that rebuilds itself on every change.
//!
//! Resource routes come from `hotdev.toml`, controllers and services from
//! the compiled output of a feature-oriented project. Every successful
//! build stops the listener, drops cached modules, regenerates the touched
//! service and starts a fresh listener.

// Core subsystems
pub mod config;
pub mod http;
pub mod modules;
pub mod routing;
pub mod rpc;

// Reload pipeline
pub mod reload;
pub mod watch;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::DevConfig;
pub use lifecycle::Shutdown;
pub use reload::Orchestrator;
