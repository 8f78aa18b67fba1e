//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Apply CLI overrides → Logging/metrics
//!     → First build → First listener → Watcher + build driver
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Orchestrator loop exits → Listener drained → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then listener, then watching
//! - Listener shutdown is bounded by `server.shutdown_timeout_secs`

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, StartOptions, StartupError};
