//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, EnvFilter)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! Reload progress is additionally pushed to browsers as server-sent
//! events; see `reload::events`.

pub mod logging;
pub mod metrics;
