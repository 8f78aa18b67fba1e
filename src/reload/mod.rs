//! Hot reload subsystem.
//!
//! # Data Flow
//! ```text
//! WatchEvent::Build (compiler finished)
//!     → state.rs (RestartGate: start, drop, or queue)
//!     → orchestrator.rs (winner runs the cycle):
//!         file_changed
//!         → stop listener          (listener_stopped)
//!         → invalidate modules     (cache_invalidated)
//!         → regenerate service     (service_generated, service paths only)
//!         → rebuild route table    (routes_rebuilt)
//!         → start listener         (listener_started)
//!         → reload_finished
//!
//! WatchEvent::Change (stylesheet, SQL, ...)
//!     → watch::assets handler (asset_handled), no restart
//! ```
//!
//! # Design Decisions
//! - Exactly one cycle runs at a time; the overlap policy decides what
//!   happens to events arriving meanwhile
//! - A failed build never stops the running listener

pub mod events;
pub mod orchestrator;
pub mod state;

pub use events::{BuildEvent, ReloadNotice, ReloadOutcome, WatchEvent};
pub use orchestrator::{Orchestrator, ReloadError, SERVICE_INTERFACE_FILE};
pub use state::{Admission, OverlapPolicy, QueuedCycle, RestartGate, RestartState};
