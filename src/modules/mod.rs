//! Compiled module cache.
//!
//! # Data Flow
//! ```text
//! logical id (controller action, service)
//!     → resolver.rs (latest compiled path)
//!     → registry.rs (cache hit, or miss → loader.rs reads artifact)
//!     → Arc<LoadedModule>
//!
//! Reload cycle:
//!     orchestrator → registry.invalidate(scope)
//!     → next load re-reads from the compiled output
//! ```
//!
//! # Design Decisions
//! - Invalidation is an explicit call, always made before the route table
//!   is rebuilt
//! - Handles are reference counted; stale handles stay valid for whoever
//!   still holds them but are never returned again

pub mod loader;
pub mod registry;
pub mod resolver;

pub use loader::{Exports, JsonModuleLoader, ModuleError, ModuleLoader};
pub use registry::{Invalidation, LoadedModule, ModuleRegistry};
pub use resolver::{ArtifactResolver, ModuleId};
