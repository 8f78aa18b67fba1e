//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Table Build (every reload cycle):
//!     ResourceDescriptor[] (from hotdev.toml)
//!     → resource.rs (five CRUD routes per resource, depth-first)
//!     → handler.rs (bind each route to a controller action or stub)
//!     → table.rs (group per path, mount on axum Router)
//!
//! Incoming Request:
//!     → axum path match
//!     → BoundHandler::respond (controller export, or "You need to create ...")
//! ```
//!
//! # Design Decisions
//! - Tables are rebuilt, never patched; a reload swaps the whole Router
//! - Deterministic: the same descriptors always yield the same route order
//! - First registration wins on duplicate `(method, path)`

pub mod handler;
pub mod resource;
pub mod table;

pub use handler::{
    resolve_or_stub, BoundHandler, ControllerLookup, HandlerLookup, HandlerResolutionError,
};
pub use resource::{
    build_routes, Action, HandlerRef, HttpMethod, ResourceDescriptor, ResourceRoutes, RouteEntry,
};
pub use table::RouteTable;
