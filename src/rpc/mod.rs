//! Remote procedure calls between browser code and feature services.
//!
//! # Data Flow
//! ```text
//! features/<F>/Service/index.ts
//!     → parser.rs (tree-sitter → ServiceDescriptor)
//!     → generator.rs
//!         → features/<F>/Caller.ts (client module)
//!         → POST /rpc/<F>/<method> routes (server side)
//!
//! POST /rpc/<F>/<method>
//!     → ModuleRegistry::load(dist/features/<F>/Service/index.js)
//!     → default export → method result → JSON 200
//! ```
//!
//! `caller.rs` speaks the same protocol from Rust, for tooling and tests.

pub mod caller;
pub mod generator;
pub mod parser;

pub use caller::{CallerError, RpcCaller};
pub use generator::{
    generate_service, rpc_endpoint, rpc_router, write_caller, CallerFunction, CallerModule,
    GenerateError, GeneratedService, InvocationError, RpcBinding,
};
pub use parser::{
    parse_service, parse_service_interfaces, ParseError, ServiceDescriptor, ServiceMethod, TypeRef,
};
