//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → request.rs (x-request-id, UUID v4 unless supplied)
//!     → resource routes | /rpc/<F>/<m> | /__dev/*
//!     → response.rs (JSON payloads with explicit status)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::JsonPayload;
pub use server::{DevServer, DevStatus, ListenerError, ListenerHandle};
