//! HTTP listener setup and lifetime.
//!
//! # Responsibilities
//! - Assemble the axum Router for one listener generation (resource
//!   routes, RPC routes, `/__dev` introspection)
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind, serve, and shut down gracefully on request
//!
//! # Design Decisions
//! - A listener is immutable: a reload stops it and starts a new one with a
//!   freshly built Router, so no handler ever sees a half-rebuilt table
//! - Reload notice streams end when their listener closes, otherwise
//!   graceful shutdown would wait on them forever
//! - Shutdown is bounded; a listener that does not drain in time is aborted

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::future;
use futures_util::stream::{Stream, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::http::request::UuidRequestId;
use crate::reload::ReloadNotice;
use crate::routing::RouteEntry;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Listener task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What `/__dev/status` and `/__dev/routes` report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DevStatus {
    /// Number of listeners started so far, this one included.
    pub generation: u64,
    pub routes: Vec<RouteEntry>,
    /// Features with generated RPC routes.
    pub services: Vec<String>,
}

#[derive(Clone)]
struct DevState {
    status: Arc<DevStatus>,
    notices: broadcast::Sender<ReloadNotice>,
    closing: watch::Receiver<bool>,
}

/// One listener generation, ready to start.
pub struct DevServer {
    resources: Router,
    rpc: Router,
    status: DevStatus,
    notices: broadcast::Sender<ReloadNotice>,
    request_timeout: Duration,
}

impl DevServer {
    pub fn new(
        resources: Router,
        rpc: Router,
        status: DevStatus,
        notices: broadcast::Sender<ReloadNotice>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            resources,
            rpc,
            status,
            notices,
            request_timeout,
        }
    }

    /// Build the Router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(self, closing: watch::Receiver<bool>) -> Router {
        let state = DevState {
            status: Arc::new(self.status),
            notices: self.notices,
            closing,
        };

        let introspection = Router::new()
            .route("/__dev/status", get(status_handler))
            .route("/__dev/routes", get(routes_handler))
            .route("/__dev/events", get(events_handler))
            .with_state(state);

        self.resources
            .merge(self.rpc)
            .merge(introspection)
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Bind `addr` and serve until the returned handle is shut down.
    pub async fn start(self, addr: SocketAddr) -> Result<ListenerHandle, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind { addr, source })?;

        let generation = self.status.generation;
        let (closing_tx, closing_rx) = watch::channel(false);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = self.router(closing_rx);

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .map_err(ListenerError::Serve)
        });

        tracing::info!(address = %local_addr, generation, "Listener started");

        Ok(ListenerHandle {
            addr: local_addr,
            generation,
            shutdown: shutdown_tx,
            closing: closing_tx,
            task,
        })
    }
}

/// A running listener.
pub struct ListenerHandle {
    addr: SocketAddr,
    generation: u64,
    shutdown: oneshot::Sender<()>,
    closing: watch::Sender<bool>,
    task: JoinHandle<Result<(), ListenerError>>,
}

impl ListenerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop accepting, drain in-flight requests, and wait for the serving
    /// task. After `timeout` the task is aborted.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), ListenerError> {
        let _ = self.closing.send(true);
        let _ = self.shutdown.send(());

        let mut task = self.task;
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(joined) => joined??,
            Err(_) => {
                tracing::warn!(
                    address = %self.addr,
                    timeout_secs = timeout.as_secs_f64(),
                    "Listener did not drain in time, aborting"
                );
                task.abort();
                match task.await {
                    Ok(result) => result?,
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => return Err(ListenerError::Join(e)),
                }
            }
        }

        tracing::info!(address = %self.addr, generation = self.generation, "Listener stopped");
        Ok(())
    }
}

async fn status_handler(State(state): State<DevState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "generation": state.status.generation,
        "routes": state.status.routes.len(),
        "services": state.status.services,
    }))
}

async fn routes_handler(State(state): State<DevState>) -> Json<Vec<RouteEntry>> {
    Json(state.status.routes.clone())
}

async fn events_handler(
    State(state): State<DevState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut closing = state.closing.clone();
    let closed = async move {
        let _ = closing.wait_for(|closing| *closing).await;
    };

    let stream = BroadcastStream::new(state.notices.subscribe())
        .filter_map(|notice| future::ready(notice.ok()))
        .map(|notice| Event::default().event(notice.kind()).json_data(&notice))
        .take_until(closed);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}
