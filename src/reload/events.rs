//! Events consumed and produced by the reload orchestrator.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Serialize;

/// Result of one compiler run, as reported by the build driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEvent {
    /// Project-relative path of the file that triggered the build.
    pub changed_path: PathBuf,
    pub succeeded: bool,
    pub diagnostics: Vec<String>,
}

impl BuildEvent {
    pub fn succeeded(changed_path: impl Into<PathBuf>) -> Self {
        Self {
            changed_path: changed_path.into(),
            succeeded: true,
            diagnostics: Vec::new(),
        }
    }

    pub fn failed(changed_path: impl Into<PathBuf>, diagnostics: Vec<String>) -> Self {
        Self {
            changed_path: changed_path.into(),
            succeeded: false,
            diagnostics,
        }
    }
}

/// Input of the orchestrator loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A compiled source changed and the compiler ran.
    Build(BuildEvent),
    /// A non-compiled file changed (stylesheet, SQL, ...).
    Change(PathBuf),
}

/// Progress pushed to connected browsers over `/__dev/events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadNotice {
    FileChanged { path: String },
    ListenerStopped,
    CacheInvalidated { entries: usize },
    ServiceGenerated { feature: String },
    RoutesRebuilt { routes: usize },
    ListenerStarted { addr: SocketAddr },
    ReloadFinished { duration_ms: u64 },
    ReloadFailed { error: String },
    BuildFailed { path: String, diagnostics: Vec<String> },
    AssetHandled { path: String },
}

impl ReloadNotice {
    /// SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            ReloadNotice::FileChanged { .. } => "file_changed",
            ReloadNotice::ListenerStopped => "listener_stopped",
            ReloadNotice::CacheInvalidated { .. } => "cache_invalidated",
            ReloadNotice::ServiceGenerated { .. } => "service_generated",
            ReloadNotice::RoutesRebuilt { .. } => "routes_rebuilt",
            ReloadNotice::ListenerStarted { .. } => "listener_started",
            ReloadNotice::ReloadFinished { .. } => "reload_finished",
            ReloadNotice::ReloadFailed { .. } => "reload_failed",
            ReloadNotice::BuildFailed { .. } => "build_failed",
            ReloadNotice::AssetHandled { .. } => "asset_handled",
        }
    }
}

/// What `Orchestrator::handle` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// `cycles` reload cycles ran (more than one when events were queued).
    Completed { cycles: u32 },
    /// A reload was already running; the event was discarded.
    Dropped,
    /// A reload was already running; the event will run after it.
    Queued,
    /// The build failed; nothing was restarted.
    BuildFailed,
    /// A cycle failed; the state is back to idle.
    Failed,
    /// A non-compiled change was handed to its asset handler.
    AssetHandled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_serialization_is_tagged() {
        let notice = ReloadNotice::RoutesRebuilt { routes: 10 };
        let json = serde_json::to_value(&notice).unwrap();

        assert_eq!(json, serde_json::json!({ "type": "routes_rebuilt", "routes": 10 }));
        assert_eq!(notice.kind(), "routes_rebuilt");
    }

    #[test]
    fn test_unit_notice_kind_matches_tag() {
        let json = serde_json::to_value(ReloadNotice::ListenerStopped).unwrap();
        assert_eq!(json["type"], ReloadNotice::ListenerStopped.kind());
    }
}
