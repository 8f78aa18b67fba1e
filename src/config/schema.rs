//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dev
//! server. All types derive Serde traits for deserialization from
//! `hotdev.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::reload::OverlapPolicy;
use crate::routing::ResourceDescriptor;

/// Root configuration for the dev server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DevConfig {
    /// Listener settings (bind address, timeouts).
    pub server: ServerConfig,

    /// Project layout (source, compiled and public directories).
    pub project: ProjectConfig,

    /// File watching settings.
    pub watch: WatchConfig,

    /// External compiler invocation.
    pub compiler: CompilerConfig,

    /// Reload cycle behavior.
    pub reload: ReloadConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// RESTful resources exposed by the server, in registration order.
    pub resources: Vec<ResourceDescriptor>,
}

impl DevConfig {
    /// Resolve a project-relative path against the project root.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.project.root.join(relative)
        }
    }

    /// Absolute features directory.
    pub fn features_dir(&self) -> PathBuf {
        self.resolve(&self.project.features_dir)
    }

    /// Absolute compiled output directory.
    pub fn compiled_dir(&self) -> PathBuf {
        self.resolve(&self.project.compiled_dir)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:5544").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How long a reload waits for the old listener to drain before
    /// aborting it.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5544".to_string(),
            request_timeout_secs: 30,
            shutdown_timeout_secs: 5,
        }
    }
}

/// Project layout. Relative paths are resolved against `root`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub root: PathBuf,
    pub features_dir: PathBuf,
    pub compiled_dir: PathBuf,
    pub public_dir: PathBuf,
    pub stylesheets_dir: PathBuf,

    /// Extension of compiled modules (without the dot).
    pub module_extension: String,

    /// Directory name marking a feature's service interface.
    pub service_dir_name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            features_dir: PathBuf::from("features"),
            compiled_dir: PathBuf::from("dist"),
            public_dir: PathBuf::from("public"),
            stylesheets_dir: PathBuf::from("stylesheets"),
            module_extension: "js".to_string(),
            service_dir_name: "Service".to_string(),
        }
    }
}

/// File watching configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directories to watch, relative to the project root.
    pub paths: Vec<PathBuf>,

    /// Ignore patterns: `*.ext` suffixes or directory names.
    pub ignore: Vec<String>,

    /// Extensions handled by the compiler; changes to these trigger a build.
    pub source_extensions: Vec<String>,

    /// Same-file events closer than this are collapsed.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            paths: vec![
                PathBuf::from("features"),
                PathBuf::from("config"),
                PathBuf::from("lib"),
                PathBuf::from("stylesheets"),
            ],
            ignore: vec!["node_modules".to_string(), "*.log".to_string()],
            source_extensions: vec!["ts".to_string(), "tsx".to_string()],
            debounce_ms: 100,
        }
    }
}

/// External compiler invocation. An empty command means another process
/// already keeps the compiled output up to date.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: "npx".to_string(),
            args: vec![
                "tsc".to_string(),
                "-p".to_string(),
                "config/server/tsconfig.json".to_string(),
            ],
        }
    }
}

/// Which module cache entries a reload cycle drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationMode {
    /// Every cached module.
    #[default]
    All,
    /// Only modules under the compiled output directory.
    Compiled,
}

/// Reload cycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReloadConfig {
    /// What happens to build events arriving while a reload is running.
    pub overlap_policy: OverlapPolicy,

    /// Module cache invalidation breadth.
    pub invalidation: InvalidationMode,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
