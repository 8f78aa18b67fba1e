//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration and apply command line overrides
//! - Initialize logging and metrics
//! - Run the first build and stylesheet compile
//! - Start the first listener, then the watcher and build driver
//!
//! # Design Decisions
//! - Fail fast: configuration and first-listener errors are fatal
//! - A failing first build is not fatal; the developer fixes it and the
//!   next build event restarts the server
//! - Listeners start before watching, so early edits are never lost to a
//!   half-started server

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{load_config, ConfigError, DevConfig};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::observability::{logging, metrics};
use crate::reload::{Orchestrator, OverlapPolicy, ReloadError};
use crate::watch::{project_relative, AssetHandlers, BuildDriver, CommandCompiler, ProjectWatcher};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reload(#[from] ReloadError),

    #[error("Failed to watch project: {0}")]
    Watch(#[from] notify::Error),
}

/// Command line overrides for values from `hotdev.toml`.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub port: Option<u16>,
    pub policy: Option<OverlapPolicy>,
}

impl StartOptions {
    pub fn apply(&self, config: &mut DevConfig) {
        if let Some(port) = self.port {
            let mut addr = config
                .server
                .bind_address
                .parse::<SocketAddr>()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], port)));
            addr.set_port(port);
            config.server.bind_address = addr.to_string();
        }
        if let Some(policy) = self.policy {
            config.reload.overlap_policy = policy;
        }
    }
}

/// Run the dev server until a termination signal arrives.
pub async fn run(config_path: &Path, options: StartOptions) -> Result<(), StartupError> {
    let mut config = load_config(config_path)?;
    options.apply(&mut config);

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = %config_path.display(), "hotdev starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let config_file = project_relative(&config, config_path);
    if config_file.is_none() {
        tracing::warn!(
            config = %config_path.display(),
            "Configuration file is outside the project root, edits to it are not watched"
        );
    }

    let mut driver = BuildDriver::from_config(CommandCompiler::from_config(&config), &config);
    let first = driver.initial_build().await;
    if !first.succeeded {
        for line in &first.diagnostics {
            tracing::error!("{}", line);
        }
        tracing::warn!("Initial build failed, serving the last compiled output");
    }

    if let Err(e) = AssetHandlers::from_config(&config).compile_stylesheets().await {
        tracing::error!(error = %e, "Initial stylesheet compile failed");
    }

    let (mut watcher, changes) = ProjectWatcher::new(&config);
    if let Some(relative) = config_file {
        watcher = watcher.with_config_file(relative.clone());
        driver = driver.with_config_file(relative);
    }
    let orchestrator = Arc::new(Orchestrator::new(
        config,
        Some(PathBuf::from(config_path)),
    )?);
    orchestrator.start().await?;

    // Dropping the watcher stops notifications; keep it for the whole run.
    let _watcher = watcher.run()?;

    let shutdown = Shutdown::new();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    tokio::spawn(driver.run(changes, events_tx));
    let reload_loop = tokio::spawn(Arc::clone(&orchestrator).run(events_rx, shutdown.subscribe()));

    wait_for_signal(&shutdown).await;
    if let Err(e) = reload_loop.await {
        tracing::error!(error = %e, "Reload loop ended abnormally");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_override_keeps_host() {
        let mut config = DevConfig::default();
        config.server.bind_address = "0.0.0.0:5544".to_string();

        StartOptions {
            port: Some(8080),
            policy: Some(OverlapPolicy::Queue),
        }
        .apply(&mut config);

        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.reload.overlap_policy, OverlapPolicy::Queue);
    }

    #[test]
    fn test_no_overrides_is_identity() {
        let mut config = DevConfig::default();
        StartOptions::default().apply(&mut config);
        assert_eq!(config.server.bind_address, "127.0.0.1:5544");
    }
}
