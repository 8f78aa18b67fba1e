//! Hot reload orchestrator.
//!
//! # Responsibilities
//! - Start the first listener (services generated, routes built)
//! - Turn successful build events into restart cycles, single-flight
//! - Hand non-compiled changes to their asset handler
//! - Broadcast a notice after every step of a cycle
//!
//! # Design Decisions
//! - Each event runs on its own task so overlapping events reach the gate
//!   while a cycle is in flight; only the gate winner touches the pipeline
//! - Cycle order is fixed: stop listener, invalidate cache, regenerate
//!   service, rebuild routes, start listener
//! - Failures never leave the gate closed; the next event retries
//! - Restarts reuse the address the first listener actually bound, so a
//!   `:0` bind keeps its port across reloads

use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::config::{load_config, DevConfig, InvalidationMode};
use crate::http::{DevServer, DevStatus, ListenerError, ListenerHandle};
use crate::modules::{ArtifactResolver, Invalidation, ModuleId, ModuleRegistry};
use crate::observability::metrics;
use crate::reload::events::{BuildEvent, ReloadNotice, ReloadOutcome, WatchEvent};
use crate::reload::state::{Admission, RestartGate, RestartState};
use crate::routing::{ControllerLookup, ResourceDescriptor, RouteTable};
use crate::rpc::{generate_service, rpc_router, GenerateError, GeneratedService};
use crate::watch::assets::AssetHandlers;

/// Source file of a service interface inside its directory.
pub const SERVICE_INTERFACE_FILE: &str = "index.ts";

const NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("Invalid bind address '{0}'")]
    BindAddress(String),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// State only the gate winner may touch.
struct Pipeline {
    listener: Option<ListenerHandle>,
    addr: SocketAddr,
    generation: u64,
    resources: Vec<ResourceDescriptor>,
    services: BTreeMap<String, GeneratedService>,
}

pub struct Orchestrator {
    config: DevConfig,
    config_path: Option<PathBuf>,
    gate: RestartGate,
    pipeline: Mutex<Pipeline>,
    registry: Arc<ModuleRegistry>,
    resolver: ArtifactResolver,
    assets: AssetHandlers,
    notices: broadcast::Sender<ReloadNotice>,
    cycles: AtomicU64,
}

impl Orchestrator {
    /// `config_path`, when given, is re-read on every cycle for the
    /// current resource list.
    pub fn new(config: DevConfig, config_path: Option<PathBuf>) -> Result<Self, ReloadError> {
        Self::with_registry(config, config_path, Arc::new(ModuleRegistry::default()))
    }

    pub fn with_registry(
        config: DevConfig,
        config_path: Option<PathBuf>,
        registry: Arc<ModuleRegistry>,
    ) -> Result<Self, ReloadError> {
        let addr: SocketAddr = config
            .server
            .bind_address
            .parse()
            .map_err(|_| ReloadError::BindAddress(config.server.bind_address.clone()))?;

        let resolver = ArtifactResolver::new(
            config.compiled_dir(),
            relative_to_root(&config, &config.project.features_dir),
            config.project.module_extension.clone(),
        );
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Ok(Self {
            gate: RestartGate::new(config.reload.overlap_policy),
            pipeline: Mutex::new(Pipeline {
                listener: None,
                addr,
                generation: 0,
                resources: config.resources.clone(),
                services: BTreeMap::new(),
            }),
            assets: AssetHandlers::from_config(&config),
            registry,
            resolver,
            notices,
            cycles: AtomicU64::new(0),
            config,
            config_path,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadNotice> {
        self.notices.subscribe()
    }

    pub fn state(&self) -> RestartState {
        self.gate.state()
    }

    /// Completed restart cycles (the initial start is not counted).
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Address of the running listener, if any.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.pipeline
            .lock()
            .await
            .listener
            .as_ref()
            .map(ListenerHandle::addr)
    }

    /// Generate every service found under the features directory and start
    /// the first listener.
    pub async fn start(&self) -> Result<SocketAddr, ReloadError> {
        let mut pipeline = self.pipeline.lock().await;

        for dir in self.discover_services() {
            if let Some(service) = self.generate(&dir) {
                pipeline
                    .services
                    .insert(service.feature().to_string(), service);
            }
        }

        let addr = self.start_listener(&mut pipeline).await?;
        tracing::info!(address = %addr, "Listening");
        Ok(addr)
    }

    /// Stop the running listener.
    pub async fn stop(&self) -> Result<(), ReloadError> {
        let mut pipeline = self.pipeline.lock().await;
        if let Some(listener) = pipeline.listener.take() {
            listener.shutdown(self.shutdown_timeout()).await?;
        }
        Ok(())
    }

    pub async fn handle(&self, event: WatchEvent) -> ReloadOutcome {
        match event {
            WatchEvent::Build(build) => self.on_build(build).await,
            WatchEvent::Change(path) => self.on_change(&path).await,
        }
    }

    /// React to a compiler run.
    pub async fn on_build(&self, event: BuildEvent) -> ReloadOutcome {
        if !event.succeeded {
            let path = event.changed_path.display().to_string();
            for line in &event.diagnostics {
                tracing::error!(path = %path, "{}", line);
            }
            tracing::warn!(path = %path, "Build failed, keeping the current listener");
            self.notify(ReloadNotice::BuildFailed {
                path,
                diagnostics: event.diagnostics,
            });
            metrics::record_build_failure();
            return ReloadOutcome::BuildFailed;
        }

        // No await before the gate: a concurrent event must see `Restarting`.
        match self.gate.request(event.clone()) {
            Admission::Started => {}
            Admission::Dropped => {
                tracing::debug!(path = %event.changed_path.display(), "Reload in progress, event dropped");
                return ReloadOutcome::Dropped;
            }
            Admission::Queued => {
                tracing::debug!(path = %event.changed_path.display(), "Reload in progress, event queued");
                return ReloadOutcome::Queued;
            }
        }

        let mut changed = BTreeSet::from([event.changed_path.clone()]);
        let mut current = event;
        let mut cycles = 0;
        loop {
            cycles += 1;
            let started = Instant::now();
            let result = self.run_cycle(&current, &changed, started).await;

            match &result {
                Ok(()) => {
                    self.cycles.fetch_add(1, Ordering::SeqCst);
                    metrics::record_reload("completed", started);
                }
                Err(e) => {
                    tracing::error!(path = %current.changed_path.display(), error = %e, "Reload failed");
                    self.notify(ReloadNotice::ReloadFailed {
                        error: e.to_string(),
                    });
                    metrics::record_reload("failed", started);
                }
            }

            match self.gate.complete() {
                Some(next) => {
                    current = next.event;
                    changed = next.changed;
                }
                None if result.is_err() => return ReloadOutcome::Failed,
                None => return ReloadOutcome::Completed { cycles },
            }
        }
    }

    /// React to a change the compiler does not own. Never restarts.
    pub async fn on_change(&self, path: &Path) -> ReloadOutcome {
        tracing::info!(path = %path.display(), "Changed");
        match self.assets.handle(&self.config.resolve(path)).await {
            Ok(action) => tracing::debug!(path = %path.display(), action = ?action, "Asset handled"),
            Err(e) => tracing::error!(path = %path.display(), error = %e, "Asset handler failed"),
        }
        self.notify(ReloadNotice::AssetHandled {
            path: path.display().to_string(),
        });
        ReloadOutcome::AssetHandled
    }

    /// Consume watch events until `shutdown` fires or the channel closes,
    /// then stop the listener.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<WatchEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        let this = Arc::clone(&self);
                        tokio::spawn(async move {
                            let outcome = this.handle(event).await;
                            tracing::debug!(outcome = ?outcome, "Event handled");
                        });
                    }
                    None => break,
                },
            }
        }

        if let Err(e) = self.stop().await {
            tracing::error!(error = %e, "Failed to stop listener");
        }
    }

    /// `changed` holds `event`'s path and those of events coalesced into it.
    async fn run_cycle(
        &self,
        event: &BuildEvent,
        changed: &BTreeSet<PathBuf>,
        started: Instant,
    ) -> Result<(), ReloadError> {
        let mut pipeline = self.pipeline.lock().await;
        let path = event.changed_path.display().to_string();

        tracing::info!(path = %path, coalesced = changed.len(), "RELOADED");
        self.notify(ReloadNotice::FileChanged { path });

        if let Some(listener) = pipeline.listener.take() {
            listener.shutdown(self.shutdown_timeout()).await?;
        }
        self.notify(ReloadNotice::ListenerStopped);

        let entries = self.registry.invalidate(&self.invalidation_scope());
        self.notify(ReloadNotice::CacheInvalidated { entries });

        let service_dirs: BTreeSet<PathBuf> =
            changed.iter().filter_map(|p| self.service_dir(p)).collect();
        for dir in service_dirs {
            if let Some(service) = self.generate(&dir) {
                let feature = service.feature().to_string();
                pipeline.services.insert(feature.clone(), service);
                self.notify(ReloadNotice::ServiceGenerated { feature });
            }
        }

        self.refresh_resources(&mut pipeline);
        self.start_listener(&mut pipeline).await?;

        self.notify(ReloadNotice::ReloadFinished {
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(())
    }

    async fn start_listener(&self, pipeline: &mut Pipeline) -> Result<SocketAddr, ReloadError> {
        let table = RouteTable::from_resources(&pipeline.resources);
        let lookup = ControllerLookup::new(Arc::clone(&self.registry), self.resolver.clone());
        let resources = table.mount(&lookup);
        self.notify(ReloadNotice::RoutesRebuilt { routes: table.len() });

        let rpc = rpc_router(pipeline.services.values(), &self.registry);

        pipeline.generation += 1;
        let status = DevStatus {
            generation: pipeline.generation,
            routes: table.entries().to_vec(),
            services: pipeline.services.keys().cloned().collect(),
        };
        let server = DevServer::new(
            resources,
            rpc,
            status,
            self.notices.clone(),
            Duration::from_secs(self.config.server.request_timeout_secs),
        );

        let listener = server.start(pipeline.addr).await?;
        let addr = listener.addr();
        pipeline.addr = addr;
        pipeline.listener = Some(listener);

        self.notify(ReloadNotice::ListenerStarted { addr });
        Ok(addr)
    }

    /// Re-read the resource list; a broken file keeps the previous one.
    fn refresh_resources(&self, pipeline: &mut Pipeline) {
        let Some(path) = &self.config_path else {
            return;
        };
        match load_config(path) {
            Ok(config) => pipeline.resources = config.resources,
            Err(e) => tracing::error!(
                path = %path.display(),
                error = %e,
                "Failed to re-read configuration, keeping previous resources"
            ),
        }
    }

    /// Parse `dir/index.ts`, write the caller, and describe the routes.
    /// Failures are logged and skip the service.
    fn generate(&self, dir: &Path) -> Option<GeneratedService> {
        let interface = self.config.resolve(dir).join(SERVICE_INTERFACE_FILE);
        let module_path = self.resolver.resolve(&ModuleId::Service {
            dir: dir.to_path_buf(),
        });

        match generate_service(&interface, &self.config.features_dir(), module_path) {
            Ok(service) => Some(service),
            Err(e @ GenerateError::Parse { .. }) => {
                tracing::error!(error = %e, "Service interface could not be parsed, skipping");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Service generation failed");
                None
            }
        }
    }

    /// `features/<F>/Service` directories (project-relative) that have an
    /// interface file.
    fn discover_services(&self) -> Vec<PathBuf> {
        let features = self.config.features_dir();
        let relative = relative_to_root(&self.config, &self.config.project.features_dir);
        let entries = match std::fs::read_dir(&features) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %features.display(), error = %e, "Features directory not readable");
                return Vec::new();
            }
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .path()
                    .join(&self.config.project.service_dir_name)
                    .join(SERVICE_INTERFACE_FILE)
                    .is_file()
            })
            .map(|entry| {
                relative
                    .join(entry.file_name())
                    .join(&self.config.project.service_dir_name)
            })
            .collect();
        dirs.sort();
        dirs
    }

    /// The service directory containing `changed`, if any.
    fn service_dir(&self, changed: &Path) -> Option<PathBuf> {
        let marker = self.config.project.service_dir_name.as_str();
        let mut dir = PathBuf::new();
        for component in changed.components() {
            if let Component::Normal(name) = component {
                dir.push(name);
                if name == marker {
                    return Some(dir);
                }
            }
        }
        None
    }

    fn invalidation_scope(&self) -> Invalidation {
        match self.config.reload.invalidation {
            InvalidationMode::All => Invalidation::All,
            InvalidationMode::Compiled => Invalidation::Prefix(self.config.compiled_dir()),
        }
    }

    fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.config.server.shutdown_timeout_secs)
    }

    fn notify(&self, notice: ReloadNotice) {
        tracing::debug!(notice = notice.kind(), "Reload notice");
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }
}

fn relative_to_root(config: &DevConfig, path: &Path) -> PathBuf {
    path.strip_prefix(&config.project.root)
        .unwrap_or(path)
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator() -> Orchestrator {
        let mut config = DevConfig::default();
        config.project.root = PathBuf::from("/app");
        config.server.bind_address = "127.0.0.1:0".to_string();
        Orchestrator::new(config, None).unwrap()
    }

    #[test]
    fn test_service_dir_detection() {
        let orch = orchestrator();

        assert_eq!(
            orch.service_dir(Path::new("features/Post/Service/index.ts")),
            Some(PathBuf::from("features/Post/Service"))
        );
        assert_eq!(orch.service_dir(Path::new("features/Post/Controller/fetch.ts")), None);
        // Substrings do not count.
        assert_eq!(orch.service_dir(Path::new("features/ServiceDesk/Controller/a.ts")), None);
    }

    #[test]
    fn test_invalidation_scope_follows_config() {
        let orch = orchestrator();
        assert_eq!(orch.invalidation_scope(), Invalidation::All);

        let mut config = DevConfig::default();
        config.project.root = PathBuf::from("/app");
        config.reload.invalidation = InvalidationMode::Compiled;
        let orch = Orchestrator::new(config, None).unwrap();
        assert_eq!(
            orch.invalidation_scope(),
            Invalidation::Prefix(PathBuf::from("/app/dist"))
        );
    }

    #[test]
    fn test_invalid_bind_address() {
        let mut config = DevConfig::default();
        config.server.bind_address = "nowhere".to_string();
        assert!(matches!(
            Orchestrator::new(config, None),
            Err(ReloadError::BindAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_build_does_not_touch_gate() {
        let orch = orchestrator();
        let mut notices = orch.subscribe();

        let outcome = orch
            .on_build(BuildEvent::failed("features/Post/Controller/fetch.ts", vec!["TS2304".into()]))
            .await;

        assert_eq!(outcome, ReloadOutcome::BuildFailed);
        assert_eq!(orch.state(), RestartState::Idle);
        assert_eq!(orch.cycles(), 0);
        assert!(matches!(notices.try_recv(), Ok(ReloadNotice::BuildFailed { .. })));
    }
}
