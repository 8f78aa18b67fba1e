//! Registry of loaded modules.
//!
//! # Responsibilities
//! - Cache loaded modules by absolute path
//! - Drop entries on invalidation so the next load re-reads the artifact
//!
//! # Design Decisions
//! - Owned and injected (no process global); the orchestrator owns the
//!   invalidation calls, handlers only load
//! - Every fresh load gets a new generation number, so a handle obtained
//!   after invalidation is always distinguishable from the stale one

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde_json::Value;

use crate::modules::loader::{Exports, JsonModuleLoader, ModuleError, ModuleLoader};
use crate::observability::metrics;

/// A module loaded from the compiled output.
#[derive(Debug)]
pub struct LoadedModule {
    path: PathBuf,
    exports: Exports,
    generation: u64,
    loaded_at: Instant,
}

impl LoadedModule {
    /// Path the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a named export.
    pub fn export(&self, name: &str) -> Option<&Value> {
        self.exports.get(name)
    }

    /// The `default` export.
    pub fn default_export(&self) -> Option<&Value> {
        self.export("default")
    }

    /// Load counter value at the time this module was read.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }
}

/// Which cache entries to drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    All,
    Prefix(PathBuf),
    Exact(PathBuf),
}

/// Cache of loaded modules keyed by absolute path.
pub struct ModuleRegistry {
    entries: DashMap<PathBuf, Arc<LoadedModule>>,
    loader: Arc<dyn ModuleLoader>,
    generation: AtomicU64,
}

impl ModuleRegistry {
    /// Create a registry backed by the given loader.
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            entries: DashMap::new(),
            loader,
            generation: AtomicU64::new(0),
        }
    }

    /// Return the cached module for `path`, loading it on a miss.
    pub fn load(&self, path: &Path) -> Result<Arc<LoadedModule>, ModuleError> {
        if let Some(module) = self.entries.get(path) {
            return Ok(Arc::clone(module.value()));
        }

        let exports = self.loader.load(path)?;
        let module = Arc::new(LoadedModule {
            path: path.to_path_buf(),
            exports,
            generation: self.generation.fetch_add(1, Ordering::Relaxed) + 1,
            loaded_at: Instant::now(),
        });

        // A concurrent load of the same path may have won; keep the first.
        let cached = Arc::clone(
            self.entries
                .entry(path.to_path_buf())
                .or_insert(module)
                .value(),
        );

        tracing::debug!(
            path = %path.display(),
            generation = cached.generation,
            "Module loaded"
        );
        metrics::record_module_cache(self.entries.len());
        Ok(cached)
    }

    /// Drop matching entries. Returns how many were removed.
    pub fn invalidate(&self, scope: &Invalidation) -> usize {
        let before = self.entries.len();
        match scope {
            Invalidation::All => self.entries.clear(),
            Invalidation::Prefix(prefix) => self.entries.retain(|path, _| !path.starts_with(prefix)),
            Invalidation::Exact(path) => {
                self.entries.remove(path);
            }
        }
        let removed = before.saturating_sub(self.entries.len());

        tracing::debug!(scope = ?scope, removed, "Module cache invalidated");
        metrics::record_module_cache(self.entries.len());
        removed
    }

    /// True if `path` is currently cached.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new(Arc::new(JsonModuleLoader))
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("entries", &self.entries.len())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}
