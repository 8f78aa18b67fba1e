//! File system watcher with debouncing.
//!
//! Watches the configured project directories and forwards relevant
//! changes, ignoring hidden files, `node_modules`, the compiled output and
//! other configured patterns. The configuration file is watched on its own
//! so resource edits reach the orchestrator even when it sits outside the
//! watched directories.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::DevConfig;

/// A change to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Path relative to the project root.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Watches project directories and sends [`FileChange`]s.
pub struct ProjectWatcher {
    root: PathBuf,
    paths: Vec<PathBuf>,
    config_file: Option<PathBuf>,
    ignore: Vec<String>,
    debounce: Duration,
    tx: mpsc::UnboundedSender<FileChange>,
}

impl ProjectWatcher {
    /// Returns the watcher and a receiver for changes.
    pub fn new(config: &DevConfig) -> (Self, mpsc::UnboundedReceiver<FileChange>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut ignore = config.watch.ignore.clone();
        if let Some(compiled) = config.project.compiled_dir.to_str() {
            ignore.push(compiled.trim_end_matches('/').to_string());
        }

        (
            Self {
                root: config.project.root.clone(),
                paths: config.watch.paths.iter().map(|p| config.resolve(p)).collect(),
                config_file: None,
                ignore,
                debounce: Duration::from_millis(config.watch.debounce_ms),
                tx,
            },
            rx,
        )
    }

    /// Also report changes to the configuration file, given relative to
    /// the project root (see [`project_relative`]).
    pub fn with_config_file(mut self, relative: impl Into<PathBuf>) -> Self {
        self.config_file = Some(relative.into());
        self
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let roots = vec![
            self.root.canonicalize().unwrap_or_else(|_| self.root.clone()),
            self.root.clone(),
        ];
        let scopes: Vec<PathBuf> = self
            .paths
            .iter()
            .filter_map(|p| p.strip_prefix(&self.root).ok())
            .map(Path::to_path_buf)
            .collect();
        let config_file = self.config_file.clone();
        let ignore = self.ignore.clone();
        let debounce = self.debounce;
        let tx = self.tx.clone();
        let mut last_event: Option<(PathBuf, Instant)> = None;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "Watch error");
                    return;
                }
            };

            for path in &event.paths {
                let Some(relative) = relevant_path(path, &roots, &ignore) else {
                    continue;
                };
                if !in_scope(&relative, &scopes, config_file.as_deref()) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(relative),
                    EventKind::Modify(_) => FileChange::Modified(relative),
                    EventKind::Remove(_) => FileChange::Removed(relative),
                    _ => continue,
                };
                let _ = tx.send(change);
            }
        })?;

        for path in &self.paths {
            if !path.exists() {
                tracing::debug!(path = %path.display(), "Watch path missing, skipped");
                continue;
            }
            watcher.watch(path, RecursiveMode::Recursive)?;
            tracing::info!(path = %path.display(), "Watching");
        }

        if let Some(relative) = &self.config_file {
            // Editors replace files on save; watch the directory, not the file.
            let file = self.root.join(relative);
            let dir = file.parent().unwrap_or(&self.root);
            if !self.paths.iter().any(|p| dir.starts_with(p)) {
                watcher.watch(dir, RecursiveMode::NonRecursive)?;
            }
            tracing::info!(path = %file.display(), "Watching configuration");
        }

        Ok(watcher)
    }
}

/// Project-relative path of `path`, or `None` when it must be ignored.
fn relevant_path(path: &Path, roots: &[PathBuf], ignore: &[String]) -> Option<PathBuf> {
    let relative = roots.iter().find_map(|root| path.strip_prefix(root).ok())?;

    if should_ignore(relative, ignore) {
        return None;
    }
    Some(relative.to_path_buf())
}

/// Path of `path` relative to the project root, resolving symlinks on both
/// sides. `None` when it lies outside the root.
pub fn project_relative(config: &DevConfig, path: &Path) -> Option<PathBuf> {
    let root = &config.project.root;
    let roots = [
        root.canonicalize().unwrap_or_else(|_| root.clone()),
        root.clone(),
    ];
    let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    relevant_path(&absolute, &roots, &[])
}

/// Whether a change belongs to a watched directory or is the configuration
/// file. Needed because the configuration directory is watched as a whole.
fn in_scope(relative: &Path, scopes: &[PathBuf], config_file: Option<&Path>) -> bool {
    config_file == Some(relative) || scopes.iter().any(|scope| relative.starts_with(scope))
}

/// `*.ext` patterns match suffixes, anything else matches a path component.
/// Hidden files and directories are always ignored.
fn should_ignore(relative: &Path, ignore: &[String]) -> bool {
    let text = relative.to_string_lossy();

    for pattern in ignore {
        if let Some(suffix) = pattern.strip_prefix('*') {
            if text.ends_with(suffix) {
                return true;
            }
        } else if relative.components().any(|c| c.as_os_str() == pattern.as_str()) {
            return true;
        }
    }

    relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|name| name.starts_with('.') && name != "." && name != "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_should_ignore_directories() {
        let ignore = patterns(&["node_modules", "dist"]);

        assert!(should_ignore(Path::new("node_modules/pkg/index.js"), &ignore));
        assert!(should_ignore(Path::new("dist/features/Post/Controller/fetch.js"), &ignore));
        assert!(!should_ignore(Path::new("features/Post/Controller/fetch.ts"), &ignore));
        // Component match, not substring.
        assert!(!should_ignore(Path::new("features/distance/Service/index.ts"), &ignore));
    }

    #[test]
    fn test_should_ignore_extension_and_hidden() {
        let ignore = patterns(&["*.log"]);

        assert!(should_ignore(Path::new("debug.log"), &ignore));
        assert!(should_ignore(Path::new(".git/config"), &ignore));
        assert!(should_ignore(Path::new("features/.cache/x.ts"), &ignore));
        assert!(!should_ignore(Path::new("stylesheets/main.css"), &ignore));
    }

    #[test]
    fn test_paths_outside_root_are_ignored() {
        assert_eq!(
            relevant_path(Path::new("/other/file.ts"), &[PathBuf::from("/project")], &[]),
            None
        );
        assert_eq!(
            relevant_path(Path::new("/project/lib/a.ts"), &[PathBuf::from("/project")], &[]),
            Some(PathBuf::from("lib/a.ts"))
        );
    }

    #[test]
    fn test_scope_admits_config_file_only_beside_watched_dirs() {
        let scopes = vec![PathBuf::from("features"), PathBuf::from("lib")];
        let config = Some(Path::new("hotdev.toml"));

        assert!(in_scope(Path::new("hotdev.toml"), &scopes, config));
        assert!(in_scope(Path::new("lib/util.ts"), &scopes, config));
        assert!(!in_scope(Path::new("package.json"), &scopes, config));
        assert!(!in_scope(Path::new("hotdev.toml"), &scopes, None));
        // A project-root watch path covers everything.
        assert!(in_scope(Path::new("package.json"), &[PathBuf::new()], None));
    }

    #[test]
    fn test_project_relative_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hotdev.toml"), "").unwrap();
        let mut config = DevConfig::default();
        config.project.root = dir.path().to_path_buf();

        assert_eq!(
            project_relative(&config, &dir.path().join("hotdev.toml")),
            Some(PathBuf::from("hotdev.toml"))
        );
        assert_eq!(project_relative(&config, Path::new("/definitely/elsewhere.toml")), None);
    }

    #[test]
    fn test_compiled_dir_is_ignored_by_default() {
        let mut config = DevConfig::default();
        config.project.root = PathBuf::from("/project");
        let (watcher, _rx) = ProjectWatcher::new(&config);

        assert!(watcher.ignore.iter().any(|p| p == "dist"));
        assert_eq!(watcher.paths[0], PathBuf::from("/project/features"));
    }
}
