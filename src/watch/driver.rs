//! Build driver: turns file changes into orchestrator events.
//!
//! Sources (by extension) go through the compiler and become
//! `WatchEvent::Build`; everything else becomes `WatchEvent::Change`.
//! Removals of sources still trigger a build so stale output is reported.
//! A change to the configuration file needs no compiler but still reloads,
//! since the route table is rebuilt from it.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::config::DevConfig;
use crate::reload::{BuildEvent, WatchEvent};
use crate::watch::compiler::Compiler;
use crate::watch::watcher::FileChange;

pub struct BuildDriver<C> {
    compiler: C,
    source_extensions: Vec<String>,
    config_file: Option<PathBuf>,
}

impl<C: Compiler> BuildDriver<C> {
    pub fn new(compiler: C, source_extensions: Vec<String>) -> Self {
        Self {
            compiler,
            source_extensions,
            config_file: None,
        }
    }

    /// Treat changes to `relative` (project-relative) as reload triggers.
    pub fn with_config_file(mut self, relative: impl Into<PathBuf>) -> Self {
        self.config_file = Some(relative.into());
        self
    }

    pub fn from_config(compiler: C, config: &DevConfig) -> Self {
        Self::new(compiler, config.watch.source_extensions.clone())
    }

    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.source_extensions.iter().any(|s| s == ext))
    }

    /// Compile if needed and describe the result.
    pub async fn translate(&self, change: &FileChange) -> WatchEvent {
        let path = change.path();
        if self.config_file.as_deref() == Some(path) {
            return WatchEvent::Build(BuildEvent::succeeded(path));
        }
        if !self.is_source(path) {
            return WatchEvent::Change(path.to_path_buf());
        }

        let report = self.compiler.compile(path).await;
        if report.succeeded {
            WatchEvent::Build(BuildEvent {
                changed_path: path.to_path_buf(),
                succeeded: true,
                diagnostics: report.diagnostics,
            })
        } else {
            WatchEvent::Build(BuildEvent::failed(path, report.diagnostics))
        }
    }

    /// Compile once before the first listener starts.
    pub async fn initial_build(&self) -> BuildEvent {
        let report = self.compiler.compile(Path::new(".")).await;
        BuildEvent {
            changed_path: ".".into(),
            succeeded: report.succeeded,
            diagnostics: report.diagnostics,
        }
    }

    /// Forward translated changes until either channel closes.
    pub async fn run(
        self,
        mut changes: mpsc::UnboundedReceiver<FileChange>,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) {
        while let Some(change) = changes.recv().await {
            let event = self.translate(&change).await;
            if events.send(event).is_err() {
                break;
            }
        }
        tracing::debug!("Build driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::compiler::CompileReport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeCompiler {
        succeed: bool,
        runs: AtomicUsize,
    }

    impl Compiler for FakeCompiler {
        async fn compile(&self, _changed: &Path) -> CompileReport {
            self.runs.fetch_add(1, Ordering::SeqCst);
            CompileReport {
                succeeded: self.succeed,
                diagnostics: if self.succeed { vec![] } else { vec!["TS2304".to_string()] },
            }
        }
    }

    fn driver(succeed: bool) -> BuildDriver<FakeCompiler> {
        BuildDriver::new(
            FakeCompiler {
                succeed,
                runs: AtomicUsize::new(0),
            },
            vec!["ts".to_string(), "tsx".to_string()],
        )
    }

    #[tokio::test]
    async fn test_source_change_compiles() {
        let driver = driver(true);
        let event = driver
            .translate(&FileChange::Modified("features/Post/Controller/fetch.ts".into()))
            .await;

        assert_eq!(
            event,
            WatchEvent::Build(BuildEvent::succeeded("features/Post/Controller/fetch.ts"))
        );
        assert_eq!(driver.compiler.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_compile_carries_diagnostics() {
        let driver = driver(false);
        let event = driver.translate(&FileChange::Modified("lib/a.ts".into())).await;

        assert_eq!(
            event,
            WatchEvent::Build(BuildEvent::failed("lib/a.ts", vec!["TS2304".to_string()]))
        );
    }

    #[tokio::test]
    async fn test_stylesheet_change_skips_compiler() {
        let driver = driver(true);
        let event = driver
            .translate(&FileChange::Modified("stylesheets/main.css".into()))
            .await;

        assert_eq!(event, WatchEvent::Change("stylesheets/main.css".into()));
        assert_eq!(driver.compiler.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_config_file_change_reloads_without_compiling() {
        let driver = driver(false).with_config_file("hotdev.toml");
        let event = driver.translate(&FileChange::Modified("hotdev.toml".into())).await;

        assert_eq!(event, WatchEvent::Build(BuildEvent::succeeded("hotdev.toml")));
        assert_eq!(driver.compiler.runs.load(Ordering::SeqCst), 0);

        // Other toml files stay plain changes.
        let other = driver.translate(&FileChange::Modified("config/app.toml".into())).await;
        assert_eq!(other, WatchEvent::Change("config/app.toml".into()));
    }

    #[tokio::test]
    async fn test_run_forwards_until_closed() {
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        change_tx.send(FileChange::Created("schema.sql".into())).unwrap();
        drop(change_tx);
        driver(true).run(change_rx, event_tx).await;

        assert_eq!(event_rx.recv().await, Some(WatchEvent::Change("schema.sql".into())));
        assert_eq!(event_rx.recv().await, None);
    }
}
