//! The external compiler seam.

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::config::DevConfig;

/// Outcome of one compiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileReport {
    pub succeeded: bool,
    pub diagnostics: Vec<String>,
}

impl CompileReport {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            diagnostics: Vec::new(),
        }
    }
}

/// Compiles the project after `changed` was modified.
pub trait Compiler: Send + Sync {
    fn compile(&self, changed: &Path) -> impl Future<Output = CompileReport> + Send;
}

/// Runs a command (e.g. `npx tsc -p config/server/tsconfig.json`) in the
/// project root. Output lines become diagnostics; success is a zero exit.
/// An empty command means something else keeps the output up to date.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    command: String,
    args: Vec<String>,
    root: PathBuf,
}

impl CommandCompiler {
    pub fn new(command: impl Into<String>, args: Vec<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args,
            root: root.into(),
        }
    }

    pub fn from_config(config: &DevConfig) -> Self {
        Self::new(
            config.compiler.command.clone(),
            config.compiler.args.clone(),
            config.project.root.clone(),
        )
    }
}

impl Compiler for CommandCompiler {
    async fn compile(&self, changed: &Path) -> CompileReport {
        if self.command.trim().is_empty() {
            return CompileReport::success();
        }

        tracing::debug!(command = %self.command, changed = %changed.display(), "Compiling");
        let output = Command::new(&self.command)
            .args(&self.args)
            .current_dir(&self.root)
            .output()
            .await;

        match output {
            Ok(output) => {
                let diagnostics = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .chain(String::from_utf8_lossy(&output.stderr).lines())
                    .map(str::trim_end)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();

                CompileReport {
                    succeeded: output.status.success(),
                    diagnostics,
                }
            }
            Err(e) => CompileReport {
                succeeded: false,
                diagnostics: vec![format!("Failed to run '{}': {e}", self.command)],
            },
        }
    }
}
