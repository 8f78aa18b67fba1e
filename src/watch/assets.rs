//! Handlers for files the compiler does not own.
//!
//! `css` changes rebuild `public/main.css` from the stylesheets directory;
//! every other extension is acknowledged and ignored.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::DevConfig;

/// Name of the bundled stylesheet inside the public directory.
pub const STYLESHEET_BUNDLE: &str = "main.css";

#[derive(Debug, Error)]
#[error("Failed to compile stylesheets into '{output}': {source}")]
pub struct AssetError {
    output: PathBuf,
    #[source]
    source: std::io::Error,
}

/// What an asset handler did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetAction {
    Stylesheets { output: PathBuf, sources: usize },
    Ignored,
}

#[derive(Debug, Clone)]
pub struct AssetHandlers {
    stylesheets_dir: PathBuf,
    public_dir: PathBuf,
}

impl AssetHandlers {
    pub fn new(stylesheets_dir: impl Into<PathBuf>, public_dir: impl Into<PathBuf>) -> Self {
        Self {
            stylesheets_dir: stylesheets_dir.into(),
            public_dir: public_dir.into(),
        }
    }

    pub fn from_config(config: &DevConfig) -> Self {
        Self::new(
            config.resolve(&config.project.stylesheets_dir),
            config.resolve(&config.project.public_dir),
        )
    }

    /// Dispatch on the extension of `path`.
    pub async fn handle(&self, path: &Path) -> Result<AssetAction, AssetError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("css") => self.compile_stylesheets().await,
            _ => Ok(AssetAction::Ignored),
        }
    }

    /// Concatenate `stylesheets/*.css` (sorted by name) into
    /// `public/main.css`.
    pub async fn compile_stylesheets(&self) -> Result<AssetAction, AssetError> {
        let output = self.public_dir.join(STYLESHEET_BUNDLE);
        let fail = |source| AssetError {
            output: output.clone(),
            source,
        };

        let mut sources = Vec::new();
        match tokio::fs::read_dir(&self.stylesheets_dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await.map_err(fail)? {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext == "css") {
                        sources.push(path);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(fail(e)),
        }
        sources.sort();

        let mut bundle = String::new();
        for source in &sources {
            let text = tokio::fs::read_to_string(source).await.map_err(fail)?;
            bundle.push_str(&text);
            if !bundle.ends_with('\n') {
                bundle.push('\n');
            }
        }

        tokio::fs::create_dir_all(&self.public_dir)
            .await
            .map_err(fail)?;
        tokio::fs::write(&output, bundle).await.map_err(fail)?;

        tracing::info!(output = %output.display(), sources = sources.len(), "Stylesheets compiled");
        Ok(AssetAction::Stylesheets {
            output,
            sources: sources.len(),
        })
    }
}
