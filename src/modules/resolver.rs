//! Mapping logical module identifiers to compiled artifact paths.

use std::path::{Path, PathBuf};

/// A module the server knows how to find in the compiled output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleId {
    /// `features/<feature>/Controller/<action>`
    Controller { feature: String, action: String },
    /// A service implementation, identified by its source directory relative
    /// to the project root (e.g. `features/Post/Service`).
    Service { dir: PathBuf },
}

/// Resolves [`ModuleId`]s against the compiled output directory.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    compiled_dir: PathBuf,
    features_dir: PathBuf,
    extension: String,
}

impl ArtifactResolver {
    /// `features_dir` is relative to the project root, as it appears in the
    /// compiled tree.
    pub fn new(
        compiled_dir: impl Into<PathBuf>,
        features_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            compiled_dir: compiled_dir.into(),
            features_dir: features_dir.into(),
            extension: extension.into(),
        }
    }

    /// Latest compiled path for `id`.
    pub fn resolve(&self, id: &ModuleId) -> PathBuf {
        match id {
            ModuleId::Controller { feature, action } => self
                .compiled_dir
                .join(&self.features_dir)
                .join(feature)
                .join("Controller")
                .join(format!("{action}.{}", self.extension)),
            ModuleId::Service { dir } => self
                .compiled_dir
                .join(dir)
                .join(format!("index.{}", self.extension)),
        }
    }

    /// Project-relative source name of a controller action, as shown to
    /// developers when it is missing.
    pub fn controller_display(&self, feature: &str, action: &str) -> String {
        format!("features/{feature}/Controller/{action}.{}", self.extension)
    }

    pub fn compiled_dir(&self) -> &Path {
        &self.compiled_dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}
