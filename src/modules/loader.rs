//! Loading compiled modules from disk.
//!
//! # Responsibilities
//! - Read a compiled artifact and expose its named exports
//! - Report unreadable or malformed artifacts as typed errors
//!
//! # Design Decisions
//! - Loading sits behind the `ModuleLoader` trait so the registry can be
//!   tested with counting/in-memory loaders
//! - The built-in format is a JSON object keyed by export name

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while loading a module.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("failed to read module {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("module {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl ModuleError {
    /// True when the artifact does not exist at all.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ModuleError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Named exports of one compiled module.
pub type Exports = Map<String, Value>;

/// Loads the exports of a compiled module.
pub trait ModuleLoader: Send + Sync {
    /// Read and evaluate the module at `path`.
    fn load(&self, path: &Path) -> Result<Exports, ModuleError>;
}

/// Loader for artifacts whose body is a JSON exports object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModuleLoader;

impl ModuleLoader for JsonModuleLoader {
    fn load(&self, path: &Path) -> Result<Exports, ModuleError> {
        let content = std::fs::read_to_string(path).map_err(|source| ModuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(exports)) => Ok(exports),
            Ok(other) => Err(ModuleError::Malformed {
                path: path.to_path_buf(),
                reason: format!("expected an exports object, found {}", json_kind(&other)),
            }),
            Err(e) => Err(ModuleError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_exports_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("browse.js");
        std::fs::write(&path, r#"{"browse": [1, 2, 3]}"#).unwrap();

        let exports = JsonModuleLoader.load(&path).unwrap();
        assert_eq!(exports["browse"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = JsonModuleLoader
            .load(Path::new("/no/such/module.js"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_non_object_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch.js");
        std::fs::write(&path, "[1]").unwrap();

        let err = JsonModuleLoader.load(&path).unwrap_err();
        assert!(matches!(err, ModuleError::Malformed { .. }));
        assert!(!err.is_not_found());
    }
}
