//! Handler resolution for resource routes.
//!
//! # Responsibilities
//! - Resolve a `(feature, action)` pair to a loaded controller module
//! - Fall back to an informative stub when the controller is missing
//!
//! # Design Decisions
//! - A broken or missing controller never prevents the route from being
//!   registered; it is bound to a stub that names the file to create
//! - Lookup is a trait so route binding can be tested without a project

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use thiserror::Error;

use crate::modules::{ArtifactResolver, LoadedModule, ModuleError, ModuleId, ModuleRegistry};
use crate::observability::metrics;
use crate::routing::resource::{Action, HandlerRef};

/// Why a controller action could not be bound.
#[derive(Debug, Error)]
pub enum HandlerResolutionError {
    #[error("{display}: {source}")]
    Module {
        display: String,
        #[source]
        source: ModuleError,
    },

    #[error("{display} does not export '{action}'")]
    MissingExport { display: String, action: Action },
}

/// A route's handler after resolution.
#[derive(Debug, Clone)]
pub enum BoundHandler {
    /// Serves the export named after the action.
    Export {
        module: Arc<LoadedModule>,
        action: Action,
    },
    /// Stub for a controller that does not exist yet.
    Missing { message: String },
}

impl BoundHandler {
    /// Stub pointing the developer at `display`.
    pub fn missing(display: &str) -> Self {
        BoundHandler::Missing {
            message: format!("You need to create '{display}'"),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, BoundHandler::Missing { .. })
    }

    /// Produce the response for one request.
    pub fn respond(&self) -> Response {
        match self {
            BoundHandler::Export { module, action } => match module.export(action.as_str()) {
                Some(Value::String(text)) => text.clone().into_response(),
                Some(value) => Json(value.clone()).into_response(),
                None => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("'{}' lost its '{}' export", module.path().display(), action),
                )
                    .into_response(),
            },
            BoundHandler::Missing { message } => message.clone().into_response(),
        }
    }
}

/// Resolves controller actions.
pub trait HandlerLookup: Send + Sync {
    fn lookup(&self, handler: &HandlerRef) -> Result<BoundHandler, HandlerResolutionError>;

    /// Project-relative name of the controller file, for messages.
    fn describe(&self, handler: &HandlerRef) -> String;
}

/// Resolve `handler`, binding the stub when resolution fails.
pub fn resolve_or_stub(lookup: &dyn HandlerLookup, handler: &HandlerRef) -> BoundHandler {
    match lookup.lookup(handler) {
        Ok(bound) => bound,
        Err(e) => {
            let shown = lookup.describe(handler);
            tracing::error!(
                feature = %handler.feature,
                action = %handler.action,
                error = %e,
                "'{}' could not be loaded.",
                shown
            );
            metrics::record_handler_miss(&handler.feature, handler.action.as_str());
            BoundHandler::missing(&shown)
        }
    }
}

/// Looks controllers up in the compiled output through the module cache.
pub struct ControllerLookup {
    registry: Arc<ModuleRegistry>,
    resolver: ArtifactResolver,
}

impl ControllerLookup {
    pub fn new(registry: Arc<ModuleRegistry>, resolver: ArtifactResolver) -> Self {
        Self { registry, resolver }
    }
}

impl HandlerLookup for ControllerLookup {
    fn lookup(&self, handler: &HandlerRef) -> Result<BoundHandler, HandlerResolutionError> {
        let path = self.resolver.resolve(&ModuleId::Controller {
            feature: handler.feature.clone(),
            action: handler.action.as_str().to_string(),
        });

        let module = self
            .registry
            .load(&path)
            .map_err(|source| HandlerResolutionError::Module {
                display: self.describe(handler),
                source,
            })?;

        if module.export(handler.action.as_str()).is_none() {
            return Err(HandlerResolutionError::MissingExport {
                display: self.describe(handler),
                action: handler.action,
            });
        }

        Ok(BoundHandler::Export {
            module,
            action: handler.action,
        })
    }

    fn describe(&self, handler: &HandlerRef) -> String {
        self.resolver
            .controller_display(&handler.feature, handler.action.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn handler_ref(feature: &str, action: Action) -> HandlerRef {
        HandlerRef {
            feature: feature.to_string(),
            action,
        }
    }

    fn write_controller(root: &Path, feature: &str, action: &str, body: &str) {
        let dir = root.join("features").join(feature).join("Controller");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{action}.js")), body).unwrap();
    }

    fn lookup_for(root: &Path) -> ControllerLookup {
        ControllerLookup::new(
            Arc::new(ModuleRegistry::default()),
            ArtifactResolver::new(root, "features", "js"),
        )
    }

    #[test]
    fn test_missing_controller_binds_stub() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = lookup_for(dir.path());

        let bound = resolve_or_stub(&lookup, &handler_ref("Post", Action::Browse));

        match bound {
            BoundHandler::Missing { message } => assert_eq!(
                message,
                "You need to create 'features/Post/Controller/browse.js'"
            ),
            other => panic!("expected stub, got {other:?}"),
        }
    }

    #[test]
    fn test_existing_controller_binds_export() {
        let dir = tempfile::tempdir().unwrap();
        write_controller(dir.path(), "Post", "fetch", r#"{"fetch": {"id": 1}}"#);
        let lookup = lookup_for(dir.path());

        let bound = lookup.lookup(&handler_ref("Post", Action::Fetch)).unwrap();
        assert!(!bound.is_missing());
    }

    #[test]
    fn test_module_without_action_export_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_controller(dir.path(), "Post", "create", r#"{"somethingElse": 1}"#);
        let lookup = lookup_for(dir.path());

        let err = lookup.lookup(&handler_ref("Post", Action::Create)).unwrap_err();
        assert!(matches!(err, HandlerResolutionError::MissingExport { .. }));
        assert!(resolve_or_stub(&lookup, &handler_ref("Post", Action::Create)).is_missing());
    }

    #[test]
    fn test_malformed_controller_binds_stub() {
        let dir = tempfile::tempdir().unwrap();
        write_controller(dir.path(), "Post", "update", "not json at all");
        let lookup = lookup_for(dir.path());

        let err = lookup.lookup(&handler_ref("Post", Action::Update)).unwrap_err();
        assert!(matches!(err, HandlerResolutionError::Module { .. }));
    }
}
