//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Resource names must be usable as URL path segments
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DevConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::DevConfig;
use crate::routing::ResourceDescriptor;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("resource feature name must not be empty")]
    EmptyFeature,

    #[error("resource '{feature}' has an empty alias")]
    EmptyAlias { feature: String },

    #[error("'{name}' is not a valid path segment (use letters, digits, '-' or '_')")]
    InvalidSegment { name: String },

    #[error("module extension '{0}' must not contain dots or slashes")]
    ModuleExtension(String),
}

/// Validate a loaded configuration.
pub fn validate_config(config: &DevConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("server.request_timeout_secs"));
    }
    if config.server.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("server.shutdown_timeout_secs"));
    }

    let ext = &config.project.module_extension;
    if ext.is_empty() || ext.contains(['.', '/', '\\']) {
        errors.push(ValidationError::ModuleExtension(ext.clone()));
    }

    let mut stack: Vec<&ResourceDescriptor> = config.resources.iter().collect();
    while let Some(resource) = stack.pop() {
        validate_resource(resource, &mut errors);
        stack.extend(resource.children.iter());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_resource(resource: &ResourceDescriptor, errors: &mut Vec<ValidationError>) {
    if resource.feature.is_empty() {
        errors.push(ValidationError::EmptyFeature);
        return;
    }
    if !is_path_segment(&resource.feature) {
        errors.push(ValidationError::InvalidSegment {
            name: resource.feature.clone(),
        });
    }

    match resource.alias.as_deref() {
        Some("") => errors.push(ValidationError::EmptyAlias {
            feature: resource.feature.clone(),
        }),
        Some(alias) if !is_path_segment(alias) => errors.push(ValidationError::InvalidSegment {
            name: alias.to_string(),
        }),
        _ => {}
    }
}

fn is_path_segment(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
