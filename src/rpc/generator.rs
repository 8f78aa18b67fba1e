//! Client callers and server routes for parsed services.
//!
//! # Responsibilities
//! - Render the client caller module (`features/<F>/Caller.ts`)
//! - Mount `POST /rpc/<F>/<method>` routes backed by the service's
//!   compiled `default` export
//!
//! # Design Decisions
//! - The caller is kept as a structured `CallerModule` and only rendered to
//!   TypeScript when written, so the Rust client can call the same endpoints
//! - Writing an unchanged caller is skipped to avoid retriggering the watcher
//! - Declared types are carried through verbatim and never checked against
//!   the implementation

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::http::response::JsonPayload;
use crate::modules::{ModuleError, ModuleRegistry};
use crate::observability::metrics;
use crate::rpc::parser::{parse_service, ParseError, ServiceDescriptor, ServiceMethod, TypeRef};

/// File name of the generated caller inside a feature directory.
pub const CALLER_FILE: &str = "Caller.ts";

/// Endpoint serving `method` of `feature`.
pub fn rpc_endpoint(feature: &str, method: &str) -> String {
    format!("/rpc/{feature}/{method}")
}

/// One async function of the client caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerFunction {
    pub name: String,
    pub endpoint: String,
    pub input: TypeRef,
    pub output: TypeRef,
}

impl CallerFunction {
    fn render(&self, out: &mut String) {
        let (params, body) = if self.input.is_void() {
            (String::new(), "{}".to_string())
        } else {
            (format!("input: {}", self.input), "input".to_string())
        };

        let _ = writeln!(
            out,
            "export const {} = async ({params}): Promise<{}> => {{",
            self.name, self.output
        );
        let _ = writeln!(out, "  const response = await fetch('{}', {{", self.endpoint);
        out.push_str("    method: 'POST',\n");
        out.push_str("    headers: { 'Content-Type': 'application/json' },\n");
        let _ = writeln!(out, "    body: JSON.stringify({body}),");
        out.push_str("  });\n");
        out.push_str("  return response.json();\n");
        out.push_str("};\n");
    }
}

/// The client caller for one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerModule {
    pub feature: String,
    pub functions: Vec<CallerFunction>,
}

impl CallerModule {
    pub fn generate(feature: &str, methods: &BTreeMap<String, ServiceMethod>) -> Self {
        let functions = methods
            .values()
            .map(|method| CallerFunction {
                name: method.name.clone(),
                endpoint: rpc_endpoint(feature, &method.name),
                input: method.input.clone(),
                output: method.output.clone(),
            })
            .collect();

        Self {
            feature: feature.to_string(),
            functions,
        }
    }

    pub fn function(&self, name: &str) -> Option<&CallerFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// TypeScript source of the module.
    pub fn render(&self) -> String {
        let mut out = format!(
            "// Generated by hotdev for the {} service. Do not edit.\n",
            self.feature
        );
        for function in &self.functions {
            out.push('\n');
            function.render(&mut out);
        }
        out
    }
}

/// Write `caller` to `<features_dir>/<feature>/Caller.ts`.
///
/// Returns `false` when the file already had the same content.
pub fn write_caller(features_dir: &Path, caller: &CallerModule) -> std::io::Result<bool> {
    let dir = features_dir.join(&caller.feature);
    let path = dir.join(CALLER_FILE);
    let text = caller.render();

    if std::fs::read_to_string(&path).is_ok_and(|existing| existing == text) {
        return Ok(false);
    }

    std::fs::create_dir_all(&dir)?;
    std::fs::write(&path, text)?;
    Ok(true)
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Failed to write caller for {feature}: {source}")]
    Write {
        feature: String,
        #[source]
        source: std::io::Error,
    },
}

/// A service ready to be mounted.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedService {
    pub descriptor: ServiceDescriptor,
    pub caller: CallerModule,
    /// Compiled implementation module.
    pub module_path: PathBuf,
}

impl GeneratedService {
    pub fn feature(&self) -> &str {
        self.descriptor.feature()
    }
}

/// Parse `interface_file`, write its caller and describe the routes to mount.
pub fn generate_service(
    interface_file: &Path,
    features_dir: &Path,
    module_path: PathBuf,
) -> Result<GeneratedService, GenerateError> {
    let source = std::fs::read_to_string(interface_file).map_err(|source| GenerateError::Read {
        path: interface_file.to_path_buf(),
        source,
    })?;
    let descriptor = parse_service(&source).map_err(|source| GenerateError::Parse {
        path: interface_file.to_path_buf(),
        source,
    })?;

    let feature = descriptor.feature().to_string();
    let caller = CallerModule::generate(&feature, &descriptor.methods);
    let written = write_caller(features_dir, &caller).map_err(|source| GenerateError::Write {
        feature: feature.clone(),
        source,
    })?;

    tracing::info!(
        feature = %feature,
        methods = descriptor.methods.len(),
        caller_written = written,
        "Service generated"
    );

    Ok(GeneratedService {
        descriptor,
        caller,
        module_path,
    })
}

/// Why an RPC call could not produce a result.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error("'{path}' has no default export")]
    NoDefaultExport { path: PathBuf },

    #[error("{feature} service does not implement '{method}'")]
    MissingMethod { feature: String, method: String },
}

/// Server side of one RPC method.
#[derive(Debug, Clone)]
pub struct RpcBinding {
    feature: String,
    method: String,
    module_path: PathBuf,
    registry: Arc<ModuleRegistry>,
}

impl RpcBinding {
    pub fn new(
        feature: impl Into<String>,
        method: impl Into<String>,
        module_path: impl Into<PathBuf>,
        registry: Arc<ModuleRegistry>,
    ) -> Self {
        Self {
            feature: feature.into(),
            method: method.into(),
            module_path: module_path.into(),
            registry,
        }
    }

    /// Load (or reuse) the implementation and read the method's result.
    pub fn invoke(&self) -> Result<Value, InvocationError> {
        let module = self.registry.load(&self.module_path)?;
        let service = module
            .default_export()
            .ok_or_else(|| InvocationError::NoDefaultExport {
                path: self.module_path.clone(),
            })?;

        service
            .get(&self.method)
            .cloned()
            .ok_or_else(|| InvocationError::MissingMethod {
                feature: self.feature.clone(),
                method: self.method.clone(),
            })
    }

    fn respond(&self) -> Response {
        let payload = match self.invoke() {
            Ok(value) => JsonPayload::ok(value),
            Err(e) => {
                tracing::error!(
                    feature = %self.feature,
                    method = %self.method,
                    error = %e,
                    "RPC call failed"
                );
                JsonPayload::error(StatusCode::INTERNAL_SERVER_ERROR, e)
            }
        };
        metrics::record_rpc_call(&self.feature, payload.status().as_u16());
        payload.into_response()
    }
}

/// Mount the RPC routes of every service.
pub fn rpc_router<'a>(
    services: impl IntoIterator<Item = &'a GeneratedService>,
    registry: &Arc<ModuleRegistry>,
) -> Router {
    let mut router = Router::new();
    for service in services {
        let feature = service.feature();
        for name in service.descriptor.methods.keys() {
            let binding = Arc::new(RpcBinding::new(
                feature,
                name.as_str(),
                service.module_path.clone(),
                Arc::clone(registry),
            ));
            // The request body is accepted but not interpreted.
            router = router.route(
                &rpc_endpoint(feature, name),
                post(move || {
                    let binding = Arc::clone(&binding);
                    async move { binding.respond() }
                }),
            );
        }
    }
    router
}
