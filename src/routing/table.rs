//! Route table: resource routes bound to handlers and mounted on axum.
//!
//! # Responsibilities
//! - Collect the expanded routes for the configured resources
//! - Bind every route to a controller action (or the stub)
//! - Build an axum `Router`, one method router per path
//!
//! # Design Decisions
//! - Built fresh on every reload cycle, never mutated afterwards
//! - Duplicate `(method, path)` pairs keep the first registration
//! - `:param` placeholders are converted to axum's `{param}` form only at
//!   mount time; the table itself keeps the conventional notation

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;

use crate::observability::metrics;
use crate::routing::handler::{resolve_or_stub, HandlerLookup};
use crate::routing::resource::{build_routes, HttpMethod, ResourceDescriptor, RouteEntry};

/// Ordered list of resource routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Expand `resources` in registration order.
    pub fn from_resources(resources: &[ResourceDescriptor]) -> Self {
        Self {
            entries: build_routes(resources, None).collect(),
        }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bind every route through `lookup` and mount it.
    pub fn mount(&self, lookup: &dyn HandlerLookup) -> Router {
        let mut seen = HashSet::new();
        let mut order: Vec<String> = Vec::new();
        let mut methods: HashMap<String, MethodRouter> = HashMap::new();

        for entry in &self.entries {
            if !seen.insert((entry.method, entry.path.as_str())) {
                tracing::warn!(
                    method = %entry.method,
                    path = %entry.path,
                    feature = %entry.handler.feature,
                    "Duplicate route ignored"
                );
                continue;
            }

            let bound = Arc::new(resolve_or_stub(lookup, &entry.handler));
            let endpoint = move || {
                let bound = Arc::clone(&bound);
                async move { bound.respond() }
            };

            let path = axum_path(&entry.path);
            let filter = method_filter(entry.method);
            let method_router = match methods.remove(&path) {
                Some(existing) => existing.on(filter, endpoint),
                None => {
                    order.push(path.clone());
                    on(filter, endpoint)
                }
            };
            methods.insert(path, method_router);
        }

        metrics::record_route_table(seen.len());

        order.into_iter().fold(Router::new(), |router, path| {
            match methods.remove(&path) {
                Some(method_router) => router.route(&path, method_router),
                None => router,
            }
        })
    }
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

/// `/post/:id/comment` → `/post/{id}/comment`
fn axum_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler::{BoundHandler, HandlerResolutionError};
    use crate::routing::resource::HandlerRef;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// Binds every action to the stub.
    struct NothingCompiled;

    impl HandlerLookup for NothingCompiled {
        fn lookup(&self, handler: &HandlerRef) -> Result<BoundHandler, HandlerResolutionError> {
            Err(HandlerResolutionError::MissingExport {
                display: self.describe(handler),
                action: handler.action,
            })
        }

        fn describe(&self, handler: &HandlerRef) -> String {
            format!("features/{}/Controller/{}.js", handler.feature, handler.action)
        }
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_axum_path_conversion() {
        assert_eq!(axum_path("/post/:id"), "/post/{id}");
        assert_eq!(axum_path("/post/:id/comment"), "/post/{id}/comment");
        assert_eq!(axum_path("/post"), "/post");
    }

    #[test]
    fn test_table_preserves_order() {
        let table = RouteTable::from_resources(&[
            ResourceDescriptor::new("Post"),
            ResourceDescriptor::new("Order"),
        ]);
        assert_eq!(table.len(), 10);
        assert_eq!(table.entries()[0].handler.feature, "Post");
        assert_eq!(table.entries()[5].handler.feature, "Order");
    }

    #[tokio::test]
    async fn test_missing_controller_serves_hint() {
        let table = RouteTable::from_resources(&[ResourceDescriptor::new("Post")]);
        let app = table.mount(&NothingCompiled);

        let response = app
            .oneshot(Request::get("/post/7").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            "You need to create 'features/Post/Controller/fetch.js'"
        );
    }

    #[tokio::test]
    async fn test_methods_share_a_path() {
        let table = RouteTable::from_resources(&[ResourceDescriptor::new("Post")]);
        let app = table.mount(&NothingCompiled);

        let response = app
            .oneshot(Request::post("/post").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            body_text(response).await,
            "You need to create 'features/Post/Controller/create.js'"
        );
    }

    #[tokio::test]
    async fn test_duplicate_routes_keep_first() {
        // Both resources map to /post; mounting must not panic on overlap.
        let table = RouteTable::from_resources(&[
            ResourceDescriptor::new("Post"),
            ResourceDescriptor::new("Article").with_alias("post"),
        ]);
        assert_eq!(table.len(), 10);

        let app = table.mount(&NothingCompiled);
        let response = app
            .oneshot(Request::get("/post").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            body_text(response).await,
            "You need to create 'features/Post/Controller/browse.js'"
        );
    }

    #[tokio::test]
    async fn test_unrouted_method_is_rejected() {
        let table = RouteTable::from_resources(&[ResourceDescriptor::new("Post")]);
        let app = table.mount(&NothingCompiled);

        let response = app
            .oneshot(Request::patch("/post/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
