//! Expansion of resource descriptors into routes.
//!
//! # Responsibilities
//! - Derive the five conventional CRUD routes for each resource
//! - Scope collection routes of nested resources under `/<parent>/:id/`
//! - Preserve depth-first, parent-before-children emission order
//!
//! # Design Decisions
//! - `ResourceRoutes` is an iterator driven by an explicit stack; calling
//!   `build_routes` again restarts the sequence
//! - Member routes are never scoped, only collection routes are
//! - Cycles are not detected; descriptor trees come from TOML and cannot
//!   reference themselves

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One RESTful resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceDescriptor {
    /// Feature owning the controllers for this resource.
    pub feature: String,

    /// Path segment to use instead of the feature name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Sub-resources scoped under `/<path>/:id/`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResourceDescriptor>,
}

impl ResourceDescriptor {
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            alias: None,
            children: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_children(mut self, children: Vec<ResourceDescriptor>) -> Self {
        self.children = children;
        self
    }

    /// Lowercased path segment (`alias`, else `feature`).
    pub fn path_segment(&self) -> String {
        self.alias
            .as_deref()
            .unwrap_or(&self.feature)
            .to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controller action a route dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Fetch,
    Update,
    Destroy,
    Browse,
    Create,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Fetch => "fetch",
            Action::Update => "update",
            Action::Destroy => "destroy",
            Action::Browse => "browse",
            Action::Create => "create",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(feature, action)` pair naming a controller action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HandlerRef {
    pub feature: String,
    pub action: Action,
}

/// One HTTP route produced from a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub method: HttpMethod,
    /// Path with `:id` placeholders, e.g. `/post/:id/comment`.
    pub path: String,
    pub handler: HandlerRef,
}

impl RouteEntry {
    fn new(method: HttpMethod, path: String, feature: &str, action: Action) -> Self {
        Self {
            method,
            path,
            handler: HandlerRef {
                feature: feature.to_string(),
                action,
            },
        }
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<6} {} -> {}.{}",
            self.method, self.path, self.handler.feature, self.handler.action
        )
    }
}

/// Lazy sequence of routes for a descriptor tree.
#[derive(Debug, Clone)]
pub struct ResourceRoutes<'a> {
    stack: Vec<(&'a ResourceDescriptor, Option<String>)>,
    pending: VecDeque<RouteEntry>,
}

impl<'a> ResourceRoutes<'a> {
    fn new(resources: &'a [ResourceDescriptor], parent: Option<&str>) -> Self {
        let parent = parent.map(str::to_string);
        let stack = resources
            .iter()
            .rev()
            .map(|resource| (resource, parent.clone()))
            .collect();
        Self {
            stack,
            pending: VecDeque::new(),
        }
    }

    fn expand(&mut self, resource: &'a ResourceDescriptor, parent: Option<String>) {
        let path = resource.path_segment();
        let scoped = match &parent {
            Some(parent) => format!("{parent}/:id/{path}"),
            None => path.clone(),
        };
        let feature = &resource.feature;

        self.pending.extend([
            RouteEntry::new(HttpMethod::Get, format!("/{path}/:id"), feature, Action::Fetch),
            RouteEntry::new(HttpMethod::Put, format!("/{path}/:id"), feature, Action::Update),
            RouteEntry::new(HttpMethod::Delete, format!("/{path}/:id"), feature, Action::Destroy),
            RouteEntry::new(HttpMethod::Get, format!("/{scoped}"), feature, Action::Browse),
            RouteEntry::new(HttpMethod::Post, format!("/{scoped}"), feature, Action::Create),
        ]);

        // Children go on top of the stack so they are expanded before the
        // next sibling.
        for child in resource.children.iter().rev() {
            self.stack.push((child, Some(path.clone())));
        }
    }
}

impl Iterator for ResourceRoutes<'_> {
    type Item = RouteEntry;

    fn next(&mut self) -> Option<RouteEntry> {
        loop {
            if let Some(route) = self.pending.pop_front() {
                return Some(route);
            }
            let (resource, parent) = self.stack.pop()?;
            self.expand(resource, parent);
        }
    }
}

/// Expand `resources` (optionally nested under `parent`) into routes.
pub fn build_routes<'a>(
    resources: &'a [ResourceDescriptor],
    parent: Option<&str>,
) -> ResourceRoutes<'a> {
    ResourceRoutes::new(resources, parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(routes: impl Iterator<Item = RouteEntry>) -> Vec<(String, String)> {
        routes
            .map(|r| (r.method.to_string(), r.path))
            .collect()
    }

    fn expected(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(m, p)| (m.to_string(), p.to_string()))
            .collect()
    }

    #[test]
    fn test_single_resource() {
        let resources = vec![ResourceDescriptor::new("Post")];
        let routes: Vec<_> = build_routes(&resources, None).collect();

        assert_eq!(
            pairs(routes.clone().into_iter()),
            expected(&[
                ("GET", "/post/:id"),
                ("PUT", "/post/:id"),
                ("DELETE", "/post/:id"),
                ("GET", "/post"),
                ("POST", "/post"),
            ])
        );
        let actions: Vec<_> = routes.iter().map(|r| r.handler.action).collect();
        assert_eq!(
            actions,
            vec![Action::Fetch, Action::Update, Action::Destroy, Action::Browse, Action::Create]
        );
        assert!(routes.iter().all(|r| r.handler.feature == "Post"));
    }

    #[test]
    fn test_nested_child_scoping() {
        let resources =
            vec![ResourceDescriptor::new("Post").with_children(vec![ResourceDescriptor::new("Comment")])];
        let routes: Vec<_> = build_routes(&resources, None).collect();

        assert_eq!(routes.len(), 10);
        assert_eq!(
            pairs(routes[5..].iter().cloned()),
            expected(&[
                ("GET", "/comment/:id"),
                ("PUT", "/comment/:id"),
                ("DELETE", "/comment/:id"),
                ("GET", "/post/:id/comment"),
                ("POST", "/post/:id/comment"),
            ])
        );
        assert!(routes[5..].iter().all(|r| r.handler.feature == "Comment"));
    }

    #[test]
    fn test_route_count_is_five_per_descriptor() {
        let resources = vec![ResourceDescriptor::new("Post").with_children(vec![
            ResourceDescriptor::new("Comment"),
            ResourceDescriptor::new("Tag"),
        ])];

        assert_eq!(build_routes(&resources, None).count(), 15);
    }

    #[test]
    fn test_alias_takes_precedence() {
        let resources = vec![ResourceDescriptor::new("Order").with_alias("Orders")];
        let routes: Vec<_> = build_routes(&resources, None).collect();

        assert!(routes.iter().all(|r| r.path.starts_with("/orders")));
        assert!(routes.iter().all(|r| r.handler.feature == "Order"));
    }

    #[test]
    fn test_depth_first_sibling_order() {
        let resources = vec![
            ResourceDescriptor::new("A").with_children(vec![
                ResourceDescriptor::new("B").with_children(vec![ResourceDescriptor::new("C")]),
            ]),
            ResourceDescriptor::new("D"),
        ];
        let features: Vec<_> = build_routes(&resources, None)
            .step_by(5)
            .map(|r| r.handler.feature)
            .collect();

        assert_eq!(features, vec!["A", "B", "C", "D"]);

        // Grandchildren are scoped under their direct parent only.
        let c_browse = build_routes(&resources, None)
            .find(|r| r.handler.feature == "C" && r.handler.action == Action::Browse)
            .unwrap();
        assert_eq!(c_browse.path, "/b/:id/c");
    }

    #[test]
    fn test_explicit_parent_prefix() {
        let resources = vec![ResourceDescriptor::new("Comment")];
        let browse = build_routes(&resources, Some("post")).nth(3).unwrap();
        assert_eq!(browse.path, "/post/:id/comment");
    }

    #[test]
    fn test_empty_list_and_restart() {
        assert_eq!(build_routes(&[], None).count(), 0);

        let resources = vec![ResourceDescriptor::new("Post")];
        let routes = build_routes(&resources, None);
        let first: Vec<_> = routes.clone().collect();
        let second: Vec<_> = routes.collect();
        assert_eq!(first, second);
    }
}
