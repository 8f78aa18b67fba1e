//! Service interface parsing.
//!
//! # Responsibilities
//! - Parse a TypeScript service interface file with tree-sitter
//! - Extract each declared interface and its method signatures
//!
//! # Design Decisions
//! - Only the shape is extracted (names and type text); types are never
//!   resolved or checked
//! - `Promise<T>` outputs are unwrapped to `T`, a missing parameter is `void`
//! - Both method signatures (`get(id: number): Promise<Post>`) and function
//!   typed properties (`get: (id: number) => Promise<Post>`) count as methods

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tree_sitter::{Node, Parser};

/// Why an interface file could not be turned into a descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Failed to load the TypeScript grammar: {0}")]
    Language(String),

    #[error("Syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    #[error("No interface declared")]
    NoInterface,
}

/// Type text as written in the source (e.g. `Post[]`, `{ id: number }`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TypeRef(String);

impl TypeRef {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn void() -> Self {
        Self("void".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_void(&self) -> bool {
        self.0 == "void"
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One remotely callable method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceMethod {
    pub name: String,
    pub input: TypeRef,
    pub output: TypeRef,
}

/// A parsed service interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub interface_name: String,
    pub methods: BTreeMap<String, ServiceMethod>,
}

impl ServiceDescriptor {
    /// Feature the service belongs to: `PostService` → `Post`.
    pub fn feature(&self) -> &str {
        match self.interface_name.strip_suffix("Service") {
            Some(feature) if !feature.is_empty() => feature,
            _ => &self.interface_name,
        }
    }
}

/// Parse every interface declared in `source`, in declaration order.
pub fn parse_service_interfaces(source: &str) -> Result<Vec<ServiceDescriptor>, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
        .map_err(|e| ParseError::Language(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::Language("parser returned no tree".to_string()))?;
    let root = tree.root_node();

    if root.has_error() {
        let node = first_error(root).unwrap_or(root);
        let position = node.start_position();
        return Err(ParseError::Syntax {
            line: position.row + 1,
            column: position.column + 1,
        });
    }

    let bytes = source.as_bytes();
    let mut cursor = root.walk();
    let interfaces = root
        .named_children(&mut cursor)
        .filter_map(interface_node)
        .map(|node| describe_interface(node, bytes))
        .collect();

    Ok(interfaces)
}

/// Parse the first interface in `source`.
pub fn parse_service(source: &str) -> Result<ServiceDescriptor, ParseError> {
    parse_service_interfaces(source)?
        .into_iter()
        .next()
        .ok_or(ParseError::NoInterface)
}

fn interface_node(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "interface_declaration" => Some(node),
        "export_statement" => node
            .child_by_field_name("declaration")
            .filter(|decl| decl.kind() == "interface_declaration"),
        _ => None,
    }
}

fn describe_interface(node: Node<'_>, source: &[u8]) -> ServiceDescriptor {
    let interface_name = node
        .child_by_field_name("name")
        .map(|name| text(name, source))
        .unwrap_or_default();

    let mut methods = BTreeMap::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            let method = match member.kind() {
                "method_signature" => method_from_signature(member, source),
                "property_signature" => method_from_property(member, source),
                _ => None,
            };
            if let Some(method) = method {
                // Overloads: the first signature wins.
                methods.entry(method.name.clone()).or_insert(method);
            }
        }
    }

    ServiceDescriptor {
        interface_name,
        methods,
    }
}

fn method_from_signature(node: Node<'_>, source: &[u8]) -> Option<ServiceMethod> {
    let name = text(node.child_by_field_name("name")?, source);
    let input = node
        .child_by_field_name("parameters")
        .and_then(|params| first_parameter_type(params, source))
        .unwrap_or_else(TypeRef::void);
    let output = node
        .child_by_field_name("return_type")
        .and_then(|annotation| annotation.named_child(0))
        .map(|ty| unwrap_promise(ty, source))
        .unwrap_or_else(TypeRef::void);

    Some(ServiceMethod {
        name,
        input,
        output,
    })
}

fn method_from_property(node: Node<'_>, source: &[u8]) -> Option<ServiceMethod> {
    let name = text(node.child_by_field_name("name")?, source);
    let function = node
        .child_by_field_name("type")?
        .named_child(0)
        .filter(|ty| ty.kind() == "function_type")?;

    let input = function
        .child_by_field_name("parameters")
        .and_then(|params| first_parameter_type(params, source))
        .unwrap_or_else(TypeRef::void);
    let output = function
        .child_by_field_name("return_type")
        .map(|ty| unwrap_promise(ty, source))
        .unwrap_or_else(TypeRef::void);

    Some(ServiceMethod {
        name,
        input,
        output,
    })
}

fn first_parameter_type(params: Node<'_>, source: &[u8]) -> Option<TypeRef> {
    let mut cursor = params.walk();
    let param = params
        .named_children(&mut cursor)
        .find(|p| matches!(p.kind(), "required_parameter" | "optional_parameter"))?;

    let ty = param
        .child_by_field_name("type")
        .and_then(|annotation| annotation.named_child(0))
        .map(|ty| TypeRef::new(text(ty, source)))
        .unwrap_or_else(|| TypeRef::new("any"));
    Some(ty)
}

fn unwrap_promise(ty: Node<'_>, source: &[u8]) -> TypeRef {
    if ty.kind() == "generic_type" {
        let is_promise = ty
            .child_by_field_name("name")
            .is_some_and(|name| text(name, source) == "Promise");
        if is_promise {
            if let Some(inner) = ty
                .child_by_field_name("type_arguments")
                .and_then(|args| args.named_child(0))
            {
                return TypeRef::new(text(inner, source));
            }
        }
    }
    TypeRef::new(text(ty, source))
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

fn text(node: Node<'_>, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST_SERVICE: &str = r#"
import { Post } from '../Model';

export interface PostService {
  get(id: number): Promise<Post>;
  list(): Promise<Post[]>;
  readonly version: string;
}
"#;

    #[test]
    fn test_exported_interface_methods() {
        let service = parse_service(POST_SERVICE).unwrap();

        assert_eq!(service.interface_name, "PostService");
        assert_eq!(service.feature(), "Post");
        assert_eq!(service.methods.len(), 2);

        let get = &service.methods["get"];
        assert_eq!(get.input.as_str(), "number");
        assert_eq!(get.output.as_str(), "Post");

        let list = &service.methods["list"];
        assert!(list.input.is_void());
        assert_eq!(list.output.as_str(), "Post[]");
    }

    #[test]
    fn test_bare_interface_without_suffix() {
        let service = parse_service("interface Billing { charge(amount: number): boolean; }").unwrap();
        assert_eq!(service.feature(), "Billing");
        assert_eq!(service.methods["charge"].output.as_str(), "boolean");
    }

    #[test]
    fn test_function_typed_property() {
        let service =
            parse_service("interface TagService { find: (name: string) => Promise<Tag>; }").unwrap();
        let find = &service.methods["find"];
        assert_eq!(find.input.as_str(), "string");
        assert_eq!(find.output.as_str(), "Tag");
    }

    #[test]
    fn test_first_of_several_interfaces() {
        let source = "interface AService { a(): void; }\ninterface BService { b(): void; }";
        assert_eq!(parse_service_interfaces(source).unwrap().len(), 2);
        assert_eq!(parse_service(source).unwrap().interface_name, "AService");
    }

    #[test]
    fn test_no_interface() {
        assert_eq!(
            parse_service("export const x = 1;").unwrap_err(),
            ParseError::NoInterface
        );
    }

    #[test]
    fn test_syntax_error_position() {
        let err = parse_service("interface PostService {\n  get(id: number: Promise<Post>;\n").unwrap_err();
        match err {
            ParseError::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }
}
