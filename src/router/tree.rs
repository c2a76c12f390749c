//! The routing tree: pattern insertion and path resolution.

use std::fmt;
use std::sync::Arc;

use crate::parser::Method;
use crate::router::error::RouteError;
use crate::router::node::{common_prefix_len, Endpoint, Node, NodeKind};
use crate::router::params::Params;
use crate::server::handler::HandlerFn;

/// A piece of a route pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'p> {
    /// Literal text, matched verbatim.
    Static(&'p str),
    /// `:name`, matching one segment.
    Param(&'p str),
    /// `*name`, matching the rest of the path.
    Wildcard(&'p str),
}

/// Split a route pattern into tokens.
///
/// `:` and `*` introduce a parameter and may only appear at the start of a
/// segment.
pub(crate) fn tokenize(pattern: &str) -> Result<Vec<Token<'_>>, RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::MissingLeadingSlash(pattern.to_string()));
    }

    let bytes = pattern.as_bytes();
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut i = 1;
    while i < bytes.len() {
        let marker = bytes[i];
        if !matches!(marker, b':' | b'*') {
            i += 1;
            continue;
        }
        if bytes[i - 1] != b'/' {
            return Err(RouteError::MisplacedParam(pattern.to_string()));
        }

        if start < i {
            tokens.push(Token::Static(&pattern[start..i]));
        }
        let end = pattern[i..].find('/').map_or(pattern.len(), |n| i + n);
        let name = &pattern[i + 1..end];
        if name.is_empty() {
            return Err(RouteError::EmptyParamName(pattern.to_string()));
        }
        if name.contains([':', '*']) {
            return Err(RouteError::MisplacedParam(pattern.to_string()));
        }
        if marker == b'*' {
            if end != pattern.len() {
                return Err(RouteError::WildcardNotLast(pattern.to_string()));
            }
            tokens.push(Token::Wildcard(name));
        } else {
            tokens.push(Token::Param(name));
        }
        start = end;
        i = end;
    }

    if start < pattern.len() {
        tokens.push(Token::Static(&pattern[start..]));
    }
    Ok(tokens)
}

/// Outcome of resolving a request path.
pub enum Resolution {
    /// A handler exists for the method; `params` holds the captured values.
    Found { handler: HandlerFn, params: Params },
    /// The path is known but has no handler for the method.
    MethodNotAllowed { allowed: String },
    /// No route matches the path.
    NotFound,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Found { params, .. } => {
                f.debug_struct("Found").field("params", params).finish_non_exhaustive()
            }
            Resolution::MethodNotAllowed { allowed } => {
                f.debug_struct("MethodNotAllowed").field("allowed", allowed).finish()
            }
            Resolution::NotFound => f.write_str("NotFound"),
        }
    }
}

/// A compressed prefix tree mapping (method, pattern) pairs to handlers.
#[derive(Clone)]
pub(crate) struct RouteTree {
    root: Node,
}

impl Default for RouteTree {
    fn default() -> Self {
        Self { root: Node::root() }
    }
}

impl RouteTree {
    /// Register `handler` for `method` on `pattern`.
    ///
    /// Registering the same method and pattern again replaces the handler.
    pub fn insert(&mut self, method: Method, pattern: &str, handler: HandlerFn) -> Result<(), RouteError> {
        let tokens = tokenize(pattern)?;
        let mut names = Vec::new();
        let mut node = &mut self.root;

        for (i, token) in tokens.into_iter().enumerate() {
            node = match token {
                Token::Static(text) => {
                    // The root owns the leading slash
                    let text = if i == 0 { &text[1..] } else { text };
                    insert_static(node, text)
                }
                Token::Param(name) => {
                    names.push(name.to_string());
                    &mut **node.param.get_or_insert_with(|| Box::new(Node::new_param()))
                }
                Token::Wildcard(name) => {
                    names.push(name.to_string());
                    &mut **node.wildcard.get_or_insert_with(|| Box::new(Node::new_wildcard()))
                }
            };
        }

        node.methods.set(method, Endpoint {
            handler,
            param_names: Arc::from(names),
            pattern: Arc::from(pattern),
            synthetic: false,
        });
        Ok(())
    }

    /// Find the handler for `method` on `path`.
    ///
    /// The path is matched first, regardless of method: static children are
    /// tried before the parameter child, which is tried before the catch-all
    /// child, and a branch that ends without a route falls back to the next
    /// candidate at the same level and then to the levels above. The method
    /// is then looked up on the matched node only.
    pub fn resolve(&self, method: Method, path: &str) -> Resolution {
        let Some(rest) = path.strip_prefix('/') else {
            return Resolution::NotFound;
        };

        let mut values = Vec::new();
        let Some(node) = find(&self.root, rest, &mut values) else {
            return Resolution::NotFound;
        };

        match node.methods.get(method) {
            Some(endpoint) => {
                let params = endpoint
                    .param_names
                    .iter()
                    .map(String::as_str)
                    .zip(values)
                    .collect();
                Resolution::Found {
                    handler: endpoint.handler.clone(),
                    params,
                }
            }
            None => Resolution::MethodNotAllowed {
                allowed: node.methods.allowed().to_string(),
            },
        }
    }

    /// Every explicitly registered (method, pattern) pair, depth first.
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut routes = Vec::new();
        collect(&self.root, &mut routes);
        routes
    }
}

/// Descend from `node` along static children until `text` is consumed,
/// splitting and creating nodes as needed.
fn insert_static<'n>(node: &'n mut Node, text: &str) -> &'n mut Node {
    let Some(label) = text.chars().next() else {
        return node;
    };

    match node.children.iter().position(|c| c.label == label) {
        Some(idx) => {
            let child = &mut node.children[idx];
            let common = common_prefix_len(&child.prefix, text);
            if common < child.prefix.len() {
                child.split(common);
            }
            insert_static(child, &text[common..])
        }
        None => {
            node.children.push(Node::new_static(text));
            let idx = node.children.len() - 1;
            &mut node.children[idx]
        }
    }
}

/// Depth-first search for a node that consumes all of `path` and has at
/// least one handler.
///
/// `values` receives the segments captured on the way down; entries pushed
/// by a branch that fails are removed again before the next branch runs.
fn find<'n, 'p>(node: &'n Node, path: &'p str, values: &mut Vec<&'p str>) -> Option<&'n Node> {
    if path.is_empty() {
        if !node.methods.is_empty() {
            return Some(node);
        }
        // A catch-all also matches an empty remainder
        return match node.wildcard.as_deref() {
            Some(wild) if !wild.methods.is_empty() => {
                values.push(path);
                Some(wild)
            }
            _ => None,
        };
    }

    if let Some(child) = path.chars().next().and_then(|c| node.static_child(c)) {
        if let Some(rest) = path.strip_prefix(child.prefix.as_str()) {
            if let Some(found) = find(child, rest, values) {
                return Some(found);
            }
        } else if child.prefix.strip_suffix('/') == Some(path) {
            // "/files" against "/files/*path" binds an empty remainder
            if let Some(wild) = child.wildcard.as_deref().filter(|w| !w.methods.is_empty()) {
                values.push("");
                return Some(wild);
            }
        }
    }

    if let Some(param) = node.param.as_deref() {
        let end = path.find('/').unwrap_or(path.len());
        if end > 0 {
            values.push(&path[..end]);
            if let Some(found) = find(param, &path[end..], values) {
                return Some(found);
            }
            values.pop();
        }
    }

    match node.wildcard.as_deref() {
        Some(wild) if !wild.methods.is_empty() => {
            values.push(path);
            Some(wild)
        }
        _ => None,
    }
}

fn collect(node: &Node, routes: &mut Vec<(Method, String)>) {
    routes.extend(
        node.methods
            .registered()
            .map(|(method, endpoint)| (method, endpoint.pattern.to_string())),
    );
    for child in &node.children {
        collect(child, routes);
    }
    if let Some(param) = node.param.as_deref() {
        collect(param, routes);
    }
    if let Some(wild) = node.wildcard.as_deref() {
        collect(wild, routes);
    }
}

impl fmt::Debug for RouteTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, depth: usize) -> fmt::Result {
            let kind = match node.kind {
                NodeKind::Static => "static",
                NodeKind::Param => "param",
                NodeKind::Wildcard => "wildcard",
            };
            writeln!(f, "{:indent$}{:?} ({kind}) [{}]", "", node.prefix, node.methods.allowed(), indent = depth * 2)?;
            for child in &node.children {
                write_node(f, child, depth + 1)?;
            }
            if let Some(param) = node.param.as_deref() {
                write_node(f, param, depth + 1)?;
            }
            if let Some(wild) = node.wildcard.as_deref() {
                write_node(f, wild, depth + 1)?;
            }
            Ok(())
        }

        write_node(f, &self.root, 0)
    }
}
