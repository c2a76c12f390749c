//! Nodes of the routing tree and their per-method handler tables.

use std::sync::Arc;

use crate::parser::Method;
use crate::router::handlers::head_handler;
use crate::server::handler::HandlerFn;

/// Label shared by every parameter node.
pub(crate) const PARAM_LABEL: char = ':';

/// Label shared by every catch-all node.
pub(crate) const WILDCARD_LABEL: char = '*';

/// How a node consumes the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// Matches its prefix verbatim.
    Static,
    /// Matches one non-empty segment.
    Param,
    /// Matches the rest of the path.
    Wildcard,
}

/// A handler registered for one method at one node.
#[derive(Clone)]
pub(crate) struct Endpoint {
    pub handler: HandlerFn,
    /// Names bound to captured values, left to right.
    pub param_names: Arc<[String]>,
    /// The pattern as registered, for listings.
    pub pattern: Arc<str>,
    /// Installed by the router rather than by a registration.
    pub synthetic: bool,
}

/// Fixed-size table of endpoints indexed by [`Method::index`].
#[derive(Clone, Default)]
pub(crate) struct MethodTable {
    slots: [Option<Endpoint>; Method::COUNT],
    allowed: String,
}

impl MethodTable {
    pub fn get(&self, method: Method) -> Option<&Endpoint> {
        self.slots[method.index()].as_ref()
    }

    /// Install an endpoint, replacing whatever the slot held.
    ///
    /// A GET endpoint also (re)installs the synthetic HEAD endpoint, unless a
    /// HEAD handler was registered explicitly.
    pub fn set(&mut self, method: Method, endpoint: Endpoint) {
        if method == Method::GET {
            let head = &mut self.slots[Method::HEAD.index()];
            if head.as_ref().map_or(true, |e| e.synthetic) {
                *head = Some(Endpoint {
                    handler: head_handler(endpoint.handler.clone()),
                    param_names: endpoint.param_names.clone(),
                    pattern: endpoint.pattern.clone(),
                    synthetic: true,
                });
            }
        }
        self.slots[method.index()] = Some(endpoint);
        self.allowed = Method::ALL
            .iter()
            .filter(|m| self.slots[m.index()].is_some())
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Methods with a handler, joined by `", "`.
    pub fn allowed(&self) -> &str {
        &self.allowed
    }

    /// Endpoints registered explicitly, in `Allow` order.
    pub fn registered(&self) -> impl Iterator<Item = (Method, &Endpoint)> {
        Method::ALL.into_iter().filter_map(|m| {
            self.slots[m.index()]
                .as_ref()
                .filter(|e| !e.synthetic)
                .map(|e| (m, e))
        })
    }
}

/// A node of the routing tree.
///
/// Static children are unique by label. Parameter and catch-all children
/// are held apart so that lookup order is fixed: static, then parameter,
/// then catch-all.
#[derive(Clone)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub label: char,
    pub prefix: String,
    pub children: Vec<Node>,
    pub param: Option<Box<Node>>,
    pub wildcard: Option<Box<Node>>,
    pub methods: MethodTable,
}

impl Node {
    pub fn root() -> Self {
        Self::new_static("/")
    }

    pub fn new_static(prefix: &str) -> Self {
        Self {
            kind: NodeKind::Static,
            label: prefix.chars().next().unwrap_or_default(),
            prefix: prefix.to_string(),
            children: Vec::new(),
            param: None,
            wildcard: None,
            methods: MethodTable::default(),
        }
    }

    pub fn new_param() -> Self {
        Self {
            kind: NodeKind::Param,
            label: PARAM_LABEL,
            prefix: PARAM_LABEL.to_string(),
            ..Self::new_static("")
        }
    }

    pub fn new_wildcard() -> Self {
        Self {
            kind: NodeKind::Wildcard,
            label: WILDCARD_LABEL,
            prefix: WILDCARD_LABEL.to_string(),
            ..Self::new_static("")
        }
    }

    pub fn static_child(&self, label: char) -> Option<&Node> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Split a static node after `at` bytes of its prefix.
    ///
    /// The tail, together with every child and handler the node owned, moves
    /// into a single new child; the node keeps the shortened prefix and an
    /// empty method table.
    pub fn split(&mut self, at: usize) {
        let tail = Node {
            kind: NodeKind::Static,
            label: self.prefix[at..].chars().next().unwrap_or_default(),
            prefix: self.prefix[at..].to_string(),
            children: std::mem::take(&mut self.children),
            param: self.param.take(),
            wildcard: self.wildcard.take(),
            methods: std::mem::take(&mut self.methods),
        };
        self.prefix.truncate(at);
        self.children.push(tail);
    }
}

/// Length in bytes of the longest common prefix of `a` and `b`.
///
/// Always falls on a char boundary of both strings.
pub(crate) fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::handler::handler_fn;
    use crate::server::{HttpResponse, StatusCode};

    fn endpoint(pattern: &str) -> Endpoint {
        Endpoint {
            handler: handler_fn(|_req| async { Ok(HttpResponse::new(StatusCode::Ok)) }),
            param_names: Arc::from(Vec::new()),
            pattern: Arc::from(pattern),
            synthetic: false,
        }
    }

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len("users/", "user"), 4);
        assert_eq!(common_prefix_len("abc", "xyz"), 0);
        assert_eq!(common_prefix_len("same", "same"), 4);
        // "é" and "è" share their first UTF-8 byte but not the char
        assert_eq!(common_prefix_len("café", "cafè"), 3);
    }

    #[test]
    fn test_get_installs_head() {
        let mut table = MethodTable::default();
        table.set(Method::GET, endpoint("/x"));
        assert!(table.get(Method::HEAD).is_some_and(|e| e.synthetic));
        assert_eq!(table.allowed(), "GET, HEAD");
        assert_eq!(table.registered().count(), 1);
    }

    #[test]
    fn test_explicit_head_survives_get() {
        let mut table = MethodTable::default();
        table.set(Method::HEAD, endpoint("/x"));
        table.set(Method::GET, endpoint("/x"));
        assert!(table.get(Method::HEAD).is_some_and(|e| !e.synthetic));
    }

    #[test]
    fn test_allowed_order() {
        let mut table = MethodTable::default();
        table.set(Method::POST, endpoint("/x"));
        table.set(Method::GET, endpoint("/x"));
        assert_eq!(table.allowed(), "GET, POST, HEAD");
    }

    #[test]
    fn test_split_keeps_handlers() {
        let mut node = Node::new_static("users/");
        node.methods.set(Method::GET, endpoint("/users/"));
        node.children.push(Node::new_static("new"));
        node.split(4);

        assert_eq!(node.prefix, "user");
        assert!(node.methods.is_empty());
        assert_eq!(node.children.len(), 1);

        let tail = &node.children[0];
        assert_eq!(tail.prefix, "s/");
        assert_eq!(tail.label, 's');
        assert!(tail.methods.get(Method::GET).is_some());
        assert_eq!(tail.children[0].prefix, "new");
    }
}
