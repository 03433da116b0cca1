//! Arena-backed abstract syntax tree.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. The
//! owning direction is strictly parent → children; the `parent` field is a
//! non-owning back-index used only for upward traversal during parsing and is
//! excluded from every exported representation (see [`crate::serialize`]).
//!
//! Node kinds are plain strings from [`quarry_core::lang::nodes`] and
//! construct details are key/value properties, so adding a language never
//! changes the node shape.

use std::collections::BTreeMap;

use crate::diagnostics::ParseWarning;
use crate::token::Span;
use serde::Serialize;

/// Stable identity of a node within one [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A property value: the JSON-compatible scalar/sequence/mapping subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<PropValue>),
    Map(BTreeMap<String, PropValue>),
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}

impl From<Vec<PropValue>> for PropValue {
    fn from(v: Vec<PropValue>) -> Self {
        PropValue::List(v)
    }
}

/// One AST node: a construct kind, its properties, and its children.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub node_type: &'static str,
    pub properties: BTreeMap<String, PropValue>,
    pub children: Vec<NodeId>,
    /// Non-owning back-reference; never followed for ownership.
    pub parent: Option<NodeId>,
    pub span: Span,
}

/// A parsed tree plus the warnings accumulated while building it.
///
/// Constructed fresh for every parse call; nothing is shared or pooled
/// across invocations.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    nodes: Vec<AstNode>,
    root: NodeId,
    pub warnings: Vec<ParseWarning>,
}

impl Ast {
    /// Create a tree containing only a root node of the given type.
    pub fn new(root_type: &'static str) -> Self {
        let root = AstNode {
            node_type: root_type,
            properties: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
            span: Span::default(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            warnings: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut AstNode {
        &mut self.nodes[id.0]
    }

    /// Append a new child node under `parent` and return its id.
    pub fn add_node(&mut self, parent: NodeId, node_type: &'static str, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(AstNode {
            node_type,
            properties: BTreeMap::new(),
            children: Vec::new(),
            parent: Some(parent),
            span,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn set_prop(&mut self, id: NodeId, key: &str, value: impl Into<PropValue>) {
        self.nodes[id.0].properties.insert(key.to_string(), value.into());
    }

    pub fn prop(&self, id: NodeId, key: &str) -> Option<&PropValue> {
        self.nodes[id.0].properties.get(key)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate all node ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// All nodes of the given type, in creation order.
    pub fn nodes_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.ids().filter(move |id| self.node(*id).node_type == node_type)
    }
}
