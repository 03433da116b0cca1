//! AST serialization transform.
//!
//! Converts the parent-linked arena tree into an acyclic, JSON-compatible
//! value: a depth-first copy that walks only the owning parent → children
//! direction and omits the `parent` back-reference at every level.
//!
//! Node identity is re-checked against a per-branch visited set that is
//! copied, not shared, at each recursive step (sibling branches never
//! falsely suppress each other), and a node reached a second time within the
//! same branch is replaced with an explicit `"circular"` marker instead of
//! recursing forever. The transform applies uniformly regardless of source
//! language.

use std::collections::HashSet;

use crate::ast::{Ast, NodeId};
use serde_json::{Value, json};

/// Serialize a whole tree from its root, with the tree's warnings attached
/// to the root object.
#[tracing::instrument(skip_all, fields(node_count = ast.len()))]
pub fn to_serializable(ast: &Ast) -> Value {
    let mut root = node_to_serializable(ast, ast.root());
    if let Value::Object(obj) = &mut root {
        obj.insert(
            "warnings".to_string(),
            serde_json::to_value(&ast.warnings).unwrap_or(Value::Null),
        );
    }
    root
}

/// Serialize the subtree rooted at `id`.
pub fn node_to_serializable(ast: &Ast, id: NodeId) -> Value {
    serialize_node(ast, id, &HashSet::new())
}

fn serialize_node(ast: &Ast, id: NodeId, visited: &HashSet<NodeId>) -> Value {
    let node = ast.node(id);
    if visited.contains(&id) {
        return json!({
            "circular": true,
            "node_type": node.node_type,
        });
    }

    // Per-branch copy: siblings each get their own set.
    let mut branch = visited.clone();
    branch.insert(id);

    let children: Vec<Value> = node
        .children
        .iter()
        .map(|&child| serialize_node(ast, child, &branch))
        .collect();

    json!({
        "node_type": node.node_type,
        "span": { "start": node.span.start, "end": node.span.end },
        "properties": serde_json::to_value(&node.properties).unwrap_or(Value::Null),
        "children": children,
    })
}
