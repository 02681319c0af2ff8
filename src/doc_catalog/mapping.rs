//! Index mapping trees
//!
//! Parses the `properties` object of an index mapping into a [`MappingNode`]
//! tree and overlays the array hints kept under `_meta.<namespace>`.
//!
//! The document engine has no array type: any field may hold one value or
//! many. Array-ness therefore travels out of band, as a sparse tree that
//! mirrors the property tree:
//!
//! ```json
//! { "_meta": { "doctable": { "c": { "f": { "isArray": true, "g": { "isArray": true } } } } } }
//! ```
//!
//! Hint keys may also be dotted (`"a.b.y": { "isArray": true }`).

use log::debug;
use serde_json::Value;

use super::errors::{ConnectorError, Result};
use crate::source::IndexMapping;

const IS_ARRAY: &str = "isArray";

#[derive(Debug, Clone, PartialEq)]
pub enum MappingNodeKind {
    /// Leaf field with its declared native type
    Field { native_type: String },
    /// Object with named children, in mapping order
    Object { children: Vec<(String, MappingNode)> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingNode {
    pub kind: MappingNodeKind,
    pub is_array: bool,
}

impl MappingNode {
    pub fn field(native_type: impl Into<String>) -> Self {
        MappingNode {
            kind: MappingNodeKind::Field {
                native_type: native_type.into(),
            },
            is_array: false,
        }
    }

    pub fn object(children: Vec<(String, MappingNode)>) -> Self {
        MappingNode {
            kind: MappingNodeKind::Object { children },
            is_array: false,
        }
    }
}

/// Parsed property tree of one index
#[derive(Debug, Clone, PartialEq)]
pub struct MappingTree {
    pub index: String,
    pub roots: Vec<(String, MappingNode)>,
}

impl MappingTree {
    /// Parse a mapping and apply the array hints found under `namespace`
    pub fn parse(mapping: &IndexMapping, namespace: &str) -> Result<Self> {
        let mut roots = parse_properties(&mapping.index, &mapping.properties, "")?;
        if let Some(hints) = mapping.array_hints(namespace) {
            apply_array_hints(&mapping.index, &mut roots, hints, "");
        }
        Ok(MappingTree {
            index: mapping.index.clone(),
            roots,
        })
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn parse_properties(index: &str, properties: &Value, prefix: &str) -> Result<Vec<(String, MappingNode)>> {
    let Value::Object(properties) = properties else {
        return Err(ConnectorError::invalid_mapping_with_context(
            index,
            format!("properties of `{}` must be an object", prefix),
        ));
    };

    properties
        .iter()
        .map(|(name, body)| {
            let path = join_path(prefix, name);
            parse_node(index, body, &path).map(|node| (name.clone(), node))
        })
        .collect()
}

fn parse_node(index: &str, body: &Value, path: &str) -> Result<MappingNode> {
    if !body.is_object() {
        return Err(ConnectorError::invalid_mapping_with_context(
            index,
            format!("field `{}` must be declared with an object", path),
        ));
    }

    let native_type = body.get("type").and_then(Value::as_str);
    let nested = native_type == Some("nested");

    let node = match (body.get("properties"), native_type) {
        (Some(properties), _) => MappingNode::object(parse_properties(index, properties, path)?),
        (None, None | Some("object") | Some("nested")) => MappingNode::object(Vec::new()),
        (None, Some(native_type)) => MappingNode::field(native_type),
    };

    Ok(MappingNode {
        is_array: nested,
        ..node
    })
}

fn find_node_mut<'a>(
    nodes: &'a mut [(String, MappingNode)],
    segments: &[&str],
) -> Option<&'a mut MappingNode> {
    let (head, rest) = segments.split_first()?;
    let node = nodes
        .iter_mut()
        .find(|(name, _)| name == head)
        .map(|(_, node)| node)?;
    if rest.is_empty() {
        return Some(node);
    }
    match &mut node.kind {
        MappingNodeKind::Object { children } => find_node_mut(children, rest),
        MappingNodeKind::Field { .. } => None,
    }
}

/// Tag nodes named by the hint tree as arrays
pub fn apply_array_hints(index: &str, nodes: &mut [(String, MappingNode)], hints: &Value, prefix: &str) {
    let Value::Object(hints) = hints else {
        return;
    };

    for (key, hint) in hints {
        if key == IS_ARRAY {
            continue;
        }
        let path = join_path(prefix, key);

        // A literal key wins over a dotted walk
        let literal = nodes.iter().position(|(name, _)| name == key);
        let node = match literal {
            Some(pos) => Some(&mut nodes[pos].1),
            None => {
                let segments: Vec<&str> = key.split('.').collect();
                find_node_mut(nodes, &segments)
            }
        };

        let Some(node) = node else {
            debug!("Index {}: array hint for unmapped field {} ignored", index, path);
            continue;
        };

        if hint.get(IS_ARRAY).and_then(Value::as_bool) == Some(true) {
            node.is_array = true;
        }
        if let MappingNodeKind::Object { children } = &mut node.kind {
            apply_array_hints(index, children, hint, &path);
        }
    }
}
