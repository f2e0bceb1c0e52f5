//! Association request trees
//!
//! Callers name the associations to authorize as a list whose entries are
//! either a bare name or a single-key mapping to a nested list:
//!
//! ```json
//! ["author", {"posts": ["comments", {"tags": []}]}]
//! ```

use crate::error::{AuthzError, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

/// Depth limit used when parsing without a resolver configuration
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// One requested association
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociationRequest {
    /// Bare association name
    Name(String),
    /// Association plus the associations to authorize beneath it
    Nested {
        name: String,
        children: Vec<AssociationRequest>,
    },
}

impl AssociationRequest {
    pub fn name(name: impl Into<String>) -> Self {
        AssociationRequest::Name(name.into())
    }

    pub fn nested(name: impl Into<String>, children: Vec<AssociationRequest>) -> Self {
        AssociationRequest::Nested {
            name: name.into(),
            children,
        }
    }

    /// Association this node requests
    pub fn association(&self) -> &str {
        match self {
            AssociationRequest::Name(name) => name,
            AssociationRequest::Nested { name, .. } => name,
        }
    }

    pub fn children(&self) -> &[AssociationRequest] {
        match self {
            AssociationRequest::Name(_) => &[],
            AssociationRequest::Nested { children, .. } => children,
        }
    }

    /// Levels in this subtree, counting this node
    pub fn depth(&self) -> usize {
        1 + tree_depth(self.children())
    }

    /// Parse one node: a string or a single-key object
    pub fn parse(value: &Value) -> Result<Self> {
        Self::parse_node(value, 1, DEFAULT_MAX_DEPTH)
    }

    /// Parse a request list; a lone node is accepted as a one-element list
    pub fn parse_list(value: &Value) -> Result<Vec<Self>> {
        Self::parse_list_within(value, DEFAULT_MAX_DEPTH)
    }

    /// Parse a request list, rejecting it as soon as a node lies deeper
    /// than `max_depth` levels
    pub fn parse_list_within(value: &Value, max_depth: usize) -> Result<Vec<Self>> {
        Self::parse_nodes(value, 1, max_depth)
    }

    fn parse_nodes(value: &Value, level: usize, max_depth: usize) -> Result<Vec<Self>> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| Self::parse_node(item, level, max_depth))
                .collect(),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![Self::parse_node(other, level, max_depth)?]),
        }
    }

    fn parse_node(value: &Value, level: usize, max_depth: usize) -> Result<Self> {
        if level > max_depth {
            return Err(AuthzError::Validation(format!(
                "association request is too deep, the limit is {}",
                max_depth
            )));
        }

        match value {
            Value::String(name) => Ok(AssociationRequest::Name(name.clone())),
            Value::Object(map) if map.len() == 1 => {
                let (name, children) = map.iter().next().ok_or_else(|| {
                    AuthzError::Validation("empty association mapping".to_string())
                })?;
                Ok(AssociationRequest::Nested {
                    name: name.clone(),
                    children: Self::parse_nodes(children, level + 1, max_depth)?,
                })
            }
            Value::Object(map) => Err(AuthzError::Validation(format!(
                "there can be only one key for each nested association, e.g. {{\"posts\": [\"comments\"]}}, got {} keys",
                map.len()
            ))),
            other => Err(AuthzError::Validation(format!(
                "expected an association name or a single-key mapping, got {}",
                other
            ))),
        }
    }
}

/// Deepest level in a request list; zero when empty
pub fn tree_depth(nodes: &[AssociationRequest]) -> usize {
    let mut deepest = 0;
    let mut stack: Vec<(&AssociationRequest, usize)> = nodes.iter().map(|node| (node, 1)).collect();
    while let Some((node, level)) = stack.pop() {
        deepest = deepest.max(level);
        stack.extend(node.children().iter().map(|child| (child, level + 1)));
    }
    deepest
}

impl From<&str> for AssociationRequest {
    fn from(name: &str) -> Self {
        AssociationRequest::Name(name.to_string())
    }
}

impl Serialize for AssociationRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            AssociationRequest::Name(name) => serializer.serialize_str(name),
            AssociationRequest::Nested { name, children } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(name, children)?;
                map.end()
            }
        }
    }
}
