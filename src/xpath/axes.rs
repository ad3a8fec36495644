//! XPath Axis Navigation
//!
//! Implements the element axes over the arena tree. Every axis returns
//! nodes in document order except `ancestor` and `preceding-sibling`, which
//! return them nearest first (reverse axes); the evaluator restores
//! document order after each step.

use super::parser::{Axis, NodeTest};
use crate::dom::{Document, NodeId, NodeKind, QueryContext, XmlNode};
use crate::error::XPathError;

/// Navigate along an axis from a context node
pub fn navigate(doc: &Document, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children(context).collect(),
        Axis::Descendant => doc.descendants(context).collect(),
        Axis::DescendantOrSelf => std::iter::once(context).chain(doc.descendants(context)).collect(),
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => std::iter::successors(doc.parent_of(context), |&n| doc.parent_of(n)).collect(),
        Axis::FollowingSibling => siblings(doc, context, |n| n.next_sibling),
        Axis::PrecedingSibling => siblings(doc, context, |n| n.prev_sibling),
        Axis::Self_ => vec![context],
        // Attribute values are handled by the evaluator
        Axis::Attribute => Vec::new(),
    }
}

fn siblings(doc: &Document, context: NodeId, step: fn(&XmlNode) -> Option<NodeId>) -> Vec<NodeId> {
    let first = doc.get_node(context).and_then(step);
    std::iter::successors(first, |&n| doc.get_node(n).and_then(step)).collect()
}

/// A node test with its prefix resolved to a namespace URI
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTest {
    Any,
    /// Local name in no namespace
    Local(String),
    /// Local name in the given namespace
    Qualified { uri: String, local: String },
    /// Any name in the given namespace
    Namespace(String),
    Node,
    Text,
    Comment,
}

impl ResolvedTest {
    /// Resolve a parsed node test against the query's prefix bindings
    pub fn resolve(test: &NodeTest, namespaces: &QueryContext) -> Result<Self, XPathError> {
        let lookup = |prefix: &str| {
            namespaces
                .resolve(prefix)
                .map(str::to_string)
                .ok_or_else(|| XPathError::UnboundPrefix(prefix.to_string()))
        };

        Ok(match test {
            NodeTest::Any => ResolvedTest::Any,
            NodeTest::Name(local) => ResolvedTest::Local(local.clone()),
            NodeTest::QName(prefix, local) => ResolvedTest::Qualified {
                uri: lookup(prefix.as_str())?,
                local: local.clone(),
            },
            NodeTest::PrefixWildcard(prefix) => ResolvedTest::Namespace(lookup(prefix.as_str())?),
            NodeTest::Node => ResolvedTest::Node,
            NodeTest::Text => ResolvedTest::Text,
            NodeTest::Comment => ResolvedTest::Comment,
        })
    }

    /// Check whether a node passes this test (principal node type: element)
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let kind = match doc.kind(node) {
            Some(kind) => kind,
            None => return false,
        };

        match self {
            ResolvedTest::Node => true,
            ResolvedTest::Text => matches!(kind, NodeKind::Text | NodeKind::CData),
            ResolvedTest::Comment => kind == NodeKind::Comment,
            _ if kind != NodeKind::Element => false,
            ResolvedTest::Any => true,
            ResolvedTest::Local(local) => doc.namespace_uri(node).is_empty() && doc.local_name(node) == local,
            ResolvedTest::Qualified { uri, local } => {
                doc.namespace_uri(node) == uri && doc.local_name(node) == local
            }
            ResolvedTest::Namespace(uri) => doc.namespace_uri(node) == uri,
        }
    }
}

/// Check whether an attribute name passes a node test
///
/// Attribute prefixes are matched literally; attributes in descriptors
/// are either unprefixed or use the conventional `xsi`/`xml` prefixes.
pub fn attribute_matches(test: &NodeTest, name: &str) -> bool {
    match test {
        NodeTest::Any | NodeTest::Node => true,
        NodeTest::Name(local) => name == local,
        NodeTest::QName(prefix, local) => name
            .split_once(':')
            .is_some_and(|(p, l)| p == prefix && l == local),
        NodeTest::PrefixWildcard(prefix) => name.split_once(':').is_some_and(|(p, _)| p == prefix),
        NodeTest::Text | NodeTest::Comment => false,
    }
}
