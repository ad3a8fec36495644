//! DOM Module - Arena-based mutable XML Document
//!
//! Implements the descriptor tree using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for element/attribute names and text
//! - Namespace resolution stack while building, `QueryContext` when querying
//! - A stack-based writer that serializes the edited tree

pub mod document;
pub mod namespace;
pub mod node;
pub mod strings;
pub mod writer;

pub use document::{Document, XmlDeclaration, DOCUMENT_NODE};
pub use namespace::QueryContext;
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode};
pub use strings::StringPool;
