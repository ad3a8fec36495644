//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.
//! Links between nodes are indices into the document arena, so nodes can be
//! relinked in place when the descriptor is edited.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
    /// DOCTYPE declaration, kept verbatim
    DocType,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for the document root and detached nodes)
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Qualified name for elements, target for PIs
    pub name_id: u32,
    /// Local part of the element name
    pub local_id: u32,
    /// Index into string pool for namespace prefix, or 0
    pub prefix_id: u32,
    /// Index into string pool for namespace URI, or 0
    pub namespace_id: u32,
    /// Content of text, CDATA, comment, PI and DOCTYPE nodes
    pub value_id: u32,
    /// Source markup of a text node with unresolved entity references, or 0
    pub markup_id: u32,
    /// Start of attributes in attribute arena (for elements)
    pub attr_start: u32,
    /// Number of attributes
    pub attr_count: u16,
}

impl XmlNode {
    fn new(kind: NodeKind) -> Self {
        XmlNode {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            local_id: 0,
            prefix_id: 0,
            namespace_id: 0,
            value_id: 0,
            markup_id: 0,
            attr_start: 0,
            attr_count: 0,
        }
    }

    /// Create a new document root node
    pub fn document() -> Self {
        Self::new(NodeKind::Document)
    }

    /// Create a new element node
    pub fn element(name_id: u32, local_id: u32, prefix_id: u32, namespace_id: u32) -> Self {
        XmlNode {
            name_id,
            local_id,
            prefix_id,
            namespace_id,
            ..Self::new(NodeKind::Element)
        }
    }

    /// Create a text-like node (text, CDATA, comment, DOCTYPE)
    pub fn content(kind: NodeKind, value_id: u32) -> Self {
        XmlNode {
            value_id,
            ..Self::new(kind)
        }
    }

    /// Create a processing instruction node
    pub fn processing_instruction(target_id: u32, data_id: u32) -> Self {
        XmlNode {
            name_id: target_id,
            value_id: data_id,
            ..Self::new(NodeKind::ProcessingInstruction)
        }
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Check if this node contributes to an element's string value
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Stored attribute
#[derive(Debug, Clone)]
pub struct XmlAttribute {
    /// Index into string pool for the qualified attribute name
    pub name_id: u32,
    /// Index into string pool for the attribute value
    pub value_id: u32,
    /// Source markup of a value with unresolved entity references, or 0
    pub markup_id: u32,
}

impl XmlAttribute {
    pub fn new(name_id: u32, value_id: u32, markup_id: u32) -> Self {
        XmlAttribute {
            name_id,
            value_id,
            markup_id,
        }
    }
}
