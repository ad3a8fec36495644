//! XML Document - Arena-based mutable DOM
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes
//! - NodeId indices for traversal
//! - String interning for names and text
//! - In-place relinking for inserted, moved and detached nodes
//!
//! Node IDs are stable for the life of the document but only follow document
//! order until the first edit. Use [`Document::document_order`] whenever an
//! ordering of IDs is needed.

use super::namespace::NamespaceResolver;
use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode};
use super::strings::StringPool;
use crate::core::encoding::convert_to_utf8;
use crate::core::entities::{decode_text, encode_text, has_unresolved_reference};
use crate::core::scanner::is_whitespace;
use crate::error::XmlError;
use crate::reader::events::{StartElement, XmlEvent};
use crate::reader::slice::SliceReader;

/// ID of the document node
pub const DOCUMENT_NODE: NodeId = 0;

/// The `<?xml ...?>` declaration, if the input had one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// An XML document stored in arena format
#[derive(Debug)]
pub struct Document {
    /// Arena of nodes; index 0 is the document node
    nodes: Vec<XmlNode>,
    /// Arena of attributes
    attributes: Vec<XmlAttribute>,
    /// Interned strings
    pub strings: StringPool,
    /// Root element node ID (not document node)
    root_element: Option<NodeId>,
    declaration: Option<XmlDeclaration>,
}

impl Document {
    fn empty() -> Self {
        Document {
            nodes: vec![XmlNode::document()],
            attributes: Vec::new(),
            strings: StringPool::new(),
            root_element: None,
            declaration: None,
        }
    }

    /// Parse a descriptor from raw bytes
    ///
    /// Input in any other encoding (UTF-16 by byte order mark, or whatever
    /// the XML declaration names) is converted to UTF-8 first.
    pub fn parse(input: &[u8]) -> Result<Self, XmlError> {
        let input = convert_to_utf8(input.to_vec()).map_err(|msg| XmlError::at(msg, input, 0))?;
        if let Err(e) = std::str::from_utf8(&input) {
            return Err(XmlError::at("Invalid UTF-8", &input, e.valid_up_to()));
        }

        let mut doc = Document::empty();
        doc.build_from_events(&input)?;
        Ok(doc)
    }

    /// Parse a descriptor from a string
    pub fn parse_str(input: &str) -> Result<Self, XmlError> {
        Self::parse(input.as_bytes())
    }

    /// Build DOM from XML events
    fn build_from_events(&mut self, input: &[u8]) -> Result<(), XmlError> {
        let mut reader = SliceReader::new(input);
        let mut stack: Vec<NodeId> = vec![DOCUMENT_NODE];
        let mut resolver = NamespaceResolver::new(&mut self.strings);
        let mut seen_doctype = false;

        loop {
            let event = match reader.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(e) => return Err(XmlError::at(e.message, input, e.position)),
            };
            let pos = reader.last_position();
            let fail = |msg: String| XmlError::at(msg, input, pos);
            let parent = stack.last().copied().unwrap_or(DOCUMENT_NODE);
            let at_document_level = stack.len() == 1;

            match event {
                XmlEvent::StartElement(elem) => {
                    if at_document_level && self.root_element.is_some() {
                        return Err(fail("Document has multiple root elements".to_string()));
                    }
                    let id = self.handle_element(&elem, parent, &mut resolver).map_err(fail)?;
                    stack.push(id);
                }

                XmlEvent::EmptyElement(elem) => {
                    if at_document_level && self.root_element.is_some() {
                        return Err(fail("Document has multiple root elements".to_string()));
                    }
                    self.handle_element(&elem, parent, &mut resolver).map_err(fail)?;
                    resolver.pop_scope();
                }

                XmlEvent::EndElement(end_elem) => {
                    let end_name = String::from_utf8_lossy(end_elem.name.as_ref());
                    if at_document_level {
                        return Err(fail(format!(
                            "Unexpected end tag: </{}> without matching start tag",
                            end_name
                        )));
                    }
                    let start_name = self.node_name(parent);
                    if start_name != end_name {
                        return Err(fail(format!(
                            "Tag mismatch: <{}> closed with </{}>",
                            start_name, end_name
                        )));
                    }
                    stack.pop();
                    resolver.pop_scope();
                }

                XmlEvent::Text(content) => {
                    if at_document_level && !content.iter().all(|&b| is_whitespace(b)) {
                        return Err(fail("Text content not allowed at document level".to_string()));
                    }
                    if !content.is_empty() {
                        let mut node = XmlNode::content(NodeKind::Text, self.strings.intern_bytes(&content));
                        node.markup_id = self.markup_of(reader.last_raw());
                        self.push_child(parent, node);
                    }
                }

                XmlEvent::CData(content) => {
                    if at_document_level {
                        return Err(fail("CDATA section not allowed at document level".to_string()));
                    }
                    let value_id = self.strings.intern_bytes(&content);
                    self.push_child(parent, XmlNode::content(NodeKind::CData, value_id));
                }

                XmlEvent::Comment(content) => {
                    let value_id = self.strings.intern_bytes(&content);
                    self.push_child(parent, XmlNode::content(NodeKind::Comment, value_id));
                }

                XmlEvent::ProcessingInstruction { target, data } => {
                    let target_id = self.strings.intern_bytes(&target);
                    let data_id = data.map_or(0, |d| self.strings.intern_bytes(&d));
                    self.push_child(parent, XmlNode::processing_instruction(target_id, data_id));
                }

                XmlEvent::DocType(content) => {
                    if seen_doctype {
                        return Err(fail("Multiple DOCTYPE declarations not allowed".to_string()));
                    }
                    if self.root_element.is_some() {
                        return Err(fail("DOCTYPE must come before root element".to_string()));
                    }
                    seen_doctype = true;
                    let value_id = self.strings.intern_bytes(&content);
                    self.push_child(parent, XmlNode::content(NodeKind::DocType, value_id));
                }

                XmlEvent::XmlDeclaration {
                    version,
                    encoding,
                    standalone,
                } => {
                    self.declaration = Some(XmlDeclaration {
                        version: String::from_utf8_lossy(&version).into_owned(),
                        encoding: encoding.map(|e| String::from_utf8_lossy(&e).into_owned()),
                        standalone,
                    });
                }

                XmlEvent::EndDocument => {}
            }
        }

        if let Some(&open) = stack.get(1) {
            return Err(XmlError::at(
                format!("Unclosed tag: <{}>", self.node_name(open)),
                input,
                input.len(),
            ));
        }
        if self.root_element.is_none() {
            return Err(XmlError::at("No root element", input, input.len()));
        }

        Ok(())
    }

    /// Handle start/empty element, resolving its namespace
    fn handle_element(
        &mut self,
        elem: &StartElement<'_>,
        parent: NodeId,
        resolver: &mut NamespaceResolver,
    ) -> Result<NodeId, String> {
        resolver.push_scope();

        // Namespace declarations apply to the element carrying them
        for attr in &elem.attributes {
            if attr.name.as_ref() == b"xmlns" {
                let uri_id = self.strings.intern_bytes(&attr.value);
                resolver.declare_default(uri_id);
            } else if attr.prefix.as_deref() == Some(b"xmlns".as_slice()) {
                let prefix_id = self.strings.intern_bytes(&attr.local_name);
                let uri_id = self.strings.intern_bytes(&attr.value);
                resolver.declare(prefix_id, uri_id);
            }
        }

        let attr_start = self.attributes.len() as u32;
        for attr in &elem.attributes {
            if let Some(prefix) = attr.prefix.as_deref() {
                let prefix_id = self.strings.intern_bytes(prefix);
                if prefix != b"xmlns" && resolver.resolve(prefix_id).is_none() {
                    return Err(format!(
                        "Unbound namespace prefix '{}' on attribute",
                        String::from_utf8_lossy(prefix)
                    ));
                }
            }
            let name_id = self.strings.intern_bytes(&attr.name);
            let value_id = self.strings.intern_bytes(&attr.value);
            let markup_id = self.markup_of(attr.raw);
            self.attributes.push(XmlAttribute::new(name_id, value_id, markup_id));
        }

        let name_id = self.strings.intern_bytes(&elem.name);
        let local_id = self.strings.intern_bytes(&elem.local_name);
        let (prefix_id, namespace_id) = match elem.prefix.as_deref() {
            Some(prefix) => {
                let prefix_id = self.strings.intern_bytes(prefix);
                let uri_id = resolver.resolve(prefix_id).ok_or_else(|| {
                    format!("Unbound namespace prefix '{}'", String::from_utf8_lossy(prefix))
                })?;
                (prefix_id, uri_id)
            }
            None => (0, resolver.resolve_default()),
        };

        let mut node = XmlNode::element(name_id, local_id, prefix_id, namespace_id);
        node.attr_start = attr_start;
        node.attr_count = elem.attributes.len().min(u16::MAX as usize) as u16;

        let node_id = self.push_child(parent, node);
        if parent == DOCUMENT_NODE {
            self.root_element = Some(node_id);
        }
        Ok(node_id)
    }

    /// Intern source markup the writer must reproduce as-is, or 0
    fn markup_of(&mut self, raw: &[u8]) -> u32 {
        if has_unresolved_reference(raw) {
            self.strings.intern_bytes(raw)
        } else {
            0
        }
    }

    /// Add a node to the arena and link it as the last child of `parent`
    fn push_child(&mut self, parent: NodeId, node: XmlNode) -> NodeId {
        let id = self.alloc(node);
        self.link_child(parent, id);
        id
    }

    fn alloc(&mut self, node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    /// Link a detached child node as the last child of its new parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child_opt = self.nodes[parent_id as usize].last_child;

        if let Some(last_child_id) = last_child_opt {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
        self.nodes[child_id as usize].parent = Some(parent_id);
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Get the root element ID
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    /// Get a node by ID
    #[inline]
    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    /// Get the kind of a node
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    /// Is this node an element?
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get_node(id).is_some_and(XmlNode::is_element)
    }

    /// Qualified name of an element, or the target of a processing instruction
    pub fn node_name(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("", |n| self.strings.get_str(n.name_id))
    }

    /// Element name without its prefix
    pub fn local_name(&self, id: NodeId) -> &str {
        match self.get_node(id) {
            Some(n) if n.is_element() => self.strings.get_str(n.local_id),
            Some(n) => self.strings.get_str(n.name_id),
            None => "",
        }
    }

    /// Namespace prefix of an element, if it has one
    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        self.get_node(id)
            .filter(|n| n.prefix_id != 0)
            .map(|n| self.strings.get_str(n.prefix_id))
    }

    /// Namespace URI of an element; empty when it has none
    pub fn namespace_uri(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("", |n| self.strings.get_str(n.namespace_id))
    }

    /// Raw content of a text, CDATA, comment, PI or DOCTYPE node
    pub fn value(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("", |n| self.strings.get_str(n.value_id))
    }

    /// Source markup of a text node holding unresolved entity references
    pub fn markup(&self, id: NodeId) -> Option<&str> {
        self.get_node(id)
            .filter(|n| n.markup_id != 0)
            .map(|n| self.strings.get_str(n.markup_id))
    }

    /// XPath string value: the node's own content, or the concatenated
    /// text of all descendant text nodes for elements and the document
    pub fn string_value(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Element | NodeKind::Document) => self
                .descendants(id)
                .filter(|&d| self.get_node(d).is_some_and(XmlNode::is_text))
                .map(|d| self.value(d))
                .collect(),
            Some(_) => self.value(id).to_string(),
            None => String::new(),
        }
    }

    /// Parent of a node
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.parent)
    }

    /// Get attributes for an element
    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        match self.get_node(id) {
            Some(node) if node.is_element() => {
                let start = node.attr_start as usize;
                let end = start + node.attr_count as usize;
                &self.attributes[start..end]
            }
            _ => &[],
        }
    }

    /// Attribute names and values of an element, in document order
    pub fn attribute_pairs(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.attributes(id)
            .iter()
            .map(|a| (self.strings.get_str(a.name_id), self.strings.get_str(a.value_id)))
    }

    /// Get attribute value by qualified name
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attribute_pairs(id).find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// The XML declaration, if the input had one
    pub fn declaration(&self) -> Option<&XmlDeclaration> {
        self.declaration.as_ref()
    }

    /// Iterate over the children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            next: self.get_node(id).and_then(|n| n.first_child),
        }
    }

    /// Iterate over the element children of a node
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(move |&c| self.is_element(c))
    }

    /// Iterate over all descendants of a node in document order, excluding the node itself
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut iter = DescendantIter {
            doc: self,
            stack: Vec::new(),
        };
        iter.push_children(id);
        iter
    }

    /// Position of every node in document order, indexed by NodeId
    ///
    /// Detached nodes get `u32::MAX`.
    pub fn document_order(&self) -> Vec<u32> {
        let mut order = vec![u32::MAX; self.nodes.len()];
        order[DOCUMENT_NODE as usize] = 0;
        for (position, id) in self.descendants(DOCUMENT_NODE).enumerate() {
            order[id as usize] = position as u32 + 1;
        }
        order
    }

    /// Whitespace-only text immediately before a node, if any
    pub fn preceding_whitespace(&self, id: NodeId) -> Option<&str> {
        let prev = self.get_node(id)?.prev_sibling?;
        let node = self.get_node(prev)?;
        let text = self.strings.get_str(node.value_id);
        (node.kind == NodeKind::Text && text.bytes().all(is_whitespace)).then_some(text)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Create a detached element in the same namespace as `context`
    ///
    /// The new element reuses the context element's prefix, so a child of
    /// `<j2ee:servlet>` is created as `<j2ee:init-param>` and a child of a
    /// default-namespaced element inherits that default namespace.
    pub fn create_element(&mut self, context: NodeId, local_name: &str) -> NodeId {
        let (prefix_id, namespace_id) = self
            .get_node(context)
            .filter(|n| n.is_element())
            .map_or((0, 0), |n| (n.prefix_id, n.namespace_id));

        let local_id = self.strings.intern(local_name);
        let name_id = if prefix_id == 0 {
            local_id
        } else {
            let qualified = format!("{}:{}", self.strings.get_str(prefix_id), local_name);
            self.strings.intern(&qualified)
        };

        self.alloc(XmlNode::element(name_id, local_id, prefix_id, namespace_id))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let value_id = self.strings.intern(text);
        self.alloc(XmlNode::content(NodeKind::Text, value_id))
    }

    /// Unlink a node from its parent and siblings; it stays in the arena
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get_node(id) else {
            return;
        };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);

        match prev {
            Some(p) => self.nodes[p as usize].next_sibling = next,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent as usize].first_child = next;
                }
            }
        }
        match next {
            Some(n) => self.nodes[n as usize].prev_sibling = prev,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent as usize].last_child = prev;
                }
            }
        }

        let node = &mut self.nodes[id as usize];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.get_node(parent).is_none() || self.get_node(child).is_none() {
            return;
        }
        self.detach(child);
        self.link_child(parent, child);
    }

    /// Move `node` to directly after `anchor`; no-op when `anchor` has no parent
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        let Some(parent) = self.parent_of(anchor) else {
            return;
        };
        if anchor == node || self.get_node(node).is_none() {
            return;
        }
        self.detach(node);

        let next = self.nodes[anchor as usize].next_sibling;
        self.nodes[anchor as usize].next_sibling = Some(node);
        match next {
            Some(n) => self.nodes[n as usize].prev_sibling = Some(node),
            None => self.nodes[parent as usize].last_child = Some(node),
        }

        let linked = &mut self.nodes[node as usize];
        linked.parent = Some(parent);
        linked.prev_sibling = Some(anchor);
        linked.next_sibling = next;
    }

    /// Move `node` to directly before `anchor`; no-op when `anchor` has no parent
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        let Some(parent) = self.parent_of(anchor) else {
            return;
        };
        if anchor == node || self.get_node(node).is_none() {
            return;
        }
        self.detach(node);

        let prev = self.nodes[anchor as usize].prev_sibling;
        self.nodes[anchor as usize].prev_sibling = Some(node);
        match prev {
            Some(p) => self.nodes[p as usize].next_sibling = Some(node),
            None => self.nodes[parent as usize].first_child = Some(node),
        }

        let linked = &mut self.nodes[node as usize];
        linked.parent = Some(parent);
        linked.prev_sibling = prev;
        linked.next_sibling = Some(anchor);
    }

    /// Replace all children of an element with a single text node
    ///
    /// When the new text extends the trimmed old text and that text held
    /// unresolved entity references, the references are kept as written.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let markup = self.extended_markup(id, text);
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.detach(child);
        }
        if !text.is_empty() {
            let text_id = self.create_text(text);
            if let Some(markup) = markup {
                self.nodes[text_id as usize].markup_id = self.strings.intern(&markup);
            }
            self.link_child(id, text_id);
        }
    }

    /// Markup for `text` when it extends the element's only text child
    fn extended_markup(&self, id: NodeId, text: &str) -> Option<String> {
        let mut children = self.children(id);
        let (child, None) = (children.next()?, children.next()) else {
            return None;
        };
        let raw = self.markup(child)?.trim();
        let decoded = decode_text(raw.as_bytes()).ok()?;
        let old = std::str::from_utf8(&decoded).ok()?;
        let rest = text.strip_prefix(old)?;
        Some(format!("{}{}", raw, encode_text(rest)))
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first, document order)
pub struct DescendantIter<'d> {
    doc: &'d Document,
    stack: Vec<NodeId>,
}

impl<'d> DescendantIter<'d> {
    /// Push children in reverse order so the first child is visited first
    fn push_children(&mut self, id: NodeId) {
        let mut child_id = self.doc.get_node(id).and_then(|n| n.last_child);
        while let Some(cid) = child_id {
            self.stack.push(cid);
            child_id = self.doc.get_node(cid).and_then(|n| n.prev_sibling);
        }
    }
}

impl<'d> Iterator for DescendantIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.push_children(current);
        Some(current)
    }
}
