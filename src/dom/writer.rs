//! Descriptor serialization
//!
//! Writes the tree back out in document order. Whitespace text nodes are
//! ordinary nodes, so untouched regions of the descriptor come back exactly
//! as they were read apart from two normalizations: empty elements are
//! written self-closed and attribute values are always double-quoted.
//! Text and attribute values holding references to DOCTYPE-declared
//! entities are written from their source markup.
//!
//! Output is always UTF-8, so a declaration naming any other encoding is
//! rewritten to say so.

use super::document::{Document, DOCUMENT_NODE};
use super::node::{NodeId, NodeKind};
use crate::core::entities::{encode_attribute, encode_text};
use encoding_rs::{Encoding, UTF_8};

impl Document {
    /// Serialize the whole document, declaration included
    pub fn to_xml(&self) -> String {
        let mut buf = String::with_capacity(4096);

        if let Some(decl) = self.declaration() {
            buf.push_str("<?xml version=\"");
            buf.push_str(&decl.version);
            buf.push('"');
            if let Some(encoding) = &decl.encoding {
                let encoding = match Encoding::for_label(encoding.as_bytes()) {
                    Some(label) if label == UTF_8 => encoding.as_str(),
                    _ => "UTF-8",
                };
                buf.push_str(" encoding=\"");
                buf.push_str(encoding);
                buf.push('"');
            }
            if let Some(standalone) = decl.standalone {
                buf.push_str(if standalone {
                    " standalone=\"yes\""
                } else {
                    " standalone=\"no\""
                });
            }
            buf.push_str("?>");
        }

        self.write_node(DOCUMENT_NODE, &mut buf);
        buf
    }

    /// Serialize a single node and its subtree
    pub fn node_to_xml(&self, id: NodeId) -> String {
        let mut buf = String::with_capacity(256);
        self.write_node(id, &mut buf);
        buf
    }

    /// Uses an explicit stack so deep trees cannot overflow
    fn write_node(&self, node_id: NodeId, buf: &mut String) {
        enum StackEntry {
            Enter(NodeId),
            Close(NodeId),
        }

        let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
        stack.push(StackEntry::Enter(node_id));

        while let Some(entry) = stack.pop() {
            let current_id = match entry {
                StackEntry::Close(id) => {
                    buf.push_str("</");
                    buf.push_str(self.node_name(id));
                    buf.push('>');
                    continue;
                }
                StackEntry::Enter(id) => id,
            };

            let node = match self.get_node(current_id) {
                Some(n) => n,
                None => continue,
            };

            match node.kind {
                NodeKind::Element => {
                    buf.push('<');
                    buf.push_str(self.node_name(current_id));

                    for attr in self.attributes(current_id) {
                        buf.push(' ');
                        buf.push_str(self.strings.get_str(attr.name_id));
                        buf.push_str("=\"");
                        if attr.markup_id != 0 {
                            buf.push_str(self.strings.get_str(attr.markup_id));
                        } else {
                            buf.push_str(&encode_attribute(self.strings.get_str(attr.value_id)));
                        }
                        buf.push('"');
                    }

                    if !node.has_children() {
                        buf.push_str("/>");
                    } else {
                        buf.push('>');
                        stack.push(StackEntry::Close(current_id));
                        self.push_children_reversed(current_id, &mut stack, StackEntry::Enter);
                    }
                }
                NodeKind::Document => {
                    self.push_children_reversed(current_id, &mut stack, StackEntry::Enter);
                }
                NodeKind::Text => match self.markup(current_id) {
                    Some(markup) => buf.push_str(markup),
                    None => buf.push_str(&encode_text(self.value(current_id))),
                },
                NodeKind::CData => {
                    buf.push_str("<![CDATA[");
                    buf.push_str(self.value(current_id));
                    buf.push_str("]]>");
                }
                NodeKind::Comment => {
                    buf.push_str("<!--");
                    buf.push_str(self.value(current_id));
                    buf.push_str("-->");
                }
                NodeKind::ProcessingInstruction => {
                    buf.push_str("<?");
                    buf.push_str(self.node_name(current_id));
                    let data = self.value(current_id);
                    if !data.is_empty() {
                        buf.push(' ');
                        buf.push_str(data);
                    }
                    buf.push_str("?>");
                }
                NodeKind::DocType => buf.push_str(self.value(current_id)),
            }
        }
    }

    fn push_children_reversed<T>(&self, id: NodeId, stack: &mut Vec<T>, wrap: fn(NodeId) -> T) {
        let mut child_id = self.get_node(id).and_then(|n| n.last_child);
        while let Some(cid) = child_id {
            stack.push(wrap(cid));
            child_id = self.get_node(cid).and_then(|n| n.prev_sibling);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_layout() {
        let input = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE web-app PUBLIC \"-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN\" \"http://java.sun.com/dtd/web-app_2_3.dtd\">\n<web-app>\n  <!-- the app -->\n  <display-name>a &amp; b</display-name>\n  <?pi data?>\n  <distributable/>\n</web-app>";
        let doc = Document::parse_str(input).unwrap();
        assert_eq!(doc.to_xml(), input);
    }

    #[test]
    fn test_attributes_escaped() {
        let doc = Document::parse_str("<a title='say \"hi\" &amp; go'/>").unwrap();
        assert_eq!(doc.to_xml(), "<a title=\"say &quot;hi&quot; &amp; go\"/>");
    }

    #[test]
    fn test_cdata_written_raw() {
        let doc = Document::parse_str("<a><![CDATA[x < y]]></a>").unwrap();
        assert_eq!(doc.to_xml(), "<a><![CDATA[x < y]]></a>");
    }

    #[test]
    fn test_empty_element_self_closes() {
        let doc = Document::parse_str("<a><b></b></a>").unwrap();
        assert_eq!(doc.to_xml(), "<a><b/></a>");
    }

    #[test]
    fn test_utf16_declaration_rewritten() {
        let mut input = vec![0xFF, 0xFE];
        for b in b"<?xml version=\"1.0\" encoding=\"UTF-16\"?><a/>" {
            input.push(*b);
            input.push(0);
        }
        let doc = Document::parse(&input).unwrap();
        assert_eq!(doc.to_xml(), "<?xml version=\"1.0\" encoding=\"UTF-8\"?><a/>");
    }

    #[test]
    fn test_declared_entity_references_kept() {
        let input = "<!DOCTYPE web-app [<!ENTITY app \"demo\">]>\n<web-app id=\"&app;-id\">\n  <display-name>&app; &amp; &lt;more&gt;</display-name>\n</web-app>";
        let doc = Document::parse_str(input).unwrap();
        assert_eq!(doc.to_xml(), input);
    }

    #[test]
    fn test_extended_text_keeps_references() {
        let mut doc = Document::parse_str("<r><v> &app;/ctx.xml </v></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let v = doc.element_children(root).next().unwrap();
        doc.set_text(v, "&app;/ctx.xml a&b");
        assert_eq!(doc.to_xml(), "<r><v>&app;/ctx.xml a&amp;b</v></r>");

        // Unrelated text loses the markup
        doc.set_text(v, "&x");
        assert_eq!(doc.to_xml(), "<r><v>&amp;x</v></r>");
    }

    #[test]
    fn test_latin1_declaration_rewritten() {
        let doc = Document::parse(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>caf\xE9</a>").unwrap();
        assert_eq!(doc.to_xml(), "<?xml version=\"1.0\" encoding=\"UTF-8\"?><a>caf\u{e9}</a>");
    }

    #[test]
    fn test_inserted_nodes_written() {
        let mut doc = Document::parse_str("<r><a/></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let b = doc.create_element(root, "b");
        doc.append_child(root, b);
        doc.set_text(b, "x<y");
        assert_eq!(doc.node_to_xml(root), "<r><a/><b>x&lt;y</b></r>");
    }
}
