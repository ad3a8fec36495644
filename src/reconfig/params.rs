//! Named parameters of a descriptor scope.
//!
//! The root scope holds `<context-param>` children of `<web-app>`; a
//! servlet scope holds the `<init-param>` children of one `<servlet>`.
//! Both share the `<param-name>`/`<param-value>` shape.

use super::value_list::{Delimiter, ValueList};
use crate::dom::{Document, NodeId, QueryContext};
use crate::error::XPathError;
use crate::xpath;

/// Elements that may lead a `web-app`, before any `context-param`
const DESCRIPTIVE_ELEMENTS: &[&str] = &["description", "display-name", "icon", "distributable"];

/// Elements an `init-param` follows inside a `servlet`
const SERVLET_TARGET_ELEMENTS: &[&str] = &["servlet-class", "jsp-file"];

/// Which kind of parameter a scope holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// `<context-param>` under `<web-app>`
    Context,
    /// `<init-param>` under `<servlet>`
    Servlet,
}

/// One parameter after duplicates were folded into it
#[derive(Debug, Clone)]
pub struct Param {
    pub node: NodeId,
    pub value: ValueList,
    /// Whether later parameters with the same name were merged and removed
    pub merged: bool,
}

/// The parameters of one element
#[derive(Debug, Clone, Copy)]
pub struct ParamScope {
    owner: NodeId,
    kind: ScopeKind,
}

impl ParamScope {
    /// Context parameters of the root element
    pub fn root(web_app: NodeId) -> Self {
        ParamScope {
            owner: web_app,
            kind: ScopeKind::Context,
        }
    }

    /// Init parameters of a servlet
    pub fn servlet(servlet: NodeId) -> Self {
        ParamScope {
            owner: servlet,
            kind: ScopeKind::Servlet,
        }
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    fn element_name(&self) -> &'static str {
        match self.kind {
            ScopeKind::Context => "context-param",
            ScopeKind::Servlet => "init-param",
        }
    }

    /// All parameters of this scope, in document order
    pub fn params(&self, doc: &Document, ns: &QueryContext) -> Result<Vec<NodeId>, XPathError> {
        xpath::select_nodes(doc, ns, self.owner, &ns.qualify(self.element_name()))
    }

    /// Parameters whose trimmed `param-name` equals `name`
    pub fn find(&self, doc: &Document, ns: &QueryContext, name: &str) -> Result<Vec<NodeId>, XPathError> {
        let name_path = ns.qualify("param-name");
        let mut found = Vec::new();
        for param in self.params(doc, ns)? {
            if xpath::evaluate_string(doc, ns, param, &name_path)?.trim() == name {
                found.push(param);
            }
        }
        Ok(found)
    }

    /// Trimmed value of the first parameter called `name`
    pub fn value(&self, doc: &Document, ns: &QueryContext, name: &str) -> Result<Option<String>, XPathError> {
        match self.find(doc, ns, name)?.first() {
            Some(&param) => Ok(Some(param_value(doc, ns, param)?.trim().to_string())),
            None => Ok(None),
        }
    }

    /// Locate parameter `name`, folding any duplicates into the first
    ///
    /// Entries of later duplicates are appended to the first parameter's
    /// list and the duplicates are removed from the tree.
    pub fn consolidate(
        &self,
        doc: &mut Document,
        ns: &QueryContext,
        name: &str,
        delimiter: Delimiter,
    ) -> Result<Option<Param>, XPathError> {
        let found = self.find(doc, ns, name)?;
        let Some((&first, duplicates)) = found.split_first() else {
            return Ok(None);
        };

        let mut value = ValueList::parse(&param_value(doc, ns, first)?, delimiter);
        for &duplicate in duplicates {
            value.union(&ValueList::parse(&param_value(doc, ns, duplicate)?, delimiter));
            remove_with_indent(doc, duplicate);
        }

        let merged = !duplicates.is_empty();
        if merged {
            self.write(doc, ns, first, value.render())?;
        }
        Ok(Some(Param {
            node: first,
            value,
            merged,
        }))
    }

    /// Replace a parameter's value, adding `<param-value>` if it has none
    pub fn write(&self, doc: &mut Document, ns: &QueryContext, param: NodeId, value: &str) -> Result<(), XPathError> {
        if let Some(value_node) = xpath::select_first(doc, ns, param, &ns.qualify("param-value"))? {
            doc.set_text(value_node, value);
            return Ok(());
        }

        let value_node = doc.create_element(param, "param-value");
        doc.set_text(value_node, value);
        match xpath::select_first(doc, ns, param, &ns.qualify("param-name"))? {
            Some(name_node) => place_after(doc, name_node, value_node),
            None => doc.append_child(param, value_node),
        }
        Ok(())
    }

    /// Add a new parameter at its conventional position
    pub fn create(&self, doc: &mut Document, ns: &QueryContext, name: &str, value: &str) -> Result<NodeId, XPathError> {
        let anchor = self.insertion_anchor(doc, ns)?;
        let indent = match anchor {
            Anchor::After(node) | Anchor::Before(node) => doc.preceding_whitespace(node).map(str::to_string),
            Anchor::Append => None,
        };
        let inner = indent.as_deref().map(|outer| format!("{}{}", outer, indent_unit(doc, self.owner, outer)));

        let param = doc.create_element(self.owner, self.element_name());
        for (child_name, text) in [("param-name", name), ("param-value", value)] {
            let child = doc.create_element(self.owner, child_name);
            doc.set_text(child, text);
            if let Some(inner) = &inner {
                let ws = doc.create_text(inner);
                doc.append_child(param, ws);
            }
            doc.append_child(param, child);
        }
        if let Some(outer) = &indent {
            let ws = doc.create_text(outer);
            doc.append_child(param, ws);
        }

        match anchor {
            Anchor::After(node) => place_after(doc, node, param),
            Anchor::Before(node) => {
                doc.insert_before(node, param);
                if let Some(outer) = &indent {
                    let ws = doc.create_text(outer);
                    doc.insert_before(node, ws);
                }
            }
            Anchor::Append => doc.append_child(self.owner, param),
        }
        Ok(param)
    }

    fn insertion_anchor(&self, doc: &Document, ns: &QueryContext) -> Result<Anchor, XPathError> {
        if let Some(&last) = self.params(doc, ns)?.last() {
            return Ok(Anchor::After(last));
        }

        let children: Vec<NodeId> = doc.element_children(self.owner).collect();
        let anchor = match self.kind {
            ScopeKind::Context => children
                .iter()
                .take_while(|&&c| is_one_of(doc.local_name(c), DESCRIPTIVE_ELEMENTS))
                .last()
                .map(|&c| Anchor::After(c))
                .or_else(|| children.first().map(|&c| Anchor::Before(c))),
            ScopeKind::Servlet => children
                .iter()
                .rev()
                .find(|&&c| is_one_of(doc.local_name(c), SERVLET_TARGET_ELEMENTS))
                .or(children.last())
                .map(|&c| Anchor::After(c)),
        };
        Ok(anchor.unwrap_or(Anchor::Append))
    }
}

#[derive(Clone, Copy)]
enum Anchor {
    After(NodeId),
    Before(NodeId),
    Append,
}

fn is_one_of(name: &str, names: &[&str]) -> bool {
    names.iter().any(|&n| n == name)
}

/// Text of a parameter's `<param-value>`, empty when missing
fn param_value(doc: &Document, ns: &QueryContext, param: NodeId) -> Result<String, XPathError> {
    xpath::evaluate_string(doc, ns, param, &ns.qualify("param-value"))
}

/// Insert `node` after `anchor`, repeating the whitespace that precedes `anchor`
fn place_after(doc: &mut Document, anchor: NodeId, node: NodeId) {
    match doc.preceding_whitespace(anchor).map(str::to_string) {
        Some(indent) => {
            let ws = doc.create_text(&indent);
            doc.insert_after(anchor, ws);
            doc.insert_after(ws, node);
        }
        None => doc.insert_after(anchor, node),
    }
}

/// Detach a node and the whitespace that indents it
fn remove_with_indent(doc: &mut Document, node: NodeId) {
    if doc.preceding_whitespace(node).is_some() {
        if let Some(ws) = doc.get_node(node).and_then(|n| n.prev_sibling) {
            doc.detach(ws);
        }
    }
    doc.detach(node);
}

/// One level of indentation, measured against the owner's own indent
fn indent_unit(doc: &Document, owner: NodeId, child_indent: &str) -> String {
    let line = |ws: &str| ws.rsplit('\n').next().unwrap_or("").to_string();
    let child = line(child_indent);
    let parent = doc.preceding_whitespace(owner).map(line).unwrap_or_default();

    match child.strip_prefix(parent.as_str()) {
        Some(unit) if !unit.is_empty() => unit.to_string(),
        _ => "  ".to_string(),
    }
}
