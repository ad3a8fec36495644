//! Namespace Resolution
//!
//! Two halves:
//! - `NamespaceResolver`: stack-based prefix scoping used while building the DOM
//! - `QueryContext`: the prefix bindings a caller supplies when querying
//!
//! Descriptors come in two shapes. Old 2.3 descriptors have no namespace at
//! all; 2.4+ descriptors put every element in the Java EE namespace through a
//! default `xmlns` declaration. Queries are written once with a prefix, and
//! the context binds that prefix to whatever default namespace the document
//! actually uses.

use super::document::Document;
use super::strings::StringPool;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI)
#[derive(Debug, Clone)]
struct NsBinding {
    prefix_id: u32,
    uri_id: u32,
    depth: u16,
}

/// Stack-based namespace resolver
///
/// The default namespace is bound under prefix ID 0 (the empty string).
#[derive(Debug)]
pub struct NamespaceResolver {
    /// Stack of namespace bindings
    bindings: Vec<NsBinding>,
    /// Current element depth
    depth: u16,
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
}

impl NamespaceResolver {
    /// Create a new namespace resolver with pre-declared xml and xmlns namespaces
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let xml_uri_id = strings.intern(ns::XML);
        let xmlns_uri_id = strings.intern(ns::XMLNS);

        NamespaceResolver {
            bindings: vec![
                NsBinding {
                    prefix_id: xml_prefix_id,
                    uri_id: xml_uri_id,
                    depth: 0,
                },
                NsBinding {
                    prefix_id: xmlns_prefix_id,
                    uri_id: xmlns_uri_id,
                    depth: 0,
                },
            ],
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a namespace binding for the current scope
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) {
        // xml and xmlns are fixed
        if prefix_id == self.xml_prefix_id || prefix_id == self.xmlns_prefix_id {
            return;
        }

        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
    }

    /// Declare the default namespace for current scope
    pub fn declare_default(&mut self, uri_id: u32) {
        self.declare(0, uri_id);
    }

    /// Resolve a prefix to a namespace URI ID
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
    }

    /// Resolve the default namespace; 0 when none is in scope
    pub fn resolve_default(&self) -> u32 {
        self.resolve(0).unwrap_or(0)
    }
}

/// Prefix bindings available to an XPath query
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    bindings: Vec<(String, String)>,
}

impl QueryContext {
    /// Prefix bound to the document's default namespace
    pub const DEFAULT_PREFIX: &'static str = "xmlns";

    /// A context with no bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the context for querying `doc`
    ///
    /// Binds [`Self::DEFAULT_PREFIX`] to the root element's default namespace
    /// when it has one, plus every prefix the root element itself declares.
    pub fn for_document(doc: &Document) -> Self {
        let mut ctx = QueryContext::new();
        let Some(root) = doc.root_element_id() else {
            return ctx;
        };

        for (name, value) in doc.attribute_pairs(root) {
            match name.strip_prefix("xmlns:") {
                Some(prefix) => ctx = ctx.with_binding(prefix, value),
                None if name == "xmlns" && !value.is_empty() => {
                    ctx = ctx.with_binding(Self::DEFAULT_PREFIX, value)
                }
                None => {}
            }
        }

        // A prefixed root (j2ee:web-app) still puts its children in a namespace
        if ctx.resolve(Self::DEFAULT_PREFIX).is_none() {
            let uri = doc.namespace_uri(root);
            if !uri.is_empty() {
                ctx = ctx.with_binding(Self::DEFAULT_PREFIX, uri);
            }
        }

        ctx
    }

    /// Add or replace a binding
    pub fn with_binding(mut self, prefix: &str, uri: &str) -> Self {
        self.bindings.retain(|(p, _)| p != prefix);
        self.bindings.push((prefix.to_string(), uri.to_string()));
        self
    }

    /// Resolve a prefix to its namespace URI
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Whether the document's elements live in a default namespace
    pub fn is_namespaced(&self) -> bool {
        self.resolve(Self::DEFAULT_PREFIX).is_some()
    }

    /// Qualify a local element name for use in a query
    ///
    /// `servlet` becomes `xmlns:servlet` for namespaced documents and stays
    /// `servlet` otherwise.
    pub fn qualify(&self, local: &str) -> String {
        if self.is_namespaced() {
            format!("{}:{}", Self::DEFAULT_PREFIX, local)
        } else {
            local.to_string()
        }
    }
}
