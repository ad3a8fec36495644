//! XPath Evaluation Engine
//!
//! Runs compiled expressions on a value stack. Node-sets are kept in
//! document order using the position table from [`Document::document_order`],
//! since nodes appended during reconfiguration get IDs past the end of the
//! arena regardless of where they sit in the tree.

use super::axes::{attribute_matches, navigate, ResolvedTest};
use super::compiler::{CompiledExpr, Op};
use super::functions;
use super::parser::{Axis, BinaryOp};
use super::value::{compare, XPathValue};
use crate::dom::{Document, NodeId, QueryContext, DOCUMENT_NODE};
use crate::error::XPathError;
use std::collections::HashSet;

/// Evaluation context for one step of a query
pub struct EvalContext<'a> {
    pub doc: &'a Document,
    pub namespaces: &'a QueryContext,
    /// Document-order position of each node, indexed by NodeId
    pub order: &'a [u32],
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
}

impl EvalContext<'_> {
    fn at(&self, node: NodeId, position: usize, size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            namespaces: self.namespaces,
            order: self.order,
            node,
            position,
            size,
        }
    }

    fn sort(&self, nodes: &mut [NodeId]) {
        nodes.sort_unstable_by_key(|&n| self.order.get(n as usize).copied().unwrap_or(u32::MAX));
    }
}

/// Evaluate an XPath expression from a context node
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate(
    doc: &Document,
    namespaces: &QueryContext,
    context_node: NodeId,
    xpath: &str,
) -> Result<XPathValue, XPathError> {
    let compiled = super::compiled(xpath)?;
    let order = doc.document_order();
    let ctx = EvalContext {
        doc,
        namespaces,
        order: &order,
        node: context_node,
        position: 1,
        size: 1,
    };
    evaluate_compiled(&compiled, &ctx)
}

/// Select the nodes an expression addresses, in document order
pub fn select_nodes(
    doc: &Document,
    namespaces: &QueryContext,
    context_node: NodeId,
    xpath: &str,
) -> Result<Vec<NodeId>, XPathError> {
    match evaluate(doc, namespaces, context_node, xpath)? {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::Type(format!(
            "'{}' evaluates to a {}, not a node-set",
            xpath,
            other.type_name()
        ))),
    }
}

/// Select the first node an expression addresses
pub fn select_first(
    doc: &Document,
    namespaces: &QueryContext,
    context_node: NodeId,
    xpath: &str,
) -> Result<Option<NodeId>, XPathError> {
    Ok(select_nodes(doc, namespaces, context_node, xpath)?.into_iter().next())
}

/// Evaluate an expression and convert the result to a string
pub fn evaluate_string(
    doc: &Document,
    namespaces: &QueryContext,
    context_node: NodeId,
    xpath: &str,
) -> Result<String, XPathError> {
    Ok(evaluate(doc, namespaces, context_node, xpath)?.to_string_value(doc))
}

/// Evaluate a compiled expression
pub fn evaluate_compiled(expr: &CompiledExpr, ctx: &EvalContext<'_>) -> Result<XPathValue, XPathError> {
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => stack.push(XPathValue::single_node(DOCUMENT_NODE)),

            Op::Context => stack.push(XPathValue::single_node(ctx.node)),

            Op::Navigate(axis, test) => {
                let nodes = match pop(&mut stack)? {
                    XPathValue::NodeSet(nodes) => nodes,
                    // Attribute values have no children or siblings
                    XPathValue::Strings(_) => Vec::new(),
                    other => {
                        return Err(XPathError::Type(format!(
                            "Cannot navigate from a {}",
                            other.type_name()
                        )))
                    }
                };

                if *axis == Axis::Attribute {
                    let values = nodes
                        .iter()
                        .flat_map(|&node| ctx.doc.attribute_pairs(node))
                        .filter(|(name, _)| !is_namespace_declaration(name) && attribute_matches(test, name))
                        .map(|(_, value)| value.to_string())
                        .collect();
                    stack.push(XPathValue::Strings(values));
                    continue;
                }

                let resolved = ResolvedTest::resolve(test, ctx.namespaces)?;
                let mut seen = HashSet::with_capacity(nodes.len());
                let mut result = Vec::with_capacity(nodes.len());
                for node in nodes {
                    for candidate in navigate(ctx.doc, node, *axis) {
                        if resolved.matches(ctx.doc, candidate) && seen.insert(candidate) {
                            result.push(candidate);
                        }
                    }
                }
                ctx.sort(&mut result);
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Predicate(pred) => match pop(&mut stack)? {
                XPathValue::NodeSet(nodes) => {
                    let size = nodes.len();
                    let mut filtered = Vec::new();
                    for (i, &node) in nodes.iter().enumerate() {
                        let result = evaluate_compiled(pred, &ctx.at(node, i + 1, size))?;
                        let include = match result {
                            XPathValue::Number(n) => (i + 1) as f64 == n,
                            _ => result.to_boolean(),
                        };
                        if include {
                            filtered.push(node);
                        }
                    }
                    stack.push(XPathValue::NodeSet(filtered));
                }
                other => {
                    return Err(XPathError::Type(format!(
                        "Predicates apply to node-sets, not a {}",
                        other.type_name()
                    )))
                }
            },

            Op::Union => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                match (left, right) {
                    (XPathValue::NodeSet(mut l), XPathValue::NodeSet(r)) => {
                        let seen: HashSet<NodeId> = l.iter().copied().collect();
                        l.extend(r.into_iter().filter(|n| !seen.contains(n)));
                        ctx.sort(&mut l);
                        stack.push(XPathValue::NodeSet(l));
                    }
                    (XPathValue::Strings(mut l), XPathValue::Strings(r)) => {
                        l.extend(r);
                        stack.push(XPathValue::Strings(l));
                    }
                    (l, r) => {
                        return Err(XPathError::Type(format!(
                            "Cannot union a {} with a {}",
                            l.type_name(),
                            r.type_name()
                        )))
                    }
                }
            }

            Op::Number(n) => stack.push(XPathValue::Number(*n)),

            Op::Literal(s) => stack.push(XPathValue::String(s.clone())),

            Op::Call(function, argc) => {
                if stack.len() < *argc {
                    return Err(XPathError::Type("Stack underflow".to_string()));
                }
                let args = stack.split_off(stack.len() - argc);
                stack.push(functions::call(*function, args, ctx)?);
            }

            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                let result = match op {
                    BinaryOp::Or => left.to_boolean() || right.to_boolean(),
                    BinaryOp::And => left.to_boolean() && right.to_boolean(),
                    _ => compare(&left, *op, &right, ctx.doc),
                };
                stack.push(XPathValue::Boolean(result));
            }
        }
    }

    pop(&mut stack)
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue, XPathError> {
    stack
        .pop()
        .ok_or_else(|| XPathError::Type("Stack underflow".to_string()))
}

fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"<web-app version="2.5">
  <context-param>
    <param-name> contextClass </param-name>
    <param-value>com.example.Ctx</param-value>
  </context-param>
  <servlet>
    <servlet-name>main</servlet-name>
    <servlet-class>org.springframework.web.servlet.DispatcherServlet</servlet-class>
  </servlet>
  <servlet>
    <servlet-name>other</servlet-name>
    <servlet-class>com.example.Other</servlet-class>
  </servlet>
</web-app>"#;

    const NAMESPACED: &str = r#"<web-app xmlns="http://java.sun.com/xml/ns/javaee" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <servlet><servlet-name>main</servlet-name></servlet>
</web-app>"#;

    fn eval(doc: &Document, xpath: &str) -> XPathValue {
        let ctx = QueryContext::for_document(doc);
        evaluate(doc, &ctx, DOCUMENT_NODE, xpath).unwrap()
    }

    #[test]
    fn test_absolute_path() {
        let doc = Document::parse_str(PLAIN).unwrap();
        let servlets = eval(&doc, "/web-app/servlet");
        assert_eq!(servlets.as_nodeset().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_descendant_path() {
        let doc = Document::parse_str(PLAIN).unwrap();
        let names = eval(&doc, "//servlet-name");
        assert_eq!(names.as_nodeset().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_trimmed_name_predicate() {
        let doc = Document::parse_str(PLAIN).unwrap();
        let value = eval(
            &doc,
            "string(/web-app/context-param[normalize-space(param-name) = 'contextClass']/param-value)",
        );
        assert_eq!(value, XPathValue::String("com.example.Ctx".to_string()));
    }

    #[test]
    fn test_positional_predicate() {
        let doc = Document::parse_str(PLAIN).unwrap();
        let value = eval(&doc, "string(/web-app/servlet[2]/servlet-name)");
        assert_eq!(value, XPathValue::String("other".to_string()));
        let last = eval(&doc, "string(/web-app/servlet[last()]/servlet-name)");
        assert_eq!(last, XPathValue::String("other".to_string()));
    }

    #[test]
    fn test_attribute_axis() {
        let doc = Document::parse_str(PLAIN).unwrap();
        assert_eq!(eval(&doc, "string(/web-app/@version)"), XPathValue::String("2.5".to_string()));
        assert_eq!(eval(&doc, "count(/web-app/@*)"), XPathValue::Number(1.0));
    }

    #[test]
    fn test_count_and_boolean_ops() {
        let doc = Document::parse_str(PLAIN).unwrap();
        assert_eq!(
            eval(&doc, "count(//servlet) = 2 and not(//filter)"),
            XPathValue::Boolean(true)
        );
    }

    #[test]
    fn test_union_in_document_order() {
        let doc = Document::parse_str(PLAIN).unwrap();
        let nodes = eval(&doc, "/web-app/servlet | /web-app/context-param");
        let nodes = nodes.as_nodeset().unwrap();
        assert_eq!(doc.local_name(nodes[0]), "context-param");
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_namespaced_document() {
        let doc = Document::parse_str(NAMESPACED).unwrap();
        // Unprefixed names only match elements in no namespace
        assert_eq!(eval(&doc, "count(/web-app)"), XPathValue::Number(0.0));
        assert_eq!(
            eval(&doc, "string(/xmlns:web-app/xmlns:servlet/xmlns:servlet-name)"),
            XPathValue::String("main".to_string())
        );
        // Namespace declarations are not attributes
        assert_eq!(eval(&doc, "count(/xmlns:web-app/@*)"), XPathValue::Number(0.0));
    }

    #[test]
    fn test_unbound_prefix() {
        let doc = Document::parse_str(PLAIN).unwrap();
        let err = evaluate(&doc, &QueryContext::new(), DOCUMENT_NODE, "/j2ee:web-app").unwrap_err();
        assert_eq!(err, XPathError::UnboundPrefix("j2ee".to_string()));
    }

    #[test]
    fn test_appended_node_sorted_in_document_order() {
        let mut doc = Document::parse_str(PLAIN).unwrap();
        let root = doc.root_element_id().unwrap();
        let first_servlet = doc
            .element_children(root)
            .find(|&n| doc.local_name(n) == "servlet")
            .unwrap();
        let param = doc.create_element(root, "context-param");
        doc.insert_before(first_servlet, param);

        let nodes = select_nodes(&doc, &QueryContext::new(), DOCUMENT_NODE, "/web-app/*").unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[1], param);
    }

    #[test]
    fn test_select_nodes_rejects_scalar() {
        let doc = Document::parse_str(PLAIN).unwrap();
        assert!(matches!(
            select_nodes(&doc, &QueryContext::new(), DOCUMENT_NODE, "count(//servlet)"),
            Err(XPathError::Type(_))
        ));
    }

    #[test]
    fn test_relative_from_context() {
        let doc = Document::parse_str(PLAIN).unwrap();
        let ctx = QueryContext::new();
        let servlet = select_first(&doc, &ctx, DOCUMENT_NODE, "//servlet").unwrap().unwrap();
        assert_eq!(evaluate_string(&doc, &ctx, servlet, "servlet-name").unwrap(), "main");
        assert_eq!(evaluate_string(&doc, &ctx, servlet, "local-name(..)").unwrap(), "web-app");
    }
}
