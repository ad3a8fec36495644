//! XPath Value Types
//!
//! XPath 1.0 has four data types: node-set, boolean, number, and string.
//! Attribute values are not arena nodes, so a step along the attribute axis
//! produces a `Strings` value that behaves like a node-set of their values.

use super::parser::BinaryOp;
use crate::dom::{Document, NodeId};

/// XPath value types
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum XPathValue {
    /// A set of nodes (document order, no duplicates)
    NodeSet(Vec<NodeId>),
    /// Boolean value
    Boolean(bool),
    /// Floating-point number
    Number(f64),
    /// String value
    String(String),
    /// Attribute values selected by an attribute step
    Strings(Vec<String>),
}

impl XPathValue {
    /// Create an empty node set
    pub fn empty_nodeset() -> Self {
        XPathValue::NodeSet(Vec::new())
    }

    /// Create a node set with a single node
    pub fn single_node(id: NodeId) -> Self {
        XPathValue::NodeSet(vec![id])
    }

    /// Convert to boolean (XPath boolean() function semantics)
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Strings(list) => !list.is_empty(),
        }
    }

    /// Convert to number (XPath number() function semantics)
    pub fn to_number(&self, doc: &Document) -> f64 {
        match self {
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::Number(n) => *n,
            _ => parse_number(&self.to_string_value(doc)),
        }
    }

    /// Convert to string (XPath string() function semantics)
    ///
    /// A node-set converts to the string value of its first node.
    pub fn to_string_value(&self, doc: &Document) -> String {
        match self {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|&n| doc.string_value(n))
                .unwrap_or_default(),
            XPathValue::Boolean(b) => b.to_string(),
            XPathValue::Number(n) => number_to_string(*n),
            XPathValue::String(s) => s.clone(),
            XPathValue::Strings(list) => list.first().cloned().unwrap_or_default(),
        }
    }

    /// Get as node set if applicable
    pub fn as_nodeset(&self) -> Option<&[NodeId]> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::Boolean(_) => "boolean",
            XPathValue::Number(_) => "number",
            XPathValue::String(_) => "string",
            XPathValue::Strings(_) => "attribute-set",
        }
    }
}

/// Parse a string as an XPath number: optional minus, digits, optional fraction
pub fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

/// Format a number according to XPath string() rules
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A comparison operand with node-sets flattened to their string values
enum Operand {
    Many(Vec<String>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Operand {
    fn from_value(value: &XPathValue, doc: &Document) -> Self {
        match value {
            XPathValue::NodeSet(nodes) => Operand::Many(nodes.iter().map(|&n| doc.string_value(n)).collect()),
            XPathValue::Strings(list) => Operand::Many(list.clone()),
            XPathValue::Boolean(b) => Operand::Boolean(*b),
            XPathValue::Number(n) => Operand::Number(*n),
            XPathValue::String(s) => Operand::String(s.clone()),
        }
    }
}

/// Compare two values with XPath 1.0 comparison semantics
///
/// A node-set compares true when any of its members does; otherwise
/// booleans win over numbers, and numbers over strings.
pub fn compare(left: &XPathValue, op: BinaryOp, right: &XPathValue, doc: &Document) -> bool {
    let left = Operand::from_value(left, doc);
    let right = Operand::from_value(right, doc);
    compare_operands(&left, op, &right)
}

fn compare_operands(left: &Operand, op: BinaryOp, right: &Operand) -> bool {
    match (left, right) {
        (Operand::Many(l), Operand::Many(r)) => l
            .iter()
            .any(|a| r.iter().any(|b| compare_atoms(&Operand::String(a.clone()), op, &Operand::String(b.clone())))),
        (Operand::Many(l), Operand::Boolean(b)) => compare_atoms(&Operand::Boolean(!l.is_empty()), op, &Operand::Boolean(*b)),
        (Operand::Boolean(b), Operand::Many(r)) => compare_atoms(&Operand::Boolean(*b), op, &Operand::Boolean(!r.is_empty())),
        (Operand::Many(l), other) => l
            .iter()
            .any(|a| compare_atoms(&Operand::String(a.clone()), op, other)),
        (other, Operand::Many(r)) => r
            .iter()
            .any(|b| compare_atoms(other, op, &Operand::String(b.clone()))),
        _ => compare_atoms(left, op, right),
    }
}

fn compare_atoms(left: &Operand, op: BinaryOp, right: &Operand) -> bool {
    let as_bool = |o: &Operand| match o {
        Operand::Boolean(b) => *b,
        Operand::Number(n) => *n != 0.0 && !n.is_nan(),
        Operand::String(s) => !s.is_empty(),
        Operand::Many(m) => !m.is_empty(),
    };
    let as_number = |o: &Operand| match o {
        Operand::Boolean(b) => f64::from(u8::from(*b)),
        Operand::Number(n) => *n,
        Operand::String(s) => parse_number(s),
        Operand::Many(m) => m.first().map_or(f64::NAN, |s| parse_number(s)),
    };

    match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = match (left, right) {
                (Operand::Boolean(_), _) | (_, Operand::Boolean(_)) => as_bool(left) == as_bool(right),
                (Operand::Number(_), _) | (_, Operand::Number(_)) => as_number(left) == as_number(right),
                (Operand::String(a), Operand::String(b)) => a == b,
                _ => false,
            };
            if op == BinaryOp::Eq {
                equal
            } else {
                !equal
            }
        }
        BinaryOp::Lt => as_number(left) < as_number(right),
        BinaryOp::LtEq => as_number(left) <= as_number(right),
        BinaryOp::Gt => as_number(left) > as_number(right),
        BinaryOp::GtEq => as_number(left) >= as_number(right),
        BinaryOp::And | BinaryOp::Or => false,
    }
}
