//! XPath 1.0 Functions
//!
//! The core functions descriptor queries need:
//!
//! Node Set Functions:
//! - position(), last(), count(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring-before(),
//!   substring-after(), string-length(), normalize-space()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false()
//!
//! Number Functions:
//! - number()
//!
//! Names and arities are checked when the expression is compiled, so a
//! call that reaches [`call`] always has a valid argument count.

use super::eval::EvalContext;
use super::value::{parse_number, XPathValue};
use crate::dom::NodeId;
use crate::error::XPathError;

/// A resolved core function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Position,
    Last,
    Count,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    StringLength,
    NormalizeSpace,
    Boolean,
    Not,
    True,
    False,
    Number,
}

impl Function {
    /// Resolve a function name and check its argument count
    pub fn lookup(name: &str, argc: usize) -> Result<Self, XPathError> {
        use Function::*;

        let (function, min, max, expected) = match name {
            "position" => (Position, 0, 0, "0"),
            "last" => (Last, 0, 0, "0"),
            "count" => (Count, 1, 1, "1"),
            "local-name" => (LocalName, 0, 1, "0 or 1"),
            "namespace-uri" => (NamespaceUri, 0, 1, "0 or 1"),
            "name" => (Name, 0, 1, "0 or 1"),
            "string" => (String, 0, 1, "0 or 1"),
            "concat" => (Concat, 2, usize::MAX, "2 or more"),
            "starts-with" => (StartsWith, 2, 2, "2"),
            "contains" => (Contains, 2, 2, "2"),
            "substring-before" => (SubstringBefore, 2, 2, "2"),
            "substring-after" => (SubstringAfter, 2, 2, "2"),
            "string-length" => (StringLength, 0, 1, "0 or 1"),
            "normalize-space" => (NormalizeSpace, 0, 1, "0 or 1"),
            "boolean" => (Boolean, 1, 1, "1"),
            "not" => (Not, 1, 1, "1"),
            "true" => (True, 0, 0, "0"),
            "false" => (False, 0, 0, "0"),
            "number" => (Number, 0, 1, "0 or 1"),
            _ => return Err(XPathError::UnknownFunction(name.to_string())),
        };

        if argc < min || argc > max {
            return Err(XPathError::Arity {
                name: name.to_string(),
                expected,
                got: argc,
            });
        }
        Ok(function)
    }
}

/// Evaluate a function call
pub fn call(function: Function, args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, XPathError> {
    let doc = ctx.doc;
    let string_arg = |i: usize| -> String {
        match args.get(i) {
            Some(value) => value.to_string_value(doc),
            None => doc.string_value(ctx.node),
        }
    };

    Ok(match function {
        // Node Set Functions
        Function::Position => XPathValue::Number(ctx.position as f64),
        Function::Last => XPathValue::Number(ctx.size as f64),
        Function::Count => match &args[0] {
            XPathValue::NodeSet(nodes) => XPathValue::Number(nodes.len() as f64),
            XPathValue::Strings(values) => XPathValue::Number(values.len() as f64),
            other => {
                return Err(XPathError::Type(format!(
                    "count() expects a node-set, got {}",
                    other.type_name()
                )))
            }
        },
        Function::LocalName => match node_arg(&args, ctx, "local-name")? {
            Some(node) => XPathValue::String(doc.local_name(node).to_string()),
            None => XPathValue::String(std::string::String::new()),
        },
        Function::NamespaceUri => match node_arg(&args, ctx, "namespace-uri")? {
            Some(node) => XPathValue::String(doc.namespace_uri(node).to_string()),
            None => XPathValue::String(std::string::String::new()),
        },
        Function::Name => match node_arg(&args, ctx, "name")? {
            Some(node) => XPathValue::String(doc.node_name(node).to_string()),
            None => XPathValue::String(std::string::String::new()),
        },

        // String Functions
        Function::String => XPathValue::String(string_arg(0)),
        Function::Concat => XPathValue::String(args.iter().map(|a| a.to_string_value(doc)).collect()),
        Function::StartsWith => XPathValue::Boolean(string_arg(0).starts_with(&string_arg(1))),
        Function::Contains => XPathValue::Boolean(string_arg(0).contains(&string_arg(1))),
        Function::SubstringBefore => {
            let (haystack, needle) = (string_arg(0), string_arg(1));
            XPathValue::String(
                haystack
                    .split_once(needle.as_str())
                    .map(|(before, _)| before.to_string())
                    .unwrap_or_default(),
            )
        }
        Function::SubstringAfter => {
            let (haystack, needle) = (string_arg(0), string_arg(1));
            XPathValue::String(
                haystack
                    .split_once(needle.as_str())
                    .map(|(_, after)| after.to_string())
                    .unwrap_or_default(),
            )
        }
        Function::StringLength => XPathValue::Number(string_arg(0).chars().count() as f64),
        Function::NormalizeSpace => XPathValue::String(normalize_space(&string_arg(0))),

        // Boolean Functions
        Function::Boolean => XPathValue::Boolean(args[0].to_boolean()),
        Function::Not => XPathValue::Boolean(!args[0].to_boolean()),
        Function::True => XPathValue::Boolean(true),
        Function::False => XPathValue::Boolean(false),

        // Number Functions
        Function::Number => match args.first() {
            Some(value) => XPathValue::Number(value.to_number(doc)),
            None => XPathValue::Number(parse_number(&doc.string_value(ctx.node))),
        },
    })
}

/// First node of an optional node-set argument, defaulting to the context node
fn node_arg(args: &[XPathValue], ctx: &EvalContext<'_>, name: &str) -> Result<Option<NodeId>, XPathError> {
    match args.first() {
        None => Ok(Some(ctx.node)),
        Some(XPathValue::NodeSet(nodes)) => Ok(nodes.first().copied()),
        Some(other) => Err(XPathError::Type(format!(
            "{}() expects a node-set, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// Collapse runs of XML whitespace to one space and trim both ends
pub fn normalize_space(s: &str) -> String {
    s.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}
