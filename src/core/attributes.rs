//! XML Attribute Parsing
//!
//! Parses XML attributes from tag content. Descriptors are parsed strictly:
//! every attribute needs a quoted value and no name may repeat.

use super::entities::decode_text;
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: Cow<'a, [u8]>,
    /// Attribute value (entities decoded)
    pub value: Cow<'a, [u8]>,
    /// Attribute value as written, between the quotes
    pub raw: &'a [u8],
    /// Local name (after colon, if namespaced)
    pub local_name: Cow<'a, [u8]>,
    /// Namespace prefix (before colon), if any
    pub prefix: Option<Cow<'a, [u8]>>,
}

impl<'a> Attribute<'a> {
    /// Create a new attribute
    pub fn new(name: &'a [u8], raw: &'a [u8], value: Cow<'a, [u8]>) -> Self {
        let (prefix, local_name) = split_name(name);
        Attribute {
            name: Cow::Borrowed(name),
            value,
            raw,
            local_name: Cow::Borrowed(local_name),
            prefix: prefix.map(Cow::Borrowed),
        }
    }

    /// Get the name as a string
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name.as_ref()).ok()
    }

    /// Get the value as a string
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value.as_ref()).ok()
    }

    /// Get the local name as a string
    pub fn local_name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.local_name.as_ref()).ok()
    }

    /// Get the prefix as a string
    pub fn prefix_str(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(|p| std::str::from_utf8(p.as_ref()).ok())
    }

    /// Is this a namespace declaration (`xmlns` or `xmlns:p`)?
    pub fn is_namespace_declaration(&self) -> bool {
        self.name.as_ref() == b"xmlns" || self.prefix.as_deref() == Some(b"xmlns".as_slice())
    }
}

/// Split a name into prefix and local name at the colon
pub fn split_name(name: &[u8]) -> (Option<&[u8]>, &[u8]) {
    if let Some(colon_pos) = memchr(b':', name) {
        (Some(&name[..colon_pos]), &name[colon_pos + 1..])
    } else {
        (None, name)
    }
}

/// Parse attributes from raw tag content (after the element name)
///
/// Input should be the content between element name and '>' or '/>'
pub fn parse_attributes(input: &[u8]) -> Result<Vec<Attribute<'_>>, &'static str> {
    let mut attrs: Vec<Attribute<'_>> = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        // Attributes must be separated from the name and from each other
        let ws_start = pos;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        if pos >= input.len() {
            break;
        }

        if pos == ws_start {
            return Err("Whitespace required between attributes");
        }

        // Parse attribute name
        let name_start = pos;
        if !is_name_start_char(input[pos]) {
            return Err("Attribute name must start with letter, underscore, or colon");
        }
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        // Skip whitespace around '='
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() || input[pos] != b'=' {
            return Err("Attribute value required");
        }
        pos += 1; // Skip '='
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        // Parse quoted attribute value
        let quote = match input.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => return Err("Attribute value must be quoted"),
        };
        pos += 1; // Skip opening quote
        let value_start = pos;

        let value_end = match memchr(quote, &input[value_start..]) {
            Some(offset) => value_start + offset,
            None => return Err("Attribute value has mismatched quotes"),
        };
        let value_bytes = &input[value_start..value_end];
        if memchr(b'<', value_bytes).is_some() {
            return Err("Attribute value cannot contain '<'");
        }
        pos = value_end + 1; // Skip closing quote

        if attrs.iter().any(|a| a.name.as_ref() == name) {
            return Err("Duplicate attribute");
        }

        let value = decode_text(value_bytes)?;
        attrs.push(Attribute::new(name, value_bytes, value));
    }

    Ok(attrs)
}
