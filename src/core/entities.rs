//! XML Entity Decoding and Encoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! References to entities declared in a DOCTYPE are not expanded. They stay
//! in the decoded text as written, and [`has_unresolved_reference`] tells
//! the DOM to keep the source markup so the writer does not escape them.
//!
//! Uses Cow for zero-copy when no entities are present, both when decoding
//! descriptor text and when escaping it again on write.

use memchr::memchr;
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
pub fn decode_text(input: &[u8]) -> Result<Cow<'_, [u8]>, &'static str> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    // Slow path: decode entities
    decode_entities(input).map(Cow::Owned)
}

/// Decode all entity references in the input
fn decode_entities(input: &[u8]) -> Result<Vec<u8>, &'static str> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        if let Some(amp_pos) = memchr(b'&', &input[pos..]) {
            // Copy everything before the entity
            result.extend_from_slice(&input[pos..pos + amp_pos]);
            pos += amp_pos;

            // Find the semicolon
            if let Some(semi_offset) = memchr(b';', &input[pos..]) {
                let entity = &input[pos + 1..pos + semi_offset];

                if let Some(decoded) = decode_entity(entity)? {
                    let mut buf = [0u8; 4];
                    result.extend_from_slice(decoded.encode_utf8(&mut buf).as_bytes());
                    pos += semi_offset + 1;
                } else {
                    // Unknown entity (DTD-declared), keep as-is
                    result.push(b'&');
                    pos += 1;
                }
            } else {
                // No semicolon found, keep the ampersand
                result.push(b'&');
                pos += 1;
            }
        } else {
            // No more entities, copy the rest
            result.extend_from_slice(&input[pos..]);
            break;
        }
    }

    Ok(result)
}

/// Does raw markup contain a reference the decoder leaves unexpanded?
pub fn has_unresolved_reference(raw: &[u8]) -> bool {
    let mut pos = 0;
    while let Some(offset) = memchr(b'&', &raw[pos..]) {
        let start = pos + offset + 1;
        let Some(len) = memchr(b';', &raw[start..]) else {
            return true;
        };
        if !matches!(decode_entity(&raw[start..start + len]), Ok(Some(_))) {
            return true;
        }
        pos = start + len + 1;
    }
    false
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &[u8]) -> Result<Option<char>, &'static str> {
    if entity.is_empty() {
        return Ok(None);
    }

    // Numeric character reference
    if entity[0] == b'#' {
        return decode_numeric_entity(&entity[1..])
            .map(Some)
            .ok_or("Invalid character reference");
    }

    // Named entity
    Ok(match entity {
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"amp" => Some('&'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        _ => None,
    })
}

/// Decode a numeric character reference, validating against the XML 1.0 Char production
fn decode_numeric_entity(entity: &[u8]) -> Option<char> {
    if entity.is_empty() {
        return None;
    }

    let codepoint = if entity[0] == b'x' || entity[0] == b'X' {
        // Hexadecimal: &#xHHHH;
        let hex = std::str::from_utf8(&entity[1..]).ok()?;
        u32::from_str_radix(hex, 16).ok()?
    } else {
        // Decimal: &#DDDD;
        let dec = std::str::from_utf8(entity).ok()?;
        dec.parse::<u32>().ok()?
    };

    if !is_valid_xml_char(codepoint) {
        return None;
    }

    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Encode text content for XML output
///
/// Quotes are left alone in text content so param values round-trip
/// without gaining entity noise.
pub fn encode_text(input: &str) -> Cow<'_, str> {
    escape(input, false)
}

/// Encode text for use in a double-quoted XML attribute
pub fn encode_attribute(input: &str) -> Cow<'_, str> {
    escape(input, true)
}

fn escape(input: &str, quotes: bool) -> Cow<'_, str> {
    let needs_escape = |b: u8| matches!(b, b'<' | b'>' | b'&') || (quotes && b == b'"');

    // Fast path: check if any escaping needed
    if !input.bytes().any(needs_escape) {
        return Cow::Borrowed(input);
    }

    // Slow path: escape
    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' if quotes => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}
