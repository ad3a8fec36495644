//! Descriptor Encoding Detection
//!
//! Descriptors written by IDEs on Windows occasionally arrive as UTF-16
//! with a byte order mark, and older ones declare a legacy encoding such as
//! `ISO-8859-1`. Both are converted to UTF-8 before tokenizing; everything
//! downstream works on UTF-8 only.

use super::attributes::parse_attributes;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use memchr::memmem;

/// Encoding detected from the leading bytes of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        match input {
            [0xFF, 0xFE, ..] | [b'<', 0x00, ..] => XmlEncoding::Utf16Le,
            [0xFE, 0xFF, ..] | [0x00, b'<', ..] => XmlEncoding::Utf16Be,
            _ => XmlEncoding::Utf8,
        }
    }
}

/// Convert raw descriptor bytes to UTF-8, stripping any byte order mark
pub fn convert_to_utf8(input: Vec<u8>) -> Result<Vec<u8>, String> {
    let encoding = match XmlEncoding::detect(&input) {
        XmlEncoding::Utf16Le => UTF_16LE,
        XmlEncoding::Utf16Be => UTF_16BE,
        XmlEncoding::Utf8 => declared_encoding(&input)?,
    };

    let body = match Encoding::for_bom(&input) {
        Some((bom, len)) if bom == encoding => &input[len..],
        _ => &input[..],
    };

    if encoding == UTF_8 {
        return Ok(if body.len() == input.len() { input } else { body.to_vec() });
    }

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned().into_bytes())
        .ok_or_else(|| format!("Invalid {} input", encoding.name()))
}

/// Encoding named by the XML declaration of byte-oriented input
///
/// Input without a declaration, or with one naming UTF-16 while the bytes
/// are plainly not UTF-16, is read as UTF-8.
fn declared_encoding(input: &[u8]) -> Result<&'static Encoding, String> {
    let input = input.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(input);
    let Some(decl) = input.strip_prefix(b"<?xml".as_slice()) else {
        return Ok(UTF_8);
    };
    let Some(end) = memmem::find(decl, b"?>") else {
        return Ok(UTF_8);
    };

    // A malformed declaration is reported by the tokenizer
    let Ok(attrs) = parse_attributes(&decl[..end]) else {
        return Ok(UTF_8);
    };
    let Some(label) = attrs.iter().find(|a| a.name.as_ref() == b"encoding") else {
        return Ok(UTF_8);
    };

    match Encoding::for_label(&label.value) {
        Some(encoding) if encoding == UTF_16LE || encoding == UTF_16BE => Ok(UTF_8),
        Some(encoding) => Ok(encoding),
        None => Err(format!(
            "Unsupported encoding '{}'",
            String::from_utf8_lossy(&label.value)
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_utf8() {
        assert_eq!(XmlEncoding::detect(b"<web-app/>"), XmlEncoding::Utf8);
        assert_eq!(XmlEncoding::detect(&[0xEF, 0xBB, 0xBF, b'<']), XmlEncoding::Utf8);
    }

    #[test]
    fn test_strip_utf8_bom() {
        let converted = convert_to_utf8(vec![0xEF, 0xBB, 0xBF, b'<', b'a', b'/', b'>']).unwrap();
        assert_eq!(converted, b"<a/>");
    }

    #[test]
    fn test_convert_utf16_le() {
        let mut input = vec![0xFF, 0xFE];
        for b in b"<a/>" {
            input.push(*b);
            input.push(0);
        }
        assert_eq!(XmlEncoding::detect(&input), XmlEncoding::Utf16Le);
        assert_eq!(convert_to_utf8(input).unwrap(), b"<a/>");
    }

    #[test]
    fn test_convert_utf16_be() {
        let mut input = vec![0xFE, 0xFF];
        for b in b"<a/>" {
            input.push(0);
            input.push(*b);
        }
        assert_eq!(convert_to_utf8(input).unwrap(), b"<a/>");
    }

    #[test]
    fn test_odd_utf16_length() {
        assert!(convert_to_utf8(vec![0xFF, 0xFE, b'<']).is_err());
    }

    #[test]
    fn test_declared_latin1() {
        let input = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><display-name>caf\xE9</display-name>".to_vec();
        let converted = convert_to_utf8(input).unwrap();
        assert_eq!(
            String::from_utf8(converted).unwrap(),
            "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><display-name>caf\u{e9}</display-name>"
        );
    }

    #[test]
    fn test_declared_utf8_unchanged() {
        let input = b"<?xml version=\"1.0\" encoding=\"utf-8\"?><a/>".to_vec();
        assert_eq!(convert_to_utf8(input.clone()).unwrap(), input);
    }

    #[test]
    fn test_unsupported_encoding() {
        let err = convert_to_utf8(b"<?xml version=\"1.0\" encoding=\"EBCDIC-XYZ\"?><a/>".to_vec()).unwrap_err();
        assert_eq!(err, "Unsupported encoding 'EBCDIC-XYZ'");
    }
}
