//! Zero-Copy Slice Parser
//!
//! Parses XML from a byte slice with zero-copy semantics.
//! Input references are maintained directly in the output.

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::{parse_attributes, Attribute};
use crate::core::tokenizer::{ParseError, Token, TokenKind, Tokenizer};
use std::borrow::Cow;

/// Zero-copy XML reader from a byte slice
pub struct SliceReader<'a> {
    input: &'a [u8],
    tokenizer: Tokenizer<'a>,
    /// Span of the token behind the last event
    last_span: (usize, usize),
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        SliceReader {
            input,
            tokenizer: Tokenizer::new(input),
            last_span: (0, 0),
        }
    }

    /// Byte offset where the most recent event started
    pub fn last_position(&self) -> usize {
        self.last_span.0
    }

    /// Source bytes of the most recent event, before entity decoding
    pub fn last_raw(&self) -> &'a [u8] {
        &self.input[self.last_span.0..self.last_span.1]
    }

    /// Get the next XML event
    ///
    /// Returns `Ok(None)` after `EndDocument` has been produced.
    pub fn next_event(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        let token = match self.tokenizer.next_token()? {
            Some(token) => token,
            None => return Ok(None),
        };
        self.last_span = token.span;

        let event = match token.kind {
            TokenKind::Eof => XmlEvent::EndDocument,
            TokenKind::StartTag => XmlEvent::StartElement(self.start_element(&token, 1)?),
            TokenKind::EmptyTag => XmlEvent::EmptyElement(self.start_element(&token, 2)?),
            TokenKind::EndTag => {
                let name = self.tag_name(&token, 2);
                XmlEvent::EndElement(EndElement::new(name))
            }
            TokenKind::Text => XmlEvent::Text(token.content.unwrap_or(Cow::Borrowed(b""))),
            TokenKind::CData => XmlEvent::CData(token.content.unwrap_or(Cow::Borrowed(b""))),
            TokenKind::Comment => XmlEvent::Comment(token.content.unwrap_or(Cow::Borrowed(b""))),
            TokenKind::ProcessingInstruction => XmlEvent::ProcessingInstruction {
                target: token.name.unwrap_or(Cow::Borrowed(b"")),
                data: token.content,
            },
            TokenKind::XmlDeclaration => self.declaration(&token)?,
            TokenKind::DocType => {
                let (start, end) = token.span;
                XmlEvent::DocType(Cow::Borrowed(&self.input[start..end]))
            }
        };

        Ok(Some(event))
    }

    /// Slice the element name out of the raw tag, skipping `prefix_len` bytes of markup
    fn tag_name(&self, token: &Token<'a>, prefix_len: usize) -> &'a [u8] {
        let len = token.name.as_ref().map_or(0, |n| n.len());
        let start = token.span.0 + prefix_len;
        &self.input[start..start + len]
    }

    fn start_element(&self, token: &Token<'a>, suffix_len: usize) -> Result<StartElement<'a>, ParseError> {
        let name = self.tag_name(token, 1);
        let attr_start = token.span.0 + 1 + name.len();
        let attr_end = token.span.1 - suffix_len;
        let attributes = self.attributes(attr_start, attr_end.max(attr_start))?;
        Ok(StartElement::new(name, attributes))
    }

    fn attributes(&self, start: usize, end: usize) -> Result<Vec<Attribute<'a>>, ParseError> {
        parse_attributes(&self.input[start..end]).map_err(|msg| ParseError::new(msg, start))
    }

    fn declaration(&self, token: &Token<'a>) -> Result<XmlEvent<'a>, ParseError> {
        // "<?xml" .. "?>"
        let (start, end) = token.span;
        let attrs = self.attributes(start + 5, end - 2)?;

        let version = attrs
            .iter()
            .find(|a| a.name.as_ref() == b"version")
            .map(|a| a.value.clone())
            .ok_or_else(|| ParseError::new("XML declaration requires a version", start))?;
        let encoding = attrs
            .iter()
            .find(|a| a.name.as_ref() == b"encoding")
            .map(|a| a.value.clone());
        let standalone = attrs
            .iter()
            .find(|a| a.name.as_ref() == b"standalone")
            .map(|a| a.value.as_ref() == b"yes");

        Ok(XmlEvent::XmlDeclaration {
            version,
            encoding,
            standalone,
        })
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<XmlEvent<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_event() {
            Ok(Some(XmlEvent::EndDocument)) | Ok(None) => None,
            Ok(Some(event)) => Some(Ok(event)),
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &[u8]) -> Vec<XmlEvent<'_>> {
        SliceReader::new(input).collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn test_simple_element() {
        let events = events(b"<web-app>hello</web-app>");
        assert_eq!(events.len(), 3);

        assert!(matches!(&events[0], XmlEvent::StartElement(e) if e.name_str() == Some("web-app")));
        assert!(matches!(&events[1], XmlEvent::Text(t) if t.as_ref() == b"hello"));
        assert!(matches!(&events[2], XmlEvent::EndElement(e) if e.name_str() == Some("web-app")));
    }

    #[test]
    fn test_empty_element() {
        let events = events(b"<distributable/>");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], XmlEvent::EmptyElement(e) if e.name_str() == Some("distributable")));
    }

    #[test]
    fn test_attributes() {
        let events = events(b"<web-app id=\"WebApp_ID\" version=\"2.5\">\n</web-app>");
        match &events[0] {
            XmlEvent::StartElement(e) => {
                assert_eq!(e.get_attribute_value("id"), Some("WebApp_ID"));
                assert_eq!(e.get_attribute_value("version"), Some("2.5"));
            }
            other => panic!("Expected StartElement, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_element_attributes() {
        let events = events(b"<a x='1'/>");
        match &events[0] {
            XmlEvent::EmptyElement(e) => assert_eq!(e.get_attribute_value("x"), Some("1")),
            other => panic!("Expected EmptyElement, got {:?}", other),
        }
    }

    #[test]
    fn test_declaration() {
        let events = events(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><a/>");
        match &events[0] {
            XmlEvent::XmlDeclaration { version, encoding, standalone } => {
                assert_eq!(version.as_ref(), b"1.0");
                assert_eq!(encoding.as_deref(), Some(b"UTF-8".as_slice()));
                assert_eq!(*standalone, None);
            }
            other => panic!("Expected XmlDeclaration, got {:?}", other),
        }
    }

    #[test]
    fn test_last_raw_is_undecoded_text() {
        let mut reader = SliceReader::new(b"<a>&lt;&app;</a>");
        reader.next_event().unwrap();
        match reader.next_event().unwrap() {
            Some(XmlEvent::Text(t)) => assert_eq!(t.as_ref(), b"<&app;"),
            other => panic!("Expected Text, got {:?}", other),
        }
        assert_eq!(reader.last_raw(), b"&lt;&app;");
    }

    #[test]
    fn test_bad_attribute_is_error() {
        let result: Result<Vec<_>, _> = SliceReader::new(b"<a b=c/>").collect();
        assert!(result.is_err());
    }

    #[test]
    fn test_comment() {
        let events = events(b"<root><!-- comment --></root>");
        assert!(events.iter().any(|e| matches!(e, XmlEvent::Comment(_))));
    }
}
