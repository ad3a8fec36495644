//! XML Tokenizer - State machine for XML token extraction
//!
//! Implements a pull-parser style tokenizer that extracts XML tokens:
//! - Element start/end tags
//! - Text content
//! - CDATA sections
//! - Comments
//! - Processing instructions and the XML declaration
//! - DOCTYPE declarations (kept raw, internal subset included)
//!
//! The tokenizer is always strict: the first well-formedness violation ends
//! tokenizing with a [`ParseError`] carrying the byte offset.

use super::entities::decode_text;
use super::scanner::Scanner;
use std::borrow::Cow;

/// Current parsing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Initial state before parsing starts
    Init,
    /// Inside text content between tags
    InsideText,
    /// Inside a markup construct (<...>)
    InsideMarkup,
    /// End of input reached
    Done,
}

/// Type of XML token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
    /// End of file
    Eof,
}

/// A parsed XML token
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// For tags: the element name
    pub name: Option<Cow<'a, [u8]>>,
    /// For text/cdata/comments/PIs: the content (owned if entities were decoded)
    pub content: Option<Cow<'a, [u8]>>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
        }
    }

    fn with_name(mut self, name: &'a [u8]) -> Self {
        self.name = Some(Cow::Borrowed(name));
        self
    }

    fn with_content(mut self, content: Cow<'a, [u8]>) -> Self {
        self.content = Some(content);
        self
    }
}

/// Well-formedness failure with the byte offset where it was detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

/// XML tokenizer implementing a pull-parser pattern
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    state: ParseState,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for the given input
    pub fn new(input: &'a [u8]) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            state: ParseState::Init,
        }
    }

    /// Get the current parse state
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Get the current position in the input
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError::new(message, self.scanner.position()))
    }

    /// Get the next token, or None once Eof has been returned
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        if self.state == ParseState::Done {
            return Ok(None);
        }

        if self.state == ParseState::Init {
            // Leading whitespace before the declaration is not significant
            self.scanner.skip_whitespace();
            self.state = ParseState::InsideText;
        }

        if self.scanner.is_eof() {
            self.state = ParseState::Done;
            let pos = self.scanner.position();
            return Ok(Some(Token::new(TokenKind::Eof, (pos, pos))));
        }

        let token = match self.scanner.peek() {
            Some(b'<') => self.parse_markup()?,
            _ => self.parse_text()?,
        };
        self.state = ParseState::InsideText;
        Ok(Some(token))
    }

    /// Parse text content up to the next '<'
    fn parse_text(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        let end = self
            .scanner
            .find_tag_start()
            .unwrap_or(start + self.scanner.remaining().len());
        let raw = self.scanner.slice(start, end);

        if memchr::memmem::find(raw, b"]]>").is_some() {
            return self.error("']]>' not allowed in text content");
        }

        let content = match decode_text(raw) {
            Ok(content) => content,
            Err(msg) => return self.error(msg),
        };

        self.scanner.set_position(end);
        Ok(Token::new(TokenKind::Text, (start, end)).with_content(content))
    }

    /// Parse markup starting with '<'
    fn parse_markup(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(1); // Skip '<'
        self.state = ParseState::InsideMarkup;

        match self.scanner.peek() {
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            Some(_) => self.parse_start_tag(start),
            None => self.error("Unexpected end of input after '<'"),
        }
    }

    /// Parse a start tag or empty element tag
    fn parse_start_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let name = match self.scanner.read_name() {
            Some(name) => name,
            None => return self.error("Invalid element name: must start with letter, underscore, or colon"),
        };

        // Find the end of the tag, handling quoted attributes
        let end = match self.scanner.find_tag_end_quoted() {
            Some(end) => end,
            None => return self.error("Unterminated start tag"),
        };

        // Check if it's an empty element tag
        let is_empty = self.scanner.slice(end - 1, end) == b"/";

        self.scanner.set_position(end + 1);

        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        Ok(Token::new(kind, (start, end + 1)).with_name(name))
    }

    /// Parse an end tag
    fn parse_end_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '/'

        let name = match self.scanner.read_name() {
            Some(name) => name,
            None => return self.error("Invalid element name in end tag"),
        };

        // End tag can only have whitespace after name, not attributes
        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return self.error("End tag cannot have attributes or other content");
        }
        self.scanner.advance(1);

        Ok(Token::new(TokenKind::EndTag, (start, self.scanner.position())).with_name(name))
    }

    /// Parse markup starting with '!' (comment, CDATA, DOCTYPE)
    fn parse_bang_markup(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '!'

        if self.scanner.starts_with(b"--") {
            self.parse_comment(start)
        } else if self.scanner.starts_with(b"[CDATA[") {
            self.parse_cdata(start)
        } else if self.scanner.starts_with(b"DOCTYPE") {
            self.parse_doctype(start)
        } else {
            self.error("Invalid declaration - expected comment, CDATA, or DOCTYPE")
        }
    }

    /// Parse a comment <!--...-->
    fn parse_comment(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(2); // Skip '--'
        let content_start = self.scanner.position();

        let end = match self.scanner.find_sequence(b"-->") {
            Some(end) => end,
            None => return self.error("Unterminated comment"),
        };
        let content = self.scanner.slice(content_start, end);

        // "--" must not occur inside a comment, nor may it end in '-'
        if memchr::memmem::find(content, b"--").is_some() || content.ends_with(b"-") {
            self.scanner.set_position(content_start);
            return self.error("'--' not allowed in comment");
        }

        self.scanner.set_position(end + 3); // Skip '-->'
        Ok(Token::new(TokenKind::Comment, (start, end + 3)).with_content(Cow::Borrowed(content)))
    }

    /// Parse a CDATA section <![CDATA[...]]>
    fn parse_cdata(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(7); // Skip '[CDATA['
        let content_start = self.scanner.position();

        let end = match self.scanner.find_sequence(b"]]>") {
            Some(end) => end,
            None => return self.error("Unterminated CDATA section"),
        };
        let content = self.scanner.slice(content_start, end);

        self.scanner.set_position(end + 3); // Skip ']]>'
        Ok(Token::new(TokenKind::CData, (start, end + 3)).with_content(Cow::Borrowed(content)))
    }

    /// Parse a DOCTYPE declaration, keeping it raw
    ///
    /// Format: <!DOCTYPE name [internal subset]> or <!DOCTYPE name PUBLIC "id" "uri">
    fn parse_doctype(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(7); // Skip "DOCTYPE"

        if !matches!(self.scanner.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            return self.error("Whitespace required after DOCTYPE");
        }
        self.scanner.skip_whitespace();
        if self.scanner.read_name().is_none() {
            return self.error("DOCTYPE declaration requires a name");
        }

        let mut in_internal_subset = false;
        let mut quote: Option<u8> = None;

        while let Some(b) = self.scanner.peek() {
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => in_internal_subset = true,
                (None, b']') => in_internal_subset = false,
                (None, b'>') if !in_internal_subset => {
                    self.scanner.advance(1);
                    let end = self.scanner.position();
                    return Ok(Token::new(TokenKind::DocType, (start, end))
                        .with_content(Cow::Borrowed(self.scanner.slice(start, end))));
                }
                _ => {}
            }
            self.scanner.advance(1);
        }

        self.error("Unterminated DOCTYPE declaration")
    }

    /// Parse a processing instruction or the XML declaration
    fn parse_pi(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '?'

        let target = match self.scanner.read_name() {
            Some(name) => name,
            None => return self.error("Processing instruction requires a target"),
        };

        let end = match self.scanner.find_sequence(b"?>") {
            Some(end) => end,
            None => return self.error("Unterminated processing instruction"),
        };

        let data_start = self.scanner.position();
        let data = trim_ascii(self.scanner.slice(data_start, end));

        let kind = if target == b"xml" {
            if start != 0 {
                return self.error("XML declaration must be at the start of the document");
            }
            TokenKind::XmlDeclaration
        } else if target.eq_ignore_ascii_case(b"xml") {
            return self.error("Processing instruction target 'xml' is reserved");
        } else {
            TokenKind::ProcessingInstruction
        };

        self.scanner.set_position(end + 2); // Skip '?>'

        let token = Token::new(kind, (start, end + 2)).with_name(target);
        Ok(if data.is_empty() {
            token
        } else {
            token.with_content(Cow::Borrowed(data))
        })
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &[u8]) -> Vec<TokenKind> {
        let mut tokenizer = Tokenizer::new(input);
        let mut kinds = Vec::new();
        while let Some(token) = tokenizer.next_token().unwrap() {
            kinds.push(token.kind);
        }
        kinds
    }

    #[test]
    fn test_simple_document() {
        assert_eq!(
            kinds(b"<web-app>text</web-app>"),
            vec![TokenKind::StartTag, TokenKind::Text, TokenKind::EndTag, TokenKind::Eof]
        );
    }

    #[test]
    fn test_declaration_and_doctype() {
        let input = b"<?xml version=\"1.0\"?>\n<!DOCTYPE web-app PUBLIC \"-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN\" \"http://java.sun.com/dtd/web-app_2_3.dtd\">\n<web-app/>";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::XmlDeclaration,
                TokenKind::Text,
                TokenKind::DocType,
                TokenKind::Text,
                TokenKind::EmptyTag,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_doctype_internal_subset() {
        let mut tokenizer = Tokenizer::new(b"<!DOCTYPE a [<!ENTITY x \"y>\">]><a/>");
        let token = tokenizer.next_token().unwrap().unwrap();
        assert_eq!(token.kind, TokenKind::DocType);
        assert_eq!(token.content.unwrap().as_ref(), b"<!DOCTYPE a [<!ENTITY x \"y>\">]>");
    }

    #[test]
    fn test_comment_content() {
        let mut tokenizer = Tokenizer::new(b"<!-- servlets -->");
        let token = tokenizer.next_token().unwrap().unwrap();
        assert_eq!(token.kind, TokenKind::Comment);
        assert_eq!(token.content.unwrap().as_ref(), b" servlets ");
    }

    #[test]
    fn test_double_hyphen_in_comment() {
        let mut tokenizer = Tokenizer::new(b"<!-- a -- b -->");
        assert!(tokenizer.next_token().is_err());
    }

    #[test]
    fn test_unterminated_comment() {
        let mut tokenizer = Tokenizer::new(b"<!-- never closed");
        let err = tokenizer.next_token().unwrap_err();
        assert_eq!(err.message, "Unterminated comment");
    }

    #[test]
    fn test_pi_data() {
        let mut tokenizer = Tokenizer::new(b"<?xml-stylesheet href=\"a.xsl\" ?>");
        let token = tokenizer.next_token().unwrap().unwrap();
        assert_eq!(token.kind, TokenKind::ProcessingInstruction);
        assert_eq!(token.content.unwrap().as_ref(), b"href=\"a.xsl\"");
    }

    #[test]
    fn test_misplaced_declaration() {
        let mut tokenizer = Tokenizer::new(b"<a/><?xml version=\"1.0\"?>");
        tokenizer.next_token().unwrap();
        assert!(tokenizer.next_token().is_err());
    }

    #[test]
    fn test_end_tag_with_attributes() {
        let mut tokenizer = Tokenizer::new(b"</a b=\"c\">");
        assert!(tokenizer.next_token().is_err());
    }

    #[test]
    fn test_cdata() {
        let mut tokenizer = Tokenizer::new(b"<![CDATA[a < b]]>");
        let token = tokenizer.next_token().unwrap().unwrap();
        assert_eq!(token.kind, TokenKind::CData);
        assert_eq!(token.content.unwrap().as_ref(), b"a < b");
    }
}
