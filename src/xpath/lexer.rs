//! XPath Lexer
//!
//! Tokenizes XPath expressions into tokens. Names are resolved into their
//! role (axis, function, node type, qualified name test) here, using the
//! characters that follow them, so the parser never needs more than one
//! token of lookahead.

use crate::error::XPathError;

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Star,        // *
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    Literal(String),

    // Names
    Name(String),           // NCName
    QName(String, String),  // prefix:local
    PrefixWildcard(String), // prefix:*
    NodeType(String),       // node(), text(), comment()
    FunctionName(String),   // name followed by (
    Axis(String),           // child::, descendant::, etc.

    // Special
    DoubleColon, // ::
    Comma,       // ,

    // End of input
    Eof,
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    /// Byte offset of the next unread character
    pub fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> XPathError {
        XPathError::Syntax {
            message: message.into(),
            position: self.pos,
        }
    }

    /// Consume one char and return `token`
    fn single(&mut self, token: Token) -> Result<Token, XPathError> {
        self.advance(1);
        Ok(token)
    }

    /// Consume one char, then a second if it is `next`
    fn one_or_two(&mut self, next: char, two: Token, one: Token) -> Result<Token, XPathError> {
        self.advance(1);
        if self.peek() == Some(next) {
            self.advance(1);
            Ok(two)
        } else {
            Ok(one)
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, XPathError> {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match c {
            '/' => self.one_or_two('/', Token::DoubleSlash, Token::Slash),
            '.' => {
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number()
                } else {
                    self.one_or_two('.', Token::DoubleDot, Token::Dot)
                }
            }
            '@' => self.single(Token::At),
            '|' => self.single(Token::Pipe),
            '*' => self.single(Token::Star),
            '=' => self.single(Token::Eq),
            '!' => {
                if self.peek_at(1) == Some('=') {
                    self.advance(2);
                    Ok(Token::NotEq)
                } else {
                    Err(self.error("Expected '=' after '!'"))
                }
            }
            '<' => self.one_or_two('=', Token::LtEq, Token::Lt),
            '>' => self.one_or_two('=', Token::GtEq, Token::Gt),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            ',' => self.single(Token::Comma),
            ':' => {
                if self.peek_at(1) == Some(':') {
                    self.advance(2);
                    Ok(Token::DoubleColon)
                } else {
                    Err(self.error("Unexpected ':'"))
                }
            }
            '"' | '\'' => self.read_literal(c),
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(c) => Ok(self.read_name_or_keyword()),
            _ => Err(self.error(format!("Unexpected character '{}'", c))),
        }
    }

    /// Read a number literal
    fn read_number(&mut self) -> Result<Token, XPathError> {
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
        if self.peek() == Some('.') {
            self.advance(1);
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance(1);
            }
        }

        self.input[start..self.pos]
            .parse()
            .map(Token::Number)
            .map_err(|_| self.error("Invalid number"))
    }

    /// Read a string literal; XPath 1.0 has no escapes inside literals
    fn read_literal(&mut self, quote: char) -> Result<Token, XPathError> {
        let open = self.pos;
        self.advance(1);
        let start = self.pos;

        match self.remaining().find(quote) {
            Some(len) => {
                let value = self.input[start..start + len].to_string();
                self.advance(len + 1);
                Ok(Token::Literal(value))
            }
            None => Err(XPathError::Syntax {
                message: "Unterminated string literal".to_string(),
                position: open,
            }),
        }
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Read a name or keyword
    fn read_name_or_keyword(&mut self) -> Token {
        let name = self.read_ncname();

        // prefix:local or prefix:*
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            if self.peek_at(1) == Some('*') {
                self.advance(2);
                return Token::PrefixWildcard(name.to_string());
            }
            if self.peek_at(1).is_some_and(is_name_start_char) {
                self.advance(1);
                let local = self.read_ncname();
                return Token::QName(name.to_string(), local.to_string());
            }
        }

        match name {
            "and" => return Token::And,
            "or" => return Token::Or,
            _ => {}
        }

        let after_name = self.pos;
        self.skip_whitespace();
        let token = if self.remaining().starts_with("::") {
            Token::Axis(name.to_string())
        } else if self.peek() == Some('(') {
            match name {
                "node" | "text" | "comment" => Token::NodeType(name.to_string()),
                _ => Token::FunctionName(name.to_string()),
            }
        } else {
            Token::Name(name.to_string())
        };

        if matches!(token, Token::Name(_)) {
            self.pos = after_name;
        }
        token
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, XPathError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if matches!(token, Token::Eof) {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(
            tokens("/web-app/servlet"),
            vec![
                Token::Slash,
                Token::Name("web-app".to_string()),
                Token::Slash,
                Token::Name("servlet".to_string()),
            ]
        );
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(
            tokens("xmlns:context-param/xmlns:*"),
            vec![
                Token::QName("xmlns".to_string(), "context-param".to_string()),
                Token::Slash,
                Token::PrefixWildcard("xmlns".to_string()),
            ]
        );
    }

    #[test]
    fn test_predicate() {
        assert_eq!(
            tokens("param-name[normalize-space(.) = 'contextClass']"),
            vec![
                Token::Name("param-name".to_string()),
                Token::LeftBracket,
                Token::FunctionName("normalize-space".to_string()),
                Token::LeftParen,
                Token::Dot,
                Token::RightParen,
                Token::Eq,
                Token::Literal("contextClass".to_string()),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_axis_and_node_type() {
        assert_eq!(
            tokens("child::text()"),
            vec![
                Token::Axis("child".to_string()),
                Token::DoubleColon,
                Token::NodeType("text".to_string()),
                Token::LeftParen,
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens("1 .5 2.25"), vec![Token::Number(1.0), Token::Number(0.5), Token::Number(2.25)]);
    }

    #[test]
    fn test_unterminated_literal() {
        let err = Lexer::new("a = 'oops").tokenize().unwrap_err();
        assert_eq!(
            err,
            XPathError::Syntax {
                message: "Unterminated string literal".to_string(),
                position: 4
            }
        );
    }

    #[test]
    fn test_bang_without_eq() {
        assert!(Lexer::new("a ! b").tokenize().is_err());
    }
}
