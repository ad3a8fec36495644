//! XPath Parser
//!
//! Recursive descent parser for the XPath 1.0 subset used to address
//! descriptors: location paths over the element axes, predicates,
//! comparisons, boolean connectives, unions and core string functions.
//! Arithmetic and variables are not part of the grammar.

use super::lexer::{Lexer, Token};
use crate::error::XPathError;

/// XPath expression AST node
#[derive(Debug, Clone)]
pub enum Expr {
    /// Root path (/)
    Root,
    /// Location step relative to the context node
    Step(Box<Step>),
    /// Path expression (expr/step)
    Path(Box<Expr>, Box<Step>),
    /// Filter expression with predicate
    Filter(Box<Expr>, Box<Expr>),
    /// Union of two expressions (|)
    Union(Box<Expr>, Box<Expr>),
    /// Binary operation
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// Function call
    Function(String, Vec<Expr>),
    /// Literal number
    Number(f64),
    /// Literal string
    Literal(String),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// Location step in a path
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn new(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    FollowingSibling,
    PrecedingSibling,
    Self_,
    Attribute,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            _ => None,
        }
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// Matches any node of the axis' principal type (*)
    Any,
    /// Unprefixed name; matches only names in no namespace
    Name(String),
    /// prefix:local, resolved against the query context
    QName(String, String),
    /// prefix:*
    PrefixWildcard(String),
    /// node() - matches any node
    Node,
    /// text() - matches text and CDATA nodes
    Text,
    /// comment() - matches comments
    Comment,
}

/// XPath parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    /// Offset where `current` ended, for error reporting
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser
    pub fn new(input: &'a str) -> Result<Self, XPathError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        let position = lexer.position();
        Ok(Parser {
            lexer,
            current,
            position,
        })
    }

    /// Parse a complete XPath expression
    pub fn parse(&mut self) -> Result<Expr, XPathError> {
        let expr = self.parse_or_expr()?;
        if self.current != Token::Eof {
            return Err(self.error(format!("Unexpected {:?}", self.current)));
        }
        Ok(expr)
    }

    fn advance(&mut self) -> Result<(), XPathError> {
        self.current = self.lexer.next_token()?;
        self.position = self.lexer.position();
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> XPathError {
        XPathError::Syntax {
            message: message.into(),
            position: self.position,
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), XPathError> {
        if self.current != token {
            return Err(self.error(format!("Expected {:?}, found {:?}", token, self.current)));
        }
        self.advance()
    }

    /// Parse or expression
    fn parse_or_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_and_expr()?;

        while self.current == Token::Or {
            self.advance()?;
            let right = self.parse_and_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }

        Ok(left)
    }

    /// Parse and expression
    fn parse_and_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_equality_expr()?;

        while self.current == Token::And {
            self.advance()?;
            let right = self.parse_equality_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }

        Ok(left)
    }

    /// Parse equality expression
    fn parse_equality_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_relational_expr()?;

        loop {
            let op = match &self.current {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    /// Parse relational expression
    fn parse_relational_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_union_expr()?;

        loop {
            let op = match &self.current {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_union_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    /// Parse union expression
    fn parse_union_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_path_expr()?;

        while self.current == Token::Pipe {
            self.advance()?;
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// Does the current token begin a location step?
    fn at_step_start(&self) -> bool {
        matches!(
            self.current,
            Token::Name(_)
                | Token::QName(..)
                | Token::PrefixWildcard(_)
                | Token::Star
                | Token::NodeType(_)
                | Token::Axis(_)
                | Token::At
                | Token::Dot
                | Token::DoubleDot
        )
    }

    /// Parse path expression
    fn parse_path_expr(&mut self) -> Result<Expr, XPathError> {
        let expr = match &self.current {
            Token::Slash => {
                self.advance()?;
                if !self.at_step_start() {
                    return Ok(Expr::Root);
                }
                let step = self.parse_step()?;
                Expr::Path(Box::new(Expr::Root), Box::new(step))
            }
            Token::DoubleSlash => {
                self.advance()?;
                let step = self.parse_step()?;
                Expr::Path(Box::new(descendant_or_self(Expr::Root)), Box::new(step))
            }
            _ if self.at_step_start() => Expr::Step(Box::new(self.parse_step()?)),
            _ => self.parse_filter_expr()?,
        };

        self.parse_relative_path(expr)
    }

    /// Continue a path with `/step` and `//step` segments
    fn parse_relative_path(&mut self, mut expr: Expr) -> Result<Expr, XPathError> {
        loop {
            match &self.current {
                Token::Slash => {
                    self.advance()?;
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    self.advance()?;
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(descendant_or_self(expr)), Box::new(step));
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Parse filter expression: a primary expression with optional predicates
    fn parse_filter_expr(&mut self) -> Result<Expr, XPathError> {
        let mut expr = self.parse_primary_expr()?;

        while self.current == Token::LeftBracket {
            let pred = self.parse_predicate()?;
            expr = Expr::Filter(Box::new(expr), Box::new(pred));
        }

        Ok(expr)
    }

    fn parse_predicate(&mut self) -> Result<Expr, XPathError> {
        self.expect(Token::LeftBracket)?;
        let pred = self.parse_or_expr()?;
        self.expect(Token::RightBracket)?;
        Ok(pred)
    }

    /// Parse primary expression
    fn parse_primary_expr(&mut self) -> Result<Expr, XPathError> {
        match std::mem::replace(&mut self.current, Token::Eof) {
            Token::LeftParen => {
                self.advance()?;
                let expr = self.parse_or_expr()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::Literal(s) => {
                self.advance()?;
                Ok(Expr::Literal(s))
            }
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::FunctionName(name) => {
                self.advance()?;
                self.parse_function_call(name)
            }
            other => {
                self.current = other;
                Err(self.error(format!("Unexpected {:?}", self.current)))
            }
        }
    }

    /// Parse function call arguments; the name has been consumed
    fn parse_function_call(&mut self, name: String) -> Result<Expr, XPathError> {
        self.expect(Token::LeftParen)?;

        let mut args = Vec::new();
        if self.current != Token::RightParen {
            args.push(self.parse_or_expr()?);
            while self.current == Token::Comma {
                self.advance()?;
                args.push(self.parse_or_expr()?);
            }
        }

        self.expect(Token::RightParen)?;
        Ok(Expr::Function(name, args))
    }

    /// Parse a location step
    fn parse_step(&mut self) -> Result<Step, XPathError> {
        match &self.current {
            Token::Dot => {
                self.advance()?;
                return Ok(Step::new(Axis::Self_, NodeTest::Node));
            }
            Token::DoubleDot => {
                self.advance()?;
                return Ok(Step::new(Axis::Parent, NodeTest::Node));
            }
            _ => {}
        }

        let axis = match &self.current {
            Token::At => {
                self.advance()?;
                Axis::Attribute
            }
            Token::Axis(name) => {
                let axis = Axis::from_name(name)
                    .ok_or_else(|| self.error(format!("Unsupported axis '{}'", name)))?;
                self.advance()?;
                self.expect(Token::DoubleColon)?;
                axis
            }
            _ => Axis::Child,
        };

        let node_test = self.parse_node_test()?;
        let mut step = Step::new(axis, node_test);

        while self.current == Token::LeftBracket {
            step.predicates.push(self.parse_predicate()?);
        }

        Ok(step)
    }

    /// Parse node test
    fn parse_node_test(&mut self) -> Result<NodeTest, XPathError> {
        let test = match std::mem::replace(&mut self.current, Token::Eof) {
            Token::Star => NodeTest::Any,
            Token::Name(name) => NodeTest::Name(name),
            Token::QName(prefix, local) => NodeTest::QName(prefix, local),
            Token::PrefixWildcard(prefix) => NodeTest::PrefixWildcard(prefix),
            Token::NodeType(kind) => {
                self.advance()?;
                self.expect(Token::LeftParen)?;
                if self.current != Token::RightParen {
                    return Err(self.error("Node type tests take no arguments"));
                }
                match kind.as_str() {
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => NodeTest::Node,
                }
            }
            other => {
                self.current = other;
                return Err(self.error(format!("Expected node test, found {:?}", self.current)));
            }
        };
        self.advance()?;
        Ok(test)
    }
}

/// `expr/descendant-or-self::node()`, the expansion of `//`
fn descendant_or_self(expr: Expr) -> Expr {
    Expr::Path(
        Box::new(expr),
        Box::new(Step::new(Axis::DescendantOrSelf, NodeTest::Node)),
    )
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> Result<Expr, XPathError> {
    Parser::new(input)?.parse()
}
