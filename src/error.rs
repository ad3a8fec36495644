//! Error types shared across the crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Descriptor is not well-formed XML
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct XmlError {
    pub message: String,
    /// 1-based
    pub line: usize,
    /// 1-based, counted in bytes
    pub column: usize,
}

impl XmlError {
    /// Build an error from a byte offset into `input`
    pub fn at(message: impl Into<String>, input: &[u8], position: usize) -> Self {
        let before = &input[..position.min(input.len())];
        let line = memchr::memchr_iter(b'\n', before).count() + 1;
        let column = match memchr::memrchr(b'\n', before) {
            Some(nl) => before.len() - nl,
            None => before.len() + 1,
        };
        XmlError {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Malformed or unsupported XPath expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XPathError {
    #[error("XPath syntax error at offset {position}: {message}")]
    Syntax { message: String, position: usize },
    #[error("unbound namespace prefix '{0}'")]
    UnboundPrefix(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },
    #[error("{0}")]
    Type(String),
}

/// Staging an application failed
#[derive(Debug, Error)]
pub enum StageError {
    #[error("no deployment descriptor at {0}")]
    MissingDescriptor(PathBuf),
    #[error("auto-reconfiguration library not found at {0}")]
    MissingLibrary(PathBuf),
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: XmlError,
    },
    #[error("descriptor root element is <{0}>, expected <web-app>")]
    NotAWebApp(String),
    #[error("descriptor query failed: {0}")]
    Query(#[from] XPathError),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid staging configuration: {0}")]
    Config(String),
}

impl StageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StageError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_and_column() {
        let input = b"<web-app>\n  <servlet>\n  </web-app>";
        let err = XmlError::at("Tag mismatch", input, 24);
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 3);
        assert_eq!(err.to_string(), "Tag mismatch (line 3, column 3)");
    }

    #[test]
    fn test_first_line() {
        let err = XmlError::at("Unexpected end of input", b"<a", 0);
        assert_eq!((err.line, err.column), (1, 1));
    }
}
