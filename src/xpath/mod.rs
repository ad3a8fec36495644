//! XPath 1.0 Engine
//!
//! The subset used to address deployment descriptors:
//! - Location paths over the element axes, plus `@` attribute values
//! - Predicates, comparisons, `and`/`or`, unions
//! - Core node-set, string and boolean functions
//! - Namespace-aware name tests through [`QueryContext`](crate::dom::QueryContext)
//! - Compiled expression caching

pub mod axes;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use eval::{evaluate, evaluate_string, select_first, select_nodes};
pub use value::XPathValue;

use compiler::CompiledExpr;
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

use crate::error::XPathError;

const CACHE_CAPACITY: usize = 64;

thread_local! {
    static COMPILED: RefCell<LruCache<String, Rc<CompiledExpr>>> = RefCell::new(LruCache::new(
        NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
    ));
}

/// Compile an expression, reusing a cached compilation when there is one
///
/// The cache is per thread; staging several applications in parallel
/// never contends on it.
pub fn compiled(xpath: &str) -> Result<Rc<CompiledExpr>, XPathError> {
    if let Some(hit) = COMPILED.with(|cache| cache.borrow_mut().get(xpath).cloned()) {
        return Ok(hit);
    }

    let expr = Rc::new(compiler::compile(xpath)?);
    COMPILED.with(|cache| cache.borrow_mut().put(xpath.to_string(), Rc::clone(&expr)));
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_returns_same_compilation() {
        let first = compiled("/web-app/servlet").unwrap();
        let second = compiled("/web-app/servlet").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_errors_are_not_cached() {
        assert!(compiled("/web-app[").is_err());
        assert!(compiled("/web-app[").is_err());
    }
}
