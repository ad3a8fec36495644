//! String Interning Pool
//!
//! Deduplicated storage for element names, prefixes, namespace URIs and
//! the text held by text, comment and attribute nodes.
//!
//! All strings live in one growable buffer. Entries are `(offset, len)`
//! pairs into it, looked up through a content hash so repeated names such
//! as `param-name` or `servlet` are stored once. Rewriting a text node
//! interns the new value; the old one stays in the buffer until the
//! document is dropped.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// String interning pool
///
/// ID 0 is reserved for the empty string.
#[derive(Debug)]
pub struct StringPool {
    /// (offset, len) into `data`, indexed by string ID
    entries: Vec<(u32, u32)>,
    /// Backing storage for every interned string
    data: String,
    /// Hash of string content -> list of IDs with that hash
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    /// Create a new empty string pool
    pub fn new() -> Self {
        let mut pool = StringPool {
            entries: Vec::with_capacity(256),
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        };
        pool.entries.push((0, 0));
        pool
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning its ID
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);

        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get_str(id) == s {
                    return id;
                }
            }
        }

        let offset = self.data.len() as u32;
        self.data.push_str(s);

        let id = self.entries.len() as u32;
        self.entries.push((offset, s.len() as u32));
        self.hash_index.entry(hash).or_default().push(id);

        id
    }

    /// Intern raw parser bytes, which are UTF-8 once the encoding layer has run
    pub fn intern_bytes(&mut self, s: &[u8]) -> u32 {
        self.intern(&String::from_utf8_lossy(s))
    }

    /// Look up an existing string without interning it
    pub fn find(&self, s: &str) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        self.hash_index
            .get(&Self::compute_hash(s))?
            .iter()
            .copied()
            .find(|&id| self.get_str(id) == s)
    }

    /// Get a string by ID; unknown IDs read as empty
    #[inline]
    pub fn get_str(&self, id: u32) -> &str {
        match self.entries.get(id as usize) {
            Some(&(offset, len)) => &self.data[offset as usize..(offset + len) as usize],
            None => "",
        }
    }

    /// Get the number of unique strings stored, the reserved entry included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pool holds nothing but the reserved empty string
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern() {
        let mut pool = StringPool::new();
        let id = pool.intern("servlet-name");
        assert!(id > 0);
        assert_eq!(pool.get_str(id), "servlet-name");
    }

    #[test]
    fn test_intern_duplicate() {
        let mut pool = StringPool::new();
        let id1 = pool.intern("param-name");
        let id2 = pool.intern("param-name");
        assert_eq!(id1, id2);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_intern_different() {
        let mut pool = StringPool::new();
        let id1 = pool.intern("param-name");
        let id2 = pool.intern("param-value");
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_empty_string() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern(""), 0);
        assert_eq!(pool.get_str(0), "");
        assert!(pool.is_empty());
    }

    #[test]
    fn test_find() {
        let mut pool = StringPool::new();
        let id = pool.intern("web-app");
        assert_eq!(pool.find("web-app"), Some(id));
        assert_eq!(pool.find("servlet"), None);
    }

    #[test]
    fn test_unknown_id() {
        let pool = StringPool::new();
        assert_eq!(pool.get_str(42), "");
    }
}
