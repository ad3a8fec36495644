//! Ordered, delimiter-separated parameter values.

use std::fmt;

/// Separator written between entries a list gains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `", "`, used for initializer class lists
    Comma,
    /// `" "`, used for configuration location lists
    Space,
}

impl Delimiter {
    pub fn as_str(self) -> &'static str {
        match self {
            Delimiter::Comma => ", ",
            Delimiter::Space => " ",
        }
    }
}

/// A parameter value read as a list of entries
///
/// Entries are separated by `,`, `;` or XML whitespace; earlier entries
/// load first. The author's text is kept as written (minus surrounding
/// whitespace) and new entries are appended after it, so existing
/// separators and line breaks survive a rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueList {
    text: String,
    entries: Vec<String>,
    delimiter: Delimiter,
}

impl ValueList {
    /// Parse a parameter value
    pub fn parse(text: &str, delimiter: Delimiter) -> Self {
        let text = text.trim();
        let entries = text
            .split(|c: char| c == ',' || c == ';' || matches!(c, ' ' | '\t' | '\r' | '\n'))
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
        ValueList {
            text: text.to_string(),
            entries,
            delimiter,
        }
    }

    /// Build a list from entries, skipping duplicates
    pub fn from_entries<I, S>(entries: I, delimiter: Delimiter) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = ValueList::parse("", delimiter);
        for entry in entries {
            list.push(entry.as_ref());
        }
        list
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e == entry.trim())
    }

    /// Append an entry after the last existing one unless already present
    ///
    /// Returns whether the list changed.
    pub fn push(&mut self, entry: &str) -> bool {
        let entry = entry.trim();
        if entry.is_empty() || self.contains(entry) {
            return false;
        }
        if !self.text.is_empty() {
            self.text.push_str(self.delimiter.as_str());
        }
        self.text.push_str(entry);
        self.entries.push(entry.to_string());
        true
    }

    /// Append every entry of `other` this list lacks, keeping their order
    pub fn union(&mut self, other: &ValueList) -> bool {
        let mut changed = false;
        for entry in &other.entries {
            changed |= self.push(entry);
        }
        changed
    }

    /// The text to write back into the descriptor
    pub fn render(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for ValueList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_separators() {
        let list = ValueList::parse("\n  a.xml, b.xml;c.xml\n\td.xml  ", Delimiter::Space);
        assert_eq!(list.entries(), ["a.xml", "b.xml", "c.xml", "d.xml"]);
        assert_eq!(list.render(), "a.xml, b.xml;c.xml\n\td.xml");
    }

    #[test]
    fn test_push_with_comma() {
        let mut list = ValueList::parse("foo", Delimiter::Comma);
        assert!(list.push("bar"));
        assert_eq!(list.render(), "foo, bar");
    }

    #[test]
    fn test_push_is_idempotent() {
        let mut list = ValueList::parse("foo bar", Delimiter::Space);
        assert!(!list.push("foo"));
        assert!(!list.push(" bar "));
        assert_eq!(list.render(), "foo bar");
    }

    #[test]
    fn test_push_into_empty() {
        let mut list = ValueList::parse("   ", Delimiter::Space);
        assert!(list.is_empty());
        assert!(list.push("foo"));
        assert_eq!(list.to_string(), "foo");
    }

    #[test]
    fn test_from_entries_skips_duplicates() {
        let list = ValueList::from_entries(["a", "b", "a"], Delimiter::Space);
        assert_eq!(list.render(), "a b");
    }

    #[test]
    fn test_union_keeps_order() {
        let mut first = ValueList::parse("a, b", Delimiter::Comma);
        let second = ValueList::parse("b c d", Delimiter::Space);
        assert!(first.union(&second));
        assert_eq!(first.render(), "a, b, c, d");
    }
}
