//! Insertion-ordered, deduplicated citation list

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Source identifiers backing an answer.
///
/// Keeps first-seen order so rendered output is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Citations {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl Citations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a source id; returns false if it was already present
    pub fn insert(&mut self, source: impl Into<String>) -> bool {
        let source = source.into();
        if self.seen.contains(&source) {
            return false;
        }
        self.seen.insert(source.clone());
        self.order.push(source);
        true
    }

    /// Union another set into this one, keeping this set's order first
    pub fn extend_from(&mut self, other: &Citations) {
        for source in other.iter() {
            self.insert(source.as_str());
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, source: &str) -> bool {
        self.seen.contains(source)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

impl From<Vec<String>> for Citations {
    fn from(sources: Vec<String>) -> Self {
        sources.into_iter().collect()
    }
}

impl From<Citations> for Vec<String> {
    fn from(citations: Citations) -> Self {
        citations.order
    }
}

impl<S: Into<String>> FromIterator<S> for Citations {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut citations = Citations::new();
        for source in iter {
            citations.insert(source);
        }
        citations
    }
}

impl<'a> IntoIterator for &'a Citations {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_deduplicates() {
        let mut citations = Citations::new();
        assert!(citations.insert("a.pdf"));
        assert!(citations.insert("b.pdf"));
        assert!(!citations.insert("a.pdf"));
        assert_eq!(citations.as_slice(), &["a.pdf".to_string(), "b.pdf".to_string()]);
    }

    #[test]
    fn test_extend_keeps_first_seen_order() {
        let mut left: Citations = vec!["b", "a"].into_iter().collect();
        let right: Citations = vec!["c", "a", "d"].into_iter().collect();
        left.extend_from(&right);
        assert_eq!(left.as_slice(), &["b", "a", "c", "d"]);
    }

    #[test]
    fn test_serde_as_plain_list() {
        let citations: Citations = vec!["x", "y", "x"].into_iter().collect();
        let json = serde_json::to_string(&citations).unwrap();
        assert_eq!(json, r#"["x","y"]"#);

        let back: Citations = serde_json::from_str(r#"["p","p","q"]"#).unwrap();
        assert_eq!(back.len(), 2);
        assert!(back.contains("q"));
    }
}
