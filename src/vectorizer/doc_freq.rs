use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// keep document count and per-term document counts
///
/// "document" is whatever unit the caller adds, a corpus document or a
/// group row of the group-term matrix
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocFrequency {
    /// number of documents added
    doc_num: u64,
    /// number of documents containing each term
    term_docs: AHashMap<String, u64>,
}

impl DocFrequency {
    /// Create a new instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document's terms.
    /// Duplicate terms inside one document are counted once.
    pub fn add_set<I, T>(&mut self, terms: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.doc_num += 1;
        let terms: Vec<T> = terms.into_iter().collect();
        let unique: AHashSet<&str> = terms.iter().map(|t| t.as_ref()).collect();
        for term in unique {
            if let Some(count) = self.term_docs.get_mut(term) {
                *count += 1;
            } else {
                self.term_docs.insert(term.to_string(), 1);
            }
        }
    }

    /// Get the number of documents
    #[inline]
    pub fn doc_num(&self) -> u64 {
        self.doc_num
    }

    /// Get the number of documents containing `term`
    #[inline]
    pub fn term_doc_count(&self, term: &str) -> u64 {
        self.term_docs.get(term).copied().unwrap_or(0)
    }

    /// Get the current vocabulary size (number of unique terms)
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.term_docs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.term_docs.iter().map(|(t, &c)| (t.as_str(), c))
    }
}
