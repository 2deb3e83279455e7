//! Line matching over fetched documents

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

/// A compiled, case-insensitive pattern applied line by line
#[derive(Clone, Debug)]
pub struct LineMatcher {
    pattern: Regex,
}

impl LineMatcher {
    /// Compile `query` as a case-insensitive regular expression.
    ///
    /// Returns [`Error::InvalidQuery`] when the pattern does not compile.
    pub fn new(query: &str) -> Result<Self> {
        let pattern = RegexBuilder::new(query)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidQuery(e.to_string()))?;
        Ok(Self { pattern })
    }

    /// The pattern as written by the caller
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Number of `\n`-separated lines of `text` that match
    pub fn count_in(&self, text: &str) -> u64 {
        text.split('\n')
            .filter(|line| self.pattern.is_match(line))
            .count() as u64
    }

    /// Total matching lines across all documents
    pub fn count_all(&self, documents: &[String]) -> u64 {
        documents.iter().map(|doc| self.count_in(doc)).sum()
    }
}
