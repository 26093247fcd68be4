use serde::{Deserialize, Serialize};

use crate::ingest::book_codes::BookInfo;

/// One verse of text extracted from a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedVerse {
    /// Internal book identifier (e.g. "genesis").
    pub subdivision_slug: String,
    /// Display name (e.g. "Genesis").
    pub subdivision_name: String,
    /// Three-character source code (e.g. "GEN").
    pub canonical_code: String,
    pub chapter: u32,
    pub verse: u32,
    /// Text as found in the source, before cleaning.
    pub raw_text: String,
    /// Normalized text with markers/tags removed and whitespace collapsed.
    pub clean_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub footnotes: Vec<String>,
}

impl ParsedVerse {
    #[must_use]
    pub fn new(
        book: &BookInfo,
        chapter: u32,
        verse: u32,
        raw_text: String,
        clean_text: String,
    ) -> Self {
        Self {
            subdivision_slug: book.slug.to_string(),
            subdivision_name: book.name.to_string(),
            canonical_code: book.code.to_string(),
            chapter,
            verse,
            raw_text,
            clean_text,
            footnotes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_footnotes(mut self, footnotes: Vec<String>) -> Self {
        self.footnotes = footnotes;
        self
    }

    /// Short reference such as "Genesis 1:3".
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{} {}:{}", self.subdivision_name, self.chapter, self.verse)
    }
}

/// Whether a result describes one document or an aggregated directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseScope {
    #[default]
    Document,
    Batch,
}

/// Output of parsing one document or one directory of documents.
///
/// Parse entry points never fail: problems are reported as strings in
/// `errors`. An empty `verses` list always means nothing usable was
/// extracted, whether or not `errors` is also empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub verses: Vec<ParsedVerse>,
    /// Documents that produced at least one verse.
    pub subdivisions_parsed: usize,
    pub errors: Vec<String>,
    #[serde(default)]
    pub scope: ParseScope,
}

impl ParseResult {
    /// Empty result for a single document.
    #[must_use]
    pub fn document() -> Self {
        Self::default()
    }

    /// Empty result for a directory-level aggregation.
    #[must_use]
    pub fn batch() -> Self {
        Self {
            scope: ParseScope::Batch,
            ..Self::default()
        }
    }

    /// Result carrying a single error and no verses.
    #[must_use]
    pub fn failed(error: impl ToString) -> Self {
        let mut result = Self::document();
        result.push_error(error);
        result
    }

    pub fn push_error(&mut self, error: impl ToString) {
        self.errors.push(error.to_string());
    }

    #[must_use]
    pub fn verse_count(&self) -> usize {
        self.verses.len()
    }

    /// A document succeeds only with verses and no errors; a batch only needs
    /// verses, per-file errors do not invalidate it.
    #[must_use]
    pub fn success(&self) -> bool {
        match self.scope {
            ParseScope::Document => !self.verses.is_empty() && self.errors.is_empty(),
            ParseScope::Batch => !self.verses.is_empty(),
        }
    }

    /// Append another result's verses, counts and errors.
    pub fn absorb(&mut self, other: ParseResult) {
        self.verses.extend(other.verses);
        self.subdivisions_parsed += other.subdivisions_parsed;
        self.errors.extend(other.errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::book_codes;

    fn verse(n: u32) -> ParsedVerse {
        let book = book_codes::lookup("GEN").unwrap();
        ParsedVerse::new(book, 1, n, format!("raw {n}"), format!("clean {n}"))
    }

    #[test]
    fn parsed_verse_carries_book_identity() {
        let v = verse(3);
        assert_eq!(v.subdivision_slug, "genesis");
        assert_eq!(v.subdivision_name, "Genesis");
        assert_eq!(v.canonical_code, "GEN");
        assert!(v.footnotes.is_empty());
        assert_eq!(v.reference(), "Genesis 1:3");
    }

    #[test]
    fn document_success_requires_no_errors() {
        let mut result = ParseResult::document();
        assert!(!result.success());
        result.verses.push(verse(1));
        assert!(result.success());
        result.push_error("something odd");
        assert!(!result.success());
    }

    #[test]
    fn batch_success_tolerates_errors() {
        let mut result = ParseResult::batch();
        result.push_error("one bad file");
        assert!(!result.success());
        result.verses.push(verse(1));
        assert!(result.success());
    }

    #[test]
    fn absorb_concatenates_in_order() {
        let mut total = ParseResult::batch();
        let mut first = ParseResult::document();
        first.verses.push(verse(1));
        first.subdivisions_parsed = 1;
        let mut second = ParseResult::failed("broken");
        second.verses.push(verse(2));

        total.absorb(first);
        total.absorb(second);

        assert_eq!(total.verse_count(), 2);
        assert_eq!(total.verses[0].verse, 1);
        assert_eq!(total.verses[1].verse, 2);
        assert_eq!(total.subdivisions_parsed, 1);
        assert_eq!(total.errors, vec!["broken".to_string()]);
        assert_eq!(total.scope, ParseScope::Batch);
    }

    #[test]
    fn empty_footnotes_are_not_serialized() {
        let json = serde_json::to_string(&verse(1)).unwrap();
        assert!(!json.contains("footnotes"));
        let with = verse(1).with_footnotes(vec!["note".into()]);
        let json = serde_json::to_string(&with).unwrap();
        assert!(json.contains("\"footnotes\":[\"note\"]"));
    }
}
