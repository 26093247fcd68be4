use serde::Serialize;

use crate::ingest::book_codes::BookInfo;
use crate::ingest::markers::Stripped;
use crate::models::verse::{ParseResult, ParsedVerse};

/// Verses shown in a summary when no `--limit` is given.
pub const SUMMARY_VERSES: usize = 5;

/// Format a result as minified JSON.
pub fn format_json<T: Serialize>(result: &T) -> String {
    serde_json::to_string(result).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

/// Format a result as indented JSON.
pub fn format_json_pretty<T: Serialize>(result: &T) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

/// Format minified or pretty depending on the configured output format.
pub fn format_output<T: Serialize>(result: &T, pretty: bool) -> String {
    if pretty {
        format_json_pretty(result)
    } else {
        format_json(result)
    }
}

/// Format an error as JSON.
pub fn format_error(err: &dyn std::fmt::Display) -> String {
    serde_json::json!({ "error": err.to_string() }).to_string()
}

/// Condensed view of a parse: counts, errors and the first few verses.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub success: bool,
    pub verses: usize,
    pub subdivisions_parsed: usize,
    pub errors: Vec<String>,
    #[serde(rename = "first")]
    pub first_verses: Vec<VersePreview>,
}

/// One verse reference with truncated text.
#[derive(Debug, Serialize)]
pub struct VersePreview {
    #[serde(rename = "ref")]
    pub reference: String,
    pub text: String,
}

impl VersePreview {
    #[must_use]
    pub fn new(verse: &ParsedVerse, max_chars: usize) -> Self {
        Self {
            reference: verse.reference(),
            text: truncate_chars(&verse.clean_text, max_chars),
        }
    }
}

impl Summary {
    #[must_use]
    pub fn from_result(result: &ParseResult, shown: usize, preview_chars: usize) -> Self {
        Self {
            success: result.success(),
            verses: result.verse_count(),
            subdivisions_parsed: result.subdivisions_parsed,
            errors: result.errors.clone(),
            first_verses: result
                .verses
                .iter()
                .take(shown)
                .map(|v| VersePreview::new(v, preview_chars))
                .collect(),
        }
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut with "...".
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Keep at most `limit` verses in a result.
pub fn apply_limit(result: &mut ParseResult, limit: Option<usize>) {
    if let Some(limit) = limit {
        result.verses.truncate(limit);
    }
}

/// Output of `strip`.
#[derive(Debug, Serialize)]
pub struct StripOutput {
    pub text: String,
    pub degraded: bool,
}

impl From<Stripped> for StripOutput {
    fn from(s: Stripped) -> Self {
        Self {
            text: s.text,
            degraded: s.degraded,
        }
    }
}

/// Output of `books`.
#[derive(Debug, Serialize)]
pub struct BookList {
    pub count: usize,
    pub books: Vec<BookEntry>,
}

#[derive(Debug, Serialize)]
pub struct BookEntry {
    pub code: &'static str,
    pub slug: &'static str,
    pub name: &'static str,
}

impl From<&BookInfo> for BookEntry {
    fn from(b: &BookInfo) -> Self {
        Self {
            code: b.code,
            slug: b.slug,
            name: b.name,
        }
    }
}

impl BookList {
    #[must_use]
    pub fn new(books: &[BookInfo]) -> Self {
        Self {
            count: books.len(),
            books: books.iter().map(BookEntry::from).collect(),
        }
    }
}
