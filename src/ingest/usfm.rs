//! USFM parser.
//!
//! Each line is classified into a [`LineKind`] and fed to a small state
//! machine that tracks the current chapter and the verse being accumulated.
//! A verse may span several lines (paragraph and poetry markers); the joined
//! source is cleaned with [`strip_markers_checked`] when the verse is flushed.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::UsfmSettings;
use crate::error::{IngestError, Result};
use crate::ingest::book_codes::{self, BookInfo};
use crate::ingest::markers::strip_markers_checked;
use crate::ingest::{scanner, VerseSource};
use crate::models::verse::{ParseResult, ParsedVerse};

/// Paragraph, poetry and list markers whose trailing text continues a verse.
const CONTINUATION_MARKERS: &[&str] = &[
    "p", "m", "po", "pr", "cls", "pmo", "pm", "pmc", "pmr", "pi", "mi", "nb", "pc", "ph", "b",
    "q", "qr", "qc", "qm", "li", "lim", "lh", "lf",
];

/// Character markers that may open a line of verse text.
const INLINE_MARKERS: &[&str] = &[
    "w", "+w", "it", "+it", "bd", "+bd", "bdit", "sc", "+sc", "em", "no", "add", "+add", "nd",
    "+nd", "wj", "+wj", "qs", "qt", "tl", "k", "bk", "pn", "png", "ord", "sls", "sig", "rq",
    "f", "fe", "x", "fig", "ca", "va", "vp",
];

/// One classified source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    /// `\c N`
    Chapter(u32),
    /// `\v N text` (first number of a range such as `2-3`).
    Verse { number: u32, text: &'a str },
    /// Paragraph/poetry marker with its trailing text.
    Continuation(&'a str),
    /// Headings, titles, identification and anything else that is not verse
    /// text.
    Skip,
    /// Verse text without a leading paragraph marker.
    Plain(&'a str),
}

/// Split a line starting with `\` into the marker name and the rest.
fn split_marker(line: &str) -> Option<(&str, &str)> {
    let body = line.strip_prefix('\\')?;
    let end = body
        .char_indices()
        .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '+' || c == '-'))
        .map_or(body.len(), |(i, _)| i);
    if end == 0 {
        return None;
    }
    Some((&body[..end], &body[end..]))
}

/// Parse `N` or `N-M` at the start of `text`, returning `N` and the text
/// after the number.
fn leading_number(text: &str) -> Option<(u32, &str)> {
    let text = text.trim_start();
    let digits = text.len() - text.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let number = text[..digits].parse().ok()?;
    let mut rest = &text[digits..];
    if let Some(range) = rest.strip_prefix('-') {
        rest = range.trim_start_matches(|c: char| c.is_ascii_digit());
    }
    Some((number, rest))
}

/// Classify one trimmed source line.
#[must_use]
pub fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    let Some((name, rest)) = split_marker(line) else {
        return if line.starts_with('\\') {
            LineKind::Skip
        } else {
            LineKind::Plain(line)
        };
    };

    match name {
        "c" => match leading_number(rest) {
            Some((n, _)) if rest.starts_with(char::is_whitespace) => LineKind::Chapter(n),
            _ => LineKind::Skip,
        },
        "v" => match leading_number(rest) {
            Some((number, text)) if rest.starts_with(char::is_whitespace) => LineKind::Verse {
                number,
                text: text.trim(),
            },
            _ => LineKind::Skip,
        },
        _ => {
            let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
            if CONTINUATION_MARKERS.contains(&base) {
                LineKind::Continuation(rest.trim())
            } else if INLINE_MARKERS.contains(&base) {
                LineKind::Plain(line)
            } else {
                LineKind::Skip
            }
        }
    }
}

/// Split a physical line before every inline `\v N`, so `\p \v 1 a \v 2 b`
/// yields `\p`, `\v 1 a`, `\v 2 b`.
fn logical_lines(line: &str) -> Vec<&str> {
    let mut starts = Vec::new();
    let mut search = line.chars().next().map_or(0, char::len_utf8);
    while let Some(offset) = line.get(search..).and_then(|s| s.find("\\v")) {
        let at = search + offset;
        let after = &line[at + 2..];
        let spaced = after.starts_with(|c: char| c.is_whitespace());
        if spaced && after.trim_start().starts_with(|c: char| c.is_ascii_digit()) {
            starts.push(at);
        }
        search = at + 2;
    }

    let mut parts = Vec::with_capacity(starts.len() + 1);
    let mut prev = 0;
    for start in starts {
        parts.push(&line[prev..start]);
        prev = start;
    }
    parts.push(&line[prev..]);
    parts
}

/// Extract the book code from the first `\id` line, uppercased.
#[must_use]
pub fn extract_book_id(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix("\\id")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let code: String = rest
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        (!code.is_empty()).then(|| code.to_uppercase())
    })
}

/// Chapter/verse state while walking a book's lines.
struct VerseAccumulator<'b> {
    book: &'b BookInfo,
    chapter: u32,
    pending_verse: Option<u32>,
    pending_parts: Vec<String>,
    verses: Vec<ParsedVerse>,
}

impl<'b> VerseAccumulator<'b> {
    fn new(book: &'b BookInfo) -> Self {
        Self {
            book,
            chapter: 0,
            pending_verse: None,
            pending_parts: Vec::new(),
            verses: Vec::new(),
        }
    }

    fn feed(&mut self, kind: LineKind<'_>) {
        match kind {
            LineKind::Chapter(n) => {
                self.flush();
                self.chapter = n;
                tracing::debug!("{} chapter {n}", self.book.code);
            }
            LineKind::Verse { number, text } => {
                self.flush();
                self.pending_verse = Some(number);
                self.push_part(text);
            }
            LineKind::Continuation(text) | LineKind::Plain(text) => {
                if self.pending_verse.is_some() {
                    self.push_part(text);
                }
            }
            LineKind::Skip | LineKind::Blank => {}
        }
    }

    fn push_part(&mut self, text: &str) {
        if !text.is_empty() {
            self.pending_parts.push(text.to_string());
        }
    }

    /// Emit the pending verse if it has text, then reset.
    fn flush(&mut self) {
        let number = self.pending_verse.take();
        let parts = std::mem::take(&mut self.pending_parts);
        let Some(number) = number else { return };
        if parts.is_empty() {
            return;
        }
        if number == 0 || self.chapter == 0 {
            tracing::warn!(
                "{}: dropping verse {number} outside a chapter or numbered 0 (chapter {})",
                self.book.code,
                self.chapter
            );
            return;
        }

        let raw_text = parts.join(" ");
        let stripped = strip_markers_checked(&raw_text);
        if stripped.degraded {
            tracing::warn!(
                "{} {}:{number}: markers left in place",
                self.book.name,
                self.chapter
            );
        }
        self.verses.push(ParsedVerse::new(
            self.book,
            self.chapter,
            number,
            raw_text,
            stripped.text,
        ));
    }

    fn finish(mut self) -> Vec<ParsedVerse> {
        self.flush();
        self.verses
    }
}

/// Parser for USFM book files.
#[derive(Debug, Clone, Default)]
pub struct UsfmParser {
    settings: UsfmSettings,
}

impl UsfmParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(settings: UsfmSettings) -> Self {
        Self { settings }
    }

    /// Parse one in-memory USFM book.
    #[must_use]
    pub fn parse_document(&self, content: &str) -> ParseResult {
        self.parse_source(content, "<document>")
    }

    fn parse_source(&self, content: &str, origin: &str) -> ParseResult {
        match self.extract_verses(content, origin) {
            Ok(verses) => {
                let mut result = ParseResult::document();
                if !verses.is_empty() {
                    result.subdivisions_parsed = 1;
                }
                result.verses = verses;
                result
            }
            Err(e) => ParseResult::failed(e),
        }
    }

    fn extract_verses(&self, content: &str, origin: &str) -> Result<Vec<ParsedVerse>> {
        let code = extract_book_id(content).ok_or_else(|| IngestError::MissingIdMarker {
            path: origin.to_string(),
        })?;
        let book = book_codes::lookup(&code).ok_or_else(|| IngestError::UnknownBookCode {
            code: code.clone(),
            path: origin.to_string(),
        })?;

        tracing::info!("Parsing {} ({}) from {origin}", book.name, book.code);

        let mut acc = VerseAccumulator::new(book);
        for line in content.lines() {
            for logical in logical_lines(line.trim()) {
                acc.feed(classify_line(logical));
            }
        }
        let verses = acc.finish();

        tracing::info!("Parsed {} verses from {}", verses.len(), book.name);
        Ok(verses)
    }

    /// Parse a single USFM file.
    #[must_use]
    pub fn parse_file(&self, path: &Path) -> ParseResult {
        if !path.exists() {
            return ParseResult::failed(IngestError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        tracing::debug!("Parsing USFM file: {}", path.display());
        match std::fs::read_to_string(path) {
            Ok(content) => self.parse_source(&content, &path.display().to_string()),
            Err(e) => ParseResult::failed(IngestError::Read {
                path: path.display().to_string(),
                detail: e.to_string(),
            }),
        }
    }

    /// Parse every matching file in a directory. Without a pattern the
    /// configured candidates are tried in order.
    #[must_use]
    pub fn parse_directory(&self, dir: &Path, pattern: Option<&str>) -> ParseResult {
        let mut result = ParseResult::batch();
        if let Err(e) = scanner::ensure_dir(dir) {
            result.push_error(e);
            return result;
        }

        let found = match pattern {
            Some(p) => scanner::matching_files(dir, p).map(|files| (p.to_string(), files)),
            None => self.auto_detect(dir),
        };
        let (pattern, files) = match found {
            Ok(found) => found,
            Err(e) => {
                result.push_error(e);
                return result;
            }
        };
        if files.is_empty() {
            result.push_error(IngestError::NoFilesFound {
                format: "USFM".into(),
                dir: dir.display().to_string(),
                pattern,
            });
            return result;
        }

        tracing::info!("Found {} USFM files in {}", files.len(), dir.display());

        let per_file: Vec<ParseResult> = files.par_iter().map(|f| self.parse_file(f)).collect();
        for file_result in per_file {
            result.absorb(file_result);
        }

        tracing::info!(
            "Total: {} verses from {} books",
            result.verse_count(),
            result.subdivisions_parsed
        );
        result
    }

    fn auto_detect(&self, dir: &Path) -> Result<(String, Vec<PathBuf>)> {
        if let Some((pattern, files)) =
            scanner::first_matching(dir, &self.settings.candidate_patterns)?
        {
            tracing::info!("Auto-detected USFM pattern: {pattern}");
            return Ok((pattern, files));
        }
        let fallback = self
            .settings
            .candidate_patterns
            .first()
            .cloned()
            .unwrap_or_else(|| "*.usfm".to_string());
        Ok((fallback, Vec::new()))
    }

    /// Iterate over the verses of one file. Problems are logged and yield an
    /// empty iterator.
    pub fn iter_verses(&self, path: &Path) -> impl Iterator<Item = ParsedVerse> {
        let result = self.parse_file(path);
        for error in &result.errors {
            tracing::warn!("{error}");
        }
        result.verses.into_iter()
    }
}

impl VerseSource for UsfmParser {
    fn format(&self) -> &'static str {
        "usfm"
    }

    fn parse_file(&self, path: &Path) -> ParseResult {
        UsfmParser::parse_file(self, path)
    }

    fn parse_directory(&self, dir: &Path, pattern: Option<&str>) -> ParseResult {
        UsfmParser::parse_directory(self, dir, pattern)
    }

    fn detects(&self, dir: &Path) -> bool {
        matches!(
            scanner::first_matching(dir, &self.settings.candidate_patterns),
            Ok(Some(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GENESIS: &str = r#"\id GEN
\h Genesis
\toc1 Genesis
\mt1 Genesis
\c 1
\s1 The Creation of the World
\p
\v 1 \w In the beginning|strong="H7225"\w* \w God|strong="H0430"\w* \w created|strong="H1254"\w* \w the heavens|strong="H8064"\w* and the \w earth|strong="H0776"\w*.
\v 2 \w Now|strong="H1961"\w* the earth was \w without shape|strong="H8414"\w* and \w empty|strong="H0922"\w*.
\v 3 \w God|strong="H0430"\w* \w said|strong="H0559"\w*, "Let there be light." And there was light!
\c 2
\v 1 The heavens and the earth were completed.
\v 2 By the seventh day God finished the work.
"#;

    const MATTHEW: &str = r"\id MAT
\h Matthew
\c 1
\v 1 This is the record of the genealogy of Jesus Christ.
\v 2 Abraham was the father of Isaac.
\c 2
\v 1 After Jesus was born in Bethlehem.
";

    fn parser() -> UsfmParser {
        UsfmParser::new()
    }

    #[test]
    fn parses_chapters_and_verses() {
        let result = parser().parse_document(GENESIS);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.verse_count(), 5);
        assert_eq!(result.subdivisions_parsed, 1);
        assert!(result.success());

        let first = &result.verses[0];
        assert_eq!(first.subdivision_slug, "genesis");
        assert_eq!(first.subdivision_name, "Genesis");
        assert_eq!(first.canonical_code, "GEN");
        assert_eq!((first.chapter, first.verse), (1, 1));
        assert_eq!(
            first.clean_text,
            "In the beginning God created the heavens and the earth."
        );
        assert!(first.raw_text.contains("strong="));
        assert!(!first.clean_text.contains('\\'));

        let last = result.verses.last().unwrap();
        assert_eq!((last.chapter, last.verse), (2, 2));
    }

    #[test]
    fn three_verse_example() {
        let source = "\\id GEN\n\\c 1\n\\v 1 First.\n\\v 2 Second \\it verse\\it*.\n\\v 3 Third.\n";
        let result = parser().parse_document(source);
        assert_eq!(result.verse_count(), 3);
        assert_eq!(result.subdivisions_parsed, 1);
        assert!(result.errors.is_empty());
        assert_eq!(result.verses[1].clean_text, "Second verse.");
        let numbers: Vec<u32> = result.verses.iter().map(|v| v.verse).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn multi_line_verses_accumulate() {
        let source = "\\id PSA\n\\c 23\n\\q1\n\\v 1 The LORD is my shepherd;\n\\q2 I shall not want.\n\\s1 Heading inside\n\\v 2 He makes me lie down\nin green pastures.\n";
        let result = parser().parse_document(source);
        assert_eq!(result.verse_count(), 2);
        assert_eq!(
            result.verses[0].clean_text,
            "The LORD is my shepherd; I shall not want."
        );
        assert_eq!(
            result.verses[0].raw_text,
            "The LORD is my shepherd; I shall not want."
        );
        assert_eq!(
            result.verses[1].clean_text,
            "He makes me lie down in green pastures."
        );
    }

    #[test]
    fn headings_never_leak_into_verses() {
        let source = "\\id JHN\n\\c 1\n\\v 1 In the beginning was the Word.\n\\s1 The Witness of John\n\\r (Matt 3:1)\n\\p\n\\v 2 He was with God.\n";
        let result = parser().parse_document(source);
        assert_eq!(result.verses[0].clean_text, "In the beginning was the Word.");
        assert!(!result
            .verses
            .iter()
            .any(|v| v.clean_text.contains("Witness")));
    }

    #[test]
    fn verse_range_takes_first_number() {
        let source = "\\id GEN\n\\c 1\n\\v 2-3 Combined verses.\n";
        let result = parser().parse_document(source);
        assert_eq!(result.verses[0].verse, 2);
        assert_eq!(result.verses[0].clean_text, "Combined verses.");
    }

    #[test]
    fn inline_verse_markers_start_new_verses() {
        let source = "\\id MRK\n\\c 1\n\\p \\v 1 The beginning. \\v 2 As it is written.\n";
        let result = parser().parse_document(source);
        assert_eq!(result.verse_count(), 2);
        assert_eq!(result.verses[0].clean_text, "The beginning.");
        assert_eq!(result.verses[1].verse, 2);
        assert_eq!(result.verses[1].clean_text, "As it is written.");
    }

    #[test]
    fn verse_without_text_is_not_emitted() {
        let source = "\\id GEN\n\\c 1\n\\v 1\n\\v 2 Second.\n";
        let result = parser().parse_document(source);
        assert_eq!(result.verse_count(), 1);
        assert_eq!(result.verses[0].verse, 2);
    }

    #[test]
    fn verse_zero_and_pre_chapter_text_dropped() {
        let source = "\\id GEN\n\\v 1 Before any chapter.\n\\c 1\n\\v 0 Zero.\n\\v 1 One.\n";
        let result = parser().parse_document(source);
        assert_eq!(result.verse_count(), 1);
        assert_eq!((result.verses[0].chapter, result.verses[0].verse), (1, 1));
        assert!(result.verses.iter().all(|v| v.verse > 0));
    }

    #[test]
    fn missing_id_marker() {
        let result = parser().parse_document("\\c 1\n\\v 1 Text.\n");
        assert_eq!(result.verse_count(), 0);
        assert_eq!(result.subdivisions_parsed, 0);
        assert!(result.errors[0].contains("\\id"));
    }

    #[test]
    fn unknown_book_code() {
        let result = parser().parse_document("\\id XYZ\n\\c 1\n\\v 1 Text.\n");
        assert_eq!(result.verse_count(), 0);
        assert!(result.errors[0].contains("XYZ"));
    }

    #[test]
    fn lowercase_id_is_normalized() {
        let result = parser().parse_document("\\id mat Some Bible\n\\c 1\n\\v 1 Text.\n");
        assert_eq!(result.verses[0].canonical_code, "MAT");
    }

    #[test]
    fn no_verses_means_no_subdivision() {
        let result = parser().parse_document("\\id GEN\n\\h Genesis\n");
        assert_eq!(result.verse_count(), 0);
        assert_eq!(result.subdivisions_parsed, 0);
        assert!(result.errors.is_empty());
        assert!(!result.success());
    }

    #[test]
    fn classify_lines() {
        assert_eq!(classify_line(""), LineKind::Blank);
        assert_eq!(classify_line("\\c 12"), LineKind::Chapter(12));
        assert_eq!(
            classify_line("\\v 4 text here"),
            LineKind::Verse {
                number: 4,
                text: "text here"
            }
        );
        assert_eq!(classify_line("\\q1 poetry"), LineKind::Continuation("poetry"));
        assert_eq!(classify_line("\\pi2 indented"), LineKind::Continuation("indented"));
        assert_eq!(classify_line("\\s1 Heading"), LineKind::Skip);
        assert_eq!(classify_line("\\toc2 Gen"), LineKind::Skip);
        assert_eq!(classify_line("\\cl Psalm"), LineKind::Skip);
        assert_eq!(classify_line("\\va 3\\va*"), LineKind::Plain("\\va 3\\va*"));
        assert_eq!(classify_line("plain words"), LineKind::Plain("plain words"));
        assert_eq!(
            classify_line("\\w word|x\\w* more"),
            LineKind::Plain("\\w word|x\\w* more")
        );
    }

    #[test]
    fn split_inline_verses() {
        assert_eq!(
            logical_lines("\\p \\v 1 a \\v 2 b"),
            vec!["\\p ", "\\v 1 a ", "\\v 2 b"]
        );
        assert_eq!(logical_lines("\\v 1 only"), vec!["\\v 1 only"]);
        assert_eq!(logical_lines("\\q \\va 2\\va*"), vec!["\\q \\va 2\\va*"]);
    }

    #[test]
    fn book_id_extraction() {
        assert_eq!(extract_book_id("\\id GEN\n"), Some("GEN".into()));
        assert_eq!(extract_book_id("\\ide UTF-8\n\\id 1co x\n"), Some("1CO".into()));
        assert_eq!(extract_book_id("\\c 1\n"), None);
    }

    #[test]
    fn parse_file_not_found() {
        let result = parser().parse_file(Path::new("/nonexistent/path/file.usfm"));
        assert_eq!(result.verse_count(), 0);
        assert!(result.errors[0].to_lowercase().contains("not found"));
    }

    #[test]
    fn parse_directory_concatenates_in_name_order() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("40-MAT.usfm"), MATTHEW).unwrap();
        fs::write(tmp.path().join("01-GEN.usfm"), GENESIS).unwrap();

        let result = parser().parse_directory(tmp.path(), None);
        assert_eq!(result.subdivisions_parsed, 2);
        assert_eq!(result.verse_count(), 8);
        assert_eq!(result.verses[0].canonical_code, "GEN");
        assert_eq!(result.verses[5].canonical_code, "MAT");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn parse_directory_auto_detects_uppercase_extension() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("MAT.SFM"), MATTHEW).unwrap();
        let result = parser().parse_directory(tmp.path(), None);
        assert_eq!(result.verse_count(), 3);
    }

    #[test]
    fn parse_directory_keeps_going_after_bad_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.usfm"), "\\c 1\n\\v 1 No id.\n").unwrap();
        fs::write(tmp.path().join("b.usfm"), MATTHEW).unwrap();

        let result = parser().parse_directory(tmp.path(), Some("*.usfm"));
        assert_eq!(result.verse_count(), 3);
        assert_eq!(result.subdivisions_parsed, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.success());
    }

    #[test]
    fn parse_directory_without_matches_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("readme.txt"), "x").unwrap();
        let result = parser().parse_directory(tmp.path(), None);
        assert_eq!(result.verse_count(), 0);
        assert!(result.errors[0].contains("No USFM files found"));
        assert!(result.errors[0].contains("*.usfm"));
    }

    #[test]
    fn parse_directory_missing() {
        let result = parser().parse_directory(Path::new("/nonexistent/dir"), None);
        assert!(result.errors[0].to_lowercase().contains("not found"));
    }

    #[test]
    fn iter_verses_yields_parsed_verses() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mat.usfm");
        fs::write(&path, MATTHEW).unwrap();
        let refs: Vec<String> = parser().iter_verses(&path).map(|v| v.reference()).collect();
        assert_eq!(refs, vec!["Matthew 1:1", "Matthew 1:2", "Matthew 2:1"]);
        assert_eq!(
            parser().iter_verses(&tmp.path().join("missing.usfm")).count(),
            0
        );
    }
}
