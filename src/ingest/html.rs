//! HTML chapter parser.
//!
//! Reads chapter files named `{CODE}{CC}.htm` (e.g. `MAT01.htm`) laid out as:
//! - verse text inside `<div class="main">`,
//! - each verse introduced by `<span class="verse" id="V{n}">n&#160;</span>`,
//!   with `V0` used for the chapter label,
//! - footnotes in a trailing `<div class="footnote">` of `<p class="f">`
//!   entries, each linking back to its verse with
//!   `<a class="notebackref" href="#V{n}">` and holding its text in
//!   `<span class="ft">`.
//!
//! The document is parsed with tree-sitter-html. Verse text is collected in a
//! single walk over the main container; footnotes in one walk over the
//! footnote container.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rayon::prelude::*;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::config::HtmlSettings;
use crate::error::{IngestError, Result};
use crate::ingest::book_codes::{self, BookInfo};
use crate::ingest::{scanner, VerseSource};
use crate::models::verse::{ParseResult, ParsedVerse};

/// Split a chapter file name into its book code and chapter.
///
/// Accepts 3 alphanumeric characters naming a known book, exactly 2 digits,
/// and one of `extensions` (all case-insensitive). Chapter `00` is the
/// introduction and yields `None`.
#[must_use]
pub fn book_chapter_from_filename(filename: &str, extensions: &[String]) -> Option<(String, u32)> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if !extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
        return None;
    }
    if stem.len() != 5 || !stem.is_ascii() {
        return None;
    }
    let (code, chapter) = stem.split_at(3);
    if !code.chars().all(|c| c.is_ascii_alphanumeric())
        || !chapter.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let code = code.to_ascii_uppercase();
    let chapter: u32 = chapter.parse().ok()?;
    (book_codes::is_valid_code(&code) && chapter > 0).then_some((code, chapter))
}

/// [`book_chapter_from_filename`] with the default extensions.
#[must_use]
pub fn extract_book_chapter_from_filename(filename: &str) -> Option<(String, u32)> {
    book_chapter_from_filename(filename, &HtmlSettings::default().extensions)
}

/// Replace non-breaking spaces, collapse whitespace runs and trim.
#[must_use]
pub fn clean_html_text(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Node helpers ────────────────────────────────────────────────

fn start_tag(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() != "element" {
        return None;
    }
    let tag = node.named_child(0)?;
    matches!(tag.kind(), "start_tag" | "self_closing_tag").then_some(tag)
}

fn is_tag(node: Node<'_>, source: &[u8], name: &str) -> bool {
    start_tag(node)
        .and_then(|tag| tag.named_child(0))
        .filter(|n| n.kind() == "tag_name")
        .and_then(|n| n.utf8_text(source).ok())
        .is_some_and(|t| t.eq_ignore_ascii_case(name))
}

fn attribute(node: Node<'_>, source: &[u8], name: &str) -> Option<String> {
    let tag = start_tag(node)?;
    for i in 0..tag.named_child_count() {
        let Some(attr) = tag.named_child(i as u32) else {
            continue;
        };
        if attr.kind() != "attribute" {
            continue;
        }
        let Some(attr_name) = attr.named_child(0) else {
            continue;
        };
        if !attr_name
            .utf8_text(source)
            .is_ok_and(|n| n.eq_ignore_ascii_case(name))
        {
            continue;
        }
        let value = attr
            .named_child(1)
            .and_then(|v| v.utf8_text(source).ok())
            .unwrap_or("");
        let value = value.trim_matches('"').trim_matches('\'');
        return Some(html_escape::decode_html_entities(value).into_owned());
    }
    None
}

fn has_class(node: Node<'_>, source: &[u8], tag: &str, class: &str) -> bool {
    is_tag(node, source, tag)
        && attribute(node, source, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

/// Visit `root` and its descendants in document order until `visit` returns
/// false.
fn walk_preorder<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>) -> bool) {
    let mut cursor = root.walk();
    let mut depth = 0usize;
    loop {
        if !visit(cursor.node()) {
            return;
        }
        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        loop {
            if depth == 0 {
                return;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            cursor.goto_parent();
            depth -= 1;
        }
    }
}

/// First element in `root` (inclusive) satisfying `pred`.
fn find_element<'t>(root: Node<'t>, mut pred: impl FnMut(Node<'t>) -> bool) -> Option<Node<'t>> {
    let mut found = None;
    walk_preorder(root, |node| {
        if pred(node) {
            found = Some(node);
            return false;
        }
        true
    });
    found
}

/// Text fragments in document order. Fragments that touch in the source
/// (`a&amp;b`) are kept together; the rest are joined with one space.
#[derive(Default)]
struct TextRun {
    fragments: Vec<String>,
    last_end: Option<usize>,
}

impl TextRun {
    /// Add a `text` or `entity` node.
    fn push(&mut self, node: Node<'_>, source: &[u8]) {
        let Ok(text) = node.utf8_text(source) else {
            return;
        };
        let decoded = html_escape::decode_html_entities(text);
        match self.fragments.last_mut() {
            Some(last) if self.last_end == Some(node.start_byte()) => last.push_str(&decoded),
            _ => self.fragments.push(decoded.into_owned()),
        }
        self.last_end = Some(node.end_byte());
    }

    fn join(self) -> String {
        self.fragments
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn is_text(node: Node<'_>) -> bool {
    matches!(node.kind(), "text" | "entity")
}

/// Text of an element with tags removed and entities decoded, keeping the
/// spacing of the source: two text nodes are separated by a space only when
/// the markup between them has whitespace outside its tags.
fn inner_text(element: Node<'_>, source: &[u8]) -> String {
    let mut out = String::new();
    let mut last_end: Option<usize> = None;
    walk_preorder(element, |node| {
        if !is_text(node) {
            return true;
        }
        let Ok(text) = node.utf8_text(source) else {
            return true;
        };
        let spaced = last_end
            .and_then(|end| source.get(end..node.start_byte()))
            .is_some_and(gap_has_space);
        if spaced {
            out.push(' ');
        }
        out.push_str(&html_escape::decode_html_entities(text));
        last_end = Some(node.end_byte());
        true
    });
    out
}

/// Whitespace outside `<...>` in the bytes between two text nodes.
fn gap_has_space(gap: &[u8]) -> bool {
    let mut in_tag = false;
    gap.iter().any(|&b| {
        match b {
            b'<' => in_tag = true,
            b'>' => in_tag = false,
            _ => return !in_tag && b.is_ascii_whitespace(),
        }
        false
    })
}

// ── Verse collection ────────────────────────────────────────────

/// Accumulator for the walk over the main container.
struct VerseCollector<'s> {
    source: &'s [u8],
    settings: &'s HtmlSettings,
    /// Verse receiving text; `None` after an unparseable id.
    current: Option<u32>,
    buffer: TextRun,
    verses: BTreeMap<u32, String>,
}

impl<'s> VerseCollector<'s> {
    fn new(source: &'s [u8], settings: &'s HtmlSettings) -> Self {
        Self {
            source,
            settings,
            current: None,
            buffer: TextRun::default(),
            verses: BTreeMap::new(),
        }
    }

    /// Handle one node; false stops the walk.
    fn visit(&mut self, node: Node<'_>) -> bool {
        if self.is_verse_marker(node) {
            self.flush();
            self.current = attribute(node, self.source, "id").and_then(|id| verse_number(&id));
            if self.current.is_none() {
                tracing::debug!("verse marker without a usable id, dropping text until next verse");
            }
        } else if has_class(node, self.source, "div", &self.settings.footnote_class) {
            self.flush();
            return false;
        } else if is_text(node) && self.current.is_some_and(|v| v > 0) {
            let in_marker = node
                .parent()
                .is_some_and(|p| self.is_verse_marker(p));
            if !in_marker {
                self.buffer.push(node, self.source);
            }
        }
        true
    }

    fn is_verse_marker(&self, node: Node<'_>) -> bool {
        has_class(node, self.source, "span", &self.settings.verse_class)
    }

    /// Store the active verse and end it; verse 0 is never stored.
    fn flush(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        if let Some(verse) = self.current.take().filter(|&v| v > 0) {
            self.verses.insert(verse, buffer.join());
        }
    }

    fn finish(mut self) -> BTreeMap<u32, String> {
        self.flush();
        self.verses
    }
}

/// `V7` → 7.
fn verse_number(id: &str) -> Option<u32> {
    id.strip_prefix('V')?.parse().ok()
}

// ── Parser ──────────────────────────────────────────────────────

/// Parser for HTML chapter files.
pub struct HtmlParser {
    language: Language,
    settings: HtmlSettings,
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Anchors located in one pass over the whole document.
struct Anchors<'t> {
    main: Option<Node<'t>>,
    has_verse: bool,
    footnotes: Option<Node<'t>>,
}

impl HtmlParser {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(HtmlSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: HtmlSettings) -> Self {
        Self {
            language: tree_sitter_html::LANGUAGE.into(),
            settings,
        }
    }

    fn make_parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| IngestError::Parse {
                path: String::new(),
                detail: format!("failed to set HTML language: {e}"),
            })?;
        Ok(parser)
    }

    fn parse_tree(&self, content: &str, filename: &str) -> Result<Tree> {
        let mut parser = self.make_parser()?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| IngestError::Parse {
                path: filename.to_string(),
                detail: "tree-sitter parse returned None".into(),
            })?;
        if tree.root_node().has_error() {
            tracing::debug!("{filename}: HTML contains syntax errors, extracting what parsed");
        }
        Ok(tree)
    }

    fn locate_anchors<'t>(&self, root: Node<'t>, source: &[u8]) -> Anchors<'t> {
        let s = &self.settings;
        let mut anchors = Anchors {
            main: None,
            has_verse: false,
            footnotes: None,
        };
        walk_preorder(root, |node| {
            if node.kind() != "element" {
                return true;
            }
            if anchors.main.is_none() && has_class(node, source, "div", &s.main_class) {
                anchors.main = Some(node);
            } else if anchors.footnotes.is_none()
                && has_class(node, source, "div", &s.footnote_class)
            {
                anchors.footnotes = Some(node);
            } else if !anchors.has_verse && has_class(node, source, "span", &s.verse_class) {
                anchors.has_verse = true;
            }
            true
        });
        anchors
    }

    /// Footnote texts keyed by back-reference target (`#V3`), in document
    /// order.
    fn collect_footnotes(&self, container: Node<'_>, source: &[u8]) -> HashMap<String, Vec<String>> {
        let s = &self.settings;
        let mut notes: HashMap<String, Vec<String>> = HashMap::new();
        walk_preorder(container, |node| {
            if !has_class(node, source, "p", &s.note_class) {
                return true;
            }
            let href = find_element(node, |n| has_class(n, source, "a", &s.backref_class))
                .and_then(|a| attribute(a, source, "href"));
            let text = find_element(node, |n| has_class(n, source, "span", &s.note_text_class));
            if let (Some(href), Some(text)) = (href, text) {
                notes
                    .entry(href)
                    .or_default()
                    .push(clean_html_text(&inner_text(text, source)));
            }
            true
        });
        notes
    }

    /// Parse one chapter document. `filename` supplies the book and chapter.
    #[must_use]
    pub fn parse_document(&self, content: &str, filename: &str) -> ParseResult {
        let Some((code, chapter)) = book_chapter_from_filename(filename, &self.settings.extensions)
        else {
            return ParseResult::failed(IngestError::InvalidFilename {
                filename: filename.to_string(),
            });
        };
        let Some(book) = book_codes::lookup(&code) else {
            return ParseResult::failed(IngestError::InvalidFilename {
                filename: filename.to_string(),
            });
        };

        tracing::debug!("Parsing HTML file: {filename} ({} {chapter})", book.name);

        let mut result = ParseResult::document();
        match self.extract_verses(content, filename, book, chapter) {
            Ok(verses) => {
                if verses.is_empty() {
                    result.push_error(IngestError::NoVersesExtracted {
                        filename: filename.to_string(),
                    });
                } else {
                    tracing::info!("Parsed {} verses from {} {chapter}", verses.len(), book.name);
                    result.subdivisions_parsed = 1;
                    result.verses = verses;
                }
            }
            Err(errors) => {
                for e in errors {
                    result.push_error(e);
                }
            }
        }
        result
    }

    fn extract_verses(
        &self,
        content: &str,
        filename: &str,
        book: &BookInfo,
        chapter: u32,
    ) -> std::result::Result<Vec<ParsedVerse>, Vec<IngestError>> {
        let tree = self.parse_tree(content, filename).map_err(|e| vec![e])?;
        let source = content.as_bytes();
        let anchors = self.locate_anchors(tree.root_node(), source);

        let mut missing = Vec::new();
        if anchors.main.is_none() {
            missing.push(IngestError::MissingMainContainer {
                filename: filename.to_string(),
                class: self.settings.main_class.clone(),
            });
        }
        if !anchors.has_verse {
            missing.push(IngestError::MissingVerseMarkers {
                filename: filename.to_string(),
                class: self.settings.verse_class.clone(),
            });
        }
        let Some(main) = anchors.main.filter(|_| missing.is_empty()) else {
            return Err(missing);
        };

        let mut collector = VerseCollector::new(source, &self.settings);
        walk_preorder(main, |node| collector.visit(node));
        let texts = collector.finish();

        let mut footnotes = anchors
            .footnotes
            .map(|f| self.collect_footnotes(f, source))
            .unwrap_or_default();

        let verses = texts
            .into_iter()
            .filter_map(|(verse, raw_text)| {
                let clean_text = clean_html_text(&raw_text);
                if clean_text.is_empty() {
                    return None;
                }
                let notes = footnotes.remove(&format!("#V{verse}")).unwrap_or_default();
                Some(ParsedVerse::new(book, chapter, verse, raw_text, clean_text).with_footnotes(notes))
            })
            .collect();
        Ok(verses)
    }

    /// Parse a single chapter file.
    #[must_use]
    pub fn parse_file(&self, path: &Path) -> ParseResult {
        if !path.exists() {
            return ParseResult::failed(IngestError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let filename = scanner::file_name(path);
        if book_chapter_from_filename(filename, &self.settings.extensions).is_none() {
            return ParseResult::failed(IngestError::InvalidFilename {
                filename: filename.to_string(),
            });
        }
        match std::fs::read_to_string(path) {
            Ok(content) => self.parse_document(&content, filename),
            Err(e) => ParseResult::failed(IngestError::Read {
                path: path.display().to_string(),
                detail: e.to_string(),
            }),
        }
    }

    /// Parse every chapter file in a directory. Introductions (chapter 00) and
    /// files not following the naming convention are skipped.
    #[must_use]
    pub fn parse_directory(&self, dir: &Path, pattern: Option<&str>) -> ParseResult {
        let mut result = ParseResult::batch();
        if let Err(e) = scanner::ensure_dir(dir) {
            result.push_error(e);
            return result;
        }

        let pattern = pattern.unwrap_or(&self.settings.default_pattern);
        let files = match scanner::matching_files(dir, pattern) {
            Ok(files) => files,
            Err(e) => {
                result.push_error(e);
                return result;
            }
        };
        if files.is_empty() {
            result.push_error(IngestError::NoFilesFound {
                format: "HTML".into(),
                dir: dir.display().to_string(),
                pattern: pattern.to_string(),
            });
            return result;
        }

        let chapters: Vec<_> = files
            .into_iter()
            .filter(|f| {
                let keep = book_chapter_from_filename(scanner::file_name(f), &self.settings.extensions)
                    .is_some();
                if !keep {
                    tracing::debug!("Skipping {}", f.display());
                }
                keep
            })
            .collect();
        if chapters.is_empty() {
            result.push_error(IngestError::NoChapterFiles {
                dir: dir.display().to_string(),
            });
            return result;
        }

        tracing::info!("Found {} HTML chapter files in {}", chapters.len(), dir.display());

        let per_file: Vec<ParseResult> = chapters
            .par_iter()
            .map(|f| {
                tracing::info!("Processing: {}", scanner::file_name(f));
                self.parse_file(f)
            })
            .collect();
        for file_result in per_file {
            result.absorb(file_result);
        }

        tracing::info!(
            "Total: {} verses from {} chapters",
            result.verse_count(),
            result.subdivisions_parsed
        );
        result
    }
}

impl VerseSource for HtmlParser {
    fn format(&self) -> &'static str {
        "html"
    }

    fn parse_file(&self, path: &Path) -> ParseResult {
        HtmlParser::parse_file(self, path)
    }

    fn parse_directory(&self, dir: &Path, pattern: Option<&str>) -> ParseResult {
        HtmlParser::parse_directory(self, dir, pattern)
    }

    fn detects(&self, dir: &Path) -> bool {
        scanner::matching_files(dir, &self.settings.default_pattern).is_ok_and(|files| {
            files.iter().any(|f| {
                book_chapter_from_filename(scanner::file_name(f), &self.settings.extensions)
                    .is_some()
            })
        })
    }
}
