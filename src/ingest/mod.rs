pub mod book_codes;
pub mod dispatcher;
pub mod html;
pub mod markers;
pub mod scanner;
pub mod usfm;

use std::path::Path;

use crate::models::verse::ParseResult;

pub use dispatcher::Dispatcher;
pub use html::HtmlParser;
pub use markers::{strip_markers, strip_markers_checked};
pub use usfm::UsfmParser;

/// A document format that verses can be extracted from.
pub trait VerseSource: Send + Sync {
    /// Format name used on the command line ("usfm", "html").
    fn format(&self) -> &'static str;

    /// Parse one document file.
    fn parse_file(&self, path: &Path) -> ParseResult;

    /// Parse every matching document in a directory.
    fn parse_directory(&self, dir: &Path, pattern: Option<&str>) -> ParseResult;

    /// Whether `dir` looks like a collection of this format's files.
    fn detects(&self, dir: &Path) -> bool;

    /// Parse a file or a directory, whichever `path` is.
    fn parse_path(&self, path: &Path, pattern: Option<&str>) -> ParseResult {
        if path.is_dir() {
            self.parse_directory(path, pattern)
        } else {
            self.parse_file(path)
        }
    }
}
