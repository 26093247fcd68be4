use std::collections::HashMap;
use std::path::Path;

use crate::config::Settings;
use crate::error::{IngestError, Result};
use crate::ingest::html::HtmlParser;
use crate::ingest::usfm::UsfmParser;
use crate::ingest::VerseSource;
use crate::models::verse::ParseResult;

/// Extensions routed to the USFM parser.
const USFM_EXTENSIONS: &[&str] = &["usfm", "sfm"];

/// Routes paths to the parser for their format.
pub struct Dispatcher {
    sources: HashMap<String, Box<dyn VerseSource>>,
    html_extensions: Vec<String>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(&Settings::default())
    }

    #[must_use]
    pub fn with_settings(settings: &Settings) -> Self {
        let mut sources: HashMap<String, Box<dyn VerseSource>> = HashMap::new();
        sources.insert(
            "usfm".into(),
            Box::new(UsfmParser::with_settings(settings.usfm.clone())),
        );
        sources.insert(
            "html".into(),
            Box::new(HtmlParser::with_settings(settings.html.clone())),
        );
        Self {
            sources,
            html_extensions: settings.html.extensions.clone(),
        }
    }

    /// Check if a format has a parser available.
    #[must_use]
    pub fn supports(&self, format: &str) -> bool {
        self.sources.contains_key(format)
    }

    /// Registered format names, sorted.
    #[must_use]
    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }

    fn source(&self, format: &str) -> Result<&dyn VerseSource> {
        self.sources
            .get(format)
            .map(|s| &**s)
            .ok_or_else(|| IngestError::UnsupportedFormat {
                format: format.into(),
            })
    }

    /// Work out the format of a file (by extension) or a directory (by
    /// probing each parser, USFM first).
    pub fn detect_format(&self, path: &Path) -> Result<&'static str> {
        if path.is_dir() {
            for format in ["usfm", "html"] {
                if self.source(format)?.detects(path) {
                    tracing::debug!("Detected {format} files in {}", path.display());
                    return Ok(format);
                }
            }
            return Err(IngestError::UnsupportedFormat {
                format: format!("no USFM or HTML files in {}", path.display()),
            });
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if USFM_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            Ok("usfm")
        } else if self
            .html_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
        {
            Ok("html")
        } else {
            Err(IngestError::UnsupportedFormat {
                format: if ext.is_empty() {
                    path.display().to_string()
                } else {
                    format!(".{ext}")
                },
            })
        }
    }

    /// Parse `path` with an explicit format, or a detected one when `format`
    /// is `None`. Only an unknown or undetectable format is an `Err`; every
    /// parsing problem is reported inside the `ParseResult`.
    pub fn parse(
        &self,
        path: &Path,
        format: Option<&str>,
        pattern: Option<&str>,
    ) -> Result<ParseResult> {
        if !path.exists() {
            return Err(IngestError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let format = match format {
            Some(f) if !self.supports(f) => {
                return Err(IngestError::UnsupportedFormat {
                    format: format!("{f} (expected one of: {})", self.formats().join(", ")),
                });
            }
            Some(f) => f,
            None => self.detect_format(path)?,
        };
        Ok(self.source(format)?.parse_path(path, pattern))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const USFM: &str = "\\id GEN\n\\c 1\n\\v 1 In the beginning.\n";
    const HTML: &str =
        r#"<div class="main"><span class="verse" id="V1">1</span>Blessed is the man.</div>"#;

    #[test]
    fn dispatcher_supports_formats() {
        let d = Dispatcher::new();
        assert!(d.supports("usfm"));
        assert!(d.supports("html"));
        assert!(!d.supports("osis"));
        assert_eq!(d.formats(), vec!["html", "usfm"]);
    }

    #[test]
    fn detect_by_extension() {
        let d = Dispatcher::new();
        assert_eq!(d.detect_format(Path::new("01-GEN.usfm")).unwrap(), "usfm");
        assert_eq!(d.detect_format(Path::new("GEN.SFM")).unwrap(), "usfm");
        assert_eq!(d.detect_format(Path::new("MAT01.htm")).unwrap(), "html");
        assert_eq!(d.detect_format(Path::new("MAT01.HTML")).unwrap(), "html");
        assert!(d.detect_format(Path::new("notes.txt")).is_err());
    }

    #[test]
    fn detect_directory_by_contents() {
        let d = Dispatcher::new();
        let usfm_dir = TempDir::new().unwrap();
        fs::write(usfm_dir.path().join("01-GEN.usfm"), USFM).unwrap();
        assert_eq!(d.detect_format(usfm_dir.path()).unwrap(), "usfm");

        let html_dir = TempDir::new().unwrap();
        fs::write(html_dir.path().join("PSA01.htm"), HTML).unwrap();
        assert_eq!(d.detect_format(html_dir.path()).unwrap(), "html");

        let empty = TempDir::new().unwrap();
        assert!(d.detect_format(empty.path()).is_err());
    }

    #[test]
    fn parse_routes_to_parser() {
        let d = Dispatcher::new();
        let tmp = TempDir::new().unwrap();
        let usfm = tmp.path().join("01-GEN.usfm");
        let html = tmp.path().join("PSA01.htm");
        fs::write(&usfm, USFM).unwrap();
        fs::write(&html, HTML).unwrap();

        let result = d.parse(&usfm, None, None).unwrap();
        assert_eq!(result.verses[0].canonical_code, "GEN");

        let result = d.parse(&html, None, None).unwrap();
        assert_eq!(result.verses[0].subdivision_slug, "psalms");
        assert_eq!(result.verses[0].clean_text, "Blessed is the man.");
    }

    #[test]
    fn parse_rejects_unknown_format_and_missing_path() {
        let d = Dispatcher::new();
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("01-GEN.usfm");
        fs::write(&file, USFM).unwrap();
        let err = d.parse(&file, Some("osis"), None).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat { .. }));
        assert!(err.to_string().contains("expected one of: html, usfm"));
        assert!(matches!(
            d.parse(&tmp.path().join("missing.usfm"), None, None),
            Err(IngestError::FileNotFound { .. })
        ));
    }
}
