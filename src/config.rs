use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// Settings file looked up in the working directory.
pub const CONFIG_FILE: &str = "scripture-ingest.toml";

/// Resolved configuration: where it came from and what it says.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the settings file (it may not exist).
    pub config_path: PathBuf,
    /// Settings loaded from the file, or defaults.
    pub settings: Settings,
}

/// User-configurable settings from `scripture-ingest.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Line-oriented (USFM) parsing.
    pub usfm: UsfmSettings,
    /// Tag-tree (HTML) parsing.
    pub html: HtmlSettings,
    /// CLI output.
    pub output: OutputSettings,
}

/// USFM directory discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsfmSettings {
    /// File-name patterns tried in order when no pattern is given; the first
    /// one matching any file wins.
    pub candidate_patterns: Vec<String>,
}

impl Default for UsfmSettings {
    fn default() -> Self {
        Self {
            candidate_patterns: vec![
                "*.usfm".into(),
                "*.SFM".into(),
                "*.sfm".into(),
                "*.USFM".into(),
            ],
        }
    }
}

/// HTML chapter-file layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlSettings {
    /// Directory pattern used when none is given.
    pub default_pattern: String,
    /// Extensions accepted by the `{CODE}{CC}.{ext}` file-name convention.
    pub extensions: Vec<String>,
    /// Class of the `<div>` holding the chapter text.
    pub main_class: String,
    /// Class of the `<span>` marking the start of a verse.
    pub verse_class: String,
    /// Class of the trailing `<div>` holding footnote bodies.
    pub footnote_class: String,
    /// Class of each `<p>` footnote entry.
    pub note_class: String,
    /// Class of the `<a>` linking a footnote back to its verse.
    pub backref_class: String,
    /// Class of the `<span>` carrying the footnote text.
    pub note_text_class: String,
}

impl Default for HtmlSettings {
    fn default() -> Self {
        Self {
            default_pattern: "*.htm".into(),
            extensions: vec!["htm".into(), "html".into()],
            main_class: "main".into(),
            verse_class: "verse".into(),
            footnote_class: "footnote".into(),
            note_class: "f".into(),
            backref_class: "notebackref".into(),
            note_text_class: "ft".into(),
        }
    }
}

/// Output-related settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Output format: "minified" (default) or "pretty".
    pub format: String,
    /// Characters of verse text shown per verse in summaries.
    pub preview_chars: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: "minified".into(),
            preview_chars: 80,
        }
    }
}

impl Config {
    /// Load settings from an explicit file. A missing or invalid file is an
    /// error here, unlike [`Config::from_dir`].
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = path.into();
        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            IngestError::Config(format!("cannot read {}: {e}", config_path.display()))
        })?;
        let settings = toml::from_str(&content).map_err(|e| {
            IngestError::Config(format!("invalid {}: {e}", config_path.display()))
        })?;
        Ok(Self {
            config_path,
            settings,
        })
    }

    /// Config for a directory: `scripture-ingest.toml` inside it if present
    /// and valid, defaults otherwise.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let config_path = dir.as_ref().join(CONFIG_FILE);
        let settings = Self::load_settings(&config_path).unwrap_or_default();
        Self {
            config_path,
            settings,
        }
    }

    /// Create config from the current working directory.
    pub fn from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| IngestError::Config(format!("cannot get cwd: {e}")))?;
        Ok(Self::from_dir(cwd))
    }

    fn load_settings(config_path: &Path) -> Option<Settings> {
        if !config_path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(config_path).ok()?;
        match toml::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!("ignoring invalid {}: {e}", config_path.display());
                None
            }
        }
    }

    #[must_use]
    pub fn pretty_output(&self) -> bool {
        self.settings.output.format == "pretty"
    }
}
