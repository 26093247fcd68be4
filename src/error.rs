use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    #[error("Failed to read {path}: {detail}")]
    Read { path: String, detail: String },

    #[error("No \\id marker found in {path}")]
    MissingIdMarker { path: String },

    #[error("Unknown USFM book code: {code} in {path}")]
    UnknownBookCode { code: String, path: String },

    #[error("Invalid filename format: {filename} (expected pattern: MAT01.htm)")]
    InvalidFilename { filename: String },

    #[error("{filename}: Missing <div class='{class}'> - cannot locate main content area")]
    MissingMainContainer { filename: String, class: String },

    #[error("{filename}: No <span class='{class}'> elements found - cannot identify verses")]
    MissingVerseMarkers { filename: String, class: String },

    #[error("{filename}: No verses extracted")]
    NoVersesExtracted { filename: String },

    #[error("No {format} files found in {dir} matching {pattern}")]
    NoFilesFound {
        format: String,
        dir: String,
        pattern: String,
    },

    #[error("No valid chapter files found in {dir} (files must match pattern like MAT01.htm)")]
    NoChapterFiles { dir: String },

    #[error("invalid glob pattern {pattern}: {detail}")]
    InvalidPattern { pattern: String, detail: String },

    #[error("parse error in {path}: {detail}")]
    Parse { path: String, detail: String },

    #[error("unsupported format: {format}")]
    UnsupportedFormat { format: String },

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_messages_mention_not_found() {
        let file = IngestError::FileNotFound {
            path: "/tmp/x.usfm".into(),
        };
        let dir = IngestError::DirectoryNotFound {
            path: "/tmp/none".into(),
        };
        assert!(file.to_string().to_lowercase().contains("not found"));
        assert!(dir.to_string().to_lowercase().contains("not found"));
    }

    #[test]
    fn structure_errors_name_the_anchor() {
        let main = IngestError::MissingMainContainer {
            filename: "MAT01.htm".into(),
            class: "main".into(),
        };
        let verse = IngestError::MissingVerseMarkers {
            filename: "MAT01.htm".into(),
            class: "verse".into(),
        };
        assert!(main.to_string().contains("main"));
        assert!(main.to_string().starts_with("MAT01.htm: "));
        assert!(verse.to_string().contains("verse"));
    }

    #[test]
    fn missing_id_marker_renders_backslash() {
        let err = IngestError::MissingIdMarker {
            path: "book.usfm".into(),
        };
        assert_eq!(err.to_string(), "No \\id marker found in book.usfm");
    }
}
