use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::{IngestError, Result};

/// Check that a directory argument exists and is a directory.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.display().to_string(),
        });
    }
    if !dir.is_dir() {
        return Err(IngestError::NotADirectory {
            path: dir.display().to_string(),
        });
    }
    Ok(())
}

/// Files directly inside `dir` whose name matches `pattern`, sorted by file
/// name. Matching is case-sensitive and not recursive.
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let glob = Pattern::new(pattern).map_err(|e| IngestError::InvalidPattern {
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_ok_and(|ft| ft.is_file()))
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|name| glob.matches(name))
        })
        .map(|e| e.path())
        .collect();

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Try candidate patterns in order and return the first one that matches any
/// file, with its matches. `None` when no candidate matches.
pub fn first_matching(
    dir: &Path,
    candidates: &[String],
) -> Result<Option<(String, Vec<PathBuf>)>> {
    for pattern in candidates {
        let files = matching_files(dir, pattern)?;
        if !files.is_empty() {
            return Ok(Some((pattern.clone(), files)));
        }
    }
    Ok(None)
}

/// File name of a path as UTF-8, empty when unavailable.
#[must_use]
pub fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn matching_files_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "40-MAT.usfm");
        touch(tmp.path(), "01-GEN.usfm");
        touch(tmp.path(), "notes.txt");
        fs::create_dir(tmp.path().join("dir.usfm")).unwrap();

        let files = matching_files(tmp.path(), "*.usfm").unwrap();
        let names: Vec<_> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["01-GEN.usfm", "40-MAT.usfm"]);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "GEN.SFM");
        assert!(matching_files(tmp.path(), "*.sfm").unwrap().is_empty());
        assert_eq!(matching_files(tmp.path(), "*.SFM").unwrap().len(), 1);
    }

    #[test]
    fn first_matching_picks_first_non_empty_candidate() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "GEN.sfm");
        touch(tmp.path(), "EXO.SFM");
        let candidates: Vec<String> = vec!["*.usfm".into(), "*.SFM".into(), "*.sfm".into()];
        let (pattern, files) = first_matching(tmp.path(), &candidates).unwrap().unwrap();
        assert_eq!(pattern, "*.SFM");
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn first_matching_none_when_nothing_matches() {
        let tmp = TempDir::new().unwrap();
        let candidates: Vec<String> = vec!["*.usfm".into()];
        assert!(first_matching(tmp.path(), &candidates).unwrap().is_none());
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = matching_files(tmp.path(), "[").unwrap_err();
        assert!(matches!(err, IngestError::InvalidPattern { .. }));
    }

    #[test]
    fn ensure_dir_errors() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "file.usfm");
        assert!(ensure_dir(tmp.path()).is_ok());
        let missing = ensure_dir(&tmp.path().join("missing")).unwrap_err();
        assert!(missing.to_string().contains("not found"));
        let not_dir = ensure_dir(&tmp.path().join("file.usfm")).unwrap_err();
        assert!(matches!(not_dir, IngestError::NotADirectory { .. }));
    }
}
