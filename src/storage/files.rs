use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Extension used for data files.
pub const DATA_FILE_EXTENSION: &str = "sqlite3";

/// Default data file name when none is configured.
pub const DEFAULT_DATA_FILE: &str = "bricbooks.sqlite3";

/// List the data files (`*.sqlite3`) in a directory, sorted by path.
pub fn find_data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read entry in {}", dir.display()))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == DATA_FILE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_data_files() {
        let tmp = TempDir::new().unwrap();
        for name in ["file.txt", "file.sqlite3", "db.sqlite3", "file.sql"] {
            fs::write(tmp.path().join(name), b"").unwrap();
        }
        fs::create_dir(tmp.path().join("dir.sqlite3")).unwrap();

        let files = find_data_files(tmp.path()).unwrap();
        assert_eq!(
            files,
            vec![tmp.path().join("db.sqlite3"), tmp.path().join("file.sqlite3")]
        );
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(find_data_files(&tmp.path().join("nope")).is_err());
    }
}
