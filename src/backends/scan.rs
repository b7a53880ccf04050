//! File discovery backend
//!
//! Walks a root with the ignore crate and loads matching files as
//! [`SourceFile`]s with root-relative paths

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::model::{PatternSet, SourceFile};
use crate::core::paths::{make_relative, normalize_path};

/// Files larger than this are skipped by default
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Walk options
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Include hidden files and directories
    pub hidden: bool,
    /// Respect .gitignore and friends
    pub ignore: bool,
    /// Skip files larger than this many bytes
    pub max_file_bytes: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            hidden: false,
            ignore: true,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Load every file under `root` whose extension is in `patterns`, sorted
/// by path. Unreadable and non-UTF-8 files are skipped with a warning.
pub fn discover_files(root: &Path, patterns: &PatternSet, opts: ScanOptions) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(!opts.hidden)
        .git_ignore(opts.ignore)
        .git_global(opts.ignore)
        .git_exclude(opts.ignore)
        .ignore(opts.ignore)
        .require_git(false);

    let mut files = Vec::new();

    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "walk error");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        let relative = match make_relative(path, root) {
            Some(r) => r,
            None => continue,
        };

        if !patterns.matches(&relative) {
            continue;
        }

        if let Ok(metadata) = entry.metadata() {
            if metadata.len() > opts.max_file_bytes {
                debug!(path = %relative, bytes = metadata.len(), "skipping large file");
                continue;
            }
        }

        match fs::read_to_string(path) {
            Ok(content) => files.push(SourceFile::new(relative, content)),
            Err(e) => warn!(path = %relative, error = %e, "skipping unreadable file"),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(root = %normalize_path(root), files = files.len(), "discovered files");
    Ok(files)
}

/// Load one file named on the command line. The path is kept as given,
/// relative to `root` when it lies inside it.
pub fn read_file(root: &Path, path: &Path) -> Result<SourceFile> {
    let full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    let content = fs::read_to_string(&full)
        .with_context(|| format!("Failed to read {}", full.display()))?;
    let display = make_relative(&full, root).unwrap_or_else(|| normalize_path(path));
    Ok(SourceFile::new(display, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap().write_all(content).unwrap();
    }

    #[test]
    fn test_discover_empty_dir() {
        let temp = tempdir().unwrap();
        let files = discover_files(temp.path(), &PatternSet::default(), ScanOptions::default()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/b.py", b"import a\n");
        write(temp.path(), "a.py", b"x = 1\n");
        write(temp.path(), "main.go", b"package main\n");
        write(temp.path(), "README.md", b"# readme\n");

        let patterns = PatternSet::from_globs(["*.py", "*.go"]);
        let files = discover_files(temp.path(), &patterns, ScanOptions::default()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "main.go", "src/b.py"]);
        assert_eq!(files[2].content, "import a\n");
    }

    #[test]
    fn test_discover_skips_non_utf8_and_large() {
        let temp = tempdir().unwrap();
        write(temp.path(), "bin.py", &[0xff, 0xfe, 0x00, 0x80]);
        write(temp.path(), "big.py", "x".repeat(200).as_bytes());
        write(temp.path(), "ok.py", b"ok = True\n");

        let opts = ScanOptions {
            max_file_bytes: 100,
            ..Default::default()
        };
        let files = discover_files(temp.path(), &PatternSet::default(), opts).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["ok.py"]);
    }

    #[test]
    fn test_discover_respects_gitignore_and_hidden() {
        let temp = tempdir().unwrap();
        write(temp.path(), ".gitignore", b"build/\n");
        write(temp.path(), "build/out.py", b"x = 1\n");
        write(temp.path(), ".hidden/h.py", b"x = 1\n");
        write(temp.path(), "keep.py", b"x = 1\n");

        let patterns = PatternSet::from_globs(["*.py"]);
        let files = discover_files(temp.path(), &patterns, ScanOptions::default()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["keep.py"]);

        let all = ScanOptions {
            hidden: true,
            ignore: false,
            ..Default::default()
        };
        let files = discover_files(temp.path(), &patterns, all).unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_discover_missing_root() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("nope");
        assert!(discover_files(&missing, &PatternSet::default(), ScanOptions::default()).is_err());
    }

    #[test]
    fn test_read_file_relative_to_root() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/a.py", b"x = 1\n");
        let file = read_file(temp.path(), Path::new("src/a.py")).unwrap();
        assert_eq!(file.path, "src/a.py");
        assert_eq!(file.content, "x = 1\n");
        assert!(read_file(temp.path(), Path::new("missing.py")).is_err());
    }
}
