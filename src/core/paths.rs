//! Path normalization utilities
//!
//! Ensures all paths use '/' as separator and are relative to root, and
//! derives the structural depth used to group files into levels.

use std::path::Path;

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Lexically normalize a '/' or '\' separated path into its segments.
///
/// Empty and `.` segments vanish, `..` cancels the previous segment when
/// there is one to cancel. Nothing touches the filesystem.
pub fn normalized_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    segments
}

/// Structural depth of a path: its segment count after normalization.
///
/// A path that normalizes to nothing (`""`, `"."`) is depth 1, the same
/// level as a top-level file.
pub fn path_depth(path: &str) -> usize {
    normalized_segments(path).len().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        let path = Path::new("src/main.rs");
        assert_eq!(normalize_path(path), "src/main.rs");
    }

    #[test]
    fn test_make_relative() {
        let root = Path::new("/project");
        let path = Path::new("/project/src/main.rs");
        assert_eq!(make_relative(path, root), Some("src/main.rs".to_string()));
    }

    #[test]
    fn test_make_relative_not_under_root() {
        let root = Path::new("/project");
        let path = Path::new("/other/file.rs");
        assert_eq!(make_relative(path, root), None);
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth("main.py"), 1);
        assert_eq!(path_depth("src/main.py"), 2);
        assert_eq!(path_depth("src/pkg/mod.py"), 3);
    }

    #[test]
    fn test_path_depth_normalizes() {
        assert_eq!(path_depth("./src//main.py"), 2);
        assert_eq!(path_depth("src/pkg/../main.py"), 2);
        assert_eq!(path_depth("src\\pkg\\mod.py"), 3);
        assert_eq!(path_depth("../outside.py"), 2);
    }

    #[test]
    fn test_path_depth_empty() {
        assert_eq!(path_depth(""), 1);
        assert_eq!(path_depth("."), 1);
    }

    #[test]
    fn test_normalized_segments() {
        assert_eq!(normalized_segments("a/./b/../c"), vec!["a", "c"]);
        assert_eq!(normalized_segments("../../x"), vec!["..", "..", "x"]);
    }
}
