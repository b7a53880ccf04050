//! Data model shared by scanning, scoring and assembly
//!
//! Every stage of a run speaks these types: source files go in, a
//! priority map comes out of scoring, and a hierarchical context comes
//! out of assembly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::util::contains_ignore_case;

/// Weight of each sub-score in [`RelationshipScore::total`]
pub const DIRECT_IMPORT_WEIGHT: f64 = 0.3;
pub const INHERITANCE_WEIGHT: f64 = 0.3;
pub const FUNCTION_CALLS_WEIGHT: f64 = 0.2;
pub const SEMANTIC_WEIGHT: f64 = 0.2;

/// Upper bound of each sub-score
pub const DIRECT_IMPORT_CAP: f64 = 0.8;
pub const INHERITANCE_CAP: f64 = 0.9;
pub const FUNCTION_CALLS_CAP: f64 = 0.7;
pub const SEMANTIC_CAP: f64 = 0.4;

/// Priority assigned to files whose path names a target
pub const DIRECT_MATCH_PRIORITY: f64 = 1.0;

/// Errors raised inside the scoring and packing core
#[derive(Debug, Error)]
pub enum CtxError {
    #[error("syntax error in {path}: {message}")]
    Syntax { path: String, message: String },

    #[error("semantic oracle failed: {0}")]
    Oracle(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CtxError {
    pub fn syntax(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn oracle(message: impl Into<String>) -> Self {
        Self::Oracle(message.into())
    }
}

/// One file of the corpus. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Content length in characters (not bytes)
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Independent relatedness signals for one file against one target set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipScore {
    pub direct_import: f64,
    pub inheritance: f64,
    pub function_calls: f64,
    pub semantic: f64,
}

impl RelationshipScore {
    /// Weighted total. The weights sum to 1.0 but the caps keep the result
    /// at or below 0.73.
    pub fn total(&self) -> f64 {
        self.structural_total() + SEMANTIC_WEIGHT * self.semantic
    }

    /// Weighted total of the structural signals only
    pub fn structural_total(&self) -> f64 {
        DIRECT_IMPORT_WEIGHT * self.direct_import
            + INHERITANCE_WEIGHT * self.inheritance
            + FUNCTION_CALLS_WEIGHT * self.function_calls
    }

    /// Highest value [`total`](Self::total) can reach
    #[allow(dead_code)]
    pub fn max_total() -> f64 {
        DIRECT_IMPORT_WEIGHT * DIRECT_IMPORT_CAP
            + INHERITANCE_WEIGHT * INHERITANCE_CAP
            + FUNCTION_CALLS_WEIGHT * FUNCTION_CALLS_CAP
            + SEMANTIC_WEIGHT * SEMANTIC_CAP
    }
}

/// Sparse `path -> priority` map. Paths with a zero score are absent.
pub type PriorityMap = BTreeMap<String, f64>;

/// Set of target patterns identifying the files of interest.
///
/// Matching is a case-insensitive substring test. Blank patterns are
/// dropped so that an empty string never matches the whole corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSet {
    targets: Vec<String>,
}

impl TargetSet {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut targets: Vec<String> = targets
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        targets.sort();
        targets.dedup();
        Self { targets }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }

    /// True when any target is a substring of `text`
    pub fn matches(&self, text: &str) -> bool {
        self.targets.iter().any(|t| contains_ignore_case(text, t))
    }

    /// Number of targets that are substrings of `text`
    pub fn match_count(&self, text: &str) -> usize {
        self.targets
            .iter()
            .filter(|t| contains_ignore_case(text, t))
            .count()
    }
}

/// File pattern set built from glob-style suffix tokens like `*.py`.
///
/// The leading `*` is stripped, leaving a plain suffix such as `.py`.
/// An empty set matches every path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternSet {
    suffixes: Vec<String>,
}

impl PatternSet {
    pub fn from_globs<I, S>(globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut suffixes: Vec<String> = globs
            .into_iter()
            .map(|g| g.as_ref().trim().trim_start_matches('*').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        suffixes.sort();
        suffixes.dedup();
        Self { suffixes }
    }

    #[allow(dead_code)]
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.suffixes.is_empty() {
            return true;
        }
        let lower = path.to_lowercase();
        self.suffixes.iter().any(|s| lower.ends_with(s.as_str()))
    }
}

/// Representation admitted for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Full,
    Summary,
}

impl EntryKind {
    /// Namespace of the budget ledger key for this representation
    pub fn ledger_key(&self, path: &str) -> String {
        match self {
            EntryKind::Full => format!("full_{}", path),
            EntryKind::Summary => format!("summary_{}", path),
        }
    }
}

/// One admitted file inside a depth level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub content: String,
    pub priority: f64,
}

/// Budget-respecting, depth-grouped context handed to downstream generators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalContext {
    /// Depth -> admitted entries, in admission order. Only non-empty levels.
    pub levels: BTreeMap<usize, Vec<ContextEntry>>,
    /// Reserved for downstream collaborators; always empty here
    pub file_summaries: BTreeMap<String, String>,
    pub total_files: usize,
    /// Paths with priority > 0, in admission order
    pub target_focused_files: Vec<String>,
}

impl HierarchicalContext {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Default::default()
        }
    }

    /// All entries across levels, shallowest level first
    pub fn entries(&self) -> impl Iterator<Item = (usize, &ContextEntry)> {
        self.levels
            .iter()
            .flat_map(|(depth, entries)| entries.iter().map(move |e| (*depth, e)))
    }

    pub fn entry_count(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    #[allow(dead_code)]
    pub fn find(&self, path: &str) -> Option<&ContextEntry> {
        self.entries().map(|(_, e)| e).find(|e| e.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_weights() {
        let score = RelationshipScore {
            direct_import: 0.4,
            inheritance: 0.3,
            function_calls: 0.2,
            semantic: 0.1,
        };
        let expected = 0.3 * 0.4 + 0.3 * 0.3 + 0.2 * 0.2 + 0.2 * 0.1;
        assert!((score.total() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_total_bounds() {
        assert_eq!(RelationshipScore::default().total(), 0.0);

        let capped = RelationshipScore {
            direct_import: DIRECT_IMPORT_CAP,
            inheritance: INHERITANCE_CAP,
            function_calls: FUNCTION_CALLS_CAP,
            semantic: SEMANTIC_CAP,
        };
        assert!((capped.total() - 0.73).abs() < 1e-9);
        assert!((RelationshipScore::max_total() - 0.73).abs() < 1e-9);
    }

    #[test]
    fn test_structural_total_ignores_semantic() {
        let score = RelationshipScore {
            semantic: 0.4,
            ..Default::default()
        };
        assert_eq!(score.structural_total(), 0.0);
    }

    #[test]
    fn test_target_set_drops_blank_and_dedups() {
        let targets = TargetSet::new(["auth", "", "  ", "auth", "db"]);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets.iter().collect::<Vec<_>>(), vec!["auth", "db"]);
    }

    #[test]
    fn test_target_set_matching() {
        let targets = TargetSet::new(["Auth", "models"]);
        assert!(targets.matches("src/auth/service.py"));
        assert!(targets.matches("SRC/MODELS.py"));
        assert!(!targets.matches("src/views.py"));
        assert_eq!(targets.match_count("auth/models.py"), 2);
        assert_eq!(targets.match_count("views.py"), 0);
    }

    #[test]
    fn test_pattern_set_strips_star() {
        let patterns = PatternSet::from_globs(["*.py", "*.GO", ""]);
        assert_eq!(patterns.suffixes(), &[".go".to_string(), ".py".to_string()]);
        assert!(patterns.matches("a/b.py"));
        assert!(patterns.matches("main.go"));
        assert!(!patterns.matches("main.rs"));
    }

    #[test]
    fn test_empty_pattern_set_matches_all() {
        let patterns = PatternSet::default();
        assert!(patterns.matches("anything.txt"));
    }

    #[test]
    fn test_entry_kind_ledger_keys() {
        assert_eq!(EntryKind::Full.ledger_key("a.py"), "full_a.py");
        assert_eq!(EntryKind::Summary.ledger_key("a.py"), "summary_a.py");
    }

    #[test]
    fn test_entry_serializes_type_field() {
        let entry = ContextEntry {
            path: "a.py".to_string(),
            kind: EntryKind::Summary,
            content: "x".to_string(),
            priority: 0.5,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "summary");
        assert_eq!(json["path"], "a.py");
    }

    #[test]
    fn test_context_field_names() {
        let ctx = HierarchicalContext::new(3);
        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json.get("levels").is_some());
        assert!(json.get("file_summaries").is_some());
        assert_eq!(json["total_files"], 3);
        assert!(json["target_focused_files"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_source_file_char_len() {
        let file = SourceFile::new("a.py", "你好");
        assert_eq!(file.char_len(), 2);
    }
}
