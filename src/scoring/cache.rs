//! Caller-owned memo of relationship analyses
//!
//! Keys are a stable xxh3 hash of the full input: every (path, content)
//! pair in path order, the pattern set, the target set and the scoring
//! config. Changing any byte of any file yields a different key, so a hit
//! is never stale, and scorers with different configs can share a cache.

use std::collections::HashMap;
use xxhash_rust::xxh3::Xxh3;

use crate::core::model::{PatternSet, SourceFile, TargetSet};
use crate::scoring::{RelationshipAnalysis, ScoringConfig};

/// Stable identity of one `analyze` input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalysisKey(u64);

impl AnalysisKey {
    pub fn new(
        files: &[SourceFile],
        patterns: &PatternSet,
        targets: &TargetSet,
        config: &ScoringConfig,
    ) -> Self {
        let mut sorted: Vec<&SourceFile> = files.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.content.cmp(&b.content)));

        let mut hasher = Xxh3::new();
        // Length prefixes keep ("ab", "c") and ("a", "bc") apart
        let mut feed = |tag: u8, bytes: &[u8]| {
            hasher.update(&[tag]);
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };

        for file in sorted {
            feed(b'p', file.path.as_bytes());
            feed(b'c', file.content.as_bytes());
        }
        for suffix in patterns.suffixes() {
            feed(b'g', suffix.as_bytes());
        }
        for target in targets.iter() {
            feed(b't', target.as_bytes());
        }
        feed(b's', config.semantic_policy.to_string().as_bytes());
        feed(b'w', &config.structural_threshold.to_bits().to_le_bytes());
        feed(b'e', &(config.excerpt_chars as u64).to_le_bytes());

        Self(hasher.digest())
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Memo of analyses, valid for as long as the caller keeps it
#[derive(Debug, Default)]
pub struct ScoreCache {
    entries: HashMap<AnalysisKey, RelationshipAnalysis>,
}

impl ScoreCache {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &AnalysisKey) -> Option<&RelationshipAnalysis> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: AnalysisKey, analysis: RelationshipAnalysis) {
        self.entries.insert(key, analysis);
    }

    /// Drop one entry; returns whether it was present
    #[allow(dead_code)]
    pub fn invalidate(&mut self, key: &AnalysisKey) -> bool {
        self.entries.remove(key).is_some()
    }

    #[allow(dead_code)]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
