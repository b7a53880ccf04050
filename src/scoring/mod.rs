//! Relationship scoring - how related each file is to the targets
//!
//! Provides:
//! - oracle: the semantic relatedness oracle and its implementations
//! - cache: caller-owned memo keyed on a stable hash of the inputs
//!
//! Files whose path names a target get priority 1.0 outright. Every other
//! file gets a weighted [`RelationshipScore`] built from its structural
//! signals plus an optional semantic rating.

pub mod cache;
pub mod oracle;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::core::model::{
    PatternSet, PriorityMap, RelationshipScore, SourceFile, TargetSet, DIRECT_IMPORT_CAP,
    DIRECT_MATCH_PRIORITY, FUNCTION_CALLS_CAP, INHERITANCE_CAP,
};
use crate::core::util::truncate_chars;
use crate::scanner::{self, BaseForm, BaseRef, StructuralSignals};
use cache::{AnalysisKey, ScoreCache};
use oracle::{build_prompt, parse_semantic_response, SemanticOracle};

const IMPORT_MATCH_SCORE: f64 = 0.2;
const DIRECT_BASE_SCORE: f64 = 0.3;
const QUALIFIED_BASE_SCORE: f64 = 0.2;
const CALL_MATCH_SCORE: f64 = 0.1;

/// Characters of each file excerpt embedded in an oracle prompt
pub const DEFAULT_EXCERPT_CHARS: usize = 1000;

/// Structural total at or above which a weak-signal policy skips the oracle
pub const DEFAULT_STRUCTURAL_THRESHOLD: f64 = 0.3;

/// When to ask the semantic oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SemanticPolicy {
    /// Every non-direct file is rated
    #[default]
    Always,
    /// Only files whose structural total is below the threshold are rated
    WhenStructuralWeak,
}

impl FromStr for SemanticPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(SemanticPolicy::Always),
            "when-structural-weak" | "weak" | "budget" => Ok(SemanticPolicy::WhenStructuralWeak),
            _ => Err(format!("Unknown semantic policy: {}", s)),
        }
    }
}

impl fmt::Display for SemanticPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticPolicy::Always => write!(f, "always"),
            SemanticPolicy::WhenStructuralWeak => write!(f, "when-structural-weak"),
        }
    }
}

/// Scoring tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    pub semantic_policy: SemanticPolicy,
    pub structural_threshold: f64,
    pub excerpt_chars: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            semantic_policy: SemanticPolicy::default(),
            structural_threshold: DEFAULT_STRUCTURAL_THRESHOLD,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

/// Score record for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileScore {
    pub path: String,
    /// Path names a target; sub-scores were not computed
    pub direct_match: bool,
    pub score: RelationshipScore,
    pub priority: f64,
    /// Scanning failed and the file kept the zero score
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

/// Full result of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipAnalysis {
    pub priorities: PriorityMap,
    pub scores: Vec<FileScore>,
}

/// Turns structural signals and oracle ratings into priorities
pub struct RelationshipScorer<'a> {
    oracle: &'a dyn SemanticOracle,
    config: ScoringConfig,
}

impl<'a> RelationshipScorer<'a> {
    pub fn new(oracle: &'a dyn SemanticOracle) -> Self {
        Self {
            oracle,
            config: ScoringConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScoringConfig) -> Self {
        self.config = config;
        self
    }

    /// Priority map for `files` against `targets`
    #[allow(dead_code)]
    pub fn score(&self, files: &[SourceFile], targets: &TargetSet) -> PriorityMap {
        self.analyze(files, &PatternSet::default(), targets)
            .priorities
    }

    /// Analyze through `cache`, reusing a previous result for identical input
    pub fn analyze_cached(
        &self,
        files: &[SourceFile],
        patterns: &PatternSet,
        targets: &TargetSet,
        cache: &mut ScoreCache,
    ) -> RelationshipAnalysis {
        let key = AnalysisKey::new(files, patterns, targets, &self.config);
        if let Some(hit) = cache.get(&key) {
            debug!(key = key.as_u64(), "relationship analysis cache hit");
            return hit.clone();
        }

        let analysis = self.analyze(files, patterns, targets);
        cache.insert(key, analysis.clone());
        analysis
    }

    /// Score every file. Structural scanning is limited to paths matching
    /// `patterns` when that set is non-empty.
    pub fn analyze(
        &self,
        files: &[SourceFile],
        patterns: &PatternSet,
        targets: &TargetSet,
    ) -> RelationshipAnalysis {
        let mut analysis = RelationshipAnalysis::default();
        if targets.is_empty() {
            return analysis;
        }

        let target_context = build_target_context(files, targets, self.config.excerpt_chars);

        for file in files {
            if targets.matches(&file.path) {
                debug!(path = %file.path, "direct target match");
                analysis
                    .priorities
                    .insert(file.path.clone(), DIRECT_MATCH_PRIORITY);
                analysis.scores.push(FileScore {
                    path: file.path.clone(),
                    direct_match: true,
                    score: RelationshipScore::default(),
                    priority: DIRECT_MATCH_PRIORITY,
                    failed: false,
                });
                continue;
            }

            let (score, failed) = match self.score_file(file, patterns, targets, &target_context) {
                Ok(score) => (score, false),
                Err(e) => {
                    warn!(path = %file.path, error = %e, "skipping file in relationship analysis");
                    (RelationshipScore::default(), true)
                }
            };

            let priority = score.total();
            if priority > 0.0 {
                analysis.priorities.insert(file.path.clone(), priority);
            }
            analysis.scores.push(FileScore {
                path: file.path.clone(),
                direct_match: false,
                score,
                priority,
                failed,
            });
        }

        debug!(
            files = files.len(),
            prioritized = analysis.priorities.len(),
            "relationship analysis done"
        );
        analysis
    }

    fn score_file(
        &self,
        file: &SourceFile,
        patterns: &PatternSet,
        targets: &TargetSet,
        target_context: &str,
    ) -> Result<RelationshipScore, crate::core::model::CtxError> {
        let signals = if patterns.matches(&file.path) {
            scanner::scan(&file.path, &file.content)?
        } else {
            StructuralSignals::default()
        };

        let mut score = RelationshipScore {
            direct_import: import_score(&signals, targets),
            inheritance: inheritance_score(&signals.bases, targets),
            function_calls: call_score(&signals.calls, targets),
            semantic: 0.0,
        };

        if self.wants_semantic(&score, target_context) {
            score.semantic = self.semantic_score(&file.content, target_context);
        }

        Ok(score)
    }

    fn wants_semantic(&self, score: &RelationshipScore, target_context: &str) -> bool {
        if target_context.is_empty() {
            return false;
        }
        match self.config.semantic_policy {
            SemanticPolicy::Always => true,
            SemanticPolicy::WhenStructuralWeak => {
                score.structural_total() < self.config.structural_threshold
            }
        }
    }

    fn semantic_score(&self, content: &str, target_context: &str) -> f64 {
        let excerpt = truncate_chars(content, self.config.excerpt_chars);
        let prompt = build_prompt(target_context, &excerpt);

        match self.oracle.call(&prompt) {
            Ok(response) => parse_semantic_response(&response).unwrap_or_else(|| {
                debug!(response = %response.trim(), "oracle response is not a number");
                0.0
            }),
            Err(e) => {
                debug!(error = %e, "oracle call failed");
                0.0
            }
        }
    }
}

/// Excerpts of every target-matching file, as embedded in oracle prompts.
/// Empty when no file path matches a target.
pub fn build_target_context(files: &[SourceFile], targets: &TargetSet, excerpt_chars: usize) -> String {
    files
        .iter()
        .filter(|f| targets.matches(&f.path))
        .map(|f| format!("\nFile: {}\n{}\n", f.path, truncate_chars(&f.content, excerpt_chars)))
        .collect()
}

/// +0.2 per imported module naming a target, capped at 0.8
fn import_score(signals: &StructuralSignals, targets: &TargetSet) -> f64 {
    let matches = signals
        .imports
        .iter()
        .filter(|module| targets.matches(module))
        .count();
    (matches as f64 * IMPORT_MATCH_SCORE).min(DIRECT_IMPORT_CAP)
}

/// +0.3 per direct base and +0.2 per qualified base naming a target, capped at 0.9
fn inheritance_score(bases: &[BaseRef], targets: &TargetSet) -> f64 {
    let score = bases
        .iter()
        .filter(|base| targets.matches(&base.name))
        .fold(0.0, |acc, base| match base.form {
            BaseForm::Direct => acc + DIRECT_BASE_SCORE,
            BaseForm::Qualified => acc + QUALIFIED_BASE_SCORE,
        });
    score.min(INHERITANCE_CAP)
}

/// +0.1 per call site naming a target, capped at 0.7
fn call_score(calls: &[String], targets: &TargetSet) -> f64 {
    let matches = calls.iter().filter(|c| targets.matches(c)).count();
    (matches as f64 * CALL_MATCH_SCORE).min(FUNCTION_CALLS_CAP)
}
