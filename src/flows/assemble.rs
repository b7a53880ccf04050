//! Context assembly flow - Pack files into a hierarchical, budgeted context
//!
//! Files are grouped by path depth. Each level is ordered by target
//! relevance, truncated to a per-level cap and then admitted greedily: full
//! content first, a short summary when the full text does not fit, and
//! nothing when neither does.

use anyhow::Result;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::backends::scan::{discover_files, ScanOptions};
use crate::core::budget::{BudgetStats, TokenBudgetTracker};
use crate::core::model::{
    ContextEntry, EntryKind, HierarchicalContext, PatternSet, PriorityMap, SourceFile, TargetSet,
};
use crate::core::paths::path_depth;
use crate::core::render::{RenderConfig, Renderer};
use crate::core::tokenizer::TokenProfile;
use crate::core::util::contains_ignore_case;
use crate::scoring::cache::ScoreCache;
use crate::scoring::oracle::oracle_for_command;
use crate::scoring::{RelationshipScorer, ScoringConfig};

/// Files kept per depth level when no cap is given
pub const DEFAULT_MAX_FILES_PER_LEVEL: usize = 50;

/// Lines of content shown in a file summary
const SUMMARY_PREVIEW_LINES: usize = 10;

/// Options for one assembly run
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Files kept per depth level after sorting; the rest are dropped
    pub max_files_per_level: usize,
    /// Targets; empty selects the untargeted mode
    pub targets: TargetSet,
    /// Extensions eligible for structural scanning
    pub patterns: PatternSet,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            max_files_per_level: DEFAULT_MAX_FILES_PER_LEVEL,
            targets: TargetSet::default(),
            patterns: PatternSet::default(),
        }
    }
}

/// Assembly statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    #[serde(flatten)]
    pub budget: BudgetStats,
    pub full_entries: usize,
    pub summary_entries: usize,
    /// Files that fit neither in full nor as a summary
    pub omitted: usize,
    /// Files dropped by the per-level cap
    pub over_level_cap: usize,
}

/// One packing session. Owns the token ledger, so every run against the
/// same session shares one budget.
#[derive(Debug)]
pub struct AssemblySession {
    budget: TokenBudgetTracker,
    full_entries: usize,
    summary_entries: usize,
    omitted: usize,
    over_level_cap: usize,
}

struct Candidate<'a> {
    file: &'a SourceFile,
    target_matches: usize,
    priority: f64,
    is_test: bool,
    char_len: usize,
}

impl AssemblySession {
    pub fn new(profile: TokenProfile) -> Self {
        Self {
            budget: TokenBudgetTracker::new(profile),
            full_entries: 0,
            summary_entries: 0,
            omitted: 0,
            over_level_cap: 0,
        }
    }

    #[allow(dead_code)]
    pub fn budget(&self) -> &TokenBudgetTracker {
        &self.budget
    }

    pub fn stats(&self) -> AssemblyStats {
        AssemblyStats {
            budget: self.budget.stats(),
            full_entries: self.full_entries,
            summary_entries: self.summary_entries,
            omitted: self.omitted,
            over_level_cap: self.over_level_cap,
        }
    }

    /// Assemble `files`, scoring them first when `opts` carries targets
    pub fn assemble(
        &mut self,
        files: &[SourceFile],
        opts: &AssembleOptions,
        scorer: &RelationshipScorer<'_>,
        cache: Option<&mut ScoreCache>,
    ) -> HierarchicalContext {
        if opts.targets.is_empty() {
            return self.assemble_untargeted(files, opts.max_files_per_level);
        }

        let analysis = match cache {
            Some(cache) => scorer.analyze_cached(files, &opts.patterns, &opts.targets, cache),
            None => scorer.analyze(files, &opts.patterns, &opts.targets),
        };
        self.assemble_targeted(files, opts, &analysis.priorities)
    }

    /// Cheap path: no scoring, ordering by test-ness and length only
    pub fn assemble_untargeted(
        &mut self,
        files: &[SourceFile],
        max_files_per_level: usize,
    ) -> HierarchicalContext {
        self.pack(files, &TargetSet::default(), &PriorityMap::new(), max_files_per_level)
    }

    /// Pack against a precomputed priority map
    pub fn assemble_targeted(
        &mut self,
        files: &[SourceFile],
        opts: &AssembleOptions,
        priorities: &PriorityMap,
    ) -> HierarchicalContext {
        self.pack(files, &opts.targets, priorities, opts.max_files_per_level)
    }

    fn pack(
        &mut self,
        files: &[SourceFile],
        targets: &TargetSet,
        priorities: &PriorityMap,
        max_files_per_level: usize,
    ) -> HierarchicalContext {
        let mut context = HierarchicalContext::new(files.len());

        let mut by_depth: BTreeMap<usize, Vec<Candidate>> = BTreeMap::new();
        for file in files {
            by_depth
                .entry(path_depth(&file.path))
                .or_default()
                .push(Candidate {
                    file,
                    target_matches: targets.match_count(&file.path),
                    priority: priorities.get(&file.path).copied().unwrap_or(0.0),
                    is_test: contains_ignore_case(&file.path, "test"),
                    char_len: file.char_len(),
                });
        }

        for (depth, mut candidates) in by_depth {
            candidates.sort_by(compare_candidates);
            if candidates.len() > max_files_per_level {
                self.over_level_cap += candidates.len() - max_files_per_level;
                candidates.truncate(max_files_per_level);
            }

            let mut entries = Vec::new();
            for candidate in candidates {
                let Some(entry) = self.admit(candidate.file, candidate.priority) else {
                    continue;
                };
                if entry.priority > 0.0 {
                    context.target_focused_files.push(entry.path.clone());
                }
                entries.push(entry);
            }

            if !entries.is_empty() {
                context.levels.insert(depth, entries);
            }
        }

        info!(
            files = files.len(),
            entries = context.entry_count(),
            used_tokens = self.budget.current_tokens(),
            max_tokens = self.budget.max_tokens(),
            "context assembled"
        );
        context
    }

    /// Full content, else summary, else nothing
    fn admit(&mut self, file: &SourceFile, priority: f64) -> Option<ContextEntry> {
        let path = &file.path;

        if self.budget.admit(&EntryKind::Full.ledger_key(path), &file.content) {
            self.full_entries += 1;
            return Some(ContextEntry {
                path: path.clone(),
                kind: EntryKind::Full,
                content: file.content.clone(),
                priority,
            });
        }

        let summary = summarize_file(path, &file.content);
        if self.budget.admit(&EntryKind::Summary.ledger_key(path), &summary) {
            debug!(path = %path, "admitted as summary");
            self.summary_entries += 1;
            return Some(ContextEntry {
                path: path.clone(),
                kind: EntryKind::Summary,
                content: summary,
                priority,
            });
        }

        debug!(path = %path, "omitted, budget exhausted");
        self.omitted += 1;
        None
    }
}

/// More target matches, then higher priority, then non-test, then longer
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.target_matches
        .cmp(&a.target_matches)
        .then_with(|| b.priority.total_cmp(&a.priority))
        .then_with(|| a.is_test.cmp(&b.is_test))
        .then_with(|| b.char_len.cmp(&a.char_len))
}

/// Short stand-in for a file that does not fit in full
pub fn summarize_file(path: &str, content: &str) -> String {
    let preview: Vec<&str> = content.lines().take(SUMMARY_PREVIEW_LINES).collect();
    format!(
        "File: {}\nSize: {} chars\nPreview:\n{}\n...",
        path,
        content.chars().count(),
        preview.join("\n")
    )
}

/// Everything `ctxpack pack` needs besides the root
#[derive(Debug, Clone, Default)]
pub struct PackRequest {
    pub scan: ScanOptions,
    pub options: AssembleOptions,
    pub profile: TokenProfile,
    pub scoring: ScoringConfig,
    /// Shell command used as the semantic oracle
    pub oracle_cmd: Option<String>,
    /// Print session statistics to stderr
    pub show_stats: bool,
}

/// Run the pack command
pub fn run_pack(root: &Path, req: PackRequest, config: RenderConfig) -> Result<()> {
    let files = discover_files(root, &req.options.patterns, req.scan)?;

    let oracle = oracle_for_command(req.oracle_cmd.as_deref());
    let scorer = RelationshipScorer::new(oracle.as_ref()).with_config(req.scoring);

    let mut session = AssemblySession::new(req.profile);
    let context = session.assemble(&files, &req.options, &scorer, None);

    if req.show_stats {
        let stats = session.stats();
        eprintln!("Pack Statistics:");
        eprintln!("   Files: {} ({} included)", context.total_files, context.entry_count());
        eprintln!(
            "   Entries: {} full, {} summary, {} omitted, {} over level cap",
            stats.full_entries, stats.summary_entries, stats.omitted, stats.over_level_cap
        );
        eprintln!(
            "   Tokens: {} / {} (model: {})",
            stats.budget.used_tokens, stats.budget.max_tokens, stats.budget.token_model
        );
        eprintln!();
    }

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render_context(&context));

    Ok(())
}
