//! Score flow - Relationship report for a project and a target set

use anyhow::Result;
use std::path::Path;

use crate::backends::scan::{discover_files, ScanOptions};
use crate::core::model::{PatternSet, TargetSet};
use crate::core::render::{RenderConfig, Renderer};
use crate::scoring::oracle::oracle_for_command;
use crate::scoring::{RelationshipAnalysis, RelationshipScorer, ScoringConfig};

/// Options for the score command
#[derive(Debug, Clone, Default)]
pub struct ScoreRequest {
    pub scan: ScanOptions,
    pub patterns: PatternSet,
    pub targets: TargetSet,
    pub scoring: ScoringConfig,
    pub oracle_cmd: Option<String>,
}

/// Discover files under `root` and score them against the targets
pub fn score_project(root: &Path, req: &ScoreRequest) -> Result<RelationshipAnalysis> {
    let files = discover_files(root, &req.patterns, req.scan)?;
    let oracle = oracle_for_command(req.oracle_cmd.as_deref());
    let scorer = RelationshipScorer::new(oracle.as_ref()).with_config(req.scoring);
    Ok(scorer.analyze(&files, &req.patterns, &req.targets))
}

/// Run the score command
pub fn run_score(root: &Path, req: ScoreRequest, config: RenderConfig) -> Result<()> {
    if req.targets.is_empty() {
        tracing::warn!("no targets given, nothing to score");
    }

    let analysis = score_project(root, &req)?;

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render_analysis(&analysis));

    Ok(())
}
