//! Tokens flow - Per-file token counts under one model

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::backends::scan::read_file;
use crate::core::render::{RenderConfig, Renderer};
use crate::core::tokenizer::{TokenCount, TokenModel};

/// Count tokens of each named file
pub fn count_files(root: &Path, paths: &[PathBuf], model: TokenModel) -> Result<Vec<TokenCount>> {
    paths
        .iter()
        .map(|path| {
            let file = read_file(root, path)?;
            Ok(TokenCount::of(file.path, &file.content, model))
        })
        .collect()
}

/// Run the tokens command
pub fn run_tokens(root: &Path, paths: &[PathBuf], model: TokenModel, config: RenderConfig) -> Result<()> {
    let counts = count_files(root, paths, model)?;

    let renderer = Renderer::with_config(config);
    println!("{}", renderer.render_token_counts(&counts));

    Ok(())
}
