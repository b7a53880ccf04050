//! Flows module - Operations that combine discovery, scoring and packing
//!
//! Provides:
//! - assemble: Pack files into a hierarchical, token-budgeted context
//! - score: Relationship report against a target set
//! - tokens: Per-file token counts

pub mod assemble;
pub mod score;
pub mod tokens;
