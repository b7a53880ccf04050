//! Core module - Contains the fundamental data structures and utilities
//!
//! This module provides:
//! - Data model (source files, scores, hierarchical context) and errors
//! - Token counting and the token budget ledger
//! - Path normalization and depth
//! - Rendering functions for different output formats
//! - Common utilities

pub mod budget;
pub mod model;
pub mod paths;
pub mod render;
pub mod tokenizer;
pub mod util;
