//! Token counting - the single source of truth for token cost
//!
//! Counts come from tiktoken BPE tables (cl100k_base / o200k_base), with a
//! deterministic heuristic estimator for offline use. A [`TokenProfile`]
//! pairs a model with the hard ceiling the budget tracker enforces.
//!
//! Model names accept the identifiers callers usually have at hand:
//! - gpt-4, gpt-4-turbo, gpt-3.5-turbo, claude-3 -> cl100k_base
//! - gpt-4o -> o200k_base
//! - heuristic -> no BPE, ~4 chars/token

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};
use tracing::warn;

use crate::core::model::CtxError;

/// Default context ceiling, matching a 128k-token model window
pub const DEFAULT_MAX_TOKENS: usize = 128_000;

/// Supported token models/encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TokenModel {
    /// cl100k_base encoding
    Cl100k,
    /// o200k_base encoding
    O200k,
    /// GPT-4 / GPT-4-turbo (cl100k_base)
    #[default]
    Gpt4,
    /// GPT-4o (o200k_base)
    Gpt4o,
    /// GPT-3.5-turbo (cl100k_base)
    Gpt35Turbo,
    /// Claude 3 family, approximated with cl100k_base
    Claude3,
    /// Character-class estimate, no BPE tables needed
    Heuristic,
}

impl TokenModel {
    fn bpe(&self) -> Option<&'static CoreBPE> {
        let table = match self {
            TokenModel::O200k | TokenModel::Gpt4o => &*O200K_BPE,
            TokenModel::Cl100k
            | TokenModel::Gpt4
            | TokenModel::Gpt35Turbo
            | TokenModel::Claude3 => &*CL100K_BPE,
            TokenModel::Heuristic => return None,
        };
        table.as_ref().ok()
    }

    pub fn available_models() -> &'static [&'static str] {
        &[
            "cl100k",
            "o200k",
            "gpt-4",
            "gpt-4o",
            "gpt-3.5-turbo",
            "claude3",
            "heuristic",
        ]
    }
}

impl fmt::Display for TokenModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenModel::Cl100k => "cl100k",
            TokenModel::O200k => "o200k",
            TokenModel::Gpt4 => "gpt-4",
            TokenModel::Gpt4o => "gpt-4o",
            TokenModel::Gpt35Turbo => "gpt-3.5-turbo",
            TokenModel::Claude3 => "claude3",
            TokenModel::Heuristic => "heuristic",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for TokenModel {
    type Err = CtxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cl100k" | "cl100k_base" => Ok(TokenModel::Cl100k),
            "o200k" | "o200k_base" => Ok(TokenModel::O200k),
            "gpt4" | "gpt-4" | "gpt-4-turbo" | "gpt-4-32k" | "default" => Ok(TokenModel::Gpt4),
            "gpt4o" | "gpt-4o" | "gpt-4o-mini" => Ok(TokenModel::Gpt4o),
            "gpt35" | "gpt-3.5" | "gpt-3.5-turbo" => Ok(TokenModel::Gpt35Turbo),
            "claude" | "claude3" | "claude-3" | "claude-3.5" => Ok(TokenModel::Claude3),
            "heuristic" | "fast" | "estimate" => Ok(TokenModel::Heuristic),
            _ => Err(CtxError::Tokenizer(format!(
                "Unknown model: {}. Available: {}",
                s,
                TokenModel::available_models().join(", ")
            ))),
        }
    }
}

// Loaded once per process on first use
static CL100K_BPE: Lazy<Result<CoreBPE, String>> = Lazy::new(|| {
    cl100k_base().map_err(|e| {
        warn!(error = %e, "cl100k_base unavailable, using heuristic token counts");
        e.to_string()
    })
});

static O200K_BPE: Lazy<Result<CoreBPE, String>> = Lazy::new(|| {
    o200k_base().map_err(|e| {
        warn!(error = %e, "o200k_base unavailable, using heuristic token counts");
        e.to_string()
    })
});

/// Named model plus the hard token ceiling of the context window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenProfile {
    pub model: TokenModel,
    pub max_tokens: usize,
}

impl Default for TokenProfile {
    fn default() -> Self {
        Self {
            model: TokenModel::default(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl TokenProfile {
    pub fn new(model: TokenModel, max_tokens: usize) -> Self {
        Self { model, max_tokens }
    }

    /// Count tokens of `text` under this profile's model
    pub fn count(&self, text: &str) -> usize {
        count_tokens(text, self.model)
    }
}

/// Count tokens in text using the specified model.
///
/// Falls back to [`estimate_tokens_heuristic`] when the BPE table failed to
/// load; that outcome is fixed for the life of the process.
pub fn count_tokens(text: &str, model: TokenModel) -> usize {
    if text.is_empty() {
        return 0;
    }

    match model.bpe() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => estimate_tokens_heuristic(text),
    }
}

/// Token count of one file under one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCount {
    pub path: String,
    pub model: String,
    pub tokens: usize,
    pub chars: usize,
}

impl TokenCount {
    pub fn of(path: impl Into<String>, text: &str, model: TokenModel) -> Self {
        Self {
            path: path.into(),
            model: model.to_string(),
            tokens: count_tokens(text, model),
            chars: text.chars().count(),
        }
    }
}

/// Estimate tokens from character classes.
///
/// ASCII words and whitespace cost ~4 chars/token, code symbols ~2,
/// CJK ~1.5 and other Unicode ~2.
pub fn estimate_tokens_heuristic(text: &str) -> usize {
    let mut ascii_chars = 0usize;
    let mut cjk_chars = 0usize;
    let mut other_unicode = 0usize;
    let mut code_symbols = 0usize;

    for c in text.chars() {
        if c.is_ascii() {
            if is_code_symbol(c) {
                code_symbols += 1;
            } else {
                ascii_chars += 1;
            }
        } else if is_cjk_char(c) {
            cjk_chars += 1;
        } else {
            other_unicode += 1;
        }
    }

    ascii_chars.div_ceil(4)
        + code_symbols.div_ceil(2)
        + (cjk_chars * 2).div_ceil(3)
        + other_unicode.div_ceil(2)
}

#[inline]
fn is_code_symbol(c: char) -> bool {
    c.is_ascii_punctuation() && c != '_'
}

#[inline]
fn is_cjk_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF     // CJK Unified Ideographs
        | 0x3400..=0x4DBF   // Extension A
        | 0x3000..=0x303F   // Symbols and Punctuation
        | 0x3040..=0x30FF   // Hiragana, Katakana
        | 0xAC00..=0xD7AF   // Hangul Syllables
        | 0xFF00..=0xFFEF)  // Fullwidth Forms
}
