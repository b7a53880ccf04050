//! Token budget tracking
//!
//! Admission control over a hard token ceiling. Content is admitted under a
//! named key; the ledger remembers each key's cost so it can be released.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::tokenizer::TokenProfile;

/// Ledger of admitted content against a token ceiling.
///
/// `current_tokens <= max_tokens` holds after every call. A rejected
/// admission leaves the ledger untouched.
///
/// Admitting a key that is already present records the new cost for the
/// key but adds it to the running total on top of the old one; remove the
/// key first, or use a fresh key, to avoid counting it twice.
#[derive(Debug, Clone)]
pub struct TokenBudgetTracker {
    profile: TokenProfile,
    ledger: BTreeMap<String, usize>,
    current_tokens: usize,
}

/// Snapshot of ledger usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetStats {
    pub token_model: String,
    pub max_tokens: usize,
    pub used_tokens: usize,
    pub available_tokens: usize,
    pub admitted: usize,
}

impl TokenBudgetTracker {
    pub fn new(profile: TokenProfile) -> Self {
        Self {
            profile,
            ledger: BTreeMap::new(),
            current_tokens: 0,
        }
    }

    /// Token cost of `text`; every admission decision goes through this
    pub fn count(&self, text: &str) -> usize {
        self.profile.count(text)
    }

    /// Reserve budget for `text` under `key`. Returns false when it does not fit.
    pub fn admit(&mut self, key: &str, text: &str) -> bool {
        let tokens = self.count(text);
        if self.current_tokens + tokens > self.profile.max_tokens {
            debug!(
                key,
                tokens,
                available = self.available(),
                "admission rejected"
            );
            return false;
        }

        self.ledger.insert(key.to_string(), tokens);
        self.current_tokens += tokens;
        true
    }

    /// Release the budget held by `key`; no-op for unknown keys
    #[allow(dead_code)]
    pub fn remove(&mut self, key: &str) {
        if let Some(tokens) = self.ledger.remove(key) {
            self.current_tokens = self.current_tokens.saturating_sub(tokens);
        }
    }

    /// Tokens left before the ceiling. Planning aid only, not a reservation.
    pub fn available(&self) -> usize {
        self.profile.max_tokens.saturating_sub(self.current_tokens)
    }

    pub fn current_tokens(&self) -> usize {
        self.current_tokens
    }

    pub fn max_tokens(&self) -> usize {
        self.profile.max_tokens
    }

    #[allow(dead_code)]
    pub fn tokens_for(&self, key: &str) -> Option<usize> {
        self.ledger.get(key).copied()
    }

    #[allow(dead_code)]
    pub fn contains(&self, key: &str) -> bool {
        self.ledger.contains_key(key)
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn stats(&self) -> BudgetStats {
        BudgetStats {
            token_model: self.profile.model.to_string(),
            max_tokens: self.profile.max_tokens,
            used_tokens: self.current_tokens,
            available_tokens: self.available(),
            admitted: self.ledger.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tokenizer::TokenModel;

    fn tracker(max_tokens: usize) -> TokenBudgetTracker {
        TokenBudgetTracker::new(TokenProfile::new(TokenModel::Heuristic, max_tokens))
    }

    #[test]
    fn test_admit_within_budget() {
        let mut budget = tracker(10);
        assert!(budget.admit("a", &"x".repeat(16)));
        assert_eq!(budget.current_tokens(), 4);
        assert_eq!(budget.tokens_for("a"), Some(4));
        assert_eq!(budget.available(), 6);
    }

    #[test]
    fn test_admit_exactly_at_ceiling() {
        let mut budget = tracker(4);
        assert!(budget.admit("a", &"x".repeat(16)));
        assert_eq!(budget.available(), 0);
    }

    #[test]
    fn test_rejection_leaves_ledger_unchanged() {
        let mut budget = tracker(5);
        assert!(budget.admit("a", &"x".repeat(12)));
        let before = budget.current_tokens();

        assert!(!budget.admit("b", &"x".repeat(40)));
        assert_eq!(budget.current_tokens(), before);
        assert!(!budget.contains("b"));
        assert_eq!(budget.len(), 1);

        // Rejecting again changes nothing either
        assert!(!budget.admit("b", &"x".repeat(40)));
        assert_eq!(budget.current_tokens(), before);
    }

    #[test]
    fn test_never_exceeds_ceiling() {
        let mut budget = tracker(50);
        for i in 0..100 {
            budget.admit(&format!("k{}", i), &"y".repeat(i * 3));
            assert!(budget.current_tokens() <= budget.max_tokens());
        }
    }

    #[test]
    fn test_remove_then_readmit_round_trip() {
        let mut budget = tracker(100);
        let text = "some content that costs tokens";
        assert!(budget.admit("other", "abcd"));
        assert!(budget.admit("key", text));
        let with_key = budget.current_tokens();

        budget.remove("key");
        assert!(!budget.contains("key"));
        assert!(budget.admit("key", text));
        assert_eq!(budget.current_tokens(), with_key);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut budget = tracker(10);
        budget.admit("a", "abcd");
        budget.remove("missing");
        assert_eq!(budget.current_tokens(), 1);
    }

    #[test]
    fn test_readmit_without_remove_double_counts() {
        let mut budget = tracker(100);
        assert!(budget.admit("dup", &"x".repeat(20)));
        assert!(budget.admit("dup", &"x".repeat(20)));
        assert_eq!(budget.tokens_for("dup"), Some(5));
        assert_eq!(budget.current_tokens(), 10);

        budget.remove("dup");
        assert_eq!(budget.current_tokens(), 5);
    }

    #[test]
    fn test_empty_text_is_free() {
        let mut budget = tracker(0);
        assert!(budget.admit("empty", ""));
        assert_eq!(budget.current_tokens(), 0);
    }

    #[test]
    fn test_stats() {
        let mut budget = tracker(10);
        budget.admit("a", "abcdefgh");
        let stats = budget.stats();
        assert_eq!(stats.token_model, "heuristic");
        assert_eq!(stats.used_tokens, 2);
        assert_eq!(stats.available_tokens, 8);
        assert_eq!(stats.admitted, 1);
    }
}
