//! Structural scanning - lightweight relationship extraction per language
//!
//! Provides:
//! - python: exact syntax tree walk (tree-sitter)
//! - heuristic: line-pattern rules for JavaScript/TypeScript, Go, Java, Rust
//!
//! Each scan yields the raw signal inputs for scoring: imported module
//! tokens, base types (inheritance, interfaces, embedding) and call sites.

pub mod heuristic;
pub mod python;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::core::model::CtxError;

/// Languages the scanner knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    Rust,
    Unknown,
}

impl Language {
    /// Detect language from file extension
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match ext.as_deref() {
            Some("py") | Some("pyi") => Language::Python,
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Language::JavaScript,
            Some("ts") | Some("tsx") | Some("mts") | Some("cts") => Language::TypeScript,
            Some("go") => Language::Go,
            Some("java") => Language::Java,
            Some("rs") => Language::Rust,
            _ => Language::Unknown,
        }
    }
}

/// How a base type is referenced, which decides its weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseForm {
    /// Plain name: `class A(Base)`, `extends Base`, embedded `Base`
    Direct,
    /// Attribute access, qualified name or interface: `module.Base`,
    /// `implements Iface`, embedded `pkg.Base`
    Qualified,
}

/// One base type of a class, struct or trait
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BaseRef {
    pub name: String,
    pub form: BaseForm,
}

impl BaseRef {
    pub fn direct(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            form: BaseForm::Direct,
        }
    }

    pub fn qualified(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            form: BaseForm::Qualified,
        }
    }
}

/// Raw structural signal inputs extracted from one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralSignals {
    /// Distinct imported module tokens
    pub imports: BTreeSet<String>,
    /// Base types, one per occurrence
    pub bases: Vec<BaseRef>,
    /// Callee names, one per call site
    pub calls: Vec<String>,
}

impl StructuralSignals {
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.bases.is_empty() && self.calls.is_empty()
    }
}

/// Extract structural signals from `content`, dispatching on the language of `path`.
///
/// Only the exact Python path can fail; heuristic languages return whatever
/// they recognise and unknown languages yield empty signals.
pub fn scan(path: &str, content: &str) -> Result<StructuralSignals, CtxError> {
    match Language::from_path(path) {
        Language::Python => python::scan(path, content),
        Language::Unknown => Ok(StructuralSignals::default()),
        lang => Ok(heuristic::scan(lang, content)),
    }
}
