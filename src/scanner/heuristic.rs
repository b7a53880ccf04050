//! Line-pattern scanning for languages without a syntax tree
//!
//! These rules are deliberately approximate: they read one line at a time
//! and never fail. Whatever a line does not obviously express is ignored.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scanner::{BaseRef, Language, StructuralSignals};

static JS_FROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:(?:import|export)\b.*?|\}\s*)\bfrom\s+['"`]([^'"`]+)['"`]"#)
        .expect("Invalid JS_FROM_RE regex")
});

static JS_BARE_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^import\s+['"`]([^'"`]+)['"`]"#).expect("Invalid JS_BARE_IMPORT_RE regex")
});

static JS_REQUIRE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:require|import)\(\s*['"`]([^'"`]+)['"`]\s*\)"#)
        .expect("Invalid JS_REQUIRE_RE regex")
});

static CLASS_EXTENDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bclass\s+[\w$]+(?:\s*<.*?>)?\s+extends\s+([\w$.]+)")
        .expect("Invalid CLASS_EXTENDS_RE regex")
});

static INTERFACE_EXTENDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\binterface\s+[\w$]+(?:\s*<.*?>)?\s+extends\s+([^{]+)")
        .expect("Invalid INTERFACE_EXTENDS_RE regex")
});

static IMPLEMENTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bimplements\s+([^{]+)").expect("Invalid IMPLEMENTS_RE regex"));

static JAVA_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^import\s+(?:static\s+)?([\w.]+?)(?:\.\*)?\s*;").expect("Invalid JAVA_IMPORT_RE regex")
});

static GO_TYPE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^type\s+\w+(?:\[.*?\])?\s+(?:struct|interface)\s*\{\s*(?://.*)?$")
        .expect("Invalid GO_TYPE_BLOCK_RE regex")
});

static RUST_USE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(use|mod)\s+([^;]+);?").expect("Invalid RUST_USE_RE regex")
});

static RUST_IMPL_FOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:unsafe\s+)?impl\b(?:\s*<.*?>)?\s+([\w:]+)(?:<.*?>)?\s+for\s+")
        .expect("Invalid RUST_IMPL_FOR_RE regex")
});

static RUST_SUPERTRAIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+\w+(?:<.*?>)?\s*:\s*([^{]+)")
        .expect("Invalid RUST_SUPERTRAIT_RE regex")
});

/// Words that precede a '(' without making the line a call
const NON_CALL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "match", "return", "catch", "with", "elif", "else", "fn",
    "func", "function", "def", "constructor", "typeof", "sizeof", "foreach", "loop", "until",
];

/// Words that introduce a definition, so the following name is not a call
const DEFINITION_KEYWORDS: &[&str] = &[
    "fn", "func", "function", "def", "class", "struct", "interface", "enum", "trait", "type",
];

/// Scan `content` with the line rules for `lang`
pub fn scan(lang: Language, content: &str) -> StructuralSignals {
    let mut signals = StructuralSignals::default();
    match lang {
        Language::JavaScript | Language::TypeScript => scan_js(content, &mut signals),
        Language::Go => scan_go(content, &mut signals),
        Language::Java => scan_java(content, &mut signals),
        Language::Rust => scan_rust(content, &mut signals),
        Language::Python | Language::Unknown => return signals,
    }
    signals.calls = extract_calls(content);
    signals
}

fn is_comment(line: &str) -> bool {
    line.starts_with("//") || line.starts_with("/*") || line.starts_with('*') || line.starts_with('#')
}

/// Remove `<...>` generic argument lists, nested or not
fn strip_generics(s: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Last segment of a `.` or `::` qualified name
fn last_segment(name: &str) -> &str {
    let after_dot = name.rsplit('.').next().unwrap_or(name);
    after_dot.rsplit("::").next().unwrap_or(after_dot)
}

/// Base reference for a possibly qualified name: qualified names weigh less
fn base_from_name(name: &str) -> Option<BaseRef> {
    let name = name.trim().trim_start_matches('*');
    if name.is_empty() {
        return None;
    }
    if name.contains('.') || name.contains("::") {
        let last = last_segment(name);
        (!last.is_empty()).then(|| BaseRef::qualified(last))
    } else {
        Some(BaseRef::direct(name))
    }
}

/// Interface list such as `A, b.B<T>, C` -> qualified refs
fn interface_list(list: &str, signals: &mut StructuralSignals) {
    for item in strip_generics(list).split(',') {
        let item = item.split_whitespace().next().unwrap_or("");
        let name = last_segment(item);
        if !name.is_empty() {
            signals.bases.push(BaseRef::qualified(name));
        }
    }
}

fn scan_class_lines(line: &str, signals: &mut StructuralSignals) {
    if let Some(parent) = CLASS_EXTENDS_RE.captures(line).and_then(|c| c.get(1)) {
        if let Some(base) = base_from_name(parent.as_str()) {
            signals.bases.push(base);
        }
    }
    if let Some(parents) = INTERFACE_EXTENDS_RE.captures(line).and_then(|c| c.get(1)) {
        interface_list(parents.as_str(), signals);
    }
    if let Some(ifaces) = IMPLEMENTS_RE.captures(line).and_then(|c| c.get(1)) {
        interface_list(ifaces.as_str(), signals);
    }
}

fn scan_js(content: &str, signals: &mut StructuralSignals) {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }

        if let Some(m) = JS_FROM_RE.captures(line).and_then(|c| c.get(1)) {
            signals.imports.insert(m.as_str().to_string());
        } else if let Some(m) = JS_BARE_IMPORT_RE.captures(line).and_then(|c| c.get(1)) {
            signals.imports.insert(m.as_str().to_string());
        }
        for caps in JS_REQUIRE_RE.captures_iter(line) {
            signals.imports.insert(caps[1].to_string());
        }

        scan_class_lines(line, signals);
    }
}

fn scan_java(content: &str, signals: &mut StructuralSignals) {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }

        if let Some(m) = JAVA_IMPORT_RE.captures(line).and_then(|c| c.get(1)) {
            signals.imports.insert(m.as_str().to_string());
            continue;
        }

        scan_class_lines(line, signals);
    }
}

fn go_import_path(spec: &str) -> Option<String> {
    let spec = spec.split("//").next().unwrap_or("").trim();
    let path = spec.split_whitespace().last()?.trim_matches(|c| c == '"' || c == '`');
    (!path.is_empty()).then(|| path.to_string())
}

fn scan_go(content: &str, signals: &mut StructuralSignals) {
    let mut in_import_block = false;
    // Brace depth inside a `type X struct {` / `interface {` block
    let mut type_depth = 0usize;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if in_import_block {
            if line.starts_with(')') {
                in_import_block = false;
            } else if let Some(path) = go_import_path(line) {
                signals.imports.insert(path);
            }
            continue;
        }

        if let Some(rest) = line
            .strip_prefix("import")
            .filter(|r| r.starts_with([' ', '\t', '(']))
        {
            let rest = rest.trim();
            if rest.starts_with('(') {
                in_import_block = !rest.contains(')');
            } else if let Some(path) = go_import_path(rest) {
                signals.imports.insert(path);
            }
            continue;
        }

        if type_depth == 0 {
            if GO_TYPE_BLOCK_RE.is_match(line) {
                type_depth = 1;
            }
            continue;
        }

        if type_depth == 1 {
            if let Some(base) = go_embedded_field(line) {
                signals.bases.push(base);
            }
        }

        let opens = line.matches('{').count();
        let closes = line.matches('}').count();
        type_depth = (type_depth + opens).saturating_sub(closes);
    }
}

/// An embedded field is a line holding only a type name, optionally
/// followed by a struct tag: `Base`, `*pkg.Base`, ``io.Reader `json:"r"` ``
fn go_embedded_field(line: &str) -> Option<BaseRef> {
    let line = line.split("//").next().unwrap_or("").trim();
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let name = match tokens.as_slice() {
        [name] => *name,
        [name, tag] if tag.starts_with('`') => *name,
        _ => return None,
    };
    if name.contains(['(', ')', '{', '}', '|', '~', '=']) {
        return None;
    }
    base_from_name(name)
}

/// `use crate::auth::Service` -> `auth`, `use std::{fs, io}` -> `std`,
/// `use crate::{a, b}` -> `a`, `b`
fn rust_use_modules(path: &str) -> Vec<String> {
    let mut path = path.trim();
    loop {
        let stripped = path
            .strip_prefix("crate::")
            .or_else(|| path.strip_prefix("self::"))
            .or_else(|| path.strip_prefix("super::"))
            .or_else(|| path.strip_prefix("::"));
        match stripped {
            Some(rest) => path = rest,
            None => break,
        }
    }

    if let Some(group) = path.strip_prefix('{') {
        return group
            .trim_end_matches('}')
            .split(',')
            .filter_map(|item| item.trim().split("::").next())
            .map(|s| s.trim_matches(|c: char| c == '{' || c == '}').trim())
            .filter(|s| !s.is_empty() && *s != "self")
            .map(str::to_string)
            .collect();
    }

    path.split("::")
        .next()
        .map(|s| s.split_whitespace().next().unwrap_or(""))
        .filter(|s| !s.is_empty() && !s.contains('{'))
        .map(|s| vec![s.to_string()])
        .unwrap_or_default()
}

fn scan_rust(content: &str, signals: &mut StructuralSignals) {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if let Some(caps) = RUST_USE_RE.captures(line) {
            let target = caps[2].trim();
            if &caps[1] == "mod" {
                // `mod x { ... }` is inline, not a file module
                if !target.contains('{') {
                    signals.imports.insert(target.to_string());
                }
            } else {
                signals.imports.extend(rust_use_modules(target));
            }
            continue;
        }

        if let Some(m) = RUST_IMPL_FOR_RE.captures(line).and_then(|c| c.get(1)) {
            let name = last_segment(m.as_str());
            if !name.is_empty() {
                signals.bases.push(BaseRef::qualified(name));
            }
        }

        if let Some(m) = RUST_SUPERTRAIT_RE.captures(line).and_then(|c| c.get(1)) {
            let bounds = strip_generics(m.as_str());
            let bounds = bounds.split(" where ").next().unwrap_or("");
            for bound in bounds.split('+') {
                let bound = bound.trim();
                if bound.is_empty() || bound.starts_with('\'') || bound.starts_with('?') {
                    continue;
                }
                if let Some(base) = base_from_name(bound) {
                    signals.bases.push(base);
                }
            }
        }
    }
}

/// Callee of the first call-like `(` on each line.
///
/// The name is the identifier path right before the parenthesis, reduced
/// to its last `.`/`::` segment. Control keywords, definitions and macro
/// invocations are skipped.
pub fn extract_calls(content: &str) -> Vec<String> {
    let mut calls = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }
        let Some(paren) = line.find('(') else {
            continue;
        };
        let prefix = &line[..paren];

        let start = prefix
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | ':'))
            .last()
            .map(|(i, _)| i)
            .unwrap_or(prefix.len());
        let path = &prefix[start..];
        let name = last_segment(path.trim_end_matches(['.', ':']));

        if name.is_empty()
            || name.chars().next().is_some_and(|c| c.is_ascii_digit())
            || NON_CALL_KEYWORDS.contains(&name)
        {
            continue;
        }

        let previous_word = prefix[..start].split_whitespace().last().unwrap_or("");
        if DEFINITION_KEYWORDS.contains(&previous_word) {
            continue;
        }

        calls.push(name.to_string());
    }

    calls
}
