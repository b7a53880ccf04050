//! Python scanning over a tree-sitter syntax tree
//!
//! Collects top-level imported module names, class bases and callee names.
//! A tree containing error nodes, or Python 2 only statements the grammar
//! still accepts, is treated as a syntax error for the whole file.

use tree_sitter::{Node, Parser};

use crate::core::model::CtxError;
use crate::scanner::{BaseRef, StructuralSignals};

fn new_parser() -> Result<Parser, CtxError> {
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| CtxError::syntax("<parser>", format!("Failed to set language: {e}")))?;
    Ok(parser)
}

/// Statements the grammar keeps from Python 2 but current Python rejects
const LEGACY_STATEMENTS: &[&str] = &["print_statement", "exec_statement"];

/// Parse `content` and extract its structural signals
pub fn scan(path: &str, content: &str) -> Result<StructuralSignals, CtxError> {
    let mut parser = new_parser()?;
    let tree = parser
        .parse(content, None)
        .ok_or_else(|| CtxError::syntax(path, "parser produced no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(CtxError::syntax(path, first_error_location(root)));
    }

    let source = content.as_bytes();
    let mut signals = StructuralSignals::default();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_statement" => collect_import_names(node, source, &mut signals),
            "import_from_statement" => {
                if let Some(module) = node.child_by_field_name("module_name") {
                    if let Some(name) = from_module_name(module, source) {
                        signals.imports.insert(name);
                    }
                }
            }
            "future_import_statement" => {
                signals.imports.insert("__future__".to_string());
            }
            "class_definition" => collect_bases(node, source, &mut signals),
            kind if LEGACY_STATEMENTS.contains(&kind) => {
                let line = node.start_position().row + 1;
                return Err(CtxError::syntax(
                    path,
                    format!("invalid syntax at line {line}: Python 2 {kind}"),
                ));
            }
            "call" => {
                if let Some(callee) = node
                    .child_by_field_name("function")
                    .and_then(|f| callee_name(f, source))
                {
                    signals.calls.push(callee);
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }

    Ok(signals)
}

fn text<'a>(node: Node, source: &'a [u8]) -> Option<&'a str> {
    node.utf8_text(source).ok()
}

/// First segment of a dotted module path: `os.path` -> `os`
fn first_segment(dotted: &str) -> Option<String> {
    dotted
        .split('.')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `import a.b, c as d` records `a` and `c`
fn collect_import_names(node: Node, source: &[u8], signals: &mut StructuralSignals) {
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let dotted = match name.kind() {
            "aliased_import" => name.child_by_field_name("name"),
            _ => Some(name),
        };
        if let Some(module) = dotted
            .and_then(|n| text(n, source))
            .and_then(first_segment)
        {
            signals.imports.insert(module);
        }
    }
}

/// Module of `from X import Y`. Bare relative imports (`from . import x`)
/// name no module and yield nothing.
fn from_module_name(module: Node, source: &[u8]) -> Option<String> {
    match module.kind() {
        "relative_import" => {
            let mut cursor = module.walk();
            let dotted = module
                .named_children(&mut cursor)
                .find(|c| c.kind() == "dotted_name");
            dotted.and_then(|d| text(d, source)).and_then(first_segment)
        }
        _ => text(module, source).and_then(first_segment),
    }
}

/// `class A(Base, mod.Other, metaclass=M)` records `Base` (direct) and
/// `Other` (qualified). Keyword arguments are not bases.
fn collect_bases(node: Node, source: &[u8], signals: &mut StructuralSignals) {
    let Some(superclasses) = node.child_by_field_name("superclasses") else {
        return;
    };
    let mut cursor = superclasses.walk();
    for base in superclasses.named_children(&mut cursor) {
        match base.kind() {
            "identifier" => {
                if let Some(name) = text(base, source) {
                    signals.bases.push(BaseRef::direct(name));
                }
            }
            "attribute" => {
                if let Some(attr) = base
                    .child_by_field_name("attribute")
                    .and_then(|a| text(a, source))
                {
                    signals.bases.push(BaseRef::qualified(attr));
                }
            }
            _ => {}
        }
    }
}

/// `f(...)` -> `f`, `obj.method(...)` -> `method`; other callee shapes
/// (subscripts, calls of calls) have no name.
fn callee_name(function: Node, source: &[u8]) -> Option<String> {
    match function.kind() {
        "identifier" => text(function, source).map(str::to_string),
        "attribute" => function
            .child_by_field_name("attribute")
            .and_then(|a| text(a, source))
            .map(str::to_string),
        _ => None,
    }
}

fn first_error_location(root: Node) -> String {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            return format!("invalid syntax at line {}", pos.row + 1);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    "invalid syntax".to_string()
}
