//! Renderer module
//!
//! Renders assembled contexts, score reports and token counts to json,
//! jsonl or md

use serde::Serialize;
use std::fmt::Write as _;

use crate::core::model::{ContextEntry, EntryKind, HierarchicalContext};
use crate::core::tokenizer::TokenCount;
use crate::scoring::RelationshipAnalysis;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Jsonl,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Render configuration combining format and options
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl RenderConfig {
    #[allow(dead_code)]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            pretty: false,
        }
    }

    pub fn with_pretty(format: OutputFormat, pretty: bool) -> Self {
        Self { format, pretty }
    }
}

/// One jsonl line of a context: the entry plus its depth
#[derive(Serialize)]
struct LevelEntry<'a> {
    depth: usize,
    #[serde(flatten)]
    entry: &'a ContextEntry,
}

pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    #[allow(dead_code)]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            config: RenderConfig::new(format),
        }
    }

    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render an assembled context
    pub fn render_context(&self, context: &HierarchicalContext) -> String {
        match self.config.format {
            OutputFormat::Json => self.to_json(context),
            OutputFormat::Jsonl => self.to_jsonl(
                context
                    .entries()
                    .map(|(depth, entry)| LevelEntry { depth, entry }),
            ),
            OutputFormat::Markdown => context_markdown(context),
        }
    }

    /// Render a relationship analysis report
    pub fn render_analysis(&self, analysis: &RelationshipAnalysis) -> String {
        match self.config.format {
            OutputFormat::Json => self.to_json(analysis),
            OutputFormat::Jsonl => self.to_jsonl(analysis.scores.iter()),
            OutputFormat::Markdown => analysis_markdown(analysis),
        }
    }

    /// Render per-file token counts
    pub fn render_token_counts(&self, counts: &[TokenCount]) -> String {
        match self.config.format {
            OutputFormat::Json => self.to_json(&counts),
            OutputFormat::Jsonl => self.to_jsonl(counts.iter()),
            OutputFormat::Markdown => token_counts_markdown(counts),
        }
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        if self.config.pretty {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
        }
    }

    /// One JSON object per line
    fn to_jsonl<T: Serialize>(&self, items: impl Iterator<Item = T>) -> String {
        items
            .filter_map(|item| {
                if self.config.pretty {
                    serde_json::to_string_pretty(&item).ok()
                } else {
                    serde_json::to_string(&item).ok()
                }
            })
            .collect::<Vec<_>>()
            .join(if self.config.pretty { "\n\n" } else { "\n" })
    }
}

fn context_markdown(context: &HierarchicalContext) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "# Context\n\n{} of {} files included\n",
        context.entry_count(),
        context.total_files
    );

    if !context.target_focused_files.is_empty() {
        output.push_str("## Target-focused files\n\n");
        for path in &context.target_focused_files {
            let _ = writeln!(output, "- `{}`", path);
        }
        output.push('\n');
    }

    for (depth, entries) in &context.levels {
        let _ = writeln!(output, "## Level {}\n", depth);
        for entry in entries {
            let _ = write!(output, "### `{}`", entry.path);
            if entry.kind == EntryKind::Summary {
                output.push_str(" (summary)");
            }
            if entry.priority > 0.0 {
                let _ = write!(output, " priority {:.3}", entry.priority);
            }
            let fence = code_fence(&entry.content);
            let _ = writeln!(output, "\n\n{}", fence);
            output.push_str(&entry.content);
            if !entry.content.ends_with('\n') {
                output.push('\n');
            }
            let _ = writeln!(output, "{}\n", fence);
        }
    }

    output
}

/// Backtick fence longer than any backtick run inside `content`
fn code_fence(content: &str) -> String {
    let longest = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

fn analysis_markdown(analysis: &RelationshipAnalysis) -> String {
    let mut output = String::new();
    if analysis.scores.is_empty() {
        return output;
    }

    output.push_str("| path | priority | import | inheritance | calls | semantic |\n");
    output.push_str("|---|---|---|---|---|---|\n");
    for file in &analysis.scores {
        let marker = if file.direct_match {
            " (direct)"
        } else if file.failed {
            " (failed)"
        } else {
            ""
        };
        let _ = writeln!(
            output,
            "| `{}`{} | {:.3} | {:.2} | {:.2} | {:.2} | {:.2} |",
            file.path,
            marker,
            file.priority,
            file.score.direct_import,
            file.score.inheritance,
            file.score.function_calls,
            file.score.semantic
        );
    }
    output
}

fn token_counts_markdown(counts: &[TokenCount]) -> String {
    let mut output = String::new();
    if counts.is_empty() {
        return output;
    }

    output.push_str("| path | tokens | chars |\n|---|---|---|\n");
    for count in counts {
        let _ = writeln!(output, "| `{}` | {} | {} |", count.path, count.tokens, count.chars);
    }
    let total: usize = counts.iter().map(|c| c.tokens).sum();
    let _ = writeln!(output, "\nTotal: {} tokens ({})", total, counts[0].model);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::RelationshipScore;
    use crate::scoring::FileScore;

    fn sample_context() -> HierarchicalContext {
        let mut context = HierarchicalContext::new(3);
        context.levels.insert(
            1,
            vec![ContextEntry {
                path: "auth.py".to_string(),
                kind: EntryKind::Full,
                content: "class Auth:\n    pass\n".to_string(),
                priority: 1.0,
            }],
        );
        context.levels.insert(
            2,
            vec![ContextEntry {
                path: "src/big.py".to_string(),
                kind: EntryKind::Summary,
                content: "File: src/big.py\n...".to_string(),
                priority: 0.0,
            }],
        );
        context.target_focused_files.push("auth.py".to_string());
        context
    }

    #[test]
    fn test_render_context_json_contract() {
        let output = Renderer::new(OutputFormat::Json).render_context(&sample_context());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["total_files"], 3);
        assert_eq!(value["target_focused_files"][0], "auth.py");
        assert!(value["file_summaries"].as_object().unwrap().is_empty());
        assert_eq!(value["levels"]["1"][0]["type"], "full");
        assert_eq!(value["levels"]["2"][0]["type"], "summary");
        assert_eq!(value["levels"]["1"][0]["priority"], 1.0);
    }

    #[test]
    fn test_render_context_jsonl() {
        let output = Renderer::new(OutputFormat::Jsonl).render_context(&sample_context());
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["depth"], 1);
        assert_eq!(lines[0]["path"], "auth.py");
        assert_eq!(lines[1]["depth"], 2);
        assert_eq!(lines[1]["type"], "summary");
    }

    #[test]
    fn test_render_context_markdown() {
        let output = Renderer::new(OutputFormat::Markdown).render_context(&sample_context());
        assert!(output.contains("2 of 3 files included"));
        assert!(output.contains("## Level 1"));
        assert!(output.contains("### `src/big.py` (summary)"));
        assert!(output.contains("```\nclass Auth:\n    pass\n```"));
    }

    #[test]
    fn test_render_context_markdown_nested_fence() {
        let mut context = HierarchicalContext::new(1);
        context.levels.insert(
            1,
            vec![ContextEntry {
                path: "README.md".to_string(),
                kind: EntryKind::Full,
                content: "Usage:\n```bash\nctxpack pack\n```\n".to_string(),
                priority: 0.0,
            }],
        );
        let output = Renderer::new(OutputFormat::Markdown).render_context(&context);
        assert!(output.contains("````\nUsage:\n```bash\nctxpack pack\n```\n````\n"));
    }

    #[test]
    fn test_code_fence_length() {
        assert_eq!(code_fence("plain"), "```");
        assert_eq!(code_fence("inline `x`"), "```");
        assert_eq!(code_fence("```\n"), "````");
        assert_eq!(code_fence("`````"), "``````");
    }

    #[test]
    fn test_render_json_pretty() {
        let config = RenderConfig::with_pretty(OutputFormat::Json, true);
        let output = Renderer::with_config(config).render_context(&sample_context());
        assert!(output.contains("  \"levels\""));
    }

    #[test]
    fn test_render_analysis() {
        let mut analysis = RelationshipAnalysis::default();
        analysis.priorities.insert("views.py".to_string(), 0.15);
        analysis.scores.push(FileScore {
            path: "views.py".to_string(),
            direct_match: false,
            score: RelationshipScore {
                direct_import: 0.2,
                inheritance: 0.3,
                ..Default::default()
            },
            priority: 0.15,
            failed: false,
        });

        let json = Renderer::new(OutputFormat::Json).render_analysis(&analysis);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["priorities"]["views.py"], 0.15);
        assert_eq!(value["scores"][0]["score"]["inheritance"], 0.3);
        assert!(value["scores"][0].get("failed").is_none());

        let md = Renderer::new(OutputFormat::Markdown).render_analysis(&analysis);
        assert!(md.contains("| `views.py` | 0.150 | 0.20 | 0.30 | 0.00 | 0.00 |"));
    }

    #[test]
    fn test_render_token_counts() {
        let counts = vec![
            TokenCount {
                path: "a.py".to_string(),
                model: "heuristic".to_string(),
                tokens: 3,
                chars: 12,
            },
            TokenCount {
                path: "b.py".to_string(),
                model: "heuristic".to_string(),
                tokens: 4,
                chars: 16,
            },
        ];
        let jsonl = Renderer::new(OutputFormat::Jsonl).render_token_counts(&counts);
        assert_eq!(jsonl.lines().count(), 2);

        let md = Renderer::new(OutputFormat::Markdown).render_token_counts(&counts);
        assert!(md.contains("Total: 7 tokens (heuristic)"));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("JSONL".parse::<OutputFormat>().unwrap(), OutputFormat::Jsonl);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("Markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("raw".parse::<OutputFormat>().unwrap_err().contains("Unknown format"));
    }

    #[test]
    fn test_render_config_default() {
        let config = RenderConfig::default();
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.pretty);
    }
}
