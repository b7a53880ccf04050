//! CLI module - Command-line interface definitions and handlers

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::backends::scan::{ScanOptions, DEFAULT_MAX_FILE_BYTES};
use crate::core::model::{PatternSet, TargetSet};
use crate::core::render::{OutputFormat, RenderConfig};
use crate::core::tokenizer::{TokenModel, TokenProfile, DEFAULT_MAX_TOKENS};
use crate::flows::assemble::{AssembleOptions, PackRequest, DEFAULT_MAX_FILES_PER_LEVEL};
use crate::flows::score::ScoreRequest;
use crate::scoring::{ScoringConfig, SemanticPolicy};

/// ctxpack - rank source files by relevance and pack them into a token budget.
#[derive(Parser, Debug)]
#[command(name = "ctxpack")]
#[command(
    author,
    version,
    about,
    long_about = r#"ctxpack scores how related each source file is to a set of targets and packs
the most relevant ones into a token-budgeted, depth-grouped context.

Output formats:
- json: a single JSON document (default)
- jsonl: one JSON object per line
- md: human-friendly Markdown

Examples:
    ctxpack pack --max-tokens 8000
    ctxpack pack --targets auth,session --patterns '*.py' --stats
    ctxpack score --targets auth --oracle-cmd 'llm -m mini'
    ctxpack tokens src/main.py --model gpt-4o
"#
)]
pub struct Cli {
    /// Root directory for all operations.
    #[arg(
        long,
        global = true,
        default_value = ".",
        value_name = "ROOT",
        long_help = "Root directory for all operations (defaults to the current directory).\n\n\
All paths emitted in results are relative to this root."
    )]
    pub root: PathBuf,

    /// Output format (json/jsonl/md).
    #[arg(
        long,
        global = true,
        default_value = "json",
        value_name = "FORMAT",
        long_help = "Select the output format.\n\n\
Supported values:\n\
- json (default)\n\
- jsonl\n\
- md (markdown)"
    )]
    pub format: String,

    /// Quiet mode (errors only on stderr).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Only log errors. Results are still printed to stdout.\n\n\
Ignored when RUST_LOG is set."
    )]
    pub quiet: bool,

    /// Verbose mode (debug logging).
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "quiet",
        long_help = "Log scoring and admission decisions at debug level on stderr.\n\n\
Ignored when RUST_LOG is set."
    )]
    pub verbose: bool,

    /// Pretty-print JSON/JSONL output with indentation.
    #[arg(
        long,
        global = true,
        long_help = "Pretty-print JSON and JSONL output with indentation for human readability.\n\n\
Has no effect on md."
    )]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that discovers and scores files
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Target names (comma-separated).
    #[arg(
        long,
        value_name = "NAMES",
        value_delimiter = ',',
        long_help = "Comma-separated target names. A file whose path contains a target\n\
(case-insensitive) is a direct match with priority 1.0; other files are scored\n\
on imports, inheritance, calls and the semantic oracle.\n\n\
Without targets no scoring happens.\n\n\
Example: --targets auth,session"
    )]
    pub targets: Vec<String>,

    /// File patterns (comma-separated globs, e.g. '*.py,*.go').
    #[arg(
        long,
        value_name = "GLOBS",
        value_delimiter = ',',
        long_help = "Comma-separated suffix globs. Only matching files are discovered.\n\
The leading '*' is stripped, so '*.py' matches any path ending in '.py'.\n\n\
Default: all files."
    )]
    pub patterns: Vec<String>,

    /// Shell command used as the semantic oracle.
    #[arg(
        long,
        value_name = "CMD",
        env = "CTXPACK_ORACLE_CMD",
        long_help = "Shell command that rates semantic relatedness. The prompt is written to\n\
its stdin; stdout must be a bare number in [0.0, 0.4]. Anything else, or a\n\
non-zero exit, counts as 0.0.\n\n\
Without a command every semantic score is 0.0."
    )]
    pub oracle_cmd: Option<String>,

    /// When to ask the oracle (always/when-structural-weak).
    #[arg(
        long,
        default_value = "always",
        value_name = "POLICY",
        long_help = "When to ask the semantic oracle.\n\n\
Supported values:\n\
- always (default): every file that is not a direct match\n\
- when-structural-weak: only files whose structural score is below 0.3"
    )]
    pub semantic_policy: String,

    /// Include hidden files.
    #[arg(long)]
    pub hidden: bool,

    /// Do not respect .gitignore.
    #[arg(long)]
    pub no_ignore: bool,

    /// Skip files larger than N bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_BYTES, value_name = "N")]
    pub max_file_bytes: u64,
}

impl SelectionArgs {
    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            hidden: self.hidden,
            ignore: !self.no_ignore,
            max_file_bytes: self.max_file_bytes,
        }
    }

    fn scoring_config(&self) -> Result<ScoringConfig> {
        let semantic_policy: SemanticPolicy = self
            .semantic_policy
            .parse()
            .map_err(anyhow::Error::msg)?;
        Ok(ScoringConfig {
            semantic_policy,
            ..Default::default()
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pack files into a token-budgeted hierarchical context.
    #[command(
        long_about = "Discover files under ROOT, score them against --targets and pack them\n\
into levels by path depth. Each level is ordered by target matches, priority,\n\
non-test first and length, capped at --max-files-per-level, then admitted\n\
greedily: full content, else a summary, else nothing.\n\n\
Examples:\n\
  ctxpack pack --max-tokens 8000\n\
  ctxpack pack --targets auth --patterns '*.py' --stats --format md\n"
    )]
    Pack {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Token ceiling of the context.
        #[arg(
            long,
            env = "CTXPACK_MAX_TOKENS",
            default_value_t = DEFAULT_MAX_TOKENS,
            value_name = "N"
        )]
        max_tokens: usize,

        /// Token model used for counting.
        #[arg(
            long,
            env = "CTXPACK_MODEL",
            default_value = "gpt-4",
            value_name = "MODEL",
            long_help = "Token model used for every admission decision.\n\n\
Supported values: cl100k, o200k, gpt-4 (default), gpt-4o, gpt-3.5-turbo,\n\
claude3, heuristic"
        )]
        model: String,

        /// Files kept per depth level.
        #[arg(
            long,
            env = "CTXPACK_MAX_FILES_PER_LEVEL",
            default_value_t = DEFAULT_MAX_FILES_PER_LEVEL,
            value_name = "N"
        )]
        max_files_per_level: usize,

        /// Show pack statistics on stderr.
        #[arg(long)]
        stats: bool,
    },

    /// Score files against targets and print the report.
    #[command(
        long_about = "Discover files under ROOT and print each file's relationship score\n\
(import, inheritance, calls, semantic) together with the priority map.\n\n\
Example:\n\
  ctxpack score --targets auth --patterns '*.py'\n"
    )]
    Score {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Count tokens of files.
    #[command(long_about = "Print the token count of each FILE under the chosen model.\n\n\
Example:\n\
  ctxpack tokens src/app.py src/auth.py --model gpt-4o\n")]
    Tokens {
        /// Files to count, relative to ROOT.
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Token model used for counting.
        #[arg(long, env = "CTXPACK_MODEL", default_value = "gpt-4", value_name = "MODEL")]
        model: String,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let format: OutputFormat = cli.format.parse().map_err(anyhow::Error::msg)?;
    let render_config = RenderConfig::with_pretty(format, cli.pretty);

    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("Invalid root: {}", cli.root.display()))?;

    match cli.command {
        Commands::Pack {
            selection,
            max_tokens,
            model,
            max_files_per_level,
            stats,
        } => {
            let model: TokenModel = model.parse()?;
            let req = PackRequest {
                scan: selection.scan_options(),
                options: AssembleOptions {
                    max_files_per_level,
                    targets: TargetSet::new(&selection.targets),
                    patterns: PatternSet::from_globs(&selection.patterns),
                },
                profile: TokenProfile::new(model, max_tokens),
                scoring: selection.scoring_config()?,
                oracle_cmd: selection.oracle_cmd,
                show_stats: stats,
            };
            crate::flows::assemble::run_pack(&root, req, render_config)
        }

        Commands::Score { selection } => {
            let req = ScoreRequest {
                scan: selection.scan_options(),
                patterns: PatternSet::from_globs(&selection.patterns),
                targets: TargetSet::new(&selection.targets),
                scoring: selection.scoring_config()?,
                oracle_cmd: selection.oracle_cmd,
            };
            crate::flows::score::run_score(&root, req, render_config)
        }

        Commands::Tokens { files, model } => {
            let model: TokenModel = model.parse()?;
            crate::flows::tokens::run_tokens(&root, &files, model, render_config)
        }
    }
}
