//! Command-line surface (spec §10.3): flags flatten onto `VolleyOptions`
//! fields with the same defaults the core documents.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use cliffy_core::{OutputFormat, ThinkingFormat, Verbosity, VolleyOptions};

fn default_max_concurrent() -> usize {
    num_cpus::get().clamp(1, 8)
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Text,
    Json,
    Diff,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(value: OutputFormatArg) -> Self {
        match value {
            OutputFormatArg::Text => OutputFormat::Text,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Diff => OutputFormat::Diff,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThinkingFormatArg {
    Text,
    Json,
}

impl From<ThinkingFormatArg> for ThinkingFormat {
    fn from(value: ThinkingFormatArg) -> Self {
        match value {
            ThinkingFormatArg::Text => ThinkingFormat::Text,
            ThinkingFormatArg::Json => ThinkingFormat::Json,
        }
    }
}

/// Runs a batch of independent LLM coding tasks through the Volley
/// scheduler and prints the results.
#[derive(Debug, Parser)]
#[command(name = "cliffy", version, about)]
pub struct Cli {
    /// One task prompt per argument. Ignored if `--prompts-file` is set.
    pub tasks: Vec<String>,

    /// Read task prompts from a file, one per line, instead of argv.
    #[arg(long, value_name = "PATH")]
    pub prompts_file: Option<PathBuf>,

    /// Prepended to every task's prompt.
    #[arg(long, default_value = "")]
    pub context: String,

    #[arg(long, default_value_t = default_max_concurrent())]
    pub max_concurrent: usize,

    #[arg(long, default_value_t = 2)]
    pub max_retries: u32,

    /// Disable the live progress display even on a TTY.
    #[arg(long)]
    pub no_progress: bool,

    #[arg(long)]
    pub no_summary: bool,

    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormatArg,

    /// Cancel all remaining work on the first task failure.
    #[arg(long)]
    pub fail_fast: bool,

    #[arg(long)]
    pub show_thinking: bool,

    #[arg(long, value_enum, default_value = "text")]
    pub thinking_format: ThinkingFormatArg,

    /// Emit one NDJSON object per tool execution to stderr.
    #[arg(long)]
    pub emit_tool_trace: bool,

    #[arg(short, long)]
    pub quiet: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn volley_options(&self) -> VolleyOptions {
        let verbosity = if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };

        VolleyOptions {
            context: self.context.clone(),
            max_concurrent: self.max_concurrent.max(1),
            max_retries: self.max_retries,
            show_progress: !self.no_progress && !self.quiet,
            show_summary: !self.no_summary,
            output_format: self.output.into(),
            fail_fast: self.fail_fast,
            show_thinking: self.show_thinking,
            thinking_format: self.thinking_format.into(),
            emit_tool_trace: self.emit_tool_trace,
            verbosity,
        }
    }
}
