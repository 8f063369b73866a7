//! Scheduler configuration and the aggregate summary it produces
//! (spec §3).

use std::time::Duration;

/// How reasoning/thinking content is rendered when `show_thinking` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkingFormat {
    Text,
    Json,
}

/// Gates progress and per-task stats independently of `show_progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

/// Consumed by an external formatter, not the scheduler itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Diff,
}

/// Everything the scheduler needs to run one volley.
#[derive(Debug, Clone)]
pub struct VolleyOptions {
    /// Prepended to every task's prompt; empty = none.
    pub context: String,
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub show_progress: bool,
    pub show_summary: bool,
    pub output_format: OutputFormat,
    /// Cancel the shared context on the first `failed` result.
    pub fail_fast: bool,
    pub show_thinking: bool,
    pub thinking_format: ThinkingFormat,
    /// Emit one NDJSON object per tool execution to stderr.
    pub emit_tool_trace: bool,
    pub verbosity: Verbosity,
}

impl Default for VolleyOptions {
    fn default() -> Self {
        Self {
            context: String::new(),
            max_concurrent: 1,
            max_retries: 2,
            show_progress: true,
            show_summary: true,
            output_format: OutputFormat::Text,
            fail_fast: false,
            show_thinking: false,
            thinking_format: ThinkingFormat::Text,
            emit_tool_trace: false,
            verbosity: Verbosity::Normal,
        }
    }
}

/// Aggregate results for a completed (or canceled) volley.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolleySummary {
    pub total_tasks: usize,
    pub succeeded_tasks: usize,
    pub failed_tasks: usize,
    pub canceled_tasks: usize,
    pub duration: Duration,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// Succeeded tasks only; zero if none succeeded.
    pub avg_tokens_per_task: f64,
    /// Open question (spec §9): the observed peak, not the configured cap.
    pub max_concurrent_used: usize,
    pub total_retries: u32,
}
