//! Data model: `Task`, `TaskStatus`, `TaskResult`, and tool-execution
//! metadata (spec §3).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One prompt to run against the Agent. Immutable after submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// 1-based position in the submitted batch.
    pub index: usize,
    pub prompt: String,
}

impl Task {
    pub fn new(index: usize, prompt: impl Into<String>) -> Self {
        Self {
            index,
            prompt: prompt.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Retrying,
    Success,
    Failed,
    Canceled,
}

/// A single tool invocation observed during a task's final attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionMetadata {
    pub tool_name: String,
    /// Free-form display fields: command, file path, operation, etc.
    pub display: serde_json::Value,
    pub duration: Duration,
    /// Present for shell-like tools; non-zero marks the tool failed.
    pub exit_code: Option<i32>,
}

/// Token usage for one task. Input tokens fold in any cache-read tokens
/// the provider reports (spec §4.7).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Pricing for the model used, in dollars per million tokens.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub cost_per_1m_in: f64,
    pub cost_per_1m_out: f64,
}

impl ModelPricing {
    pub fn cost(&self, usage: Usage) -> f64 {
        usage.input_tokens as f64 * self.cost_per_1m_in / 1e6
            + usage.output_tokens as f64 * self.cost_per_1m_out / 1e6
    }
}

/// One result per `Task`, written exactly once at `results[Task.index - 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task: Task,
    pub status: TaskStatus,
    pub output: String,
    pub error: Option<String>,
    pub duration: Duration,
    pub usage: Usage,
    pub cost: f64,
    /// Attempts beyond the first; `0` on first-attempt success.
    pub retries: u32,
    pub worker_id: usize,
    pub model: String,
    pub tool_metadata: Vec<ToolExecutionMetadata>,
}

impl TaskResult {
    /// A `pending` placeholder for a task before it has been scheduled,
    /// per spec §4.6 step 2 ("each entry pending with its task embedded").
    pub fn pending(task: Task) -> Self {
        Self {
            task,
            status: TaskStatus::Pending,
            output: String::new(),
            error: None,
            duration: Duration::ZERO,
            usage: Usage::default(),
            cost: 0.0,
            retries: 0,
            worker_id: 0,
            model: String::new(),
            tool_metadata: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pending_result_is_a_zeroed_placeholder() {
        let task = Task::new(1, "do a thing");
        let result = TaskResult::pending(task.clone());
        assert_eq!(result.task.index, task.index);
        assert_eq!(result.status, TaskStatus::Pending);
        assert_eq!(result.usage.total_tokens(), 0);
        assert_eq!(result.cost, 0.0);
        assert!(result.tool_metadata.is_empty());
    }

    #[test]
    fn model_pricing_applies_per_million_rates() {
        let pricing = ModelPricing {
            cost_per_1m_in: 3.0,
            cost_per_1m_out: 15.0,
        };
        let usage = Usage {
            input_tokens: 1_000_000,
            output_tokens: 500_000,
        };
        assert_eq!(pricing.cost(usage), 3.0 + 7.5);
    }
}
