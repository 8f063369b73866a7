//! Single-task lifecycle: build prompt, invoke the Agent, consume its
//! event stream, retry with backoff, assemble the result (spec §4.4).

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::agent::{AgentEvent, AnyAgent};
use crate::backoff::backoff_delay;
use crate::classifier::{classify, should_retry, ErrorClass};
use crate::error::CliffyError;
use crate::message_store::{MessageStore, Role};
use crate::options::VolleyOptions;
use crate::renderer::Renderer;
use crate::task::{ModelPricing, Task, TaskResult, TaskStatus, Usage};
use crate::tool_trace::emit_tool_trace_line;

/// Truncated to the first 200 characters, on a char boundary, for the
/// error-feedback block (spec §4.4 step 2b, §9 open question).
const ERROR_FEEDBACK_OUTPUT_CHARS: usize = 200;

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &s[..byte_index],
        None => s,
    }
}

fn build_prompt(
    options: &VolleyOptions,
    task: &Task,
    attempt: u32,
    last_err: Option<(ErrorClass, &str)>,
    last_output: &str,
) -> String {
    let mut prompt = String::new();
    if !options.context.is_empty() {
        prompt.push_str(&options.context);
        prompt.push_str("\n\n");
    }
    prompt.push_str(&task.prompt);

    if attempt > 0 {
        if let Some((class, message)) = last_err {
            if class != ErrorClass::Network {
                let partial = truncate_chars(last_output, ERROR_FEEDBACK_OUTPUT_CHARS);
                prompt.push_str(&format!(
                    "\n\n[Previous attempt failed with error: {message}\nPartial output: {partial}...\nPlease try a different approach.]"
                ));
            }
        }
    }
    prompt
}

fn session_id(task_index: usize, attempt: u32) -> String {
    let now = chrono::Utc::now();
    format!("task-{task_index}-attempt-{attempt}-{}", now.timestamp_nanos_opt().unwrap_or_default())
}

fn canceled_result(task: Task, worker_id: usize, start: Instant, reason: &str) -> TaskResult {
    let mut result = TaskResult::pending(task);
    result.status = TaskStatus::Canceled;
    result.error = Some(reason.to_string());
    result.duration = start.elapsed();
    result.worker_id = worker_id;
    result
}

/// Runs the retry loop for a single task. Never panics on Agent/store
/// failures; those are folded into the returned result.
pub async fn execute_task(
    task: Task,
    worker_id: usize,
    agent: &AnyAgent,
    message_store: &dyn MessageStore,
    options: &VolleyOptions,
    renderer: Option<&Renderer>,
    cancel: &CancellationToken,
    mut tool_trace_sink: Option<&mut dyn std::io::Write>,
) -> TaskResult {
    let start = Instant::now();
    let model = agent.model();

    tracing::debug!(task_index = task.index, worker_id, model = %model.id, "task started");

    if let Some(r) = renderer {
        r.task_started(task.index, worker_id);
    }

    let mut last_err_class = ErrorClass::Unknown;
    let mut last_err_message = String::new();
    let mut last_output = String::new();
    let mut retries: u32 = 0;

    for attempt in 0..=options.max_retries {
        if attempt > 0 {
            tracing::warn!(
                task_index = task.index,
                worker_id,
                attempt,
                error_class = ?last_err_class,
                error = %last_err_message,
                "retrying task"
            );
            if let Some(r) = renderer {
                r.task_retrying(task.index, last_err_class, &last_err_message);
            }
            let delay = backoff_delay(last_err_class, attempt);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    return canceled_result(
                        task,
                        worker_id,
                        start,
                        "task canceled due to fail-fast or context cancellation",
                    );
                }
            }
        }

        if cancel.is_cancelled() {
            return canceled_result(
                task,
                worker_id,
                start,
                "task canceled due to fail-fast or context cancellation",
            );
        }

        let last_err_for_prompt = if attempt > 0 {
            Some((last_err_class, last_err_message.as_str()))
        } else {
            None
        };
        let prompt = build_prompt(options, &task, attempt, last_err_for_prompt, &last_output);
        let session = session_id(task.index, attempt);

        let run_result = tokio::select! {
            res = agent.run(&session, &prompt) => res,
            _ = cancel.cancelled() => {
                return canceled_result(
                    task,
                    worker_id,
                    start,
                    "task canceled due to fail-fast or context cancellation",
                );
            }
        };

        let mut stream = match run_result {
            Ok(Some(stream)) => stream,
            Ok(None) => {
                // Agent contract violation (spec §7): run() returned no
                // stream and no error.
                let err = CliffyError::AgentStreamEnded;
                tracing::warn!(task_index = task.index, worker_id, attempt, error = %err, "agent contract violation");
                last_err_class = ErrorClass::Unknown;
                last_err_message = err.to_string();
                if should_retry(last_err_class, attempt, options.max_retries) {
                    retries += 1;
                    continue;
                }
                break;
            }
            Err(err) => {
                last_err_class = classify(Some(&err.to_string()));
                last_err_message = err.to_string();
                if should_retry(last_err_class, attempt, options.max_retries) {
                    retries += 1;
                    continue;
                }
                break;
            }
        };

        let mut terminal_usage: Option<Usage> = None;
        let mut attempt_failed: Option<String> = None;
        let mut tool_metadata = Vec::new();
        let mut partial_output = String::new();

        loop {
            let event = tokio::select! {
                event = stream.next() => event,
                _ = cancel.cancelled() => {
                    return canceled_result(
                        task,
                        worker_id,
                        start,
                        "task canceled due to fail-fast or context cancellation",
                    );
                }
            };
            match event {
                Some(AgentEvent::ToolTrace(metadata)) => {
                    if let Some(r) = renderer {
                        r.task_tool_trace(task.index, metadata.clone());
                    }
                    if options.emit_tool_trace {
                        if let Some(sink) = tool_trace_sink.as_deref_mut() {
                            let _ = emit_tool_trace_line(sink, task.index, &metadata);
                        }
                    }
                    tool_metadata.push(metadata);
                }
                Some(AgentEvent::Progress { message }) => {
                    if !partial_output.is_empty() {
                        partial_output.push('\n');
                    }
                    partial_output.push_str(&message);
                    if let Some(r) = renderer {
                        r.task_progress(task.index, &message);
                    }
                }
                Some(AgentEvent::Error { message }) => {
                    attempt_failed = Some(message);
                    break;
                }
                Some(AgentEvent::Response { usage }) => {
                    terminal_usage = Some(usage);
                    break;
                }
                None => {
                    attempt_failed = Some("agent event stream ended without a terminal event".to_string());
                    break;
                }
            }
        }

        if let Some(usage) = terminal_usage {
            let messages = message_store.list(&session).await.unwrap_or_default();
            let output = messages
                .iter()
                .filter(|m| m.role == Role::Assistant)
                .map(|m| m.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");

            if options.show_thinking {
                if let Some(r) = renderer {
                    for message in &messages {
                        if let Some(reasoning) = &message.reasoning {
                            r.thinking(task.index, reasoning);
                        }
                    }
                }
            }

            let pricing = ModelPricing {
                cost_per_1m_in: model.cost_per_1m_in,
                cost_per_1m_out: model.cost_per_1m_out,
            };
            let cost = pricing.cost(usage);

            let result = TaskResult {
                task,
                status: TaskStatus::Success,
                output,
                error: None,
                duration: start.elapsed(),
                usage,
                cost,
                retries,
                worker_id,
                model: model.id.clone(),
                tool_metadata,
            };
            tracing::info!(
                task_index = result.task.index,
                worker_id,
                attempt,
                tokens = usage.total_tokens(),
                "task succeeded"
            );
            if let Some(r) = renderer {
                r.task_completed(result.task.index, result.clone());
            }
            return result;
        }

        let message = attempt_failed.unwrap_or_else(|| "unknown agent error".to_string());
        last_err_class = classify(Some(&message));
        last_err_message = message;
        last_output = partial_output;

        if should_retry(last_err_class, attempt, options.max_retries) {
            retries += 1;
            continue;
        }
        break;
    }

    tracing::warn!(
        task_index = task.index,
        worker_id,
        retries,
        error = %last_err_message,
        "task failed"
    );

    let result = TaskResult {
        task,
        status: TaskStatus::Failed,
        output: String::new(),
        error: Some(last_err_message),
        duration: start.elapsed(),
        usage: Usage::default(),
        cost: 0.0,
        retries,
        worker_id,
        model: model.id,
        tool_metadata: Vec::new(),
    };
    if let Some(r) = renderer {
        r.task_completed(result.task.index, result.clone());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_chars_cuts_on_a_char_boundary() {
        let s = "héllo wörld"; // multi-byte chars at indices 1 and 7
        let truncated = truncate_chars(s, 3);
        assert_eq!(truncated, "hél");
        assert!(truncated.is_char_boundary(truncated.len()));
    }

    #[test]
    fn truncate_chars_returns_whole_string_when_shorter_than_limit() {
        assert_eq!(truncate_chars("short", 200), "short");
    }

    #[test]
    fn build_prompt_first_attempt_has_no_feedback_block() {
        let options = VolleyOptions::default();
        let task = Task::new(1, "write a haiku");
        let prompt = build_prompt(&options, &task, 0, None, "");
        assert_eq!(prompt, "write a haiku");
    }

    #[test]
    fn build_prompt_prepends_context_and_appends_feedback_on_retry() {
        let mut options = VolleyOptions::default();
        options.context = "repo: cliffy".to_string();
        let task = Task::new(1, "fix the bug");
        let prompt = build_prompt(
            &options,
            &task,
            1,
            Some((ErrorClass::RateLimit, "rate limit exceeded (429)")),
            "partial progress so far",
        );
        assert_eq!(
            prompt,
            "repo: cliffy\n\nfix the bug\n\n[Previous attempt failed with error: rate limit exceeded (429)\nPartial output: partial progress so far...\nPlease try a different approach.]"
        );
    }

    #[test]
    fn build_prompt_omits_feedback_block_for_network_errors() {
        let options = VolleyOptions::default();
        let task = Task::new(1, "fix the bug");
        let prompt = build_prompt(
            &options,
            &task,
            1,
            Some((ErrorClass::Network, "connection reset")),
            "partial progress",
        );
        assert_eq!(prompt, "fix the bug");
    }
}
