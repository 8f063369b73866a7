//! Bounded-concurrency worker pool (spec §4.5): `MaxConcurrent` workers
//! pulling from a shared queue, draining to `canceled` results on
//! cancellation so every task produces exactly one result.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent::AnyAgent;
use crate::executor::execute_task;
use crate::health::HealthCounters;
use crate::message_store::MessageStore;
use crate::options::VolleyOptions;
use crate::renderer::Renderer;
use crate::task::{Task, TaskResult, TaskStatus};

pub type TaskQueue = Arc<Mutex<VecDeque<Task>>>;

pub fn seed_queue(tasks: Vec<Task>) -> TaskQueue {
    Arc::new(Mutex::new(VecDeque::from(tasks)))
}

/// Drains `queue`, converting each remaining task directly into a
/// `canceled` result without touching the Agent.
fn drain_canceled(task: Task, worker_id: usize) -> TaskResult {
    let mut result = TaskResult::pending(task);
    result.status = TaskStatus::Canceled;
    result.error = Some("task canceled due to fail-fast or context cancellation".to_string());
    result.worker_id = worker_id;
    result
}

#[allow(clippy::too_many_arguments)]
pub fn spawn_workers(
    worker_count: usize,
    queue: TaskQueue,
    agent: AnyAgent,
    message_store: Arc<dyn MessageStore>,
    options: Arc<VolleyOptions>,
    renderer: Option<Arc<Renderer>>,
    cancel: CancellationToken,
    health: Arc<HealthCounters>,
    concurrency_gauge: Arc<AtomicUsize>,
    peak_concurrency: Arc<AtomicUsize>,
    results_tx: mpsc::Sender<TaskResult>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        let queue = Arc::clone(&queue);
        let agent = Arc::clone(&agent);
        let message_store = Arc::clone(&message_store);
        let options = Arc::clone(&options);
        let renderer = renderer.clone();
        let cancel = cancel.clone();
        let health = Arc::clone(&health);
        let concurrency_gauge = Arc::clone(&concurrency_gauge);
        let peak_concurrency = Arc::clone(&peak_concurrency);
        let results_tx = results_tx.clone();

        let handle = tokio::spawn(async move {
            tracing::debug!(worker_id, "worker started");
            loop {
                let next = queue.lock().pop_front();
                let Some(task) = next else {
                    break;
                };

                if cancel.is_cancelled() {
                    tracing::debug!(task_index = task.index, worker_id, "draining canceled task");
                    let _ = results_tx.send(drain_canceled(task, worker_id)).await;
                    continue;
                }

                let now = concurrency_gauge.fetch_add(1, Ordering::SeqCst) + 1;
                peak_concurrency.fetch_max(now, Ordering::SeqCst);

                let mut stderr = std::io::stderr();
                let tool_trace_sink: Option<&mut dyn std::io::Write> =
                    if options.emit_tool_trace { Some(&mut stderr) } else { None };

                let result = execute_task(
                    task,
                    worker_id,
                    &agent,
                    message_store.as_ref(),
                    &options,
                    renderer.as_deref(),
                    &cancel,
                    tool_trace_sink,
                )
                .await;

                concurrency_gauge.fetch_sub(1, Ordering::SeqCst);

                match result.status {
                    TaskStatus::Success => health.record_success(),
                    TaskStatus::Failed => health.record_failure(),
                    TaskStatus::Canceled | TaskStatus::Pending | TaskStatus::Running | TaskStatus::Retrying => {}
                }

                if options.fail_fast && result.status == TaskStatus::Failed {
                    tracing::warn!(task_index = result.task.index, worker_id, "fail-fast triggered, canceling remaining tasks");
                    cancel.cancel();
                }

                let _ = results_tx.send(result).await;
            }
            tracing::debug!(worker_id, "worker exiting");
        });
        handles.push(handle);
    }
    handles
}
