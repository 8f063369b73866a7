//! Scheduler core (spec §4.6): owns options, the result slice,
//! cancellation, collation, and the aggregate summary.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::agent::AnyAgent;
use crate::error::{CliffyError, Result};
use crate::health::HealthCounters;
use crate::message_store::MessageStore;
use crate::options::{VolleyOptions, VolleySummary};
use crate::renderer::Renderer;
use crate::task::{Task, TaskResult, TaskStatus};
use crate::worker::{seed_queue, spawn_workers};

pub struct Scheduler {
    agent: AnyAgent,
    message_store: Arc<dyn MessageStore>,
}

impl Scheduler {
    pub fn new(agent: AnyAgent, message_store: Arc<dyn MessageStore>) -> Self {
        Self {
            agent,
            message_store,
        }
    }

    /// Runs one volley to completion. Never returns an error unless
    /// `tasks` is empty (spec §4.6 step 1).
    pub async fn execute(
        &self,
        tasks: Vec<Task>,
        options: VolleyOptions,
        cancel: CancellationToken,
    ) -> Result<(Vec<TaskResult>, VolleySummary)> {
        if tasks.is_empty() {
            return Err(CliffyError::EmptyBatch);
        }

        let start = Instant::now();
        let total = tasks.len();
        let model = self.agent.model();

        tracing::info!(total_tasks = total, max_concurrent = options.max_concurrent, model = %model.id, "volley starting");

        let renderer = Arc::new(Renderer::new(
            options.show_progress,
            options.show_thinking,
            options.thinking_format,
            options.verbosity,
        ));
        let prompts: Vec<(usize, String)> = tasks
            .iter()
            .map(|t| (t.index, t.prompt.clone()))
            .collect();
        renderer.start(&prompts, &model.id);
        let spinner_handle = Arc::clone(&renderer).spawn_spinner();

        // `results[i]` is written exactly once, at `Task.index - 1`.
        let mut results: Vec<Option<TaskResult>> = tasks
            .iter()
            .cloned()
            .map(|t| Some(TaskResult::pending(t)))
            .collect();

        let queue = seed_queue(tasks);
        let worker_count = options.max_concurrent.max(1);
        let concurrency_gauge = Arc::new(AtomicUsize::new(0));
        let peak_concurrency = Arc::new(AtomicUsize::new(0));
        let health = Arc::new(HealthCounters::default());
        let options = Arc::new(options);

        let (results_tx, mut results_rx) = tokio::sync::mpsc::channel(2 * worker_count);

        let worker_handles = spawn_workers(
            worker_count,
            queue,
            Arc::clone(&self.agent),
            Arc::clone(&self.message_store),
            Arc::clone(&options),
            Some(Arc::clone(&renderer)),
            cancel.clone(),
            Arc::clone(&health),
            Arc::clone(&concurrency_gauge),
            Arc::clone(&peak_concurrency),
            results_tx.clone(),
        );
        drop(results_tx);

        let mut total_retries: u32 = 0;
        while let Some(result) = results_rx.recv().await {
            total_retries += result.retries;
            let slot = result.task.index - 1;
            results[slot] = Some(result);
        }

        for handle in worker_handles {
            let _ = handle.await;
        }
        renderer.finish();
        let _ = spinner_handle.await;

        let results: Vec<TaskResult> = results.into_iter().map(|r| r.expect("every slot written")).collect();

        let succeeded = results.iter().filter(|r| r.status == TaskStatus::Success).count();
        let failed = results.iter().filter(|r| r.status == TaskStatus::Failed).count();
        let canceled = results.iter().filter(|r| r.status == TaskStatus::Canceled).count();
        let total_tokens: u64 = results.iter().map(|r| r.usage.total_tokens()).sum();
        let total_cost: f64 = results.iter().map(|r| r.cost).sum();
        let avg_tokens_per_task = if succeeded > 0 {
            results
                .iter()
                .filter(|r| r.status == TaskStatus::Success)
                .map(|r| r.usage.total_tokens())
                .sum::<u64>() as f64
                / succeeded as f64
        } else {
            0.0
        };

        let summary = VolleySummary {
            total_tasks: total,
            succeeded_tasks: succeeded,
            failed_tasks: failed,
            canceled_tasks: canceled,
            duration: start.elapsed(),
            total_tokens,
            total_cost,
            avg_tokens_per_task,
            max_concurrent_used: peak_concurrency.load(Ordering::SeqCst),
            total_retries,
        };

        tracing::info!(
            total_tasks = total,
            succeeded,
            failed,
            canceled,
            total_retries,
            elapsed = ?summary.duration,
            "volley complete"
        );

        Ok((results, summary))
    }
}
