//! End-to-end scenarios for the Volley scheduler (S1-S4), against a
//! `MockAgent` driving real workers, retries, and cancellation.

use std::sync::Arc;
use std::time::Duration;

use cliffy_core::agent::{MockAgent, MockBehavior};
use cliffy_core::options::VolleyOptions;
use cliffy_core::task::{Task, TaskStatus};
use cliffy_core::{InMemoryMessageStore, Scheduler};
use tokio_util::sync::CancellationToken;

fn tasks(labels: &[&str]) -> Vec<Task> {
    labels
        .iter()
        .enumerate()
        .map(|(i, prompt)| Task::new(i + 1, *prompt))
        .collect()
}

#[tokio::test]
async fn s1_happy_path_all_succeed_within_concurrency_cap() {
    let agent = Arc::new(MockAgent::new(MockBehavior::AlwaysSucceed {
        delay: Duration::from_millis(100),
    }));
    let store = Arc::new(InMemoryMessageStore::new());
    let scheduler = Scheduler::new(agent.clone(), store);

    let mut options = VolleyOptions::default();
    options.max_concurrent = 3;
    options.show_progress = false;

    let (results, summary) = scheduler
        .execute(tasks(&["a", "b", "c", "d", "e"]), options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.status == TaskStatus::Success));
    assert_eq!(summary.failed_tasks, 0);
    assert_eq!(summary.total_retries, 0);
    assert!(agent.peak_concurrency() <= 3);
    assert_eq!(agent.calls(), 5);
}

#[tokio::test]
async fn s2_retry_with_rate_limit_mostly_succeeds() {
    let agent = Arc::new(MockAgent::new(MockBehavior::FailEveryNth {
        nth: 3,
        message: "rate limit exceeded (429): too many requests".to_string(),
        delay: Duration::from_millis(5),
    }));
    let store = Arc::new(InMemoryMessageStore::new());
    let scheduler = Scheduler::new(agent.clone(), store);

    let labels: Vec<String> = (0..10).map(|i| format!("task-{i}")).collect();
    let tasks: Vec<Task> = labels
        .iter()
        .enumerate()
        .map(|(i, p)| Task::new(i + 1, p.clone()))
        .collect();

    let mut options = VolleyOptions::default();
    options.max_concurrent = 2;
    options.max_retries = 3;
    options.show_progress = false;

    let (results, summary) = scheduler
        .execute(tasks, options, CancellationToken::new())
        .await
        .unwrap();

    let succeeded = results.iter().filter(|r| r.status == TaskStatus::Success).count();
    assert!(succeeded >= 7, "expected at least 7 successes, got {succeeded}");
    assert!(summary.total_retries >= 1);
}

#[tokio::test]
async fn s3_fail_fast_cancels_remaining_tasks() {
    let agent = Arc::new(MockAgent::new(MockBehavior::AlwaysFail {
        message: "invalid request: bad schema".to_string(),
    }));
    let store = Arc::new(InMemoryMessageStore::new());
    let scheduler = Scheduler::new(agent, store);

    let mut options = VolleyOptions::default();
    options.max_concurrent = 2;
    options.fail_fast = true;
    options.show_progress = false;

    let labels: Vec<String> = (0..10).map(|i| format!("task-{i}")).collect();
    let tasks: Vec<Task> = labels
        .iter()
        .enumerate()
        .map(|(i, p)| Task::new(i + 1, p.clone()))
        .collect();

    let (results, _summary) = scheduler
        .execute(tasks, options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 10);
    let completed = results
        .iter()
        .filter(|r| matches!(r.status, TaskStatus::Success | TaskStatus::Failed))
        .count();
    assert!(completed < 10);
    assert!(results.iter().any(|r| r.status == TaskStatus::Failed));
    assert!(results.iter().any(|r| r.status == TaskStatus::Canceled));
}

#[tokio::test]
async fn s4_external_cancel_still_yields_one_result_per_task() {
    let agent = Arc::new(MockAgent::new(MockBehavior::Delay {
        delay: Duration::from_secs(1),
    }));
    let store = Arc::new(InMemoryMessageStore::new());
    let scheduler = Scheduler::new(agent, store);

    let mut options = VolleyOptions::default();
    options.max_concurrent = 2;
    options.show_progress = false;

    let labels: Vec<String> = (0..10).map(|i| format!("task-{i}")).collect();
    let tasks: Vec<Task> = labels
        .iter()
        .enumerate()
        .map(|(i, p)| Task::new(i + 1, p.clone()))
        .collect();

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel_clone.cancel();
    });

    let (results, _summary) = scheduler.execute(tasks, options, cancel).await.unwrap();

    assert_eq!(results.len(), 10);
    assert!(results.iter().all(|r| matches!(
        r.status,
        TaskStatus::Success | TaskStatus::Failed | TaskStatus::Canceled
    )));
    let completed = results.iter().filter(|r| r.status == TaskStatus::Success).count();
    assert!(completed < 10);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let agent = Arc::new(MockAgent::new(MockBehavior::AlwaysSucceed {
        delay: Duration::from_millis(1),
    }));
    let store = Arc::new(InMemoryMessageStore::new());
    let scheduler = Scheduler::new(agent, store);

    let result = scheduler
        .execute(Vec::new(), VolleyOptions::default(), CancellationToken::new())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn results_preserve_input_order_regardless_of_completion_order() {
    let agent = Arc::new(MockAgent::new(MockBehavior::AlwaysSucceed {
        delay: Duration::from_millis(1),
    }));
    let store = Arc::new(InMemoryMessageStore::new());
    let scheduler = Scheduler::new(agent, store);

    let mut options = VolleyOptions::default();
    options.max_concurrent = 4;
    options.show_progress = false;

    let (results, _summary) = scheduler
        .execute(tasks(&["a", "b", "c", "d"]), options, CancellationToken::new())
        .await
        .unwrap();

    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.task.index, i + 1);
    }
}
