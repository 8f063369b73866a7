mod cli;
mod demo_agent;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cliffy_core::task::Task;
use cliffy_core::{InMemoryMessageStore, Scheduler, TaskStatus, Verbosity};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use cli::Cli;
use demo_agent::EchoAgent;

fn load_tasks(cli: &Cli) -> anyhow::Result<Vec<Task>> {
    let prompts: Vec<String> = if let Some(path) = &cli.prompts_file {
        std::fs::read_to_string(path)?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        cli.tasks.clone()
    };

    Ok(prompts
        .into_iter()
        .enumerate()
        .map(|(i, prompt)| Task::new(i + 1, prompt))
        .collect())
}

fn print_task_verbose_line(result: &cliffy_core::TaskResult) {
    eprintln!(
        "task {}: {:?} {} tok ${:.4} {:.1?}",
        result.task.index,
        result.status,
        result.usage.total_tokens(),
        result.cost,
        result.duration
    );
}

fn print_summary(summary: &cliffy_core::VolleySummary) {
    eprintln!(
        "volley complete: {} total, {} succeeded, {} failed, {} canceled, {:.1?} elapsed",
        summary.total_tasks,
        summary.succeeded_tasks,
        summary.failed_tasks,
        summary.canceled_tasks,
        summary.duration
    );
    eprintln!(
        "tokens: {} total, avg {:.1}/task, cost ${:.4}, retries {}, peak concurrency {}",
        summary.total_tokens,
        summary.avg_tokens_per_task,
        summary.total_cost,
        summary.total_retries,
        summary.max_concurrent_used,
    );
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let tasks = load_tasks(&cli)?;
    if tasks.is_empty() {
        error!("no task prompts given (pass them as arguments or via --prompts-file)");
        return Ok(ExitCode::FAILURE);
    }

    let store = Arc::new(InMemoryMessageStore::new());
    let agent = Arc::new(EchoAgent::new(Arc::clone(&store)));
    let scheduler = Scheduler::new(agent, store);
    let options = cli.volley_options();
    let show_summary = options.show_summary;
    let verbosity = options.verbosity;

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C, draining in-flight tasks");
            cancel_on_signal.cancel();
        }
    });

    let (results, summary) = scheduler.execute(tasks, options, cancel).await?;

    if verbosity == Verbosity::Verbose {
        // Per-task detail regardless of `--no-summary` (spec §11).
        for result in &results {
            print_task_verbose_line(result);
        }
    }

    if show_summary {
        print_summary(&summary);
    }

    for result in &results {
        if result.status == TaskStatus::Failed {
            if let Some(err) = &result.error {
                eprintln!("task {}: {} — {err}", result.task.index, result.task.prompt);
            }
        }
    }

    if summary.failed_tasks > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("cliffy: {err}");
            ExitCode::FAILURE
        }
    }
}
