//! Volley scheduler: the bounded-concurrency core that dispatches
//! independent LLM tasks, retries classified failures with backoff,
//! renders live progress, and produces a deterministic result set plus
//! an aggregate summary.
//!
//! Configuration, CLI parsing, provider/model discovery, credential
//! resolution, and output formatting live outside this crate; see the
//! `cliffy` binary.

pub mod agent;
pub mod backoff;
pub mod classifier;
pub mod error;
pub mod executor;
pub mod health;
pub mod message_store;
pub mod options;
pub mod renderer;
pub mod scheduler;
pub mod task;
pub mod tool_trace;
pub mod worker;

pub use agent::{Agent, AgentEvent, AnyAgent, EventStream, ModelInfo};
pub use classifier::ErrorClass;
pub use error::{CliffyError, Result};
pub use message_store::{InMemoryMessageStore, MessageStore};
pub use options::{OutputFormat, ThinkingFormat, Verbosity, VolleyOptions, VolleySummary};
pub use scheduler::Scheduler;
pub use task::{Task, TaskResult, TaskStatus, ToolExecutionMetadata, Usage};
