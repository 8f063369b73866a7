//! Minimal built-in `Agent`. Provider wiring (real LLM request
//! construction, tool invocation, streaming) is out of this crate's
//! scope by design; this stand-in lets `cliffy` run end-to-end without
//! one, and is the seam a real provider integration would replace.

use async_trait::async_trait;
use cliffy_core::agent::{Agent, AgentEvent, EventStream, ModelInfo};
use cliffy_core::message_store::{Message, Role};
use cliffy_core::task::Usage;
use cliffy_core::InMemoryMessageStore;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct EchoAgent {
    model: ModelInfo,
    store: Arc<InMemoryMessageStore>,
}

impl EchoAgent {
    pub fn new(store: Arc<InMemoryMessageStore>) -> Self {
        Self {
            model: ModelInfo {
                id: "cliffy-echo".to_string(),
                cost_per_1m_in: 0.0,
                cost_per_1m_out: 0.0,
            },
            store,
        }
    }
}

#[async_trait]
impl Agent for EchoAgent {
    fn model(&self) -> ModelInfo {
        self.model.clone()
    }

    async fn run(&self, session_id: &str, prompt: &str) -> anyhow::Result<Option<EventStream>> {
        let (tx, rx) = mpsc::channel(4);
        let store = Arc::clone(&self.store);
        let session_id = session_id.to_string();
        let prompt = prompt.to_string();

        store
            .seed(
                session_id,
                vec![Message {
                    role: Role::Assistant,
                    text: format!("(no provider configured) echoing prompt:\n{prompt}"),
                    reasoning: None,
                }],
            )
            .await;

        tokio::spawn(async move {
            let usage = Usage {
                input_tokens: prompt.split_whitespace().count() as u64,
                output_tokens: 0,
            };
            let _ = tx.send(AgentEvent::Response { usage }).await;
        });

        Ok(Some(EventStream::new(rx)))
    }
}
