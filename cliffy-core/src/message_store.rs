//! Read-only Message Store contract consulted at `Response` time to
//! recover assistant text for a session (spec §6.2).

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Who authored a message in a session transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One message in a session transcript. The core only reads text content
/// from `Assistant` messages, plus `reasoning` when `ShowThinking` is set.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub reasoning: Option<String>,
}

/// Read-only collaborator: `List(session_id)` returns the ordered
/// transcript for a session. The core never writes through this trait.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn list(&self, session_id: &str) -> anyhow::Result<Vec<Message>>;
}

/// In-memory reference implementation used by tests and as a default.
/// Sessions are appended by a real Agent out-of-band; this store exposes
/// only the read side the core is allowed to use.
#[derive(Default)]
pub struct InMemoryMessageStore {
    sessions: Mutex<HashMap<String, Vec<Message>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/fixture helper: seed a session's transcript directly.
    pub async fn seed(&self, session_id: impl Into<String>, messages: Vec<Message>) {
        self.sessions.lock().await.insert(session_id.into(), messages);
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn list(&self, session_id: &str) -> anyhow::Result<Vec<Message>> {
        Ok(self
            .sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_session_returns_empty() {
        let store = InMemoryMessageStore::new();
        let messages = store.list("nope").await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn seeded_session_round_trips() {
        let store = InMemoryMessageStore::new();
        store
            .seed(
                "s1",
                vec![Message {
                    role: Role::Assistant,
                    text: "done".to_string(),
                    reasoning: None,
                }],
            )
            .await;
        let messages = store.list("s1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "done");
    }
}
