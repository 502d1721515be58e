use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::clients::traits::{ChatMessage, LanguageModel};
use crate::error::{Result, SavantError};

/// Deterministic, local model for testing/dev (no network).
///
/// Replies are handed out in the order they were queued and every request is
/// recorded so callers can assert on the prompts that were sent.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply.into());
        }
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let mut requests = self.requests.lock().map_err(|_| SavantError::Internal {
            message: "scripted model request log poisoned".into(),
        })?;
        requests.push(messages.to_vec());
        drop(requests);

        let mut replies = self.replies.lock().map_err(|_| SavantError::Internal {
            message: "scripted model replies poisoned".into(),
        })?;
        replies.pop_front().ok_or_else(|| SavantError::Llm {
            message: "scripted model has no replies left".into(),
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
