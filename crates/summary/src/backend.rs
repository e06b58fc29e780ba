//! The summarisation-backend seam.
//!
//! Chat-completion shaped: the caller sends a model id plus role-tagged
//! messages and reads choice text back. This subsystem only ever sends one
//! `system` and one `user` message and reads the first choice.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure talking to the summarisation backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The bounded request timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// Connectivity or protocol failure (including an undecodable body).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// A well-formed response that carries nothing usable.
    #[error("response carried no usable choice")]
    EmptyResponse,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// One summarisation request: model, ordered messages, bounded timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub timeout: Duration,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            timeout,
        }
    }

    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::system(content));
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }
}

/// A chat-completion response: a list of choices, each carrying a message.
///
/// Mirrors the wire shape of OpenAI-compatible services; unknown response
/// fields are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatCompletion {
    /// Convenience for single-reply use: the first choice's text.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }

    /// A response wrapping a single assistant message.
    pub fn of_reply(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: ChatMessage {
                    role: ChatRole::Assistant,
                    content: content.into(),
                },
            }],
        }
    }
}

/// A remote text-summarisation service.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Send one request and await its completion, bounded by
    /// `request.timeout`.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, BackendError>;
}

#[async_trait]
impl<B> SummaryBackend for Arc<B>
where
    B: SummaryBackend + ?Sized,
{
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, BackendError> {
        (**self).complete(request).await
    }
}

/// Canned backend for tests/dev.
///
/// Replies with a fixed completion (or fails with a fixed error) and records
/// every request it receives.
#[derive(Debug)]
pub struct FixedResponseBackend {
    script: Script,
    requests: Mutex<Vec<ChatRequest>>,
}

#[derive(Debug)]
enum Script {
    Reply(ChatCompletion),
    Fail(BackendError),
}

impl FixedResponseBackend {
    /// Always answer with a single choice carrying `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            script: Script::Reply(ChatCompletion::of_reply(reply)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the given completion (e.g. an empty choice list).
    pub fn completing(completion: ChatCompletion) -> Self {
        Self {
            script: Script::Reply(completion),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with a clone of `error`.
    pub fn failing(error: BackendError) -> Self {
        Self {
            script: Script::Fail(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummaryBackend for FixedResponseBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.script {
            Script::Reply(completion) => Ok(completion.clone()),
            Script::Fail(error) => Err(error.clone()),
        }
    }
}
