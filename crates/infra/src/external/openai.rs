//! OpenAI-compatible chat-completion client.

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use streetfix_summary::{BackendError, ChatCompletion, ChatMessage, ChatRequest, SummaryBackend};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Immutable client configuration, fixed at construction.
///
/// The credential travels with the client instance instead of living in
/// process-global state, so concurrent callers cannot observe each other's
/// configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a compatible service (e.g. a local proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Read `OPENAI_API_KEY` from the environment.
    ///
    /// A missing key is not fatal: summaries are enrichment, and every
    /// generation failure is logged and isolated. The warning makes the
    /// misconfiguration visible at startup rather than per request.
    pub fn from_env() -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
            warn!("OPENAI_API_KEY not set; summary generation will fail until configured");
            String::new()
        });
        Self::new(api_key)
    }
}

/// Chat-completion backend speaking the OpenAI HTTP API.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

/// Request body; the timeout is a client-side bound and never serialized.
#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

fn map_reqwest(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout
    } else if err.is_decode() {
        BackendError::Transport(format!("undecodable response: {err}"))
    } else {
        BackendError::Transport(err.to_string())
    }
}

#[async_trait]
impl SummaryBackend for OpenAiBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, BackendError> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .timeout(request.timeout)
            .json(&CompletionBody {
                model: &request.model,
                messages: &request.messages,
            })
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unreadable error body".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<ChatCompletion>().await.map_err(map_reqwest)
    }
}
