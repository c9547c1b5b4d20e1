//! Language model relay for the trip planner.
use async_trait::async_trait;
use explore_domain::ChatMessage;
use reqwest::Client;
use serde::Serialize;

use crate::{ApiKey, UpstreamResult, read_json};

const SERVICE: &str = "completion";
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

#[async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    /// One completion for `messages`. The provider's JSON is returned untouched so
    /// the browser sees exactly what the provider sent.
    async fn complete(&self, messages: &[ChatMessage]) -> UpstreamResult<serde_json::Value>;
}

/// [`CompletionProvider`] for the OpenAI chat completions endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: ApiKey,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

impl OpenAiClient {
    pub fn new(http: Client, api_key: impl Into<ApiKey>) -> Self {
        Self {
            http,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            model: DEFAULT_CHAT_MODEL.to_owned(),
            api_key: api_key.into(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> UpstreamResult<serde_json::Value> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await?;
        read_json(SERVICE, response).await
    }
}
