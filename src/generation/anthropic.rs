//! Anthropic Messages API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::provider::{error_from_response, Completion, DraftProvider, Prompt, ProviderError};

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn complete(&self, prompt: &Prompt, temperature: f32) -> Result<Completion, ProviderError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: &prompt.system,
            messages: [UserMessage {
                role: "user",
                content: &prompt.user,
            }],
            temperature,
        };

        log::debug!("calling {}/v1/messages with model {}", self.base_url, self.model);
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: MessagesResponse = response.json().await?;
        let text = collect_text(&body.content);
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "response had no text content".into(),
            ));
        }

        Ok(Completion {
            text,
            input_tokens: body.usage.as_ref().map(|u| u.input_tokens),
            output_tokens: body.usage.as_ref().map(|u| u.output_tokens),
        })
    }
}

fn collect_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait]
impl DraftProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<Completion, ProviderError> {
        self.complete(prompt, 0.2).await
    }

    async fn critic_pass(&self, prompt: &Prompt) -> Result<Completion, ProviderError> {
        self.complete(prompt, 0.0).await
    }
}
