use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use docqa_core::error::{Error, Result};
use docqa_core::traits::{Answerer, GenerationParams, Prompt};

/// Answerer backed by an OpenAI-compatible `POST {base}/chat/completions`.
///
/// Every failure, including an empty completion, is `GenerationFailed`.
pub struct OpenAiAnswerer {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiAnswerer {
    pub fn new(base_url: &str, api_key: impl Into<String>, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl Answerer for OpenAiAnswerer {
    async fn generate(&self, prompt: &Prompt, params: GenerationParams) -> Result<String> {
        debug!(model = %self.model, prompt_bytes = prompt.user.len(), "requesting completion");
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: &prompt.system },
                ChatMessage { role: "user", content: &prompt.user },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        let mut request = self.client.post(&self.url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request.send().await.map_err(|e| {
            error!(error = %e, "completion request failed");
            Error::GenerationFailed(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            error!(%status, "completion API error");
            return Err(Error::GenerationFailed(format!("API returned {status}: {detail}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::GenerationFailed(format!("failed to parse response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::GenerationFailed("empty completion".into()))
    }
}
