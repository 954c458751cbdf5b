//! Chat completion backend (OpenAI-compatible)

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::ChatTurn;
use crate::provider::Provider;
use crate::{Error, Result};

/// Body of a chat completion call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub response_format: ResponseFormat,
}

/// Requested output format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    /// Strict JSON object output
    #[must_use]
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

/// Backend that answers a chat completion request with raw text
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run the completion, returning the first choice's content
    ///
    /// # Errors
    ///
    /// Returns error if the call fails or the response is malformed
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// `/chat/completions` on the provider
pub struct ChatCompletions {
    provider: Arc<Provider>,
}

impl ChatCompletions {
    #[must_use]
    pub const fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatModel for ChatCompletions {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let response = self
            .provider
            .post("chat/completions")?
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Dialogue(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Dialogue(format!("chat API error {status}: {body}")));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Dialogue(format!("failed to parse chat response: {e}")))?;

        Ok(result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_else(|| "{}".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let request = ChatRequest {
            model: "llama-3.3-70b-versatile".to_string(),
            messages: vec![ChatTurn::system("Sos Rulo"), ChatTurn::user("hola")],
            max_tokens: 120,
            temperature: 0.5,
            response_format: ResponseFormat::json_object(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "llama-3.3-70b-versatile",
                "messages": [
                    {"role": "system", "content": "Sos Rulo"},
                    {"role": "user", "content": "hola"}
                ],
                "max_tokens": 120,
                "temperature": 0.5,
                "response_format": {"type": "json_object"}
            })
        );
    }

    #[test]
    fn empty_choice_content_deserializes() {
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let model = ChatCompletions::new(Arc::new(Provider::new(None, "http://127.0.0.1:9")));
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![],
            max_tokens: 1,
            temperature: 0.0,
            response_format: ResponseFormat::json_object(),
        };

        assert!(matches!(model.complete(&request).await, Err(Error::Config(_))));
    }
}
