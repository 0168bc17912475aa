//! Gemini streaming generator.
//!
//! Implements `TextGenerator` over the `streamGenerateContent?alt=sse`
//! endpoint: each SSE event carries a JSON chunk whose candidate parts are
//! forwarded into the token channel as they arrive.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use planeja_core::llm::{GenerationMessage, TextGenerator};
use planeja_types::chat::MessageRole;
use planeja_types::error::GenerationError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL.to_string())
    }

    pub fn with_model(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Gemini's role vocabulary is "user" and "model".
fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    }
}

fn build_request(history: &[GenerationMessage]) -> GenerateRequest {
    GenerateRequest {
        contents: history
            .iter()
            .map(|m| Content {
                role: Some(role_name(m.role).to_string()),
                parts: vec![Part {
                    text: Some(m.content.clone()),
                }],
            })
            .collect(),
    }
}

/// Pull the text parts out of one SSE data payload.
fn extract_text(data: &str) -> Result<Vec<String>, GenerationError> {
    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| GenerationError::Stream(e.to_string()))?;

    Ok(chunk
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .filter(|t| !t.is_empty())
        .collect())
}

impl TextGenerator for GeminiGenerator {
    async fn generate(
        &self,
        history: &[GenerationMessage],
        tokens: UnboundedSender<String>,
    ) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(history))
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut stream = response.bytes_stream().eventsource();
        let mut full = String::new();
        while let Some(event) = stream.next().await {
            let event = event.map_err(|e| GenerationError::Stream(e.to_string()))?;
            for text in extract_text(&event.data)? {
                // A closed channel only means nobody is draining anymore;
                // the accumulated text is still the return value.
                let _ = tokens.send(text.clone());
                full.push_str(&text);
            }
        }

        Ok(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_maps_roles_to_gemini_vocabulary() {
        let history = vec![
            GenerationMessage {
                role: MessageRole::User,
                content: "hi".to_string(),
            },
            GenerationMessage {
                role: MessageRole::Assistant,
                content: "hello".to_string(),
            },
        ];

        let request = build_request(&history);
        assert_eq!(request.contents.len(), 2);
        assert_eq!(request.contents[0].role.as_deref(), Some("user"));
        assert_eq!(request.contents[1].role.as_deref(), Some("model"));
        assert_eq!(
            request.contents[1].parts[0].text.as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn test_extract_text_from_stream_chunk() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Plan "},{"text":"ahead."}]}}]}"#;
        let parts = extract_text(data).unwrap();
        assert_eq!(parts, vec!["Plan ", "ahead."]);
    }

    #[test]
    fn test_extract_text_tolerates_empty_candidates() {
        assert!(extract_text(r#"{"candidates":[]}"#).unwrap().is_empty());
        assert!(extract_text(r#"{}"#).unwrap().is_empty());
        // Finish chunks carry a candidate without content parts.
        assert!(extract_text(r#"{"candidates":[{"finishReason":"STOP"}]}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_extract_text_rejects_garbage() {
        assert!(matches!(
            extract_text("not json"),
            Err(GenerationError::Stream(_))
        ));
    }
}
