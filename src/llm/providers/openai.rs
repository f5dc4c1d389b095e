// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI chat completions provider
//!
//! Implements the LlmProvider trait against the `/v1/chat/completions`
//! endpoint. Any OpenAI-compatible server works through `with_base_url`.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::common::{parse_retry_after_seconds, server_error, DEFAULT_RETRY_AFTER_SECS};
use crate::error::{ActAsError, ApiError, Result};
use crate::llm::message::{Message, Role};
use crate::llm::provider::{
    CompletionRequest, EventStream, LlmProvider, StopReason, StreamEvent, Usage,
};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, OPENAI_API_URL)
    }

    /// Create with a custom endpoint URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Convert internal messages to the chat completions format
    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => "system",
                    Role::Human => "user",
                    Role::Ai => "assistant",
                    Role::Function => "function",
                };
                let name = match m.role {
                    Role::Function => Some(m.name.clone().unwrap_or_else(|| "function".into())),
                    _ => None,
                };
                OpenAiMessage {
                    role: role.to_string(),
                    content: m.content.clone(),
                    name,
                }
            })
            .collect()
    }

    /// Build the streaming request body
    fn build_request(&self, request: &CompletionRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: request.model.clone(),
            messages: Self::convert_messages(&request.messages),
            temperature: request.temperature,
            stream: true,
        }
    }

    async fn send(&self, request: &CompletionRequest) -> Result<reqwest::Response> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let retry_after = parse_retry_after_seconds(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(Self::parse_error(status, retry_after, &body))
    }

    /// Parse an error response
    fn parse_error(status: u16, retry_after: Option<u32>, body: &str) -> ActAsError {
        if status == 429 {
            return ActAsError::Api(ApiError::RateLimited(
                retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            ));
        }

        let Ok(error_response) = serde_json::from_str::<OpenAiError>(body) else {
            if status == 401 {
                return ActAsError::Api(ApiError::AuthenticationFailed);
            }
            return server_error(status, body);
        };

        let message = error_response.error.message;
        let code = error_response.error.code.as_deref().unwrap_or("");

        match code {
            "invalid_api_key" => ActAsError::Api(ApiError::AuthenticationFailed),
            "rate_limit_exceeded" => ActAsError::Api(ApiError::RateLimited(
                retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            )),
            "model_not_found" => ActAsError::Api(ApiError::ModelNotFound(message)),
            _ if status == 401 => ActAsError::Api(ApiError::AuthenticationFailed),
            _ => server_error(status, message),
        }
    }

    /// Turn one SSE `data:` payload into stream events
    fn parse_data(data: &str, message_started: &mut bool) -> Vec<Result<StreamEvent>> {
        if data == "[DONE]" {
            return vec![Ok(StreamEvent::MessageStop)];
        }

        if let Ok(error) = serde_json::from_str::<OpenAiError>(data) {
            return vec![Ok(StreamEvent::Error {
                error_type: error.error.code.unwrap_or_else(|| "api_error".to_string()),
                message: error.error.message,
            })];
        }

        let chunk = match serde_json::from_str::<OpenAiStreamChunk>(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!("Skipping unparseable stream chunk: {}", e);
                return vec![];
            }
        };

        let mut events = Vec::new();
        if !*message_started {
            *message_started = true;
            events.push(Ok(StreamEvent::MessageStart {
                id: chunk.id.clone(),
                model: chunk.model.clone().unwrap_or_default(),
            }));
        }

        let usage = chunk.usage.map(Usage::from);
        if chunk.choices.is_empty() && usage.is_some() {
            events.push(Ok(StreamEvent::MessageDelta {
                stop_reason: None,
                usage,
            }));
            return events;
        }
        if let Some(choice) = chunk.choices.into_iter().next() {
            if let Some(text) = choice.delta.content {
                if !text.is_empty() {
                    events.push(Ok(StreamEvent::TextDelta { text }));
                }
            }
            if let Some(reason) = choice.finish_reason {
                events.push(Ok(StreamEvent::MessageDelta {
                    stop_reason: Some(StopReason::from_finish_reason(&reason)),
                    usage,
                }));
            }
        }

        events
    }

    /// Pull every complete line out of `buffer` and parse its events
    fn drain_lines(buffer: &mut Vec<u8>, message_started: &mut bool) -> Vec<Result<StreamEvent>> {
        let mut events = Vec::new();

        while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                events.extend(Self::parse_data(data.trim_start(), message_started));
            }
        }

        events
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let response = self.send(&request).await?;

        // (pending bytes, message_started)
        type StreamState = (Vec<u8>, bool);

        let event_stream = response
            .bytes_stream()
            .map(|result| {
                result.map_err(|e| ActAsError::Api(ApiError::StreamError(e.to_string())))
            })
            .scan(
                (Vec::new(), false),
                |state: &mut StreamState, result| {
                    let (buffer, message_started) = state;
                    let events = match result {
                        Ok(bytes) => {
                            buffer.extend_from_slice(&bytes);
                            Self::drain_lines(buffer, message_started)
                        }
                        Err(e) => vec![Err(e)],
                    };
                    futures::future::ready(Some(events))
                },
            )
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }
}

// Chat completions API types

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl From<OpenAiUsage> for Usage {
    fn from(usage: OpenAiUsage) -> Self {
        Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    code: Option<String>,
}

// Streaming types
#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    id: String,
    model: Option<String>,
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_body(tokens: &[&str]) -> String {
        let mut body = String::new();
        for token in tokens {
            body.push_str(&format!(
                "data: {{\"id\":\"chatcmpl-1\",\"model\":\"gpt-test\",\"choices\":[{{\"delta\":{{\"content\":\"{}\"}},\"finish_reason\":null}}]}}\n\n",
                token
            ));
        }
        body.push_str(
            "data: {\"id\":\"chatcmpl-1\",\"model\":\"gpt-test\",\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        );
        body.push_str("data: [DONE]\n\n");
        body
    }

    async fn provider_for(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::with_base_url("test-key", format!("{}/v1/chat/completions", server.uri()))
    }

    #[test]
    fn test_provider_new() {
        let provider = OpenAiProvider::new("test-key");
        assert_eq!(provider.api_key, "test-key");
        assert_eq!(provider.base_url, OPENAI_API_URL);
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_convert_messages_roles() {
        let messages = vec![
            Message::system("You are a calculator"),
            Message::human("1 + 1"),
            Message::ai("2"),
            Message::function("add", "3"),
            Message::new(Role::Function, "4"),
        ];

        let converted = OpenAiProvider::convert_messages(&messages);

        let roles: Vec<_> = converted.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "function", "function"]);
        assert!(converted[0].name.is_none());
        assert_eq!(converted[3].name.as_deref(), Some("add"));
        assert_eq!(converted[4].name.as_deref(), Some("function"));
    }

    #[test]
    fn test_build_request() {
        let provider = OpenAiProvider::new("test-key");
        let request = CompletionRequest::new("gpt-3.5-turbo", vec![Message::human("Hello")])
            .with_temperature(0.2);

        let built = provider.build_request(&request);
        let json = serde_json::to_value(&built).unwrap();

        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["stream"], true);
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 0.001);
    }

    #[test]
    fn test_parse_error_authentication() {
        let body = r#"{"error": {"code": "invalid_api_key", "message": "Incorrect API key"}}"#;
        let error = OpenAiProvider::parse_error(401, None, body);
        assert!(matches!(error, ActAsError::Api(ApiError::AuthenticationFailed)));
    }

    #[test]
    fn test_parse_error_rate_limit_uses_retry_after() {
        let error = OpenAiProvider::parse_error(429, Some(7), "");
        assert!(matches!(error, ActAsError::Api(ApiError::RateLimited(7))));

        let error = OpenAiProvider::parse_error(429, None, "");
        assert!(matches!(error, ActAsError::Api(ApiError::RateLimited(60))));
    }

    #[test]
    fn test_parse_error_model_not_found() {
        let body = r#"{"error": {"code": "model_not_found", "message": "The model `nope` does not exist"}}"#;
        let error = OpenAiProvider::parse_error(404, None, body);
        assert!(matches!(error, ActAsError::Api(ApiError::ModelNotFound(_))));
    }

    #[test]
    fn test_parse_error_unstructured_body() {
        let error = OpenAiProvider::parse_error(502, None, "upstream down");
        match error {
            ActAsError::Api(ApiError::ServerError { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("Expected ServerError, got {other:?}"),
        }
    }

    #[test]
    fn test_drain_lines_keeps_partial_line() {
        let mut buffer = b"data: {\"id\":\"a\",\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\ndata: {\"id\"".to_vec();
        let mut started = false;

        let events = OpenAiProvider::drain_lines(&mut buffer, &mut started);

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Ok(StreamEvent::TextDelta { ref text }) if text == "Hi"));
        assert_eq!(buffer, b"data: {\"id\"".to_vec());
    }

    #[test]
    fn test_drain_lines_in_stream_error() {
        let mut buffer =
            b"data: {\"error\":{\"message\":\"overloaded\",\"code\":\"server_error\"}}\n".to_vec();
        let mut started = false;

        let events = OpenAiProvider::drain_lines(&mut buffer, &mut started);

        assert!(matches!(
            events.as_slice(),
            [Ok(StreamEvent::Error { error_type, message })]
                if error_type == "server_error" && message == "overloaded"
        ));
    }

    #[test]
    fn test_parse_data_usage_only_chunk() {
        let mut started = true;
        let data = r#"{"id":"chatcmpl-1","model":"gpt-test","choices":[],"usage":{"prompt_tokens":5,"completion_tokens":1}}"#;

        let events = OpenAiProvider::parse_data(data, &mut started);

        match events.as_slice() {
            [Ok(StreamEvent::MessageDelta {
                stop_reason: None,
                usage: Some(usage),
            })] => assert_eq!(usage.total_tokens(), 6),
            other => panic!("Expected usage delta, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_stream_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-test",
                "stream": true,
                "messages": [{"role": "user", "content": "Hello"}]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&["Bon", "jour"])),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let mut stream = provider
            .complete_stream(CompletionRequest::new(
                "gpt-test",
                vec![Message::human("Hello")],
            ))
            .await
            .unwrap();

        let mut text = String::new();
        let mut stopped = false;
        while let Some(event) = stream.next().await {
            match event.unwrap() {
                StreamEvent::TextDelta { text: delta } => text.push_str(&delta),
                StreamEvent::MessageStop => stopped = true,
                _ => {}
            }
        }

        assert_eq!(text, "Bonjour");
        assert!(stopped);
    }

    #[tokio::test]
    async fn test_complete_stream_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let err = provider
            .complete_stream(CompletionRequest::new("gpt-test", vec![Message::human("x")]))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, ActAsError::Api(ApiError::RateLimited(3))));
    }
}
