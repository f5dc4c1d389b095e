// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock LLM provider for testing
//!
//! Provides a configurable mock implementation of the LlmProvider trait
//! that can be used in tests without making real API calls. Responses are
//! either queued strings or computed from the request by a responder, so the
//! same prompt always yields the same completion.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{ActAsError, ApiError, Result};
use crate::llm::provider::{
    CompletionRequest, EventStream, LlmProvider, StopReason, StreamEvent, Usage,
};

type Responder = Arc<dyn Fn(&CompletionRequest) -> String + Send + Sync>;

/// A mock LLM provider for testing
#[derive(Clone)]
pub struct MockProvider {
    /// Provider name
    name: String,
    /// Configured responses
    responses: Arc<Mutex<Vec<String>>>,
    /// Computes the response from the request, overrides `responses`
    responder: Option<Responder>,
    /// Call counter
    call_count: Arc<AtomicUsize>,
    /// Recorded requests
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Number of leading calls that fail before any succeeds
    failures: Arc<AtomicUsize>,
    /// Kind of failure returned while `failures` is non-zero
    failure: MockFailure,
    /// Emit an in-stream error after this many tokens
    stream_error_after: Option<usize>,
    /// Characters per streamed token
    chunk_size: usize,
    /// Pause between streamed tokens
    token_delay: Option<Duration>,
    /// Tokens handed out by any stream so far
    tokens_emitted: Arc<AtomicUsize>,
}

/// Failure injected by [`MockProvider::with_failures`]
#[derive(Clone, Copy, Debug)]
pub enum MockFailure {
    /// Transient network failure (retryable)
    Network,
    /// Bad credentials (not retryable)
    Authentication,
    /// Backend returned the given HTTP status
    Server(u16),
}

impl MockFailure {
    fn to_error(self) -> ActAsError {
        match self {
            MockFailure::Network => {
                ActAsError::Api(ApiError::Network("mock connection reset".to_string()))
            }
            MockFailure::Authentication => ActAsError::Api(ApiError::AuthenticationFailed),
            MockFailure::Server(status) => ActAsError::Api(ApiError::ServerError {
                status,
                message: "mock server error".to_string(),
            }),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            responses: Arc::new(Mutex::new(vec!["Mock response".to_string()])),
            responder: None,
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(vec![])),
            failures: Arc::new(AtomicUsize::new(0)),
            failure: MockFailure::Network,
            stream_error_after: None,
            chunk_size: 3,
            token_delay: None,
            tokens_emitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the text response
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.with_responses(vec![text.into()])
    }

    /// Queue multiple responses (returned in order, last one repeats)
    pub fn with_responses(self, texts: Vec<String>) -> Self {
        let mut responses = match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Mock provider responses lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *responses = texts;
        drop(responses);
        self
    }

    /// Compute each response from its request
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> String + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Fail the first `count` calls with `failure`
    pub fn with_failures(mut self, count: usize, failure: MockFailure) -> Self {
        self.failures = Arc::new(AtomicUsize::new(count));
        self.failure = failure;
        self
    }

    /// Break every stream with an error event after `tokens` tokens
    pub fn with_stream_error_after(mut self, tokens: usize) -> Self {
        self.stream_error_after = Some(tokens);
        self
    }

    /// Characters per streamed token (minimum 1)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sleep between streamed tokens
    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = Some(delay);
        self
    }

    /// Get the number of times complete_stream() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Number of tokens produced across all streams
    pub fn tokens_emitted(&self) -> usize {
        self.tokens_emitted.load(Ordering::SeqCst)
    }

    /// Get all recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.lock_requests().clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.lock_requests().last().cloned()
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<CompletionRequest>> {
        match self.recorded_requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record the call and either fail or produce the response text
    fn begin_call(&self, request: &CompletionRequest) -> Result<String> {
        self.lock_requests().push(request.clone());
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(self.failure.to_error());
        }

        if let Some(responder) = &self.responder {
            return Ok(responder(request));
        }

        let responses = match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(match responses.len() {
            0 => String::new(),
            len => responses[count.min(len - 1)].clone(),
        })
    }

    fn chunks(&self, text: &str) -> Vec<String> {
        text.chars()
            .collect::<Vec<_>>()
            .chunks(self.chunk_size)
            .map(|chunk| chunk.iter().collect())
            .collect()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let text = self.begin_call(&request)?;
        let chunks = self.chunks(&text);
        let usage = Usage {
            input_tokens: request
                .messages
                .iter()
                .map(|m| m.content.split_whitespace().count() as u32)
                .sum(),
            output_tokens: chunks.len() as u32,
        };
        let model = request.model.clone();
        let id = format!("mock-{}", uuid::Uuid::new_v4().simple());
        let error_after = self.stream_error_after;
        let delay = self.token_delay;
        let emitted = self.tokens_emitted.clone();

        let events = async_stream::stream! {
            yield Ok(StreamEvent::MessageStart { id, model });

            for (index, chunk) in chunks.into_iter().enumerate() {
                if error_after == Some(index) {
                    yield Ok(StreamEvent::Error {
                        error_type: "mock_error".to_string(),
                        message: "mock stream interrupted".to_string(),
                    });
                    return;
                }
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                emitted.fetch_add(1, Ordering::SeqCst);
                yield Ok(StreamEvent::TextDelta { text: chunk });
            }

            yield Ok(StreamEvent::MessageDelta {
                stop_reason: Some(StopReason::EndTurn),
                usage: Some(usage),
            });
            yield Ok(StreamEvent::MessageStop);
        };

        Ok(Box::pin(events))
    }
}
