// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Inference driver
//!
//! [`Predictor`] runs a prompt against the configured provider, either to
//! completion with retries ([`Predictor::predict`]) or as a live
//! [`TokenStream`] fed by a background task ([`Predictor::stream_predict`]).

mod logger;
mod stream;

pub use logger::TokenLogger;
pub use stream::TokenStream;

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::bots::BotMessage;
use crate::config::Settings;
use crate::error::{ActAsError, ApiError, Result};
use crate::llm::message::Message;
use crate::llm::provider::{CompletionRequest, LlmProvider, StreamEvent};
use crate::llm::retry::{with_retry, RetryConfig};

/// Tokens buffered between producer and consumer
pub const STREAM_BUFFER: usize = 32;

/// Prompt accepted by the predictor
#[derive(Debug, Clone, Default)]
pub enum PromptInput {
    /// Nothing to send
    #[default]
    Empty,
    /// Already-typed messages
    Messages(Vec<Message>),
    /// Raw role/content pairs, converted on use
    Raw(Vec<BotMessage>),
}

impl PromptInput {
    /// Normalize into a message sequence
    pub fn into_messages(self) -> Result<Vec<Message>> {
        match self {
            PromptInput::Empty => Ok(Vec::new()),
            PromptInput::Messages(messages) => Ok(messages),
            PromptInput::Raw(raw) => raw.iter().map(BotMessage::to_message).collect(),
        }
    }
}

impl From<Vec<Message>> for PromptInput {
    fn from(messages: Vec<Message>) -> Self {
        PromptInput::Messages(messages)
    }
}

impl From<Message> for PromptInput {
    fn from(message: Message) -> Self {
        PromptInput::Messages(vec![message])
    }
}

impl From<Vec<BotMessage>> for PromptInput {
    fn from(raw: Vec<BotMessage>) -> Self {
        PromptInput::Raw(raw)
    }
}

impl From<BotMessage> for PromptInput {
    fn from(raw: BotMessage) -> Self {
        PromptInput::Raw(vec![raw])
    }
}

impl<T: Into<PromptInput>> From<Option<T>> for PromptInput {
    fn from(input: Option<T>) -> Self {
        input.map(Into::into).unwrap_or_default()
    }
}

/// Drives completions against one provider
#[derive(Clone)]
pub struct Predictor {
    provider: Arc<dyn LlmProvider>,
    default_model: String,
    default_temperature: f32,
    retry: RetryConfig,
    echo: bool,
}

impl Predictor {
    /// Predictor with built-in defaults
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::from_settings(provider, &Settings::default())
    }

    /// Predictor using the configured model, temperature and retry policy
    pub fn from_settings(provider: Arc<dyn LlmProvider>, settings: &Settings) -> Self {
        Self {
            provider,
            default_model: settings.llm.default_model.clone(),
            default_temperature: settings.llm.default_temperature,
            retry: RetryConfig::from(&settings.resilience),
            echo: true,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = temperature;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Echo tokens to a terminal stderr as they arrive (on by default)
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn request(
        &self,
        input: impl Into<PromptInput>,
        model: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<CompletionRequest> {
        let messages = input.into().into_messages()?;
        Ok(CompletionRequest::new(
            model.unwrap_or(&self.default_model),
            messages,
        )
        .with_temperature(temperature.unwrap_or(self.default_temperature)))
    }

    /// Run a prompt to completion and return the full text.
    ///
    /// `None` arguments fall back to the predictor's defaults. Transient
    /// backend failures are retried up to `max_retries` times.
    pub async fn predict(
        &self,
        input: impl Into<PromptInput>,
        model: Option<&str>,
        max_retries: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String> {
        let request = self.request(input, model, temperature)?;
        let retry = match max_retries {
            Some(n) => self.retry.clone().with_max_retries(n),
            None => self.retry.clone(),
        };

        let provider = &self.provider;
        let echo = self.echo;
        with_retry(
            || drain(provider.as_ref(), request.clone(), echo),
            Some(retry),
            "predict",
        )
        .await
    }

    /// Start a streaming prediction.
    ///
    /// Only prompt normalization errors are returned here; backend failures
    /// arrive as the stream's final item.
    pub async fn stream_predict(
        &self,
        input: impl Into<PromptInput>,
        model: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<TokenStream> {
        let request = self.request(input, model, temperature)?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let provider = self.provider.clone();
        let echo = self.echo;

        let producer = tokio::spawn(async move {
            if let Err(e) = produce(provider.as_ref(), request, &tx, echo).await {
                tracing::error!("Streaming prediction failed: {}", e);
                let _ = tx.send(Err(e)).await;
            }
        });

        Ok(TokenStream::new(rx, producer))
    }
}

fn stream_error(error_type: &str, message: &str) -> ActAsError {
    ActAsError::Api(ApiError::StreamError(format!("{}: {}", error_type, message)))
}

/// Open a provider stream and concatenate its text
async fn drain(
    provider: &dyn LlmProvider,
    request: CompletionRequest,
    echo: bool,
) -> Result<String> {
    let mut logger = TokenLogger::with_echo(echo);
    logger.start(&request);

    match relay(provider, request, &mut logger, None).await {
        Ok(text) => {
            logger.finish(&text);
            Ok(text)
        }
        Err(e) => {
            logger.interrupt(&e);
            Err(e)
        }
    }
}

/// Forward provider tokens into the channel until done or the consumer leaves
async fn produce(
    provider: &dyn LlmProvider,
    request: CompletionRequest,
    tx: &mpsc::Sender<Result<String>>,
    echo: bool,
) -> Result<()> {
    let mut logger = TokenLogger::with_echo(echo);
    logger.start(&request);

    match relay(provider, request, &mut logger, Some(tx)).await {
        Ok(text) => {
            logger.finish(&text);
            Ok(())
        }
        Err(e) => {
            logger.interrupt(&e);
            Err(e)
        }
    }
}

/// Read provider events into `logger`, and into `tx` when given.
///
/// Returns the text seen so far once the provider stops or the consumer
/// behind `tx` goes away.
async fn relay(
    provider: &dyn LlmProvider,
    request: CompletionRequest,
    logger: &mut TokenLogger,
    tx: Option<&mpsc::Sender<Result<String>>>,
) -> Result<String> {
    let mut events = provider.complete_stream(request).await?;
    let mut text = String::new();
    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::TextDelta { text: token } => {
                logger.token(&token);
                text.push_str(&token);
                if let Some(tx) = tx {
                    if tx.send(Ok(token)).await.is_err() {
                        tracing::debug!("Token stream consumer dropped, stopping producer");
                        break;
                    }
                }
            }
            StreamEvent::MessageDelta { stop_reason, usage } => {
                logger.usage(stop_reason, usage.as_ref());
            }
            StreamEvent::Error {
                error_type,
                message,
            } => return Err(stream_error(&error_type, &message)),
            StreamEvent::MessageStop => break,
            _ => {}
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::Role;
    use crate::llm::mock_provider::{MockFailure, MockProvider};

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter: 0.0,
        }
    }

    #[test]
    fn test_prompt_input_normalization() {
        assert!(PromptInput::from(None::<Message>)
            .into_messages()
            .unwrap()
            .is_empty());

        let single = PromptInput::from(Message::human("hi")).into_messages().unwrap();
        assert_eq!(single, vec![Message::human("hi")]);

        let raw = PromptInput::from(vec![
            BotMessage::new("system", "s"),
            BotMessage::new("ai", "a"),
        ])
        .into_messages()
        .unwrap();
        assert_eq!(raw[0].role, Role::System);
        assert_eq!(raw[1].role, Role::Ai);

        let bad = PromptInput::from(BotMessage::new("bot", "x")).into_messages();
        assert!(matches!(bad, Err(ActAsError::UnknownRole(_))));
    }

    #[tokio::test]
    async fn test_predict_uses_defaults_and_overrides() {
        let mock = Arc::new(MockProvider::new().with_response("ok"));
        let predictor = Predictor::new(mock.clone()).with_model("base-model");

        predictor
            .predict(Message::human("a"), None, None, None)
            .await
            .unwrap();
        let request = mock.last_request().unwrap();
        assert_eq!(request.model, "base-model");
        assert!((request.temperature - 0.5).abs() < 0.001);

        predictor
            .predict(Message::human("b"), Some("other"), None, Some(0.9))
            .await
            .unwrap();
        let request = mock.last_request().unwrap();
        assert_eq!(request.model, "other");
        assert!((request.temperature - 0.9).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_predict_retries_transient_failures() {
        let mock = Arc::new(
            MockProvider::new()
                .with_response("2")
                .with_failures(2, MockFailure::Network),
        );
        let predictor = Predictor::new(mock.clone()).with_retry(fast_retry());

        let reply = predictor
            .predict(Message::human("1 + 1"), None, None, None)
            .await
            .unwrap();
        assert_eq!(reply, "2");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_predict_respects_max_retries_argument() {
        let mock = Arc::new(MockProvider::new().with_failures(10, MockFailure::Server(503)));
        let predictor = Predictor::new(mock.clone()).with_retry(fast_retry());

        let result = predictor
            .predict(Message::human("x"), None, Some(1), None)
            .await;
        assert!(result.is_err());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_predict_does_not_retry_auth_failure() {
        let mock = Arc::new(MockProvider::new().with_failures(1, MockFailure::Authentication));
        let predictor = Predictor::new(mock.clone()).with_retry(fast_retry());

        let result = predictor.predict(Message::human("x"), None, None, None).await;
        assert!(matches!(
            result,
            Err(ActAsError::Api(ApiError::AuthenticationFailed))
        ));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stream_predict_tokens_in_order() {
        let mock = Arc::new(MockProvider::new().with_response("abcdef").with_chunk_size(2));
        let predictor = Predictor::new(mock);

        let mut stream = predictor
            .stream_predict(Message::human("x"), None, None)
            .await
            .unwrap();
        let mut tokens = Vec::new();
        while let Some(token) = stream.next().await {
            tokens.push(token.unwrap());
        }
        assert_eq!(tokens, vec!["ab", "cd", "ef"]);
    }

    #[tokio::test]
    async fn test_stream_predict_echo_setting_does_not_change_tokens() {
        let mock = Arc::new(MockProvider::new().with_response("abcdef").with_chunk_size(2));
        let echoing = Predictor::new(mock.clone());
        let quiet = Predictor::new(mock).with_echo(false);

        let loud = echoing
            .stream_predict(Message::human("x"), None, None)
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap();
        let silent = quiet
            .stream_predict(Message::human("x"), None, None)
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap();

        assert_eq!(loud, "abcdef");
        assert_eq!(loud, silent);
    }

    #[tokio::test]
    async fn test_stream_predict_open_failure_is_terminal_item() {
        let mock = Arc::new(MockProvider::new().with_failures(1, MockFailure::Authentication));
        let predictor = Predictor::new(mock);

        let mut stream = predictor
            .stream_predict(Message::human("x"), None, None)
            .await
            .unwrap();
        assert!(matches!(
            stream.next().await,
            Some(Err(ActAsError::Api(ApiError::AuthenticationFailed)))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_predict_rejects_bad_roles_up_front() {
        let predictor = Predictor::new(Arc::new(MockProvider::new()));
        let result = predictor
            .stream_predict(vec![BotMessage::new("narrator", "x")], None, None)
            .await;
        assert!(matches!(result, Err(ActAsError::UnknownRole(_))));
    }
}
