// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Bot definition schema
//!
//! A bot is one YAML file in the bots directory. The file stem is the bot's
//! name; the body lists role-tagged message templates.
//!
//! ```yaml
//! temperature: 0.2
//! messages:
//!   - role: system
//!     content: You are a translator.
//!   - role: human
//!     content: Translate {{ message }} to {{ to }}.
//! ```

use serde::{Deserialize, Serialize};

use super::builder::build_messages;
use super::template::RequestParameters;
use crate::error::Result;
use crate::inference::{Predictor, TokenStream};
use crate::llm::message::Message;

/// A named persona: ordered message templates plus a sampling temperature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotDefinition {
    /// Bot name (file stem, assigned by the registry)
    #[serde(default)]
    pub name: String,

    /// Message templates, in prompt order
    #[serde(default)]
    pub messages: Vec<BotMessage>,

    /// Sampling temperature for one-shot replies
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// One raw message as written in a bot file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotMessage {
    /// Role tag: system, human, ai or function
    pub role: String,

    /// Template source
    pub content: String,

    /// Function name for `function` messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

fn default_temperature() -> f32 {
    0.5
}

impl BotMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: None,
        }
    }

    /// Convert to a typed message; fails on unknown roles
    pub fn to_message(&self) -> Result<Message> {
        let mut message = Message::from_raw(&self.role, self.content.clone())?;
        message.name = self.name.clone();
        Ok(message)
    }
}

impl BotDefinition {
    /// Build the model-ready message sequence for one request
    pub fn build(&self, params: &RequestParameters) -> Result<Vec<Message>> {
        build_messages(&self.messages, params)
    }

    /// Build and run a single completion at this bot's temperature
    pub async fn one_shot(
        &self,
        predictor: &Predictor,
        params: &RequestParameters,
    ) -> Result<String> {
        let messages = self.build(params)?;
        tracing::debug!(bot = %self.name, messages = messages.len(), "one-shot reply");
        predictor
            .predict(messages, None, None, Some(self.temperature))
            .await
    }

    /// Build and stream a completion at this bot's temperature
    pub async fn stream_one_shot(
        &self,
        predictor: &Predictor,
        params: &RequestParameters,
    ) -> Result<TokenStream> {
        let messages = self.build(params)?;
        tracing::debug!(bot = %self.name, messages = messages.len(), "streaming reply");
        predictor
            .stream_predict(messages, None, Some(self.temperature))
            .await
    }
}
