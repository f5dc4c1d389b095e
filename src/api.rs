// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Request-level operations and their response payloads
//!
//! [`BotService`] is what an HTTP layer would route to: list bots, show one,
//! reply in full or stream a reply. Failures are turned into an
//! [`ErrorResponse`] carrying a status code and message.

use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::bots::{BotDefinition, BotRegistry, RequestParameters, PRIMARY_INPUT};
use crate::error::{ActAsError, Result};
use crate::inference::{Predictor, TokenStream};

const REPLY_KEY: &str = "reply";

/// A completed reply, echoing the request parameters alongside it
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Reply {
    pub reply: String,
    #[serde(flatten)]
    pub params: RequestParameters,
}

/// `reply` comes first; a caller parameter of the same name overrides it.
impl Serialize for Reply {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let echoed = self.params.iter().filter(|(key, _)| key.as_str() != REPLY_KEY);
        let mut map = serializer.serialize_map(Some(echoed.clone().count() + 1))?;
        map.serialize_entry(REPLY_KEY, self.params.get(REPLY_KEY).unwrap_or(&self.reply))?;
        for (key, value) in echoed {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Error payload: `{"message": ...}` plus the HTTP status it maps to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    #[serde(skip)]
    pub status: u16,
    pub message: String,
}

impl ErrorResponse {
    /// 400 for missing parameters, 500 for everything else
    pub fn from_error(error: &ActAsError) -> Self {
        let status = if error.is_client_error() { 400 } else { 500 };
        if status >= 500 {
            tracing::error!("Request failed: {:?}", error);
        } else {
            tracing::warn!("Rejected request: {}", error);
        }
        Self {
            status,
            message: error.to_string(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

impl From<&ActAsError> for ErrorResponse {
    fn from(error: &ActAsError) -> Self {
        Self::from_error(error)
    }
}

/// Bot operations over a shared registry and predictor
#[derive(Clone)]
pub struct BotService {
    registry: Arc<BotRegistry>,
    predictor: Predictor,
}

impl BotService {
    pub fn new(registry: Arc<BotRegistry>, predictor: Predictor) -> Self {
        Self {
            registry,
            predictor,
        }
    }

    pub fn registry(&self) -> &BotRegistry {
        &self.registry
    }

    /// Names of all bots
    pub fn list(&self) -> Result<Vec<String>> {
        self.registry.names()
    }

    /// One bot's definition
    pub fn get(&self, name: &str) -> Result<BotDefinition> {
        self.registry.fetch(name).cloned()
    }

    /// Full reply from `name` for `params`
    pub async fn reply(&self, name: &str, params: RequestParameters) -> Result<Reply> {
        require_message(&params)?;
        let bot = self.registry.fetch(name)?;
        let reply = bot.one_shot(&self.predictor, &params).await?;
        Ok(Reply { reply, params })
    }

    /// Streamed reply from `name` for `params`
    pub async fn stream_reply(&self, name: &str, params: RequestParameters) -> Result<TokenStream> {
        require_message(&params)?;
        let bot = self.registry.fetch(name)?;
        bot.stream_one_shot(&self.predictor, &params).await
    }
}

fn require_message(params: &RequestParameters) -> Result<()> {
    if params.contains_key(PRIMARY_INPUT) {
        Ok(())
    } else {
        Err(ActAsError::MissingParameter(PRIMARY_INPUT.to_string()))
    }
}
