// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Message types for LLM interactions
//!
//! Bot files speak in `system` / `human` / `ai` / `function` roles. [`Role`]
//! is the closed set of those tags and [`Message`] is one rendered,
//! model-ready entry of a request.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ActAsError;

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt
    System,
    /// User message
    Human,
    /// Assistant response
    Ai,
    /// Function call result
    Function,
}

/// A message in a request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,

    /// Content of the message
    pub content: String,

    /// Function name, only meaningful for [`Role::Function`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Role {
    /// The tag used in bot files
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::Human => "human",
            Role::Ai => "ai",
            Role::Function => "function",
        }
    }
}

impl FromStr for Role {
    type Err = ActAsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "human" => Ok(Role::Human),
            "ai" => Ok(Role::Ai),
            "function" => Ok(Role::Function),
            other => Err(ActAsError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    /// Create a message with an explicit role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new human message
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    /// Create a new ai message
    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Role::Ai, content)
    }

    /// Create a function result message
    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Function,
            content: content.into(),
            name: Some(name.into()),
        }
    }

    /// Build a message from a raw role tag, failing on unknown roles
    pub fn from_raw(role: &str, content: impl Into<String>) -> Result<Self, ActAsError> {
        Ok(Self::new(role.parse()?, content))
    }

    /// Same message with different content
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            role: self.role,
            content: content.into(),
            name: self.name.clone(),
        }
    }
}
