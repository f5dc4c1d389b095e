// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Provider factory for creating LLM providers

use std::sync::Arc;

use crate::config::Settings;
use crate::error::{ActAsError, Result};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::OpenAiProvider;

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Factory for creating LLM providers
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the configured provider
    ///
    /// Fails with a configuration error when no API key is available.
    pub fn create(settings: &Settings) -> Result<Arc<dyn LlmProvider>> {
        let api_key = settings.get_api_key().ok_or_else(|| {
            ActAsError::Config(format!(
                "No OpenAI API key found. Set {} or add llm.api_key to {}.",
                settings.llm.api_key_env,
                Settings::default_path().display()
            ))
        })?;

        let provider = match settings.llm.base_url.as_deref() {
            Some(base_url) => OpenAiProvider::with_base_url(api_key, Self::endpoint(base_url)),
            None => OpenAiProvider::new(api_key),
        };

        Ok(Arc::new(provider))
    }

    /// Resolve an OpenAI-style base URL (`.../v1`) to the completions endpoint
    fn endpoint(base_url: &str) -> String {
        let trimmed = base_url.trim_end_matches('/');
        if trimmed.ends_with(CHAT_COMPLETIONS_PATH) {
            trimmed.to_string()
        } else {
            format!("{}{}", trimmed, CHAT_COMPLETIONS_PATH)
        }
    }
}
