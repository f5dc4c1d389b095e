// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for act-as
//!
//! Settings are read from `~/.act-as/settings.json` (or `$ACT_AS_HOME`), then
//! overridden by the deployment environment variables `BOTS_PATH`,
//! `DEFAULT_LLM_MODEL`, `DEFAULT_LLM_TEMPERATURE`, `OPENAI_API_KEY` and
//! `OPENAI_BASE_URL`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod io;

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Where bot definitions live
    #[serde(default)]
    pub bots: BotsConfig,

    /// LLM backend configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retry and resilience settings for API calls
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

/// Bot directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotsConfig {
    /// Directory scanned for `*.yml` / `*.yaml` bot files
    #[serde(default = "default_bots_path")]
    pub path: PathBuf,
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key (if stored directly, not recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used when a caller does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature used when a caller does not supply one
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Base URL for API (for custom endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Retry and resilience configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (cap for backoff)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter percentage (0.0 to 1.0) for randomizing delays
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            path: default_bots_path(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            base_url: None,
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

fn default_bots_path() -> PathBuf {
    PathBuf::from("sample_data/bots")
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo-0613".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    16000
}

fn default_jitter() -> f64 {
    0.25
}
