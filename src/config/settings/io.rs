// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::path::{Path, PathBuf};

use crate::error::{ActAsError, Result};

use super::Settings;

impl Settings {
    /// Get the default settings file path.
    pub fn default_path() -> PathBuf {
        Self::home().join("settings.json")
    }

    /// Load settings from the default path and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&Self::default_path())?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Load settings from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Override fields from environment-style variables.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("BOTS_PATH") {
            self.bots.path = PathBuf::from(path);
        }
        if let Some(model) = lookup("DEFAULT_LLM_MODEL") {
            self.llm.default_model = model;
        }
        if let Some(raw) = lookup("DEFAULT_LLM_TEMPERATURE") {
            self.llm.default_temperature = raw.trim().parse().map_err(|_| {
                ActAsError::Config(format!("DEFAULT_LLM_TEMPERATURE is not a number: {}", raw))
            })?;
        }
        if let Some(key) = lookup(&self.llm.api_key_env) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        Ok(())
    }

    /// Get the API key for the LLM backend.
    pub fn get_api_key(&self) -> Option<String> {
        self.llm.api_key.clone().filter(|key| !key.is_empty())
    }

    /// Get the act-as home directory (~/.act-as or $ACT_AS_HOME).
    pub fn home() -> PathBuf {
        if let Ok(home) = std::env::var("ACT_AS_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".act-as")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_from_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&temp_dir.path().join("nope.json")).unwrap();
        assert_eq!(settings.llm.default_model, "gpt-3.5-turbo-0613");
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"bots": {"path": "/srv/bots"}, "resilience": {"max_retries": 2}}"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.bots.path, PathBuf::from("/srv/bots"));
        assert_eq!(settings.resilience.max_retries, 2);
    }

    #[test]
    fn test_load_from_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(ActAsError::Json(_))
        ));
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env(lookup_from(&[
                ("BOTS_PATH", "/etc/bots"),
                ("DEFAULT_LLM_MODEL", "gpt-4o-mini"),
                ("DEFAULT_LLM_TEMPERATURE", "0.2"),
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
            ]))
            .unwrap();

        assert_eq!(settings.bots.path, PathBuf::from("/etc/bots"));
        assert_eq!(settings.llm.default_model, "gpt-4o-mini");
        assert!((settings.llm.default_temperature - 0.2).abs() < 0.001);
        assert_eq!(settings.get_api_key(), Some("sk-test".to_string()));
        assert_eq!(
            settings.llm.base_url,
            Some("http://localhost:8080/v1".to_string())
        );
    }

    #[test]
    fn test_apply_env_custom_key_variable() {
        let mut settings = Settings::default();
        settings.llm.api_key_env = "MY_KEY".to_string();
        settings
            .apply_env(lookup_from(&[("OPENAI_API_KEY", "ignored"), ("MY_KEY", "mine")]))
            .unwrap();

        assert_eq!(settings.get_api_key(), Some("mine".to_string()));
    }

    #[test]
    fn test_apply_env_bad_temperature() {
        let mut settings = Settings::default();
        let result = settings.apply_env(lookup_from(&[("DEFAULT_LLM_TEMPERATURE", "warm")]));
        assert!(matches!(result, Err(ActAsError::Config(_))));
    }

    #[test]
    fn test_empty_api_key_is_none() {
        let mut settings = Settings::default();
        settings.llm.api_key = Some(String::new());
        assert!(settings.get_api_key().is_none());
    }
}
