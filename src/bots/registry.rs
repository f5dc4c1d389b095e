// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Bot registry
//!
//! Loads every `*.yml` / `*.yaml` file in the bots directory on first access
//! and keeps the parsed definitions until [`BotRegistry::invalidate`].

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::config::Settings;
use crate::error::{ActAsError, Result};

use super::schema::BotDefinition;

/// Registry of available bots
#[derive(Debug)]
pub struct BotRegistry {
    /// Directory scanned for bot files
    dir: PathBuf,
    /// Parsed definitions, sorted by name
    cache: OnceLock<Vec<BotDefinition>>,
}

impl BotRegistry {
    /// Create a registry over `dir`. Nothing is read until first access.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: OnceLock::new(),
        }
    }

    /// Create a registry over the configured bots directory
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.bots.path.clone())
    }

    /// Directory this registry reads from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All bots, loading them on first call
    pub fn fetch_all(&self) -> Result<&[BotDefinition]> {
        if let Some(bots) = self.cache.get() {
            return Ok(bots);
        }

        let bots = self.scan()?;
        tracing::debug!("Loaded {} bots from {}", bots.len(), self.dir.display());
        Ok(self.cache.get_or_init(|| bots))
    }

    /// Look up a bot by name
    pub fn fetch(&self, name: &str) -> Result<&BotDefinition> {
        self.fetch_all()?
            .iter()
            .find(|bot| bot.name == name)
            .ok_or_else(|| ActAsError::NotFound(name.to_string()))
    }

    /// Bot names, in name order
    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self.fetch_all()?.iter().map(|bot| bot.name.clone()).collect())
    }

    /// Drop cached definitions so the next access rereads the directory
    pub fn invalidate(&mut self) {
        if self.cache.take().is_some() {
            tracing::debug!("Bot cache invalidated for {}", self.dir.display());
        }
    }

    fn scan(&self) -> Result<Vec<BotDefinition>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            ActAsError::Config(format!(
                "Failed to read bots directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut bots = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || !is_bot_file(&path) {
                continue;
            }

            match load_bot(&path) {
                Ok(bot) => bots.push(bot),
                Err(e) => {
                    tracing::warn!("Skipping bot file {}: {}", path.display(), e);
                }
            }
        }

        bots.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(bots)
    }
}

fn is_bot_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yml") | Some("yaml")
    )
}

fn load_bot(path: &Path) -> Result<BotDefinition> {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| ActAsError::Config(format!("Invalid bot file name: {}", path.display())))?;

    let content = std::fs::read_to_string(path)?;
    let mut bot: BotDefinition = serde_yaml::from_str(&content)?;
    bot.name = name.to_string();
    Ok(bot)
}
