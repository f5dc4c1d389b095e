// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! act-as - configurable bot personas over a chat-model backend.
//!
//! This crate exposes the shared runtime used by the `act-as` CLI
//! (`src/main.rs`) and by any HTTP layer built on [`api::BotService`].
//!
//! Architecture highlights:
//! - `bots`: YAML bot registry, strict template rendering, prompt assembly
//! - `inference`: single-shot and streaming prediction over a provider
//! - `llm`: provider abstraction, OpenAI-compatible backend, retry, mock
//! - `api`: request-level operations and response payloads
//! - `config`: settings file and environment overrides

pub mod api;
pub mod bots;
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod llm;

pub use error::{ActAsError, Result};
