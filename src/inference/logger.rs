// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Per-token echo of model output
//!
//! On a terminal tokens are echoed to stderr in yellow as they arrive;
//! otherwise they go to `tracing` at trace level. Prompt and final response
//! are logged at info either way. An attempt that fails part way is closed
//! with a marker line so a retry's echo starts clean.

use std::io::{self, IsTerminal, Write};

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};

use crate::error::ActAsError;
use crate::llm::provider::{CompletionRequest, StopReason, Usage};

const INTERRUPTED_MARKER: &str = "[interrupted]";

/// Echoes tokens for one prediction
pub struct TokenLogger {
    terminal: bool,
    painting: bool,
    tokens: usize,
}

impl Default for TokenLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenLogger {
    /// Colour on a terminal, tracing otherwise
    pub fn new() -> Self {
        Self {
            terminal: io::stderr().is_terminal(),
            painting: false,
            tokens: 0,
        }
    }

    /// `new` when `echo` is set, `tracing_only` otherwise
    pub fn with_echo(echo: bool) -> Self {
        if echo {
            Self::new()
        } else {
            Self::tracing_only()
        }
    }

    /// Never write to the terminal
    pub fn tracing_only() -> Self {
        Self {
            terminal: false,
            painting: false,
            tokens: 0,
        }
    }

    /// Log the outgoing prompt
    pub fn start(&mut self, request: &CompletionRequest) {
        let prompts: Vec<String> = request
            .messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect();
        tracing::info!(model = %request.model, "prompts: {:?}", prompts);

        if self.terminal {
            let _ = io::stderr().execute(SetForegroundColor(Color::Yellow));
            self.painting = true;
        }
    }

    /// Echo one token
    pub fn token(&mut self, token: &str) {
        self.tokens += 1;
        if self.painting {
            let mut stderr = io::stderr();
            let _ = stderr.write_all(token.as_bytes());
            let _ = stderr.flush();
        } else {
            tracing::trace!(token, "new token");
        }
    }

    /// Log why generation stopped and what it cost
    pub fn usage(&self, stop_reason: Option<StopReason>, usage: Option<&Usage>) {
        match usage {
            Some(usage) => tracing::debug!(
                ?stop_reason,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                total_tokens = usage.total_tokens(),
                "generation finished"
            ),
            None => tracing::debug!(?stop_reason, "generation finished"),
        }
    }

    /// Log the full response
    pub fn finish(&mut self, response: &str) {
        self.reset();
        tracing::info!("response: {}", response);
    }

    /// Close an attempt that failed after echoing some tokens
    pub fn interrupt(&mut self, error: &ActAsError) {
        if self.painting {
            let _ = write!(io::stderr(), " {}", INTERRUPTED_MARKER);
        }
        self.reset();
        if self.tokens > 0 {
            tracing::warn!(
                tokens = self.tokens,
                "prediction interrupted after partial output: {}",
                error
            );
        }
    }

    fn reset(&mut self) {
        if self.painting {
            let mut stderr = io::stderr();
            let _ = stderr.execute(ResetColor);
            let _ = writeln!(stderr);
            self.painting = false;
        }
    }
}

impl Drop for TokenLogger {
    fn drop(&mut self) {
        self.reset();
    }
}
