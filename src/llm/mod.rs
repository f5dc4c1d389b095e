// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM module for act-as
//!
//! Provides abstraction over the chat-model backend.

pub mod factory;
pub mod message;
pub mod mock_provider;
pub mod provider;
pub mod providers;
pub mod retry;

pub use factory::ProviderFactory;
pub use message::*;
pub use mock_provider::{MockFailure, MockProvider};
pub use provider::*;
