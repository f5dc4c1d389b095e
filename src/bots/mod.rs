// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Bot personas
//!
//! Bots are YAML files holding role-tagged message templates. The registry
//! loads them, the template module renders them against request parameters,
//! and the builder turns a bot plus parameters into a model-ready prompt.

pub mod builder;
pub mod registry;
pub mod schema;
pub mod template;

pub use builder::build_messages;
pub use registry::BotRegistry;
pub use schema::{BotDefinition, BotMessage};
pub use template::{has_message_template, render, RequestParameters, PRIMARY_INPUT};
