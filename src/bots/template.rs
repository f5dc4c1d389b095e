// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Strict template rendering for bot messages
//!
//! Message content is a Jinja template. Rendering fails on the first
//! placeholder the caller did not supply, reported as
//! [`ActAsError::MissingParameter`].

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use regex::Regex;

use crate::error::{ActAsError, Result};
use crate::llm::message::Message;

/// Parameter carrying the caller's main text
pub const PRIMARY_INPUT: &str = "message";

/// Caller-supplied template parameters
pub type RequestParameters = BTreeMap<String, String>;

/// True if raw content references `{{ message }}`
pub fn has_message_template(content: &str) -> bool {
    static MESSAGE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = MESSAGE_REGEX
        .get_or_init(|| Regex::new(r"\{\{\s*message\s*\}\}").expect("valid message regex"));
    regex.is_match(content)
}

/// Render a message's content against `params`
pub fn render(message: &Message, params: &RequestParameters) -> Result<Message> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    let template = env.template_from_str(&message.content)?;
    match template.render(params) {
        Ok(content) => Ok(message.with_content(content)),
        Err(err) if err.kind() == ErrorKind::UndefinedError => {
            let mut undeclared = template.undeclared_variables(false);
            for (global, _) in env.globals() {
                undeclared.remove(global);
            }
            Err(ActAsError::MissingParameter(required_name(
                &message.content,
                &err,
                &undeclared,
                params,
            )))
        }
        Err(err) => Err(err.into()),
    }
}

/// Name to report for a failed lookup.
///
/// Prefers an unsupplied variable inside the failing expression, then the
/// first unsupplied variable referenced by any tag, then the expression
/// itself (an attribute of a supplied value, say).
fn required_name(
    source: &str,
    err: &minijinja::Error,
    undeclared: &HashSet<String>,
    params: &RequestParameters,
) -> String {
    let is_missing = |name: &str| undeclared.contains(name) && !params.contains_key(name);
    let span = err
        .range()
        .and_then(|range| source.get(range))
        .map(str::trim)
        .filter(|span| !span.is_empty());

    if let Some(name) = span.and_then(|span| identifiers(span).find(|name| is_missing(*name))) {
        return name.to_string();
    }
    if let Some(name) = tags(source)
        .flat_map(identifiers)
        .find(|name| is_missing(*name))
    {
        return name.to_string();
    }
    match span {
        Some(span) => span.to_string(),
        None => err.detail().unwrap_or("undefined value").to_string(),
    }
}

/// `{{ ... }}` and `{% ... %}` bodies in source order
fn tags(source: &str) -> impl Iterator<Item = &str> {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    TAG_REGEX
        .get_or_init(|| Regex::new(r"(?s)\{\{(.*?)\}\}|\{%(.*?)%\}").expect("valid tag regex"))
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str())
}

/// Identifiers in an expression, skipping string literals and attribute names
fn identifiers(expr: &str) -> impl Iterator<Item = &str> {
    static IDENT_REGEX: OnceLock<Regex> = OnceLock::new();
    IDENT_REGEX
        .get_or_init(|| {
            Regex::new(r#""[^"]*"|'[^']*'|\.\s*[A-Za-z_]\w*|([A-Za-z_]\w*)"#)
                .expect("valid identifier regex")
        })
        .captures_iter(expr)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
}
