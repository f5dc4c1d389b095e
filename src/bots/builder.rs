// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Request message assembly

use super::schema::BotMessage;
use super::template::{has_message_template, render, RequestParameters, PRIMARY_INPUT};
use crate::error::Result;
use crate::llm::message::Message;

/// Render a bot's messages for one request.
///
/// When no template references `{{ message }}`, the raw primary input is
/// appended as a trailing human message so the model always sees it. Any
/// render failure aborts the whole build.
pub fn build_messages(
    bot_messages: &[BotMessage],
    params: &RequestParameters,
) -> Result<Vec<Message>> {
    let messages = bot_messages
        .iter()
        .map(BotMessage::to_message)
        .collect::<Result<Vec<_>>>()?;

    let mut has_message = false;
    let mut rendered = Vec::with_capacity(messages.len() + 1);
    for message in &messages {
        if has_message_template(&message.content) {
            has_message = true;
        }
        rendered.push(render(message, params)?);
    }

    if !has_message {
        let input = params.get(PRIMARY_INPUT).cloned().unwrap_or_default();
        rendered.push(Message::human(input));
    }

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActAsError;
    use crate::llm::message::Role;

    fn params(pairs: &[(&str, &str)]) -> RequestParameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_template_consumes_message() {
        let bot = vec![BotMessage::new("human", "Hello {{ message }}")];
        let messages = build_messages(&bot, &params(&[("message", "World")])).unwrap();
        assert_eq!(messages, vec![Message::human("Hello World")]);
    }

    #[test]
    fn test_message_appended_when_not_referenced() {
        let bot = vec![BotMessage::new("ai", "Who are you?")];
        let messages = build_messages(&bot, &params(&[("message", "Bob")])).unwrap();
        assert_eq!(messages, vec![Message::ai("Who are you?"), Message::human("Bob")]);
    }

    #[test]
    fn test_appended_message_is_not_rendered() {
        let bot = vec![BotMessage::new("system", "Echo")];
        let messages = build_messages(&bot, &params(&[("message", "{{ x }}")])).unwrap();
        assert_eq!(messages[1].content, "{{ x }}");
    }

    #[test]
    fn test_missing_message_appends_empty() {
        let bot = vec![BotMessage::new("system", "Say hi")];
        let messages = build_messages(&bot, &RequestParameters::new()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Human);
        assert_eq!(messages[1].content, "");
    }

    #[test]
    fn test_empty_bot_yields_single_input() {
        let messages = build_messages(&[], &params(&[("message", "ping")])).unwrap();
        assert_eq!(messages, vec![Message::human("ping")]);
    }

    #[test]
    fn test_order_is_preserved() {
        let bot = vec![
            BotMessage::new("system", "s"),
            BotMessage::new("human", "h {{ message }}"),
            BotMessage::new("ai", "a"),
        ];
        let messages = build_messages(&bot, &params(&[("message", "m")])).unwrap();
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::Human, Role::Ai]);
        assert_eq!(messages[1].content, "h m");
    }

    #[test]
    fn test_render_failure_aborts_build() {
        let bot = vec![
            BotMessage::new("system", "ok"),
            BotMessage::new("human", "{{ message }} to {{ to }}"),
        ];
        let err = build_messages(&bot, &params(&[("message", "Hello")])).unwrap_err();
        assert_eq!(err.to_string(), "'to' is required!");
    }

    #[test]
    fn test_unknown_role_aborts_build() {
        let bot = vec![BotMessage::new("assistant", "hi")];
        let err = build_messages(&bot, &RequestParameters::new()).unwrap_err();
        assert!(matches!(err, ActAsError::UnknownRole(_)));
    }
}
