//! Anthropic → OpenAI request translation
//!
//! # Key Differences
//!
//! | Anthropic                       | OpenAI                           |
//! |---------------------------------|----------------------------------|
//! | Top-level `system` field        | `messages[0].role: "system"`     |
//! | `max_tokens` (required)         | `max_tokens`                     |
//! | `stop_sequences` (array)        | `stop` (array, omitted if empty) |
//! | `temperature` / `top_p`         | copied only when present         |

use super::anthropic::{InboundRequest, MessageContent};
use super::openai::{Role, UpstreamMessage, UpstreamRequest};
use crate::proxy::error::ProxyError;

/// Build the upstream payload for one inbound request
///
/// Deterministic and side-effect free. Fails with `Validation` on an empty
/// message list, a zero token budget, or a role outside system/user/assistant.
pub fn translate_request(request: &InboundRequest) -> Result<UpstreamRequest, ProxyError> {
    if request.messages.is_empty() {
        return Err(ProxyError::Validation(
            "messages must contain at least one message".to_string(),
        ));
    }
    if request.max_tokens == 0 {
        return Err(ProxyError::Validation(
            "max_tokens must be greater than zero".to_string(),
        ));
    }

    let mut messages = Vec::with_capacity(request.messages.len() + 1);

    // Prepend system message if present
    if let Some(system) = &request.system {
        messages.push(UpstreamMessage {
            role: Role::System,
            content: MessageContent::Text(system.to_text()),
        });
    }

    for (i, msg) in request.messages.iter().enumerate() {
        let role = Role::parse(&msg.role).ok_or_else(|| {
            ProxyError::Validation(format!(
                "messages[{}]: unsupported role '{}' (expected system, user or assistant)",
                i, msg.role
            ))
        })?;
        messages.push(UpstreamMessage {
            role,
            content: msg.content.clone(),
        });
    }

    let upstream = UpstreamRequest {
        model: request.model.clone(),
        messages,
        max_tokens: request.max_tokens,
        stream: request.stream,
        temperature: request.temperature,
        top_p: request.top_p,
        stop: request
            .stop_sequences
            .clone()
            .filter(|stops| !stops.is_empty()),
    };

    tracing::debug!(
        model = %upstream.model,
        messages = upstream.messages.len(),
        stream = upstream.stream,
        "Translated inbound request"
    );

    Ok(upstream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: serde_json::Value) -> InboundRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_basic_request_translation() {
        let request = parse(json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "Hi"}],
            "max_tokens": 16,
            "stream": false
        }));

        let upstream = translate_request(&request).unwrap();
        let body = serde_json::to_value(&upstream).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "Hi"}],
                "max_tokens": 16,
                "stream": false
            })
        );
    }

    #[test]
    fn test_system_prompt_prepended() {
        let request = parse(json!({
            "model": "gpt-4o",
            "system": "You are terse.",
            "messages": [
                {"role": "user", "content": "Hi"},
                {"role": "assistant", "content": "Hello"},
                {"role": "user", "content": "Bye"}
            ],
            "max_tokens": 32
        }));

        let upstream = translate_request(&request).unwrap();
        let roles: Vec<Role> = upstream.messages.iter().map(|m| m.role).collect();

        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(
            upstream.messages[0].content,
            MessageContent::Text("You are terse.".to_string())
        );
    }

    #[test]
    fn test_system_blocks_joined() {
        let request = parse(json!({
            "model": "gpt-4o",
            "system": [{"type": "text", "text": "Line one"}, {"type": "text", "text": "Line two"}],
            "messages": [{"role": "user", "content": "Hi"}],
            "max_tokens": 32
        }));

        let upstream = translate_request(&request).unwrap();
        assert_eq!(
            upstream.messages[0].content,
            MessageContent::Text("Line one\nLine two".to_string())
        );
    }

    #[test]
    fn test_optional_parameters_copied_when_present() {
        let request = parse(json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "Hi"}],
            "max_tokens": 100,
            "temperature": 0.5,
            "top_p": 0.25,
            "stop_sequences": ["END"],
            "stream": true
        }));

        let body = serde_json::to_value(translate_request(&request).unwrap()).unwrap();

        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["top_p"], 0.25);
        assert_eq!(body["stop"], json!(["END"]));
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_absent_parameters_are_omitted_not_null() {
        let request = parse(json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "Hi"}],
            "max_tokens": 100,
            "stop_sequences": []
        }));

        let body = serde_json::to_value(translate_request(&request).unwrap()).unwrap();
        let obj = body.as_object().unwrap();

        assert!(!obj.contains_key("temperature"));
        assert!(!obj.contains_key("top_p"));
        assert!(!obj.contains_key("stop"));
    }

    #[test]
    fn test_content_blocks_forwarded_verbatim() {
        let request = parse(json!({
            "model": "gpt-4o",
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "first"},
                    {"type": "text", "text": "second"}
                ]
            }],
            "max_tokens": 10
        }));

        let body = serde_json::to_value(translate_request(&request).unwrap()).unwrap();
        assert_eq!(
            body["messages"][0]["content"],
            json!([{"type": "text", "text": "first"}, {"type": "text", "text": "second"}])
        );
    }

    #[test]
    fn test_multibyte_text_preserved() {
        let text = "こんにちは 🌍 — ça va?";
        let request = parse(json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": text}],
            "max_tokens": 10
        }));

        let upstream = translate_request(&request).unwrap();
        assert_eq!(
            upstream.messages[0].content,
            MessageContent::Text(text.to_string())
        );
    }

    #[test]
    fn test_unknown_role_rejected() {
        let request = parse(json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "user", "content": "Hi"},
                {"role": "function", "content": "{}"}
            ],
            "max_tokens": 10
        }));

        let err = translate_request(&request).unwrap_err();
        assert!(matches!(err, ProxyError::Validation(_)));
        assert!(err.to_string().contains("messages[1]"));
        assert!(err.to_string().contains("'function'"));
    }

    #[test]
    fn test_empty_messages_rejected() {
        let request = parse(json!({"model": "gpt-4o", "messages": [], "max_tokens": 10}));
        assert!(matches!(
            translate_request(&request),
            Err(ProxyError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let request = parse(json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "Hi"}],
            "max_tokens": 0
        }));
        assert!(matches!(
            translate_request(&request),
            Err(ProxyError::Validation(_))
        ));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let request = parse(json!({
            "model": "gpt-4o",
            "system": "s",
            "messages": [{"role": "user", "content": "Hi"}],
            "max_tokens": 10,
            "temperature": 0.2
        }));

        assert_eq!(
            translate_request(&request).unwrap(),
            translate_request(&request).unwrap()
        );
    }
}
