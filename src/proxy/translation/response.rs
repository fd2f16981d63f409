//! OpenAI → Anthropic response translation (buffered)
//!
//! | OpenAI                           | Anthropic                          |
//! |----------------------------------|------------------------------------|
//! | `id`                             | `"msg_" + id`                      |
//! | `choices[0].message.content`     | `content[0]` text block            |
//! | `choices[0].finish_reason`       | `stop_reason` (passed through)     |
//! | `usage.prompt_tokens`            | `usage.input_tokens`               |
//! | `usage.completion_tokens`        | `usage.output_tokens`              |
//! | `usage.total_tokens`             | dropped                            |

use super::anthropic::{InboundResponse, ResponseBlock, Usage};
use super::openai::UpstreamCompletion;
use crate::proxy::error::ProxyError;

/// Shape a complete upstream answer into an inbound-format message
///
/// Only the first choice is surfaced. A payload without choices or without
/// usage fails with `Translation` rather than yielding a partial message.
pub fn translate_completion(
    completion: UpstreamCompletion,
    requested_model: &str,
) -> Result<InboundResponse, ProxyError> {
    let usage = completion.usage.ok_or_else(|| {
        ProxyError::Translation(format!("completion {} carries no usage", completion.id))
    })?;

    let dropped = completion.choices.len().saturating_sub(1);
    let choice = completion.choices.into_iter().next().ok_or_else(|| {
        ProxyError::Translation(format!("completion {} carries no choices", completion.id))
    })?;

    if dropped > 0 {
        tracing::debug!(
            completion_id = %completion.id,
            dropped,
            "Upstream returned multiple choices, keeping the first"
        );
    }

    // Some providers echo a resolved snapshot name; fall back to what the client asked for
    let model = if completion.model.is_empty() {
        requested_model.to_string()
    } else {
        completion.model
    };

    let mut response = InboundResponse::empty(format!("msg_{}", completion.id), model);
    response.content.push(ResponseBlock::Text {
        text: choice.message.content.unwrap_or_default(),
    });
    response.stop_reason = choice.finish_reason;
    response.usage = Usage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn completion(body: serde_json::Value) -> UpstreamCompletion {
        serde_json::from_value(body).unwrap()
    }

    fn sample() -> serde_json::Value {
        json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello! How can I assist you today?"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 13, "completion_tokens": 7, "total_tokens": 20}
        })
    }

    #[test]
    fn test_sample_completion_translation() {
        let response = translate_completion(completion(sample()), "gpt-4o-mini").unwrap();
        let body = serde_json::to_value(&response).unwrap();

        assert_eq!(
            body,
            json!({
                "id": "msg_chatcmpl-123",
                "type": "message",
                "role": "assistant",
                "content": [{"type": "text", "text": "Hello! How can I assist you today?"}],
                "model": "gpt-4o-mini",
                "stop_reason": "stop",
                "stop_sequence": null,
                "usage": {"input_tokens": 13, "output_tokens": 7}
            })
        );
    }

    #[test]
    fn test_finish_reason_passed_through() {
        let mut body = sample();
        body["choices"][0]["finish_reason"] = json!("length");

        let response = translate_completion(completion(body), "gpt-4o-mini").unwrap();
        assert_eq!(response.stop_reason.as_deref(), Some("length"));
    }

    #[test]
    fn test_only_first_choice_kept() {
        let mut body = sample();
        body["choices"] = json!([
            {"message": {"role": "assistant", "content": "first"}, "finish_reason": "stop"},
            {"message": {"role": "assistant", "content": "second"}, "finish_reason": "stop"}
        ]);

        let response = translate_completion(completion(body), "gpt-4o-mini").unwrap();
        assert_eq!(
            response.content,
            vec![ResponseBlock::Text {
                text: "first".to_string()
            }]
        );
    }

    #[test]
    fn test_null_content_becomes_empty_text() {
        let mut body = sample();
        body["choices"][0]["message"]["content"] = json!(null);

        let response = translate_completion(completion(body), "gpt-4o-mini").unwrap();
        assert_eq!(
            response.content,
            vec![ResponseBlock::Text {
                text: String::new()
            }]
        );
    }

    #[test]
    fn test_missing_choices_is_translation_error() {
        let mut body = sample();
        body["choices"] = json!([]);

        let err = translate_completion(completion(body), "gpt-4o-mini").unwrap_err();
        assert!(matches!(err, ProxyError::Translation(_)));
    }

    #[test]
    fn test_missing_usage_is_translation_error() {
        let mut body = sample();
        body.as_object_mut().unwrap().remove("usage");

        let err = translate_completion(completion(body), "gpt-4o-mini").unwrap_err();
        assert!(matches!(err, ProxyError::Translation(_)));
    }

    #[test]
    fn test_missing_model_falls_back_to_requested() {
        let mut body = sample();
        body.as_object_mut().unwrap().remove("model");

        let response = translate_completion(completion(body), "llama3.1-8b").unwrap();
        assert_eq!(response.model, "llama3.1-8b");
    }
}
