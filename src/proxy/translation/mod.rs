//! API translation - Anthropic Messages in, OpenAI Chat Completions out
//!
//! # Architecture
//!
//! ```text
//! Client Request (Anthropic format)
//!     ↓
//! translate_request → UpstreamRequest
//!     ↓
//! [Upstream invoker - POST {base_url}/chat/completions]
//!     ↓
//! translate_completion (buffered)  |  translate_stream (SSE)
//!     ↓
//! Client Response (Anthropic format)
//! ```
//!
//! All functions here are pure over their inputs; nothing in this module
//! touches the network. The streaming side is fed any `Stream` of chunks,
//! which is how the tests drive it.

pub mod anthropic;
pub mod openai;
mod request;
mod response;
mod stream;

pub use request::translate_request;
pub use response::translate_completion;
pub use stream::{translate_stream, StreamOutcome, StreamTranslator};

#[cfg(test)]
mod tests {
    use super::anthropic::{InboundRequest, MessageContent, ResponseBlock};
    use super::openai::{CompletionChoice, CompletionMessage, CompletionUsage, UpstreamCompletion};
    use super::*;
    use serde_json::json;

    /// Echo the last upstream message back as if the backend repeated it
    fn echo_completion(text: String) -> UpstreamCompletion {
        UpstreamCompletion {
            id: "chatcmpl-echo".to_string(),
            model: "gpt-4o".to_string(),
            choices: vec![CompletionChoice {
                message: CompletionMessage {
                    role: Some("assistant".to_string()),
                    content: Some(text),
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(CompletionUsage {
                prompt_tokens: 1,
                completion_tokens: 1,
                total_tokens: 2,
            }),
        }
    }

    #[test]
    fn test_plain_text_survives_request_and_response_translation() {
        let samples = [
            "Hi",
            "",
            "line one\nline two\ttabbed",
            "こんにちは世界",
            "emoji 🦀🚀 and combining e\u{301}",
            "quotes \"inside\" and \\backslashes\\",
            "مرحبا بالعالم",
        ];

        for text in samples {
            let request: InboundRequest = serde_json::from_value(json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": text}],
                "max_tokens": 64
            }))
            .unwrap();

            let upstream = translate_request(&request).unwrap();
            let forwarded = match &upstream.messages[0].content {
                MessageContent::Text(t) => t.clone(),
                MessageContent::Blocks(_) => panic!("plain text became blocks"),
            };

            let response = translate_completion(echo_completion(forwarded), "gpt-4o").unwrap();
            assert_eq!(
                response.content,
                vec![ResponseBlock::Text {
                    text: text.to_string()
                }],
                "sample {:?}",
                text
            );
        }
    }
}
