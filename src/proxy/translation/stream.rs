//! OpenAI → Anthropic stream translation
//!
//! Turns a lazy sequence of upstream chunks into the inbound event envelope:
//!
//! ```text
//! message_start
//! content_block_start          (index 0, empty text)
//! content_block_delta *        (one per chunk with non-empty text)
//! content_block_stop
//! message_delta                (stop_reason "end_turn", output_tokens)
//! message_stop
//! ```
//!
//! The first two events are synthesized before upstream is read; the closing
//! three are synthesized once upstream is exhausted. The pipeline is pull
//! driven: each upstream chunk is fetched only when the consumer asks for the
//! next event, so dropping the output stream drops the upstream connection.

use std::collections::VecDeque;

use futures::{Stream, StreamExt};

use super::anthropic::{
    BlockDelta, DeltaUsage, InboundResponse, MessageDelta, ResponseBlock, StreamError,
    StreamEvent,
};
use super::openai::UpstreamChunk;
use crate::proxy::error::ProxyError;
use crate::util::generate_message_id;

/// Stop reason reported on every translated stream
const STREAM_STOP_REASON: &str = "end_turn";

/// Per-request translation state
///
/// Holds the minted message id and the output counter. The counter counts
/// emitted fragments, not tokens; there is no tokenizer here.
#[derive(Debug)]
pub struct StreamTranslator {
    message_id: String,
    model: String,
    output_tokens: u32,
}

impl StreamTranslator {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            message_id: generate_message_id(),
            model: model.into(),
            output_tokens: 0,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn output_tokens(&self) -> u32 {
        self.output_tokens
    }

    /// `message_start` followed by `content_block_start`
    pub fn open(&self) -> [StreamEvent; 2] {
        [
            StreamEvent::MessageStart {
                message: InboundResponse::empty(self.message_id.clone(), self.model.clone()),
            },
            StreamEvent::ContentBlockStart {
                index: 0,
                content_block: ResponseBlock::Text {
                    text: String::new(),
                },
            },
        ]
    }

    /// Translate one chunk; empty deltas produce nothing
    pub fn on_chunk(&mut self, chunk: &UpstreamChunk) -> Option<StreamEvent> {
        if let Some(reason) = chunk.finish_reason() {
            tracing::trace!(finish_reason = reason, "Upstream stream finished");
        }

        let text = chunk.delta_text()?;
        self.output_tokens += 1;
        Some(StreamEvent::ContentBlockDelta {
            index: 0,
            delta: BlockDelta::TextDelta {
                text: text.to_string(),
            },
        })
    }

    /// In-band error event for a failure after the envelope was opened
    pub fn on_error(&self, err: &ProxyError) -> StreamEvent {
        StreamEvent::Error {
            error: StreamError {
                error_type: "api_error",
                message: err.detail(),
            },
        }
    }

    /// `content_block_stop`, `message_delta`, `message_stop`
    pub fn close(&self) -> [StreamEvent; 3] {
        [
            StreamEvent::ContentBlockStop { index: 0 },
            StreamEvent::MessageDelta {
                delta: MessageDelta {
                    stop_reason: STREAM_STOP_REASON.to_string(),
                    stop_sequence: None,
                },
                usage: DeltaUsage {
                    output_tokens: self.output_tokens,
                },
            },
            StreamEvent::MessageStop,
        ]
    }
}

/// How a translated stream ended, reported once the last event was pulled
#[derive(Debug)]
pub struct StreamOutcome {
    pub output_tokens: u32,
    pub error: Option<ProxyError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Streaming,
    Done,
}

struct State<S, F> {
    upstream: Option<S>,
    translator: StreamTranslator,
    pending: VecDeque<StreamEvent>,
    phase: Phase,
    error: Option<ProxyError>,
    on_finish: Option<F>,
}

/// Drive `upstream` through a [`StreamTranslator`]
///
/// `on_finish` runs after the final `message_stop` has been handed to the
/// consumer. If the consumer drops the stream early it never runs; the
/// upstream stream is dropped together with the returned one.
pub fn translate_stream<S, F>(
    upstream: S,
    translator: StreamTranslator,
    on_finish: F,
) -> impl Stream<Item = StreamEvent> + Send
where
    S: Stream<Item = Result<UpstreamChunk, ProxyError>> + Unpin + Send + 'static,
    F: FnOnce(StreamOutcome) + Send + 'static,
{
    let state = State {
        upstream: Some(upstream),
        translator,
        pending: VecDeque::with_capacity(4),
        phase: Phase::NotStarted,
        error: None,
        on_finish: Some(on_finish),
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                return Some((event, st));
            }

            match st.phase {
                Phase::NotStarted => {
                    st.pending.extend(st.translator.open());
                    st.phase = Phase::Streaming;
                }
                Phase::Streaming => {
                    let next = match st.upstream.as_mut() {
                        Some(upstream) => upstream.next().await,
                        None => None,
                    };
                    match next {
                        Some(Ok(chunk)) => {
                            if let Some(event) = st.translator.on_chunk(&chunk) {
                                return Some((event, st));
                            }
                        }
                        Some(Err(err)) => {
                            tracing::warn!(
                                message_id = st.translator.message_id(),
                                error = %err,
                                "Upstream stream failed mid-response"
                            );
                            st.upstream = None;
                            st.pending.push_back(st.translator.on_error(&err));
                            st.pending.extend(st.translator.close());
                            st.error = Some(err);
                            st.phase = Phase::Done;
                        }
                        None => {
                            st.upstream = None;
                            st.pending.extend(st.translator.close());
                            st.phase = Phase::Done;
                        }
                    }
                }
                Phase::Done => {
                    if let Some(on_finish) = st.on_finish.take() {
                        on_finish(StreamOutcome {
                            output_tokens: st.translator.output_tokens(),
                            error: st.error.take(),
                        });
                    }
                    return None;
                }
            }
        }
    })
}
