// SSE (Server-Sent Events) framing
//
// The inbound stream is written as one frame per event:
//
// ```
// event: <event_type>
// data: <json_payload>
// <blank line>
// ```
//
// The event name duplicates the payload's `type` field, which is what
// Anthropic clients expect.

use bytes::Bytes;

use crate::proxy::translation::anthropic::StreamEvent;

/// Serialize one event as a complete SSE frame
pub fn format_sse_event(event: &StreamEvent) -> Result<Bytes, serde_json::Error> {
    let data = serde_json::to_string(event)?;
    Ok(Bytes::from(format!("event: {}\ndata: {}\n\n", event.name(), data)))
}

/// Split an SSE body into `(event, data)` pairs
#[cfg(test)]
pub fn parse_frames(body: &str) -> Vec<(String, serde_json::Value)> {
    body.split("\n\n")
        .filter(|frame| !frame.trim().is_empty())
        .map(|frame| {
            let mut event = String::new();
            let mut data = serde_json::Value::Null;
            for line in frame.lines() {
                if let Some(name) = line.strip_prefix("event: ") {
                    event = name.to_string();
                } else if let Some(json) = line.strip_prefix("data: ") {
                    data = serde_json::from_str(json).expect("frame data is JSON");
                }
            }
            (event, data)
        })
        .collect()
}
