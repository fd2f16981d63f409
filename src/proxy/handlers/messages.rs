//! `POST /v1/messages` handler
//!
//! Per request: parse → extract credential → check endpoint override →
//! resolve provider → translate → dispatch. Anything failing before dispatch
//! is a client error and upstream is never contacted.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;

use crate::logging::RequestLog;
use crate::proxy::error::ProxyError;
use crate::proxy::routing::{Credential, RoutingDecision};
use crate::proxy::sse::format_sse_event;
use crate::proxy::state::ProxyState;
use crate::proxy::translation::anthropic::InboundRequest;
use crate::proxy::translation::openai::UpstreamRequest;
use crate::proxy::translation::{
    translate_completion, translate_request, translate_stream, StreamOutcome, StreamTranslator,
};

/// Everything needed to dispatch one request
struct Prepared {
    model: String,
    upstream: UpstreamRequest,
    route: RoutingDecision,
}

pub async fn create_message(
    State(state): State<ProxyState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut log = RequestLog::start();

    let prepared = match prepare(&state, &headers, &body, &mut log) {
        Ok(prepared) => prepared,
        Err(err) => {
            log.failure(&err);
            return err.into_response();
        }
    };

    if prepared.upstream.stream {
        streaming_response(&state, prepared, log).await
    } else {
        buffered_response(&state, prepared, log).await
    }
}

fn prepare(
    state: &ProxyState,
    headers: &HeaderMap,
    body: &[u8],
    log: &mut RequestLog,
) -> Result<Prepared, ProxyError> {
    let request: InboundRequest =
        serde_json::from_slice(body).map_err(|e| ProxyError::Validation(e.to_string()))?;
    log.parsed(&request.model, request.stream);

    let upstream = translate_request(&request)?;
    let credential = extract_credential(headers)?;

    let explicit = match headers.get(state.resolver.endpoint_header()) {
        Some(value) => {
            let value = value.to_str().map_err(|_| {
                ProxyError::Routing("endpoint header is not valid UTF-8".to_string())
            })?;
            Some(state.resolver.check_endpoint(value)?)
        }
        None => None,
    };

    let route = state
        .resolver
        .resolve(&request.model, explicit.as_deref(), credential);
    log.routed(&route);

    tracing::debug!(
        model = %request.model,
        provider = %route.provider,
        stream = upstream.stream,
        "Routed request"
    );

    Ok(Prepared {
        model: request.model,
        upstream,
        route,
    })
}

/// Upstream key from `Authorization: Bearer` or, failing that, `x-api-key`
///
/// A `Basic` authorization header belongs to the gate and is skipped.
fn extract_credential(headers: &HeaderMap) -> Result<Credential, ProxyError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|t| !t.is_empty());

    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());

    bearer
        .or(api_key)
        .map(Credential::new)
        .ok_or_else(|| {
            ProxyError::Unauthorized(
                "Missing API key: send Authorization: Bearer <key> or x-api-key".to_string(),
            )
        })
}

async fn buffered_response(state: &ProxyState, prepared: Prepared, log: RequestLog) -> Response {
    let result = state
        .upstream
        .complete(&prepared.upstream, &prepared.route)
        .await
        .and_then(|completion| translate_completion(completion, &prepared.model));

    match result {
        Ok(response) => {
            log.success(response.usage.input_tokens, response.usage.output_tokens);
            Json(response).into_response()
        }
        Err(err) => {
            log.failure(&err);
            err.into_response()
        }
    }
}

async fn streaming_response(state: &ProxyState, prepared: Prepared, log: RequestLog) -> Response {
    // Fail as a plain JSON error while nothing has been sent yet
    let chunks = match state
        .upstream
        .stream(&prepared.upstream, &prepared.route)
        .await
    {
        Ok(chunks) => chunks,
        Err(err) => {
            log.failure(&err);
            return err.into_response();
        }
    };

    // The log moves into the stream: finished when message_stop is pulled,
    // logged as cancelled if the client drops the body first
    let events = translate_stream(
        chunks,
        StreamTranslator::new(prepared.model),
        move |outcome: StreamOutcome| match outcome.error {
            Some(err) => log.failure(&err),
            None => log.success(0, outcome.output_tokens),
        },
    );

    let body = Body::from_stream(
        events.map(|event| format_sse_event(&event).map_err(std::io::Error::other)),
    );

    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_credential() {
        let credential = extract_credential(&headers(&[("authorization", "Bearer sk-abc")])).unwrap();
        assert_eq!(credential.expose(), "sk-abc");
    }

    #[test]
    fn test_x_api_key_credential() {
        let credential = extract_credential(&headers(&[("x-api-key", "sk-xyz")])).unwrap();
        assert_eq!(credential.expose(), "sk-xyz");
    }

    #[test]
    fn test_bearer_takes_precedence_over_x_api_key() {
        let credential = extract_credential(&headers(&[
            ("authorization", "Bearer sk-bearer"),
            ("x-api-key", "sk-header"),
        ]))
        .unwrap();
        assert_eq!(credential.expose(), "sk-bearer");
    }

    #[test]
    fn test_basic_authorization_is_not_a_credential() {
        let credential = extract_credential(&headers(&[
            ("authorization", "Basic dXNlcjpwYXNz"),
            ("x-api-key", "sk-header"),
        ]))
        .unwrap();
        assert_eq!(credential.expose(), "sk-header");

        let err = extract_credential(&headers(&[("authorization", "Basic dXNlcjpwYXNz")]))
            .unwrap_err();
        assert!(matches!(err, ProxyError::Unauthorized(_)));
    }

    #[test]
    fn test_missing_or_blank_credential_rejected() {
        assert!(extract_credential(&HeaderMap::new()).is_err());
        assert!(extract_credential(&headers(&[("authorization", "Bearer ")])).is_err());
        assert!(extract_credential(&headers(&[("x-api-key", "  ")])).is_err());
    }
}
