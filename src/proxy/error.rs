//! Proxy error types and response handling
//!
//! Every failure on a request path is one of these kinds. The mapping from
//! kind to status code is exhaustive, and the body is always
//! `{"detail": <message>}`.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::util::truncate_for_detail;

/// Upstream error bodies are cut to this many bytes in client-facing details
const MAX_DETAIL_BODY: usize = 2048;

/// Errors that can occur while proxying one request
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Malformed body, unknown role, missing or out-of-range field
    #[error("invalid request: {0}")]
    Validation(String),

    /// Endpoint override rejected by the allow-list
    #[error("rejected endpoint override: {0}")]
    Routing(String),

    /// Missing or invalid inbound credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Connection refused/reset, DNS failure, timeout
    #[error("upstream transport error: {0}")]
    UpstreamTransport(String),

    /// Upstream answered with a non-2xx status
    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// Upstream body could not be parsed as the expected shape
    #[error("malformed upstream response: {0}")]
    UpstreamProtocol(String),

    /// Internal invariant violated while building a response
    #[error("translation error: {0}")]
    Translation(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_) | ProxyError::Routing(_) => StatusCode::BAD_REQUEST,
            ProxyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ProxyError::UpstreamTransport(_)
            | ProxyError::UpstreamStatus { .. }
            | ProxyError::UpstreamProtocol(_)
            | ProxyError::Translation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable kind label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Validation(_) => "validation",
            ProxyError::Routing(_) => "routing",
            ProxyError::Unauthorized(_) => "unauthorized",
            ProxyError::UpstreamTransport(_) => "upstream_transport",
            ProxyError::UpstreamStatus { .. } => "upstream_status",
            ProxyError::UpstreamProtocol(_) => "upstream_protocol",
            ProxyError::Translation(_) => "translation",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Client-facing message
    ///
    /// Client errors echo what was wrong. Server errors stay generic except
    /// for the upstream status and body, which the provider meant to be seen.
    pub fn detail(&self) -> String {
        match self {
            ProxyError::Validation(msg) => format!("Invalid request: {}", msg),
            ProxyError::Routing(msg) => format!("Invalid endpoint: {}", msg),
            ProxyError::Unauthorized(msg) => msg.clone(),
            ProxyError::UpstreamTransport(_) => {
                "Provider error: upstream request failed".to_string()
            }
            ProxyError::UpstreamStatus { status, body } => format!(
                "Provider error: upstream status {}: {}",
                status,
                truncate_for_detail(body, MAX_DETAIL_BODY)
            ),
            ProxyError::UpstreamProtocol(_) => {
                "Provider error: malformed upstream response".to_string()
            }
            ProxyError::Translation(_) => {
                "Internal error while translating the upstream response".to_string()
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "detail": self.detail() }));

        if matches!(self, ProxyError::Unauthorized(_)) {
            (status, [(header::WWW_AUTHENTICATE, "Basic")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
