//! Basic-auth gate in front of every route
//!
//! Requests must carry `Authorization: Basic base64(user:pass)` matching the
//! configured pair. Paths in `public_paths` are let through by exact match,
//! so `/health` is open while `/not-a-health` is not.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::error::ProxyError;
use super::state::ProxyState;

pub async fn basic_auth(State(state): State<ProxyState>, req: Request, next: Next) -> Response {
    let auth = &state.auth;
    if !auth.is_configured() || auth.public_paths.iter().any(|p| p == req.uri().path()) {
        return next.run(req).await;
    }

    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(decode_basic);

    match presented {
        Some((user, pass))
            if Some(user.as_str()) == auth.basic_user.as_deref()
                && Some(pass.as_str()) == auth.basic_pass.as_deref() =>
        {
            next.run(req).await
        }
        _ => {
            tracing::debug!(path = %req.uri().path(), "Rejected request without valid basic auth");
            ProxyError::Unauthorized("Unauthorized".to_string()).into_response()
        }
    }
}

/// `Basic dXNlcjpwYXNz` → `("user", "pass")`
fn decode_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic() {
        let header = format!("Basic {}", STANDARD.encode("alice:s3cr:et"));
        assert_eq!(
            decode_basic(&header),
            Some(("alice".to_string(), "s3cr:et".to_string()))
        );
    }

    #[test]
    fn test_decode_rejects_other_schemes_and_garbage() {
        assert_eq!(decode_basic("Bearer sk-abc"), None);
        assert_eq!(decode_basic("Basic !!!not-base64"), None);
        assert_eq!(decode_basic(&format!("Basic {}", STANDARD.encode("nocolon"))), None);
        assert_eq!(decode_basic("Basic"), None);
    }
}
