//! Upstream invoker
//!
//! One outbound `POST {base_url}/chat/completions` per request. Buffered
//! calls return the parsed completion; streaming calls return a lazy chunk
//! stream read straight off the response body. No retries happen here.

use std::pin::Pin;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::config::{AuthMethod, UpstreamConfig};
use crate::proxy::error::ProxyError;
use crate::proxy::routing::RoutingDecision;
use crate::proxy::translation::openai::{UpstreamChunk, UpstreamCompletion, UpstreamRequest};

/// Lazy, single-pass sequence of upstream chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<UpstreamChunk, ProxyError>> + Send>>;

/// Sentinel data frame closing an OpenAI-style stream
const DONE_SENTINEL: &str = "[DONE]";

/// An OpenAI-compatible chat completions backend
///
/// The seam between request handling and the network; handlers hold an
/// `Arc<dyn ChatCompletions>` so tests can substitute a fake.
#[async_trait]
pub trait ChatCompletions: Send + Sync {
    async fn complete(
        &self,
        request: &UpstreamRequest,
        route: &RoutingDecision,
    ) -> Result<UpstreamCompletion, ProxyError>;

    async fn stream(
        &self,
        request: &UpstreamRequest,
        route: &RoutingDecision,
    ) -> Result<ChunkStream, ProxyError>;
}

/// reqwest-backed invoker with a shared connection pool
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()?;
        Ok(Self { client })
    }

    async fn send(
        &self,
        request: &UpstreamRequest,
        route: &RoutingDecision,
    ) -> Result<reqwest::Response, ProxyError> {
        let url = format!("{}/chat/completions", route.base_url);
        let (name, value) = auth_header(route)?;

        tracing::debug!(
            provider = %route.provider,
            url = %url,
            stream = request.stream,
            "Dispatching upstream request"
        );

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(name, value)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => format!("<body unavailable: {}>", transport_error(e)),
            };
            return Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatCompletions for HttpUpstream {
    async fn complete(
        &self,
        request: &UpstreamRequest,
        route: &RoutingDecision,
    ) -> Result<UpstreamCompletion, ProxyError> {
        let response = self.send(request, route).await?;
        let bytes = response.bytes().await.map_err(transport_error)?;

        serde_json::from_slice(&bytes)
            .map_err(|e| ProxyError::UpstreamProtocol(format!("completion body: {}", e)))
    }

    async fn stream(
        &self,
        request: &UpstreamRequest,
        route: &RoutingDecision,
    ) -> Result<ChunkStream, ProxyError> {
        let response = self.send(request, route).await?;

        // A body that closes without the sentinel was cut short, even if the
        // frames read so far all parsed.
        let events = Box::pin(response.bytes_stream().eventsource());
        let chunks = futures::stream::unfold(Some(events), |state| async move {
            let Some(mut events) = state else {
                return None;
            };
            loop {
                match events.next().await {
                    Some(Ok(ev)) => {
                        let data = ev.data.trim();
                        if data == DONE_SENTINEL {
                            return None;
                        }
                        if data.is_empty() {
                            continue;
                        }
                        let chunk = serde_json::from_str::<UpstreamChunk>(data).map_err(|e| {
                            ProxyError::UpstreamProtocol(format!("stream chunk: {}", e))
                        });
                        return Some((chunk, Some(events)));
                    }
                    Some(Err(e)) => {
                        let err = ProxyError::UpstreamTransport(e.to_string());
                        return Some((Err(err), Some(events)));
                    }
                    None => {
                        let err = ProxyError::UpstreamProtocol(format!(
                            "stream ended before {}",
                            DONE_SENTINEL
                        ));
                        return Some((Err(err), None));
                    }
                }
            }
        });

        Ok(Box::pin(chunks))
    }
}

/// Header carrying the caller's credential, per the provider's auth method
fn auth_header(route: &RoutingDecision) -> Result<(HeaderName, HeaderValue), ProxyError> {
    let secret = route.credential.expose();
    let (name, raw) = match route.auth.method {
        AuthMethod::Bearer => (AUTHORIZATION, format!("Bearer {}", secret)),
        AuthMethod::XApiKey | AuthMethod::Header => {
            let name = HeaderName::from_bytes(route.auth.header_name().as_bytes()).map_err(|_| {
                ProxyError::Routing(format!(
                    "provider '{}' has an invalid auth header name",
                    route.provider
                ))
            })?;
            (name, secret.to_string())
        }
    };

    let mut value = HeaderValue::from_str(&raw)
        .map_err(|_| ProxyError::Unauthorized("API key contains invalid characters".to_string()))?;
    value.set_sensitive(true);
    Ok((name, value))
}

fn transport_error(err: reqwest::Error) -> ProxyError {
    // reqwest errors carry the URL but never request headers
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    ProxyError::UpstreamTransport(format!("{}: {}", kind, err))
}
