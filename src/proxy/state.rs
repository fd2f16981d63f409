//! Proxy state shared by every handler

use std::sync::Arc;

use crate::config::AuthConfig;

use super::routing::ProviderResolver;
use super::upstream::ChatCompletions;

// ─────────────────────────────────────────────────────────────────────────────
// Proxy State
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state for the proxy server
///
/// Everything here is read-only after startup; cloning only bumps refcounts.
#[derive(Clone)]
pub struct ProxyState {
    /// Upstream invoker (real HTTP client, or a fake in tests)
    pub(super) upstream: Arc<dyn ChatCompletions>,
    /// Model and endpoint routing tables
    pub(super) resolver: Arc<ProviderResolver>,
    /// Basic-auth gate settings
    pub(super) auth: Arc<AuthConfig>,
}

impl ProxyState {
    pub fn new(
        upstream: Arc<dyn ChatCompletions>,
        resolver: ProviderResolver,
        auth: AuthConfig,
    ) -> Self {
        Self {
            upstream,
            resolver: Arc::new(resolver),
            auth: Arc::new(auth),
        }
    }
}
