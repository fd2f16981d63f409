//! Provider resolution
//!
//! Picks the upstream for one request from the model name and an optional
//! caller-supplied endpoint. The tables come from [`RoutingConfig`] and are
//! read-only for the life of the process.

use std::net::IpAddr;

use regex::Regex;

use crate::config::{ProviderAuth, RoutingConfig};
use crate::proxy::error::ProxyError;
use crate::util::fingerprint;

/// Provider label for an explicit endpoint that matches no known provider
pub const GENERIC_PROVIDER: &str = "openai-compatible";

/// Caller-supplied upstream key
///
/// Debug output is redacted; use [`Credential::fingerprint`] to correlate
/// requests in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(<redacted>)")
    }
}

/// Resolved target for one upstream call
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub provider: String,
    /// Base URL including the version segment, no trailing slash
    pub base_url: String,
    pub auth: ProviderAuth,
    pub credential: Credential,
}

/// Read-only view over the routing tables
#[derive(Debug)]
pub struct ProviderResolver {
    config: RoutingConfig,
    allow: Regex,
}

impl ProviderResolver {
    /// Compile the allow-list; fails only on an invalid pattern
    pub fn from_config(config: &RoutingConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            allow: Regex::new(&config.endpoint_allow_pattern)?,
            config: config.clone(),
        })
    }

    /// Validate a caller-supplied endpoint before it is used
    ///
    /// The endpoint must match the allow-list and must name a host, not an IP
    /// literal or localhost. Returns the endpoint with surrounding whitespace
    /// and any trailing slash removed.
    pub fn check_endpoint(&self, endpoint: &str) -> Result<String, ProxyError> {
        let endpoint = endpoint.trim();
        if !self.allow.is_match(endpoint) {
            return Err(ProxyError::Routing(format!(
                "'{}' does not match the endpoint allow-list",
                endpoint
            )));
        }

        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| ProxyError::Routing(format!("'{}' is not a valid URL: {}", endpoint, e)))?;
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

        if host.parse::<IpAddr>().is_ok() {
            return Err(ProxyError::Routing(format!(
                "'{}' uses an IP literal host",
                endpoint
            )));
        }
        if host == "localhost" || host.ends_with(".localhost") {
            return Err(ProxyError::Routing(format!(
                "'{}' targets localhost",
                endpoint
            )));
        }

        Ok(endpoint.trim_end_matches('/').to_string())
    }

    /// Pick provider and base URL; never fails
    ///
    /// `explicit` must already have passed [`check_endpoint`](Self::check_endpoint).
    pub fn resolve(
        &self,
        model: &str,
        explicit: Option<&str>,
        credential: Credential,
    ) -> RoutingDecision {
        if let Some(endpoint) = explicit {
            return match self.provider_for_endpoint(endpoint) {
                Some((id, provider)) => RoutingDecision {
                    provider: id.clone(),
                    base_url: endpoint.to_string(),
                    auth: provider.auth.clone(),
                    credential,
                },
                None => RoutingDecision {
                    provider: GENERIC_PROVIDER.to_string(),
                    base_url: endpoint.to_string(),
                    auth: ProviderAuth::default(),
                    credential,
                },
            };
        }

        let id = self
            .config
            .models
            .get(model)
            .unwrap_or(&self.config.default_provider);

        match self.config.providers.get(id) {
            Some(provider) => RoutingDecision {
                provider: id.clone(),
                base_url: provider.base_url.trim_end_matches('/').to_string(),
                auth: provider.auth.clone(),
                credential,
            },
            // Unreachable once the config validated; fall back to the generic default
            None => RoutingDecision {
                provider: GENERIC_PROVIDER.to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                auth: ProviderAuth::default(),
                credential,
            },
        }
    }

    /// Known provider whose base URL appears in `endpoint`; longest match wins
    fn provider_for_endpoint(
        &self,
        endpoint: &str,
    ) -> Option<(&String, &crate::config::ProviderConfig)> {
        let endpoint = endpoint.to_ascii_lowercase();
        self.config
            .providers
            .iter()
            .filter(|(_, p)| {
                let base = p.base_url.trim_end_matches('/').to_ascii_lowercase();
                !base.is_empty() && endpoint.contains(&base)
            })
            .max_by_key(|(_, p)| p.base_url.len())
    }

    pub fn endpoint_header(&self) -> &str {
        &self.config.endpoint_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthMethod, ProviderConfig};

    fn resolver() -> ProviderResolver {
        ProviderResolver::from_config(&RoutingConfig::default()).unwrap()
    }

    fn key() -> Credential {
        Credential::new("sk-test")
    }

    #[test]
    fn test_known_model_routes_to_its_provider() {
        let decision = resolver().resolve("llama3.1-8b", None, key());
        assert_eq!(decision.provider, "cerebras");
        assert_eq!(decision.base_url, "https://api.cerebras.ai/v1");
    }

    #[test]
    fn test_unknown_model_uses_default_provider() {
        let decision = resolver().resolve("some-new-model", None, key());
        assert_eq!(decision.provider, "openai");
        assert_eq!(decision.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_explicit_endpoint_matching_known_provider() {
        let decision = resolver().resolve(
            "gpt-4o",
            Some("https://api.groq.com/openai/v1"),
            key(),
        );
        assert_eq!(decision.provider, "groq");
        assert_eq!(decision.base_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn test_explicit_endpoint_unknown_host_is_generic() {
        let decision = resolver().resolve(
            "gpt-4o",
            Some("https://llm.example.com/v1"),
            key(),
        );
        assert_eq!(decision.provider, GENERIC_PROVIDER);
        assert_eq!(decision.base_url, "https://llm.example.com/v1");
        assert_eq!(decision.auth.method, AuthMethod::Bearer);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let r = resolver();
        let inputs = [
            ("gpt-4o", None),
            ("deepseek-chat", None),
            ("unknown", None),
            ("gpt-4o", Some("https://api.openai.com/v1")),
            ("x", Some("https://gateway.example.org/proxy/v1")),
        ];
        for (model, endpoint) in inputs {
            assert_eq!(
                r.resolve(model, endpoint, key()),
                r.resolve(model, endpoint, key())
            );
        }
    }

    #[test]
    fn test_provider_auth_carried_into_decision() {
        let mut config = RoutingConfig::default();
        config.providers.insert(
            "gateway".to_string(),
            ProviderConfig {
                base_url: "https://gw.example.com/v1".to_string(),
                auth: ProviderAuth {
                    method: AuthMethod::XApiKey,
                    header_name: None,
                },
            },
        );
        config
            .models
            .insert("gw-model".to_string(), "gateway".to_string());
        let r = ProviderResolver::from_config(&config).unwrap();

        let decision = r.resolve("gw-model", None, key());
        assert_eq!(decision.provider, "gateway");
        assert_eq!(decision.auth.method, AuthMethod::XApiKey);
    }

    #[test]
    fn test_check_endpoint_accepts_https_v1() {
        let r = resolver();
        assert_eq!(
            r.check_endpoint("https://api.cerebras.ai/v1/").unwrap(),
            "https://api.cerebras.ai/v1"
        );
        assert!(r.check_endpoint("https://gw.example.com:8443/openai/v1").is_ok());
    }

    #[test]
    fn test_check_endpoint_rejects_unsafe_targets() {
        let r = resolver();
        for endpoint in [
            "http://evil.internal/v1",
            "https://evil.example.com/v2",
            "https://user@evil.example.com/v1",
            "https://evil.example.com/v1?x=1",
            "ftp://example.com/v1",
            "https://10.0.0.7/v1",
            "https://169.254.169.254/v1",
            "https://localhost/v1",
            "https://api.localhost/v1",
            "",
        ] {
            let err = r.check_endpoint(endpoint).unwrap_err();
            assert!(matches!(err, ProxyError::Routing(_)), "{}", endpoint);
        }
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let decision = resolver().resolve("gpt-4o", None, Credential::new("sk-secret-value"));
        let debug = format!("{:?}", decision);
        assert!(!debug.contains("sk-secret-value"));
        assert_eq!(decision.credential.expose(), "sk-secret-value");
    }
}
