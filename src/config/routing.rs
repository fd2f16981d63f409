//! Provider and model routing configuration
//!
//! This module holds the static tables the provider resolver reads:
//! known providers with their canonical base URLs, the model → provider
//! table, and the allow-list applied to caller-supplied endpoint overrides.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// How the caller's credential is presented to a provider
///
/// The credential itself always comes from the inbound request; this only
/// decides which header carries it.
/// - OpenAI and most compatible APIs: `Authorization: Bearer`
/// - Some gateways: `x-api-key` or a custom header
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// `Authorization: Bearer {key}` (default)
    #[default]
    Bearer,
    /// `x-api-key: {key}`
    XApiKey,
    /// `{header_name}: {key}`
    Header,
}

impl AuthMethod {
    /// Convert to lowercase string for TOML serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bearer => "bearer",
            Self::XApiKey => "x_api_key",
            Self::Header => "header",
        }
    }
}

/// Credential-injection rule for one provider
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProviderAuth {
    #[serde(default)]
    pub method: AuthMethod,

    /// Custom header name (only used when method = "header")
    pub header_name: Option<String>,
}

impl ProviderAuth {
    /// Header name the credential is written to
    pub fn header_name(&self) -> String {
        match self.method {
            AuthMethod::Bearer => "authorization".to_string(),
            AuthMethod::XApiKey => "x-api-key".to_string(),
            AuthMethod::Header => self
                .header_name
                .as_deref()
                .unwrap_or("x-api-key")
                .to_lowercase(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// One OpenAI-compatible provider backend
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Canonical base URL including the API version segment
    /// (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    #[serde(default)]
    pub auth: ProviderAuth,
}

impl ProviderConfig {
    pub fn bearer(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            auth: ProviderAuth::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Routing Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default allow-list for the endpoint override header: https only, hostname
/// characters only, optional port, path ending in the `/v1` version segment.
pub const DEFAULT_ENDPOINT_ALLOW_PATTERN: &str =
    r"(?i)^https://[a-z0-9.-]+(?::\d{1,5})?(?:/[a-z0-9._~-]+)*/v1/?$";

/// Routing tables used by the provider resolver
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Provider used for models missing from the table
    pub default_provider: String,

    /// Header carrying an explicit upstream base URL
    pub endpoint_header: String,

    /// Regex an explicit endpoint must match before it is used
    pub endpoint_allow_pattern: String,

    /// Provider id → provider (sorted so endpoint matching is deterministic)
    pub providers: BTreeMap<String, ProviderConfig>,

    /// Model name → provider id
    pub models: HashMap<String, String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let providers = BTreeMap::from([
            (
                "openai".to_string(),
                ProviderConfig::bearer("https://api.openai.com/v1"),
            ),
            (
                "cerebras".to_string(),
                ProviderConfig::bearer("https://api.cerebras.ai/v1"),
            ),
            (
                "groq".to_string(),
                ProviderConfig::bearer("https://api.groq.com/openai/v1"),
            ),
            (
                "openrouter".to_string(),
                ProviderConfig::bearer("https://openrouter.ai/api/v1"),
            ),
            (
                "deepseek".to_string(),
                ProviderConfig::bearer("https://api.deepseek.com/v1"),
            ),
        ]);

        let models = [
            // OpenAI models
            ("gpt-4o", "openai"),
            ("gpt-4o-mini", "openai"),
            ("gpt-4-turbo", "openai"),
            ("gpt-3.5-turbo", "openai"),
            // Cerebras models
            ("qwen-3-coder-480b", "cerebras"),
            ("llama3.1-8b", "cerebras"),
            ("llama3.1-70b", "cerebras"),
            // Groq models
            ("llama-3.3-70b-versatile", "groq"),
            // DeepSeek models
            ("deepseek-chat", "deepseek"),
            ("deepseek-reasoner", "deepseek"),
        ]
        .into_iter()
        .map(|(m, p)| (m.to_string(), p.to_string()))
        .collect();

        Self {
            default_provider: "openai".to_string(),
            endpoint_header: "a2o-endpoint".to_string(),
            endpoint_allow_pattern: DEFAULT_ENDPOINT_ALLOW_PATTERN.to_string(),
            providers,
            models,
        }
    }
}

/// Routing settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileRouting {
    pub default_provider: Option<String>,
    pub endpoint_header: Option<String>,
    pub endpoint_allow_pattern: Option<String>,

    /// Entries here are merged over the built-in providers
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,

    /// Entries here are merged over the built-in model table
    #[serde(default)]
    pub models: HashMap<String, String>,
}

impl RoutingConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileRouting>) -> Self {
        let file = file.unwrap_or_default();
        let mut config = Self::default();

        if let Some(provider) = file.default_provider {
            config.default_provider = provider;
        }
        if let Some(header) = file.endpoint_header {
            config.endpoint_header = header.to_lowercase();
        }
        if let Some(pattern) = file.endpoint_allow_pattern {
            config.endpoint_allow_pattern = pattern;
        }
        config.providers.extend(file.providers);
        config.models.extend(file.models);

        config
    }

    /// Check that every reference in the tables resolves
    pub fn validate(&self) -> Result<(), String> {
        if !self.providers.contains_key(&self.default_provider) {
            return Err(format!(
                "default_provider '{}' is not a configured provider",
                self.default_provider
            ));
        }

        let mut models: Vec<_> = self.models.iter().collect();
        models.sort();
        for (model, provider) in models {
            if !self.providers.contains_key(provider) {
                return Err(format!(
                    "model '{}' references unknown provider '{}'",
                    model, provider
                ));
            }
        }

        let mut providers: Vec<_> = self.providers.iter().collect();
        providers.sort_by(|a, b| a.0.cmp(b.0));
        for (name, provider) in providers {
            let header = provider.auth.header_name();
            if reqwest::header::HeaderName::from_bytes(header.as_bytes()).is_err() {
                return Err(format!(
                    "provider '{}' has an invalid auth header name '{}'",
                    name, header
                ));
            }
        }

        regex::Regex::new(&self.endpoint_allow_pattern)
            .map_err(|e| format!("invalid endpoint_allow_pattern: {}", e))?;

        Ok(())
    }
}
