//! Configuration for the proxy server
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/a2o/config.toml)
//! 3. Built-in defaults (lowest priority)
//!
//! The result is one immutable `Config` built at startup. Request handling
//! never reads the process environment.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod auth;
mod observability;
mod routing;
mod serialization;
mod upstream;


// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (maintain public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use auth::{AuthConfig, FileAuth};
pub use observability::{FileLogging, LogFormat, LogRotation, LoggingConfig};
pub use routing::{AuthMethod, FileRouting, ProviderAuth, ProviderConfig, RoutingConfig};
pub use upstream::{FileUpstream, UpstreamConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default listen address (all interfaces, port 4000)
pub const DEFAULT_BIND: &str = "0.0.0.0:4000";

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the proxy server to
    pub bind_addr: SocketAddr,

    /// Inbound basic-auth gate
    pub auth: AuthConfig,

    /// Outbound client settings
    pub upstream: UpstreamConfig,

    /// Provider and model tables
    pub routing: RoutingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 4000)),
            auth: AuthConfig::from_file(None),
            upstream: UpstreamConfig::default(),
            routing: RoutingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub bind_addr: Option<String>,

    /// Optional [auth] section
    pub auth: Option<FileAuth>,

    /// Optional [upstream] section
    pub upstream: Option<FileUpstream>,

    /// Optional [routing] section (with [routing.providers.X] / [routing.models])
    pub routing: Option<FileRouting>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/a2o/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("a2o").join("config.toml"))
    }

    /// Read the config file if it exists
    ///
    /// A file that exists but cannot be read or parsed is an error: a broken
    /// config should fail fast, not silently fall back to defaults.
    fn load_file_config() -> Result<FileConfig> {
        let Some(path) = Self::config_path() else {
            return Ok(FileConfig::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read config file {}", path.display())),
        }
    }

    /// Load configuration: file -> env vars -> defaults
    pub fn load() -> Result<Self> {
        let file = Self::load_file_config()?;
        Self::from_sources(file, |name| std::env::var(name).ok())
    }

    /// Load without the startup checks, for inspecting a half-finished setup
    pub fn load_unchecked() -> Result<Self> {
        let file = Self::load_file_config()?;
        Self::assemble(file, |name| std::env::var(name).ok())
    }

    /// Build and validate a config from an already-parsed file layer and an
    /// environment lookup
    pub(crate) fn from_sources(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let config = Self::assemble(file, env)?;
        config.validate()?;
        Ok(config)
    }

    fn assemble(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Bind address: env > file > default
        let bind = env("A2O_BIND")
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", bind))?;

        // Basic auth: env > file
        let mut auth = AuthConfig::from_file(file.auth);
        if let Some(user) = env("BASIC_AUTH_USER").filter(|s| !s.is_empty()) {
            auth.basic_user = Some(user);
        }
        if let Some(pass) = env("BASIC_AUTH_PASS").filter(|s| !s.is_empty()) {
            auth.basic_pass = Some(pass);
        }
        if let Some(flag) = env("A2O_ALLOW_UNAUTHENTICATED") {
            auth.allow_unauthenticated = flag == "1" || flag.eq_ignore_ascii_case("true");
        }

        let mut upstream = UpstreamConfig::from_file(file.upstream);
        if let Some(secs) = env("A2O_UPSTREAM_TIMEOUT_SECS") {
            upstream.timeout_secs = secs
                .parse()
                .with_context(|| format!("Invalid A2O_UPSTREAM_TIMEOUT_SECS '{}'", secs))?;
        }

        let routing = RoutingConfig::from_file(file.routing);

        let mut logging = LoggingConfig::from_file(file.logging);
        if let Some(format) = env("A2O_LOG_FORMAT") {
            logging.format = LogFormat::parse(&format);
        }

        Ok(Self {
            bind_addr,
            auth,
            upstream,
            routing,
            logging,
        })
    }

    /// Reject configurations the server cannot run safely with
    pub fn validate(&self) -> Result<()> {
        self.routing
            .validate()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid [routing] configuration")?;

        if !self.auth.is_configured() && !self.auth.allow_unauthenticated {
            bail!(
                "Basic auth is not configured: set BASIC_AUTH_USER and BASIC_AUTH_PASS \
                 (or allow_unauthenticated = true under [auth])"
            );
        }

        if self.upstream.timeout_secs == 0 {
            bail!("[upstream] timeout_secs must be greater than zero");
        }

        Ok(())
    }

    /// Create config file with defaults if it doesn't exist
    ///
    /// Returns the path written, or None when a file is already present.
    pub fn write_default_file() -> Result<Option<PathBuf>> {
        let path = Self::config_path().context("Could not determine config path")?;
        if path.exists() {
            return Ok(None);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, Self::default().to_toml())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(Some(path))
    }
}
