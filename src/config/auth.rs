//! Inbound authentication configuration
//!
//! The proxy is gated by a single shared Basic credential pair. Paths listed
//! in `public_paths` bypass the gate by exact match.

use serde::Deserialize;

/// Basic-auth gate settings
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Shared username
    pub basic_user: Option<String>,

    /// Shared password
    pub basic_pass: Option<String>,

    /// Paths reachable without credentials (exact match only)
    pub public_paths: Vec<String>,

    /// Run without the gate when no credential pair is configured
    pub allow_unauthenticated: bool,
}

// Hand-written so the password never reaches logs or `config --show`
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("basic_user", &self.basic_user)
            .field("basic_pass", &self.basic_pass.as_ref().map(|_| "<redacted>"))
            .field("public_paths", &self.public_paths)
            .field("allow_unauthenticated", &self.allow_unauthenticated)
            .finish()
    }
}

/// Auth settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileAuth {
    pub basic_user: Option<String>,
    pub basic_pass: Option<String>,
    pub public_paths: Option<Vec<String>>,
    pub allow_unauthenticated: Option<bool>,
}

impl AuthConfig {
    /// Create from file config with defaults (env overrides are applied by the caller)
    pub fn from_file(file: Option<FileAuth>) -> Self {
        let file = file.unwrap_or_default();

        Self {
            basic_user: file.basic_user.filter(|s| !s.is_empty()),
            basic_pass: file.basic_pass.filter(|s| !s.is_empty()),
            public_paths: file
                .public_paths
                .unwrap_or_else(|| vec!["/health".to_string()]),
            allow_unauthenticated: file.allow_unauthenticated.unwrap_or(false),
        }
    }

    /// Both halves of the credential pair are present
    pub fn is_configured(&self) -> bool {
        self.basic_user.is_some() && self.basic_pass.is_some()
    }
}
