use super::ServerConfig;
use anyhow::{bail, Result};

/// Secrets and overrides read from the environment, never from the config file.
#[derive(Clone)]
pub struct Secrets {
    /// Session token signing key
    pub jwt_secret: String,
    /// OAuth client secret for GitHub (empty when unset)
    pub github_secret: String,
}

impl Secrets {
    /// Read `IDGATE_JWT_SECRET` (required) and `IDGATE_GITHUB_SECRET`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("IDGATE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() {
            bail!("IDGATE_JWT_SECRET must be set to a non-empty signing secret");
        }

        Ok(Self {
            jwt_secret,
            github_secret: lookup("IDGATE_GITHUB_SECRET").unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("jwt_secret", &"<redacted>")
            .field("github_secret", &"<redacted>")
            .finish()
    }
}

/// Apply `IDGATE_HOST` / `IDGATE_PORT` on top of the file's server section.
pub fn apply_server_env(server: &mut ServerConfig) {
    apply_server_overrides(server, |key| std::env::var(key).ok());
}

fn apply_server_overrides(server: &mut ServerConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("IDGATE_HOST").filter(|h| !h.is_empty()) {
        server.host = host;
    }
    if let Some(v) = lookup("IDGATE_PORT") {
        if let Ok(port) = v.parse::<u16>() {
            server.port = port;
        }
    }
}
