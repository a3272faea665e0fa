pub mod secrets;
pub use secrets::{apply_server_env, Secrets};

use crate::credentials::DEFAULT_ITERATIONS;
use crate::token::{DEFAULT_TOKEN_TTL_DAYS, MAX_TOKEN_TTL_DAYS};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Complete idgate configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub github: GitHubConfig,
}

/// Listen address
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Session and credential settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session token lifetime (days)
    #[serde(default = "default_token_ttl_days")]
    pub token_ttl_days: i64,
    /// PBKDF2 rounds for new password hashes
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,
    /// Length of passwords generated for OAuth signups (at least 6)
    #[serde(default = "default_temporary_password_length")]
    pub temporary_password_length: usize,
}

fn default_token_ttl_days() -> i64 {
    DEFAULT_TOKEN_TTL_DAYS
}

fn default_hash_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_temporary_password_length() -> usize {
    6
}

impl AuthConfig {
    /// Reject settings that would make every issued token unusable.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&self.token_ttl_days) {
            bail!(
                "auth.token_ttl_days must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_DAYS,
                self.token_ttl_days
            );
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_days: default_token_ttl_days(),
            hash_iterations: default_hash_iterations(),
            temporary_password_length: default_temporary_password_length(),
        }
    }
}

/// GitHub OAuth endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// Code exchange endpoint
    #[serde(default = "default_access_token_url")]
    pub access_token_url: String,
    /// Authenticated user endpoint
    #[serde(default = "default_user_api_url")]
    pub user_api_url: String,
    /// User-Agent header GitHub requires on API calls
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_access_token_url() -> String {
    "https://github.com/login/oauth/access_token".to_string()
}

fn default_user_api_url() -> String {
    "https://api.github.com/user".to_string()
}

fn default_user_agent() -> String {
    "idgate".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            access_token_url: default_access_token_url(),
            user_api_url: default_user_api_url(),
            user_agent: default_user_agent(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .auth
        .validate()
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

/// Load configuration from `path` if it exists, otherwise use defaults
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    if path.exists() {
        load_config(path)
    } else {
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_ttl_days, 14);
        assert_eq!(config.auth.hash_iterations, 100_000);
        assert_eq!(config.auth.temporary_password_length, 6);
        assert_eq!(
            config.github.access_token_url,
            "https://github.com/login/oauth/access_token"
        );
        assert_eq!(config.github.user_api_url, "https://api.github.com/user");
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [auth]
            token_ttl_days = 1
            hash_iterations = 50000
            temporary_password_length = 12

            [github]
            access_token_url = "http://localhost:9000/token"
            user_api_url = "http://localhost:9000/user"
            user_agent = "test-agent"
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_ttl_days, 1);
        assert_eq!(config.auth.hash_iterations, 50_000);
        assert_eq!(config.auth.temporary_password_length, 12);
        assert_eq!(config.github.access_token_url, "http://localhost:9000/token");
        assert_eq!(config.github.user_agent, "test-agent");
    }

    #[test]
    fn test_partial_config() {
        // Missing sections and fields use defaults
        let toml = r#"
            [auth]
            token_ttl_days = 7
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.token_ttl_days, 7);
        assert_eq!(config.auth.hash_iterations, 100_000);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.github.user_agent, "idgate");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4000").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "localhost");
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_config_rejects_unusable_token_ttl() {
        for ttl in ["0", "-3", "100000"] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "[auth]\ntoken_ttl_days = {}", ttl).unwrap();

            let err = load_config(file.path()).unwrap_err();
            assert!(
                format!("{:#}", err).contains("token_ttl_days"),
                "ttl {} gave {:#}",
                ttl,
                err
            );
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[auth]\ntoken_ttl_days = 3650").unwrap();
        assert_eq!(load_config(file.path()).unwrap().auth.token_ttl_days, 3650);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 3000);

        assert!(load_config(dir.path().join("absent.toml")).is_err());
    }
}
