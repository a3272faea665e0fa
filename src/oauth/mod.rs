//! OAuth 2.0 provider access.
//!
//! The identity service needs two things from a provider during a callback:
//! 1. Exchange the authorization code for an access token
//! 2. Fetch the provider's profile of the user with that token
//!
//! Both live behind [`OAuthProvider`] so the linking flow can be driven by a
//! real HTTP client in production and an in-process fake in tests.

mod github;

pub use github::GitHubProvider;

use crate::identity::ProviderAccessToken;
use async_trait::async_trait;

/// Providers that may be linked and unlinked
pub const SUPPORTED_PROVIDERS: &[&str] = &["github"];

/// Check if a provider name is in the supported set
pub fn is_supported_provider(name: &str) -> bool {
    SUPPORTED_PROVIDERS.contains(&name)
}

/// User profile as reported by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    /// Provider-assigned account id
    pub provider_id: String,
    pub display_name: Option<String>,
    /// Avatar URL
    pub picture: Option<String>,
    /// Public email, when the provider exposes one
    pub email: Option<String>,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Provider name as used in linked records, e.g. "github"
    fn name(&self) -> &str;

    /// Exchange an authorization code for an access token
    async fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> anyhow::Result<ProviderAccessToken>;

    /// Fetch the authorizing user's profile
    async fn fetch_profile(&self, token: &ProviderAccessToken) -> anyhow::Result<ProviderProfile>;
}
