//! GitHub OAuth client.

use super::{OAuthProvider, ProviderProfile};
use crate::config::GitHubConfig;
use crate::identity::ProviderAccessToken;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Reply of GitHub's access-token endpoint (form encoded)
#[derive(Deserialize, Debug)]
struct ExchangeReply {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ExchangeReply {
    fn into_token(self) -> Result<ProviderAccessToken> {
        if let Some(error) = self.error {
            let description = self
                .error_description
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(anyhow!("{} - {}", error, description));
        }

        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("Reply did not contain an access token"))?;

        Ok(ProviderAccessToken {
            access_token,
            token_type: self.token_type,
            scope: self.scope,
        })
    }
}

/// GitHub user API response (fields we use)
#[derive(Deserialize, Debug)]
struct GitHubUser {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<GitHubUser> for ProviderProfile {
    fn from(user: GitHubUser) -> Self {
        ProviderProfile {
            provider_id: user.id.to_string(),
            display_name: user.name,
            picture: user.avatar_url,
            email: user.email,
        }
    }
}

pub struct GitHubProvider {
    client: reqwest::Client,
    config: GitHubConfig,
    client_secret: String,
}

impl GitHubProvider {
    pub fn new(config: GitHubConfig, client_secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            client_secret: client_secret.into(),
        }
    }
}

#[async_trait]
impl OAuthProvider for GitHubProvider {
    fn name(&self) -> &str {
        "github"
    }

    async fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> Result<ProviderAccessToken> {
        let params = [
            ("code", code),
            ("client_id", client_id),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ];

        tracing::debug!(url = %self.config.access_token_url, "Exchanging authorization code for token");

        let response = self
            .client
            .get(&self.config.access_token_url)
            .header("User-Agent", &self.config.user_agent)
            .query(&params)
            .send()
            .await
            .context("Failed to send token exchange request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Token exchange failed with status {}: {}",
                status,
                body
            ));
        }

        let body = response
            .text()
            .await
            .context("Failed to read token exchange response")?;
        parse_exchange_reply(&body)
    }

    async fn fetch_profile(&self, token: &ProviderAccessToken) -> Result<ProviderProfile> {
        let response = self
            .client
            .get(&self.config.user_api_url)
            .header("User-Agent", &self.config.user_agent)
            .header("Authorization", format!("token {}", token.access_token))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send profile request")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Profile request failed with status {}",
                response.status()
            ));
        }

        let user: GitHubUser = response
            .json()
            .await
            .context("Failed to parse GitHub user profile")?;

        tracing::debug!(provider_id = user.id, "Fetched GitHub profile");

        Ok(user.into())
    }
}

fn parse_exchange_reply(body: &str) -> Result<ProviderAccessToken> {
    let reply: ExchangeReply =
        serde_urlencoded::from_str(body).context("Failed to parse token exchange response")?;
    reply.into_token()
}
