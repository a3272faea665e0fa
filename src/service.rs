//! Operations exposed to the request-handling layer.

use crate::credentials::PasswordHasher;
use crate::error::AuthError;
use crate::identity::{IdentityStore, ProfileUpdate, UserRecord};
use crate::linking::{AccountLinker, LinkEntry, LinkOutcome};
use crate::oauth::OAuthProvider;
use crate::token::TokenService;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// OAuth callback parameters supplied by the client
#[derive(Debug, Clone)]
pub struct OAuthCallback {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
}

/// Identity and session service.
///
/// Cheap to clone; clones share the same store and signing key.
#[derive(Clone)]
pub struct IdentityService {
    store: IdentityStore,
    hasher: PasswordHasher,
    tokens: TokenService,
    provider: Arc<dyn OAuthProvider>,
    linker: Arc<AccountLinker>,
}

impl IdentityService {
    /// Wire the service. `temporary_password_length` applies to provider signups.
    pub fn new(
        store: IdentityStore,
        hasher: PasswordHasher,
        tokens: TokenService,
        provider: Arc<dyn OAuthProvider>,
        temporary_password_length: usize,
    ) -> Self {
        let linker = Arc::new(AccountLinker::new(store.clone(), temporary_password_length));
        Self {
            store,
            hasher,
            tokens,
            provider,
            linker,
        }
    }

    /// Underlying identity store
    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    /// Session token issuer
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Resolve a session token to its subject id.
    pub fn ensure_authenticated(&self, token: &str) -> Result<Uuid, AuthError> {
        let claims = self.tokens.verify(token).map_err(|e| {
            debug!(error = %e, "Rejected session token");
            AuthError::from(e)
        })?;
        Ok(claims.sub)
    }

    /// Email/password login. Unknown email and wrong password fail the same way.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        if email.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let Some(user) = self.store.find_by_email(email).await? else {
            // Pay for a derivation anyway so timing does not reveal the miss
            self.hasher.verify_decoy(password).await;
            debug!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash).await {
            debug!(user_id = %user.id(), "Login failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id(), "User logged in");
        Ok(self.tokens.issue(user.id())?)
    }

    /// Complete an OAuth authorization and return a session token.
    ///
    /// With `existing_token` the provider identity is linked to that account;
    /// without it the caller is signed in (or up) through the provider.
    pub async fn oauth_callback(
        &self,
        callback: &OAuthCallback,
        existing_token: Option<&str>,
    ) -> Result<String, AuthError> {
        // Check the session before spending the authorization code
        let entry = match existing_token {
            Some(token) => LinkEntry::Authenticated(self.ensure_authenticated(token)?),
            None => LinkEntry::Anonymous,
        };
        let outcome = self.oauth_link(callback, entry).await?;
        Ok(self.tokens.issue(outcome.user.id())?)
    }

    /// Run the provider exchange and linking transition without issuing a token.
    pub async fn oauth_link(
        &self,
        callback: &OAuthCallback,
        entry: LinkEntry,
    ) -> Result<LinkOutcome, AuthError> {
        let provider = self.provider.name().to_string();

        let access_token = self
            .provider
            .exchange_code(&callback.code, &callback.client_id, &callback.redirect_uri)
            .await
            .map_err(|e| {
                warn!(provider = %provider, error = %e, "Token exchange failed");
                AuthError::ProviderUnavailable(format!("Failed to exchange authorization code: {}", e))
            })?;

        let profile = self.provider.fetch_profile(&access_token).await.map_err(|e| {
            warn!(provider = %provider, error = %e, "Profile fetch failed");
            AuthError::ProviderUnavailable(format!("Failed to fetch profile: {}", e))
        })?;

        self.linker
            .reconcile(entry, &provider, profile, access_token)
            .await
    }

    /// Detach `provider` from the subject's record.
    pub async fn unlink(&self, subject: Uuid, provider: &str) -> Result<(), AuthError> {
        self.linker.unlink(subject, provider).await?;
        Ok(())
    }

    /// The subject's record, or `UserNotFound`.
    pub async fn get_profile(&self, subject: Uuid) -> Result<UserRecord, AuthError> {
        self.store
            .find_by_id(subject)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Change the subject's display name or email.
    pub async fn update_profile(
        &self,
        subject: Uuid,
        update: ProfileUpdate,
    ) -> Result<(), AuthError> {
        self.store
            .update_profile(subject, update)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        info!(user_id = %subject, "Profile updated");
        Ok(())
    }
}
