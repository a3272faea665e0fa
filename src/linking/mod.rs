//! Reconciles an OAuth provider identity with local identity records.
//!
//! Each callback performs exactly one transition:
//!
//! | Entry         | Provider id already linked? | Transition                          |
//! |---------------|-----------------------------|-------------------------------------|
//! | Authenticated | no, or to the caller        | attach link to caller (`Attached`)  |
//! | Authenticated | to another record           | `ConflictAlreadyLinked`, no change  |
//! | Anonymous     | yes                         | refresh stored token (`Refreshed`)  |
//! | Anonymous     | no                          | create linked record (`SignedUp`)   |
//!
//! Every check-then-write runs as one store job, so concurrent callbacks for
//! the same provider identity cannot produce two linked records.

use crate::error::AuthError;
use crate::identity::{IdentityStore, LinkedInsert, LinkedProvider, ProviderAccessToken, UserRecord};
use crate::oauth::{is_supported_provider, ProviderProfile};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;


/// Shortest temporary password issued on provider signup
pub const MIN_TEMPORARY_PASSWORD_LENGTH: usize = 6;

/// How the callback arrived
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkEntry {
    /// Request carried a valid session token for this subject
    Authenticated(Uuid),
    Anonymous,
}

/// Which transition a callback took
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkTransition {
    /// Provider attached to the authenticated caller's record
    Attached,
    /// Existing linked record found; its provider token was updated
    Refreshed,
    /// New record created for the provider identity
    SignedUp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkOutcome {
    pub user: UserRecord,
    pub transition: LinkTransition,
}

pub struct AccountLinker {
    store: IdentityStore,
    temporary_password_length: usize,
}

impl AccountLinker {
    /// Lengths below [`MIN_TEMPORARY_PASSWORD_LENGTH`] are raised to it.
    pub fn new(store: IdentityStore, temporary_password_length: usize) -> Self {
        Self {
            store,
            temporary_password_length: temporary_password_length.max(MIN_TEMPORARY_PASSWORD_LENGTH),
        }
    }

    /// Apply the one transition selected by `entry` and the store's current links.
    pub async fn reconcile(
        &self,
        entry: LinkEntry,
        provider: &str,
        profile: ProviderProfile,
        token: ProviderAccessToken,
    ) -> Result<LinkOutcome, AuthError> {
        let link = LinkedProvider {
            provider: provider.to_string(),
            provider_id: profile.provider_id.clone(),
            access_token: token,
        };

        match entry {
            LinkEntry::Authenticated(subject) => self.attach(subject, link, profile).await,
            LinkEntry::Anonymous => self.sign_in(link, profile).await,
        }
    }

    async fn attach(
        &self,
        subject: Uuid,
        link: LinkedProvider,
        profile: ProviderProfile,
    ) -> Result<LinkOutcome, AuthError> {
        let provider = link.provider.clone();
        let result = self
            .store
            .attach_provider(subject, link, profile.display_name, profile.picture)
            .await;

        match result {
            Ok(Some(user)) => {
                info!(user_id = %subject, provider = %provider, "Linked provider to account");
                Ok(LinkOutcome {
                    user,
                    transition: LinkTransition::Attached,
                })
            }
            Ok(None) => Err(AuthError::UserNotFound),
            Err(e) => {
                warn!(user_id = %subject, provider = %provider, error = %e, "Provider link rejected");
                Err(e.into())
            }
        }
    }

    async fn sign_in(
        &self,
        link: LinkedProvider,
        profile: ProviderProfile,
    ) -> Result<LinkOutcome, AuthError> {
        let refreshed = self
            .store
            .refresh_provider_token(&link.provider, &link.provider_id, link.access_token.clone())
            .await?;
        if let Some(user) = refreshed {
            info!(user_id = %user.id(), provider = %link.provider, "Signed in with linked provider");
            return Ok(LinkOutcome {
                user,
                transition: LinkTransition::Refreshed,
            });
        }

        let temporary_password = generate_password(self.temporary_password_length);
        let email = profile.email.unwrap_or_default();
        let mut user = self.store.create(&email, &temporary_password).await?;
        user.display_name = profile.display_name;
        user.picture = profile.picture;
        user.temporary_password = Some(temporary_password);
        user.linked_provider = Some(link);

        // A concurrent callback may have linked the identity since the refresh above
        match self.store.insert_linked(user).await? {
            LinkedInsert::Created(user) => {
                info!(user_id = %user.id(), "Created account from provider signup");
                Ok(LinkOutcome {
                    user,
                    transition: LinkTransition::SignedUp,
                })
            }
            LinkedInsert::Refreshed(user) => Ok(LinkOutcome {
                user,
                transition: LinkTransition::Refreshed,
            }),
        }
    }

    /// Remove the `provider` link from `subject`.
    pub async fn unlink(&self, subject: Uuid, provider: &str) -> Result<UserRecord, AuthError> {
        if !is_supported_provider(provider) {
            return Err(AuthError::UnsupportedProvider(provider.to_string()));
        }

        let user = self
            .store
            .clear_provider(subject, provider)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(user_id = %subject, provider = %provider, "Unlinked provider");
        Ok(user)
    }
}

/// Random alphanumeric password
fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
