use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

mod store;

pub use store::{IdentityStore, LinkedInsert, StoreError};

#[cfg(test)]
mod tests;

/// Stored representation of one user account.
///
/// Values handed out by [`IdentityStore`] are copies; changing one has no
/// effect on the store until it is passed back to [`IdentityStore::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    /// Assigned once at creation, never reassigned
    id: Uuid,
    /// Login email; empty for provider signups that reported none
    pub email: String,
    /// Encoded salted hash (see `credentials`); always present
    pub password_hash: String,
    /// Name shown in the profile
    pub display_name: Option<String>,
    /// Avatar URL
    pub picture: Option<String>,
    /// At most one external identity; unique across the store
    pub linked_provider: Option<LinkedProvider>,
    /// Plaintext password generated during OAuth signup, kept so it can be shown to the user
    pub temporary_password: Option<String>,
}

impl UserRecord {
    /// Build a record with a fresh random id. Not visible to queries until saved.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            display_name: None,
            picture: None,
            linked_provider: None,
            temporary_password: None,
        }
    }

    /// Stable record id, also the session token subject
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether this record is linked to `provider_id` at `provider`.
    pub fn is_linked_to(&self, provider: &str, provider_id: &str) -> bool {
        self.linked_provider
            .as_ref()
            .is_some_and(|link| link.provider == provider && link.provider_id == provider_id)
    }
}

/// External identity attached to a local record.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedProvider {
    /// Provider name, e.g. "github"
    pub provider: String,
    /// Provider-assigned account id
    pub provider_id: String,
    /// Latest token from the provider's code exchange
    pub access_token: ProviderAccessToken,
}

/// Access token returned by a provider's code exchange. Opaque to this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAccessToken {
    /// Bearer credential for the provider's API
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Profile fields a user may change. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileUpdate {
    /// New display name
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    /// New login email
    #[serde(default)]
    pub email: Option<String>,
}

impl ProfileUpdate {
    /// Apply to a record. Empty strings count as absent.
    pub fn apply(&self, record: &mut UserRecord) {
        if let Some(name) = self.display_name.as_ref().filter(|v| !v.is_empty()) {
            record.display_name = Some(name.clone());
        }
        if let Some(email) = self.email.as_ref().filter(|v| !v.is_empty()) {
            record.email = email.clone();
        }
    }
}

const DEMO_ACCOUNTS: [(&str, &str); 2] = [
    ("bob@email.com", "password_bob"),
    ("alice@email.com", "password_alice"),
];

/// Populate a fresh store with the two demo accounts.
pub async fn seed_demo_accounts(store: &IdentityStore) -> anyhow::Result<Vec<UserRecord>> {
    let created = futures::future::try_join_all(
        DEMO_ACCOUNTS
            .iter()
            .map(|(email, password)| store.create(email, password)),
    )
    .await?;

    futures::future::try_join_all(created.iter().map(|user| store.save(user))).await?;

    info!(count = created.len(), "Seeded demo accounts");
    Ok(created)
}
