//! Linearized in-memory identity store.
//!
//! A single worker task owns every [`UserRecord`]. Store methods enqueue a job
//! on an unbounded channel the moment they are called and return a future for
//! the job's reply, so jobs run one at a time in call order no matter when
//! the returned futures are polled. A job whose caller went away still runs
//! to completion.

use super::{LinkedProvider, ProfileUpdate, ProviderAccessToken, UserRecord};
use crate::credentials::{HashError, PasswordHasher};
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

type Job = Box<dyn FnOnce(&mut Vec<UserRecord>) + Send>;

/// Handle to the identity store. Cheap to clone; all clones share one worker.
#[derive(Clone)]
pub struct IdentityStore {
    jobs: mpsc::UnboundedSender<Job>,
    hasher: PasswordHasher,
}

/// Outcome of [`IdentityStore::insert_linked`].
#[derive(Debug, Clone, PartialEq)]
pub enum LinkedInsert {
    /// The record was stored as new
    Created(UserRecord),
    /// Another record already held the provider id; its access token was refreshed instead
    Refreshed(UserRecord),
}

impl IdentityStore {
    /// Start the store worker. Must be called inside a tokio runtime.
    pub fn new(hasher: PasswordHasher) -> Self {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            let mut users: Vec<UserRecord> = Vec::new();
            while let Some(job) = queue.recv().await {
                job(&mut users);
            }
            debug!(records = users.len(), "Identity store worker stopped");
        });

        Self { jobs, hasher }
    }

    /// Hash `password` and build a new record for `email`.
    ///
    /// The record is not stored; pass it to [`save`](Self::save) to make it visible.
    pub async fn create(&self, email: &str, password: &str) -> Result<UserRecord, HashError> {
        let password_hash = self.hasher.hash(password).await?;
        Ok(UserRecord::new(email, password_hash))
    }

    /// Insert or fully replace the record with the same id.
    ///
    /// Rejected with `ProviderAlreadyLinked` if another record holds the same provider link.
    pub fn save(
        &self,
        record: &UserRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send + 'static {
        let record = record.clone();
        self.submit(move |users| {
            ensure_link_available(users, &record)?;
            match users.iter_mut().find(|u| u.id() == record.id()) {
                Some(existing) => *existing = record,
                None => users.push(record),
            }
            Ok(())
        })
    }

    /// Copy of the record with `id`, if stored.
    pub fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send + 'static {
        self.submit(move |users| Ok(users.iter().find(|u| u.id() == id).cloned()))
    }

    /// First record (in store order) with exactly this email.
    pub fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send + 'static {
        let email = email.to_string();
        self.submit(move |users| Ok(users.iter().find(|u| u.email == email).cloned()))
    }

    /// The record linked to `provider_id` at `provider`, if any.
    pub fn find_by_provider_id(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send + 'static {
        let provider = provider.to_string();
        let provider_id = provider_id.to_string();
        self.submit(move |users| {
            Ok(users
                .iter()
                .find(|u| u.is_linked_to(&provider, &provider_id))
                .cloned())
        })
    }

    /// Atomically modify the record with `id`.
    ///
    /// Returns the updated copy, or `None` if no such record exists. The change
    /// is discarded if it would break provider-link uniqueness.
    pub fn update<F>(
        &self,
        id: Uuid,
        change: F,
    ) -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send + 'static
    where
        F: FnOnce(&mut UserRecord) + Send + 'static,
    {
        self.submit(move |users| {
            let Some(index) = users.iter().position(|u| u.id() == id) else {
                return Ok(None);
            };

            let mut updated = users[index].clone();
            change(&mut updated);
            ensure_link_available(users, &updated)?;

            users[index] = updated.clone();
            Ok(Some(updated))
        })
    }

    /// Link `id` to an external identity, filling empty profile fields.
    pub fn attach_provider(
        &self,
        id: Uuid,
        link: LinkedProvider,
        display_name: Option<String>,
        picture: Option<String>,
    ) -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send + 'static {
        self.update(id, move |user| {
            user.linked_provider = Some(link);
            if user.display_name.is_none() {
                user.display_name = display_name;
            }
            if user.picture.is_none() {
                user.picture = picture;
            }
        })
    }

    /// Remove the link to `provider` from `id`, if it has one.
    pub fn clear_provider(
        &self,
        id: Uuid,
        provider: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send + 'static {
        let provider = provider.to_string();
        self.update(id, move |user| {
            let linked_here = user
                .linked_provider
                .as_ref()
                .is_some_and(|link| link.provider == provider);
            if linked_here {
                user.linked_provider = None;
            }
        })
    }

    /// Apply user-editable profile changes to `id`.
    ///
    /// Returns the updated copy, or `None` if no such record exists.
    pub fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send + 'static {
        self.update(id, move |user| update.apply(user))
    }

    /// Replace the stored access token of whichever record is linked to `provider_id`.
    pub fn refresh_provider_token(
        &self,
        provider: &str,
        provider_id: &str,
        token: ProviderAccessToken,
    ) -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send + 'static {
        let provider = provider.to_string();
        let provider_id = provider_id.to_string();
        self.submit(move |users| {
            let holder = users
                .iter_mut()
                .find(|u| u.is_linked_to(&provider, &provider_id));
            Ok(holder.map(|user| {
                if let Some(link) = user.linked_provider.as_mut() {
                    link.access_token = token;
                }
                user.clone()
            }))
        })
    }

    /// Store a new provider-linked record unless another record already holds its link.
    ///
    /// When the link is taken, the holder's access token is replaced with the one
    /// carried by `record` and the holder is returned; `record` is dropped.
    pub fn insert_linked(
        &self,
        record: UserRecord,
    ) -> impl Future<Output = Result<LinkedInsert, StoreError>> + Send + 'static {
        self.submit(move |users| {
            if let Some(link) = record.linked_provider.as_ref() {
                let holder = users
                    .iter_mut()
                    .find(|u| u.id() != record.id() && u.is_linked_to(&link.provider, &link.provider_id));
                if let Some(holder) = holder {
                    if let Some(held) = holder.linked_provider.as_mut() {
                        held.access_token = link.access_token.clone();
                    }
                    return Ok(LinkedInsert::Refreshed(holder.clone()));
                }
            }

            match users.iter_mut().find(|u| u.id() == record.id()) {
                Some(existing) => *existing = record.clone(),
                None => users.push(record.clone()),
            }
            Ok(LinkedInsert::Created(record))
        })
    }

    /// Number of stored records.
    pub fn len(&self) -> impl Future<Output = Result<usize, StoreError>> + Send + 'static {
        self.submit(|users| Ok(users.len()))
    }

    /// Queue `op` behind every job submitted before it.
    fn submit<T, F>(&self, op: F) -> impl Future<Output = Result<T, StoreError>> + Send + 'static
    where
        T: Send + 'static,
        F: FnOnce(&mut Vec<UserRecord>) -> Result<T, StoreError> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |users| {
            let _ = reply_tx.send(op(users));
        });
        let queued = self.jobs.send(job).is_ok();

        async move {
            if !queued {
                return Err(StoreError::Closed);
            }
            reply_rx.await.unwrap_or(Err(StoreError::Closed))
        }
    }
}

/// Fails if a record other than `candidate` already holds `candidate`'s provider link.
fn ensure_link_available(users: &[UserRecord], candidate: &UserRecord) -> Result<(), StoreError> {
    let Some(link) = candidate.linked_provider.as_ref() else {
        return Ok(());
    };
    let taken = users
        .iter()
        .any(|u| u.id() != candidate.id() && u.is_linked_to(&link.provider, &link.provider_id));
    if taken {
        return Err(StoreError::ProviderAlreadyLinked);
    }
    Ok(())
}

/// Identity store errors
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store worker has stopped (runtime shutting down)
    Closed,
    /// Another record is already linked to the same provider identity
    ProviderAlreadyLinked,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Closed => write!(f, "Identity store is not running"),
            StoreError::ProviderAlreadyLinked => {
                write!(f, "Provider identity is already linked to another account")
            }
        }
    }
}

impl std::error::Error for StoreError {}
