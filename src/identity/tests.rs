use super::*;
use crate::credentials::PasswordHasher;

fn test_store() -> IdentityStore {
    IdentityStore::new(PasswordHasher::new(1_000))
}

fn github_link(provider_id: &str, access_token: &str) -> LinkedProvider {
    LinkedProvider {
        provider: "github".to_string(),
        provider_id: provider_id.to_string(),
        access_token: ProviderAccessToken {
            access_token: access_token.to_string(),
            token_type: Some("bearer".to_string()),
            scope: None,
        },
    }
}

#[tokio::test]
async fn test_create_is_not_visible_until_saved() {
    let store = test_store();
    let user = store.create("bob@email.com", "password_bob").await.unwrap();

    assert_eq!(user.email, "bob@email.com");
    assert_ne!(user.password_hash, "password_bob");
    assert!(user.linked_provider.is_none());
    assert_eq!(store.find_by_id(user.id()).await.unwrap(), None);
    assert_eq!(store.len().await.unwrap(), 0);

    store.save(&user).await.unwrap();
    assert_eq!(store.find_by_id(user.id()).await.unwrap(), Some(user));
}

#[tokio::test]
async fn test_created_ids_are_unique() {
    let store = test_store();
    let first = store.create("a@email.com", "pw").await.unwrap();
    let second = store.create("a@email.com", "pw").await.unwrap();
    assert_ne!(first.id(), second.id());
}

#[tokio::test]
async fn test_saved_record_is_a_copy() {
    let store = test_store();
    let mut user = store.create("bob@email.com", "password_bob").await.unwrap();
    store.save(&user).await.unwrap();

    // Mutating the caller's value does not reach the store
    user.email = "mallory@email.com".to_string();
    let stored = store.find_by_id(user.id()).await.unwrap().unwrap();
    assert_eq!(stored.email, "bob@email.com");

    // Mutating a returned value does not reach the store either
    let mut found = store.find_by_id(user.id()).await.unwrap().unwrap();
    found.display_name = Some("Bob".to_string());
    let again = store.find_by_id(user.id()).await.unwrap().unwrap();
    assert_eq!(again.display_name, None);
}

#[tokio::test]
async fn test_save_replaces_existing_record() {
    let store = test_store();
    let mut user = store.create("bob@email.com", "password_bob").await.unwrap();
    store.save(&user).await.unwrap();

    user.display_name = Some("Bob".to_string());
    user.picture = Some("https://example.com/bob.png".to_string());
    store.save(&user).await.unwrap();

    assert_eq!(store.len().await.unwrap(), 1);
    assert_eq!(store.find_by_id(user.id()).await.unwrap(), Some(user));
}

#[tokio::test]
async fn test_find_by_email_is_exact() {
    let store = test_store();
    let bob = store.create("bob@email.com", "password_bob").await.unwrap();
    store.save(&bob).await.unwrap();

    let found = store.find_by_email("bob@email.com").await.unwrap().unwrap();
    assert_eq!(found.id(), bob.id());
    assert!(store.find_by_email("BOB@email.com").await.unwrap().is_none());
    assert!(store.find_by_email("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_by_email_returns_first_in_store_order() {
    let store = test_store();
    let first = store.create("dup@email.com", "one").await.unwrap();
    let second = store.create("dup@email.com", "two").await.unwrap();
    store.save(&first).await.unwrap();
    store.save(&second).await.unwrap();

    let found = store.find_by_email("dup@email.com").await.unwrap().unwrap();
    assert_eq!(found.id(), first.id());
}

#[tokio::test]
async fn test_find_by_provider_id() {
    let store = test_store();
    let mut user = store.create("bob@email.com", "password_bob").await.unwrap();
    user.linked_provider = Some(github_link("1234", "gho_a"));
    store.save(&user).await.unwrap();

    let found = store.find_by_provider_id("github", "1234").await.unwrap();
    assert_eq!(found.map(|u| u.id()), Some(user.id()));
    assert!(store.find_by_provider_id("github", "999").await.unwrap().is_none());
    assert!(store.find_by_provider_id("gitlab", "1234").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_rejects_duplicate_provider_link() {
    let store = test_store();
    let mut bob = store.create("bob@email.com", "password_bob").await.unwrap();
    let mut alice = store.create("alice@email.com", "password_alice").await.unwrap();
    bob.linked_provider = Some(github_link("1234", "gho_a"));
    store.save(&bob).await.unwrap();
    store.save(&alice).await.unwrap();

    alice.linked_provider = Some(github_link("1234", "gho_b"));
    assert_eq!(
        store.save(&alice).await,
        Err(StoreError::ProviderAlreadyLinked)
    );

    let stored_alice = store.find_by_id(alice.id()).await.unwrap().unwrap();
    assert!(stored_alice.linked_provider.is_none());

    // Re-saving the holder itself is fine
    store.save(&bob).await.unwrap();
}

#[tokio::test]
async fn test_operations_apply_in_call_order() {
    let store = test_store();
    let user = store.create("bob@email.com", "password_bob").await.unwrap();

    // Both jobs are queued before either future is polled; the lookup is
    // polled first but still observes the earlier save.
    let save = store.save(&user);
    let lookup = store.find_by_id(user.id());
    let (found, saved) = tokio::join!(lookup, save);

    saved.unwrap();
    assert_eq!(found.unwrap().map(|u| u.id()), Some(user.id()));
}

#[tokio::test]
async fn test_reads_see_only_earlier_writes() {
    let store = test_store();
    let mut user = store.create("bob@email.com", "password_bob").await.unwrap();
    store.save(&user).await.unwrap();

    let before = store.find_by_id(user.id());
    user.display_name = Some("Robert".to_string());
    let save = store.save(&user);
    let after = store.find_by_id(user.id());

    let (after, before, saved) = tokio::join!(after, before, save);
    saved.unwrap();
    assert_eq!(before.unwrap().unwrap().display_name, None);
    assert_eq!(
        after.unwrap().unwrap().display_name,
        Some("Robert".to_string())
    );
}

#[tokio::test]
async fn test_concurrent_saves_never_lose_writes() {
    let store = test_store();
    let creates = (0..32).map(|i| {
        let store = store.clone();
        tokio::spawn(async move {
            let user = store
                .create(&format!("user{}@email.com", i), "pw")
                .await
                .unwrap();
            store.save(&user).await.unwrap();
            user.id()
        })
    });
    let ids: Vec<Uuid> = futures::future::join_all(creates)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(store.len().await.unwrap(), 32);
    for id in ids {
        assert!(store.find_by_id(id).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_update_missing_record_returns_none() {
    let store = test_store();
    let result = store
        .update(Uuid::new_v4(), |user| user.email = "x@email.com".to_string())
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_attach_provider_fills_only_empty_profile_fields() {
    let store = test_store();
    let mut user = store.create("bob@email.com", "password_bob").await.unwrap();
    user.display_name = Some("Bob".to_string());
    store.save(&user).await.unwrap();

    let updated = store
        .attach_provider(
            user.id(),
            github_link("1234", "gho_a"),
            Some("Robert".to_string()),
            Some("https://avatars.example.com/1234".to_string()),
        )
        .await
        .unwrap()
        .unwrap();

    assert!(updated.is_linked_to("github", "1234"));
    assert_eq!(updated.display_name, Some("Bob".to_string()));
    assert_eq!(
        updated.picture,
        Some("https://avatars.example.com/1234".to_string())
    );
}

#[tokio::test]
async fn test_attach_provider_conflict_leaves_record_untouched() {
    let store = test_store();
    let mut bob = store.create("bob@email.com", "password_bob").await.unwrap();
    bob.linked_provider = Some(github_link("1234", "gho_a"));
    let alice = store.create("alice@email.com", "password_alice").await.unwrap();
    store.save(&bob).await.unwrap();
    store.save(&alice).await.unwrap();

    let result = store
        .attach_provider(alice.id(), github_link("1234", "gho_b"), None, None)
        .await;
    assert_eq!(result, Err(StoreError::ProviderAlreadyLinked));
    assert_eq!(store.find_by_id(alice.id()).await.unwrap(), Some(alice));
    assert_eq!(store.find_by_id(bob.id()).await.unwrap(), Some(bob));
}

#[tokio::test]
async fn test_clear_provider() {
    let store = test_store();
    let mut user = store.create("bob@email.com", "password_bob").await.unwrap();
    user.linked_provider = Some(github_link("1234", "gho_a"));
    store.save(&user).await.unwrap();

    let kept = store.clear_provider(user.id(), "gitlab").await.unwrap().unwrap();
    assert!(kept.is_linked_to("github", "1234"));

    let cleared = store.clear_provider(user.id(), "github").await.unwrap().unwrap();
    assert!(cleared.linked_provider.is_none());
    assert!(store.find_by_provider_id("github", "1234").await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_provider_token() {
    let store = test_store();
    let mut user = store.create("bob@email.com", "password_bob").await.unwrap();
    user.linked_provider = Some(github_link("1234", "gho_old"));
    store.save(&user).await.unwrap();

    let refreshed = store
        .refresh_provider_token("github", "1234", github_link("1234", "gho_new").access_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.id(), user.id());

    let stored = store.find_by_id(user.id()).await.unwrap().unwrap();
    let link = stored.linked_provider.unwrap();
    assert_eq!(link.access_token.access_token, "gho_new");

    let missing = store
        .refresh_provider_token("github", "999", github_link("999", "x").access_token)
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_insert_linked_creates_once() {
    let store = test_store();
    let mut first = store.create("", "tmp1").await.unwrap();
    first.linked_provider = Some(github_link("1234", "gho_a"));
    let mut second = store.create("", "tmp2").await.unwrap();
    second.linked_provider = Some(github_link("1234", "gho_b"));

    let outcome = store.insert_linked(first.clone()).await.unwrap();
    assert_eq!(outcome, LinkedInsert::Created(first.clone()));

    match store.insert_linked(second).await.unwrap() {
        LinkedInsert::Refreshed(holder) => {
            assert_eq!(holder.id(), first.id());
            assert_eq!(
                holder.linked_provider.unwrap().access_token.access_token,
                "gho_b"
            );
        }
        other => panic!("expected refresh, got {:?}", other),
    }
    assert_eq!(store.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_profile() {
    let store = test_store();
    let user = store.create("bob@email.com", "password_bob").await.unwrap();
    store.save(&user).await.unwrap();

    let update = ProfileUpdate {
        display_name: Some("Bob".to_string()),
        email: Some(String::new()),
    };
    let updated = store.update_profile(user.id(), update).await.unwrap().unwrap();
    assert_eq!(updated.display_name, Some("Bob".to_string()));
    assert_eq!(updated.email, "bob@email.com");
}

#[tokio::test]
async fn test_seed_demo_accounts() {
    let store = test_store();
    let seeded = seed_demo_accounts(&store).await.unwrap();
    assert_eq!(seeded.len(), 2);
    assert_eq!(store.len().await.unwrap(), 2);

    let bob = store.find_by_email("bob@email.com").await.unwrap().unwrap();
    assert!(PasswordHasher::new(1_000)
        .verify("password_bob", &bob.password_hash)
        .await);
    assert!(store.find_by_email("alice@email.com").await.unwrap().is_some());
}
