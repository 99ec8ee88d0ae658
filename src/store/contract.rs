//! Behaviour every [`UserStore`] + [`SessionStore`] backend must share.
//!
//! Each check only looks at records it created itself, so the suite can run
//! against a database that already holds data.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

use super::{NewUser, SessionStore, StoreError, User, UserStore, MAX_TTL_SECONDS};

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

async fn local_user<S: UserStore>(store: &S, username: &str) -> User {
    store
        .create(NewUser::local(username, "hash".to_string()))
        .await
        .unwrap()
}

pub(super) async fn local_usernames_are_unique<S: UserStore>(store: &S) {
    let username = unique("alice");
    local_user(store, &username).await;

    let second = store
        .create(NewUser::local(&username, "other".to_string()))
        .await;
    assert!(matches!(second, Err(StoreError::Conflict)));
}

pub(super) async fn google_ids_are_unique<S: UserStore>(store: &S) {
    let google_id = unique("g");
    store
        .create(NewUser::google(&google_id, Some("Ada")))
        .await
        .unwrap();

    let second = store.create(NewUser::google(&google_id, Some("Eve"))).await;
    assert!(matches!(second, Err(StoreError::Conflict)));
}

pub(super) async fn google_user_does_not_block_local_username<S: UserStore>(store: &S) {
    let username = unique("alice");
    store
        .find_or_create_by_google_id(&unique("g"), Some(&username))
        .await
        .unwrap();

    let local = local_user(store, &username).await;
    let found = store.find_local(&username).await.unwrap().unwrap();
    assert_eq!(found.id, local.id);
}

pub(super) async fn find_or_create_is_idempotent<S: UserStore>(store: &S) {
    let google_id = unique("g");
    let first = store
        .find_or_create_by_google_id(&google_id, Some("Ada"))
        .await
        .unwrap();
    let second = store
        .find_or_create_by_google_id(&google_id, Some("Renamed"))
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.username.as_deref(), Some("Ada"));
    assert_eq!(store.find_by_id(first.id).await.unwrap(), Some(first));
}

pub(super) async fn concurrent_find_or_create_resolves_one_user<S: UserStore>(store: &S) {
    let google_id = unique("g");
    let (a, b, c) = tokio::join!(
        store.find_or_create_by_google_id(&google_id, Some("Ada")),
        store.find_or_create_by_google_id(&google_id, Some("Ada")),
        store.find_or_create_by_google_id(&google_id, Some("Ada")),
    );
    let ids: HashSet<Uuid> = [a.unwrap().id, b.unwrap().id, c.unwrap().id].into();
    assert_eq!(ids.len(), 1);
}

pub(super) async fn secrets_are_listed_in_creation_order<S: UserStore>(store: &S) {
    let mut alice = local_user(store, &unique("alice")).await;
    let mut bob = local_user(store, &unique("bob")).await;
    let carol = local_user(store, &unique("carol")).await;

    alice.secret = Some("first".to_string());
    store.save(&alice).await.unwrap();
    bob.secret = Some("bob's".to_string());
    store.save(&bob).await.unwrap();
    alice.secret = Some("second".to_string());
    store.save(&alice).await.unwrap();

    let ours = [alice.id, bob.id, carol.id];
    let listed: Vec<(Uuid, String)> = store
        .find_with_secrets()
        .await
        .unwrap()
        .into_iter()
        .filter(|user| ours.contains(&user.id))
        .map(|user| (user.id, user.secret.unwrap()))
        .collect();
    assert_eq!(
        listed,
        vec![
            (alice.id, "second".to_string()),
            (bob.id, "bob's".to_string())
        ]
    );
}

pub(super) async fn save_missing_user_is_not_found<S: UserStore>(store: &S) {
    let ghost = User {
        id: Uuid::new_v4(),
        username: None,
        password_hash: None,
        google_id: None,
        secret: Some("boo".to_string()),
    };
    assert!(matches!(store.save(&ghost).await, Err(StoreError::NotFound)));
}

pub(super) async fn sessions_expire_and_are_purged<S: UserStore + SessionStore>(store: &S) {
    let user = local_user(store, &unique("alice")).await;
    let live = Uuid::new_v4().as_bytes().to_vec();
    let dead = Uuid::new_v4().as_bytes().to_vec();

    store
        .insert_session(&live, user.id, Duration::from_secs(60))
        .await
        .unwrap();
    store
        .insert_session(&dead, user.id, Duration::ZERO)
        .await
        .unwrap();
    assert!(matches!(
        store
            .insert_session(&live, user.id, Duration::from_secs(60))
            .await,
        Err(StoreError::Conflict)
    ));

    assert_eq!(store.lookup_session(&live).await.unwrap(), Some(user.id));
    assert_eq!(store.lookup_session(&dead).await.unwrap(), None);
    assert!(store.purge_expired().await.unwrap() >= 1);
    assert_eq!(store.lookup_session(&live).await.unwrap(), Some(user.id));

    store.delete_session(&live).await.unwrap();
    assert_eq!(store.lookup_session(&live).await.unwrap(), None);
}

pub(super) async fn oauth_state_is_single_use<S: SessionStore>(store: &S) {
    let state = unique("state");
    store
        .insert_oauth_state(&state, "verifier", Duration::from_secs(600))
        .await
        .unwrap();
    assert_eq!(
        store.take_oauth_state(&state).await.unwrap().as_deref(),
        Some("verifier")
    );
    assert_eq!(store.take_oauth_state(&state).await.unwrap(), None);

    let expired = unique("state");
    store
        .insert_oauth_state(&expired, "verifier", Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(store.take_oauth_state(&expired).await.unwrap(), None);
}

pub(super) async fn ttl_beyond_one_year_is_rejected<S: UserStore + SessionStore>(store: &S) {
    let user = local_user(store, &unique("alice")).await;
    let session = Uuid::new_v4().as_bytes().to_vec();

    for seconds in [MAX_TTL_SECONDS + 1, u64::MAX] {
        let ttl = Duration::from_secs(seconds);
        assert!(matches!(
            store.insert_session(&session, user.id, ttl).await,
            Err(StoreError::TtlOutOfRange(s)) if s == seconds
        ));
        assert!(matches!(
            store.insert_oauth_state(&unique("state"), "verifier", ttl).await,
            Err(StoreError::TtlOutOfRange(s)) if s == seconds
        ));
    }
    assert_eq!(store.lookup_session(&session).await.unwrap(), None);

    store
        .insert_session(&session, user.id, Duration::from_secs(MAX_TTL_SECONDS))
        .await
        .unwrap();
    assert_eq!(store.lookup_session(&session).await.unwrap(), Some(user.id));
}

/// Run every check above against `store`.
pub(super) async fn run<S: UserStore + SessionStore>(store: &S) {
    local_usernames_are_unique(store).await;
    google_ids_are_unique(store).await;
    google_user_does_not_block_local_username(store).await;
    find_or_create_is_idempotent(store).await;
    concurrent_find_or_create_resolves_one_user(store).await;
    secrets_are_listed_in_creation_order(store).await;
    save_missing_user_is_not_found(store).await;
    sessions_expire_and_are_purged(store).await;
    oauth_state_is_single_use(store).await;
    ttl_beyond_one_year_is_rejected(store).await;
    store.ping().await.unwrap();
}
