//! In-process backend.
//!
//! Holds every table behind a single mutex, so find-or-create and the
//! uniqueness checks are trivially atomic. Nothing survives a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{check_ttl, NewUser, SessionStore, StoreError, User, UserStore};

#[derive(Debug)]
struct SessionEntry {
    user_id: Uuid,
    expires_at: Instant,
}

#[derive(Debug)]
struct OAuthStateEntry {
    pkce_verifier: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Tables {
    // Insertion order doubles as creation order.
    users: Vec<User>,
    sessions: HashMap<Vec<u8>, SessionEntry>,
    oauth_states: HashMap<String, OAuthStateEntry>,
}

impl Tables {
    fn local_username_taken(&self, username: &str) -> bool {
        self.users
            .iter()
            .any(|user| user.is_local() && user.username.as_deref() == Some(username))
    }

    fn google_id_taken(&self, google_id: &str) -> bool {
        self.users
            .iter()
            .any(|user| user.google_id.as_deref() == Some(google_id))
    }

    fn insert(&mut self, new_user: NewUser) -> Result<User, StoreError> {
        if new_user.password_hash.is_some() {
            if let Some(username) = new_user.username.as_deref() {
                if self.local_username_taken(username) {
                    return Err(StoreError::Conflict);
                }
            }
        }
        if let Some(google_id) = new_user.google_id.as_deref() {
            if self.google_id_taken(google_id) {
                return Err(StoreError::Conflict);
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            password_hash: new_user.password_hash,
            google_id: new_user.google_id,
            secret: None,
        };
        self.users.push(user.clone());

        Ok(user)
    }
}

fn expiry(ttl: Duration) -> Result<Instant, StoreError> {
    let ttl = check_ttl(ttl)?;
    Instant::now()
        .checked_add(ttl)
        .ok_or(StoreError::TtlOutOfRange(ttl.as_secs()))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        self.tables.lock().await.insert(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_local(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.is_local() && user.username.as_deref() == Some(username))
            .cloned())
    }

    async fn find_with_secrets(&self) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .filter(|user| user.secret.is_some())
            .cloned()
            .collect())
    }

    async fn find_or_create_by_google_id(
        &self,
        google_id: &str,
        username: Option<&str>,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables
            .users
            .iter()
            .find(|user| user.google_id.as_deref() == Some(google_id))
        {
            return Ok(user.clone());
        }

        tables.insert(NewUser::google(google_id, username))
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .users
            .iter_mut()
            .find(|stored| stored.id == user.id)
            .ok_or(StoreError::NotFound)?;
        stored.secret.clone_from(&user.secret);

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {}
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(
        &self,
        session_hash: &[u8],
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = expiry(ttl)?;
        let mut tables = self.tables.lock().await;
        if tables.sessions.contains_key(session_hash) {
            return Err(StoreError::Conflict);
        }
        tables.sessions.insert(
            session_hash.to_vec(),
            SessionEntry {
                user_id,
                expires_at,
            },
        );

        Ok(())
    }

    async fn lookup_session(&self, session_hash: &[u8]) -> Result<Option<Uuid>, StoreError> {
        let tables = self.tables.lock().await;
        let now = Instant::now();
        Ok(tables
            .sessions
            .get(session_hash)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.user_id))
    }

    async fn delete_session(&self, session_hash: &[u8]) -> Result<(), StoreError> {
        self.tables.lock().await.sessions.remove(session_hash);
        Ok(())
    }

    async fn insert_oauth_state(
        &self,
        state: &str,
        pkce_verifier: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = expiry(ttl)?;
        let mut tables = self.tables.lock().await;
        if tables.oauth_states.contains_key(state) {
            return Err(StoreError::Conflict);
        }
        tables.oauth_states.insert(
            state.to_string(),
            OAuthStateEntry {
                pkce_verifier: pkce_verifier.to_string(),
                expires_at,
            },
        );

        Ok(())
    }

    async fn take_oauth_state(&self, state: &str) -> Result<Option<String>, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Instant::now();
        Ok(tables
            .oauth_states
            .remove(state)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.pkce_verifier))
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Instant::now();
        let before = tables.sessions.len() + tables.oauth_states.len();
        tables.sessions.retain(|_, entry| entry.expires_at > now);
        tables.oauth_states.retain(|_, entry| entry.expires_at > now);
        let after = tables.sessions.len() + tables.oauth_states.len();

        Ok((before - after) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::super::contract;
    use super::MemoryStore;

    #[tokio::test]
    async fn local_usernames_are_unique() {
        contract::local_usernames_are_unique(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn google_ids_are_unique() {
        contract::google_ids_are_unique(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn google_user_does_not_block_local_username() {
        contract::google_user_does_not_block_local_username(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let store = MemoryStore::new();
        contract::find_or_create_is_idempotent(&store).await;
        contract::concurrent_find_or_create_resolves_one_user(&store).await;
    }

    #[tokio::test]
    async fn secrets_are_listed_in_creation_order() {
        contract::secrets_are_listed_in_creation_order(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn save_missing_user_is_not_found() {
        contract::save_missing_user_is_not_found(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn sessions_expire_and_are_purged() {
        contract::sessions_expire_and_are_purged(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn oauth_state_is_single_use() {
        contract::oauth_state_is_single_use(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn ttl_beyond_one_year_is_rejected() {
        contract::ttl_beyond_one_year_is_rejected(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn full_contract_on_one_store() {
        contract::run(&MemoryStore::new()).await;
    }
}
