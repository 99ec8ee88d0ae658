//! User and session persistence.
//!
//! Handlers never talk to a database directly: they go through [`UserStore`]
//! and [`SessionStore`]. Two backends implement both traits:
//!
//! - [`PgStore`] keeps everything in PostgreSQL (`sql/schema.sql` is applied on
//!   connect, every statement is idempotent).
//! - [`MemoryStore`] keeps everything in process. It is used when no DSN is
//!   configured and by the test suite.
//!
//! Every operation touches a single record. Find-or-create is atomic in both
//! backends, and saving a user is last-write-wins.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[cfg(test)]
mod contract;
mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Longest lifetime a session or pending OAuth state can be stored with (one year).
pub const MAX_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("ttl of {0}s exceeds the {MAX_TTL_SECONDS}s limit")]
    TtlOutOfRange(u64),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A user record.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub secret: Option<String>,
}

impl User {
    /// Local accounts are the ones that can log in with a password.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Fields needed to insert a user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
}

impl NewUser {
    #[must_use]
    pub fn local(username: &str, password_hash: String) -> Self {
        Self {
            username: Some(username.to_string()),
            password_hash: Some(password_hash),
            google_id: None,
        }
    }

    #[must_use]
    pub fn google(google_id: &str, username: Option<&str>) -> Self {
        Self {
            username: username.map(str::to_string),
            password_hash: None,
            google_id: Some(google_id.to_string()),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Returns [`StoreError::Conflict`] when the local username
    /// or the google id is already taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Look up a local account (one with a password hash) by username.
    async fn find_local(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Every user whose secret is set, oldest first.
    async fn find_with_secrets(&self) -> Result<Vec<User>, StoreError>;

    /// Return the user linked to `google_id`, inserting it with `username` when
    /// absent. An existing record is returned untouched.
    async fn find_or_create_by_google_id(
        &self,
        google_id: &str,
        username: Option<&str>,
    ) -> Result<User, StoreError>;

    /// Persist the mutable fields of `user` (its secret).
    async fn save(&self, user: &User) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Release the underlying connections. Called once on shutdown.
    async fn close(&self);
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(
        &self,
        session_hash: &[u8],
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Resolve an unexpired session to its user id.
    async fn lookup_session(&self, session_hash: &[u8]) -> Result<Option<Uuid>, StoreError>;

    async fn delete_session(&self, session_hash: &[u8]) -> Result<(), StoreError>;

    async fn insert_oauth_state(
        &self,
        state: &str,
        pkce_verifier: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Consume a pending OAuth state, returning its PKCE verifier. A state can
    /// only be taken once and only before it expires.
    async fn take_oauth_state(&self, state: &str) -> Result<Option<String>, StoreError>;

    /// Drop expired sessions and OAuth states, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

/// Reject lifetimes longer than [`MAX_TTL_SECONDS`].
pub(crate) fn check_ttl(ttl: Duration) -> Result<Duration, StoreError> {
    if ttl.as_secs() > MAX_TTL_SECONDS {
        return Err(StoreError::TtlOutOfRange(ttl.as_secs()));
    }
    Ok(ttl)
}

/// Split a SQL script into statements terminated by `;`.
pub(crate) fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}
