//! Authentication strategies and session handling.
//!
//! Both ways of signing in implement [`Strategy`]: given some credential input
//! they resolve to a [`User`] or fail with an [`AuthError`].
//!
//! - [`LocalStrategy`]: username + password, verified against an Argon2id hash.
//! - [`DelegatedStrategy`]: OAuth2 authorization code (with PKCE) exchanged by an
//!   [`IdentityProvider`], then find-or-create by the provider's user id.
//!
//! Once a principal is known, [`session`] stores only its user id server side
//! and hands the browser an opaque cookie token.

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::store::{StoreError, User};

mod google;
mod local;
mod password;
pub mod session;

pub use google::{
    AuthorizationCallback, AuthorizationRequest, DelegatedStrategy, GoogleConfig, GoogleProvider,
    IdentityProvider, ProviderProfile,
};
pub use local::{LocalCredentials, LocalStrategy};
pub use password::{hash_password, spawn_hash_password, spawn_verify_password, verify_password};
pub use session::SessionConfig;

const MAX_USERNAME_LEN: usize = 254;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("username already taken")]
    UsernameTaken,
    #[error("identity provider error: {0}")]
    Provider(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Common contract of the sign-in strategies.
#[async_trait]
pub trait Strategy: Send + Sync {
    type Credentials: Send + 'static;

    /// Resolve `credentials` to a principal.
    async fn authenticate(&self, credentials: Self::Credentials) -> Result<User, AuthError>;
}

/// Normalize a submitted username.
pub(crate) fn normalize_username(username: &str) -> String {
    username.trim().to_string()
}

/// Usernames are non-empty, whitespace free, and at most 254 characters.
pub(crate) fn valid_username(username: &str) -> bool {
    username.chars().count() <= MAX_USERNAME_LEN
        && Regex::new(r"^\S+$").is_ok_and(|regex| regex.is_match(username))
}
