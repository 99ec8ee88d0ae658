//! Cookie sessions.
//!
//! The browser only ever holds a random 32-byte token (base64url, no padding).
//! The session store keeps the SHA-256 of that token mapped to the user id, so
//! a leaked table cannot be replayed as cookies. On every request the cookie is
//! hashed, the session resolved to a user id, and the user loaded by id.

use anyhow::{Context, Result};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::{SessionStore, StoreError, User, UserStore};

pub const SESSION_COOKIE_NAME: &str = "secrets_session";

const DEFAULT_SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;
const OAUTH_STATE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Clone, Debug)]
pub struct SessionConfig {
    ttl: Duration,
    cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[must_use]
    pub fn oauth_state_ttl(&self) -> Duration {
        OAUTH_STATE_TTL
    }
}

/// Create a new session token for the cookie.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a session token; only the hash reaches the store.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Build the `HttpOnly` session cookie.
pub(crate) fn session_cookie(
    config: &SessionConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = config.ttl().as_secs();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &SessionConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

/// Start a session for `user` and return the `Set-Cookie` value.
///
/// Any session the request already carried is destroyed first, so a login
/// never inherits a pre-existing session id.
///
/// # Errors
/// Returns an error if the token cannot be generated or stored.
pub async fn establish(
    sessions: &dyn SessionStore,
    config: &SessionConfig,
    headers: &HeaderMap,
    user: &User,
) -> Result<HeaderValue> {
    if let Some(previous) = extract_session_token(headers) {
        sessions
            .delete_session(&hash_session_token(&previous))
            .await
            .context("failed to drop previous session")?;
    }

    // A collision on 256 random bits is not expected, but retry rather than fail.
    for _ in 0..3 {
        let token = generate_session_token()?;
        match sessions
            .insert_session(&hash_session_token(&token), user.id, config.ttl())
            .await
        {
            Ok(()) => {
                debug!(user_id = %user.id, "session established");
                return session_cookie(config, &token).context("failed to build session cookie");
            }
            Err(StoreError::Conflict) => continue,
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow::anyhow!("failed to allocate a unique session token"))
}

/// Resolve the request's session cookie to its user.
///
/// Returns `Ok(None)` when there is no cookie, the session is unknown or
/// expired, or the user it points at no longer exists.
///
/// # Errors
/// Returns the store error if a lookup fails.
pub async fn current_user(
    sessions: &dyn SessionStore,
    users: &dyn UserStore,
    headers: &HeaderMap,
) -> Result<Option<User>, StoreError> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    let Some(user_id) = sessions.lookup_session(&hash_session_token(&token)).await? else {
        return Ok(None);
    };
    let user = users.find_by_id(user_id).await?;
    if user.is_none() {
        warn!(%user_id, "session refers to a missing user");
    }
    Ok(user)
}

/// Forget the request's session and return the cookie that clears it.
///
/// # Errors
/// Returns the store error if the session cannot be deleted.
pub async fn destroy(
    sessions: &dyn SessionStore,
    config: &SessionConfig,
    headers: &HeaderMap,
) -> Result<Option<HeaderValue>, StoreError> {
    if let Some(token) = extract_session_token(headers) {
        sessions.delete_session(&hash_session_token(&token)).await?;
    }
    Ok(clear_session_cookie(config).ok())
}
