//! # Secrets
//!
//! A small web application where people post one anonymous secret and read
//! everyone else's.
//!
//! ## Accounts
//!
//! Users sign up with a username and password (stored as an Argon2id hash) or
//! sign in with Google. Google users are matched by their Google id, never by
//! name, so a Google user named "alice" and a local "alice" are different
//! accounts.
//!
//! ## Sessions
//!
//! The browser holds an opaque random token in an `HttpOnly` cookie; the server
//! stores only its SHA-256 and the user id. Sessions expire after a configurable
//! TTL and are purged periodically.
//!
//! ## Secrets
//!
//! Each user has at most one secret; submitting again replaces it. The list of
//! secrets is public and never shows who wrote what.
//!
//! ## Storage
//!
//! PostgreSQL when a DSN is configured, otherwise an in-process store that is
//! lost on restart.

pub mod auth;
pub mod cli;
pub mod store;
pub mod web;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
