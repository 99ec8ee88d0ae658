use crate::auth::GoogleConfig;
use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{google, DEFAULT_PORT};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .unwrap_or(DEFAULT_PORT);
    let dsn = matches
        .get_one::<String>("dsn")
        .map(|dsn| dsn.trim().to_string())
        .filter(|dsn| !dsn.is_empty());
    let session_ttl_seconds = matches
        .get_one::<u64>("session-ttl")
        .copied()
        .context("missing argument: --session-ttl")?;
    let cookie_secure = matches.get_flag("cookie-secure");
    let public_dir = matches
        .get_one::<PathBuf>("public-dir")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("public"));

    Ok(Action::Server(Args {
        port,
        dsn,
        session_ttl_seconds,
        cookie_secure,
        public_dir,
        google: google_config(matches)?,
    }))
}

/// Google sign-in is configured only when both client id and secret are set.
fn google_config(matches: &clap::ArgMatches) -> Result<Option<GoogleConfig>> {
    let client_id = matches
        .get_one::<String>(google::ARG_CLIENT_ID)
        .filter(|id| !id.trim().is_empty());
    let client_secret = matches
        .get_one::<String>(google::ARG_CLIENT_SECRET)
        .filter(|secret| !secret.is_empty());

    let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
        return Ok(None);
    };

    let redirect_url = matches
        .get_one::<String>(google::ARG_REDIRECT_URL)
        .cloned()
        .context("missing argument: --google-redirect-url")?;

    Ok(Some(GoogleConfig {
        client_id: client_id.trim().to_string(),
        client_secret: SecretString::from(client_secret.clone()),
        redirect_url,
    }))
}
