use crate::{
    auth::{GoogleConfig, SessionConfig},
    web,
};
use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
    pub public_dir: PathBuf,
    pub google: Option<GoogleConfig>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be reached or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let session = SessionConfig::new()
        .with_ttl_seconds(args.session_ttl_seconds)
        .with_cookie_secure(args.cookie_secure);

    web::new(web::ServerConfig {
        port: args.port,
        dsn: args.dsn,
        session,
        google: args.google,
        public_dir: args.public_dir,
    })
    .await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "dsn",
            args.dsn
                .as_deref()
                .map_or_else(|| "none (in-memory)".to_string(), redact_dsn),
        ),
        ("session_ttl", format!("{}s", args.session_ttl_seconds)),
        ("cookie_secure", args.cookie_secure.to_string()),
        ("public_dir", args.public_dir.display().to_string()),
        (
            "google_client_id",
            args.google
                .as_ref()
                .map_or_else(|| "n/a".to_string(), |g| g.client_id.clone()),
        ),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
