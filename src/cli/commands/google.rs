use clap::{Arg, Command};

pub const ARG_CLIENT_ID: &str = "google-client-id";
pub const ARG_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_REDIRECT_URL: &str = "google-redirect-url";

pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:3000/auth/google/secrets";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CLIENT_ID)
                .long(ARG_CLIENT_ID)
                .help("Google OAuth client id, Google sign-in is disabled when unset")
                .env("CLIENT_ID")
                .requires(ARG_CLIENT_SECRET),
        )
        .arg(
            Arg::new(ARG_CLIENT_SECRET)
                .long(ARG_CLIENT_SECRET)
                .help("Google OAuth client secret")
                .env("CLIENT_SECRET")
                .hide_env_values(true)
                .requires(ARG_CLIENT_ID),
        )
        .arg(
            Arg::new(ARG_REDIRECT_URL)
                .long(ARG_REDIRECT_URL)
                .help("OAuth callback URL registered with Google")
                .default_value(DEFAULT_REDIRECT_URL)
                .env("SECRETS_GOOGLE_REDIRECT_URL"),
        )
}
