//! HTTP surface: router, shared state and server lifecycle.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Extension, Router,
};
use std::{path::Path, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer,
    services::{ServeDir, ServeFile},
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, error, info, info_span, warn, Span};
use ulid::Ulid;

use crate::auth::{
    DelegatedStrategy, GoogleConfig, GoogleProvider, IdentityProvider, LocalStrategy,
    SessionConfig,
};
use crate::store::{MemoryStore, PgStore, SessionStore, UserStore};

pub(crate) mod handlers;
mod views;

use handlers::{google, health, login, logout, pages, register, secrets};

const REAPER_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Everything a handler needs, shared behind an `Arc`.
pub struct AppState {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    session_config: SessionConfig,
    local: LocalStrategy,
    google: Option<DelegatedStrategy>,
}

impl AppState {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            local: LocalStrategy::new(users.clone()),
            users,
            sessions,
            session_config,
            google: None,
        }
    }

    /// Enable sign-in through `provider`.
    #[must_use]
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.google = Some(DelegatedStrategy::new(provider, self.users.clone()));
        self
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    #[must_use]
    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    #[must_use]
    pub fn local(&self) -> &LocalStrategy {
        &self.local
    }

    #[must_use]
    pub fn google(&self) -> Option<&DelegatedStrategy> {
        self.google.as_ref()
    }

    #[must_use]
    pub fn google_enabled(&self) -> bool {
        self.google.is_some()
    }
}

/// Build the application router.
#[must_use]
pub fn router(state: Arc<AppState>, public_dir: &Path) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/register", get(pages::register).post(register::register))
        .route("/login", get(pages::login).post(login::login))
        .route("/secrets", get(secrets::secrets))
        .route("/submit", get(secrets::submit_form).post(secrets::submit))
        .route("/logout", get(logout::logout))
        .route("/auth/google", get(google::authorize))
        .route("/auth/google/secrets", get(google::callback))
        .route("/health", get(health::health).options(health::health))
        .nest_service("/css", ServeDir::new(public_dir.join("css")))
        .route_service("/favicon.ico", ServeFile::new(public_dir.join("favicon.ico")))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Server settings collected by the CLI.
#[derive(Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub dsn: Option<String>,
    pub session: SessionConfig,
    pub google: Option<GoogleConfig>,
    pub public_dir: std::path::PathBuf,
}

/// Start the server
/// # Errors
/// Return error if the store cannot be reached or the listener cannot bind
pub async fn new(config: ServerConfig) -> Result<()> {
    let (users, sessions): (Arc<dyn UserStore>, Arc<dyn SessionStore>) = match &config.dsn {
        Some(dsn) => {
            let store = Arc::new(PgStore::connect(dsn).await?);
            (store.clone(), store)
        }
        None => {
            warn!("No DSN configured, users and sessions are kept in memory");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        }
    };

    let mut state = AppState::new(users.clone(), sessions.clone(), config.session);
    match &config.google {
        Some(google) => {
            let provider =
                GoogleProvider::new(google).context("Failed to configure Google sign-in")?;
            state = state.with_identity_provider(Arc::new(provider));
            debug!("Google sign-in enabled");
        }
        None => warn!("Google client id/secret not set, Google sign-in is disabled"),
    }

    let reaper = spawn_session_reaper(sessions, REAPER_INTERVAL);

    let app = router(Arc::new(state), &config.public_dir);

    let listener = TcpListener::bind(format!("::0:{}", config.port)).await?;

    info!("Listening on [::]:{}", config.port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.abort();
    users.close().await;

    info!("Gracefully shutdown");

    Ok(())
}

/// Periodically drop expired sessions and OAuth states.
fn spawn_session_reaper(
    sessions: Arc<dyn SessionStore>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "purged expired sessions"),
                Err(err) => error!("Failed to purge expired sessions: {}", err),
            }
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
