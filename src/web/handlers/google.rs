use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument, warn};

use super::{redirect, server_error, sign_in};
use crate::auth::{AuthorizationCallback, Strategy};
use crate::web::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Send the browser to the provider's consent page.
#[instrument(skip_all)]
pub async fn authorize(state: Extension<Arc<AppState>>) -> Response {
    let Some(google) = state.google() else {
        warn!("Google sign-in requested but not configured");
        return redirect("/login");
    };

    let request = google.authorization_request();

    if let Err(err) = state
        .sessions()
        .insert_oauth_state(
            &request.state,
            &request.pkce_verifier,
            state.session_config().oauth_state_ttl(),
        )
        .await
    {
        error!("Failed to store OAuth state: {}", err);
        return server_error();
    }

    redirect(&request.url)
}

/// Provider callback: consume the state, exchange the code, sign the user in.
#[instrument(skip_all)]
pub async fn callback(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(google) = state.google() else {
        warn!("Google callback received but sign-in is not configured");
        return redirect("/login");
    };

    if let Some(err) = query.error.as_deref() {
        warn!(error = err, "Google sign-in was not granted");
        return redirect("/login");
    }

    let (Some(code), Some(csrf_state)) = (query.code, query.state) else {
        warn!("Google callback without code or state");
        return redirect("/login");
    };

    let pkce_verifier = match state.sessions().take_oauth_state(&csrf_state).await {
        Ok(Some(verifier)) => verifier,
        Ok(None) => {
            warn!("Google callback with unknown or expired state");
            return redirect("/login");
        }
        Err(err) => {
            error!("Failed to load OAuth state: {}", err);
            return server_error();
        }
    };

    let callback = AuthorizationCallback {
        code,
        pkce_verifier,
    };

    match google.authenticate(callback).await {
        Ok(user) => sign_in(&state, &headers, &user, "/secrets").await,
        Err(err) => {
            warn!("Google sign-in failed: {}", err);
            redirect("/login")
        }
    }
}
