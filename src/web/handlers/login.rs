use axum::{
    extract::{Extension, Form},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument, warn};

use super::{server_error, sign_in};
use crate::auth::{AuthError, LocalCredentials, Strategy};
use crate::web::{views, AppState};

const LOGIN_FAILED: &str = "Invalid username or password.";

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[instrument(skip_all)]
pub async fn login(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let credentials = LocalCredentials {
        username: form.username,
        password: form.password,
    };

    match state.local().authenticate(credentials).await {
        Ok(user) => sign_in(&state, &headers, &user, "/secrets").await,
        Err(AuthError::InvalidCredentials) => {
            warn!("Login failed: invalid credentials");
            (
                StatusCode::UNAUTHORIZED,
                Html(views::login(state.google_enabled(), Some(LOGIN_FAILED))),
            )
                .into_response()
        }
        Err(err) => {
            error!("Failed to authenticate user: {}", err);
            server_error()
        }
    }
}
