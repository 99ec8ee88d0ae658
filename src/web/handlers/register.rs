use axum::{
    extract::{Extension, Form},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument, warn};

use super::{redirect, server_error, sign_in};
use crate::auth::{AuthError, LocalCredentials};
use crate::web::AppState;

#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[instrument(skip_all)]
pub async fn register(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> Response {
    let credentials = LocalCredentials {
        username: form.username,
        password: form.password,
    };

    let user = match state.local().register(credentials).await {
        Ok(user) => user,
        Err(AuthError::InvalidInput(field)) => {
            warn!(field, "Registration rejected: invalid input");
            return redirect("/register");
        }
        Err(AuthError::UsernameTaken) => {
            warn!("Registration rejected: username already taken");
            return redirect("/register");
        }
        Err(err) => {
            error!("Failed to register user: {}", err);
            return server_error();
        }
    };

    sign_in(&state, &headers, &user, "/secrets").await
}
