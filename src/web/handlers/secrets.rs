use axum::{
    extract::{Extension, Form},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use super::{current_user, redirect, server_error};
use crate::store::StoreError;
use crate::web::{views, AppState};

#[derive(Deserialize)]
pub struct SecretForm {
    #[serde(default)]
    secret: String,
}

/// Every posted secret, visible to anyone.
#[instrument(skip_all)]
pub async fn secrets(state: Extension<Arc<AppState>>) -> Response {
    match state.users().find_with_secrets().await {
        Ok(users) => {
            Html(views::secrets(users.iter().filter_map(|u| u.secret.as_deref()))).into_response()
        }
        Err(err) => {
            error!("Failed to load secrets: {}", err);
            server_error()
        }
    }
}

#[instrument(skip_all)]
pub async fn submit_form(state: Extension<Arc<AppState>>, headers: HeaderMap) -> Response {
    match current_user(&state, &headers).await {
        Ok(Some(_)) => Html(views::submit()).into_response(),
        Ok(None) => redirect("/login"),
        Err(response) => response,
    }
}

#[instrument(skip_all)]
pub async fn submit(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<SecretForm>,
) -> Response {
    let mut user = match current_user(&state, &headers).await {
        Ok(Some(user)) => user,
        Ok(None) => return redirect("/login"),
        Err(response) => return response,
    };

    if form.secret.trim().is_empty() {
        warn!(user_id = %user.id, "Rejected blank secret");
        return redirect("/submit");
    }

    user.secret = Some(form.secret);

    match state.users().save(&user).await {
        Ok(()) => {
            debug!(user_id = %user.id, "secret saved");
            redirect("/secrets")
        }
        Err(StoreError::NotFound) => {
            warn!(user_id = %user.id, "User vanished before the secret was saved");
            redirect("/login")
        }
        Err(err) => {
            error!("Failed to save secret: {}", err);
            server_error()
        }
    }
}
