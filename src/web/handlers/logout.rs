use axum::{extract::Extension, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::{error, instrument};

use super::{redirect, redirect_with_cookie, server_error};
use crate::auth::session;
use crate::web::AppState;

#[instrument(skip_all)]
pub async fn logout(state: Extension<Arc<AppState>>, headers: HeaderMap) -> Response {
    match session::destroy(state.sessions(), state.session_config(), &headers).await {
        Ok(Some(cookie)) => redirect_with_cookie("/", cookie),
        Ok(None) => redirect("/"),
        Err(err) => {
            error!("Failed to destroy session: {}", err);
            server_error()
        }
    }
}
