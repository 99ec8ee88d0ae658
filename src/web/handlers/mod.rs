//! Route handlers and the response helpers they share.

pub mod google;
pub mod health;
pub mod login;
pub mod logout;
pub mod pages;
pub mod register;
pub mod secrets;


use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::error;

use super::{views, AppState};
use crate::auth::session;
use crate::store::User;

/// `303 See Other` to `location`.
pub(crate) fn redirect(location: &str) -> Response {
    Redirect::to(location).into_response()
}

/// Redirect and set (or clear) the session cookie on the way.
pub(crate) fn redirect_with_cookie(location: &str, cookie: HeaderValue) -> Response {
    let mut response = Redirect::to(location).into_response();
    response.headers_mut().insert(SET_COOKIE, cookie);
    response
}

pub(crate) fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(views::error_page(
            "The request could not be completed, please try again later.",
        )),
    )
        .into_response()
}

/// Establish a session for `user` and send the browser to `location`.
pub(crate) async fn sign_in(
    state: &AppState,
    headers: &HeaderMap,
    user: &User,
    location: &str,
) -> Response {
    match session::establish(state.sessions(), state.session_config(), headers, user).await {
        Ok(cookie) => redirect_with_cookie(location, cookie),
        Err(err) => {
            error!("Failed to establish session: {:#}", err);
            server_error()
        }
    }
}

/// The signed-in user, if any. Store failures become a ready-made 500 response.
pub(crate) async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<User>, Response> {
    session::current_user(state.sessions(), state.users(), headers)
        .await
        .map_err(|err| {
            error!("Failed to resolve session: {}", err);
            server_error()
        })
}
