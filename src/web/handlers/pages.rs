use axum::{extract::Extension, response::Html};
use std::sync::Arc;

use crate::web::{views, AppState};

pub async fn home() -> Html<String> {
    Html(views::home())
}

pub async fn register(state: Extension<Arc<AppState>>) -> Html<String> {
    Html(views::register(state.google_enabled()))
}

pub async fn login(state: Extension<Arc<AppState>>) -> Html<String> {
    Html(views::login(state.google_enabled(), None))
}
