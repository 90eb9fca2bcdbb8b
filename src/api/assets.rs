//! The single page served at `/`
//!
//! A thin observer of the session API: it renders snapshots and posts
//! user actions, nothing more.

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
