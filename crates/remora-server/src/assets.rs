//! Viewer page and static files.

use std::path::Path;

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use remora_core::constants::LIVE_VIEW_FILE;
use tower_http::services::ServeDir;
use tracing::debug;

use crate::errors::ApiError;
use crate::server::AppState;
use crate::snapshot::NO_CACHE_HEADERS;

/// Viewer page used when the asset directory has no `index.html`.
pub const BUNDLED_INDEX: &str = include_str!("../assets/index.html");

/// Routes for `/` and the polled frame.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route(&format!("/{LIVE_VIEW_FILE}"), get(live_view_handler))
}

/// Plain file serving for every other path; 404 on a miss.
pub fn files(asset_dir: &Path) -> ServeDir {
    ServeDir::new(asset_dir)
}

/// GET /: the asset directory's `index.html`, or the bundled viewer.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let path = state.config.asset_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page),
        Err(error) => {
            debug!(path = %path.display(), %error, "serving bundled viewer");
            Html(BUNDLED_INDEX.to_owned())
        }
    }
}

/// GET /live_view.jpg, never cached.
async fn live_view_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let path = state.config.asset_dir.join(LIVE_VIEW_FILE);
    let data = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound("no live view yet"))?;
    Ok((NO_CACHE_HEADERS, [(header::CONTENT_TYPE, "image/jpeg")], data).into_response())
}
