//! Embedded static assets
//!
//! In development, falls back to serving from the `ui/` directory.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;
use std::path::PathBuf;

#[derive(Embed)]
#[folder = "ui"]
struct Assets;

/// Serve an embedded file, with filesystem fallback for development
pub async fn serve_static(Path(path): Path<String>) -> Response {
    let path = path.trim_start_matches('/');
    match load(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref().to_string())], content).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

fn load(path: &str) -> Option<Vec<u8>> {
    if let Some(content) = Assets::get(path) {
        return Some(content.data.into_owned());
    }

    if path.split('/').any(|segment| segment == "..") {
        return None;
    }
    std::fs::read(PathBuf::from("ui").join(path)).ok()
}
