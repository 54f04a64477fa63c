//! Request front end.
//!
//! Axum server that serves the site pages and static files, and hands every
//! POST body to the relay untouched.
//!
//! Architecture: one fallback handler dispatches on method and delegates to
//! inner functions (`serve_inner`, `submit_inner`) that are testable without
//! axum dispatch machinery.
//!
//! Surface:
//! - GET  /          — index page
//! - GET  /message   — message form page
//! - GET  /<path>    — file under the static root, or the 404 page
//! - POST /<any>     — relay body, 302 to /

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use formrelay_core::config::HttpConfig;
use formrelay_core::RelaySender;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::router::{route, Page, Route};

/// Served when `404.html` itself cannot be read.
pub const FALLBACK_NOT_FOUND: &str =
    "<!DOCTYPE html><html><head><title>404</title></head><body><h1>404 Not Found</h1></body></html>";

const DEFAULT_CONTENT_TYPE: &str = "text/plain";
const HTML_CONTENT_TYPE: &str = "text/html";

/// Shared state for the front end. Read-only after startup.
#[derive(Clone)]
pub struct HttpState {
    pub config: HttpConfig,
    pub relay: Arc<dyn RelaySender>,
}

pub fn build_router(state: Arc<HttpState>) -> Router {
    let body_limit = state.config.body_limit;
    Router::new()
        .fallback(dispatch_handler)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    config: HttpConfig,
    relay: Arc<dyn RelaySender>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = listener.local_addr()?;
    let state = Arc::new(HttpState { config, relay });
    let app = build_router(state);
    tracing::info!("Server started on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

// ============================================================================
// Responses
// ============================================================================

/// Status, content type and body of a GET response.
#[derive(Debug, Clone)]
pub struct StaticReply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl IntoResponse for StaticReply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}

/// Content type from the file extension, `text/plain` when unknown.
pub fn content_type_for(path: &Path) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

/// Resolve a GET path to a page, a file, or the not-found page.
pub async fn serve_inner(static_root: &Path, path: &str) -> StaticReply {
    match route(path) {
        Route::Page(page) => match read_page(static_root, page).await {
            Some(body) => StaticReply {
                status: StatusCode::OK,
                content_type: HTML_CONTENT_TYPE,
                body,
            },
            None => not_found(static_root).await,
        },
        Route::File(relative) => match tokio::fs::read(static_root.join(&relative)).await {
            Ok(body) => StaticReply {
                status: StatusCode::OK,
                content_type: content_type_for(&relative),
                body: Bytes::from(body),
            },
            Err(e) => {
                tracing::debug!(path, error = %e, "Static file unavailable");
                not_found(static_root).await
            }
        },
        Route::NotFound => not_found(static_root).await,
    }
}

/// Forward the raw body and redirect home. The relay outcome never changes
/// the response.
pub async fn submit_inner(relay: &dyn RelaySender, body: Bytes) -> Response {
    let size = body.len();
    match relay.send(body).await {
        Ok(()) => tracing::debug!(size, "Relayed submission"),
        Err(e) => tracing::warn!(size, error = %e, "Failed to relay submission"),
    }

    redirect_home()
}

/// A body that could not be read (e.g. over `body_limit`) is not relayed, but
/// the client gets the same redirect as any other submission.
fn reject_submission(rejection: &BytesRejection) -> Response {
    tracing::warn!(error = %rejection, "Submission body unreadable, not relayed");
    redirect_home()
}

fn redirect_home() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response()
}

async fn read_page(static_root: &Path, page: Page) -> Option<Bytes> {
    match tokio::fs::read(static_root.join(page.file_name())).await {
        Ok(body) => Some(Bytes::from(body)),
        Err(e) => {
            tracing::error!(page = page.file_name(), error = %e, "Failed to read page");
            None
        }
    }
}

async fn not_found(static_root: &Path) -> StaticReply {
    let body = read_page(static_root, Page::NotFound)
        .await
        .unwrap_or_else(|| Bytes::from_static(FALLBACK_NOT_FOUND.as_bytes()));
    StaticReply {
        status: StatusCode::NOT_FOUND,
        content_type: HTML_CONTENT_TYPE,
        body,
    }
}

// ============================================================================
// Axum handler wrapper (thin — delegates to inner functions)
// ============================================================================

pub async fn dispatch_handler(
    State(state): State<Arc<HttpState>>,
    method: Method,
    uri: Uri,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match method {
        Method::GET | Method::HEAD => serve_inner(&state.config.static_root, uri.path())
            .await
            .into_response(),
        Method::POST => match body {
            Ok(body) => submit_inner(state.relay.as_ref(), body).await,
            Err(rejection) => reject_submission(&rejection),
        },
        _ => (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, HEAD, POST")],
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn static_root() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../static"))
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(content_type_for(Path::new("style.css")), "text/css");
        assert_eq!(content_type_for(Path::new("logo.png")), "image/png");
        assert_eq!(content_type_for(Path::new("README")), "text/plain");
    }

    #[tokio::test]
    async fn test_serve_inner_index_page() {
        let reply = serve_inner(&static_root(), "/").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.content_type, "text/html");
        assert!(!reply.body.is_empty());
    }

    #[tokio::test]
    async fn test_serve_inner_directory_is_not_found() {
        let reply = serve_inner(&static_root(), "/img").await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_not_found_without_404_page_uses_fallback() {
        let reply = serve_inner(Path::new("/nonexistent-formrelay-root"), "/missing").await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.content_type, "text/html");
        assert_eq!(&reply.body[..], FALLBACK_NOT_FOUND.as_bytes());
    }
}
