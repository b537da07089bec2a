//! Plain-HTTP to HTTPS redirect server
//!
//! Answers every request with a temporary redirect to the same host and path
//! over HTTPS.

use axum::response::{IntoResponse, Response};
use axum::Router;
use http::{header, HeaderMap, StatusCode, Uri};
use log::{debug, info};
use tokio::net::TcpListener;

use crate::common::{ProxyError, Result};

/// Router that redirects every request to HTTPS
pub fn redirect_router() -> Router {
    Router::new().fallback(redirect_to_https)
}

async fn redirect_to_https(headers: HeaderMap, uri: Uri) -> Response {
    let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, "missing Host header").into_response();
    };

    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let location = format!("https://{}{}", host, path);
    debug!("Redirecting http://{}{} to {}", host, path, location);

    (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response()
}

/// Serve redirects on `listener` until the server fails
pub async fn serve_redirect(listener: TcpListener) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Redirect server listening on {}", addr);
    }

    axum::serve(listener, redirect_router())
        .await
        .map_err(|e| ProxyError::Other(format!("redirect server failed: {}", e)))
}
