//! CORS relay for browser-hosted callers.
//!
//! Browsers cannot probe stream servers cross-origin, so the resolver's
//! `relay_prefix` points here instead: `GET /fetch?url=<target>` forwards
//! the request and hands the body back with permissive CORS headers. The
//! relay is deliberately dumb — status and text pass through unchanged, and
//! the resolver behaves identically whether or not it is in the path.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

const RELAY_HOST: &str = "127.0.0.1";
const RELAY_PORT: u16 = 8991;
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
struct RelayState {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FetchParams {
    url: String,
}

/// Only plain http(s) targets are relayed; anything else (file URLs, bare
/// hosts, scheme-relative tricks) is refused up front.
fn is_relayable(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

async fn fetch(State(state): State<RelayState>, Query(params): Query<FetchParams>) -> Response {
    if !is_relayable(&params.url) {
        warn!("relay: refused non-http target {}", params.url);
        return (StatusCode::BAD_REQUEST, "only http(s) targets are relayed").into_response();
    }

    let upstream = match state.client.get(&params.url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!("relay: upstream fetch failed for {}: {}", params.url, e);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/plain")
        .to_string();

    match upstream.text().await {
        Ok(body) => (status, [(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            warn!("relay: failed to read upstream body for {}: {}", params.url, e);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter.as_str())
        .init();

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .expect("failed to build reqwest client for relay");

    let app = Router::new()
        .route("/fetch", get(fetch))
        .layer(CorsLayer::permissive())
        .with_state(RelayState { client });

    let addr = format!("{}:{}", RELAY_HOST, RELAY_PORT);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind relay on {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("CORS relay listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_relayable() {
        assert!(is_relayable("http://host/7.html"));
        assert!(is_relayable("https://host/status.xsl"));
        assert!(!is_relayable("file:///etc/passwd"));
        assert!(!is_relayable("//host/7.html"));
        assert!(!is_relayable("ftp://host/x"));
    }
}
