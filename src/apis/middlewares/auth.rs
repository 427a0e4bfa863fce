use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::apis::resources::ErrorResource;

/// Only the local operator may mutate the tracker: anything not arriving
/// over loopback is refused.
pub async fn require_loopback<B>(request: Request<B>, next: Next<B>) -> Response {
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(remote_addr)) if remote_addr.ip().is_loopback() => next.run(request).await,
        _ => (StatusCode::FORBIDDEN, Json(ErrorResource::new("Access Denied"))).into_response(),
    }
}
