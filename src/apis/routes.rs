use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::apis::{handlers, middlewares};
use crate::tracker::Tracker;

pub fn router(tracker: Arc<Tracker>) -> Router {
    let api_routes = Router::new()
        .route(
            "/torrents",
            get(handlers::get_torrents_handler)
                .post(handlers::add_torrent_handler)
                .delete(handlers::remove_torrent_handler),
        )
        .route("/stats", get(handlers::get_stats_handler))
        .layer(middleware::from_fn(middlewares::auth::require_loopback));

    Router::new()
        .route("/", get(handlers::get_home_handler))
        .route("/announce", get(handlers::get_announce_notice_handler))
        .nest("/api", api_routes)
        .with_state(tracker)
}
