use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Deserialize;

use crate::apis::resources::{ErrorResource, OkResource, StatsResource, TorrentResource};
use crate::protocol::info_hash::InfoHash;
use crate::tracker::Tracker;

const HOME_PAGE: &str = "<html>\
    <head><title>udpt tracker</title></head>\
    <body>\
    <h2>udpt tracker</h2>\
    <p>This server is running <code>udpt</code>, a BitTorrent tracker based on the UDP protocol.</p>\
    </body>\
    </html>";

/// The body HTTP-tracker clients get when they try to announce here: a
/// bencoded failure reason pointing them at the UDP protocol.
const ANNOUNCE_PAGE: &str = "d14:failure reason41:udpt: This is a udp tracker, not HTTP(s).e";

pub async fn get_home_handler() -> impl IntoResponse {
    Html(HOME_PAGE)
}

pub async fn get_announce_notice_handler() -> impl IntoResponse {
    ANNOUNCE_PAGE
}

#[derive(Deserialize, Debug)]
pub struct InfoHashParam {
    pub info_hash: Option<String>,
}

pub async fn add_torrent_handler(State(tracker): State<Arc<Tracker>>, Query(params): Query<InfoHashParam>) -> Response {
    let info_hash = match parse_info_hash_param(&params) {
        Ok(info_hash) => info_hash,
        Err(response) => return response,
    };

    match tracker.add_torrent_to_whitelist(&info_hash).await {
        Ok(()) => ok_response(&tracker),
        Err(e) => {
            error!("api: failed to add torrent {}: {}", info_hash, e);
            internal_server_error("Failed to add torrent.")
        }
    }
}

pub async fn remove_torrent_handler(State(tracker): State<Arc<Tracker>>, Query(params): Query<InfoHashParam>) -> Response {
    let info_hash = match parse_info_hash_param(&params) {
        Ok(info_hash) => info_hash,
        Err(response) => return response,
    };

    match tracker.remove_torrent_from_whitelist(&info_hash).await {
        Ok(()) => ok_response(&tracker),
        Err(e) => {
            error!("api: failed to remove torrent {}: {}", info_hash, e);
            internal_server_error("Failed to remove torrent.")
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct PaginationParams {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn get_torrents_handler(
    State(tracker): State<Arc<Tracker>>,
    Query(params): Query<PaginationParams>,
) -> Json<Vec<TorrentResource>> {
    let offset = params.offset.unwrap_or(0);
    let limit = std::cmp::min(params.limit.unwrap_or(1000), 4000);

    let db = tracker.get_torrents().await;

    let torrents = db
        .iter()
        .skip(offset as usize)
        .take(limit as usize)
        .map(|(info_hash, entry)| {
            let stats = entry.get_stats();
            TorrentResource {
                info_hash: *info_hash,
                completed: stats.completed,
                seeders: stats.seeders,
                leechers: stats.leechers,
            }
        })
        .collect();

    Json(torrents)
}

pub async fn get_stats_handler(State(tracker): State<Arc<Tracker>>) -> Json<StatsResource> {
    let metrics = tracker.get_torrents_metrics().await;
    let stats = tracker.get_stats().await;

    Json(StatsResource {
        torrents: metrics.torrents,
        seeders: metrics.seeders,
        completed: metrics.completed,
        leechers: metrics.leechers,
        udp4_connections_handled: stats.udp4_connections_handled,
        udp4_announces_handled: stats.udp4_announces_handled,
        udp4_scrapes_handled: stats.udp4_scrapes_handled,
        udp4_errors_handled: stats.udp4_errors_handled,
    })
}

fn parse_info_hash_param(params: &InfoHashParam) -> Result<InfoHash, Response> {
    let value = params
        .info_hash
        .as_ref()
        .ok_or_else(|| bad_request("exactly one info_hash argument is required."))?;

    if value.len() != 40 {
        return Err(bad_request("info_hash length is incorrect."));
    }

    InfoHash::from_str(value).map_err(|_| bad_request("info_hash is not a hexadecimal string."))
}

fn ok_response(tracker: &Arc<Tracker>) -> Response {
    (StatusCode::OK, Json(OkResource::new(tracker.is_dynamic()))).into_response()
}

fn bad_request(reason: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResource::new(reason))).into_response()
}

fn internal_server_error(reason: &str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResource::new(reason))).into_response()
}
