use serde::{Deserialize, Serialize};

use crate::protocol::info_hash::InfoHash;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct OkResource {
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OkResource {
    pub fn new(in_dynamic_mode: bool) -> Self {
        Self {
            result: "Okay".to_string(),
            note: in_dynamic_mode.then(|| "tracker is in dynamic mode.".to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorResource {
    pub error: String,
}

impl ErrorResource {
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

/// One swarm, as listed by `GET /api/torrents`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct TorrentResource {
    pub info_hash: InfoHash,
    pub completed: u32,
    pub seeders: u32,
    pub leechers: u32,
}

/// Swarm totals plus the packet counters, as served by `GET /api/stats`.
#[derive(Serialize, Deserialize, Debug)]
pub struct StatsResource {
    pub torrents: u64,
    pub seeders: u64,
    pub completed: u64,
    pub leechers: u64,
    pub udp4_connections_handled: u64,
    pub udp4_announces_handled: u64,
    pub udp4_scrapes_handled: u64,
    pub udp4_errors_handled: u64,
}
