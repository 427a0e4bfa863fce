use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use log::debug;

use crate::protocol::clock::current_timestamp;
use crate::protocol::common::{AnnounceEvent, TransactionId};
use crate::tracker::peer::Peer;
use crate::tracker::statistics::TrackerStatisticsEvent;
use crate::tracker::Tracker;
use crate::udp::connection_cookie::{make_connection_id, verify_connection_id};
use crate::udp::error::ServerError;
use crate::udp::request::{AnnounceRequest, ConnectRequest, ParseRequestError, Request, ScrapeRequest};
use crate::udp::response::{
    AnnounceResponse, ConnectResponse, ErrorResponse, Response, ResponsePeer, ScrapeResponse, ScrapeResponseEntry,
};

/// Peers handed out per announce when the client asks for more, or for a
/// non-positive amount.
pub const MAX_RESPONSE_PEERS: usize = 30;

/// Handles one datagram and decides whether to answer at all.
///
/// `None` means silence: reserved source addresses, frames that do not
/// parse, and packets failing connection-id verification are dropped
/// without a reply so the tracker cannot be used as an amplification
/// oracle against spoofed sources.
pub async fn handle_packet(remote_addr: SocketAddr, payload: &[u8], tracker: &Arc<Tracker>) -> Option<Response> {
    // IPv4-only tracker
    let source_ip = match remote_addr.ip() {
        IpAddr::V4(ip) => ip,
        IpAddr::V6(_) => return None,
    };

    if !tracker.config.tracker.allow_iana_ips && is_iana_reserved(source_ip) {
        debug!("dropped request from IANA reserved address {}", source_ip);
        return None;
    }

    match Request::from_bytes(payload) {
        Ok(Request::Connect(connect_request)) => Some(handle_connect(remote_addr, &connect_request, tracker).await),
        Ok(Request::Announce(announce_request)) => {
            match handle_announce(remote_addr, &announce_request, tracker).await {
                Ok(response) => Some(response),
                Err(ServerError::InvalidConnectionId) => None,
                Err(e) => Some(handle_error(e, announce_request.transaction_id, tracker).await),
            }
        }
        Ok(Request::Scrape(scrape_request)) => match handle_scrape(remote_addr, &scrape_request, tracker).await {
            Ok(response) => Some(response),
            Err(ServerError::InvalidConnectionId) => None,
            Err(e) => Some(handle_error(e, scrape_request.transaction_id, tracker).await),
        },
        Err(ParseRequestError::UnknownAction { action, transaction_id }) => {
            debug!("unknown action {} from {}", action, remote_addr);
            Some(handle_error(ServerError::BadRequest, transaction_id, tracker).await)
        }
        Err(ParseRequestError::MalformedFrame) => {
            debug!("dropped malformed frame from {}", remote_addr);
            None
        }
    }
}

pub async fn handle_connect(remote_addr: SocketAddr, request: &ConnectRequest, tracker: &Arc<Tracker>) -> Response {
    let connection_id = make_connection_id(tracker.secret(), &remote_addr, current_timestamp());

    tracker.send_stats_event(TrackerStatisticsEvent::Udp4Connect).await;

    Response::from(ConnectResponse {
        transaction_id: request.transaction_id,
        connection_id,
    })
}

/// # Errors
///
/// `InvalidConnectionId` when the echoed token does not verify (the caller
/// drops the packet); a policy or admission error otherwise (the caller
/// answers with an error frame).
pub async fn handle_announce(
    remote_addr: SocketAddr,
    request: &AnnounceRequest,
    tracker: &Arc<Tracker>,
) -> Result<Response, ServerError> {
    verify_connection_id(request.connection_id, tracker.secret(), &remote_addr, current_timestamp())
        .map_err(|_| ServerError::InvalidConnectionId)?;

    // a non-zero ip field is a claim to announce on behalf of another
    // address and is only honored when remotes are allowed
    let peer_ip = match request.ip_address {
        Some(client_supplied_ip) => {
            if !tracker.config.tracker.allow_remotes {
                return Err(ServerError::RemoteAddressNotAllowed);
            }
            IpAddr::V4(client_supplied_ip)
        }
        None => remote_addr.ip(),
    };

    tracker.authenticate_request(&request.info_hash).await?;

    let peer = Peer::from_udp_announce_request(request, peer_ip);

    let swarm_stats = tracker
        .update_torrent_with_peer_and_get_stats(&request.info_hash, &peer)
        .await;

    let peers = if peer.event == AnnounceEvent::Stopped {
        // the peer is leaving, no need for a peer list
        vec![]
    } else {
        let max_peers = if request.peers_wanted.0 < 1 {
            MAX_RESPONSE_PEERS
        } else {
            std::cmp::min(MAX_RESPONSE_PEERS, request.peers_wanted.0 as usize)
        };

        tracker.get_torrent_peers(&request.info_hash, &peer.peer_addr, max_peers).await
    };

    tracker.send_stats_event(TrackerStatisticsEvent::Udp4Announce).await;

    Ok(Response::from(AnnounceResponse {
        transaction_id: request.transaction_id,
        interval: tracker.config.tracker.announce_interval,
        leechers: swarm_stats.leechers,
        seeders: swarm_stats.seeders,
        peers: peers
            .iter()
            .filter_map(|peer| match peer.peer_addr.ip() {
                IpAddr::V4(ip) => Some(ResponsePeer {
                    ip_address: ip,
                    port: peer.peer_addr.port(),
                }),
                IpAddr::V6(_) => None,
            })
            .collect(),
    }))
}

/// # Errors
///
/// `InvalidConnectionId` when the echoed token does not verify.
pub async fn handle_scrape(
    remote_addr: SocketAddr,
    request: &ScrapeRequest,
    tracker: &Arc<Tracker>,
) -> Result<Response, ServerError> {
    verify_connection_id(request.connection_id, tracker.secret(), &remote_addr, current_timestamp())
        .map_err(|_| ServerError::InvalidConnectionId)?;

    let mut torrent_stats: Vec<ScrapeResponseEntry> = Vec::with_capacity(request.info_hashes.len());

    for info_hash in &request.info_hashes {
        // unknown and disallowed info hashes scrape as zeroes, the whole
        // request never fails over one hash
        let entry = if tracker.is_info_hash_allowed(info_hash).await {
            let stats = tracker.get_swarm_stats(info_hash).await;
            ScrapeResponseEntry {
                seeders: stats.seeders,
                completed: stats.completed,
                leechers: stats.leechers,
            }
        } else {
            ScrapeResponseEntry {
                seeders: 0,
                completed: 0,
                leechers: 0,
            }
        };

        torrent_stats.push(entry);
    }

    tracker.send_stats_event(TrackerStatisticsEvent::Udp4Scrape).await;

    Ok(Response::from(ScrapeResponse {
        transaction_id: request.transaction_id,
        torrent_stats,
    }))
}

async fn handle_error(e: ServerError, transaction_id: TransactionId, tracker: &Arc<Tracker>) -> Response {
    tracker.send_stats_event(TrackerStatisticsEvent::Udp4Error).await;

    Response::from(ErrorResponse {
        transaction_id,
        message: e.to_string(),
    })
}

/// IANA reserved, loopback and multicast blocks: first octet 0, 10, 127,
/// or 224 and above. Refused unless `allow_iana_ips` is set.
fn is_iana_reserved(ip: Ipv4Addr) -> bool {
    let first_octet = ip.octets()[0];
    first_octet == 0 || first_octet == 10 || first_octet == 127 || first_octet >= 224
}
