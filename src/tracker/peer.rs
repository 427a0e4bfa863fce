use std::net::{IpAddr, SocketAddr};

use crate::protocol::clock::{current_timestamp, UnixTime};
use crate::protocol::common::{AnnounceEvent, NumberOfBytes, PeerId};
use crate::udp::request::AnnounceRequest;

/// A peer active in one swarm. Within a swarm the endpoint `peer_addr` is
/// the peer's identity; the peer id only distinguishes multiple clients
/// announcing from the same endpoint over time.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Peer {
    pub peer_id: PeerId,
    pub peer_addr: SocketAddr,
    pub updated: UnixTime,
    pub uploaded: NumberOfBytes,
    pub downloaded: NumberOfBytes,
    pub left: NumberOfBytes,
    pub event: AnnounceEvent,
}

impl Peer {
    /// Builds the peer record for an announce. `peer_ip` is the address the
    /// dispatcher resolved for this peer (the datagram source, or the
    /// client-supplied address when remotes are trusted).
    pub fn from_udp_announce_request(announce_request: &AnnounceRequest, peer_ip: IpAddr) -> Self {
        Peer {
            peer_id: announce_request.peer_id,
            peer_addr: SocketAddr::new(peer_ip, announce_request.port.0),
            updated: current_timestamp(),
            uploaded: announce_request.bytes_uploaded,
            downloaded: announce_request.bytes_downloaded,
            left: announce_request.bytes_left,
            event: announce_request.event,
        }
    }

    pub fn is_seeder(&self) -> bool {
        self.left.0 <= 0 && self.event != AnnounceEvent::Stopped
    }

    pub fn is_completed(&self) -> bool {
        self.event == AnnounceEvent::Completed
    }
}
