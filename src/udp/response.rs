use std::io::{self, Write};
use std::net::Ipv4Addr;

use byteorder::{NetworkEndian, WriteBytesExt};

use crate::protocol::common::{ConnectionId, TransactionId, MAX_PACKET_SIZE};

/// How many 6-byte peer entries fit into a response datagram after the
/// 20-byte announce header.
pub const MAX_ANNOUNCE_RESPONSE_PEERS: usize = (MAX_PACKET_SIZE - 20) / 6;

/// Error frames above this size are a programming error on the tracker side
/// and are refused by the encoder.
pub const MAX_ERROR_RESPONSE_SIZE: usize = 1024;

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Response {
    Connect(ConnectResponse),
    Announce(AnnounceResponse),
    Scrape(ScrapeResponse),
    Error(ErrorResponse),
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ConnectResponse {
    pub transaction_id: TransactionId,
    pub connection_id: ConnectionId,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ResponsePeer {
    pub ip_address: Ipv4Addr,
    pub port: u16,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AnnounceResponse {
    pub transaction_id: TransactionId,
    pub interval: u32,
    pub leechers: u32,
    pub seeders: u32,
    pub peers: Vec<ResponsePeer>,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ScrapeResponseEntry {
    pub seeders: u32,
    pub completed: u32,
    pub leechers: u32,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ScrapeResponse {
    pub transaction_id: TransactionId,
    pub torrent_stats: Vec<ScrapeResponseEntry>,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ErrorResponse {
    pub transaction_id: TransactionId,
    pub message: String,
}

impl From<ConnectResponse> for Response {
    fn from(r: ConnectResponse) -> Self {
        Self::Connect(r)
    }
}

impl From<AnnounceResponse> for Response {
    fn from(r: AnnounceResponse) -> Self {
        Self::Announce(r)
    }
}

impl From<ScrapeResponse> for Response {
    fn from(r: ScrapeResponse) -> Self {
        Self::Scrape(r)
    }
}

impl From<ErrorResponse> for Response {
    fn from(r: ErrorResponse) -> Self {
        Self::Error(r)
    }
}

impl Response {
    /// Serializes the response in network byte order.
    ///
    /// Announce responses never truncate a peer entry: peers beyond the
    /// datagram ceiling are simply not written. Error responses that would
    /// exceed [`MAX_ERROR_RESPONSE_SIZE`] fail, and the caller is expected
    /// to drop the packet.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` when the underlying writer fails or the frame
    /// violates its size bound.
    pub fn write_to_bytes(&self, bytes: &mut impl Write) -> Result<(), io::Error> {
        match self {
            Response::Connect(r) => {
                bytes.write_i32::<NetworkEndian>(0)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;
                bytes.write_i64::<NetworkEndian>(r.connection_id.0)?;
            }
            Response::Announce(r) => {
                bytes.write_i32::<NetworkEndian>(1)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;
                bytes.write_u32::<NetworkEndian>(r.interval)?;
                bytes.write_u32::<NetworkEndian>(r.leechers)?;
                bytes.write_u32::<NetworkEndian>(r.seeders)?;

                for peer in r.peers.iter().take(MAX_ANNOUNCE_RESPONSE_PEERS) {
                    bytes.write_all(&peer.ip_address.octets())?;
                    bytes.write_u16::<NetworkEndian>(peer.port)?;
                }
            }
            Response::Scrape(r) => {
                bytes.write_i32::<NetworkEndian>(2)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;

                for torrent_stat in &r.torrent_stats {
                    bytes.write_u32::<NetworkEndian>(torrent_stat.seeders)?;
                    bytes.write_u32::<NetworkEndian>(torrent_stat.completed)?;
                    bytes.write_u32::<NetworkEndian>(torrent_stat.leechers)?;
                }
            }
            Response::Error(r) => {
                if 8 + r.message.len() > MAX_ERROR_RESPONSE_SIZE {
                    return Err(io::Error::new(io::ErrorKind::InvalidInput, "error message too long"));
                }

                bytes.write_i32::<NetworkEndian>(3)?;
                bytes.write_i32::<NetworkEndian>(r.transaction_id.0)?;
                bytes.write_all(r.message.as_bytes())?;
            }
        }

        Ok(())
    }
}
