use std::convert::TryInto;
use std::io::{Cursor, Read};
use std::net::Ipv4Addr;

use byteorder::{NetworkEndian, ReadBytesExt};
use thiserror::Error;

use crate::protocol::common::{
    AnnounceEvent, ConnectionId, NumberOfBytes, NumberOfPeers, PeerId, PeerKey, Port, TransactionId, MAX_SCRAPE_TORRENTS,
    PROTOCOL_ID,
};
use crate::protocol::info_hash::InfoHash;

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Request {
    Connect(ConnectRequest),
    Announce(AnnounceRequest),
    Scrape(ScrapeRequest),
}

impl From<ConnectRequest> for Request {
    fn from(r: ConnectRequest) -> Self {
        Self::Connect(r)
    }
}

impl From<AnnounceRequest> for Request {
    fn from(r: AnnounceRequest) -> Self {
        Self::Announce(r)
    }
}

impl From<ScrapeRequest> for Request {
    fn from(r: ScrapeRequest) -> Self {
        Self::Scrape(r)
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ConnectRequest {
    pub transaction_id: TransactionId,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AnnounceRequest {
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub bytes_downloaded: NumberOfBytes,
    pub bytes_left: NumberOfBytes,
    pub bytes_uploaded: NumberOfBytes,
    pub event: AnnounceEvent,
    pub ip_address: Option<Ipv4Addr>,
    pub key: PeerKey,
    pub peers_wanted: NumberOfPeers,
    pub port: Port,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ScrapeRequest {
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    pub info_hashes: Vec<InfoHash>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseRequestError {
    /// The frame is shorter than its fixed layout, carries a bad connect
    /// magic, or has a scrape tail that is not a whole number of info
    /// hashes. Such packets are dropped without a reply.
    #[error("malformed request frame")]
    MalformedFrame,

    /// The header parsed but the action is not one we speak. The transaction
    /// id is readable, so the caller can reply with an error frame.
    #[error("unrecognized action {action}")]
    UnknownAction { action: i32, transaction_id: TransactionId },
}

impl Request {
    /// Decodes a request datagram.
    ///
    /// # Errors
    ///
    /// Returns a `ParseRequestError` if the frame does not follow the BEP 15
    /// layout for its action.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseRequestError> {
        if bytes.len() < 16 {
            return Err(ParseRequestError::MalformedFrame);
        }

        let mut cursor = Cursor::new(bytes);

        let connection_id = cursor
            .read_i64::<NetworkEndian>()
            .map_err(|_| ParseRequestError::MalformedFrame)?;
        let action = cursor
            .read_i32::<NetworkEndian>()
            .map_err(|_| ParseRequestError::MalformedFrame)?;
        let transaction_id = cursor
            .read_i32::<NetworkEndian>()
            .map_err(|_| ParseRequestError::MalformedFrame)?;

        match action {
            // Connect
            0 => {
                if connection_id != PROTOCOL_ID {
                    return Err(ParseRequestError::MalformedFrame);
                }

                Ok(ConnectRequest {
                    transaction_id: TransactionId(transaction_id),
                }
                .into())
            }

            // Announce
            1 => {
                if bytes.len() < 98 {
                    return Err(ParseRequestError::MalformedFrame);
                }

                let mut info_hash = [0; 20];
                let mut peer_id = [0; 20];
                let mut ip = [0; 4];

                cursor.read_exact(&mut info_hash).map_err(|_| ParseRequestError::MalformedFrame)?;
                cursor.read_exact(&mut peer_id).map_err(|_| ParseRequestError::MalformedFrame)?;

                let bytes_downloaded = cursor
                    .read_i64::<NetworkEndian>()
                    .map_err(|_| ParseRequestError::MalformedFrame)?;
                let bytes_left = cursor
                    .read_i64::<NetworkEndian>()
                    .map_err(|_| ParseRequestError::MalformedFrame)?;
                let bytes_uploaded = cursor
                    .read_i64::<NetworkEndian>()
                    .map_err(|_| ParseRequestError::MalformedFrame)?;
                let event = cursor
                    .read_i32::<NetworkEndian>()
                    .map_err(|_| ParseRequestError::MalformedFrame)?;

                cursor.read_exact(&mut ip).map_err(|_| ParseRequestError::MalformedFrame)?;

                let key = cursor
                    .read_u32::<NetworkEndian>()
                    .map_err(|_| ParseRequestError::MalformedFrame)?;
                let peers_wanted = cursor
                    .read_i32::<NetworkEndian>()
                    .map_err(|_| ParseRequestError::MalformedFrame)?;
                let port = cursor
                    .read_u16::<NetworkEndian>()
                    .map_err(|_| ParseRequestError::MalformedFrame)?;

                // a zeroed ip field means "use the datagram's source address"
                let opt_ip = if ip == [0; 4] { None } else { Some(Ipv4Addr::from(ip)) };

                Ok(AnnounceRequest {
                    connection_id: ConnectionId(connection_id),
                    transaction_id: TransactionId(transaction_id),
                    info_hash: InfoHash(info_hash),
                    peer_id: PeerId(peer_id),
                    bytes_downloaded: NumberOfBytes(bytes_downloaded),
                    bytes_left: NumberOfBytes(bytes_left),
                    bytes_uploaded: NumberOfBytes(bytes_uploaded),
                    event: AnnounceEvent::from_i32(event),
                    ip_address: opt_ip,
                    key: PeerKey(key),
                    peers_wanted: NumberOfPeers(peers_wanted),
                    port: Port(port),
                }
                .into())
            }

            // Scrape
            2 => {
                let tail = &bytes[16..];

                if tail.len() % 20 != 0 {
                    return Err(ParseRequestError::MalformedFrame);
                }

                let info_hashes = tail
                    .chunks_exact(20)
                    .take(MAX_SCRAPE_TORRENTS as usize)
                    .map(|chunk| InfoHash(chunk.try_into().unwrap()))
                    .collect();

                Ok(ScrapeRequest {
                    connection_id: ConnectionId(connection_id),
                    transaction_id: TransactionId(transaction_id),
                    info_hashes,
                }
                .into())
            }

            _ => Err(ParseRequestError::UnknownAction {
                action,
                transaction_id: TransactionId(transaction_id),
            }),
        }
    }
}
