use serde::{Deserialize, Serialize};

/// The magic a client must send as the connection id of a connect request.
pub const PROTOCOL_ID: i64 = 0x0000_0417_2710_1980;

/// Receive buffer size. Big enough for the largest request plus some slack
/// for protocol extensions.
pub const MAX_PACKET_SIZE: usize = 2048;

/// Upper bound of info hashes accepted in a single scrape request.
pub const MAX_SCRAPE_TORRENTS: u8 = 74;

/// Announce event as carried on the wire. Values outside the protocol range
/// are treated as `None`.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum AnnounceEvent {
    None,
    Completed,
    Started,
    Stopped,
}

impl AnnounceEvent {
    #[inline]
    pub fn from_i32(i: i32) -> Self {
        match i {
            1 => Self::Completed,
            2 => Self::Started,
            3 => Self::Stopped,
            _ => Self::None,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct ConnectionId(pub i64);

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct TransactionId(pub i32);

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct NumberOfBytes(pub i64);

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct NumberOfPeers(pub i32);

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct Port(pub u16);

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct PeerKey(pub u32);

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct PeerId(pub [u8; 20]);

#[cfg(test)]
mod tests {
    use super::AnnounceEvent;

    #[test]
    fn announce_event_is_decoded_from_its_wire_value() {
        assert_eq!(AnnounceEvent::from_i32(0), AnnounceEvent::None);
        assert_eq!(AnnounceEvent::from_i32(1), AnnounceEvent::Completed);
        assert_eq!(AnnounceEvent::from_i32(2), AnnounceEvent::Started);
        assert_eq!(AnnounceEvent::from_i32(3), AnnounceEvent::Stopped);
    }

    #[test]
    fn unknown_announce_event_values_are_treated_as_unspecified() {
        assert_eq!(AnnounceEvent::from_i32(4), AnnounceEvent::None);
        assert_eq!(AnnounceEvent::from_i32(-1), AnnounceEvent::None);
        assert_eq!(AnnounceEvent::from_i32(i32::MAX), AnnounceEvent::None);
    }
}
