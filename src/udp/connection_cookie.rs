//! Stateless connection ids for the BEP 15 handshake.
//!
//! The id handed out by a connect response is not stored anywhere. It is a
//! keyed hash over the client endpoint and a coarse time bucket, so it can
//! be recomputed and checked when the announce or scrape arrives. Buckets
//! change once per hour; verification accepts the current and the previous
//! bucket so a client is never rejected right after a bucket boundary.
//!
//! | Wall clock      | Bucket | Accepted ids      |
//! |-----------------|--------|-------------------|
//! | 00:00 .. 00:59  | n      | bucket n, n - 1   |
//! | 01:00 .. 01:59  | n + 1  | bucket n + 1, n   |
//!
//! An id minted at 00:59 is therefore valid for just over an hour, one
//! minted at 00:00 for just under two.

use std::net::{IpAddr, SocketAddr};

use rand::Rng;

use crate::protocol::clock::UnixTime;
use crate::protocol::common::ConnectionId;

/// Width of a connection id time bucket, in seconds.
pub const COOKIE_PERIOD_SECS: u64 = 3600;

/// Key for the connection id MAC. Generated once at startup, read-only
/// afterwards. Restarting the tracker invalidates all outstanding ids,
/// which only costs clients one extra connect round-trip.
#[derive(Clone)]
pub struct Secret([u8; 32]);

impl Secret {
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes[..]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Mints the connection id for a client endpoint at the given time.
pub fn make_connection_id(secret: &Secret, remote_address: &SocketAddr, current_timestamp: UnixTime) -> ConnectionId {
    build(secret, remote_address, current_timestamp / COOKIE_PERIOD_SECS)
}

/// Verifies that a connection id was minted for this endpoint in the
/// current or the previous time bucket.
///
/// # Errors
///
/// Returns `Err(())` for ids minted for another endpoint, with another
/// secret, or too long ago. The caller must drop the packet silently.
pub fn verify_connection_id(
    connection_id: ConnectionId,
    secret: &Secret,
    remote_address: &SocketAddr,
    current_timestamp: UnixTime,
) -> Result<(), ()> {
    let bucket = current_timestamp / COOKIE_PERIOD_SECS;

    if connection_id == build(secret, remote_address, bucket) {
        return Ok(());
    }

    if bucket > 0 && connection_id == build(secret, remote_address, bucket - 1) {
        return Ok(());
    }

    Err(())
}

fn build(secret: &Secret, remote_address: &SocketAddr, bucket: u64) -> ConnectionId {
    let peer_ip_as_bytes = match remote_address.ip() {
        IpAddr::V4(ip) => ip.octets().to_vec(),
        IpAddr::V6(ip) => ip.octets().to_vec(),
    };

    let input: Vec<u8> = [
        bucket.to_be_bytes().as_slice(),
        peer_ip_as_bytes.as_slice(),
        remote_address.port().to_be_bytes().as_slice(),
    ]
    .concat();

    let hash = blake3::keyed_hash(secret.as_bytes(), &input);

    let mut truncated_hash = [0u8; 8];
    truncated_hash.copy_from_slice(&hash.as_bytes()[..8]);

    ConnectionId(i64::from_le_bytes(truncated_hash))
}
