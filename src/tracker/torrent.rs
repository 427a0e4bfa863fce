use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::protocol::clock::{current_timestamp, UnixTime};
use crate::protocol::common::AnnounceEvent;
use crate::tracker::peer::Peer;

/// The state of one swarm.
///
/// Peers are keyed by their endpoint: a new announce from `(ip, port)`
/// replaces whatever record that endpoint had before, so a swarm never
/// holds two records for the same endpoint.
#[derive(Clone, Debug)]
pub struct Entry {
    pub peers: BTreeMap<SocketAddr, Peer>,
    pub completed: u32,
    pub last_modified: UnixTime,
}

#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub struct SwarmStats {
    pub completed: u32,
    pub seeders: u32,
    pub leechers: u32,
}

impl Entry {
    pub fn new() -> Entry {
        Entry {
            peers: BTreeMap::new(),
            completed: 0,
            last_modified: current_timestamp(),
        }
    }

    /// Applies one announce to the swarm. Returns `true` when the completed
    /// counter advanced, so the caller can persist it.
    pub fn update_peer(&mut self, peer: &Peer) -> bool {
        self.last_modified = current_timestamp();

        match peer.event {
            AnnounceEvent::Stopped => {
                let _ = self.peers.remove(&peer.peer_addr);
                false
            }
            AnnounceEvent::Completed => {
                let peer_old = self.peers.insert(peer.peer_addr, peer.clone());
                // Counted once per endpoint: the peer must have been known
                // and not already reported the completion.
                match peer_old {
                    Some(old) if !old.is_completed() => {
                        self.completed += 1;
                        true
                    }
                    _ => false,
                }
            }
            _ => {
                let _ = self.peers.insert(peer.peer_addr, peer.clone());
                false
            }
        }
    }

    /// Peers to hand out for an announce, excluding the requester itself.
    pub fn get_peers(&self, client_addr: Option<&SocketAddr>, max_peers: usize) -> Vec<&Peer> {
        self.peers
            .values()
            .filter(|peer| match client_addr {
                Some(addr) => peer.peer_addr != *addr,
                None => true,
            })
            .take(max_peers)
            .collect()
    }

    pub fn get_stats(&self) -> SwarmStats {
        let seeders = self.peers.values().filter(|peer| peer.is_seeder()).count() as u32;
        let leechers = self.peers.len() as u32 - seeders;

        SwarmStats {
            completed: self.completed,
            seeders,
            leechers,
        }
    }

    /// Evicts peers not heard from within the horizon. Returns `true` when
    /// at least one peer was removed.
    pub fn remove_inactive_peers(&mut self, eviction_horizon: u64, now: UnixTime) -> bool {
        let peers_before = self.peers.len();

        self.peers
            .retain(|_, peer| now.saturating_sub(peer.updated) <= eviction_horizon);

        let changed = self.peers.len() != peers_before;
        if changed {
            self.last_modified = now;
        }
        changed
    }
}

impl Default for Entry {
    fn default() -> Self {
        Self::new()
    }
}
