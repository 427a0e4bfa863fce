pub mod error;
pub mod mode;
pub mod peer;
pub mod statistics;
pub mod torrent;

use std::collections::btree_map::Entry as MapEntry;
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, RwLockReadGuard};

use self::error::Error;
use self::mode::TrackerMode;
use self::peer::Peer;
use self::statistics::{StatsTracker, TrackerStatistics, TrackerStatisticsEvent};
use self::torrent::SwarmStats;
use crate::config::Configuration;
use crate::databases::{self, Database};
use crate::protocol::clock::current_timestamp;
use crate::protocol::info_hash::InfoHash;
use crate::udp::connection_cookie::Secret;

/// The tracker state: the in-memory swarm map, the allow-list, and the
/// persistence handle. One `Tracker` is created by `main` and shared with
/// every worker through an `Arc`.
pub struct Tracker {
    pub config: Arc<Configuration>,
    mode: TrackerMode,
    secret: Secret,
    whitelist: RwLock<HashSet<InfoHash>>,
    torrents: RwLock<BTreeMap<InfoHash, torrent::Entry>>,
    stats_tracker: StatsTracker,
    pub database: Box<dyn Database>,
}

/// Aggregate numbers over every known swarm, for the admin API.
#[derive(Debug, PartialEq, Eq, Default, Serialize)]
pub struct TorrentsMetrics {
    pub torrents: u64,
    pub seeders: u64,
    pub completed: u64,
    pub leechers: u64,
}

impl Tracker {
    /// # Errors
    ///
    /// Will return a `databases::error::Error` if unable to open the
    /// database given by `db.param`.
    pub fn new(config: &Arc<Configuration>) -> Result<Tracker, databases::error::Error> {
        let database = databases::connect(&config.db.param)?;

        let mode = if config.tracker.is_dynamic {
            TrackerMode::Dynamic
        } else {
            TrackerMode::Listed
        };

        Ok(Tracker {
            config: config.clone(),
            mode,
            secret: Secret::random(),
            whitelist: RwLock::new(HashSet::new()),
            torrents: RwLock::new(BTreeMap::new()),
            stats_tracker: StatsTracker::new_running_instance(),
            database,
        })
    }

    pub fn is_dynamic(&self) -> bool {
        self.mode == TrackerMode::Dynamic
    }

    /// The process-private key of the connection-id MAC.
    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Whether an announce for this info hash is admitted at all.
    pub async fn is_info_hash_allowed(&self, info_hash: &InfoHash) -> bool {
        self.is_dynamic() || self.whitelist.read().await.contains(info_hash)
    }

    /// # Errors
    ///
    /// Will return `Error::TorrentNotWhitelisted` in listed mode for an
    /// info hash that was never registered.
    pub async fn authenticate_request(&self, info_hash: &InfoHash) -> Result<(), Error> {
        if self.is_info_hash_allowed(info_hash).await {
            Ok(())
        } else {
            Err(Error::TorrentNotWhitelisted)
        }
    }

    /// Registers an info hash, both in memory and in the database. A
    /// repeated add is a no-op.
    ///
    /// # Errors
    ///
    /// Will return a `databases::error::Error` if the allow-list row could
    /// not be written.
    pub async fn add_torrent_to_whitelist(&self, info_hash: &InfoHash) -> Result<(), databases::error::Error> {
        if !self.database.is_info_hash_whitelisted(info_hash).await? {
            self.database.add_info_hash_to_whitelist(*info_hash).await?;
        }
        self.whitelist.write().await.insert(*info_hash);
        Ok(())
    }

    /// Unregisters an info hash and destroys its swarm, peers included.
    ///
    /// # Errors
    ///
    /// Will return a `databases::error::Error` if the allow-list row could
    /// not be removed. The in-memory state is only touched after the
    /// database accepted the removal.
    pub async fn remove_torrent_from_whitelist(&self, info_hash: &InfoHash) -> Result<(), databases::error::Error> {
        if self.database.is_info_hash_whitelisted(info_hash).await? {
            self.database.remove_info_hash_from_whitelist(*info_hash).await?;
        }
        self.whitelist.write().await.remove(info_hash);
        self.torrents.write().await.remove(info_hash);
        Ok(())
    }

    /// Loads the allow-list from the database, replacing the in-memory set.
    ///
    /// # Errors
    ///
    /// Will return a `databases::error::Error` if the allow-list could not
    /// be read.
    pub async fn load_whitelist(&self) -> Result<(), databases::error::Error> {
        let whitelisted_torrents_from_database = self.database.load_whitelist().await?;
        let mut whitelist = self.whitelist.write().await;

        whitelist.clear();

        for info_hash in whitelisted_torrents_from_database {
            whitelist.insert(info_hash);
        }

        Ok(())
    }

    /// Restores the persistent completion counters saved by earlier runs.
    ///
    /// # Errors
    ///
    /// Will return a `databases::error::Error` if the torrents table could
    /// not be read.
    pub async fn load_persistent_torrents(&self) -> Result<(), databases::error::Error> {
        let persistent_torrents = self.database.load_persistent_torrents().await?;
        let mut torrents = self.torrents.write().await;

        for (info_hash, completed) in persistent_torrents {
            if torrents.contains_key(&info_hash) {
                continue;
            }

            let entry = torrent::Entry {
                peers: BTreeMap::default(),
                completed,
                last_modified: current_timestamp(),
            };

            torrents.insert(info_hash, entry);
        }

        Ok(())
    }

    /// Applies one announce to the store and reads the swarm counters the
    /// response needs. Both happen under a single write lock, so the
    /// returned stats always include the announce itself.
    pub async fn update_torrent_with_peer_and_get_stats(&self, info_hash: &InfoHash, peer: &Peer) -> SwarmStats {
        let mut torrents = self.torrents.write().await;

        let torrent_entry = match torrents.entry(*info_hash) {
            MapEntry::Vacant(vacant) => vacant.insert(torrent::Entry::new()),
            MapEntry::Occupied(entry) => entry.into_mut(),
        };

        let completed_advanced = torrent_entry.update_peer(peer);

        if completed_advanced {
            let _ = self
                .database
                .save_persistent_torrent(info_hash, torrent_entry.completed)
                .await;
        }

        torrent_entry.get_stats()
    }

    /// Peers of a swarm, excluding the requesting endpoint, capped at
    /// `max_peers`. Empty when the swarm is unknown.
    pub async fn get_torrent_peers(&self, info_hash: &InfoHash, client_addr: &SocketAddr, max_peers: usize) -> Vec<Peer> {
        let read_lock = self.torrents.read().await;

        match read_lock.get(info_hash) {
            None => vec![],
            Some(entry) => entry
                .get_peers(Some(client_addr), max_peers)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    /// The scrape counters of one swarm; zero-filled when unknown.
    pub async fn get_swarm_stats(&self, info_hash: &InfoHash) -> SwarmStats {
        let read_lock = self.torrents.read().await;

        match read_lock.get(info_hash) {
            None => SwarmStats::default(),
            Some(entry) => entry.get_stats(),
        }
    }

    pub async fn get_torrents(&self) -> RwLockReadGuard<'_, BTreeMap<InfoHash, torrent::Entry>> {
        self.torrents.read().await
    }

    pub async fn get_torrents_metrics(&self) -> TorrentsMetrics {
        let mut metrics = TorrentsMetrics::default();

        let db = self.get_torrents().await;

        for entry in db.values() {
            let stats = entry.get_stats();
            metrics.seeders += u64::from(stats.seeders);
            metrics.completed += u64::from(stats.completed);
            metrics.leechers += u64::from(stats.leechers);
            metrics.torrents += 1;
        }

        metrics
    }

    pub async fn send_stats_event(&self, event: TrackerStatisticsEvent) {
        self.stats_tracker.send_event(event).await;
    }

    pub async fn get_stats(&self) -> RwLockReadGuard<'_, TrackerStatistics> {
        self.stats_tracker.get_stats().await
    }

    /// One maintenance pass: evict stale peers everywhere and, in dynamic
    /// mode, drop swarms that have been empty for longer than the eviction
    /// horizon. Allow-listed swarms persist until an explicit remove.
    pub async fn cleanup_torrents(&self) {
        let mut torrents_lock = self.torrents.write().await;
        let now = current_timestamp();
        let eviction_horizon = self.config.tracker.peer_timeout;

        if self.is_dynamic() {
            torrents_lock.retain(|_, entry| {
                entry.remove_inactive_peers(eviction_horizon, now);

                !entry.peers.is_empty() || now.saturating_sub(entry.last_modified) <= eviction_horizon
            });
        } else {
            for entry in torrents_lock.values_mut() {
                entry.remove_inactive_peers(eviction_horizon, now);
            }
        }
    }
}

#[cfg(test)]
mod tests {

    mod the_tracker {
        use std::net::{IpAddr, Ipv4Addr, SocketAddr};
        use std::sync::Arc;

        use crate::config::ephemeral_configuration;
        use crate::protocol::clock::current_timestamp;
        use crate::protocol::common::{AnnounceEvent, NumberOfBytes, PeerId};
        use crate::protocol::info_hash::InfoHash;
        use crate::tracker::peer::Peer;
        use crate::tracker::Tracker;

        pub fn tracker_factory(is_dynamic: bool) -> Tracker {
            let mut configuration = ephemeral_configuration();
            configuration.tracker.is_dynamic = is_dynamic;

            Tracker::new(&Arc::new(configuration)).expect("tracker should be created")
        }

        fn sample_info_hash() -> InfoHash {
            "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap()
        }

        fn sample_peer(ip: [u8; 4], port: u16, left: i64, event: AnnounceEvent) -> Peer {
            Peer {
                peer_id: PeerId(*b"-qB00000000000000000"),
                peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::from(ip)), port),
                updated: current_timestamp(),
                uploaded: NumberOfBytes(0),
                downloaded: NumberOfBytes(0),
                left: NumberOfBytes(left),
                event,
            }
        }

        #[tokio::test]
        async fn it_should_create_a_swarm_on_the_first_announce() {
            let tracker = tracker_factory(true);

            let stats = tracker
                .update_torrent_with_peer_and_get_stats(
                    &sample_info_hash(),
                    &sample_peer([126, 0, 0, 1], 51413, 100, AnnounceEvent::Started),
                )
                .await;

            assert_eq!(stats.leechers, 1);
            assert_eq!(stats.seeders, 0);
        }

        #[tokio::test]
        async fn it_should_return_zeroed_stats_for_an_unknown_swarm() {
            let tracker = tracker_factory(true);

            let stats = tracker.get_swarm_stats(&sample_info_hash()).await;

            assert_eq!((stats.seeders, stats.completed, stats.leechers), (0, 0, 0));
        }

        #[tokio::test]
        async fn it_should_not_return_the_announcing_peer_to_itself() {
            let tracker = tracker_factory(true);

            let announcer = sample_peer([126, 0, 0, 1], 51413, 100, AnnounceEvent::Started);
            tracker
                .update_torrent_with_peer_and_get_stats(&sample_info_hash(), &announcer)
                .await;

            let peers = tracker.get_torrent_peers(&sample_info_hash(), &announcer.peer_addr, 30).await;

            assert!(peers.is_empty());
        }

        #[tokio::test]
        async fn it_should_keep_the_completed_counter_monotone() {
            let tracker = tracker_factory(true);
            let info_hash = sample_info_hash();

            tracker
                .update_torrent_with_peer_and_get_stats(
                    &info_hash,
                    &sample_peer([126, 0, 0, 1], 6881, 100, AnnounceEvent::Started),
                )
                .await;

            let mut observed = Vec::new();

            for event in [
                AnnounceEvent::Completed,
                AnnounceEvent::None,
                AnnounceEvent::Completed,
                AnnounceEvent::Stopped,
            ] {
                let left = if event == AnnounceEvent::Completed { 0 } else { 100 };
                tracker
                    .update_torrent_with_peer_and_get_stats(&info_hash, &sample_peer([126, 0, 0, 1], 6881, left, event))
                    .await;
                observed.push(tracker.get_swarm_stats(&info_hash).await.completed);
            }

            assert!(observed.windows(2).all(|w| w[0] <= w[1]), "completed went backwards: {observed:?}");
        }

        mod in_dynamic_mode {
            use super::{sample_info_hash, sample_peer, tracker_factory};
            use crate::protocol::common::AnnounceEvent;

            #[tokio::test]
            async fn every_info_hash_is_allowed() {
                let tracker = tracker_factory(true);

                assert!(tracker.is_info_hash_allowed(&sample_info_hash()).await);
            }

            #[tokio::test]
            async fn cleanup_drops_a_swarm_that_has_been_empty_past_the_horizon() {
                let tracker = tracker_factory(true);
                let info_hash = sample_info_hash();

                tracker
                    .update_torrent_with_peer_and_get_stats(
                        &info_hash,
                        &sample_peer([126, 0, 0, 1], 6881, 100, AnnounceEvent::Started),
                    )
                    .await;

                // age both the peer and the swarm past the horizon
                {
                    let mut torrents = tracker.torrents.write().await;
                    let entry = torrents.get_mut(&info_hash).unwrap();
                    for peer in entry.peers.values_mut() {
                        peer.updated = 0;
                    }
                    entry.last_modified = 0;
                }

                tracker.cleanup_torrents().await;

                assert!(tracker.get_torrents().await.get(&info_hash).is_none());
            }

            #[tokio::test]
            async fn cleanup_keeps_a_swarm_with_live_peers() {
                let tracker = tracker_factory(true);
                let info_hash = sample_info_hash();

                tracker
                    .update_torrent_with_peer_and_get_stats(
                        &info_hash,
                        &sample_peer([126, 0, 0, 1], 6881, 100, AnnounceEvent::Started),
                    )
                    .await;

                tracker.cleanup_torrents().await;

                assert!(tracker.get_torrents().await.get(&info_hash).is_some());
            }
        }

        mod in_listed_mode {
            use super::{sample_info_hash, sample_peer, tracker_factory};
            use crate::protocol::common::AnnounceEvent;

            #[tokio::test]
            async fn only_whitelisted_info_hashes_are_allowed() {
                let tracker = tracker_factory(false);

                assert!(!tracker.is_info_hash_allowed(&sample_info_hash()).await);

                tracker.add_torrent_to_whitelist(&sample_info_hash()).await.unwrap();

                assert!(tracker.is_info_hash_allowed(&sample_info_hash()).await);
            }

            #[tokio::test]
            async fn adding_a_torrent_twice_is_idempotent() {
                let tracker = tracker_factory(false);

                tracker.add_torrent_to_whitelist(&sample_info_hash()).await.unwrap();
                tracker.add_torrent_to_whitelist(&sample_info_hash()).await.unwrap();

                assert!(tracker.is_info_hash_allowed(&sample_info_hash()).await);
            }

            #[tokio::test]
            async fn removing_a_torrent_destroys_its_swarm() {
                let tracker = tracker_factory(false);
                let info_hash = sample_info_hash();

                tracker.add_torrent_to_whitelist(&info_hash).await.unwrap();
                tracker
                    .update_torrent_with_peer_and_get_stats(
                        &info_hash,
                        &sample_peer([126, 0, 0, 1], 6881, 100, AnnounceEvent::Started),
                    )
                    .await;

                tracker.remove_torrent_from_whitelist(&info_hash).await.unwrap();

                assert!(!tracker.is_info_hash_allowed(&info_hash).await);
                assert_eq!(tracker.get_swarm_stats(&info_hash).await.leechers, 0);
            }

            #[tokio::test]
            async fn the_whitelist_survives_a_reload_from_the_database() {
                let tracker = tracker_factory(false);

                tracker.add_torrent_to_whitelist(&sample_info_hash()).await.unwrap();

                // wipe the in-memory set, then restore it from the database
                tracker.whitelist.write().await.clear();
                tracker.load_whitelist().await.unwrap();

                assert!(tracker.is_info_hash_allowed(&sample_info_hash()).await);
            }

            #[tokio::test]
            async fn cleanup_keeps_an_empty_whitelisted_swarm() {
                let tracker = tracker_factory(false);
                let info_hash = sample_info_hash();

                tracker.add_torrent_to_whitelist(&info_hash).await.unwrap();
                tracker
                    .update_torrent_with_peer_and_get_stats(
                        &info_hash,
                        &sample_peer([126, 0, 0, 1], 6881, 100, AnnounceEvent::Started),
                    )
                    .await;

                {
                    let mut torrents = tracker.torrents.write().await;
                    let entry = torrents.get_mut(&info_hash).unwrap();
                    for peer in entry.peers.values_mut() {
                        peer.updated = 0;
                    }
                    entry.last_modified = 0;
                }

                tracker.cleanup_torrents().await;

                let torrents = tracker.get_torrents().await;
                let entry = torrents.get(&info_hash).expect("listed swarm should persist");
                assert!(entry.peers.is_empty());
            }
        }

        mod after_a_cleanup_pass {
            use super::{sample_info_hash, sample_peer, tracker_factory};
            use crate::protocol::common::AnnounceEvent;

            #[tokio::test]
            async fn stale_peers_are_gone_and_aggregates_match_the_survivors() {
                let tracker = tracker_factory(true);
                let info_hash = sample_info_hash();

                tracker
                    .update_torrent_with_peer_and_get_stats(
                        &info_hash,
                        &sample_peer([126, 0, 0, 1], 6881, 0, AnnounceEvent::Started),
                    )
                    .await;
                tracker
                    .update_torrent_with_peer_and_get_stats(
                        &info_hash,
                        &sample_peer([126, 0, 0, 2], 6881, 100, AnnounceEvent::Started),
                    )
                    .await;

                // age only the seeder past the horizon
                {
                    let mut torrents = tracker.torrents.write().await;
                    let entry = torrents.get_mut(&info_hash).unwrap();
                    let seeder_addr = "126.0.0.1:6881".parse().unwrap();
                    entry.peers.get_mut(&seeder_addr).unwrap().updated = 0;
                }

                tracker.cleanup_torrents().await;

                let stats = tracker.get_swarm_stats(&info_hash).await;
                assert_eq!(stats.seeders, 0);
                assert_eq!(stats.leechers, 1);
            }
        }
    }
}
