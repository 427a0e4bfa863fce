use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{self, Sender};
use tokio::sync::{RwLock, RwLockReadGuard};

const CHANNEL_BUFFER_SIZE: usize = 65_535;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStatisticsEvent {
    Udp4Connect,
    Udp4Announce,
    Udp4Scrape,
    Udp4Error,
}

/// Counters of handled packets since startup.
#[derive(Debug, Default, Serialize)]
pub struct TrackerStatistics {
    pub udp4_connections_handled: u64,
    pub udp4_announces_handled: u64,
    pub udp4_scrapes_handled: u64,
    pub udp4_errors_handled: u64,
}

/// Collects packet counters off the hot path. Handlers push events into a
/// channel; a worker task owns the write side of the counters.
pub struct StatsTracker {
    channel_sender: Option<Sender<TrackerStatisticsEvent>>,
    stats: Arc<RwLock<TrackerStatistics>>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            channel_sender: None,
            stats: Arc::new(RwLock::new(TrackerStatistics::default())),
        }
    }

    /// Creates a stats tracker with its event worker already running.
    pub fn new_running_instance() -> Self {
        let mut stats_tracker = Self::new();
        stats_tracker.run_worker();
        stats_tracker
    }

    pub async fn get_stats(&self) -> RwLockReadGuard<'_, TrackerStatistics> {
        self.stats.read().await
    }

    pub async fn send_event(&self, event: TrackerStatisticsEvent) -> Option<Result<(), SendError<TrackerStatisticsEvent>>> {
        match &self.channel_sender {
            Some(tx) => Some(tx.send(event).await),
            None => None,
        }
    }

    pub fn run_worker(&mut self) {
        let (tx, mut rx) = mpsc::channel::<TrackerStatisticsEvent>(CHANNEL_BUFFER_SIZE);

        self.channel_sender = Some(tx);

        let stats = self.stats.clone();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let mut stats_lock = stats.write().await;

                match event {
                    TrackerStatisticsEvent::Udp4Connect => stats_lock.udp4_connections_handled += 1,
                    TrackerStatisticsEvent::Udp4Announce => stats_lock.udp4_announces_handled += 1,
                    TrackerStatisticsEvent::Udp4Scrape => stats_lock.udp4_scrapes_handled += 1,
                    TrackerStatisticsEvent::Udp4Error => stats_lock.udp4_errors_handled += 1,
                }
            }
        });
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
