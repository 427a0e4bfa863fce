use std::sync::Arc;

use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Configuration;
use crate::tracker::Tracker;

/// Spawns the maintenance loop: every `tracker.cleanup_interval` seconds a
/// pass over the store evicts stale peers and drops dead swarms. The loop
/// exits between passes when the shutdown flag flips or the tracker is
/// gone; a running pass is never abandoned mid-swarm because it holds the
/// store lock for the whole pass.
pub fn start_job(config: &Arc<Configuration>, tracker: &Arc<Tracker>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let weak_tracker = Arc::downgrade(tracker);
    let interval = config.tracker.cleanup_interval;

    tokio::spawn(async move {
        let interval = std::time::Duration::from_secs(interval);
        let mut interval = tokio::time::interval(interval);
        interval.tick().await; // first tick is immediate

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Stopping torrent cleanup job..");
                    break;
                }
                _ = interval.tick() => {
                    if let Some(tracker) = weak_tracker.upgrade() {
                        info!("Cleaning up torrents..");
                        tracker.cleanup_torrents().await;
                    } else {
                        break;
                    }
                }
            }
        }
    })
}
