//! Job orchestration.
//!
//! The application is a container for the services configured to run: the
//! UDP tracker itself, the maintenance loop, and optionally the HTTP admin
//! endpoint. Every job observes the same shutdown flag.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Configuration;
use crate::jobs::{torrent_cleanup, tracker_apis, udp_tracker};
use crate::tracker::Tracker;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to bind the UDP tracker socket: {0}")]
    UdpSocket(#[from] std::io::Error),

    #[error("failed to start the API server: {0}")]
    ApiServer(#[from] hyper::Error),
}

/// Restores persistent state and starts every configured job.
///
/// # Errors
///
/// Will return an `Error` when a listener cannot be bound; the caller
/// treats that as fatal.
///
/// # Panics
///
/// Will panic if the persistent state cannot be read back from the
/// database at startup.
pub async fn start(
    config: &Arc<Configuration>,
    tracker: Arc<Tracker>,
    shutdown: watch::Receiver<bool>,
) -> Result<Vec<JoinHandle<()>>, Error> {
    let mut jobs: Vec<JoinHandle<()>> = Vec::new();

    tracker
        .load_persistent_torrents()
        .await
        .expect("Could not load persistent torrents from database.");

    if !tracker.is_dynamic() {
        tracker
            .load_whitelist()
            .await
            .expect("Could not load whitelist from database.");
    }

    jobs.push(udp_tracker::start_job(config, tracker.clone(), shutdown.clone()).await?);

    if config.apiserver.enable {
        jobs.push(tracker_apis::start_job(config, tracker.clone(), shutdown.clone()).await?);
    }

    if config.tracker.cleanup_interval > 0 {
        jobs.push(torrent_cleanup::start_job(config, &tracker, shutdown));
    }

    Ok(jobs)
}
