use std::sync::Arc;

use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Configuration;
use crate::tracker::Tracker;
use crate::udp::server::UdpServer;

/// Binds the tracker socket and spawns the worker pool.
///
/// The socket is bound before the job task is spawned so a bind failure
/// surfaces as a startup error instead of a dead background task.
///
/// # Errors
///
/// Will return an `Err` if unable to bind the UDP socket.
pub async fn start_job(
    config: &Arc<Configuration>,
    tracker: Arc<Tracker>,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<()>, std::io::Error> {
    let bind_address = config.udp_bind_address();
    let worker_count = config.tracker.threads;

    let udp_server = UdpServer::new(tracker, &bind_address).await?;

    info!(
        "Starting UDP tracker on: {} with {} workers",
        udp_server.local_addr()?,
        worker_count
    );

    Ok(tokio::spawn(async move {
        udp_server.start(worker_count, shutdown).await;
        info!("UDP tracker on {} stopped", bind_address);
    }))
}
