use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::apis::server;
use crate::config::Configuration;
use crate::tracker::Tracker;

/// Starts the HTTP admin endpoint.
///
/// # Errors
///
/// Will return a `hyper::Error` if unable to bind to the configured
/// `apiserver` address.
///
/// # Panics
///
/// Will panic if the configured `apiserver` address is not parseable.
pub async fn start_job(
    config: &Arc<Configuration>,
    tracker: Arc<Tracker>,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<()>, hyper::Error> {
    let bind_addr = config
        .apiserver_bind_address()
        .parse::<SocketAddr>()
        .expect("apiserver bind address invalid");

    let (bound_addr, server) = server::start(bind_addr, tracker, shutdown)?;

    info!("Starting API server on: http://{}", bound_addr);

    Ok(tokio::spawn(async move {
        match server.await {
            Ok(()) => info!("API server on http://{} stopped", bound_addr),
            Err(e) => error!("API server on http://{} failed: {}", bound_addr, e),
        }
    }))
}
