use std::net::SocketAddr;
use std::sync::Arc;

use futures::Future;
use log::info;
use tokio::sync::watch;

use crate::apis::routes;
use crate::tracker::Tracker;

/// Binds the admin server and returns the bound address together with the
/// serve future. The future resolves once the shutdown flag flips and
/// in-flight requests have drained.
///
/// # Errors
///
/// Will return a `hyper::Error` if unable to bind to `socket_addr`.
pub fn start(
    socket_addr: SocketAddr,
    tracker: Arc<Tracker>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(SocketAddr, impl Future<Output = hyper::Result<()>>), hyper::Error> {
    let app = routes::router(tracker);

    let server = axum::Server::try_bind(&socket_addr)?.serve(app.into_make_service_with_connect_info::<SocketAddr>());

    let bound_addr = server.local_addr();

    let graceful = server.with_graceful_shutdown(async move {
        let _ = shutdown.changed().await;
        info!("Stopping API server on http://{} ..", bound_addr);
    });

    Ok((bound_addr, graceful))
}
