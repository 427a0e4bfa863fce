use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::protocol::common::MAX_PACKET_SIZE;
use crate::tracker::Tracker;
use crate::udp::handlers::handle_packet;
use crate::udp::response::Response;

/// One bound UDP socket served by a pool of worker tasks.
pub struct UdpServer {
    socket: Arc<UdpSocket>,
    tracker: Arc<Tracker>,
}

impl UdpServer {
    /// # Errors
    ///
    /// Will return an `Err` if unable to bind to the supplied
    /// `bind_address`. A bind failure is fatal at startup.
    pub async fn new(tracker: Arc<Tracker>, bind_address: &str) -> tokio::io::Result<UdpServer> {
        let socket = UdpSocket::bind(bind_address).await?;

        Ok(UdpServer {
            socket: Arc::new(socket),
            tracker,
        })
    }

    /// The address the socket actually bound to. Useful when binding to
    /// port 0.
    ///
    /// # Errors
    ///
    /// Will return an `Err` if the socket has no local address.
    pub fn local_addr(&self) -> tokio::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Runs `worker_count` receive loops over the shared socket and waits
    /// for all of them to observe the shutdown signal.
    pub async fn start(self, worker_count: usize, shutdown: watch::Receiver<bool>) {
        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            workers.push(tokio::spawn(Self::run_worker(
                worker_id,
                self.socket.clone(),
                self.tracker.clone(),
                shutdown.clone(),
            )));
        }

        for worker in workers {
            let _ = worker.await;
        }
    }

    async fn run_worker(worker_id: usize, socket: Arc<UdpSocket>, tracker: Arc<Tracker>, mut shutdown: watch::Receiver<bool>) {
        let mut data = [0; MAX_PACKET_SIZE];

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Stopping UDP worker {}..", worker_id);
                    break;
                }
                result = socket.recv_from(&mut data) => {
                    match result {
                        Ok((valid_bytes, remote_addr)) => {
                            let payload = &data[..valid_bytes];

                            debug!("Received {} bytes from {}", payload.len(), remote_addr);

                            if let Some(response) = handle_packet(remote_addr, payload, &tracker).await {
                                Self::send_response(&socket, remote_addr, response).await;
                            }
                        }
                        Err(e) => {
                            // per-datagram receive errors are not fatal for the worker
                            error!("UDP worker {}: recv_from error: {}", worker_id, e);
                        }
                    }
                }
            }
        }
    }

    async fn send_response(socket: &Arc<UdpSocket>, remote_addr: SocketAddr, response: Response) {
        let buffer = vec![0u8; MAX_PACKET_SIZE];
        let mut cursor = Cursor::new(buffer);

        match response.write_to_bytes(&mut cursor) {
            Ok(()) => {
                #[allow(clippy::cast_possible_truncation)]
                let position = cursor.position() as usize;
                let inner = cursor.get_ref();

                debug!("Sending {} bytes to {}", position, remote_addr);

                Self::send_packet(socket, &remote_addr, &inner[..position]).await;
            }
            Err(e) => {
                debug!("could not write response to bytes: {}", e);
            }
        }
    }

    async fn send_packet(socket: &Arc<UdpSocket>, remote_addr: &SocketAddr, payload: &[u8]) {
        // doesn't matter if it reaches or not
        drop(socket.send_to(payload, remote_addr).await);
    }
}
