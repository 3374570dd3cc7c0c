//! Accepting worker connections.
//!
//! Every accepted connection registers as a new node until registration
//! closes, either because `max_workers` nodes registered or because the
//! registration window elapsed. Later connections are refused.

use ::std::{net::SocketAddr, sync::Arc, time::Duration};

use ::shardrank_common::{
    dataset::Row,
    error::Result,
    tokio::{
        self,
        net::{TcpListener, TcpStream},
        time::Instant,
    },
    tracing::{error, info, warn},
};

use crate::{coordinator::CoordinatorHandle, session::WorkerSession};

enum Event {
    Accepted(std::io::Result<(TcpStream, SocketAddr)>),
    RegistrationWindowElapsed,
}

/// Accept workers forever, spawning one [WorkerSession] per registered connection.
pub async fn serve_workers(
    listener: TcpListener,
    coordinator: CoordinatorHandle,
    dataset: Arc<[Row]>,
    io_timeout: Duration,
    registration_timeout: Option<Duration>,
) -> Result<()> {
    let mut registration_deadline = registration_timeout.map(|window| Instant::now() + window);
    loop {
        let event = match registration_deadline {
            Some(deadline) => tokio::select! {
                accepted = listener.accept() => Event::Accepted(accepted),
                _ = tokio::time::sleep_until(deadline) => Event::RegistrationWindowElapsed,
            },
            None => Event::Accepted(listener.accept().await),
        };

        match event {
            Event::RegistrationWindowElapsed => {
                registration_deadline = match coordinator.close_registration().await? {
                    Some(total) => {
                        info!("Registration window elapsed, the run has {} workers", total);
                        None
                    }
                    None => {
                        warn!("Registration window elapsed without any worker, keep waiting");
                        registration_timeout.map(|window| Instant::now() + window)
                    }
                };
            }
            Event::Accepted(Err(e)) => error!("Failed to accept a worker connection: {}", e),
            Event::Accepted(Ok((stream, address))) => match coordinator.register().await? {
                Some(registration) => {
                    info!(
                        "Worker {} connected as node {}",
                        address, registration.node_id
                    );
                    let session = WorkerSession::new(
                        registration,
                        coordinator.clone(),
                        dataset.clone(),
                        io_timeout,
                        address.to_string(),
                    );
                    tokio::spawn(session.run(stream));
                }
                None => {
                    warn!("Registration is closed, refuse worker {}", address);
                    drop(stream);
                }
            },
        }
    }
}
