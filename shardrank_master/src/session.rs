//! Master side of one worker connection.
//!
//! `Connected -> Sending -> AwaitingResult -> Completed`, or `Failed` from any
//! non terminal state. Every read and write runs under its own deadline.

use ::std::{sync::Arc, time::Duration};

use ::shardrank_common::{
    dataset::Row,
    error::Result,
    node::{NodeId, PartialResult},
    partition::partition,
    protocol::{receive_records, send_records, LineCodec, ScoreRecord},
    tokio::io::{self, AsyncRead, AsyncWrite},
    tokio_util::codec::{FramedRead, FramedWrite},
    tracing::{error, info},
};

use crate::coordinator::{CoordinatorHandle, Registration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Registered, waiting for registration to close.
    Connected,
    /// Streaming the partition to the worker.
    Sending,
    /// Partition sent, reading the worker's scores.
    AwaitingResult,
    Completed,
    Failed(String),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

pub struct WorkerSession {
    registration: Registration,
    coordinator: CoordinatorHandle,
    dataset: Arc<[Row]>,
    io_timeout: Duration,
    /// Name of the remote side in logs.
    peer: String,
}

impl WorkerSession {
    pub fn new(
        registration: Registration,
        coordinator: CoordinatorHandle,
        dataset: Arc<[Row]>,
        io_timeout: Duration,
        peer: String,
    ) -> Self {
        Self {
            registration,
            coordinator,
            dataset,
            io_timeout,
            peer,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.registration.node_id
    }

    /// Drive the session to a terminal state.
    /// On failure the connection is dropped and nothing is recorded for this node.
    pub async fn run<S>(self, stream: S) -> SessionState
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let node_id = self.node_id();
        match self.exchange(stream).await {
            Ok(()) => SessionState::Completed,
            Err(e) => {
                error!("Session of node {} ({}) failed: {}", node_id, self.peer, e);
                let reason = e.to_string();
                self.coordinator.fail(node_id, reason.clone()).await;
                SessionState::Failed(reason)
            }
        }
    }

    async fn exchange<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let node_id = self.node_id();
        let cancel = &self.registration.cancel;
        let total = self.coordinator.wait_for_total(cancel).await?;
        let rows = partition(&self.dataset, total, node_id.partition_index());

        self.coordinator
            .transition(node_id, SessionState::Sending)
            .await;
        let (reader, writer) = io::split(stream);
        let mut writer = FramedWrite::new(writer, LineCodec::<Row>::new());
        let sent = send_records(&mut writer, rows.iter().cloned(), self.io_timeout, cancel).await?;
        info!("Sent {} rows to node {} ({})", sent, node_id, self.peer);

        self.coordinator
            .transition(node_id, SessionState::AwaitingResult)
            .await;
        let mut reader = FramedRead::new(reader, LineCodec::<ScoreRecord>::new());
        let records = receive_records(&mut reader, self.io_timeout, cancel, &self.peer).await?;
        info!(
            "Received {} scores from node {} ({})",
            records.len(),
            node_id,
            self.peer
        );

        let partial = PartialResult::from_records(node_id, records);
        if let Some(aggregated) = self.coordinator.submit(partial).await? {
            info!("Node {} completed the run:\n{}", node_id, aggregated);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ::std::num::NonZeroUsize;

    use ::shardrank_common::{
        anyhow::anyhow,
        error::ShardRankError,
        tokio::{
            self,
            io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        },
    };

    use super::*;
    use crate::coordinator::spawn_coordinator;

    const TIMEOUT: Duration = Duration::from_millis(200);

    fn dataset() -> Arc<[Row]> {
        (1..=4)
            .map(|i| {
                [
                    format!("r{}", i),
                    "u".to_owned(),
                    format!("P{}", i),
                    "t".to_owned(),
                    i.to_string(),
                ]
                .into_iter()
                .collect::<Row>()
            })
            .collect()
    }

    async fn single_session(
        coordinator: &CoordinatorHandle,
    ) -> Result<(WorkerSession, Registration)> {
        let registration = coordinator.register().await?.ok_or_else(|| {
            ShardRankError::not_allowed(anyhow!("registration closed"))
        })?;
        let session = WorkerSession::new(
            registration.clone(),
            coordinator.clone(),
            dataset(),
            TIMEOUT,
            "test".to_owned(),
        );
        Ok((session, registration))
    }

    #[tokio::test]
    async fn completed_session() -> Result<()> {
        let coordinator = spawn_coordinator(NonZeroUsize::new(1).unwrap());
        let (session, _) = single_session(&coordinator).await?;
        let (worker, master) = tokio::io::duplex(1024);

        let worker = tokio::spawn(async move {
            let (reader, mut writer) = tokio::io::split(worker);
            let mut lines = BufReader::new(reader).lines();
            let mut received = vec![];
            while let Some(line) = lines.next_line().await? {
                if line == "END" {
                    break;
                }
                received.push(line);
            }
            writer.write_all(b"P4,4.00\nP1,1.00\nEND\n").await?;
            Ok::<_, std::io::Error>(received)
        });

        assert_eq!(session.run(master).await, SessionState::Completed);
        let received = worker.await.expect("worker task panicked")?;
        assert_eq!(received.len(), 4);
        assert_eq!(received[0], "r1,u,P1,t,1");

        let aggregated = coordinator.wait_for_aggregation().await?;
        let top = aggregated.get(NodeId::first()).unwrap_or_default();
        assert_eq!(top[0].product_id, "P4");
        Ok(())
    }

    #[tokio::test]
    async fn stalled_worker_fails_the_session() -> Result<()> {
        let coordinator = spawn_coordinator(NonZeroUsize::new(1).unwrap());
        let (session, registration) = single_session(&coordinator).await?;
        // large enough to take the whole partition, the worker never answers
        let (_worker, master) = tokio::io::duplex(64 * 1024);

        let state = session.run(master).await;
        assert!(matches!(&state, SessionState::Failed(reason) if reason.starts_with("IO timeout")));
        let sessions = coordinator.sessions().await?;
        assert_eq!(sessions, vec![(registration.node_id, state)]);
        assert!(coordinator.aggregated().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn aborted_session() -> Result<()> {
        let coordinator = spawn_coordinator(NonZeroUsize::new(1).unwrap());
        let (session, registration) = single_session(&coordinator).await?;
        let (_worker, master) = tokio::io::duplex(64 * 1024);

        let running = tokio::spawn(session.run(master));
        coordinator.abort(registration.node_id).await?;
        let state = running.await.expect("session task panicked");
        assert!(matches!(state, SessionState::Failed(reason) if reason.starts_with("Cancelled")));
        Ok(())
    }
}
