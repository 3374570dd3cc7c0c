//! The coordinator owns every piece of shared run state: the node identity
//! generator, the session registry and the [ResultStore].
//! It runs as a single task and is reached through a [CoordinatorHandle],
//! so all mutations are serialized without locks.

use ::std::{collections::BTreeMap, num::NonZeroUsize, sync::Arc};

use ::shardrank_common::{
    anyhow::anyhow,
    error::{Result, ShardRankError},
    node::{NodeId, PartialResult, ProductId},
    tokio::{
        self,
        sync::{mpsc, oneshot, watch},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{aggregator::AggregatedResult, session::SessionState, store::ResultStore};

/// Number of recommendations returned by [CoordinatorHandle::recommend].
pub const RECOMMENDATION_LIMIT: usize = 5;

const COMMAND_QUEUE_CAPACITY: usize = 64;

/// What a newly accepted connection gets from the coordinator.
#[derive(Debug, Clone)]
pub struct Registration {
    pub node_id: NodeId,
    /// Fires when the session is aborted or the coordinator shuts down.
    pub cancel: CancellationToken,
}

enum Command {
    Register {
        respond_to: oneshot::Sender<Option<Registration>>,
    },
    CloseRegistration {
        respond_to: oneshot::Sender<Option<NonZeroUsize>>,
    },
    Transition {
        node_id: NodeId,
        state: SessionState,
    },
    Submit {
        partial: PartialResult,
        respond_to: oneshot::Sender<Result<Option<AggregatedResult>>>,
    },
    Fail {
        node_id: NodeId,
        reason: String,
    },
    Abort {
        node_id: NodeId,
        respond_to: oneshot::Sender<bool>,
    },
    Sessions {
        respond_to: oneshot::Sender<Vec<(NodeId, SessionState)>>,
    },
}

struct SessionEntry {
    state: SessionState,
    cancel: CancellationToken,
}

struct Coordinator {
    store: ResultStore,
    next_node_id: NodeId,
    max_workers: NonZeroUsize,
    registration_open: bool,
    sessions: BTreeMap<NodeId, SessionEntry>,
    root_cancel: CancellationToken,
    total: watch::Sender<Option<NonZeroUsize>>,
    aggregated: watch::Sender<Option<Arc<AggregatedResult>>>,
}

impl Coordinator {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        debug!("Coordinator stopped, no handle left");
    }

    fn handle(&mut self, command: Command) {
        // a dropped receiver means the caller gave up waiting, nothing to do
        match command {
            Command::Register { respond_to } => {
                let _ = respond_to.send(self.register());
            }
            Command::CloseRegistration { respond_to } => {
                let _ = respond_to.send(self.close_registration());
            }
            Command::Transition { node_id, state } => self.transition(node_id, state),
            Command::Submit {
                partial,
                respond_to,
            } => {
                let _ = respond_to.send(self.submit(partial));
            }
            Command::Fail { node_id, reason } => {
                self.transition(node_id, SessionState::Failed(reason));
                if self.store.aggregation_runs() == 0 {
                    warn!("Node {} failed, the run cannot be aggregated", node_id);
                }
            }
            Command::Abort {
                node_id,
                respond_to,
            } => {
                let found = match self.sessions.get(&node_id) {
                    Some(entry) => {
                        entry.cancel.cancel();
                        true
                    }
                    None => false,
                };
                let _ = respond_to.send(found);
            }
            Command::Sessions { respond_to } => {
                let sessions = self
                    .sessions
                    .iter()
                    .map(|(node_id, entry)| (*node_id, entry.state.clone()))
                    .collect();
                let _ = respond_to.send(sessions);
            }
        }
    }

    fn register(&mut self) -> Option<Registration> {
        if !self.registration_open {
            return None;
        }
        let node_id = self.next_node_id;
        self.next_node_id = node_id.next();
        let cancel = self.root_cancel.child_token();
        self.sessions.insert(
            node_id,
            SessionEntry {
                state: SessionState::Connected,
                cancel: cancel.clone(),
            },
        );
        info!("Register node {}", node_id);
        if self.sessions.len() == self.max_workers.get() {
            self.close_registration();
        }
        Some(Registration { node_id, cancel })
    }

    /// Fix the barrier threshold to the number of registered workers.
    /// Registration stays open while nobody has registered.
    fn close_registration(&mut self) -> Option<NonZeroUsize> {
        if !self.registration_open {
            return *self.total.borrow();
        }
        let total = NonZeroUsize::new(self.sessions.len())?;
        self.registration_open = false;
        info!("Registration closed with {} workers", total);
        match self.store.set_threshold(total.get()) {
            Ok(Some(aggregated)) => self.publish(aggregated),
            Ok(None) => {}
            Err(e) => error!("Cannot set the completion threshold: {}", e),
        }
        self.total.send_replace(Some(total));
        Some(total)
    }

    fn transition(&mut self, node_id: NodeId, state: SessionState) {
        match self.sessions.get_mut(&node_id) {
            Some(entry) if entry.state.is_terminal() => {
                warn!(
                    "Node {} is already {:?}, ignore transition to {:?}",
                    node_id, entry.state, state
                );
            }
            Some(entry) => {
                debug!("Node {}: {:?} -> {:?}", node_id, entry.state, state);
                entry.state = state;
            }
            None => warn!("Transition of unknown node {}", node_id),
        }
    }

    fn submit(&mut self, partial: PartialResult) -> Result<Option<AggregatedResult>> {
        let node_id = partial.node_id();
        match self.sessions.get(&node_id).map(|entry| &entry.state) {
            Some(SessionState::AwaitingResult) => {}
            Some(state) => {
                return Err(ShardRankError::not_allowed(anyhow!(
                    "node {} cannot submit in state {:?}",
                    node_id,
                    state
                )))
            }
            None => {
                return Err(ShardRankError::not_allowed(anyhow!(
                    "node {} is not registered",
                    node_id
                )))
            }
        }
        let aggregated = self.store.record(partial)?;
        self.transition(node_id, SessionState::Completed);
        info!(
            "Node {} completed ({} of {:?})",
            node_id,
            self.store.completed(),
            self.store.threshold()
        );
        if let Some(aggregated) = &aggregated {
            self.publish(aggregated.clone());
        }
        Ok(aggregated)
    }

    fn publish(&mut self, aggregated: AggregatedResult) {
        info!("All workers completed, results aggregated");
        self.aggregated.send_replace(Some(Arc::new(aggregated)));
    }
}

/// Cheap to clone handle on the coordinator task.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
    total: watch::Receiver<Option<NonZeroUsize>>,
    aggregated: watch::Receiver<Option<Arc<AggregatedResult>>>,
    root_cancel: CancellationToken,
}

/// Start the coordinator task.
/// Registration closes by itself once `max_workers` connections are registered.
pub fn spawn_coordinator(max_workers: NonZeroUsize) -> CoordinatorHandle {
    let (commands, receiver) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    let (total_tx, total) = watch::channel(None);
    let (aggregated_tx, aggregated) = watch::channel(None);
    let root_cancel = CancellationToken::new();
    let coordinator = Coordinator {
        store: ResultStore::new(),
        next_node_id: NodeId::first(),
        max_workers,
        registration_open: true,
        sessions: BTreeMap::new(),
        root_cancel: root_cancel.clone(),
        total: total_tx,
        aggregated: aggregated_tx,
    };
    tokio::spawn(coordinator.run(receiver));
    CoordinatorHandle {
        commands,
        total,
        aggregated,
        root_cancel,
    }
}

impl CoordinatorHandle {
    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (respond_to, response) = oneshot::channel();
        self.commands
            .send(command(respond_to))
            .await
            .map_err(|_| ShardRankError::coordinator_unavailable(anyhow!("coordinator stopped")))?;
        response
            .await
            .map_err(|_| ShardRankError::coordinator_unavailable(anyhow!("coordinator dropped the request")))
    }

    async fn notify(&self, command: Command) {
        if self.commands.send(command).await.is_err() {
            warn!("Coordinator stopped, notification dropped");
        }
    }

    /// Assign the next node identity to a new connection.
    /// `None` once registration is closed.
    pub async fn register(&self) -> Result<Option<Registration>> {
        self.request(|respond_to| Command::Register { respond_to })
            .await
    }

    /// Close registration now. Returns the number of nodes in the run,
    /// or `None` when nobody has registered yet (registration then stays open).
    pub async fn close_registration(&self) -> Result<Option<NonZeroUsize>> {
        self.request(|respond_to| Command::CloseRegistration { respond_to })
            .await
    }

    /// Wait until registration is closed and return the number of nodes in the run.
    pub async fn wait_for_total(&self, cancel: &CancellationToken) -> Result<NonZeroUsize> {
        let mut total = self.total.clone();
        let total = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ShardRankError::cancelled(anyhow!("session cancelled")))
            }
            changed = total.wait_for(Option::is_some) => changed.map(|total| *total),
        };
        total
            .ok()
            .flatten()
            .ok_or_else(|| ShardRankError::coordinator_unavailable(anyhow!("coordinator stopped")))
    }

    pub async fn transition(&self, node_id: NodeId, state: SessionState) {
        self.notify(Command::Transition { node_id, state }).await
    }

    /// Record the result of a node. Returns the aggregated result
    /// when this submission completes the run.
    pub async fn submit(&self, partial: PartialResult) -> Result<Option<AggregatedResult>> {
        self.request(|respond_to| Command::Submit {
            partial,
            respond_to,
        })
        .await?
    }

    /// Mark a session as failed. Its node never reaches the result store.
    pub async fn fail(&self, node_id: NodeId, reason: String) {
        self.notify(Command::Fail { node_id, reason }).await
    }

    /// Cancel a running session. Returns `false` for an unknown node.
    pub async fn abort(&self, node_id: NodeId) -> Result<bool> {
        self.request(|respond_to| Command::Abort {
            node_id,
            respond_to,
        })
        .await
    }

    /// Cancel every session.
    pub fn shutdown(&self) {
        self.root_cancel.cancel();
    }

    /// Snapshot of the session registry.
    pub async fn sessions(&self) -> Result<Vec<(NodeId, SessionState)>> {
        self.request(|respond_to| Command::Sessions { respond_to })
            .await
    }

    pub fn aggregated(&self) -> Option<Arc<AggregatedResult>> {
        self.aggregated.borrow().clone()
    }

    pub async fn wait_for_aggregation(&self) -> Result<Arc<AggregatedResult>> {
        let mut aggregated = self.aggregated.clone();
        aggregated
            .wait_for(Option::is_some)
            .await
            .map(|aggregated| aggregated.clone())
            .ok()
            .flatten()
            .ok_or_else(|| ShardRankError::coordinator_unavailable(anyhow!("coordinator stopped")))
    }

    /// Products to recommend for `product_id`, empty until the run is aggregated.
    pub fn recommend(&self, product_id: &str) -> Vec<ProductId> {
        self.aggregated
            .borrow()
            .as_ref()
            .map(|aggregated| aggregated.recommend(product_id, RECOMMENDATION_LIMIT))
            .unwrap_or_default()
    }
}
