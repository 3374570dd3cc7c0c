//! Partial results received from the workers and the completion barrier.

use ::std::collections::BTreeMap;

use ::shardrank_common::{
    anyhow::anyhow,
    error::{Result, ShardRankError},
    node::{NodeId, PartialResult},
};

use crate::aggregator::{aggregate, AggregatedResult};

/// Partial results keyed by node, with the completion counter.
/// The counter always equals the number of stored results, and the
/// aggregator runs exactly once: when the counter first reaches the threshold.
#[derive(Debug, Default)]
pub struct ResultStore {
    results: BTreeMap<NodeId, PartialResult>,
    completed: usize,
    /// Number of nodes the barrier waits for, unknown until registration closes.
    threshold: Option<usize>,
    aggregation_runs: usize,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            threshold: Some(threshold),
            ..Self::default()
        }
    }

    /// Fix the barrier threshold. It can only be set once.
    pub fn set_threshold(&mut self, threshold: usize) -> Result<Option<AggregatedResult>> {
        if let Some(current) = self.threshold {
            return Err(ShardRankError::not_allowed(anyhow!(
                "threshold already set to {}",
                current
            )));
        }
        self.threshold = Some(threshold);
        Ok(self.try_aggregate())
    }

    /// Store the result of a node and count it as completed.
    /// Returns the aggregated result if this completion satisfies the barrier.
    pub fn record(&mut self, partial: PartialResult) -> Result<Option<AggregatedResult>> {
        let node_id = partial.node_id();
        if self.results.contains_key(&node_id) {
            return Err(ShardRankError::not_allowed(anyhow!(
                "node {} already submitted its result",
                node_id
            )));
        }
        if let Some(threshold) = self.threshold {
            if node_id.partition_index() >= threshold {
                return Err(ShardRankError::not_allowed(anyhow!(
                    "node {} is not part of a run of {} nodes",
                    node_id,
                    threshold
                )));
            }
        }
        self.results.insert(node_id, partial);
        self.completed += 1;
        Ok(self.try_aggregate())
    }

    fn try_aggregate(&mut self) -> Option<AggregatedResult> {
        match self.threshold {
            Some(threshold) if self.aggregation_runs == 0 && self.completed == threshold => {
                self.aggregation_runs += 1;
                Some(aggregate(&self.results))
            }
            _ => None,
        }
    }

    pub fn get(&self, node_id: NodeId) -> Option<&PartialResult> {
        self.results.get(&node_id)
    }

    pub fn results(&self) -> &BTreeMap<NodeId, PartialResult> {
        &self.results
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn threshold(&self) -> Option<usize> {
        self.threshold
    }

    pub fn aggregation_runs(&self) -> usize {
        self.aggregation_runs
    }
}
