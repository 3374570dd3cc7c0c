use ::std::collections::BTreeMap;

use super::{NodeId, ProductId};
use crate::protocol::ScoreRecord;

/// Scores computed by one worker for the products of its partition.
/// Created once per node when its response stream is complete and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialResult {
    node_id: NodeId,
    scores: BTreeMap<ProductId, f64>,
}

impl PartialResult {
    pub fn new(node_id: NodeId, scores: BTreeMap<ProductId, f64>) -> Self {
        Self { node_id, scores }
    }

    /// Collect decoded response records; a product repeated in the stream keeps its last score.
    pub fn from_records(node_id: NodeId, records: impl IntoIterator<Item = ScoreRecord>) -> Self {
        let scores = records
            .into_iter()
            .map(|record| (record.product_id, record.score))
            .collect();
        Self { node_id, scores }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn scores(&self) -> &BTreeMap<ProductId, f64> {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
