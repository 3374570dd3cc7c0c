//! Ranking the partial results once every node has reported.

use ::core::fmt::Display;
use ::std::collections::{BTreeMap, HashSet};

use ::shardrank_common::node::{rank_order, NodeId, PartialResult, ProductId, RankedProduct};

/// Length of the ranked list kept per node.
pub const TOP_N: usize = 5;

/// Top ranked products of every node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregatedResult {
    ranked: BTreeMap<NodeId, Vec<RankedProduct>>,
}

impl AggregatedResult {
    pub fn get(&self, node_id: NodeId) -> Option<&[RankedProduct]> {
        self.ranked.get(&node_id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Vec<RankedProduct>)> {
        self.ranked.iter()
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Best products over all nodes, excluding `product_id`.
    /// A product ranked by several nodes counts once with its best score.
    pub fn recommend(&self, product_id: &str, limit: usize) -> Vec<ProductId> {
        let mut candidates: Vec<&RankedProduct> = self
            .ranked
            .values()
            .flatten()
            .filter(|product| product.product_id != product_id)
            .collect();
        candidates.sort_by(|a, b| rank_order(a, b));
        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|product| seen.insert(product.product_id.as_str()))
            .take(limit)
            .map(|product| product.product_id.clone())
            .collect()
    }
}

impl Display for AggregatedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (node_id, products) in &self.ranked {
            let products: Vec<String> = products.iter().map(ToString::to_string).collect();
            writeln!(f, "node {}: [{}]", node_id, products.join(", "))?;
        }
        Ok(())
    }
}

/// Rank the scores of one node and keep the first `limit`.
pub fn rank(scores: &BTreeMap<ProductId, f64>, limit: usize) -> Vec<RankedProduct> {
    let mut products: Vec<RankedProduct> = scores
        .iter()
        .map(|(product_id, score)| RankedProduct::new(product_id.clone(), *score))
        .collect();
    products.sort_by(rank_order);
    products.truncate(limit);
    products
}

/// Rank every node independently. Pure for a given snapshot.
pub fn aggregate(results: &BTreeMap<NodeId, PartialResult>) -> AggregatedResult {
    let ranked = results
        .iter()
        .map(|(node_id, partial)| (*node_id, rank(partial.scores(), TOP_N)))
        .collect();
    AggregatedResult { ranked }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64) -> NodeId {
        NodeId::new(id).unwrap()
    }

    fn partial(id: u64, scores: &[(&str, f64)]) -> PartialResult {
        PartialResult::new(
            node(id),
            scores
                .iter()
                .map(|(product, score)| (product.to_string(), *score))
                .collect(),
        )
    }

    fn snapshot() -> BTreeMap<NodeId, PartialResult> {
        [
            partial(1, &[("P1", 0.2), ("P2", 0.4), ("P3", 0.6)]),
            partial(
                2,
                &[
                    ("A", 1.0),
                    ("B", 7.0),
                    ("C", 3.0),
                    ("D", 7.0),
                    ("E", 2.0),
                    ("F", 9.0),
                    ("G", 0.5),
                ],
            ),
            partial(3, &[]),
        ]
        .into_iter()
        .map(|partial| (partial.node_id(), partial))
        .collect()
    }

    #[test]
    fn rank_descending() {
        let result = aggregate(&snapshot());
        assert_eq!(
            result.get(node(1)),
            Some(
                &[
                    RankedProduct::new("P3", 0.6),
                    RankedProduct::new("P2", 0.4),
                    RankedProduct::new("P1", 0.2)
                ][..]
            )
        );
    }

    #[test]
    fn truncate_to_top_n_with_ties_by_product_id() {
        let result = aggregate(&snapshot());
        let ids: Vec<&str> = result
            .get(node(2))
            .unwrap()
            .iter()
            .map(|p| p.product_id.as_str())
            .collect();
        assert_eq!(ids, vec!["F", "B", "D", "C", "E"]);
    }

    #[test]
    fn every_list_is_short_and_sorted() {
        let result = aggregate(&snapshot());
        assert_eq!(result.len(), 3);
        for (_, products) in result.iter() {
            assert!(products.len() <= TOP_N);
            assert!(products.windows(2).all(|w| w[0].score >= w[1].score));
        }
        assert_eq!(result.get(node(3)), Some(&[][..]));
    }

    #[test]
    fn aggregate_is_idempotent() {
        let snapshot = snapshot();
        assert_eq!(aggregate(&snapshot), aggregate(&snapshot));
    }

    #[test]
    fn recommend_across_nodes() {
        let result = aggregate(&snapshot());
        assert_eq!(result.recommend("F", 3), vec!["B", "D", "C"]);
        assert_eq!(result.recommend("nothing", 2), vec!["F", "B"]);
    }

    #[test]
    fn recommend_counts_a_product_once() {
        let snapshot: BTreeMap<NodeId, PartialResult> = [
            partial(1, &[("X", 5.0), ("Y", 1.0)]),
            partial(2, &[("X", 3.0), ("Z", 2.0)]),
        ]
        .into_iter()
        .map(|partial| (partial.node_id(), partial))
        .collect();
        assert_eq!(aggregate(&snapshot).recommend("Q", 5), vec!["X", "Z", "Y"]);
    }

    #[test]
    fn display_result() {
        let result = aggregate(&snapshot());
        assert!(result
            .to_string()
            .starts_with("node 1: [P3:0.60, P2:0.40, P1:0.20]\n"));
    }
}
