//! Splitting a dataset into contiguous chunks, one per node.

use ::std::num::NonZeroUsize;

/// Size of every chunk but possibly the last one: `ceil(len / nodes)`.
pub fn chunk_size(len: usize, nodes: NonZeroUsize) -> usize {
    len.div_ceil(nodes.get())
}

/// The chunk of `dataset` owned by the node at zero-based `index` out of `nodes`.
/// Chunks are contiguous and disjoint, and concatenating them in index order
/// rebuilds `dataset`. An index past the data yields an empty chunk.
pub fn partition<T>(dataset: &[T], nodes: NonZeroUsize, index: usize) -> &[T] {
    let chunk = chunk_size(dataset.len(), nodes);
    let start = index.saturating_mul(chunk).min(dataset.len());
    let end = start.saturating_add(chunk).min(dataset.len());
    &dataset[start..end]
}
