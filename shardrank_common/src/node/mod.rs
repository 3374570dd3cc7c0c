mod node_id;
mod partial_result;
mod ranked_product;

pub use node_id::NodeId;
pub use partial_result::PartialResult;
pub use ranked_product::{rank_order, RankedProduct};

/// Product identifier as it appears in the dataset.
pub type ProductId = String;
