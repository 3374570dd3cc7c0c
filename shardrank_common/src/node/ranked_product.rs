use ::core::{cmp::Ordering, fmt::Display};

use ::serde::Serialize;

use super::ProductId;

/// A product with its score, produced while ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedProduct {
    pub product_id: ProductId,
    pub score: f64,
}

impl RankedProduct {
    pub fn new(product_id: impl Into<ProductId>, score: f64) -> Self {
        Self {
            product_id: product_id.into(),
            score,
        }
    }
}

/// Ranking order: higher score first, equal scores by ascending product id.
pub fn rank_order(a: &RankedProduct, b: &RankedProduct) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.product_id.cmp(&b.product_id))
}

impl Display for RankedProduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:.2}", self.product_id, self.score)
    }
}
