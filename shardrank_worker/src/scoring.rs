//! Per product scores computed by a worker over its partition.

use ::std::collections::BTreeMap;

use ::shardrank_common::{
    dataset::{Row, MIN_FIELDS},
    node::ProductId,
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

/// Rating every other rating is compared against by [Scoring::ReferenceCosine].
pub const REFERENCE_RATING: f64 = 5.0;

/// How a worker turns the ratings of a product into its score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "shardrank_common::serde")]
pub enum Scoring {
    /// Sum of every rating of the product in the partition.
    #[default]
    RatingSum,
    /// Cosine similarity between the rating and [REFERENCE_RATING].
    /// The last row of a product decides its score.
    ReferenceCosine,
}

impl Scoring {
    fn accumulate(self, current: Option<f64>, rating: f64) -> f64 {
        match self {
            Self::RatingSum => current.unwrap_or_default() + rating,
            Self::ReferenceCosine => cosine(rating, REFERENCE_RATING),
        }
    }
}

/// Cosine similarity of two one dimensional vectors, 0 when either is null.
fn cosine(a: f64, b: f64) -> f64 {
    let magnitudes = a.abs() * b.abs();
    if magnitudes == 0.0 {
        0.0
    } else {
        a * b / magnitudes
    }
}

/// Score every distinct product of `rows`.
/// Rows too short to hold a rating, or with a rating that is not a number, are skipped.
pub fn compute_scores(rows: &[Row], scoring: Scoring) -> BTreeMap<ProductId, f64> {
    let mut scores = BTreeMap::new();
    for row in rows {
        if row.len() < MIN_FIELDS {
            warn!("Skip row with {} fields: {:?}", row.len(), row.fields());
            continue;
        }
        let (Some(product_id), Some(rating)) = (row.product_id(), row.rating()) else {
            warn!("Skip row with an invalid rating: {:?}", row.fields());
            continue;
        };
        let score = scoring.accumulate(scores.get(product_id).copied(), rating);
        debug!("{} scored {} after rating {}", product_id, score, rating);
        scores.insert(product_id.to_owned(), score);
    }
    scores
}
