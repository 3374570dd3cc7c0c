use ::anyhow::anyhow;

use super::FIELD_SEPARATOR;
use crate::{
    dataset::Row,
    error::{Result, ShardRankError},
    node::ProductId,
};

/// A record that travels as a single line.
pub trait WireRecord: Sized {
    /// Render the record without the trailing newline.
    fn encode(&self) -> String;

    /// Parse a line without its trailing newline.
    fn decode(line: &str) -> Result<Self>;
}

/// Dataset rows are sent with their fields joined by commas.
/// Any line is a valid row, so decoding never fails.
impl WireRecord for Row {
    fn encode(&self) -> String {
        self.fields().join(&FIELD_SEPARATOR.to_string())
    }

    fn decode(line: &str) -> Result<Self> {
        Ok(line.split(FIELD_SEPARATOR).collect())
    }
}

/// Score of one product computed by a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub product_id: ProductId,
    pub score: f64,
}

impl ScoreRecord {
    pub fn new(product_id: impl Into<ProductId>, score: f64) -> Self {
        Self {
            product_id: product_id.into(),
            score,
        }
    }
}

impl WireRecord for ScoreRecord {
    fn encode(&self) -> String {
        format!("{}{}{:.2}", self.product_id, FIELD_SEPARATOR, self.score)
    }

    fn decode(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        match fields.as_slice() {
            [product_id, score] => {
                let score = score
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|score| score.is_finite())
                    .ok_or_else(|| {
                        ShardRankError::not_allowed(anyhow!("invalid score {:?}", score))
                    })?;
                Ok(Self::new(*product_id, score))
            }
            _ => Err(ShardRankError::not_allowed(anyhow!(
                "expected 2 fields, found {}",
                fields.len()
            ))),
        }
    }
}
