//! Loading the tabular dataset the master splits among workers.

use ::std::path::Path;

use ::anyhow::anyhow;

use crate::error::{Result, ShardRankError};

/// Column holding the product identifier.
pub const PRODUCT_ID_FIELD: usize = 2;
/// Column holding the rating value.
pub const RATING_FIELD: usize = 4;
/// Rows shorter than this cannot be scored.
pub const MIN_FIELDS: usize = 5;

/// One dataset row, an ordered list of string fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row(Vec<String>);

impl Row {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `None` when the row is too short to carry a product identifier.
    pub fn product_id(&self) -> Option<&str> {
        self.0.get(PRODUCT_ID_FIELD).map(String::as_str)
    }

    /// The rating parsed on demand.
    /// `None` when the field is missing or is not a finite number.
    pub fn rating(&self) -> Option<f64> {
        self.0
            .get(RATING_FIELD)
            .and_then(|field| field.trim().parse::<f64>().ok())
            .filter(|rating| rating.is_finite())
    }
}

impl From<Vec<String>> for Row {
    fn from(fields: Vec<String>) -> Self {
        Self(fields)
    }
}

impl<S: Into<String>> FromIterator<S> for Row {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Load a csv file with a header row into memory.
/// The header is skipped. Rows of any width are kept, short rows are skipped later by the worker.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<Row>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| {
            ShardRankError::fail_to_load_dataset(anyhow!("cannot open {}: {}", path.display(), e))
        })?;
    reader
        .records()
        .map(|record| {
            record
                .map(|record| record.iter().collect::<Row>())
                .map_err(ShardRankError::fail_to_load_dataset)
        })
        .collect()
}
