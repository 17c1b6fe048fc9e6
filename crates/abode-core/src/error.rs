//! Error types for `abode-core`.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid calendar date {0:?}; expected YYYY-MM-DD")]
  InvalidDate(String),

  #[error("date range starts on {start} but ends earlier, on {end}")]
  InvertedRange { start: NaiveDate, end: NaiveDate },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
