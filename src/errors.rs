use thiserror::Error;

use crate::models::YearMonth;

/// Errors that abort an analysis run.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("Input validation failed: {0} is empty")]
    InputValidation(&'static str),

    #[error("Embedding service error: {0:#}")]
    EmbeddingService(anyhow::Error),

    #[error("Invalid vocabulary pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A date fragment the parser could not turn into a valid range.
///
/// Never escapes the entry extractor; résumé text is noisy and an
/// unparseable fragment simply produces no entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DateParseError {
    #[error("No recognized date range in {0:?}")]
    NoMatch(String),

    #[error("Date range starts after it ends ({start} > {end})")]
    Inverted { start: YearMonth, end: YearMonth },

    #[error("Month {0} is out of range")]
    InvalidMonth(u32),
}
