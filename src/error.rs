/// Errors raised while turning CSV bytes into a table.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("{count} invalid row(s), first at line {first_line}: {reason}")]
    InvalidRows {
        count: usize,
        first_line: u64,
        reason: String,
    },
}

/// Errors raised while grouping a loaded table.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("Cannot aggregate without a {0} column")]
    MissingColumn(&'static str),
}
