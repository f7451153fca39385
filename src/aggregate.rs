use crate::csv_processor;
use crate::error::AggregationError;
use crate::period::{Period, PeriodBucket};

/// A single aggregated row: one per distinct bucket present in the input.
///
/// Averages are `None` when every value of that column in the bucket was null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateRow {
    pub bucket: PeriodBucket,
    pub avg_opening: Option<f64>,
    pub avg_closing: Option<f64>,
    pub row_count: usize,
}

/// Aggregated rows for one period, sorted ascending by bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    pub period: Period,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total number of input rows accounted for across all buckets.
    pub fn total_rows(&self) -> usize {
        self.rows.iter().map(|r| r.row_count).sum()
    }
}

/// Running sum/count of non-null values.
#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug, Default)]
struct BucketAccumulator {
    opening: Mean,
    closing: Mean,
    rows: usize,
}

/// Groups a table by period bucket and averages opening and closing prices.
///
/// For every record the bucket is derived from its date (see
/// [`Period::bucket_for`]); within each bucket the arithmetic mean of the
/// opening and closing prices is computed over non-null values only.
///
/// # Arguments
/// * `table` - Loaded stock records.
/// * `period` - Granularity of the buckets.
///
/// # Returns
/// * `AggregateTable` with one row per bucket, sorted by bucket. An empty
///   table yields an empty result.
///
/// # Errors
/// * `AggregationError::MissingColumn` if the source had no opening or no
///   closing price column at all.
pub fn aggregate(
    table: &csv_processor::Table,
    period: Period,
) -> Result<AggregateTable, AggregationError> {
    if !table.columns.opening_price {
        return Err(AggregationError::MissingColumn(csv_processor::SCHEMA[2]));
    }
    if !table.columns.closing_price {
        return Err(AggregationError::MissingColumn(csv_processor::SCHEMA[1]));
    }

    if table.is_empty() {
        return Ok(AggregateTable {
            period,
            rows: Vec::new(),
        });
    }

    let mut groups: std::collections::HashMap<PeriodBucket, BucketAccumulator> =
        std::collections::HashMap::new();

    for record in &table.records {
        let acc = groups.entry(period.bucket_for(record.date)).or_default();
        acc.opening.push(record.opening_price);
        acc.closing.push(record.closing_price);
        acc.rows += 1;
    }

    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(bucket, acc)| AggregateRow {
            bucket,
            avg_opening: acc.opening.value(),
            avg_closing: acc.closing.value(),
            row_count: acc.rows,
        })
        .collect();
    rows.sort_by_key(|r| r.bucket);

    tracing::debug!(%period, buckets = rows.len(), records = table.len(), "aggregated");

    Ok(AggregateTable { period, rows })
}
