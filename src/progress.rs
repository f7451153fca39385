use crate::aggregate;
use crate::cache;
use crate::csv_processor;
use crate::file_processing;
use crate::period::Period;

use anyhow::Context;
use rayon::prelude::*;

/// Outcome of processing one input file.
#[derive(Debug)]
pub struct FileReport {
    pub path: std::path::PathBuf,
    pub rows: usize,
    pub skipped_rows: usize,
    pub null_cells: usize,
    pub diagnostics: Vec<csv_processor::RowDiagnostic>,
    pub tables: Vec<aggregate::AggregateTable>,
}

/// Options shared by every file of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub periods: Vec<Period>,
    pub strict: bool,
}

/// Loads and aggregates one file.
///
/// The file is memory-mapped, loaded through `cache` and aggregated once per
/// requested period; the cached table is reused across periods.
///
/// # Errors
/// * File I/O, CSV, strict-mode validation or aggregation failures.
pub fn process_file<P: AsRef<std::path::Path>>(
    path: P,
    options: &RunOptions,
    cache: &cache::TableCache,
) -> anyhow::Result<FileReport> {
    let path = path.as_ref();
    let bytes = file_processing::read_input(path)?;
    let loaded = cache
        .get_or_load(&bytes)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    for diag in &loaded.diagnostics {
        match diag.kind {
            csv_processor::DiagnosticKind::SkippedRow => {
                tracing::warn!(file = %path.display(), line = diag.line, "skipped row: {}", diag.reason)
            }
            csv_processor::DiagnosticKind::NullCell { column } => {
                tracing::warn!(file = %path.display(), line = diag.line, column, "null cell: {}", diag.reason)
            }
        }
    }
    if options.strict {
        loaded
            .ensure_clean()
            .with_context(|| format!("Strict mode rejected {}", path.display()))?;
    }

    let skipped_rows = loaded.skipped_rows();
    tracing::info!(
        file = %path.display(),
        rows = loaded.table.len(),
        skipped = skipped_rows,
        "loaded"
    );

    let tables = options
        .periods
        .iter()
        .map(|&period| -> anyhow::Result<aggregate::AggregateTable> {
            let table = aggregate::aggregate(&loaded.table, period)
                .with_context(|| format!("Failed to aggregate {} ({})", path.display(), period))?;
            debug_assert_eq!(table.total_rows(), loaded.table.len());
            Ok(table)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(FileReport {
        path: path.to_path_buf(),
        rows: loaded.table.len(),
        skipped_rows,
        null_cells: loaded.diagnostics.len() - skipped_rows,
        diagnostics: loaded.diagnostics.clone(),
        tables,
    })
}

/// Processes every input file in parallel on the current rayon pool.
///
/// Shows a progress bar on stderr and returns the reports in input order.
/// The first failing file aborts the run.
pub fn process_files(
    inputs: &[std::path::PathBuf],
    options: &RunOptions,
    cache: &cache::TableCache,
) -> anyhow::Result<Vec<FileReport>> {
    let pb = indicatif::ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        indicatif::ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({eta})",
        )?
        .progress_chars("#>-"),
    );

    let reports = inputs
        .par_iter()
        .map(|path| {
            let report = process_file(path, options, cache);
            pb.inc(1);
            report
        })
        .collect::<anyhow::Result<Vec<_>>>();

    pb.finish_and_clear();
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::PeriodBucket;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "stock_period_averages_progress_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const PRICES: &str = "Date,Fermeture,Ouverture,Max,Min\n\
                          01/05/2023,12,10,13,9\n\
                          01/20/2023,22,20,23,19\n\
                          13/45/2023,1,1,1,1\n";

    #[test]
    fn test_process_files_shares_cache_and_keeps_order() {
        let dir = scratch_dir("order");
        let a = dir.join("a.csv");
        let b = dir.join("b.csv");
        std::fs::write(&a, PRICES).unwrap();
        std::fs::write(&b, PRICES).unwrap();

        let cache = cache::TableCache::new();
        let options = RunOptions {
            periods: vec![Period::Monthly, Period::Yearly],
            strict: false,
        };
        let reports = process_files(&[a.clone(), b.clone()], &options, &cache).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].path, a);
        assert_eq!(reports[1].path, b);
        assert_eq!(cache.len(), 1);

        let report = &reports[0];
        assert_eq!(report.rows, 2);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.null_cells, 0);
        assert_eq!(report.diagnostics[0].line, 4);
        assert_eq!(report.tables.len(), 2);
        assert_eq!(
            report.tables[0].rows[0].bucket,
            PeriodBucket::Monthly { year: 2023, month: 1 }
        );
        assert_eq!(report.tables[1].rows[0].avg_closing, Some(17.0));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_strict_mode_rejects_invalid_rows() {
        let dir = scratch_dir("strict");
        let path = dir.join("prices.csv");
        std::fs::write(&path, PRICES).unwrap();

        let options = RunOptions {
            periods: vec![Period::Weekly],
            strict: true,
        };
        let err = process_file(&path, &options, &cache::TableCache::new()).unwrap_err();
        assert!(err.to_string().contains("Strict mode"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_file_yields_empty_tables() {
        let dir = scratch_dir("empty");
        let path = dir.join("empty.csv");
        std::fs::write(&path, "").unwrap();

        let options = RunOptions {
            periods: vec![Period::Yearly],
            strict: true,
        };
        let report = process_file(&path, &options, &cache::TableCache::new()).unwrap();
        assert_eq!(report.rows, 0);
        assert!(report.tables[0].is_empty());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
