use crate::aggregate;
use crate::csv_processor;
use crate::file_processing;
use crate::progress;

/// Configures a custom Rayon thread pool with specified size.
///
/// # Arguments
/// * `num_threads` - Desired number of threads for the pool.
///
/// # Returns
/// * `Result<ThreadPool>` - Created thread pool or an error if creation fails.
pub fn configure_thread_pool(num_threads: usize) -> anyhow::Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))
}

/// Formats an average with two decimals, or `null_repr` when there is none.
pub fn format_average(value: Option<f64>, null_repr: &str) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => null_repr.to_string(),
    }
}

/// Cells of one aggregate row, in header order.
pub fn row_fields(row: &aggregate::AggregateRow, null_repr: &str) -> Vec<String> {
    let mut fields = row.bucket.key_fields();
    fields.push(format_average(row.avg_opening, null_repr));
    fields.push(format_average(row.avg_closing, null_repr));
    fields
}

/// Renders an aggregate table as right-aligned text columns.
///
/// # Example Output
/// ```text
///  Year Month Avg_Ouverture Avg_Fermeture
///  2023     1         15.00         17.00
/// ```
pub fn render_table(table: &aggregate::AggregateTable) -> String {
    let headers = table.period.headers();
    let rows: Vec<Vec<String>> = table.rows.iter().map(|r| row_fields(r, "null")).collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].len())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = format_line(headers, &widths);
    out.push('\n');
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&format_line(&cells, &widths));
        out.push('\n');
    }
    out
}

fn format_line(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!(" {:>w$}", c, w = *w))
        .collect()
}

/// Prints every table of a report to stdout.
pub fn print_report(report: &progress::FileReport) {
    println!(
        "📄 {} ({} rows, {} skipped, {} null cells)",
        report.path.display(),
        report.rows,
        report.skipped_rows,
        report.null_cells
    );
    for table in &report.tables {
        println!("Average Opening and Closing Prices ({})", table.period);
        if table.is_empty() {
            println!(" (no data)");
        } else {
            print!("{}", render_table(table));
        }
    }
}

/// Writes an aggregate table as CSV. Null averages become empty fields.
pub fn write_table_csv<W: std::io::Write>(
    writer: W,
    table: &aggregate::AggregateTable,
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.period.headers())?;
    for row in &table.rows {
        wtr.write_record(row_fields(row, ""))?;
    }
    wtr.flush()?;
    anyhow::Ok(())
}

/// Writes load diagnostics as CSV (`line,kind,column,reason`).
pub fn write_diagnostics_csv<W: std::io::Write>(
    writer: W,
    diagnostics: &[csv_processor::RowDiagnostic],
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for diag in diagnostics {
        wtr.serialize(diag.to_record())?;
    }
    wtr.flush()?;
    anyhow::Ok(())
}

/// Writes one CSV file per table of `report` into `output_dir`, plus a
/// `<stem>_diagnostics.csv` file when rows were skipped or coerced.
///
/// # Returns
/// * `anyhow::Result<Vec<PathBuf>>` - Paths of the written files.
pub fn write_report_csv(
    report: &progress::FileReport,
    output_dir: &std::path::Path,
) -> anyhow::Result<Vec<std::path::PathBuf>> {
    let mut written = Vec::with_capacity(report.tables.len());
    for table in &report.tables {
        let path = file_processing::output_path_for(output_dir, &report.path, table.period);
        let file = std::fs::File::create(&path)?;
        write_table_csv(std::io::BufWriter::new(file), table)?;
        tracing::info!(file = %path.display(), rows = table.rows.len(), "written");
        written.push(path);
    }

    if !report.diagnostics.is_empty() {
        let path = file_processing::diagnostics_path_for(output_dir, &report.path);
        let file = std::fs::File::create(&path)?;
        write_diagnostics_csv(std::io::BufWriter::new(file), &report.diagnostics)?;
        tracing::info!(file = %path.display(), rows = report.diagnostics.len(), "written");
        written.push(path);
    }
    anyhow::Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregateRow, AggregateTable};
    use crate::period::{Period, PeriodBucket};

    fn monthly_table() -> AggregateTable {
        AggregateTable {
            period: Period::Monthly,
            rows: vec![
                AggregateRow {
                    bucket: PeriodBucket::Monthly { year: 2023, month: 1 },
                    avg_opening: Some(15.0),
                    avg_closing: Some(17.0),
                    row_count: 2,
                },
                AggregateRow {
                    bucket: PeriodBucket::Monthly { year: 2023, month: 2 },
                    avg_opening: None,
                    avg_closing: Some(3.333333),
                    row_count: 1,
                },
            ],
        }
    }

    #[test]
    fn test_format_average() {
        assert_eq!(format_average(Some(15.0), "null"), "15.00");
        assert_eq!(format_average(None, "null"), "null");
    }

    #[test]
    fn test_render_table() {
        let rendered = render_table(&monthly_table());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], " Year Month Avg_Ouverture Avg_Fermeture");
        assert_eq!(lines[1], " 2023     1         15.00         17.00");
        assert_eq!(lines[2], " 2023     2          null          3.33");
    }

    #[test]
    fn test_write_table_csv() {
        let mut buf = Vec::new();
        write_table_csv(&mut buf, &monthly_table()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Year,Month,Avg_Ouverture,Avg_Fermeture\n2023,1,15.00,17.00\n2023,2,,3.33\n"
        );
    }

    #[test]
    fn test_write_diagnostics_csv() {
        let loaded = csv_processor::load(
            b"Date,Fermeture,Ouverture,Max,Min\nbad,1,1,1,1\n01/02/2023,x,1,1,1\n",
        )
        .unwrap();
        let mut buf = Vec::new();
        write_diagnostics_csv(&mut buf, &loaded.diagnostics).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "line,kind,column,reason");
        assert!(lines[1].starts_with("2,skipped_row,,"));
        assert!(lines[2].starts_with("3,null_cell,Fermeture,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_yearly_csv_has_no_sub_period_column() {
        let table = AggregateTable {
            period: Period::Yearly,
            rows: vec![AggregateRow {
                bucket: PeriodBucket::Yearly { year: 2022 },
                avg_opening: Some(1.0),
                avg_closing: Some(2.0),
                row_count: 1,
            }],
        };
        let mut buf = Vec::new();
        write_table_csv(&mut buf, &table).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Year,Avg_Ouverture,Avg_Fermeture\n2022,1.00,2.00\n"
        );
    }
}
