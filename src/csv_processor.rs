use crate::error::LoadError;

/// Column names of the input file, in their positional order.
pub const SCHEMA: [&str; 5] = ["Date", "Fermeture", "Ouverture", "Max", "Min"];

/// Date format of the `Date` column (MM/DD/YYYY).
pub const DATE_FORMAT: &str = "%m/%d/%Y";

const DATE_COL: usize = 0;
const CLOSE_COL: usize = 1;
const OPEN_COL: usize = 2;
const HIGH_COL: usize = 3;
const LOW_COL: usize = 4;

/// One validated row of the input file.
#[derive(Debug, Clone, PartialEq)]
pub struct StockRecord {
    pub date: chrono::NaiveDate,
    pub closing_price: Option<f64>,
    pub opening_price: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
}

/// Which price columns were present in the header of the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPresence {
    pub closing_price: bool,
    pub opening_price: bool,
    pub day_high: bool,
    pub day_low: bool,
}

impl ColumnPresence {
    pub fn all() -> Self {
        ColumnPresence {
            closing_price: true,
            opening_price: true,
            day_high: true,
            day_low: true,
        }
    }
}

/// In-memory table of stock records in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub records: Vec<StockRecord>,
    pub columns: ColumnPresence,
}

impl Table {
    pub fn new(records: Vec<StockRecord>) -> Self {
        Table {
            records,
            columns: ColumnPresence::all(),
        }
    }

    pub fn empty() -> Self {
        Table::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// What happened to a row that did not load cleanly.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    /// The row was dropped because its date did not parse.
    SkippedRow,
    /// The row was kept but one price cell was replaced by null.
    NullCell { column: &'static str },
}

/// A per-row note collected while loading.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDiagnostic {
    /// 1-based line number in the source file.
    pub line: u64,
    pub kind: DiagnosticKind,
    pub reason: String,
}

/// Flat form of a [`RowDiagnostic`] for CSV export.
#[derive(Debug, serde::Serialize)]
pub struct DiagnosticRecord<'a> {
    line: u64,
    kind: &'static str,
    column: Option<&'static str>,
    reason: &'a str,
}

impl RowDiagnostic {
    pub fn to_record(&self) -> DiagnosticRecord<'_> {
        let (kind, column) = match self.kind {
            DiagnosticKind::SkippedRow => ("skipped_row", None),
            DiagnosticKind::NullCell { column } => ("null_cell", Some(column)),
        };
        DiagnosticRecord {
            line: self.line,
            kind,
            column,
            reason: &self.reason,
        }
    }
}

/// Result of a successful load: the table plus every row-level diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub table: Table,
    pub diagnostics: Vec<RowDiagnostic>,
}

impl LoadedTable {
    pub fn skipped_rows(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::SkippedRow)
            .count()
    }

    /// Fails when any row was dropped or coerced.
    pub fn ensure_clean(&self) -> Result<(), LoadError> {
        match self.diagnostics.first() {
            None => Ok(()),
            Some(first) => Err(LoadError::InvalidRows {
                count: self.diagnostics.len(),
                first_line: first.line,
                reason: first.reason.clone(),
            }),
        }
    }
}

/// Resolved positions of the schema columns inside the actual header.
struct ColumnIndex {
    date: usize,
    close: Option<usize>,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
}

/// Finds a schema column by name, falling back to its fixed position when the
/// header cell there is not claimed by another schema name.
fn resolve_column(headers: &[String], schema_pos: usize) -> Option<usize> {
    let name = SCHEMA[schema_pos];
    if let Some(i) = headers.iter().position(|h| h.eq_ignore_ascii_case(name)) {
        return Some(i);
    }
    let fallback = headers.get(schema_pos)?;
    let claimed = SCHEMA.iter().any(|s| fallback.eq_ignore_ascii_case(s));
    (!claimed).then_some(schema_pos)
}

fn resolve_columns(headers: &[String]) -> Result<ColumnIndex, LoadError> {
    let date = resolve_column(headers, DATE_COL).ok_or(LoadError::MissingColumn(SCHEMA[DATE_COL]))?;
    Ok(ColumnIndex {
        date,
        close: resolve_column(headers, CLOSE_COL),
        open: resolve_column(headers, OPEN_COL),
        high: resolve_column(headers, HIGH_COL),
        low: resolve_column(headers, LOW_COL),
    })
}

/// Parses an `MM/DD/YYYY` date cell.
pub fn parse_date(raw: &str) -> Result<chrono::NaiveDate, chrono::ParseError> {
    chrono::NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
}

/// Decodes one cell as UTF-8. Missing cells (short rows) are `None`.
fn cell(record: &csv::ByteRecord, col: usize) -> Option<Result<&str, std::str::Utf8Error>> {
    record.get(col).map(std::str::from_utf8)
}

/// Reads one price cell. Empty cells are null; unparseable or non-UTF-8 cells
/// are null and produce a diagnostic.
fn parse_price(
    record: &csv::ByteRecord,
    col: Option<usize>,
    schema_pos: usize,
    line: u64,
    diagnostics: &mut Vec<RowDiagnostic>,
) -> Option<f64> {
    let name = SCHEMA[schema_pos];
    let reason = match cell(record, col?)? {
        Ok(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            match raw.parse::<f64>() {
                Ok(v) => return Some(v),
                Err(e) => format!("{} value '{}': {}", name, raw, e),
            }
        }
        Err(e) => format!("{} value is not valid UTF-8: {}", name, e),
    };
    diagnostics.push(RowDiagnostic {
        line,
        kind: DiagnosticKind::NullCell { column: name },
        reason,
    });
    None
}

/// Processes CSV records into validated stock records.
///
/// Rows whose date does not parse are dropped and reported; price cells that
/// do not parse are nulled and reported. The row count of the returned table
/// plus the number of skipped rows equals the number of data rows read.
fn process_csv_records<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    columns: &ColumnIndex,
) -> Result<(Vec<StockRecord>, Vec<RowDiagnostic>), LoadError> {
    let mut records = Vec::new();
    let mut diagnostics = Vec::new();

    for result in reader.byte_records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());

        let parsed = match cell(&record, columns.date).unwrap_or(Ok("")) {
            Ok(raw) => parse_date(raw).map_err(|e| format!("Date value '{}': {}", raw.trim(), e)),
            Err(e) => Err(format!("Date value is not valid UTF-8: {}", e)),
        };
        let date = match parsed {
            Ok(d) => d,
            Err(reason) => {
                diagnostics.push(RowDiagnostic {
                    line,
                    kind: DiagnosticKind::SkippedRow,
                    reason,
                });
                continue;
            }
        };

        records.push(StockRecord {
            date,
            closing_price: parse_price(&record, columns.close, CLOSE_COL, line, &mut diagnostics),
            opening_price: parse_price(&record, columns.open, OPEN_COL, line, &mut diagnostics),
            day_high: parse_price(&record, columns.high, HIGH_COL, line, &mut diagnostics),
            day_low: parse_price(&record, columns.low, LOW_COL, line, &mut diagnostics),
        });
    }

    Ok((records, diagnostics))
}

/// Loads a stock price table from raw CSV bytes.
///
/// The first row is the header. Columns are matched by name and fall back to
/// the fixed `Date, Fermeture, Ouverture, Max, Min` order. Empty input yields
/// an empty table.
///
/// # Errors
/// * `LoadError::MissingColumn` if no date column can be resolved.
/// * `LoadError::Csv` if the CSV layer fails (e.g. an I/O error). Cells that
///   are not valid UTF-8 become diagnostics, not errors.
pub fn load(bytes: &[u8]) -> Result<LoadedTable, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    // Headers are only matched against ASCII names, so lossy decoding is enough.
    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Ok(LoadedTable {
            table: Table::empty(),
            diagnostics: Vec::new(),
        });
    }

    let columns = resolve_columns(&headers)?;
    let (records, diagnostics) = process_csv_records(&mut reader, &columns)?;

    let presence = ColumnPresence {
        closing_price: columns.close.is_some(),
        opening_price: columns.open.is_some(),
        day_high: columns.high.is_some(),
        day_low: columns.low.is_some(),
    };

    Ok(LoadedTable {
        table: Table {
            records,
            columns: presence,
        },
        diagnostics,
    })
}
