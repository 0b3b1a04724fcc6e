//! Load ERF records from a workbook or CSV export

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use super::sheet::{RawSheet, SheetAnalysis, analyze, select_best};
use crate::config::{ColumnConfig, LoaderConfig};
use crate::erf::{Record, Value, fields};
use crate::error::{LoadError, RecordValidationError};

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// The data sheet of a source file, turned into records
#[derive(Debug, Clone)]
pub struct LoadedSheet {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    pub rejected: Vec<RecordValidationError>,
    /// Non-empty data rows (loaded + rejected)
    pub total_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Workbook,
    Csv,
}

fn source_kind(path: &Path) -> Result<SourceKind, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        Ok(SourceKind::Workbook)
    } else if extension == "csv" {
        Ok(SourceKind::Csv)
    } else {
        Err(LoadError::UnsupportedFormat { extension })
    }
}

/// Read every sheet of `path` into memory
pub fn read_sheets(path: &Path) -> Result<Vec<RawSheet>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    match source_kind(path)? {
        SourceKind::Workbook => read_workbook(path),
        SourceKind::Csv => Ok(vec![read_csv(path)?]),
    }
}

fn read_workbook(path: &Path) -> Result<Vec<RawSheet>, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| LoadError::Open {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let names = workbook.sheet_names();
    log::info!("Found {} sheets: {}", names.len(), names.join(", "));

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                let rows = range
                    .rows()
                    .map(|row| row.iter().map(cell_value).collect())
                    .collect();
                sheets.push(RawSheet::from_rows(name, rows));
            }
            Err(e) => log::warn!("Skipping sheet '{}': {}", name, e),
        }
    }
    Ok(sheets)
}

fn read_csv(path: &Path) -> Result<RawSheet, LoadError> {
    let open_err = |e: csv::Error| LoadError::Open {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(open_err)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(open_err)?;
        rows.push(record.iter().map(Value::parse_cell).collect());
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("csv")
        .to_string();
    Ok(RawSheet::from_rows(name, rows))
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => {
            if s.trim().is_empty() {
                Value::Null
            } else {
                Value::String(s.trim().to_string())
            }
        }
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => {
            Value::from_excel_serial(dt.as_f64()).unwrap_or_else(|| Value::Float(dt.as_f64()))
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::parse_cell(s),
        Data::Error(_) => Value::Null,
    }
}

/// Analyse every sheet of a file, for `inspect`
pub fn inspect(path: &Path, columns: &ColumnConfig) -> Result<Vec<SheetAnalysis>, LoadError> {
    Ok(read_sheets(path)?
        .iter()
        .map(|sheet| analyze(sheet, columns))
        .collect())
}

/// Pick the data sheet: the configured one, or the best scoring candidate
pub fn select_sheet(
    path: &Path,
    mut sheets: Vec<RawSheet>,
    columns: &ColumnConfig,
    loader: &LoaderConfig,
) -> Result<RawSheet, LoadError> {
    if let Some(wanted) = &loader.sheet {
        let idx = sheets
            .iter()
            .position(|s| &s.name == wanted)
            .ok_or_else(|| LoadError::SheetNotFound(wanted.clone()))?;
        return Ok(sheets.swap_remove(idx));
    }

    // A CSV file is its own data sheet
    if sheets.len() == 1 && source_kind(path)? == SourceKind::Csv {
        return Ok(sheets.swap_remove(0));
    }

    let analyses: Vec<SheetAnalysis> = sheets.iter().map(|s| analyze(s, columns)).collect();
    for analysis in &analyses {
        match analysis.rejection() {
            Some(reason) => log::info!("Sheet '{}' skipped: {}", analysis.name, reason),
            None => log::info!(
                "Sheet '{}' score: {}/{}",
                analysis.name,
                analysis.score,
                analysis.max_score
            ),
        }
    }

    let idx = select_best(&analyses).ok_or_else(|| LoadError::NoDataSheet(path.to_path_buf()))?;
    log::info!(
        "Selected sheet '{}' with score {}",
        analyses[idx].name,
        analyses[idx].score
    );
    Ok(sheets.swap_remove(idx))
}

/// Load the data sheet of `path` and validate its rows
pub fn load(
    path: &Path,
    columns: &ColumnConfig,
    loader: &LoaderConfig,
) -> Result<LoadedSheet, LoadError> {
    let sheets = read_sheets(path)?;
    let sheet = select_sheet(path, sheets, columns, loader)?;

    let missing: Vec<String> = columns
        .required_columns(&loader.required_fields)
        .into_iter()
        .filter(|c| !sheet.has_column(c))
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            sheet: sheet.name,
            columns: missing,
        });
    }

    let missing_expected: Vec<&str> = columns
        .expected
        .iter()
        .map(|s| s.as_str())
        .filter(|c| !sheet.has_column(c))
        .collect();
    if !missing_expected.is_empty() {
        log::warn!(
            "Sheet '{}' is missing expected columns: {}",
            sheet.name,
            missing_expected.join(", ")
        );
    }

    let (records, rejected) = build_records(&sheet, columns, loader);
    let total_rows = records.len() + rejected.len();

    log::info!(
        "Loaded {} records from sheet '{}' ({} rejected)",
        records.len(),
        sheet.name,
        rejected.len()
    );

    Ok(LoadedSheet {
        sheet_name: sheet.name,
        headers: sheet.headers,
        records,
        rejected,
        total_rows,
    })
}

/// Column index for each mapped logical field present in the sheet
struct FieldColumns {
    by_field: BTreeMap<String, usize>,
}

impl FieldColumns {
    fn new(sheet: &RawSheet, columns: &ColumnConfig) -> Self {
        let mut by_field = BTreeMap::new();
        let names = fields::CORE
            .iter()
            .map(|s| s.to_string())
            .chain(columns.extra.keys().cloned());
        for name in names {
            if let Some(idx) = columns.header_for(&name).and_then(|h| sheet.column(h)) {
                by_field.insert(name, idx);
            }
        }
        Self { by_field }
    }

    fn get(&self, row: &[Value], field: &str) -> Value {
        self.by_field
            .get(field)
            .and_then(|&i| row.get(i))
            .cloned()
            .unwrap_or_default()
    }
}

/// Turn data rows into records, rejecting rows with blank required fields
pub fn build_records(
    sheet: &RawSheet,
    columns: &ColumnConfig,
    loader: &LoaderConfig,
) -> (Vec<Record>, Vec<RecordValidationError>) {
    let cols = FieldColumns::new(sheet, columns);

    let mut required: Vec<&str> = vec![fields::REQUESTER, fields::STATUS];
    for f in &loader.required_fields {
        if !required.contains(&f.as_str()) {
            required.push(f);
        }
    }

    let mut records = Vec::new();
    let mut rejected = Vec::new();

    for (idx, row) in sheet.rows.iter().enumerate() {
        // Header is row 1
        let row_num = idx + 2;

        if row.iter().all(|v| v.is_blank()) {
            continue;
        }

        let missing: Vec<String> = required
            .iter()
            .filter(|f| cols.get(row, f).is_blank())
            .map(|f| columns.header_for(f).unwrap_or(*f).to_string())
            .collect();

        if !missing.is_empty() {
            let requester = cols.get(row, fields::REQUESTER);
            let err = RecordValidationError {
                row: row_num,
                requester: (!requester.is_blank()).then(|| requester.to_text()),
                missing,
            };
            log::warn!("{}", err);
            rejected.push(err);
            continue;
        }

        let text = |field: &str| {
            let v = cols.get(row, field);
            (!v.is_blank()).then(|| v.to_text())
        };

        let extra = columns
            .extra
            .keys()
            .filter_map(|name| {
                let v = cols.get(row, name);
                (!v.is_blank()).then(|| (name.clone(), v))
            })
            .collect();

        let quantity = cols.get(row, fields::QUANTITY);

        records.push(Record {
            row: row_num,
            requester: cols.get(row, fields::REQUESTER).to_text(),
            status: cols.get(row, fields::STATUS).to_text(),
            item: text(fields::ITEM),
            quantity: (!quantity.is_blank()).then_some(quantity),
            reference: text(fields::REFERENCE),
            extra,
        });
    }

    (records, rejected)
}
