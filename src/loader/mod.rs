//! Report loader: funnel export file to in-memory table.
//!
//! Reads the periodic funnel export into a [`RawTable`]. Workbook formats
//! (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) are read with calamine from the
//! first worksheet; any other extension is read as delimited text. Cells are
//! converted to a crate-local [`Cell`] type so the aggregation core never
//! touches the spreadsheet library.
//!
//! Header names are whitespace-trimmed on load: the export names its channel
//! column with a leading space, and re-exports are not consistent about it.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{SourceError, SourceResult};

/// A single cell of the raw report.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// True for cells that carry no value.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the cell for display and for header extraction.
    pub fn to_display_string(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// The raw report: a fixed column schema and one row per funnel record.
///
/// Created by [`load_report`], consumed once by the aggregator.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Trimmed column headers, in report order.
    pub headers: Vec<String>,
    /// Data rows, each padded to the header width.
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the report has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by trimmed header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Read the funnel report at `path` into a [`RawTable`].
///
/// Fails with [`SourceError`] when the file is missing or unreadable; the
/// caller must not proceed with an absent table.
pub fn load_report(path: &Path) -> SourceResult<RawTable> {
    let is_workbook = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods")
    );

    if is_workbook {
        load_workbook(path)
    } else {
        load_delimited(path)
    }
}

/// Read the first worksheet of a workbook.
fn load_workbook(path: &Path) -> SourceResult<RawTable> {
    let mut workbook = open_workbook_auto(path).map_err(|e| SourceError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SourceError::NoWorksheets {
            path: path.to_path_buf(),
        })?
        .map_err(|e| SourceError::Workbook {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or_else(|| SourceError::EmptyTable {
        path: path.to_path_buf(),
    })?;

    let headers: Vec<String> = header_row
        .iter()
        .map(|d| cell_from_sheet(d).to_display_string().trim().to_string())
        .collect();

    let data = rows
        .map(|row| {
            let mut cells: Vec<Cell> = row.iter().map(cell_from_sheet).collect();
            cells.resize(headers.len(), Cell::Empty);
            cells.truncate(headers.len());
            cells
        })
        .filter(|cells| !cells.iter().all(Cell::is_empty))
        .collect();

    Ok(RawTable {
        headers,
        rows: data,
    })
}

/// Read a comma-separated export.
fn load_delimited(path: &Path) -> SourceResult<RawTable> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut records = reader.records();
    let header_record = records
        .next()
        .ok_or_else(|| SourceError::EmptyTable {
            path: path.to_path_buf(),
        })?
        .map_err(|e| SourceError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

    let headers: Vec<String> = header_record.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| SourceError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut cells: Vec<Cell> = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        cells.resize(headers.len(), Cell::Empty);
        cells.truncate(headers.len());

        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        rows.push(cells);
    }

    Ok(RawTable { headers, rows })
}

/// Convert a calamine cell into a [`Cell`].
fn cell_from_sheet(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt.as_datetime().map(Cell::DateTime).unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
