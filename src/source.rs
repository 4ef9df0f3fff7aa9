// TabularSource module
//
// Format-agnostic view over the raw grid of a datalogger export.
// - `TabularSource`: every row of the first worksheet, cell by cell, untyped
// - `Frame`: the table as seen when the first N rows are skipped and the next
//   row is treated as the header (what the column strategies inspect)
// - workbook: loading from calamine ranges, file paths and uploaded bytes

pub mod workbook;

use chrono::{NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::fmt;

use crate::utils::normalize_label;

pub use workbook::{excel_serial_to_datetime, load_workbook, load_workbook_bytes, SourceError};

/// A single untyped cell as read from the spreadsheet
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Time-of-day cell without a date (Excel serial below 1.0)
    Time(NaiveTime),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Build a cell from text, mapping whitespace-only input to `Empty`
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Textual representation used for header matching and numeric cleanup
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

/// Immutable grid of cells, rows in sheet order starting at the first sheet row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularSource {
    rows: Vec<Vec<CellValue>>,
    width: usize,
}

impl TabularSource {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self { rows, width }
    }

    /// Build a source where every cell is text (empty strings become empty cells)
    pub fn from_text_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|cell| CellValue::text(cell.as_ref()))
                        .collect()
                })
                .collect(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Lower-cased, trimmed text of every cell in a row (empty cells become "")
    pub fn normalized_row(&self, index: usize) -> Vec<String> {
        self.row(index)
            .map(|cells| {
                cells
                    .iter()
                    .map(|c| normalize_label(&c.as_text()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// View the table with the first `skip_rows` rows discarded and the next row as header
    ///
    /// Returns `None` when there is no row left to act as a header.
    pub fn frame(&self, skip_rows: usize) -> Option<Frame<'_>> {
        let header = self.rows.get(skip_rows)?;
        let mut seen: HashMap<String, usize> = HashMap::new();

        let columns = (0..self.width)
            .map(|index| {
                let cell = header.get(index).unwrap_or(&EMPTY_CELL);
                let blank = cell.is_empty();
                let base = if blank {
                    format!("Unnamed: {index}")
                } else {
                    cell.as_text().trim().to_string()
                };

                // Repeated header names get a ".n" suffix so every column stays addressable
                let count = seen.entry(base.clone()).or_insert(0);
                let name = if *count == 0 {
                    base
                } else {
                    format!("{base}.{count}")
                };
                *count += 1;

                Column {
                    index,
                    label: normalize_label(&name),
                    name,
                    blank,
                }
            })
            .collect();

        Some(Frame {
            skip_rows,
            columns,
            rows: &self.rows[skip_rows + 1..],
        })
    }
}

/// Header column of a frame
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub index: usize,
    /// Header text as found (trimmed)
    pub name: String,
    /// Lower-cased name used for keyword matching
    pub label: String,
    /// True when the header cell was empty
    pub blank: bool,
}

/// The table re-read with a given number of leading rows skipped
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    skip_rows: usize,
    columns: Vec<Column>,
    rows: &'a [Vec<CellValue>],
}

impl<'a> Frame<'a> {
    /// Sheet row index (0-based) of the header row
    pub fn header_row(&self) -> usize {
        self.skip_rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns that carry a header name
    pub fn named_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.blank)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Data rows below the header with their sheet row index; fully blank rows are skipped
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &'a [CellValue])> + '_ {
        let first = self.skip_rows + 1;
        let rows: &'a [Vec<CellValue>] = self.rows;
        rows.iter()
            .enumerate()
            .filter(|(_, row)| !row.iter().all(CellValue::is_empty))
            .map(move |(offset, row)| (first + offset, row.as_slice()))
    }

    /// True when no non-blank row follows the header
    pub fn is_empty(&self) -> bool {
        self.data_rows().next().is_none()
    }

    /// Cell at `column` in `row`, treating short rows as padded with empty cells
    pub fn cell<'r>(row: &'r [CellValue], column: usize) -> &'r CellValue {
        row.get(column).unwrap_or(&EMPTY_CELL)
    }
}
