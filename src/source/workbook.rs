/// Spreadsheet loading
///
/// Reads the first worksheet of an export (the sheet a datalogger writes to)
/// into a `TabularSource`. Opening is synchronous; async callers should wrap
/// these functions in `spawn_blocking()`.
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use super::{CellValue, TabularSource};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Largest serial Excel can represent (9999-12-31)
pub const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open workbook: {0}")]
    WorkbookOpen(String),

    #[error("Workbook has no worksheets")]
    NoWorksheet,

    #[error("Uploaded file is empty")]
    EmptyUpload,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<&Data> for CellValue {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::text(s.as_str()),
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(f) => CellValue::Float(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => {
                let serial = dt.as_f64();
                if dt.is_datetime() && (0.0..1.0).contains(&serial) {
                    // Time-only cells carry just the day fraction
                    excel_fraction_to_time(serial)
                        .map(CellValue::Time)
                        .unwrap_or(CellValue::Float(serial))
                } else {
                    dt.as_datetime()
                        .map(CellValue::DateTime)
                        .unwrap_or(CellValue::Float(serial))
                }
            }
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
            Data::Error(e) => CellValue::Text(format!("{e}")),
        }
    }
}

impl TabularSource {
    /// Convert a worksheet range, keeping absolute sheet positions
    ///
    /// calamine ranges start at the first used cell; leading empty rows and
    /// columns are restored so row offsets match what the user sees in the sheet.
    pub fn from_range(range: &Range<Data>) -> Self {
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![CellValue::Empty; col_offset];
            cells.extend(row.iter().map(CellValue::from));
            rows.push(cells);
        }

        TabularSource::new(rows)
    }
}

/// Load the first worksheet of a workbook (xlsx, xlsm, xls, xlsb or ods)
pub fn load_workbook(path: impl AsRef<Path>) -> Result<TabularSource, SourceError> {
    let path = path.as_ref();
    info!("Loading workbook: {}", path.display());

    let mut workbook = match open_workbook_auto(path) {
        Ok(wb) => wb,
        Err(e) => return Err(SourceError::WorkbookOpen(e.to_string())),
    };

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => return Err(SourceError::WorkbookOpen(e.to_string())),
        None => return Err(SourceError::NoWorksheet),
    };

    let source = TabularSource::from_range(&range);
    debug!(
        "Loaded {} rows x {} columns from {}",
        source.row_count(),
        source.width(),
        path.display()
    );
    Ok(source)
}

/// Load an uploaded workbook held in memory
///
/// The bytes are written to a temporary file (calamine requires a file path);
/// the file name, when given, supplies the extension used to pick the reader.
pub fn load_workbook_bytes(
    bytes: &[u8],
    file_name: Option<&str>,
) -> Result<TabularSource, SourceError> {
    if bytes.is_empty() {
        return Err(SourceError::EmptyUpload);
    }

    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_else(|| "xlsx".to_string());

    let mut temp_file = tempfile::Builder::new()
        .prefix("datalogger-upload-")
        .suffix(&format!(".{extension}"))
        .tempfile()?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;

    debug!(
        "Spooled {} uploaded bytes to {}",
        bytes.len(),
        temp_file.path().display()
    );
    load_workbook(temp_file.path())
}

/// Convert an Excel serial number (days since 1899-12-30, fraction = time of day)
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    // Excel epoch: 1899-12-30 (adjusted for Excel's off-by-one bug)
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * SECONDS_PER_DAY).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}

/// Convert the fractional part of an Excel serial into a time of day
pub fn excel_fraction_to_time(fraction: f64) -> Option<NaiveTime> {
    if !(0.0..1.0).contains(&fraction) {
        return None;
    }
    let seconds = (fraction * SECONDS_PER_DAY).round() as u32;
    // 23:59:59.6 rounds up to the next midnight
    NaiveTime::from_num_seconds_from_midnight_opt(seconds % 86_400, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_workbook_not_found() {
        let result = load_workbook("/nonexistent/path/to/file.xlsx");
        assert!(matches!(result, Err(SourceError::WorkbookOpen(_))));
    }

    #[test]
    fn test_empty_upload() {
        let result = load_workbook_bytes(&[], Some("export.xlsx"));
        assert!(matches!(result, Err(SourceError::EmptyUpload)));
    }

    #[test]
    fn test_garbage_upload() {
        let result = load_workbook_bytes(b"not a spreadsheet", Some("export.xlsx"));
        assert!(matches!(result, Err(SourceError::WorkbookOpen(_))));
    }

    #[test]
    fn test_excel_serial_to_datetime() {
        // 45740.4375 = 2025-03-24 10:30
        let dt = excel_serial_to_datetime(45740.4375).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 3, 24));
        assert_eq!((dt.hour(), dt.minute()), (10, 30));
    }

    #[test]
    fn test_excel_serial_rejects_negative() {
        assert!(excel_serial_to_datetime(-1.0).is_none());
        assert!(excel_serial_to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn test_excel_serial_rejects_out_of_range() {
        assert!(excel_serial_to_datetime(1.0e300).is_none());
        assert!(excel_serial_to_datetime(f64::INFINITY).is_none());
        assert!(excel_serial_to_datetime(MAX_EXCEL_SERIAL + 1.0).is_none());
        let last = excel_serial_to_datetime(MAX_EXCEL_SERIAL).unwrap();
        assert_eq!((last.year(), last.month(), last.day()), (9999, 12, 31));
    }

    #[test]
    fn test_excel_fraction_to_time() {
        let t = excel_fraction_to_time(0.5).unwrap();
        assert_eq!((t.hour(), t.minute()), (12, 0));
        assert!(excel_fraction_to_time(1.5).is_none());
    }

    #[test]
    fn test_from_data_cells() {
        assert_eq!(CellValue::from(&Data::Empty), CellValue::Empty);
        assert_eq!(
            CellValue::from(&Data::String("  ".to_string())),
            CellValue::Empty
        );
        assert_eq!(CellValue::from(&Data::Float(23.5)), CellValue::Float(23.5));
        assert_eq!(CellValue::from(&Data::Int(4)), CellValue::Int(4));
    }
}
