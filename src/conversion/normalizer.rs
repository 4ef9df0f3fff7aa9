/// Value normalization
///
/// Turns raw cells into typed records. Timestamps go through a permissive
/// parser (native date cells, Excel serials, day-first text); temperature and
/// humidity text is cleaned and parsed by a pluggable `DecimalConvention`.
/// Rows that fail any field are dropped and counted, never reported one by one.
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::mapper::HeaderMapping;
use crate::source::workbook::{excel_fraction_to_time, MAX_EXCEL_SERIAL};
use crate::source::{excel_serial_to_datetime, CellValue, Frame};

/// Text layouts tried for timestamps, two-digit years before four-digit ones
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%y %H:%M:%S%.f",
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %I:%M:%S %p",
    "%d/%m/%Y %I:%M %p",
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

fn non_numeric_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^0-9.,\-]").expect("numeric cleanup pattern is valid"))
}

/// Remove everything except digits, comma, period and minus sign
///
/// `"23,5 °C"` becomes `"23,5"`, `"55.1 %"` becomes `"55.1"`.
pub fn strip_non_numeric(raw: &str) -> Cow<'_, str> {
    non_numeric_chars().replace_all(raw, "")
}

/// Locale rule for turning cleaned numeric text into a float
pub trait DecimalConvention: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Parse raw cell text; `None` when nothing numeric is left
    fn parse(&self, raw: &str) -> Option<f64>;
}

/// Comma as decimal separator (Brazilian exports): `"23,5"` → 23.5
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaDecimal;

impl DecimalConvention for CommaDecimal {
    fn name(&self) -> &'static str {
        "comma"
    }

    fn parse(&self, raw: &str) -> Option<f64> {
        let cleaned = strip_non_numeric(raw).replace(',', ".");
        parse_finite(&cleaned)
    }
}

/// Period as decimal separator, commas read as thousands grouping: `"1,234.5"` → 1234.5
#[derive(Debug, Clone, Copy, Default)]
pub struct PointDecimal;

impl DecimalConvention for PointDecimal {
    fn name(&self) -> &'static str {
        "point"
    }

    fn parse(&self, raw: &str) -> Option<f64> {
        let cleaned = strip_non_numeric(raw).replace(',', "");
        parse_finite(&cleaned)
    }
}

/// Look up a built-in convention by name ("comma" or "point")
pub fn convention_named(name: &str) -> Option<Arc<dyn DecimalConvention>> {
    match name.trim().to_lowercase().as_str() {
        "comma" => Some(Arc::new(CommaDecimal)),
        "point" | "period" | "dot" => Some(Arc::new(PointDecimal)),
        _ => None,
    }
}

fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a timestamp from free-form text
pub fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Parse a timestamp cell: date cells, Excel serial numbers or text
pub fn parse_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Float(f) if (1.0..=MAX_EXCEL_SERIAL).contains(f) => excel_serial_to_datetime(*f),
        CellValue::Int(i) if (1..=MAX_EXCEL_SERIAL as i64).contains(i) => {
            excel_serial_to_datetime(*i as f64)
        }
        CellValue::Text(s) => parse_datetime_text(s),
        _ => None,
    }
}

fn parse_time_of_day(cell: &CellValue) -> Option<NaiveTime> {
    match cell {
        CellValue::Time(t) => Some(*t),
        CellValue::DateTime(dt) => Some(dt.time()),
        CellValue::Float(f) => excel_fraction_to_time(f.fract()),
        CellValue::Text(s) => TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(s.trim(), fmt).ok()),
        _ => None,
    }
}

/// Parse a timestamp split over a date column and a time column
///
/// The two cells are joined with a space and parsed as one value; when the
/// joined text is not a timestamp (native date cell plus time cell) the date
/// and time parts are combined directly. Both cells must be present.
pub fn parse_split_timestamp(date: &CellValue, time: &CellValue) -> Option<NaiveDateTime> {
    if date.is_empty() || time.is_empty() {
        return None;
    }
    let joined = format!("{} {}", date.as_text().trim(), time.as_text().trim());
    parse_datetime_text(&joined).or_else(|| {
        let day = parse_timestamp(date)?.date();
        let time_of_day = parse_time_of_day(time)?;
        Some(day.and_time(time_of_day))
    })
}

/// One valid datalogger sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
}

/// Why a row was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CellError {
    #[error("unparsable timestamp")]
    Timestamp,
    #[error("non-numeric temperature")]
    Temperature,
    #[error("non-numeric humidity")]
    Humidity,
}

/// True when every column the mapping reads is empty in `row`
fn mapped_cells_blank(row: &[CellValue], mapping: &HeaderMapping) -> bool {
    [
        Some(&mapping.timestamp),
        mapping.time.as_ref(),
        Some(&mapping.temperature),
        Some(&mapping.humidity),
    ]
    .into_iter()
    .flatten()
    .all(|column| Frame::cell(row, column.index).is_empty())
}

/// Records kept from a frame plus row counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutcome {
    pub records: Vec<NormalizedRecord>,
    /// Rows below the header with at least one mapped cell filled
    pub rows_scanned: usize,
    /// Rows discarded because a field failed to parse
    pub rows_dropped: usize,
}

/// Converts mapped rows into records using a decimal convention
#[derive(Debug, Clone)]
pub struct Normalizer {
    decimal: Arc<dyn DecimalConvention>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Arc::new(CommaDecimal))
    }
}

impl Normalizer {
    pub fn new(decimal: Arc<dyn DecimalConvention>) -> Self {
        Self { decimal }
    }

    pub fn decimal_convention(&self) -> &dyn DecimalConvention {
        self.decimal.as_ref()
    }

    /// Numeric value of a measurement cell
    pub fn parse_measurement(&self, cell: &CellValue) -> Option<f64> {
        match cell {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f).filter(|v| v.is_finite()),
            CellValue::Text(s) => self.decimal.parse(s),
            _ => None,
        }
    }

    pub fn normalize_row(
        &self,
        row: &[CellValue],
        mapping: &HeaderMapping,
    ) -> Result<NormalizedRecord, CellError> {
        let date_cell = Frame::cell(row, mapping.timestamp.index);
        let timestamp = match &mapping.time {
            Some(time) => parse_split_timestamp(date_cell, Frame::cell(row, time.index)),
            None => parse_timestamp(date_cell),
        }
        .ok_or(CellError::Timestamp)?;

        let temperature = self
            .parse_measurement(Frame::cell(row, mapping.temperature.index))
            .ok_or(CellError::Temperature)?;
        let humidity = self
            .parse_measurement(Frame::cell(row, mapping.humidity.index))
            .ok_or(CellError::Humidity)?;

        Ok(NormalizedRecord {
            timestamp,
            temperature,
            humidity,
        })
    }

    /// Normalize every data row of a frame, dropping rows that fail to parse
    pub fn normalize(&self, frame: &Frame<'_>, mapping: &HeaderMapping) -> NormalizeOutcome {
        let mut outcome = NormalizeOutcome::default();

        for (row_idx, row) in frame.data_rows() {
            if mapped_cells_blank(row, mapping) {
                continue;
            }
            outcome.rows_scanned += 1;
            match self.normalize_row(row, mapping) {
                Ok(record) => outcome.records.push(record),
                Err(e) => {
                    debug!("Dropping row {}: {}", row_idx, e);
                    outcome.rows_dropped += 1;
                }
            }
        }

        debug!(
            "Normalized {} of {} rows ({} dropped)",
            outcome.records.len(),
            outcome.rows_scanned,
            outcome.rows_dropped
        );
        outcome
    }
}
