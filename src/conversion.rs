// Conversion module
//
// Turns a loaded datalogger export into the daily min/max table:
// - format: detect which export layout the sheet uses
// - mapper: locate the header row and map columns to roles
// - normalizer: parse timestamps and measurements, drop bad rows
// - aggregator: per-day extremes

pub mod aggregator;
pub mod format;
pub mod mapper;
pub mod normalizer;

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::report::{ConversionStats, ResultTable};
use crate::source::TabularSource;

pub use aggregator::{aggregate_daily, round2, DailyExtremes, COLUMN_LABELS, DATE_DISPLAY_FORMAT};
pub use format::{detect_format, FormatKind, UnknownFormat};
pub use mapper::{strategy_for, ColumnRef, ColumnStrategy, HeaderMapping, Role};
pub use normalizer::{
    convention_named, CommaDecimal, DecimalConvention, NormalizedRecord, Normalizer, PointDecimal,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error(
        "Required columns not found for {format} ({}); columns found: [{}]",
        describe_missing(.missing),
        .found.join(", ")
    )]
    HeaderNotFound {
        format: FormatKind,
        missing: Vec<Role>,
        found: Vec<String>,
    },

    #[error("No valid data found for {format}: none of {rows_scanned} rows had a parseable timestamp, temperature and humidity")]
    NoValidRows {
        format: FormatKind,
        rows_scanned: usize,
    },
}

fn describe_missing(missing: &[Role]) -> String {
    if missing.is_empty() {
        "no data rows below the header".to_string()
    } else {
        format!("missing: {}", join_roles(missing))
    }
}

fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Runs detection, mapping, normalization and aggregation over a source
#[derive(Debug, Clone, Default)]
pub struct Converter {
    normalizer: Normalizer,
}

impl Converter {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    pub fn with_decimal_convention(decimal: Arc<dyn DecimalConvention>) -> Self {
        Self::new(Normalizer::new(decimal))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Detect the layout, then convert with its strategy
    pub fn convert(&self, source: &TabularSource) -> Result<ResultTable, ConversionError> {
        let format = detect_format(source);
        self.convert_as(source, format)
    }

    /// Convert using the strategy of an explicitly chosen layout
    ///
    /// Candidate header rows are tried in ascending order and the first one
    /// that maps every role and yields at least one valid row wins. A
    /// candidate that maps but yields no valid rows is skipped; NoValidRows is
    /// reported only once every candidate has been tried.
    #[instrument(skip(self, source), fields(rows = source.row_count()))]
    pub fn convert_as(
        &self,
        source: &TabularSource,
        format: FormatKind,
    ) -> Result<ResultTable, ConversionError> {
        let strategy = strategy_for(format);
        let format = strategy.format();
        let candidates = strategy.candidate_rows(source);
        debug!(
            "Trying {} candidate header rows for {} ({} decimals)",
            candidates.len(),
            format,
            self.normalizer().decimal_convention().name()
        );

        let mut closest_miss: Option<(Vec<Role>, Vec<String>)> = None;
        let mut mapped_rows_scanned: Option<usize> = None;

        for skip_rows in candidates {
            let Some(frame) = source.frame(skip_rows) else {
                continue;
            };

            if frame.width() < strategy.min_columns() {
                debug!(
                    "Row {}: {} columns, need at least {}",
                    skip_rows,
                    frame.width(),
                    strategy.min_columns()
                );
                continue;
            }

            let mapping = match strategy.map_columns(&frame) {
                Ok(mapping) => mapping,
                Err(missing) => {
                    debug!(
                        "Row {}: missing {} in {:?}",
                        skip_rows,
                        join_roles(&missing),
                        frame.column_names()
                    );
                    let closer = closest_miss
                        .as_ref()
                        .map_or(true, |(best, _)| missing.len() < best.len());
                    if closer {
                        closest_miss = Some((missing, frame.column_names()));
                    }
                    continue;
                }
            };

            if strategy.skips_empty_frames() && frame.is_empty() {
                debug!("Row {}: header matched but nothing below it", skip_rows);
                if closest_miss.as_ref().map_or(true, |(best, _)| !best.is_empty()) {
                    closest_miss = Some((Vec::new(), frame.column_names()));
                }
                continue;
            }

            info!(
                "Columns mapped at row {} - timestamp: {}, time: {:?}, temperature: {}, humidity: {}",
                skip_rows,
                mapping.timestamp.name,
                mapping.time.as_ref().map(|c| c.name.as_str()),
                mapping.temperature.name,
                mapping.humidity.name
            );

            let outcome = self.normalizer.normalize(&frame, &mapping);
            if outcome.records.is_empty() {
                warn!(
                    "Row {}: header matched but none of {} rows were valid",
                    skip_rows, outcome.rows_scanned
                );
                let scanned = mapped_rows_scanned.unwrap_or(0).max(outcome.rows_scanned);
                mapped_rows_scanned = Some(scanned);
                continue;
            }

            let days = aggregate_daily(&outcome.records);
            let stats = ConversionStats {
                rows_scanned: outcome.rows_scanned,
                rows_kept: outcome.records.len(),
                rows_dropped: outcome.rows_dropped,
            };
            info!(
                "Converted {} valid rows into {} days ({} rows dropped)",
                stats.rows_kept,
                days.len(),
                stats.rows_dropped
            );
            return Ok(ResultTable::new(format, mapping, days, stats));
        }

        if let Some(rows_scanned) = mapped_rows_scanned {
            return Err(ConversionError::NoValidRows {
                format,
                rows_scanned,
            });
        }

        let (missing, found) = closest_miss
            .unwrap_or_else(|| (vec![Role::Timestamp, Role::Temperature, Role::Humidity], Vec::new()));
        warn!("No header found for {}: {}", format, describe_missing(&missing));
        Err(ConversionError::HeaderNotFound {
            format,
            missing,
            found,
        })
    }
}

/// Convert with the default (comma decimal) converter, detecting the layout
pub fn convert(source: &TabularSource) -> Result<ResultTable, ConversionError> {
    Converter::default().convert(source)
}
