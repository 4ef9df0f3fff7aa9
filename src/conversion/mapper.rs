/// Column mapping strategies
///
/// One strategy per layout. A strategy proposes candidate header rows in
/// ascending order and maps a header to semantic roles; the pipeline walks
/// the candidates forward and keeps the first one that works.
use serde::Serialize;
use std::fmt;

use super::format::{find_header_row, is_new_mode_header, is_report_header, FormatKind};
use crate::source::{Column, Frame, TabularSource};
use crate::utils::{column_key, contains_any};

/// Skip offsets tried by the SpecificFormat strategy (0..30)
pub const SPECIFIC_MAX_OFFSETS: usize = 30;

/// Skip offsets tried by the CurrentMode strategy (0..=10)
pub const CURRENT_MAX_OFFSETS: usize = 11;

const CURRENT_TIMESTAMP_KEYWORDS: [&str; 5] = ["data", "date", "tempo", "time", "hora"];
const CURRENT_TEMPERATURE_KEYWORDS: [&str; 4] = ["temp", "temperatura", "oc", "°c"];
const CURRENT_HUMIDITY_KEYWORDS: [&str; 6] = ["umid", "humid", "rh", "%rh", "hr", "%hr"];

/// Semantic role a column can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Timestamp,
    /// Separate time-of-day column joined to the timestamp column
    Time,
    Temperature,
    Humidity,
    Id,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Timestamp => "timestamp",
            Role::Time => "time",
            Role::Temperature => "temperature",
            Role::Humidity => "humidity",
            Role::Id => "id",
        };
        f.write_str(name)
    }
}

/// A concrete column of the header row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRef {
    pub index: usize,
    pub name: String,
}

impl From<&Column> for ColumnRef {
    fn from(column: &Column) -> Self {
        Self {
            index: column.index,
            name: column.name.clone(),
        }
    }
}

/// Roles resolved against one header row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderMapping {
    /// Sheet row index (0-based) of the header, i.e. the number of skipped rows
    pub header_row: usize,
    pub timestamp: ColumnRef,
    pub time: Option<ColumnRef>,
    pub temperature: ColumnRef,
    pub humidity: ColumnRef,
    /// Recognised but never read
    pub id: Option<ColumnRef>,
}

/// Columns collected while scanning a header; the first column for each role wins
#[derive(Debug, Default)]
struct RoleSlots {
    timestamp: Option<ColumnRef>,
    time: Option<ColumnRef>,
    temperature: Option<ColumnRef>,
    humidity: Option<ColumnRef>,
    id: Option<ColumnRef>,
}

impl RoleSlots {
    fn claim(slot: &mut Option<ColumnRef>, column: &Column) {
        if slot.is_none() {
            *slot = Some(column.into());
        }
    }

    fn into_mapping(self, header_row: usize) -> Result<HeaderMapping, Vec<Role>> {
        match (self.timestamp, self.temperature, self.humidity) {
            (Some(timestamp), Some(temperature), Some(humidity)) => Ok(HeaderMapping {
                header_row,
                timestamp,
                time: self.time,
                temperature,
                humidity,
                id: self.id,
            }),
            (timestamp, temperature, humidity) => {
                let mut missing = Vec::new();
                if timestamp.is_none() {
                    missing.push(Role::Timestamp);
                }
                if temperature.is_none() {
                    missing.push(Role::Temperature);
                }
                if humidity.is_none() {
                    missing.push(Role::Humidity);
                }
                Err(missing)
            }
        }
    }
}

/// Header location and column mapping for one layout
pub trait ColumnStrategy: Send + Sync {
    fn format(&self) -> FormatKind;

    /// Header rows to try, in ascending order
    fn candidate_rows(&self, source: &TabularSource) -> Vec<usize>;

    /// Minimum number of columns a reloaded table needs before mapping is attempted
    fn min_columns(&self) -> usize {
        1
    }

    /// Whether a header with nothing below it is passed over like an unmatched one
    fn skips_empty_frames(&self) -> bool {
        false
    }

    /// Map the frame's header to roles, or report the roles left unmapped
    fn map_columns(&self, frame: &Frame<'_>) -> Result<HeaderMapping, Vec<Role>>;
}

/// Strategy used for a format; `Unknown` falls back to CurrentMode
pub fn strategy_for(format: FormatKind) -> &'static dyn ColumnStrategy {
    match format {
        FormatKind::SpecificFormat => &SpecificFormatStrategy,
        FormatKind::ReportMode => &ReportModeStrategy,
        FormatKind::NewMode => &NewModeStrategy,
        FormatKind::CurrentMode | FormatKind::Unknown => &CurrentModeStrategy,
    }
}

/// `N°. | Temp | UR | Tempo`
pub struct ReportModeStrategy;

impl ColumnStrategy for ReportModeStrategy {
    fn format(&self) -> FormatKind {
        FormatKind::ReportMode
    }

    fn candidate_rows(&self, source: &TabularSource) -> Vec<usize> {
        find_header_row(source, is_report_header).into_iter().collect()
    }

    fn map_columns(&self, frame: &Frame<'_>) -> Result<HeaderMapping, Vec<Role>> {
        let mut slots = RoleSlots::default();
        for column in frame.named_columns() {
            let label = column.label.as_str();
            if label.contains("temp") && !label.contains("tempo") {
                RoleSlots::claim(&mut slots.temperature, column);
            } else if label.contains("ur") {
                RoleSlots::claim(&mut slots.humidity, column);
            } else if label.contains("tempo") {
                RoleSlots::claim(&mut slots.timestamp, column);
            }
        }
        slots.into_mapping(frame.header_row())
    }
}

/// `id | Data Hora | Temperatura | Umidade`
pub struct NewModeStrategy;

impl ColumnStrategy for NewModeStrategy {
    fn format(&self) -> FormatKind {
        FormatKind::NewMode
    }

    fn candidate_rows(&self, source: &TabularSource) -> Vec<usize> {
        find_header_row(source, is_new_mode_header)
            .into_iter()
            .collect()
    }

    fn map_columns(&self, frame: &Frame<'_>) -> Result<HeaderMapping, Vec<Role>> {
        let mut slots = RoleSlots::default();
        for column in frame.named_columns() {
            let label = column.label.as_str();
            if label == "id" {
                RoleSlots::claim(&mut slots.id, column);
            } else if label.contains("data") && label.contains("hora") {
                RoleSlots::claim(&mut slots.timestamp, column);
            } else if label.contains("temperatura") {
                RoleSlots::claim(&mut slots.temperature, column);
            } else if label.contains("umidade") {
                RoleSlots::claim(&mut slots.humidity, column);
            }
        }
        slots.into_mapping(frame.header_row())
    }
}

/// `Data/Hora | Temperatura[°C] | Umidade[%Hr]` somewhere in the first 30 rows
pub struct SpecificFormatStrategy;

impl ColumnStrategy for SpecificFormatStrategy {
    fn format(&self) -> FormatKind {
        FormatKind::SpecificFormat
    }

    fn candidate_rows(&self, source: &TabularSource) -> Vec<usize> {
        (0..SPECIFIC_MAX_OFFSETS.min(source.row_count())).collect()
    }

    fn min_columns(&self) -> usize {
        3
    }

    fn skips_empty_frames(&self) -> bool {
        true
    }

    fn map_columns(&self, frame: &Frame<'_>) -> Result<HeaderMapping, Vec<Role>> {
        let mut slots = RoleSlots::default();
        for column in frame.named_columns() {
            let label = column.label.as_str();
            if label == "id" {
                RoleSlots::claim(&mut slots.id, column);
            } else if label.contains("data/hora") || (label.contains("data") && label.contains("hora"))
            {
                RoleSlots::claim(&mut slots.timestamp, column);
            } else if label.contains("temperatura") && label.contains("°c") {
                RoleSlots::claim(&mut slots.temperature, column);
            } else if label.contains("umidade") && (label.contains("hr") || label.contains("%hr")) {
                RoleSlots::claim(&mut slots.humidity, column);
            }
        }
        slots.into_mapping(frame.header_row())
    }
}

/// Keyword search over normalized column names, tried at offsets 0..=10
pub struct CurrentModeStrategy;

impl ColumnStrategy for CurrentModeStrategy {
    fn format(&self) -> FormatKind {
        FormatKind::CurrentMode
    }

    fn candidate_rows(&self, source: &TabularSource) -> Vec<usize> {
        (0..CURRENT_MAX_OFFSETS.min(source.row_count())).collect()
    }

    fn min_columns(&self) -> usize {
        2
    }

    fn skips_empty_frames(&self) -> bool {
        true
    }

    fn map_columns(&self, frame: &Frame<'_>) -> Result<HeaderMapping, Vec<Role>> {
        let mut slots = RoleSlots::default();
        let keyed: Vec<(String, &Column)> = frame
            .named_columns()
            .map(|c| (column_key(&c.name), c))
            .collect();

        // "temp" excludes temperature columns from the date search ("tempo" included)
        for (key, column) in &keyed {
            if contains_any(key, &CURRENT_TIMESTAMP_KEYWORDS) && !key.contains("temp") {
                if slots.timestamp.is_none() {
                    RoleSlots::claim(&mut slots.timestamp, column);
                } else if key.contains("time") || key.contains("hora") {
                    RoleSlots::claim(&mut slots.time, column);
                }
            }
        }

        if let Some((_, column)) = keyed
            .iter()
            .find(|(key, _)| contains_any(key, &CURRENT_TEMPERATURE_KEYWORDS))
        {
            RoleSlots::claim(&mut slots.temperature, column);
        }

        if let Some((_, column)) = keyed
            .iter()
            .find(|(key, _)| contains_any(key, &CURRENT_HUMIDITY_KEYWORDS))
        {
            RoleSlots::claim(&mut slots.humidity, column);
        }

        slots.into_mapping(frame.header_row())
    }
}
