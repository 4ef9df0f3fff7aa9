/// Format detection
///
/// Classifies an export by scanning its first rows for header keywords.
/// Each predicate gets a full pass over the scan window before the next one
/// is tried, so a SpecificFormat header anywhere in the window beats a
/// ReportMode header that appears earlier.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::source::TabularSource;

/// Rows inspected by detection and by the single-header strategies
pub const DETECTION_WINDOW: usize = 50;

/// Ordinal markers used as the first column of report exports
pub(crate) const ORDINAL_MARKERS: [&str; 3] = ["n°.", "nº.", "n°"];

/// Layout variants understood by the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    /// `Data/Hora | Temperatura[°C] | Umidade[%Hr]` table below a free-form preamble
    SpecificFormat,
    /// `N°. | Temp | UR | Tempo` report table
    ReportMode,
    /// `id | Data Hora | Temperatura | Umidade` export (selected explicitly)
    NewMode,
    /// Keyword-driven fallback for everything else
    CurrentMode,
    Unknown,
}

impl FormatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatKind::SpecificFormat => "specific_format",
            FormatKind::ReportMode => "report_mode",
            FormatKind::NewMode => "new_mode",
            FormatKind::CurrentMode => "current_mode",
            FormatKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown reading mode: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for FormatKind {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "specific_format" => Ok(FormatKind::SpecificFormat),
            "report_mode" => Ok(FormatKind::ReportMode),
            "new_mode" => Ok(FormatKind::NewMode),
            "current_mode" => Ok(FormatKind::CurrentMode),
            "unknown" => Ok(FormatKind::Unknown),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Row predicate for SpecificFormat headers
pub(crate) fn is_specific_header(cells: &[String]) -> bool {
    let has_datetime = cells
        .iter()
        .any(|c| c.contains("data/hora") || (c.contains("data") && c.contains("hora")));
    let has_temp = cells
        .iter()
        .any(|c| c.contains("temperatura") && c.contains("°c"));
    let has_humid = cells
        .iter()
        .any(|c| c.contains("umidade") && (c.contains("hr") || c.contains("%hr")));

    has_datetime && has_temp && has_humid
}

/// Row predicate for ReportMode headers (exact cell values, not substrings)
pub(crate) fn is_report_header(cells: &[String]) -> bool {
    let has = |value: &str| cells.iter().any(|c| c == value);
    ORDINAL_MARKERS.iter().any(|m| has(m)) && has("temp") && has("ur") && has("tempo")
}

/// Row predicate for NewMode headers
pub(crate) fn is_new_mode_header(cells: &[String]) -> bool {
    cells.iter().any(|c| c == "id")
        && cells.iter().any(|c| c.contains("data") && c.contains("hora"))
        && cells.iter().any(|c| c.contains("temperatura"))
        && cells.iter().any(|c| c.contains("umidade"))
}

/// First row within the detection window whose normalized cells satisfy `predicate`
pub(crate) fn find_header_row(
    source: &TabularSource,
    predicate: impl Fn(&[String]) -> bool,
) -> Option<usize> {
    (0..source.row_count().min(DETECTION_WINDOW)).find(|&idx| predicate(&source.normalized_row(idx)))
}

/// Classify a source; never fails, inconclusive scans fall back to CurrentMode
pub fn detect_format(source: &TabularSource) -> FormatKind {
    if let Some(row) = find_header_row(source, is_specific_header) {
        info!("Specific format detected at row {}", row);
        return FormatKind::SpecificFormat;
    }

    if let Some(row) = find_header_row(source, is_report_header) {
        info!("Report mode detected at row {}", row);
        return FormatKind::ReportMode;
    }

    debug!(
        "No known header within the first {} rows, using current mode",
        DETECTION_WINDOW
    );
    FormatKind::CurrentMode
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_specific_header_predicate() {
        assert!(is_specific_header(&row(&[
            "id",
            "data/hora",
            "temperatura[°c]",
            "umidade[%hr]"
        ])));
        assert!(is_specific_header(&row(&[
            "data e hora",
            "temperatura °c",
            "umidade hr"
        ])));
        assert!(!is_specific_header(&row(&[
            "data/hora",
            "temperatura",
            "umidade[%hr]"
        ])));
    }

    #[test]
    fn test_report_header_requires_exact_cells() {
        assert!(is_report_header(&row(&["n°.", "temp", "ur", "tempo"])));
        assert!(is_report_header(&row(&["nº.", "tempo", "temp", "ur"])));
        assert!(!is_report_header(&row(&["n°.", "temp.", "ur", "tempo"])));
        assert!(!is_report_header(&row(&["temp", "ur", "tempo"])));
    }

    #[test]
    fn test_new_mode_header_predicate() {
        assert!(is_new_mode_header(&row(&[
            "id",
            "data hora",
            "temperatura",
            "umidade"
        ])));
        assert!(!is_new_mode_header(&row(&[
            "código",
            "data hora",
            "temperatura",
            "umidade"
        ])));
    }

    #[test]
    fn test_detect_specific_beats_earlier_report_row() {
        let source = TabularSource::from_text_rows([
            vec!["N°.", "Temp", "UR", "Tempo"],
            vec!["1", "20", "50", "01/01/2025 10:00"],
            vec!["Data/Hora", "Temperatura[°C]", "Umidade[%Hr]", ""],
        ]);
        assert_eq!(detect_format(&source), FormatKind::SpecificFormat);
    }

    #[test]
    fn test_detect_report_mode() {
        let source = TabularSource::from_text_rows([
            vec!["Relatório de temperatura", "", "", ""],
            vec!["N°.", "Temp", "UR", "Tempo"],
        ]);
        assert_eq!(detect_format(&source), FormatKind::ReportMode);
    }

    #[test]
    fn test_detect_ignores_rows_beyond_window() {
        let mut rows = vec![vec!["x"; 4]; DETECTION_WINDOW];
        rows.push(vec!["N°.", "Temp", "UR", "Tempo"]);
        let source = TabularSource::from_text_rows(rows);
        assert_eq!(detect_format(&source), FormatKind::CurrentMode);
    }

    #[test]
    fn test_detect_empty_source() {
        assert_eq!(
            detect_format(&TabularSource::default()),
            FormatKind::CurrentMode
        );
    }

    #[test]
    fn test_format_kind_round_trips_through_str() {
        for kind in [
            FormatKind::SpecificFormat,
            FormatKind::ReportMode,
            FormatKind::NewMode,
            FormatKind::CurrentMode,
        ] {
            assert_eq!(kind.as_str().parse::<FormatKind>().unwrap(), kind);
        }
        assert!("pdf_mode".parse::<FormatKind>().is_err());
    }
}
