/// Daily aggregation
///
/// Groups records by calendar day (time of day is discarded) and keeps the
/// extremes of each metric independently: a day's maximum temperature and
/// maximum humidity may come from different samples.
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use super::normalizer::NormalizedRecord;

/// Display format for dates in the result table (DD/MM/YYYY)
pub const DATE_DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// Column labels of the result table, in order
pub const COLUMN_LABELS: [&str; 5] = [
    "Data",
    "Temperatura Máxima (°C)",
    "Temperatura Mínima (°C)",
    "Umidade Máxima (%)",
    "Umidade Mínima (%)",
];

/// Extremes for one calendar day, rounded to 2 decimals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyExtremes {
    #[serde(rename = "Data", serialize_with = "serialize_display_date")]
    pub date: NaiveDate,
    #[serde(rename = "Temperatura Máxima (°C)")]
    pub temp_max: f64,
    #[serde(rename = "Temperatura Mínima (°C)")]
    pub temp_min: f64,
    #[serde(rename = "Umidade Máxima (%)")]
    pub humid_max: f64,
    #[serde(rename = "Umidade Mínima (%)")]
    pub humid_min: f64,
}

impl DailyExtremes {
    pub fn formatted_date(&self) -> String {
        self.date.format(DATE_DISPLAY_FORMAT).to_string()
    }

    /// Cell texts in column order: date then the four values with 2 decimals
    pub fn display_cells(&self) -> [String; 5] {
        [
            self.formatted_date(),
            format!("{:.2}", self.temp_max),
            format!("{:.2}", self.temp_min),
            format!("{:.2}", self.humid_max),
            format!("{:.2}", self.humid_min),
        ]
    }
}

fn serialize_display_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.format(DATE_DISPLAY_FORMAT).to_string())
}

/// Round to 2 decimal places, halves away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy)]
struct Extremes {
    temp_max: f64,
    temp_min: f64,
    humid_max: f64,
    humid_min: f64,
}

impl Extremes {
    fn new(record: &NormalizedRecord) -> Self {
        Self {
            temp_max: record.temperature,
            temp_min: record.temperature,
            humid_max: record.humidity,
            humid_min: record.humidity,
        }
    }

    fn update(&mut self, record: &NormalizedRecord) {
        self.temp_max = self.temp_max.max(record.temperature);
        self.temp_min = self.temp_min.min(record.temperature);
        self.humid_max = self.humid_max.max(record.humidity);
        self.humid_min = self.humid_min.min(record.humidity);
    }
}

/// One entry per distinct date, sorted ascending
pub fn aggregate_daily(records: &[NormalizedRecord]) -> Vec<DailyExtremes> {
    let mut by_day: BTreeMap<NaiveDate, Extremes> = BTreeMap::new();

    for record in records {
        by_day
            .entry(record.timestamp.date())
            .and_modify(|e| e.update(record))
            .or_insert_with(|| Extremes::new(record));
    }

    by_day
        .into_iter()
        .map(|(date, e)| DailyExtremes {
            date,
            temp_max: round2(e.temp_max),
            temp_min: round2(e.temp_min),
            humid_max: round2(e.humid_max),
            humid_min: round2(e.humid_min),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, hour: u32, temperature: f64, humidity: f64) -> NormalizedRecord {
        NormalizedRecord {
            timestamp: NaiveDate::from_ymd_opt(2025, 3, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            temperature,
            humidity,
        }
    }

    #[test]
    fn test_same_day_extremes_are_independent() {
        let days = aggregate_daily(&[record(24, 8, 20.1, 55.5), record(24, 15, 25.3, 40.0)]);
        assert_eq!(days.len(), 1);
        let day = &days[0];
        assert_eq!(day.temp_max, 25.3);
        assert_eq!(day.temp_min, 20.1);
        assert_eq!(day.humid_max, 55.5);
        assert_eq!(day.humid_min, 40.0);
    }

    #[test]
    fn test_days_sorted_ascending() {
        let days = aggregate_daily(&[
            record(25, 1, 1.0, 1.0),
            record(3, 1, 2.0, 2.0),
            record(24, 23, 3.0, 3.0),
        ]);
        let dates: Vec<String> = days.iter().map(|d| d.formatted_date()).collect();
        assert_eq!(dates, vec!["03/03/2025", "24/03/2025", "25/03/2025"]);
    }

    #[test]
    fn test_single_record_day_is_degenerate() {
        let days = aggregate_daily(&[record(24, 12, 21.456, 60.004)]);
        assert_eq!(days[0].temp_max, days[0].temp_min);
        assert_eq!(days[0].temp_max, 21.46);
        assert_eq!(days[0].humid_min, 60.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(23.456), 23.46);
        assert_eq!(round2(-1.234), -1.23);
        assert_eq!(round2(0.125), 0.13);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_daily(&[]).is_empty());
    }

    #[test]
    fn test_serializes_with_display_labels() {
        let days = aggregate_daily(&[record(24, 12, 20.0, 50.0)]);
        let json = serde_json::to_value(&days[0]).unwrap();
        assert_eq!(json["Data"], "24/03/2025");
        assert_eq!(json["Temperatura Máxima (°C)"], 20.0);
        assert_eq!(json["Umidade Mínima (%)"], 50.0);
    }

    #[test]
    fn test_display_cells() {
        let days = aggregate_daily(&[record(24, 12, 20.5, 50.0)]);
        assert_eq!(
            days[0].display_cells(),
            ["24/03/2025", "20.50", "20.50", "50.00", "50.00"].map(String::from)
        );
    }
}
