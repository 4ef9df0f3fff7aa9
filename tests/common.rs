// Shared sheet fixtures for integration tests
#![allow(dead_code)]

use datalogger_converter::source::TabularSource;

/// `Data/Hora | Temperatura[°C] | Umidade[%Hr]` table below a three-row preamble
pub fn specific_format_sheet() -> TabularSource {
    TabularSource::from_text_rows([
        vec!["Relatório do registrador", "", ""],
        vec!["Equipamento: TH-01", "", ""],
        vec!["", "", ""],
        vec!["Data/Hora", "Temperatura[°C]", "Umidade[%Hr]"],
        vec!["24/03/2025 08:00", "20,1 °C", "55,5 %"],
        vec!["24/03/2025 14:00", "25,3 °C", "40,0 %"],
        vec!["25/03/2025 09:00", "19,0 °C", "60,0 %"],
    ])
}

/// `N°. | Temp | UR | Tempo` report with a title row
pub fn report_mode_sheet() -> TabularSource {
    TabularSource::from_text_rows([
        vec!["Relatório de leituras", "", "", ""],
        vec!["N°.", "Temp", "UR", "Tempo"],
        vec!["1", "22,0", "48,0", "24/03/2025 10:00:00"],
        vec!["2", "23,5", "50,2", "24/03/2025 11:00:00"],
        vec!["3", "21,0", "52,0", "25/03/2025 10:00:00"],
    ])
}

/// `id | Data Hora | Temperatura | Umidade` export
pub fn new_mode_sheet() -> TabularSource {
    TabularSource::from_text_rows([
        vec!["id", "Data Hora", "Temperatura", "Umidade"],
        vec!["1", "24/03/2025 10:00", "21", "45"],
        vec!["2", "24/03/2025 12:00", "24", "43"],
    ])
}

/// `id | Data Hora | Temperatura | Umidade` export below a two-row preamble
pub fn new_mode_sheet_with_preamble() -> TabularSource {
    TabularSource::from_text_rows([
        vec!["Exportação do registrador", "", "", ""],
        vec!["Período: março/2025", "", "", ""],
        vec!["id", "Data Hora", "Temperatura", "Umidade"],
        vec!["1", "24/03/2025 10:00", "21,5", "45"],
        vec!["2", "24/03/2025 12:00", "24,0", "43"],
    ])
}

/// Sheet with no recognizable header anywhere
pub fn junk_sheet() -> TabularSource {
    TabularSource::from_text_rows([
        vec!["foo", "bar", "baz"],
        vec!["1", "2", "3"],
        vec!["4", "5", "6"],
    ])
}

/// Separate date and time columns below a two-row preamble
pub fn split_datetime_sheet() -> TabularSource {
    TabularSource::from_text_rows([
        vec!["Logger XYZ", "", "", ""],
        vec!["Serial 123", "", "", ""],
        vec!["Date", "Time", "Temp (°C)", "RH (%)"],
        vec!["24/03/2025", "08:00", "20,5", "50"],
        vec!["24/03/2025", "16:00", "26,5", "41"],
        vec!["25/03/2025", "08:00", "18,0", "63"],
    ])
}

/// CurrentMode sheet spanning `days` consecutive days, one sample per day
pub fn daily_sheet(days: u32) -> TabularSource {
    let start = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let mut rows = vec![vec![
        "Data".to_string(),
        "Temp".to_string(),
        "Umidade".to_string(),
    ]];
    for offset in 0..days {
        let day = start + chrono::Duration::days(offset as i64);
        rows.push(vec![
            format!("{} 12:00", day.format("%d/%m/%Y")),
            "20,0".to_string(),
            "50,0".to_string(),
        ]);
    }
    TabularSource::from_text_rows(rows)
}
