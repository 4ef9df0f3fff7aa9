/// Shared text helpers for header matching
///
/// Lower-case and trim a header cell the way every detection predicate expects it
///
/// Datalogger exports mix casing and padding freely ("  Temperatura[°C] ",
/// "UMIDADE[%Hr]"), so all keyword checks run against this normalized form.
///
/// # Examples
///
/// ```
/// use datalogger_converter::utils::normalize_label;
///
/// assert_eq!(normalize_label("  Temperatura[°C] "), "temperatura[°c]");
/// assert_eq!(normalize_label("N°."), "n°.");
/// assert_eq!(normalize_label(""), "");
/// ```
pub fn normalize_label(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Normalize a column name into a key: lower-case, trimmed, spaces replaced by underscores
///
/// # Examples
///
/// ```
/// use datalogger_converter::utils::column_key;
///
/// assert_eq!(column_key(" Data Hora "), "data_hora");
/// assert_eq!(column_key("Umidade (%RH)"), "umidade_(%rh)");
/// ```
pub fn column_key(value: &str) -> String {
    normalize_label(value).replace(' ', "_")
}

/// True when `value` contains at least one of `keywords`
pub fn contains_any(value: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| value.contains(k))
}
