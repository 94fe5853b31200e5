use chrono::{Local, NaiveDate, TimeZone};

/// Parse a coverage date. `YYYY-MM-DD` is tried when the text contains a
/// hyphen, otherwise `DD/MM/YYYY`. Anything else is `None`.
pub fn parse_coverage_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let format = if s.contains('-') { "%Y-%m-%d" } else { "%d/%m/%Y" };
    NaiveDate::parse_from_str(s, format).ok()
}

/// Local midnight of `date` → millis since the epoch.
pub fn local_midnight_millis(date: NaiveDate) -> Option<i64> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// Canonical zero-padded day string; orders lexicographically.
pub fn day_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
