use chrono::{DateTime, Datelike, Duration, NaiveDate};

/// Days between the Excel epoch (1899-12-30) and 1970-01-01.
const EXCEL_UNIX_EPOCH_OFFSET: f64 = 25569.0;

/// Serial range Excel itself can display as a date.
const MIN_EXCEL_SERIAL: f64 = 1.0;
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

const PT_BR_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Render the "last update" cell as `mmm/yy` (e.g. "mai/24").
/// Excel serial numbers and common date texts are understood; anything else
/// is returned unchanged.
pub fn format_update_label(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Ok(serial) = trimmed.parse::<f64>() {
        return excel_serial_to_date(serial)
            .map(month_year_label)
            .unwrap_or_else(|| trimmed.to_string());
    }

    parse_date_text(trimmed)
        .map(month_year_label)
        .unwrap_or_else(|| trimmed.to_string())
}

/// `None` outside the serial range Excel renders as a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(MIN_EXCEL_SERIAL..MAX_EXCEL_SERIAL + 1.0).contains(&serial) {
        return None;
    }
    let millis = ((serial - EXCEL_UNIX_EPOCH_OFFSET) * 86_400_000.0).round() as i64;
    let epoch = DateTime::from_timestamp(0, 0)?;
    epoch
        .checked_add_signed(Duration::try_milliseconds(millis)?)
        .map(|dt| dt.date_naive())
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

fn month_year_label(date: NaiveDate) -> String {
    let month = PT_BR_MONTHS[date.month0() as usize];
    format!("{month}/{:02}", date.year().rem_euclid(100))
}
