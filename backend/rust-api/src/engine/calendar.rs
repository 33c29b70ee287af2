use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use chrono_tz::Tz;

/// Parse an IANA zone name. Unknown names fall back to UTC.
pub fn resolve_timezone(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(timezone = %name, "unknown timezone, falling back to UTC");
            Tz::UTC
        }
    }
}

pub fn local_date(at: DateTime<Utc>, tz: Tz) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// Whole local calendar days from `previous` to `current`. Negative when
/// `current` falls on an earlier local date.
pub fn day_difference(previous: DateTime<Utc>, current: DateTime<Utc>, tz: Tz) -> i64 {
    local_date(current, tz)
        .signed_duration_since(local_date(previous, tz))
        .num_days()
}

/// Monday of the local week containing `at`.
pub fn week_start(at: DateTime<Utc>, tz: Tz) -> NaiveDate {
    let date = local_date(at, tz);
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

pub fn week_start_key(at: DateTime<Utc>, tz: Tz) -> String {
    week_start(at, tz).format("%Y-%m-%d").to_string()
}
