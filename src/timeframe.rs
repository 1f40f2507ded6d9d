use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, Weekday};
use regex::Regex;

use crate::date_util::last_day_of_month;
use crate::error::{Error, Result};

static RE_QUARTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-Q([1-4])$").unwrap());
static RE_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{1,2})$").unwrap());
static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());
static RE_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());

/// A time window scoping a metrics query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timeframe {
    Day(NaiveDate),
    Week(i32, u8),
    Month(i32, u8),
    Quarter(i32, u8),
    Year(i32),
    Rolling(u32, NaiveDate),
    Custom(NaiveDate, NaiveDate),
}

impl Timeframe {
    /// Parse a timeframe string.
    ///
    /// Supported formats:
    /// - `2025` — year
    /// - `2025-Q1` — quarter
    /// - `2025-01` — month
    /// - `2025-W05` — ISO week
    /// - `2025-08-28` — single day
    /// - `today` — the current day
    /// - `30d` — rolling last N days
    /// - `2025-01-01..2025-03-15` — custom inclusive range
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let today = chrono::Local::now().date_naive();

        if s.eq_ignore_ascii_case("today") {
            return Ok(Timeframe::Day(today));
        }

        // Rolling: "30d", "7d", etc.
        if s.ends_with('d') || s.ends_with('D') {
            if let Ok(n) = s[..s.len() - 1].parse::<u32>() {
                if n == 0 {
                    return Err(Error::TimeframeParse(
                        "rolling window must cover at least one day".into(),
                    ));
                }
                // The window start must stay representable as a date.
                if today.checked_sub_signed(Duration::days(n as i64 - 1)).is_none() {
                    return Err(Error::TimeframeParse(format!(
                        "rolling window too large: {s}"
                    )));
                }
                return Ok(Timeframe::Rolling(n, today));
            }
        }

        // Custom range: "2025-01-01..2025-03-15"
        if let Some((from, to)) = s.split_once("..") {
            let start = parse_date(from)?;
            let end = parse_date(to)?;
            if end < start {
                return Err(Error::TimeframeParse(format!(
                    "range end precedes start: {s}"
                )));
            }
            return Ok(Timeframe::Custom(start, end));
        }

        // Year: "2025"
        if s.len() == 4 {
            if let Ok(year) = s.parse::<i32>() {
                return Ok(Timeframe::Year(year));
            }
        }

        // Quarter: "2025-Q1" through "2025-Q4"
        if let Some(caps) = RE_QUARTER.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            let q: u8 = caps[2].parse().unwrap();
            return Ok(Timeframe::Quarter(year, q));
        }

        // Week: "2025-W05". Not every ISO year has a week 53.
        if let Some(caps) = RE_WEEK.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            let week: u8 = caps[2].parse().unwrap();
            if NaiveDate::from_isoywd_opt(year, week as u32, Weekday::Mon).is_some() {
                return Ok(Timeframe::Week(year, week));
            }
            return Err(Error::TimeframeParse(format!(
                "no week {week} in ISO year {year}"
            )));
        }

        // Month: "2025-01"
        if let Some(caps) = RE_MONTH.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            let month: u8 = caps[2].parse().unwrap();
            if (1..=12).contains(&month) {
                return Ok(Timeframe::Month(year, month));
            }
        }

        // Day: "2025-08-28"
        if RE_DAY.is_match(s) {
            return Ok(Timeframe::Day(parse_date(s)?));
        }

        Err(Error::TimeframeParse(format!("unrecognized timeframe: {s}")))
    }

    /// Convert to a canonical key string for report labeling.
    pub fn to_key(&self) -> String {
        match self {
            Timeframe::Day(d) => d.format("%Y-%m-%d").to_string(),
            Timeframe::Week(y, w) => format!("{y}-W{w:02}"),
            Timeframe::Month(y, m) => format!("{y}-{m:02}"),
            Timeframe::Quarter(y, q) => format!("{y}-Q{q}"),
            Timeframe::Year(y) => format!("{y}"),
            Timeframe::Rolling(n, _) => format!("{n}d"),
            Timeframe::Custom(s, e) => {
                format!("{}..{}", s.format("%Y-%m-%d"), e.format("%Y-%m-%d"))
            }
        }
    }

    /// Get the date range (inclusive start, inclusive end) for this timeframe.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        match self {
            Timeframe::Day(d) => (*d, *d),
            Timeframe::Week(y, w) => {
                let start = NaiveDate::from_isoywd_opt(*y, *w as u32, Weekday::Mon).unwrap();
                (start, start + Duration::days(6))
            }
            Timeframe::Month(y, m) => (
                NaiveDate::from_ymd_opt(*y, *m as u32, 1).unwrap(),
                last_day_of_month(*y, *m as u32),
            ),
            Timeframe::Quarter(y, q) => {
                let start_month = (*q as u32 - 1) * 3 + 1;
                let end_month = *q as u32 * 3;
                (
                    NaiveDate::from_ymd_opt(*y, start_month, 1).unwrap(),
                    last_day_of_month(*y, end_month),
                )
            }
            Timeframe::Year(y) => (
                NaiveDate::from_ymd_opt(*y, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(*y, 12, 31).unwrap(),
            ),
            Timeframe::Rolling(n, as_of) => (*as_of - Duration::days(*n as i64 - 1), *as_of),
            Timeframe::Custom(s, e) => (*s, *e),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::TimeframeParse(format!("invalid date: {s}")))
}
