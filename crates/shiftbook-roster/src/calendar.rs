use chrono::{Datelike, NaiveDate, NaiveDateTime};
use shiftbook_model::{ValidationError, TIMESTAMP_FMT};
use std::fmt::{Display, Formatter};

/// Sunday-first calendar matrix for a month; cells outside the month are 0.
#[must_use]
pub fn month_grid(year: i32, month: u8) -> Vec<[u8; 7]> {
    let Some(first) = NaiveDate::from_ymd_opt(year, u32::from(month), 1) else {
        return Vec::new();
    };
    let lead = first.weekday().num_days_from_sunday() as usize;
    let days = days_in_month(year, month);

    let mut weeks = Vec::new();
    let mut week = [0u8; 7];
    let mut slot = lead;
    for day in 1..=days {
        week[slot] = day;
        slot += 1;
        if slot == 7 {
            weeks.push(week);
            week = [0u8; 7];
            slot = 0;
        }
    }
    if slot > 0 {
        weeks.push(week);
    }
    weeks
}

fn days_in_month(year: i32, month: u8) -> u8 {
    let (ny, nm) = next_month(year, month);
    let first = NaiveDate::from_ymd_opt(year, u32::from(month), 1);
    let next_first = NaiveDate::from_ymd_opt(ny, u32::from(nm), 1);
    match (first, next_first) {
        (Some(a), Some(b)) => b.signed_duration_since(a).num_days() as u8,
        _ => 0,
    }
}

/// Query-parameter clamping: month 0 and below roll back into the prior
/// year's December, 13 and above roll into the next year's January.
#[must_use]
pub fn clamp_year_month(year: i32, month: i32) -> (i32, u8) {
    if month < 1 {
        (year - 1, 12)
    } else if month > 12 {
        (year + 1, 1)
    } else {
        (year, month as u8)
    }
}

#[must_use]
pub fn prev_month(year: i32, month: u8) -> (i32, u8) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

#[must_use]
pub fn next_month(year: i32, month: u8) -> (i32, u8) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Dates to probe for a work-start note: today, then the previous day (night
/// shifts end after midnight, so the note may live on yesterday's cell). The
/// previous day crosses month and year boundaries.
#[must_use]
pub fn start_lookup_dates(today: NaiveDate) -> Vec<NaiveDate> {
    match today.pred_opt() {
        Some(yesterday) => vec![today, yesterday],
        None => vec![today],
    }
}

/// Elapsed time between two `%Y/%m/%d %H:%M:%S` timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftDuration {
    total_minutes: i64,
}

impl ShiftDuration {
    pub fn between(start: &str, end: &str) -> Result<Self, ValidationError> {
        let parse = |raw: &str| {
            NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FMT)
                .map_err(|e| ValidationError(format!("bad timestamp {raw:?}: {e}")))
        };
        let start = parse(start)?;
        let end = parse(end)?;
        if end < start {
            return Err(ValidationError(format!(
                "shift end {end} precedes start {start}"
            )));
        }
        Ok(Self {
            total_minutes: end.signed_duration_since(start).num_minutes(),
        })
    }

    #[must_use]
    pub const fn total_minutes(self) -> i64 {
        self.total_minutes
    }

    #[must_use]
    pub const fn hours(self) -> i64 {
        self.total_minutes / 60
    }

    #[must_use]
    pub const fn minutes(self) -> i64 {
        self.total_minutes % 60
    }
}

impl Display for ShiftDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}시간 {}분", self.hours(), self.minutes())
    }
}
