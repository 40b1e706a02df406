//! Fetch windows for each [`FetchMode`].
//!
//! | Mode | Start | End |
//! |------|-------|-----|
//! | `historical` | today - 2 years | today + 6 months |
//! | `incremental` | today - 2 days | today + 3 months |
//!
//! Month arithmetic clamps to the last day of the target month, so
//! Aug 31 + 6 months is the end of February.

use serde::Serialize;
use time::{Date, Duration, Month};

use crate::domain::format_date;
use crate::{FetchMode, ValidationError};

/// Inclusive date range requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchWindow {
    #[serde(serialize_with = "serialize_date")]
    pub start: Date,
    #[serde(serialize_with = "serialize_date")]
    pub end: Date,
    pub mode: FetchMode,
}

impl FetchWindow {
    pub fn start_str(&self) -> String {
        format_date(self.start)
    }

    pub fn end_str(&self) -> String {
        format_date(self.end)
    }
}

fn serialize_date<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_date(*date))
}

pub fn compute(mode: FetchMode, today: Date) -> Result<FetchWindow, ValidationError> {
    let (start, end) = match mode {
        FetchMode::Historical => (shift_months(today, -24)?, shift_months(today, 6)?),
        FetchMode::Incremental => (
            today
                .checked_sub(Duration::days(2))
                .ok_or_else(|| out_of_range(today))?,
            shift_months(today, 3)?,
        ),
    };

    Ok(FetchWindow { start, end, mode })
}

/// Move by whole calendar months, clamping the day to the target month's length.
pub fn shift_months(date: Date, months: i32) -> Result<Date, ValidationError> {
    let index = date.year() * 12 + i32::from(u8::from(date.month())) - 1 + months;
    let year = index.div_euclid(12);
    let month = u8::try_from(index.rem_euclid(12) + 1)
        .ok()
        .and_then(|number| Month::try_from(number).ok())
        .ok_or_else(|| out_of_range(date))?;

    let mut day = date.day();
    loop {
        match Date::from_calendar_date(year, month, day) {
            Ok(shifted) => return Ok(shifted),
            Err(_) if day > 28 => day -= 1,
            Err(_) => return Err(out_of_range(date)),
        }
    }
}

fn out_of_range(date: Date) -> ValidationError {
    ValidationError::DateOutOfRange {
        value: format_date(date),
    }
}
