use std::fmt::Display;

use thiserror::Error as ThisError;

/// Field of a [`Calendar`](crate::Calendar), used to report which part of
/// an input was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CalendarField {
    Year,
    Yearday,
    Month,
    Monthday,
    Hour,
    Minute,
    Second,
}

impl Display for CalendarField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CalendarField::Year => "year",
            CalendarField::Yearday => "yearday",
            CalendarField::Month => "month",
            CalendarField::Monthday => "monthday",
            CalendarField::Hour => "hour",
            CalendarField::Minute => "minute",
            CalendarField::Second => "second",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum CalendarError {
    #[error("Invalid calendar input: {field} {value} is out of range")]
    InvalidCalendarInput { field: CalendarField, value: i64 },
    #[error("Timestamp {0} lies outside the supported calendar range")]
    OutOfRange(i64),
    #[error("Malformed date/time {0:?}, expected YYYY-MM-DD HH:MM:SS")]
    Malformed(String),
}

impl CalendarError {
    pub(crate) fn invalid(field: CalendarField, value: impl Into<i64>) -> CalendarError {
        CalendarError::InvalidCalendarInput {
            field,
            value: value.into(),
        }
    }
}
