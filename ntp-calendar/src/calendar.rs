use std::{fmt::Display, str::FromStr};

use serde::Serialize;

use crate::{
    error::CalendarError,
    gregorian::{
        self, calendar_days, month_day_from_yearday, weekday_of, yearday_from_month_day,
    },
    time_types::NtpSeconds,
};

/// A civil date and time in the proleptic Gregorian calendar.
///
/// The day is stored twice, as `yearday` and as `month`/`monthday`. Values
/// built through [`Calendar::new`], [`Calendar::from_yearday`] or by
/// conversion from seconds always carry both encodings of the same day.
/// The fields are public so that callers can describe arbitrary input;
/// conversions back to seconds validate them first.
///
/// As input, a `yearday` of 0 means the day of year is not given, and
/// `month == 0 && monthday == 0` means only the day of year is given.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Calendar {
    pub year: u16,
    /// Day of year, 1..=366.
    pub yearday: u16,
    pub month: u8,
    pub monthday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];
}

impl Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Calendar {
    /// Date and time from a month and day of month.
    pub fn new(
        year: u16,
        month: u8,
        monthday: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Calendar, CalendarError> {
        Calendar {
            year,
            yearday: 0,
            month,
            monthday,
            hour,
            minute,
            second,
        }
        .normalized()
    }

    /// Date and time from a day of year (1..=366).
    pub fn from_yearday(
        year: u16,
        yearday: u16,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Calendar, CalendarError> {
        Calendar {
            year,
            yearday,
            month: 0,
            monthday: 0,
            hour,
            minute,
            second,
        }
        .normalized()
    }

    pub fn from_ntp_seconds(seconds: NtpSeconds) -> Result<Calendar, CalendarError> {
        gregorian::seconds_to_calendar(seconds)
    }

    pub fn to_ntp_seconds(&self) -> Result<NtpSeconds, CalendarError> {
        gregorian::calendar_to_seconds(self)
    }

    /// Check every field against its range and the two day encodings
    /// against each other.
    pub fn validate(&self) -> Result<(), CalendarError> {
        self.to_ntp_seconds().map(|_| ())
    }

    /// A validated copy with both `yearday` and `month`/`monthday` filled in.
    pub fn normalized(&self) -> Result<Calendar, CalendarError> {
        self.validate()?;

        let mut calendar = *self;
        if calendar.month == 0 {
            let (month, monthday) = month_day_from_yearday(calendar.year, calendar.yearday - 1);
            calendar.month = month;
            calendar.monthday = monthday;
        } else {
            calendar.yearday =
                yearday_from_month_day(calendar.year, calendar.month, calendar.monthday) + 1;
        }

        Ok(calendar)
    }

    /// Whether two calendars name the same second.
    ///
    /// The years and times of day have to be equal, and the day has to
    /// agree on either encoding: the same `yearday`, or the same `month`
    /// and `monthday`. Reference values often only fill in one of them.
    pub fn matches(&self, other: &Calendar) -> bool {
        self.year == other.year
            && (self.yearday == other.yearday
                || (self.month == other.month && self.monthday == other.monthday))
            && self.hour == other.hour
            && self.minute == other.minute
            && self.second == other.second
    }

    pub fn weekday(&self) -> Result<Weekday, CalendarError> {
        let days = calendar_days(self)?;
        Ok(Weekday::ALL[usize::from(weekday_of(days))])
    }
}

/// Renders `YYYY-MM-DD (yearday) HH:MM:SS`.
impl Display for Calendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} ({}) {:02}:{:02}:{:02}",
            self.year,
            self.month,
            self.monthday,
            self.yearday,
            self.hour,
            self.minute,
            self.second
        )
    }
}

fn parse_field<T: FromStr>(part: Option<&str>) -> Option<T> {
    part.filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|p| p.parse().ok())
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and the
/// `Display` form `YYYY-MM-DD (yearday) HH:MM:SS`.
impl FromStr for Calendar {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CalendarError::Malformed(s.to_owned());

        let (date, rest) = s
            .trim()
            .split_once(['T', ' '])
            .ok_or_else(malformed)?;

        let rest = rest.trim_start();
        let (yearday, time) = match rest.strip_prefix('(') {
            Some(rest) => {
                let (yearday, time) = rest.split_once(')').ok_or_else(malformed)?;
                let yearday = parse_field(Some(yearday.trim())).ok_or_else(malformed)?;
                (yearday, time.trim_start())
            }
            None => (0, rest),
        };

        let mut date = date.split('-');
        let year = parse_field(date.next()).ok_or_else(malformed)?;
        let month = parse_field(date.next()).ok_or_else(malformed)?;
        let monthday = parse_field(date.next()).ok_or_else(malformed)?;

        let mut time = time.split(':');
        let hour = parse_field(time.next()).ok_or_else(malformed)?;
        let minute = parse_field(time.next()).ok_or_else(malformed)?;
        let second = parse_field(time.next()).ok_or_else(malformed)?;

        if date.next().is_some() || time.next().is_some() {
            return Err(malformed());
        }

        Calendar {
            year,
            yearday,
            month,
            monthday,
            hour,
            minute,
            second,
        }
        .normalized()
    }
}
