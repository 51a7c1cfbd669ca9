//! Conversion between seconds since the NTP epoch and proleptic Gregorian
//! calendar dates.
//!
//! Day arithmetic is done on a day number counting from 0001-01-01, which
//! is split into 400, 100, 4 and 1 year cycles. This keeps every supported
//! year exact without consulting the host calendar.

use crate::{
    calendar::Calendar,
    error::{CalendarError, CalendarField},
    time_types::NtpSeconds,
};

pub(crate) const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_MINUTE: i64 = 60;

const DAYS_PER_YEAR: i64 = 365;
const DAYS_PER_4_YEARS: i64 = 4 * DAYS_PER_YEAR + 1;
const DAYS_PER_100_YEARS: i64 = 25 * DAYS_PER_4_YEARS - 1;
const DAYS_PER_400_YEARS: i64 = 4 * DAYS_PER_100_YEARS + 1;

/// Day number of 1900-01-01, the NTP prime epoch.
pub(crate) const NTP_EPOCH_DAYS: i64 = days_before_year(1900);

pub const MIN_YEAR: u16 = 1;
pub const MAX_YEAR: u16 = 9999;

/// Days elapsed before the first of each month, for common and leap years.
/// The last entry is the length of the year.
const MONTH_STARTS: [[u16; 13]; 2] = [
    [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365],
    [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335, 366],
];

const fn is_leap(year: i64) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Gregorian leap year rule: divisible by 4, and not by 100 unless also by 400.
pub const fn is_leap_year(year: u16) -> bool {
    is_leap(year as i64)
}

pub const fn days_in_year(year: u16) -> u16 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Length of `month` (1..=12) in `year`, or `None` for an invalid month.
pub fn days_in_month(year: u16, month: u8) -> Option<u8> {
    if !(1..=12).contains(&month) {
        return None;
    }

    let starts = &MONTH_STARTS[is_leap_year(year) as usize];
    let month = usize::from(month);
    Some((starts[month] - starts[month - 1]) as u8)
}

/// Day number (days since 0001-01-01) of the first of January of `year`.
pub(crate) const fn days_before_year(year: i64) -> i64 {
    let y = year - 1;
    y * DAYS_PER_YEAR + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400)
}

/// Split a day number into the year and the zero based day within it.
fn split_days(days: i64) -> (i64, u16) {
    let cycles = days.div_euclid(DAYS_PER_400_YEARS);
    let mut rest = days.rem_euclid(DAYS_PER_400_YEARS);

    // the final day of a 400 year cycle is the leap day of its fourth century
    let centuries = (rest / DAYS_PER_100_YEARS).min(3);
    rest -= centuries * DAYS_PER_100_YEARS;

    let quads = rest / DAYS_PER_4_YEARS;
    rest -= quads * DAYS_PER_4_YEARS;

    // same for the leap day closing a four year cycle
    let years = (rest / DAYS_PER_YEAR).min(3);
    rest -= years * DAYS_PER_YEAR;

    let year = cycles * 400 + centuries * 100 + quads * 4 + years + 1;
    (year, rest as u16)
}

/// Month and day of month for a zero based day of year.
pub(crate) fn month_day_from_yearday(year: u16, yearday0: u16) -> (u8, u8) {
    let starts = &MONTH_STARTS[is_leap_year(year) as usize];
    let month = starts[1..]
        .iter()
        .position(|&end| yearday0 < end)
        .unwrap_or(11);

    ((month + 1) as u8, (yearday0 - starts[month] + 1) as u8)
}

/// Zero based day of year of an already validated month and day.
pub(crate) fn yearday_from_month_day(year: u16, month: u8, monthday: u8) -> u16 {
    MONTH_STARTS[is_leap_year(year) as usize][usize::from(month) - 1] + u16::from(monthday) - 1
}

/// Day of the week of a day number, 0 being Sunday. 0001-01-01 was a Monday.
pub(crate) const fn weekday_of(days: i64) -> u8 {
    (days + 1).rem_euclid(7) as u8
}

/// Day number of `calendar`, after checking the date part against the
/// Gregorian rules.
///
/// `month == 0 && monthday == 0` selects the day by `yearday` alone, a zero
/// `yearday` means it was not given. When both encodings are present they
/// have to agree.
pub(crate) fn calendar_days(calendar: &Calendar) -> Result<i64, CalendarError> {
    let year = calendar.year;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(CalendarError::invalid(CalendarField::Year, year));
    }

    let yearday0 = match (calendar.month, calendar.monthday) {
        (0, 0) if calendar.yearday != 0 => {
            if calendar.yearday > days_in_year(year) {
                return Err(CalendarError::invalid(
                    CalendarField::Yearday,
                    calendar.yearday,
                ));
            }
            calendar.yearday - 1
        }
        (month, monthday) => {
            let length = days_in_month(year, month)
                .ok_or_else(|| CalendarError::invalid(CalendarField::Month, month))?;
            if monthday == 0 || monthday > length {
                return Err(CalendarError::invalid(CalendarField::Monthday, monthday));
            }

            let yearday0 = yearday_from_month_day(year, month, monthday);
            if calendar.yearday != 0 && calendar.yearday != yearday0 + 1 {
                return Err(CalendarError::invalid(
                    CalendarField::Yearday,
                    calendar.yearday,
                ));
            }
            yearday0
        }
    };

    Ok(days_before_year(i64::from(year)) + i64::from(yearday0))
}

fn day_seconds(calendar: &Calendar) -> Result<i64, CalendarError> {
    if calendar.hour > 23 {
        return Err(CalendarError::invalid(CalendarField::Hour, calendar.hour));
    }
    if calendar.minute > 59 {
        return Err(CalendarError::invalid(CalendarField::Minute, calendar.minute));
    }
    if calendar.second > 59 {
        return Err(CalendarError::invalid(CalendarField::Second, calendar.second));
    }

    Ok(i64::from(calendar.hour) * SECONDS_PER_HOUR
        + i64::from(calendar.minute) * SECONDS_PER_MINUTE
        + i64::from(calendar.second))
}

/// Break a supported instant into calendar fields. Callers guarantee
/// `seconds.is_supported()`.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub(crate) fn split_seconds(seconds: NtpSeconds) -> Calendar {
    debug_assert!(seconds.is_supported());

    let seconds = seconds.as_secs();
    let days = seconds.div_euclid(SECONDS_PER_DAY) + NTP_EPOCH_DAYS;
    let daysec = seconds.rem_euclid(SECONDS_PER_DAY);

    let (year, yearday0) = split_days(days);
    let year = year as u16;
    let (month, monthday) = month_day_from_yearday(year, yearday0);

    Calendar {
        year,
        yearday: yearday0 + 1,
        month,
        monthday,
        hour: (daysec / SECONDS_PER_HOUR) as u8,
        minute: (daysec % SECONDS_PER_HOUR / SECONDS_PER_MINUTE) as u8,
        second: (daysec % SECONDS_PER_MINUTE) as u8,
    }
}

/// Calendar date and time of an absolute NTP seconds count.
///
/// Fails only for instants outside `NtpSeconds::MIN..=NtpSeconds::MAX`.
pub fn seconds_to_calendar(seconds: NtpSeconds) -> Result<Calendar, CalendarError> {
    if !seconds.is_supported() {
        return Err(CalendarError::OutOfRange(seconds.as_secs()));
    }

    Ok(split_seconds(seconds))
}

/// Absolute NTP seconds count of a calendar date and time.
pub fn calendar_to_seconds(calendar: &Calendar) -> Result<NtpSeconds, CalendarError> {
    let days = calendar_days(calendar)?;
    let daysec = day_seconds(calendar)?;

    Ok(NtpSeconds::from_secs(
        (days - NTP_EPOCH_DAYS) * SECONDS_PER_DAY + daysec,
    ))
}
