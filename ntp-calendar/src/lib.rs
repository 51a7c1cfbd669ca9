//! Conversion between 32-bit NTP timestamps and civil time.
//!
//! NTP carries seconds since 1900-01-01 00:00:00 UTC modulo 2^32, so a
//! value on the wire is ambiguous across eras of roughly 136 years. This
//! crate resolves a wire value against a reference clock to an absolute
//! instant and splits that into a proleptic Gregorian [`Calendar`], and
//! encodes calendars back into wire values.

#![forbid(unsafe_code)]

mod calendar;
mod config;
mod converter;
mod era;
mod error;
mod gregorian;
mod reference;
mod time_types;

pub use calendar::{Calendar, Weekday};
pub use config::ReferenceConfig;
pub use converter::{decode, encode, TimestampConverter};
pub use era::resolve;
pub use error::{CalendarError, CalendarField};
pub use gregorian::{
    calendar_to_seconds, days_in_month, days_in_year, is_leap_year, seconds_to_calendar,
    MAX_YEAR, MIN_YEAR,
};
pub use reference::{
    ActiveClock, FixedReference, ReferenceClock, ReferenceOverride, SharedReference,
    SystemReference,
};
pub use time_types::{NtpSeconds, ERA_SECONDS};
