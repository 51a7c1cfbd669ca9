use tracing::debug;

use crate::{
    calendar::Calendar,
    era,
    error::CalendarError,
    gregorian,
    reference::{ReferenceClock, SystemReference},
    time_types::NtpSeconds,
};

/// Converts between 32-bit wire timestamps and calendar dates, resolving
/// eras against the reference clock it owns.
#[derive(Debug, Default, Clone)]
pub struct TimestampConverter<C = SystemReference> {
    clock: C,
}

impl<C: ReferenceClock> TimestampConverter<C> {
    pub fn new(clock: C) -> Self {
        TimestampConverter { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The absolute instant nearest to the current reference time that
    /// `wire` can stand for.
    pub fn resolve(&self, wire: u32) -> NtpSeconds {
        era::resolve(wire, self.clock.now())
    }

    /// Calendar date of a wire timestamp. Every 32-bit value decodes.
    pub fn decode(&self, wire: u32) -> Calendar {
        decode(wire, &self.clock)
    }

    /// Wire timestamp of a calendar date. The era is dropped.
    pub fn encode(&self, calendar: &Calendar) -> Result<u32, CalendarError> {
        encode(calendar)
    }
}

/// Calendar date of a wire timestamp, with the era picked relative to `clock`.
pub fn decode(wire: u32, clock: &impl ReferenceClock) -> Calendar {
    // resolve only returns supported instants
    gregorian::split_seconds(era::resolve(wire, clock.now()))
}

/// Wire timestamp of a calendar date: its seconds since the prime epoch,
/// explicitly reduced modulo 2^32.
pub fn encode(calendar: &Calendar) -> Result<u32, CalendarError> {
    match calendar.to_ntp_seconds() {
        Ok(seconds) => Ok(seconds.to_wire()),
        Err(e) => {
            debug!(%calendar, error = %e, "refusing to encode calendar");
            Err(e)
        }
    }
}
