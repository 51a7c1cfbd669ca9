use std::{
    fmt::Display,
    ops::Sub,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::Serialize;

use crate::gregorian::{days_before_year, NTP_EPOCH_DAYS, SECONDS_PER_DAY};

/// Unix uses an epoch located at 1/1/1970-00:00h (UTC) and NTP uses 1/1/1900-00:00h.
/// This leads to an offset equivalent to 70 years in seconds
/// there are 17 leap years between the two dates so the offset is
pub(crate) const EPOCH_OFFSET: i64 = (70 * 365 + 17) * 86400;

/// Number of seconds after which the 32-bit seconds field of an NTP
/// timestamp wraps around.
pub const ERA_SECONDS: i64 = 1 << 32;

/// Seconds since the NTP prime epoch (1900-01-01 00:00:00), not reduced
/// modulo the era length.
///
/// This is the value a 32-bit wire timestamp stands for once the era it
/// belongs to has been decided.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct NtpSeconds {
    seconds: i64,
}

impl NtpSeconds {
    /// 0001-01-01 00:00:00, the first instant with a four digit year.
    pub const MIN: NtpSeconds = NtpSeconds {
        seconds: (days_before_year(1) - NTP_EPOCH_DAYS) * SECONDS_PER_DAY,
    };

    /// 9999-12-31 23:59:59, the last instant with a four digit year.
    pub const MAX: NtpSeconds = NtpSeconds {
        seconds: (days_before_year(10_000) - NTP_EPOCH_DAYS) * SECONDS_PER_DAY - 1,
    };

    pub const fn from_secs(seconds: i64) -> NtpSeconds {
        NtpSeconds { seconds }
    }

    pub const fn as_secs(self) -> i64 {
        self.seconds
    }

    /// Place a wire value in the given era.
    pub const fn from_era(era: i64, wire: u32) -> NtpSeconds {
        NtpSeconds {
            seconds: era.saturating_mul(ERA_SECONDS).saturating_add(wire as i64),
        }
    }

    /// Index of the era this instant falls in. Era 0 starts at the prime
    /// epoch, instants before 1900 are in negative eras.
    pub const fn era(self) -> i64 {
        self.seconds.div_euclid(ERA_SECONDS)
    }

    /// The 32-bit value transmitted on the wire: the seconds count modulo
    /// 2^32. The era is dropped here.
    pub const fn to_wire(self) -> u32 {
        self.seconds.rem_euclid(ERA_SECONDS) as u32
    }

    pub const fn from_unix_seconds(unix_seconds: i64) -> NtpSeconds {
        NtpSeconds {
            seconds: unix_seconds.saturating_add(EPOCH_OFFSET),
        }
    }

    pub const fn to_unix_seconds(self) -> i64 {
        self.seconds.saturating_sub(EPOCH_OFFSET)
    }

    /// Whole seconds of a host clock reading, rounded towards the past.
    pub fn from_system_time(time: SystemTime) -> NtpSeconds {
        let unix_seconds = match time.duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_secs()).unwrap_or(i64::MAX),
            Err(e) => {
                // host clock set before 1970
                let before = e.duration();
                let seconds = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
                if before.subsec_nanos() > 0 {
                    -seconds - 1
                } else {
                    -seconds
                }
            }
        };

        NtpSeconds::from_unix_seconds(unix_seconds)
    }

    /// Whether this instant can be represented as a four digit year calendar.
    pub const fn is_supported(self) -> bool {
        self.seconds >= Self::MIN.seconds && self.seconds <= Self::MAX.seconds
    }
}

impl Sub for NtpSeconds {
    type Output = i64;

    fn sub(self, rhs: Self) -> Self::Output {
        self.seconds.saturating_sub(rhs.seconds)
    }
}

impl Display for NtpSeconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.seconds)
    }
}
