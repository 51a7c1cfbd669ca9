//! Reconstruction of the era of a 32-bit NTP seconds value.
//!
//! The wire format only carries the seconds modulo 2^32, so the same value
//! comes back every 136 years. The era is recovered by picking the instant
//! nearest to a reference time: the result always lies in the half open
//! window `[reference - 2^31, reference + 2^31)`. A wire value exactly half
//! an era away is therefore placed in the earlier of the two eras.

use tracing::{trace, warn};

use crate::time_types::{NtpSeconds, ERA_SECONDS};

const HALF_ERA: i64 = ERA_SECONDS / 2;

/// Expand a wire value to the absolute instant closest to `reference`.
///
/// The result is always within the supported calendar range, so converting
/// it to a [`Calendar`](crate::Calendar) cannot fail.
pub fn resolve(wire: u32, reference: NtpSeconds) -> NtpSeconds {
    let reference = supported_reference(reference);

    let candidate = NtpSeconds::from_era(reference.era(), wire);
    let offset = candidate - reference;

    let mut resolved = if offset >= HALF_ERA {
        NtpSeconds::from_secs(candidate.as_secs() - ERA_SECONDS)
    } else if offset < -HALF_ERA {
        NtpSeconds::from_secs(candidate.as_secs() + ERA_SECONDS)
    } else {
        candidate
    };

    // At the ends of the calendar the nearest era may not be representable,
    // the one on the other side of the reference always is.
    if resolved > NtpSeconds::MAX {
        resolved = NtpSeconds::from_secs(resolved.as_secs() - ERA_SECONDS);
    } else if resolved < NtpSeconds::MIN {
        resolved = NtpSeconds::from_secs(resolved.as_secs() + ERA_SECONDS);
    }

    trace!(
        wire,
        reference = reference.as_secs(),
        era = resolved.era(),
        resolved = resolved.as_secs(),
        "resolved ntp era"
    );

    resolved
}

fn supported_reference(reference: NtpSeconds) -> NtpSeconds {
    if reference.is_supported() {
        reference
    } else {
        let limited = reference.clamp(NtpSeconds::MIN, NtpSeconds::MAX);
        warn!(
            reference = reference.as_secs(),
            limited = limited.as_secs(),
            "Reference time outside of the supported calendar range, using nearest supported time"
        );
        limited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIX_EPOCH_NTP: i64 = 2_208_988_800;

    fn reference(seconds: i64) -> NtpSeconds {
        NtpSeconds::from_secs(seconds)
    }

    #[test]
    fn test_same_era() {
        let resolved = resolve(3_485_080_800, reference(UNIX_EPOCH_NTP));
        assert_eq!(resolved.as_secs(), 3_485_080_800);
        assert_eq!(resolved.era(), 0);

        let resolved = resolve(u32::MAX, reference(UNIX_EPOCH_NTP));
        assert_eq!(resolved.as_secs(), ERA_SECONDS - 1);
    }

    #[test]
    fn test_next_era() {
        let resolved = resolve(0, reference(UNIX_EPOCH_NTP));
        assert_eq!(resolved.as_secs(), ERA_SECONDS);
        assert_eq!(resolved.era(), 1);

        // reference in era 1, value still from the end of era 0
        let resolved = resolve(u32::MAX - 10, reference(ERA_SECONDS + 10));
        assert_eq!(resolved.as_secs(), ERA_SECONDS - 11);
        assert_eq!(resolved.era(), 0);
    }

    #[test]
    fn test_previous_era() {
        // 1850 lies in era -1
        let resolved = resolve(u32::MAX, reference(0));
        assert_eq!(resolved.as_secs(), -1);
        assert_eq!(resolved.era(), -1);
    }

    #[test]
    fn test_half_era_ties_pick_earlier_era() {
        let base = 5 * ERA_SECONDS + 1_000;

        // exactly half an era after the reference: placed half an era before
        let wire = NtpSeconds::from_secs(base + HALF_ERA).to_wire();
        assert_eq!(resolve(wire, reference(base)).as_secs(), base - HALF_ERA);

        // exactly half an era before the reference stays there
        let wire = NtpSeconds::from_secs(base - HALF_ERA).to_wire();
        assert_eq!(resolve(wire, reference(base)).as_secs(), base - HALF_ERA);

        // one second less than half an era in either direction is unambiguous
        let wire = NtpSeconds::from_secs(base + HALF_ERA - 1).to_wire();
        assert_eq!(resolve(wire, reference(base)).as_secs(), base + HALF_ERA - 1);
        let wire = NtpSeconds::from_secs(base - HALF_ERA + 1).to_wire();
        assert_eq!(resolve(wire, reference(base)).as_secs(), base - HALF_ERA + 1);
    }

    #[test]
    fn test_window_around_reference() {
        for reference_seconds in [
            0,
            UNIX_EPOCH_NTP,
            ERA_SECONDS - 1,
            ERA_SECONDS,
            3 * ERA_SECONDS + 12_345,
            -7 * ERA_SECONDS + 3,
        ] {
            let reference = reference(reference_seconds);
            for wire in [0, 1, 1 << 31, (1 << 31) - 1, u32::MAX - 1, u32::MAX] {
                let resolved = resolve(wire, reference);
                assert_eq!(resolved.to_wire(), wire);
                let offset = resolved - reference;
                assert!((-HALF_ERA..HALF_ERA).contains(&offset), "{offset}");
            }
        }
    }

    #[test]
    fn test_calendar_limits() {
        // near the end of the calendar the later era is not representable
        let wire = NtpSeconds::from_secs(NtpSeconds::MAX.as_secs() + 10).to_wire();
        let resolved = resolve(wire, NtpSeconds::MAX);
        assert!(resolved.is_supported());
        assert_eq!(resolved.as_secs(), NtpSeconds::MAX.as_secs() + 10 - ERA_SECONDS);

        let wire = NtpSeconds::from_secs(NtpSeconds::MIN.as_secs() - 10).to_wire();
        let resolved = resolve(wire, NtpSeconds::MIN);
        assert!(resolved.is_supported());
        assert_eq!(resolved.as_secs(), NtpSeconds::MIN.as_secs() - 10 + ERA_SECONDS);
    }

    #[test]
    fn test_unsupported_reference() {
        let resolved = resolve(0, reference(i64::MAX));
        assert!(resolved.is_supported());
        assert_eq!(resolved.to_wire(), 0);

        let resolved = resolve(0, reference(i64::MIN));
        assert!(resolved.is_supported());
        assert_eq!(resolved.to_wire(), 0);
    }
}
