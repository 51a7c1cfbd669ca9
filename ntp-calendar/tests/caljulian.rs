use ntp_calendar::{
    decode, encode, Calendar, CalendarError, CalendarField, FixedReference, NtpSeconds,
    SharedReference, TimestampConverter, ERA_SECONDS,
};

fn is_equal(expected: &Calendar, actual: &Calendar) -> bool {
    if expected.matches(actual) {
        true
    } else {
        eprintln!("expected: {expected} but was {actual}");
        false
    }
}

fn expected(
    year: u16,
    yearday: u16,
    month: u8,
    monthday: u8,
    hour: u8,
    minute: u8,
    second: u8,
) -> Calendar {
    Calendar {
        year,
        yearday,
        month,
        monthday,
        hour,
        minute,
        second,
    }
}

#[test]
fn test_reference_vectors() {
    let shared = SharedReference::new();
    let _guard = shared.fix_time(1970, 1, 1, 0, 0, 0).unwrap();
    let converter = TimestampConverter::new(shared.clone());

    assert!(is_equal(
        &expected(2010, 160, 6, 9, 14, 0, 0),
        &converter.decode(3_485_080_800)
    ));
    assert!(is_equal(
        &expected(2012, 179, 6, 28, 20, 0, 0),
        &converter.decode(3_549_902_400)
    ));
    assert!(is_equal(
        &expected(2036, 0, 2, 7, 6, 28, 15),
        &converter.decode(u32::MAX)
    ));
    // one second later the wire value wraps, and the next era is picked
    assert!(is_equal(
        &expected(2036, 0, 2, 7, 6, 28, 16),
        &converter.decode(0)
    ));
}

#[test]
fn test_decoded_values_are_normalized() {
    let reference = FixedReference::from_date(1970, 1, 1, 0, 0, 0).unwrap();

    let calendar = decode(3_549_902_400, &reference);
    assert_eq!(calendar, Calendar::new(2012, 6, 28, 20, 0, 0).unwrap());
    assert_eq!(calendar.yearday, 180);
    assert_eq!(calendar.to_string(), "2012-06-28 (180) 20:00:00");

    let calendar = decode(0, &reference);
    assert_eq!(calendar.to_string(), "2036-02-07 (38) 06:28:16");
}

#[test]
fn test_era_boundary_is_monotonic() {
    let reference = FixedReference::from_date(2036, 2, 7, 6, 28, 16).unwrap();

    let mut previous = None;
    for offset in -1_000i64..1_000 {
        let seconds = NtpSeconds::from_secs(ERA_SECONDS + offset);
        let calendar = decode(seconds.to_wire(), &reference);
        let decoded = calendar.to_ntp_seconds().unwrap();
        assert_eq!(decoded, seconds);

        if let Some(previous) = previous {
            assert_eq!(decoded - previous, 1);
        }
        previous = Some(decoded);
    }
}

#[test]
fn test_round_trip_across_eras() {
    // step through several centuries, a prime stride visits every time of day
    let start = Calendar::new(1600, 1, 1, 0, 0, 0).unwrap().to_ntp_seconds().unwrap();
    let end = Calendar::new(2400, 1, 1, 0, 0, 0).unwrap().to_ntp_seconds().unwrap();

    let mut seconds = start.as_secs();
    while seconds < end.as_secs() {
        let instant = NtpSeconds::from_secs(seconds);
        let calendar = Calendar::from_ntp_seconds(instant).unwrap();
        let wire = encode(&calendar).unwrap();
        assert_eq!(wire, instant.to_wire());

        let reference = FixedReference::new(NtpSeconds::from_secs(seconds + 12_345));
        assert_eq!(decode(wire, &reference), calendar);

        seconds += 86_399 * 37 + 1;
    }
}

#[test]
fn test_encode_rejects_invalid_calendars() {
    let valid = Calendar::new(2021, 2, 28, 0, 0, 0).unwrap();

    let cases = [
        (
            Calendar {
                monthday: 29,
                ..valid
            },
            CalendarField::Monthday,
        ),
        (Calendar { month: 13, ..valid }, CalendarField::Month),
        (Calendar { hour: 24, ..valid }, CalendarField::Hour),
        (Calendar { minute: 60, ..valid }, CalendarField::Minute),
        (Calendar { second: 60, ..valid }, CalendarField::Second),
        (Calendar { year: 0, ..valid }, CalendarField::Year),
    ];

    for (calendar, field) in cases {
        match encode(&calendar) {
            Err(CalendarError::InvalidCalendarInput { field: got, .. }) => {
                assert_eq!(got, field, "{calendar:?}")
            }
            other => panic!("unexpected result {other:?} for {calendar:?}"),
        }
    }
}

#[test]
fn test_reference_is_restored_after_test() {
    let shared = SharedReference::new();
    let converter = TimestampConverter::new(shared.clone());

    {
        let _guard = shared.fix_time(2200, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(converter.decode(0).year, 2172);
        assert_eq!(converter.decode(u32::MAX).year, 2172);
    }

    assert!(!shared.is_installed());
    // the host clock is used again, which puts wire value 0 in 2036
    assert_eq!(converter.decode(0).year, 2036);
}
