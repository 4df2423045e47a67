use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Wall-clock seconds between two instants, rounded to the nearest second.
pub(crate) fn elapsed_whole_seconds(start: PrimitiveDateTime, end: PrimitiveDateTime) -> i64 {
    let millis = (end - start).whole_milliseconds();
    ((millis as f64) / 1000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Duration, Time};

    fn at(hour: u8, minute: u8, second: u8) -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        PrimitiveDateTime::new(date, Time::from_hms(hour, minute, second).unwrap())
    }

    #[test]
    fn format_primitive_outputs_utc_z() {
        assert_eq!(format_primitive(at(10, 20, 30)), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn elapsed_rounds_to_nearest_second() {
        let start = at(10, 0, 0);
        assert_eq!(elapsed_whole_seconds(start, at(10, 5, 0)), 300);
        assert_eq!(elapsed_whole_seconds(start, start + Duration::milliseconds(1_499)), 1);
        assert_eq!(elapsed_whole_seconds(start, start + Duration::milliseconds(1_500)), 2);
    }

    #[test]
    fn elapsed_is_zero_for_identical_instants() {
        let start = at(10, 0, 0);
        assert_eq!(elapsed_whole_seconds(start, start), 0);
    }
}
