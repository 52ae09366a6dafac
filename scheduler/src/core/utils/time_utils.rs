use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Every date/time the service stores or compares is civil time in one
/// fixed UTC+8 zone; wall-clock reads go through here so the offset is
/// applied in exactly one place.
pub const CIVIL_UTC_OFFSET_HOURS: i32 = 8;

pub fn civil_offset() -> FixedOffset {
    // 8 * 3600 is always in range for FixedOffset
    FixedOffset::east_opt(CIVIL_UTC_OFFSET_HOURS * 3600).unwrap_or(FixedOffset::east_opt(0).unwrap())
}

/// Current civil date/time in the fixed community timezone.
pub fn civil_now() -> NaiveDateTime {
    Utc::now().with_timezone(&civil_offset()).naive_local()
}

/// Converts a civil date/time to naive UTC for calendar payloads.
pub fn civil_to_utc(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    NaiveDateTime::new(date, time) - Duration::hours(CIVIL_UTC_OFFSET_HOURS as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_civil_to_utc() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let utc = civil_to_utc(date, time);
        assert_eq!(utc.format("%Y-%m-%d %H:%M").to_string(), "2025-03-10 01:00");
    }
}
