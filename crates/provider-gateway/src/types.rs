use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// All civil times handled by the gateway are expressed in a single fixed
/// UTC+8 timezone. Providers that want UTC get this subtracted.
pub const CIVIL_UTC_OFFSET_HOURS: i64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeetingPlatform {
    Zoom,
    Welink,
    Tencent,
}

impl MeetingPlatform {
    pub const ALL: [MeetingPlatform; 3] = [
        MeetingPlatform::Zoom,
        MeetingPlatform::Welink,
        MeetingPlatform::Tencent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingPlatform::Zoom => "zoom",
            MeetingPlatform::Welink => "welink",
            MeetingPlatform::Tencent => "tencent",
        }
    }

    /// Capitalized form used in user-facing text (mail bodies, calendar uids).
    pub fn display_name(&self) -> &'static str {
        match self {
            MeetingPlatform::Zoom => "Zoom",
            MeetingPlatform::Welink => "WeLink",
            MeetingPlatform::Tencent => "Tencent Meeting",
        }
    }
}

impl fmt::Display for MeetingPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown meeting platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for MeetingPlatform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zoom" => Ok(MeetingPlatform::Zoom),
            "welink" => Ok(MeetingPlatform::Welink),
            "tencent" => Ok(MeetingPlatform::Tencent),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordMode {
    #[default]
    None,
    Cloud,
}

impl RecordMode {
    pub fn is_cloud(&self) -> bool {
        matches!(self, RecordMode::Cloud)
    }
}

/// Provider-neutral description of the meeting to book. `host_id` is the
/// configuration key of the allocated host; `host_login` the provider-side
/// account the adapter books against.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub topic: String,
    pub host_id: String,
    pub host_login: String,
    pub record: RecordMode,
}

impl BookingRequest {
    pub fn start_datetime(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.start)
    }

    pub fn end_datetime(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.end)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_datetime() - self.start_datetime()).num_minutes()
    }
}

/// Normalized successful booking result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedMeeting {
    pub mid: String,
    /// Provider-internal id some backends need for cancel/participants calls.
    pub secondary_id: Option<String>,
    pub join_url: String,
    pub start_url: Option<String>,
    pub host_id: String,
    pub timezone: Option<String>,
}

/// Everything a cancel or participants call may need, resolved from the
/// persisted meeting record by the caller. Adapters never read the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelTicket {
    pub mid: String,
    pub secondary_id: Option<String>,
    pub host_id: String,
    pub host_login: String,
}

pub type ParticipantsPayload = serde_json::Value;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status. Carries the raw
    /// status so callers can log it; the response body is not preserved.
    #[error("provider returned status {status}")]
    Api { status: u16 },

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("credential plumbing failed: {0}")]
    Auth(String),

    #[error("no provider meeting id recorded for {0}")]
    MissingMeetingId(String),
}

#[async_trait::async_trait]
pub trait MeetingProvider: Send + Sync {
    async fn create_meeting(&self, booking: &BookingRequest)
    -> Result<BookedMeeting, ProviderError>;

    async fn cancel_meeting(&self, ticket: &CancelTicket) -> Result<(), ProviderError>;

    async fn get_participants(
        &self,
        ticket: &CancelTicket,
    ) -> Result<ParticipantsPayload, ProviderError>;
}

/// Converts a civil date/time into naive UTC by subtracting the fixed offset.
pub fn civil_to_utc(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    NaiveDateTime::new(date, time) - Duration::hours(CIVIL_UTC_OFFSET_HOURS)
}

/// Epoch seconds of a civil date/time interpreted in the fixed offset.
pub fn civil_timestamp(date: NaiveDate, time: NaiveTime) -> i64 {
    civil_to_utc(date, time).and_utc().timestamp()
}

/// Extracts a string out of a JSON field that providers sometimes send as a
/// number and sometimes as a string.
pub(crate) fn json_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn civil(date: &str, time: &str) -> (NaiveDate, NaiveTime) {
        (
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
        )
    }

    #[test]
    fn test_platform_round_trip() {
        for platform in MeetingPlatform::ALL {
            assert_eq!(platform.as_str().parse::<MeetingPlatform>(), Ok(platform));
        }
        assert!("teams".parse::<MeetingPlatform>().is_err());
    }

    #[test]
    fn test_civil_to_utc_subtracts_fixed_offset() {
        let (date, time) = civil("2025-03-10", "09:00");
        let utc = civil_to_utc(date, time);
        assert_eq!(utc.format("%Y-%m-%dT%H:%M:%SZ").to_string(), "2025-03-10T01:00:00Z");
    }

    #[test]
    fn test_civil_to_utc_crosses_midnight() {
        let (date, time) = civil("2025-03-10", "07:30");
        let utc = civil_to_utc(date, time);
        assert_eq!(utc.format("%Y-%m-%d %H:%M").to_string(), "2025-03-09 23:30");
    }

    #[test]
    fn test_civil_timestamp_matches_utc_epoch() {
        let (date, time) = civil("2025-03-10", "09:00");
        // 2025-03-10T01:00:00Z
        assert_eq!(civil_timestamp(date, time), 1_741_568_400);
    }

    #[test]
    fn test_duration_minutes() {
        let (date, start) = civil("2025-03-10", "09:00");
        let (_, end) = civil("2025-03-10", "10:30");
        let booking = BookingRequest {
            date,
            start,
            end,
            topic: "Weekly Sync".to_string(),
            host_id: "host-1".to_string(),
            host_login: "host-1@example.com".to_string(),
            record: RecordMode::None,
        };
        assert_eq!(booking.duration_minutes(), 90);
    }

    #[test]
    fn test_json_id_accepts_number_and_string() {
        assert_eq!(json_id(&serde_json::json!(8210739)), Some("8210739".to_string()));
        assert_eq!(json_id(&serde_json::json!("8210739")), Some("8210739".to_string()));
        assert_eq!(json_id(&serde_json::json!(null)), None);
    }
}
