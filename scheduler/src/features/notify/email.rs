use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::OnceLock;

use icalendar::{Alarm, Calendar, Component, Event, EventLike, Property};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use provider_gateway::types::MeetingPlatform;
use regex::Regex;
use tracing::info;

use crate::core::entities::models::Meeting;
use crate::core::env::app_env::SmtpConfig;
use crate::core::types::errors::notify_error::NotifyError;
use crate::core::utils::time_utils::civil_to_utc;

const TEMPLATE_PLAIN: &str = include_str!("../../../templates/meeting_created.txt");
const TEMPLATE_AGENDA: &str = include_str!("../../../templates/meeting_created_with_agenda.txt");
const TEMPLATE_RECORD: &str = include_str!("../../../templates/meeting_created_with_record.txt");
const TEMPLATE_AGENDA_RECORD: &str =
    include_str!("../../../templates/meeting_created_with_agenda_and_record.txt");
const TEMPLATE_CANCEL: &str = include_str!("../../../templates/meeting_cancelled.txt");

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9+_.-]+@[a-zA-Z0-9_-]+(\.[a-zA-Z0-9_-]+)+$")
            .expect("address pattern is valid")
    })
}

/// Splits the stored distribution list, drops addresses that fail the
/// conservative pattern, then deduplicates and sorts what is left.
pub fn normalize_recipients(raw: &str) -> (Vec<String>, Vec<String>) {
    let cleaned = raw
        .replace(' ', "")
        .replace('，', ",")
        .replace(';', ",")
        .replace('；', ",");

    let mut invalid = Vec::new();
    let mut valid = BTreeSet::new();
    for addr in cleaned.split(',').filter(|addr| !addr.is_empty()) {
        if address_pattern().is_match(addr) {
            valid.insert(addr.to_string());
        } else {
            invalid.push(addr.to_string());
        }
    }

    (valid.into_iter().collect(), invalid)
}

fn platform_display(mplatform: &str) -> String {
    MeetingPlatform::from_str(mplatform)
        .map(|platform| platform.display_name().to_string())
        .unwrap_or_else(|_| mplatform.to_string())
}

fn fill(template: &str, meeting: &Meeting) -> String {
    let start_time = format!(
        "{} {}",
        meeting.date.format("%Y-%m-%d"),
        meeting.start_time.format("%H:%M")
    );
    template
        .replace("{{sig_name}}", &meeting.group_name)
        .replace("{{start_time}}", &start_time)
        .replace("{{join_url}}", &meeting.join_url)
        .replace("{{topic}}", &meeting.topic)
        .replace("{{platform}}", &platform_display(&meeting.mplatform))
        .replace("{{etherpad}}", meeting.etherpad.as_deref().unwrap_or(""))
        .replace("{{summary}}", meeting.agenda.as_deref().unwrap_or(""))
}

/// One of four fixed body variants, keyed by agenda/recording presence.
pub fn created_body(meeting: &Meeting, record: bool) -> String {
    let has_agenda = meeting
        .agenda
        .as_deref()
        .is_some_and(|agenda| !agenda.is_empty());

    let template = match (has_agenda, record) {
        (false, false) => TEMPLATE_PLAIN,
        (true, false) => TEMPLATE_AGENDA,
        (false, true) => TEMPLATE_RECORD,
        (true, true) => TEMPLATE_AGENDA_RECORD,
    };

    fill(template, meeting)
}

pub fn cancelled_body(meeting: &Meeting) -> String {
    fill(TEMPLATE_CANCEL, meeting)
}

/// Calendar object attached to both mail variants. `REQUEST` carries a
/// 15-minute display alarm; `CANCEL` bumps the sequence so clients retract
/// the original invite.
pub fn build_calendar(meeting: &Meeting, method: &str, attendees: &[String]) -> String {
    let dt_start = civil_to_utc(meeting.date, meeting.start_time).and_utc();
    let dt_end = civil_to_utc(meeting.date, meeting.end_time).and_utc();

    let mut event = Event::new();
    event.uid(&format!("{}{}", meeting.mplatform, meeting.mid));
    event.summary(&meeting.topic);
    event.starts(dt_start);
    event.ends(dt_end);
    event.add_property("ATTENDEE", &attendees.join(","));

    if method == "CANCEL" {
        event.add_property("SEQUENCE", "1");
    } else {
        event.alarm(Alarm::display("Reminder", -chrono::Duration::minutes(15)));
    }

    let mut calendar = Calendar::new();
    calendar.append_property(Property::new("METHOD", method));
    calendar.push(event.done());
    calendar.done().to_string()
}

#[derive(Debug, Clone)]
pub struct EmailSender {
    cfg: SmtpConfig,
}

impl EmailSender {
    pub fn new(cfg: SmtpConfig) -> Self {
        Self { cfg }
    }

    pub fn send_created(&self, meeting: &Meeting, record: bool) -> Result<(), NotifyError> {
        let (recipients, invalid) = normalize_recipients(&meeting.emaillist);
        if !invalid.is_empty() {
            info!("dropped invalid addresses: {:?}", invalid);
        }
        if recipients.is_empty() {
            info!(
                "Event of creating meeting {} has no email to send.",
                meeting.mid
            );
            return Ok(());
        }

        let body = created_body(meeting, record);
        let calendar = build_calendar(meeting, "REQUEST", &recipients);
        self.deliver(&recipients, &meeting.topic, body, calendar, "REQUEST")
    }

    pub fn send_cancelled(&self, meeting: &Meeting) -> Result<(), NotifyError> {
        let (recipients, invalid) = normalize_recipients(&meeting.emaillist);
        if !invalid.is_empty() {
            info!("dropped invalid addresses: {:?}", invalid);
        }
        if recipients.is_empty() {
            info!(
                "Event of cancelling meeting {} has no email to send.",
                meeting.mid
            );
            return Ok(());
        }

        let subject = format!("[Cancel] {}", meeting.topic);
        let body = cancelled_body(meeting);
        let calendar = build_calendar(meeting, "CANCEL", &recipients);
        self.deliver(&recipients, &subject, body, calendar, "CANCEL")
    }

    fn deliver(
        &self,
        recipients: &[String],
        subject: &str,
        body: String,
        calendar: String,
        method: &str,
    ) -> Result<(), NotifyError> {
        let from: Mailbox = self.cfg.from.parse()?;
        let mut builder = Message::builder().from(from).subject(subject);
        for addr in recipients {
            builder = builder.to(addr.parse()?);
        }

        let content_type =
            ContentType::parse(&format!("text/calendar; method={method}; charset=utf-8"))
                .map_err(|err| NotifyError::ContentType(err.to_string()))?;
        let calendar_part = SinglePart::builder().header(content_type).body(calendar);

        let message = builder.multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(body))
                .singlepart(calendar_part),
        )?;

        let creds = Credentials::new(self.cfg.username.clone(), self.cfg.password.clone());
        let mailer = SmtpTransport::starttls_relay(&self.cfg.host)?
            .port(self.cfg.port)
            .credentials(creds)
            .build();

        mailer.send(&message)?;
        info!("email sent: {}", recipients.join(","));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn sample_meeting(agenda: Option<&str>) -> Meeting {
        let now = chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc();
        Meeting {
            id: 1,
            mid: "987654321".to_string(),
            mmid: None,
            topic: "Weekly Sync".to_string(),
            community: "community".to_string(),
            sponsor: "gopher".to_string(),
            group_name: "Infra".to_string(),
            group_id: 12,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            timezone: "Asia/Shanghai".to_string(),
            etherpad: Some("https://etherpad.example.org/p/infra".to_string()),
            agenda: agenda.map(str::to_string),
            emaillist: "b@example.com,a@example.com".to_string(),
            host_id: "host-1".to_string(),
            join_url: "https://meet.example.com/j/987654321".to_string(),
            start_url: None,
            is_delete: 0,
            user_id: 7,
            mplatform: "zoom".to_string(),
            created_at: now,
        }
    }

    #[test]
    fn test_normalize_recipients_dedups_and_sorts() {
        let (valid, invalid) =
            normalize_recipients("b@example.com, a@example.com；b@example.com");
        assert_eq!(valid, vec!["a@example.com", "b@example.com"]);
        assert!(invalid.is_empty());
    }

    #[test]
    fn test_normalize_recipients_drops_invalid() {
        let (valid, invalid) = normalize_recipients("a@example.com,not-an-address,b@");
        assert_eq!(valid, vec!["a@example.com"]);
        assert_eq!(invalid, vec!["not-an-address", "b@"]);
    }

    #[test]
    fn test_normalize_recipients_empty_list() {
        let (valid, invalid) = normalize_recipients("");
        assert!(valid.is_empty());
        assert!(invalid.is_empty());
    }

    #[test]
    fn test_created_body_selects_template() {
        let plain = created_body(&sample_meeting(None), false);
        assert!(!plain.contains("Agenda:"));
        assert!(!plain.contains("recorded"));

        let with_agenda = created_body(&sample_meeting(Some("1. roadmap")), false);
        assert!(with_agenda.contains("Agenda:"));
        assert!(with_agenda.contains("1. roadmap"));

        let with_record = created_body(&sample_meeting(None), true);
        assert!(with_record.contains("recorded"));

        let both = created_body(&sample_meeting(Some("1. roadmap")), true);
        assert!(both.contains("Agenda:"));
        assert!(both.contains("recorded"));
    }

    #[test]
    fn test_created_body_fills_placeholders() {
        let body = created_body(&sample_meeting(None), false);
        assert!(body.contains("Weekly Sync"));
        assert!(body.contains("Zoom"));
        assert!(body.contains("2025-03-10 09:00"));
        assert!(body.contains("https://meet.example.com/j/987654321"));
        assert!(!body.contains("{{"));
    }

    #[test]
    fn test_calendar_request_has_alarm() {
        let meeting = sample_meeting(None);
        let ics = build_calendar(&meeting, "REQUEST", &["a@example.com".to_string()]);
        assert!(ics.contains("METHOD:REQUEST"));
        assert!(ics.contains("VALARM"));
        assert!(ics.contains("UID:zoom987654321"));
        assert!(ics.contains("DTSTART:20250310T010000Z"));
    }

    #[test]
    fn test_calendar_cancel_bumps_sequence() {
        let meeting = sample_meeting(None);
        let ics = build_calendar(&meeting, "CANCEL", &["a@example.com".to_string()]);
        assert!(ics.contains("METHOD:CANCEL"));
        assert!(ics.contains("SEQUENCE:1"));
        assert!(!ics.contains("VALARM"));
    }
}
