use std::collections::HashMap;

use chrono::{Duration, NaiveTime};
use rand::seq::IndexedRandom;

/// Back-to-back bookings on one host collide with provider-side setup and
/// teardown, so conflict search widens the requested slot on both ends.
pub const PAD_MINUTES: i64 = 30;

/// Requested interval expanded by the pad, clamped to the civil day so the
/// search window never wraps past midnight.
pub fn padded_window(start: NaiveTime, end: NaiveTime) -> (NaiveTime, NaiveTime) {
    let pad = Duration::minutes(PAD_MINUTES);

    let (win_start, start_wrapped) = start.overflowing_sub_signed(pad);
    let win_start = if start_wrapped != 0 {
        NaiveTime::MIN
    } else {
        win_start
    };

    let (win_end, end_wrapped) = end.overflowing_add_signed(pad);
    let win_end = if end_wrapped != 0 {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
    } else {
        win_end
    };

    (win_start, win_end)
}

/// Strict inequalities on both ends: an existing booking that exactly
/// touches the window boundary does not count as overlapping.
pub fn overlaps(
    existing_start: NaiveTime,
    existing_end: NaiveTime,
    win_start: NaiveTime,
    win_end: NaiveTime,
) -> bool {
    existing_end > win_start && existing_start < win_end
}

/// Uniformly random pick from the hosts not in use, spreading load without
/// tracking usage history. Returns `(host_id, host_login)`.
pub fn pick_host(
    configured: &HashMap<String, String>,
    busy: &[String],
) -> Option<(String, String)> {
    let candidates: Vec<(&String, &String)> = configured
        .iter()
        .filter(|(host_id, _)| !busy.iter().any(|b| b == *host_id))
        .collect();

    candidates
        .choose(&mut rand::rng())
        .map(|(host_id, host_login)| ((*host_id).clone(), (*host_login).clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(time: &str) -> NaiveTime {
        NaiveTime::parse_from_str(time, "%H:%M").unwrap()
    }

    fn hosts(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(id, login)| (id.to_string(), login.to_string()))
            .collect()
    }

    #[test]
    fn test_padded_window_extends_both_ends() {
        let (win_start, win_end) = padded_window(t("09:00"), t("10:00"));
        assert_eq!(win_start, t("08:30"));
        assert_eq!(win_end, t("10:30"));
    }

    #[test]
    fn test_padded_window_clamps_at_midnight() {
        let (win_start, _) = padded_window(t("00:10"), t("01:00"));
        assert_eq!(win_start, NaiveTime::MIN);

        let (_, win_end) = padded_window(t("23:00"), t("23:45"));
        assert_eq!(win_end, NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn test_touching_meetings_do_not_overlap_without_pad() {
        // A ends exactly when B starts
        assert!(!overlaps(t("10:00"), t("11:00"), t("09:00"), t("10:00")));
    }

    #[test]
    fn test_touching_meetings_conflict_once_padded() {
        let (win_start, win_end) = padded_window(t("09:00"), t("10:00"));
        // booking that starts exactly at the requested end
        assert!(overlaps(t("10:00"), t("11:00"), win_start, win_end));
        // gap smaller than the pad still conflicts
        assert!(overlaps(t("10:20"), t("11:00"), win_start, win_end));
        // gap larger than the pad is fine
        assert!(!overlaps(t("10:30"), t("11:00"), win_start, win_end));
    }

    #[test]
    fn test_nested_booking_conflicts() {
        let (win_start, win_end) = padded_window(t("09:15"), t("09:45"));
        assert!(overlaps(t("09:00"), t("10:00"), win_start, win_end));
    }

    #[test]
    fn test_pick_host_skips_busy_hosts() {
        let configured = hosts(&[("host-1", "a@example.com"), ("host-2", "b@example.com")]);
        let busy = vec!["host-1".to_string()];
        let picked = pick_host(&configured, &busy);
        assert_eq!(
            picked,
            Some(("host-2".to_string(), "b@example.com".to_string()))
        );
    }

    #[test]
    fn test_pick_host_exhausted_pool() {
        let configured = hosts(&[("host-1", "a@example.com")]);
        let busy = vec!["host-1".to_string()];
        assert_eq!(pick_host(&configured, &busy), None);
    }

    #[test]
    fn test_pick_host_returns_configured_pair() {
        let configured = hosts(&[
            ("host-1", "a@example.com"),
            ("host-2", "b@example.com"),
            ("host-3", "c@example.com"),
        ]);
        let (host_id, host_login) = pick_host(&configured, &[]).unwrap();
        assert_eq!(configured.get(&host_id), Some(&host_login));
    }
}
