use chrono::{DateTime, Local, TimeZone, Utc};
use kbs_bridge::notification::NotificationType;

/// Unread counts above this are shown as `9+`.
const BADGE_LIMIT: usize = 9;

/// Formats the unread badge of the bell. No badge is shown when everything
/// is read.
pub fn unread_badge(unread: usize) -> Option<String> {
    match unread {
        0 => None,
        count if count > BADGE_LIMIT => Some(format!("{BADGE_LIMIT}+")),
        count => Some(count.to_string()),
    }
}

/// Icon shown in front of a notification of the given type.
pub fn type_icon(notification_type: NotificationType) -> &'static str {
    match notification_type {
        NotificationType::Success => "✔",
        NotificationType::Info => "ℹ",
        NotificationType::Warning => "⚠",
        NotificationType::Error => "✖",
    }
}

/// Formats a timestamp in the given time zone as e.g. `May 03, 14:05`.
pub fn format_timestamp_in<Tz: TimeZone>(timestamp: &DateTime<Utc>, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp
        .with_timezone(zone)
        .format("%b %d, %H:%M")
        .to_string()
}

/// Formats a timestamp in the local time zone.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    format_timestamp_in(timestamp, &Local)
}

/// Groups the digits of a whole number the Indian way: the last three
/// digits, then pairs (`12,34,567`).
fn group_digits(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{tail}", groups.join(","))
}

/// Formats an amount in rupees, e.g. `₹1,25,000` or `₹1,234.50`.
pub fn format_rupees(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    // amounts that round to zero carry no sign
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    let (whole, fraction) = (cents / 100, cents % 100);

    let grouped = group_digits(&whole.to_string());
    if fraction == 0 {
        format!("{sign}₹{grouped}")
    } else {
        format!("{sign}₹{grouped}.{fraction:02}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    #[test]
    fn badge_caps_at_nine() {
        assert_eq!(unread_badge(0), None);
        assert_eq!(unread_badge(3).as_deref(), Some("3"));
        assert_eq!(unread_badge(9).as_deref(), Some("9"));
        assert_eq!(unread_badge(10).as_deref(), Some("9+"));
    }

    #[test]
    fn timestamps_use_month_day_and_time() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 3, 8, 35, 0).unwrap();
        assert_eq!(format_timestamp_in(&timestamp, &Utc), "May 03, 08:35");

        let india = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        assert_eq!(format_timestamp_in(&timestamp, &india), "May 03, 14:05");
    }

    #[test]
    fn rupees_use_indian_grouping() {
        assert_eq!(format_rupees(950.0), "₹950");
        assert_eq!(format_rupees(1234.5), "₹1,234.50");
        assert_eq!(format_rupees(125000.0), "₹1,25,000");
        assert_eq!(format_rupees(12345678.0), "₹1,23,45,678");
        assert_eq!(format_rupees(-500.0), "-₹500");
        assert_eq!(format_rupees(-0.001), "₹0");
        assert_eq!(format_rupees(-0.25), "-₹0.25");
    }
}
