//! Display formatting for timestamps and file sizes. Pure helpers for the
//! view layer; the core never consults them. All labels are computed in UTC.

use chrono::{DateTime, Datelike, Utc};

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

fn at(timestamp_ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn is_yesterday(timestamp_ms: i64, now_ms: i64) -> bool {
    at(timestamp_ms).date_naive().succ_opt() == Some(at(now_ms).date_naive())
}

fn is_same_day(timestamp_ms: i64, now_ms: i64) -> bool {
    at(timestamp_ms).date_naive() == at(now_ms).date_naive()
}

fn is_this_year(timestamp_ms: i64, now_ms: i64) -> bool {
    at(timestamp_ms).year() == at(now_ms).year()
}

/// Relative age label for the chat list row, e.g. "Just now", "5m ago",
/// "Yesterday", "Saturday", "Dec 1", "Jun 15, 2022".
pub fn format_chat_list_time(timestamp_ms: i64) -> String {
    chat_list_time(timestamp_ms, Utc::now().timestamp_millis())
}

fn chat_list_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms - timestamp_ms;
    if diff < 0 {
        return "Just now".to_string();
    }

    let minutes = diff / MINUTE_MS;
    let hours = diff / HOUR_MS;
    let days = diff / DAY_MS;
    let when = at(timestamp_ms);

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if is_yesterday(timestamp_ms, now_ms) {
        "Yesterday".to_string()
    } else if days < 7 {
        when.format("%A").to_string()
    } else if is_this_year(timestamp_ms, now_ms) {
        when.format("%b %-d").to_string()
    } else {
        when.format("%b %-d, %Y").to_string()
    }
}

/// Clock-time label for a message bubble, prefixed with the day once the
/// message is no longer from today.
pub fn format_message_time(timestamp_ms: i64) -> String {
    message_time(timestamp_ms, Utc::now().timestamp_millis())
}

fn message_time(timestamp_ms: i64, now_ms: i64) -> String {
    let when = at(timestamp_ms);
    let time = when.format("%-I:%M %p").to_string();
    let days = (now_ms - timestamp_ms) / DAY_MS;

    if is_same_day(timestamp_ms, now_ms) {
        time
    } else if is_yesterday(timestamp_ms, now_ms) {
        format!("Yesterday, {time}")
    } else if days < 7 {
        format!("{}, {time}", when.format("%A"))
    } else if is_this_year(timestamp_ms, now_ms) {
        format!("{}, {time}", when.format("%b %-d"))
    } else {
        format!("{}, {time}", when.format("%b %-d, %Y"))
    }
}

/// Human file size with one decimal above the byte range: "245.7 KB".
pub fn format_file_size(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let group = (((bytes as f64).log10() / 1024f64.log10()) as usize).min(UNITS.len() - 1);
    if group == 0 {
        format!("{bytes} B")
    } else {
        let size = bytes as f64 / 1024f64.powi(group as i32);
        format!("{size:.1} {}", UNITS[group])
    }
}
