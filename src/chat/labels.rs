//! Conversation titles and relative timestamps
//!
//! Pure functions used by the store (titles) and the sidebar listing
//! (relative creation times). Neither touches any state.

use super::conversation::NEW_CHAT_TITLE;
use super::message::Message;
use chrono::{DateTime, Datelike, TimeZone, Timelike};

/// Default number of characters of the first message kept in a title
pub const DEFAULT_TITLE_MAX_CHARS: usize = 50;

/// Marker appended to a truncated title
pub const ELLIPSIS: &str = "...";

/// Derives a conversation title from its messages
///
/// Uses the first line of the first message's content, cut to `max_chars`
/// characters. A trailing `...` marks a title that was cut, either by the
/// character limit or by dropping later lines. An empty list yields the
/// fixed placeholder title.
///
/// # Examples
///
/// ```
/// use chatshell::chat::{derive_title, Message};
///
/// assert_eq!(derive_title(&[], 50), "New chat");
/// assert_eq!(derive_title(&[Message::user("Hello")], 50), "Hello");
/// assert_eq!(derive_title(&[Message::user("abcdefgh")], 4), "abcd...");
/// assert_eq!(derive_title(&[Message::user("one\ntwo")], 50), "one...");
/// ```
pub fn derive_title(messages: &[Message], max_chars: usize) -> String {
    let Some(first) = messages.first() else {
        return NEW_CHAT_TITLE.to_string();
    };

    // Titles are single-line
    let mut lines = first.content().trim().lines();
    let line = lines.next().unwrap_or_default().trim_end();

    let mut chars = line.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() || lines.next().is_some() {
        format!("{}{}", head, ELLIPSIS)
    } else {
        head
    }
}

/// Formats a creation instant relative to `now`
///
/// Buckets are measured in whole elapsed hours:
///
/// | elapsed      | label                  |
/// |--------------|------------------------|
/// | < 24h        | `3:07 PM`              |
/// | < 48h        | `Yesterday 3:07 PM`    |
/// | < 168h       | `4d 3:07 PM`           |
/// | otherwise    | `6/14 3:07 PM`         |
///
/// # Examples
///
/// ```
/// use chatshell::chat::relative_label;
/// use chrono::{TimeZone, Utc};
///
/// let created = Utc.with_ymd_and_hms(2024, 6, 14, 15, 7, 0).unwrap();
/// let now = Utc.with_ymd_and_hms(2024, 6, 15, 16, 0, 0).unwrap();
/// assert_eq!(relative_label(&created, &now), "Yesterday 3:07 PM");
/// ```
pub fn relative_label<Tz: TimeZone>(created: &DateTime<Tz>, now: &DateTime<Tz>) -> String {
    let hours = now.clone().signed_duration_since(created.clone()).num_hours();
    let clock = clock_time(created);

    if hours < 24 {
        clock
    } else if hours < 48 {
        format!("Yesterday {}", clock)
    } else if hours < 168 {
        format!("{}d {}", hours / 24, clock)
    } else {
        format!("{}/{} {}", created.month(), created.day(), clock)
    }
}

/// 12-hour clock time, e.g. `12:05 AM`
fn clock_time<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    let (is_pm, hour12) = at.hour12();
    let suffix = if is_pm { "PM" } else { "AM" };
    format!("{}:{:02} {}", hour12, at.minute(), suffix)
}
