//! Completion announcements: retry accounting and message text.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::state::format_seconds;

/// Number of retries implied by a page attempt counter such as `"2 / 3"`.
///
/// The counter shows the current attempt and the total number of attempts;
/// every attempt after the first is a retry.
pub fn retries_from_counter(counter: &str) -> u32 {
    static COUNTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\s*/\s*(\d+)").unwrap());

    COUNTER_RE
        .captures(counter)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map(|total| total.saturating_sub(1))
        .unwrap_or(0)
}

/// Notification text for a finished response
pub fn format_completion_message(app_name: &str, elapsed: Duration, retries: u32) -> String {
    let mut message = String::from("Done\n");
    if retries > 0 {
        message.push_str(&format!("'{}' saved you: ~{} clicks\n", app_name, retries));
    }
    message.push_str(&format!("Latest attempt took: {}s", format_seconds(elapsed)));
    message
}
