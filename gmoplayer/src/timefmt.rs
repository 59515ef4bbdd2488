//! Analyse et formatage des positions de lecture

use std::time::Duration;

/// Parse a user-supplied timespan into a [`Duration`].
///
/// Accepted forms:
/// - suffixed segments: `"1h30m"`, `"2m10s"`, `"45s"`, `"1d2h"` (w/d/h/m/s)
/// - colon form: `"1:02:30"` or `"2:30"`
/// - a bare integer, read as seconds: `"90"`
///
/// Returns `None` for anything else.
pub fn parse_timespan(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if input.contains(':') {
        return parse_colon_form(input);
    }

    if let Ok(seconds) = input.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    parse_suffixed_form(input)
}

fn parse_colon_form(input: &str) -> Option<Duration> {
    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut seconds: u64 = 0;
    for part in &parts {
        if part.is_empty() {
            return None;
        }
        let value = part.parse::<u64>().ok()?;
        seconds = seconds * 60 + value;
    }
    Some(Duration::from_secs(seconds))
}

fn parse_suffixed_form(input: &str) -> Option<Duration> {
    let mut seconds: u64 = 0;
    let mut value: Option<u64> = None;

    for c in input.chars() {
        if let Some(digit) = c.to_digit(10) {
            value = Some(value.unwrap_or(0) * 10 + u64::from(digit));
            continue;
        }

        let factor = match c.to_ascii_lowercase() {
            'w' => 7 * 24 * 3600,
            'd' => 24 * 3600,
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        seconds += value.take()? * factor;
    }

    // Un nombre sans suffixe final est invalide ("1h30")
    if value.is_some() {
        return None;
    }
    Some(Duration::from_secs(seconds))
}

/// Format a millisecond duration as `H:MM:SS`, or `M:SS` under one hour.
pub fn format_duration_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
