// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Millisecond-epoch duration formatting shared by the CLI and daemon logs.

/// Format an elapsed duration (in milliseconds) as a short human string,
/// e.g. `1500` -> `"1.5s"`, `90_000` -> `"1m30s"`.
pub fn format_elapsed_ms(elapsed_ms: u64) -> String {
    format_elapsed(std::time::Duration::from_millis(elapsed_ms))
}

/// Format a [`std::time::Duration`] as a short human string.
pub fn format_elapsed(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        let tenths = elapsed.subsec_millis() / 100;
        if tenths > 0 && secs < 10 {
            return format!("{}.{}s", secs, tenths);
        }
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    let rem_secs = secs % 60;
    if mins < 60 {
        return format!("{}m{}s", mins, rem_secs);
    }
    let hours = mins / 60;
    let rem_mins = mins % 60;
    format!("{}h{}m", hours, rem_mins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_minute() {
        assert_eq!(format_elapsed_ms(1500), "1.5s");
        assert_eq!(format_elapsed_ms(45_000), "45s");
    }

    #[test]
    fn minutes_and_hours() {
        assert_eq!(format_elapsed_ms(90_000), "1m30s");
        assert_eq!(format_elapsed_ms(3_700_000), "1h1m");
    }
}
