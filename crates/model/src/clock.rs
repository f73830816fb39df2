use alloc::{format, string::String};

/// Below this many seconds the countdown should be highlighted.
pub const LOW_TIME_SECS: u32 = 300;

/// Formats seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub const fn is_running_low(seconds: u32) -> bool {
    seconds < LOW_TIME_SECS
}
