//! Formatting helpers shared by the built-in plugins.

/// mIRC bold toggle.
pub const BOLD: char = '\x02';
/// mIRC formatting reset.
pub const RESET: char = '\x0F';

/// Reply for a privileged command run by a non-admin.
pub const NOT_AUTHORIZED: &str = "You are not authorized to use that command.";

/// Reply for malformed arguments.
pub const INCORRECT_USAGE: &str = "Incorrect usage.";

/// Wrap `text` in bold/reset control codes.
pub fn bold(text: &str) -> String {
    format!("{BOLD}{text}{RESET}")
}

/// English ordinal: `1st`, `2nd`, `3rd`, `4th`, `11th`, `22nd`.
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Render a ratio the way stat sheets print percentages: three truncated
/// decimals with a leading zero (`0.512`), `1.000` for a whole, and `-` when
/// the ratio is undefined.
pub fn percent(numerator: f64, denominator: f64) -> String {
    let ratio = numerator / denominator;
    if !ratio.is_finite() || ratio < 0.0 {
        return "-".to_string();
    }
    // Nudge so ratios like 0.92 do not truncate to 919.
    let thousandths = (ratio * 1000.0 + 1e-9).trunc() as u32;
    if thousandths >= 1000 {
        "1.000".to_string()
    } else {
        format!("0.{thousandths:03}")
    }
}

/// Rough human duration: `42 seconds`, `1 minute`, `3 hours`, `12 days`.
pub fn humanize_secs(secs: i64) -> String {
    let secs = secs.max(0);
    let (value, unit) = match secs {
        0..60 => (secs, "second"),
        60..3_600 => (secs / 60, "minute"),
        3_600..86_400 => (secs / 3_600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    if value == 1 {
        format!("1 {unit}")
    } else {
        format!("{value} {unit}s")
    }
}
