//! Case mapping and hostmask matching helpers.

/// RFC 1459 lowercase: ASCII letters plus `[]\~` map to `{}|^`.
#[inline]
pub fn irc_lower_char(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c.to_ascii_lowercase(),
    }
}

/// Lowercase a whole name under RFC 1459 case mapping.
///
/// ```
/// use straybot_proto::irc_to_lower;
///
/// assert_eq!(irc_to_lower("Stray[Bot]"), "stray{bot}");
/// ```
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Compare two nicknames or channel names under RFC 1459 case mapping.
///
/// ```
/// use straybot_proto::irc_eq;
///
/// assert!(irc_eq("StrayBot", "straybot"));
/// assert!(irc_eq("nick[away]", "NICK{AWAY}"));
/// assert!(!irc_eq("straybot", "straybot_"));
/// ```
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.chars().count() == b.chars().count()
        && a.chars()
            .zip(b.chars())
            .all(|(x, y)| irc_lower_char(x) == irc_lower_char(y))
}

/// Match a string against a pattern with `*` and `?` wildcards,
/// case-insensitively under RFC 1459 rules.
///
/// ```
/// use straybot_proto::wildcard_match;
///
/// assert!(wildcard_match("*", "anything"));
/// assert!(wildcard_match("te?t", "TEST"));
/// assert!(wildcard_match("*.example.com", "user.example.com"));
/// assert!(!wildcard_match("*.example.com", "example.org"));
/// ```
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().map(irc_lower_char).collect();
    let text: Vec<char> = text.chars().map(irc_lower_char).collect();

    let mut p = 0;
    let mut t = 0;
    let mut star_p = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star_p = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(sp) = star_p {
            // Backtrack: let the last '*' swallow one more character.
            p = sp + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}

/// Match a `nick!user@host` string against a hostmask pattern.
///
/// ```
/// use straybot_proto::matches_hostmask;
///
/// assert!(matches_hostmask("*!*@trusted.example", "alice!al@trusted.example"));
/// assert!(matches_hostmask("alice!*@*", "Alice!x@y"));
/// assert!(!matches_hostmask("*!admin@*", "nick!user@host"));
/// ```
#[inline]
pub fn matches_hostmask(pattern: &str, hostmask: &str) -> bool {
    wildcard_match(pattern, hostmask)
}
