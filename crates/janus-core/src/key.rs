// Janus Key Type
// Linux key codes and their configuration names

use std::fmt;
use std::str::FromStr;

include!(concat!(env!("OUT_DIR"), "/key_codes.rs"));

/// Friendlier spellings accepted in the config file.
const ALIASES: &[(&str, u16)] = &[
    ("ESCAPE", 1),
    ("CTRL", 29),
    ("LEFT_CTRL", 29),
    ("RIGHT_CTRL", 97),
    ("SHIFT", 42),
    ("LEFT_SHIFT", 42),
    ("RIGHT_SHIFT", 54),
    ("ALT", 56),
    ("LEFT_ALT", 56),
    ("RIGHT_ALT", 100),
    ("ALTGR", 100),
    ("META", 125),
    ("SUPER", 125),
    ("LEFT_META", 125),
    ("RIGHT_META", 126),
    ("RETURN", 28),
    ("CAPS", 58),
    ("PAGE_UP", 104),
    ("PAGE_DOWN", 109),
    ("PRTSCR", 99),
];

/// Highest key code the kernel accepts (`KEY_MAX`)
pub const KEY_MAX: u16 = 0x2ff;

/// Display name for a key code
pub fn key_name(code: u16) -> &'static str {
    KEY_TABLE
        .binary_search_by_key(&code, |(c, _)| *c)
        .map(|idx| KEY_TABLE[idx].1)
        .unwrap_or("UNKNOWN")
}

/// Parse a key from its config spelling.
///
/// Case-insensitive. Accepts the kernel name with or without the `KEY_`
/// prefix (`leftctrl`, `KEY_LEFTCTRL`), the aliases above, and raw
/// numeric codes up to `KEY_MAX` (`"57"`) for keys missing from the table.
pub fn key_from_name(name: &str) -> Option<Key> {
    let upper = name.trim().to_uppercase();
    let bare = upper.strip_prefix("KEY_").unwrap_or(&upper);

    if let Some((code, _)) = KEY_TABLE.iter().find(|(_, n)| *n == bare) {
        return Some(Key(*code));
    }
    if let Some((_, code)) = ALIASES.iter().find(|(n, _)| *n == bare) {
        return Some(Key(*code));
    }
    // "KEY_1" is the digit, a bare "1" as well; only unprefixed multi-digit
    // strings fall through to raw codes.
    if upper == bare && bare.len() > 1 {
        if let Ok(code) = bare.parse::<u16>() {
            return (code <= KEY_MAX).then_some(Key(code));
        }
    }
    None
}
