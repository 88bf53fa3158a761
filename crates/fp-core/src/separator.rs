//! Word-separator classification for trigger matching
//!
//! Code points below 256 are answered from a table built at compile time.
//! Everything above falls back to a Unicode class check.

use once_cell::sync::Lazy;
use regex::Regex;

/// Extra characters treated as separators on top of whitespace and punctuation.
pub const EXTRA_SEPARATORS: [char; 5] = ['+', '=', '<', '>', '|'];

static SEPARATOR_TABLE: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = match i as u8 {
            // Whitespace and line terminators
            0x09..=0x0D | b' ' | 0x85 | 0xA0 => true,
            // General punctuation (Unicode P* categories) in ASCII
            b'!' | b'"' | b'#' | b'%' | b'&' | b'\'' | b'(' | b')' | b'*' | b',' | b'-'
            | b'.' | b'/' | b':' | b';' | b'?' | b'@' | b'[' | b'\\' | b']' | b'_' | b'{'
            | b'}' => true,
            // General punctuation in Latin-1: ¡ § « ¶ · » ¿
            0xA1 | 0xA7 | 0xAB | 0xB6 | 0xB7 | 0xBB | 0xBF => true,
            b'+' | b'=' | b'<' | b'>' | b'|' => true,
            _ => false,
        };
        i += 1;
    }
    table
};

static WIDE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{P}\s]$").unwrap());

/// Check whether `c` separates words.
#[inline]
pub fn is_separator(c: char) -> bool {
    let code = c as u32;
    if code < 256 {
        return SEPARATOR_TABLE[code as usize];
    }
    is_wide_separator(c)
}

fn is_wide_separator(c: char) -> bool {
    if c.is_whitespace() {
        return true;
    }
    let mut buf = [0u8; 4];
    WIDE_SEPARATOR.is_match(c.encode_utf8(&mut buf))
}
