//! Four byte table tags.

use crate::error::ParseError;
use std::fmt;

/// Generate a 4-byte font table tag from byte string
macro_rules! tag {
    ($w:expr) => {
        tag(*$w)
    };
}

#[derive(PartialEq, Eq, Clone, Copy)]
pub struct DisplayTag(pub u32);

const fn tag(chars: [u8; 4]) -> u32 {
    ((chars[3] as u32) << 0)
        | ((chars[2] as u32) << 8)
        | ((chars[1] as u32) << 16)
        | ((chars[0] as u32) << 24)
}

/// Build a tag from a string of up to four ASCII characters, padding with spaces.
pub fn from_string(s: &str) -> Result<u32, ParseError> {
    if s.len() > 4 {
        return Err(ParseError::BadValue);
    }

    let mut tag: u32 = 0;
    let mut count = 0;

    for c in s.chars() {
        if !c.is_ascii() || c.is_ascii_control() {
            return Err(ParseError::BadValue);
        }

        tag = (tag << 8) | (c as u32);
        count += 1;
    }

    while count < 4 {
        tag = (tag << 8) | (' ' as u32);
        count += 1;
    }

    Ok(tag)
}

impl fmt::Display for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        if bytes.iter().any(|&b| !b.is_ascii() || b.is_ascii_control()) {
            write!(f, "0x{:08x}", self.0)
        } else {
            bytes.iter().try_for_each(|&b| write!(f, "{}", char::from(b)))
        }
    }
}

impl fmt::Debug for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// `CFF `
pub const CFF: u32 = tag!(b"CFF ");
/// `CFF2`
pub const CFF2: u32 = tag!(b"CFF2");
/// `glyf`
pub const GLYF: u32 = tag!(b"glyf");
/// `gvar`
pub const GVAR: u32 = tag!(b"gvar");
/// `head`
pub const HEAD: u32 = tag!(b"head");
/// `hhea`
pub const HHEA: u32 = tag!(b"hhea");
/// `hmtx`
pub const HMTX: u32 = tag!(b"hmtx");
/// `loca`
pub const LOCA: u32 = tag!(b"loca");
/// `maxp`
pub const MAXP: u32 = tag!(b"maxp");
/// `OTTO`
pub const OTTO: u32 = tag!(b"OTTO");
/// `true`
pub const TRUE: u32 = tag!(b"true");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string() {
        assert_eq!(from_string("glyf"), Ok(GLYF));
        assert_eq!(from_string("CFF"), Ok(CFF));
        assert_eq!(from_string("toolong"), Err(ParseError::BadValue));
    }

    #[test]
    fn test_display() {
        assert_eq!(DisplayTag(GVAR).to_string(), "gvar");
        assert_eq!(DisplayTag(0x12345678).to_string(), "0x12345678");
    }
}
