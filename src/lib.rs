#![warn(rust_2018_idioms)]

//! Readers for the programs that describe glyph outlines in OpenType fonts.
//!
//! * [cff] reads CFF and CFF2 tables and runs their Type 2 charstrings through
//!   [cff::charstring::Type2Interpreter].
//! * [tables::glyf] reads TrueType `glyf` outlines, applying `gvar` deltas for
//!   variable fonts.
//!
//! Both deliver their paths to an [outline::OutlineSink].

/// Reading of binary data.
pub mod binary;
pub mod cff;
pub mod error;
pub mod outline;
pub mod size;
pub mod tables;
pub mod tag;
/// Shared test code.
#[cfg(test)]
pub mod tests;

/// Conversions that cannot fail on the platforms this crate supports.
pub trait SafeFrom<T>: Sized {
    fn safe_from(t: T) -> Self;
}

impl SafeFrom<u8> for usize {
    #[inline]
    fn safe_from(v: u8) -> Self {
        v as usize
    }
}

impl SafeFrom<u16> for usize {
    #[inline]
    fn safe_from(v: u16) -> Self {
        v as usize
    }
}

impl SafeFrom<u32> for usize {
    #[inline]
    fn safe_from(v: u32) -> Self {
        v as usize
    }
}

/// A glyph index within a font.
pub type GlyphId = u16;
