//! CFF2 font handling.
//!
//! Refer to [OpenType CFF2 spec](https://learn.microsoft.com/en-us/typography/opentype/spec/cff2)
//! for more information.

use std::convert::TryFrom;

use super::{
    Dict, DictDefault, Operand, Operator, DEFAULT_BLUE_FUZZ, DEFAULT_BLUE_SCALE,
    DEFAULT_BLUE_SHIFT, DEFAULT_EXPANSION_FACTOR, DEFAULT_FONT_MATRIX, OPERAND_ZERO,
};
use crate::binary::read::{ReadBinary, ReadCtxt, ReadScope};
use crate::error::ParseError;
use crate::tables::variable_fonts::ItemVariationStore;

/// Maximum number of operands in Top DICT, Font DICTs, Private DICTs and CharStrings.
///
/// > Operators in Top DICT, Font DICTs, Private DICTs and CharStrings may be preceded by up to a
/// > maximum of 513 operands.
pub const MAX_OPERANDS: usize = 513;

/// CFF2 Font Header
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2#6-header>
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Header {
    /// Major version (2).
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Size of the header in the font (maybe larger than this structure).
    pub header_size: u8,
    /// Length of the Top DICT
    pub top_dict_length: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct TopDictDefault;

#[derive(Debug, PartialEq, Clone)]
pub struct FontDictDefault;

#[derive(Debug, PartialEq, Clone)]
pub struct PrivateDictDefault;

pub type TopDict = Dict<TopDictDefault>;

pub type FontDict = Dict<FontDictDefault>;

pub type PrivateDict = Dict<PrivateDictDefault>;

impl Header {
    // Sum of size of the four fields in the header
    const SIZE: u8 = 1 + 1 + 1 + 2;
}

impl ReadBinary for Header {
    type HostType<'b> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let major = ctxt.read_u8()?;
        ctxt.check_version(major == 2)?;
        let minor = ctxt.read_u8()?;
        let header_size = ctxt.read_u8()?;
        let top_dict_length = ctxt.read_u16be()?;

        if header_size < Header::SIZE {
            return Err(ParseError::BadValue);
        }

        // Skip any unknown data
        let _unknown = ctxt.read_slice(usize::from(header_size - Header::SIZE))?;

        Ok(Header {
            major,
            minor,
            header_size,
            top_dict_length,
        })
    }
}

impl DictDefault for TopDictDefault {
    fn default(op: Operator) -> Option<&'static [Operand]> {
        match op {
            Operator::FontMatrix => Some(DEFAULT_FONT_MATRIX.as_ref()),
            _ => None,
        }
    }
}

impl DictDefault for FontDictDefault {
    fn default(_op: Operator) -> Option<&'static [Operand]> {
        None
    }
}

impl DictDefault for PrivateDictDefault {
    fn default(op: Operator) -> Option<&'static [Operand]> {
        match op {
            Operator::BlueScale => Some(DEFAULT_BLUE_SCALE.as_ref()),
            Operator::BlueShift => Some(&DEFAULT_BLUE_SHIFT),
            Operator::BlueFuzz => Some(&DEFAULT_BLUE_FUZZ),
            Operator::LanguageGroup => Some(&OPERAND_ZERO),
            Operator::ExpansionFactor => Some(DEFAULT_EXPANSION_FACTOR.as_ref()),
            Operator::VSIndex => Some(&OPERAND_ZERO),
            _ => None,
        }
    }
}

/// Read the VariationStore located by the VStore operator of `top_dict`, if any.
pub(crate) fn read_variation_store<'a>(
    scope: &ReadScope<'a>,
    top_dict: &TopDict,
) -> Result<Option<ItemVariationStore<'a>>, ParseError> {
    top_dict
        .get_i32(Operator::VStore)
        .transpose()?
        .map(|offset| {
            let mut ctxt = scope.offset(usize::try_from(offset)?).ctxt();
            // "The VariationStore data is comprised of two parts: a uint16 field that specifies
            // a length, followed by an Item Variation Store structure of the specified length."
            let length = ctxt.read_u16be()?;
            ctxt.read_scope(usize::from(length))?
                .read::<ItemVariationStore<'_>>()
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cff::DictArgs;

    #[test]
    fn read_header() {
        let data = [2, 0, 7, 0, 12, 0xAA, 0xBB, 0x8b];
        let mut ctxt = ReadScope::new(&data).ctxt();
        let header = ctxt.read::<Header>().unwrap();
        assert_eq!(
            header,
            Header {
                major: 2,
                minor: 0,
                header_size: 7,
                top_dict_length: 12
            }
        );
        // Unknown header bytes are skipped
        assert_eq!(ctxt.read_u8().unwrap(), 0x8b);

        assert_eq!(
            ReadScope::new(&[1, 0, 5, 0, 0]).read::<Header>(),
            Err(ParseError::BadVersion)
        );
        assert_eq!(
            ReadScope::new(&[2, 0, 4, 0, 0]).read::<Header>(),
            Err(ParseError::BadValue)
        );
    }

    #[test]
    fn cff2_operand_limit() {
        let data = [0x8c; MAX_OPERANDS];
        let dict = ReadScope::new(&data).read_dep::<PrivateDict>(DictArgs::cff2(
            Default::default(),
            None,
        ));
        assert!(dict.is_ok());

        let data = [0x8c; MAX_OPERANDS + 1];
        let dict = ReadScope::new(&data).read_dep::<PrivateDict>(DictArgs::cff2(
            Default::default(),
            None,
        ));
        assert_eq!(dict, Err(ParseError::LimitExceeded));
    }

    #[test]
    fn private_dict_defaults() {
        let dict = PrivateDict::new();
        assert_eq!(dict.get_i32(Operator::VSIndex), Some(Ok(0)));
        assert_eq!(dict.get_i32(Operator::DefaultWidthX), None);
        assert!(TopDict::new().font_matrix().unwrap().unwrap().is_default());
    }
}
