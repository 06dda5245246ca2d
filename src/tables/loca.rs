//! Parsing of the `loca` table.
//!
//! > The indexToLoc table stores the offsets to the locations of the glyphs in the font, relative
//! > to the beginning of the glyphData table.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/loca>

use std::ops::Range;

use crate::binary::read::{ReadArray, ReadBinaryDep, ReadCtxt};
use crate::binary::{U16Be, U32Be};
use crate::error::ParseError;
use crate::tables::IndexToLocFormat;
use crate::SafeFrom;

/// `loca` table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/loca>
#[derive(Clone, Debug)]
pub struct LocaTable<'a> {
    pub offsets: LocaOffsets<'a>,
}

/// Glyph offsets, either stored halved in 16 bits or directly in 32 bits.
///
/// Also used for the per-glyph data offsets of `gvar`.
#[derive(Clone, Debug)]
pub enum LocaOffsets<'a> {
    Short(ReadArray<'a, U16Be>),
    Long(ReadArray<'a, U32Be>),
}

impl ReadBinaryDep for LocaTable<'_> {
    type Args<'a> = (u16, IndexToLocFormat);
    type HostType<'a> = LocaTable<'a>;

    /// Read a `loca` table from `ctxt`
    ///
    /// * `num_glyphs` is the number of glyphs in the font, from the `maxp` table.
    /// * `index_to_loc_format` is read from the `head` table.
    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (num_glyphs, index_to_loc_format): (u16, IndexToLocFormat),
    ) -> Result<Self::HostType<'a>, ParseError> {
        let offsets = LocaOffsets::read(ctxt, usize::from(num_glyphs) + 1, index_to_loc_format)?;
        Ok(LocaTable { offsets })
    }
}

impl LocaTable<'_> {
    /// Number of glyphs described by this table.
    pub fn num_glyphs(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// The byte range of `glyph_id` within the `glyf` table. An empty range is an empty glyph.
    pub fn glyph_range(&self, glyph_id: u16) -> Result<Range<usize>, ParseError> {
        self.offsets.range(usize::from(glyph_id))
    }
}

impl<'a> LocaOffsets<'a> {
    pub(crate) fn read(
        ctxt: &mut ReadCtxt<'a>,
        count: usize,
        format: IndexToLocFormat,
    ) -> Result<Self, ParseError> {
        match format {
            // The actual local offset divided by 2 is stored.
            IndexToLocFormat::Short => Ok(LocaOffsets::Short(ctxt.read_array::<U16Be>(count)?)),
            IndexToLocFormat::Long => Ok(LocaOffsets::Long(ctxt.read_array::<U32Be>(count)?)),
        }
    }

    /// Returns the number of offsets in the table.
    pub fn len(&self) -> usize {
        match self {
            LocaOffsets::Short(array) => array.len(),
            LocaOffsets::Long(array) => array.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a specified offset from the table at `index`.
    pub fn get(&self, index: usize) -> Option<u32> {
        match self {
            LocaOffsets::Short(array) => array.get_item(index).map(|offset| u32::from(offset) * 2),
            LocaOffsets::Long(array) => array.get_item(index),
        }
    }

    /// Get the last offset in the table.
    ///
    /// Returns `None` if the table is empty.
    pub fn last(&self) -> Option<u32> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    /// The range between offset `index` and offset `index + 1`.
    pub fn range(&self, index: usize) -> Result<Range<usize>, ParseError> {
        let start = self.get(index).ok_or(ParseError::BadIndex)?;
        let end = self.get(index + 1).ok_or(ParseError::BadIndex)?;
        if end < start {
            return Err(ParseError::BadOffset);
        }
        Ok(usize::safe_from(start)..usize::safe_from(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;

    #[test]
    fn short_offsets_are_doubled() {
        let data = [0, 0, 0, 5, 0, 5, 0, 9];
        let loca = ReadScope::new(&data)
            .read_dep::<LocaTable<'_>>((3, IndexToLocFormat::Short))
            .unwrap();
        assert_eq!(loca.num_glyphs(), 3);
        assert_eq!(loca.glyph_range(0).unwrap(), 0..10);
        assert!(loca.glyph_range(1).unwrap().is_empty());
        assert_eq!(loca.glyph_range(2).unwrap(), 10..18);
        assert_eq!(loca.glyph_range(3), Err(ParseError::BadIndex));
    }

    #[test]
    fn decreasing_offsets() {
        let data = [0, 0, 0, 8, 0, 0, 0, 4];
        let loca = ReadScope::new(&data)
            .read_dep::<LocaTable<'_>>((1, IndexToLocFormat::Long))
            .unwrap();
        assert_eq!(loca.glyph_range(0), Err(ParseError::BadOffset));
    }
}
