#![deny(missing_docs)]

//! `gvar` Glyph Variations Table
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/gvar>

use std::fmt;

use crate::binary::read::{ReadBinary, ReadCtxt, ReadScope, ReadUnchecked};
use crate::error::ParseError;
use crate::tables::loca::LocaOffsets;
use crate::tables::variable_fonts::{tuple_scalar, Tuple, TupleVariationHeader, TupleVariationStore};
use crate::tables::{F2Dot14, IndexToLocFormat};
use crate::SafeFrom;

/// `gvar` Glyph Variations Table
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/gvar#gvar-header>
pub struct GvarTable<'a> {
    /// Major version number of the glyph variations table.
    pub major_version: u16,
    /// Minor version number of the glyph variations table.
    pub minor_version: u16,
    /// The number of variation axes for this font.
    pub axis_count: u16,
    /// The number of shared tuple records.
    pub shared_tuple_count: u16,
    /// Scope containing data for the shared tuple records.
    shared_tuples_scope: ReadScope<'a>,
    /// The number of glyphs in this font.
    ///
    /// This must match the number of glyphs stored elsewhere in the font.
    pub glyph_count: u16,
    /// Bit 0 set means the offsets are 32-bit.
    pub flags: u16,
    /// Scope containing the data for the array of GlyphVariationData tables.
    glyph_variation_data_array_scope: ReadScope<'a>,
    /// Offsets from the start of the GlyphVariationData array to each GlyphVariationData table.
    glyph_variation_data_offsets: LocaOffsets<'a>,
}

/// The number of points in a glyph, including the four phantom points.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NumPoints(u32);

impl NumPoints {
    /// Count for a glyph with `num_points` outline points; the phantom points are added.
    pub fn new(num_points: u16) -> NumPoints {
        NumPoints(u32::from(num_points) + 4)
    }

    /// The number of points including phantom points.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NumPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'a> GvarTable<'a> {
    /// The variation data for `glyph_id`, or `None` if the glyph has no variations.
    pub fn glyph_variation_data(
        &self,
        glyph_id: u16,
        num_points: NumPoints,
    ) -> Result<Option<TupleVariationStore<'a>>, ParseError> {
        if glyph_id >= self.glyph_count {
            return Err(ParseError::BadIndex);
        }
        let range = self
            .glyph_variation_data_offsets
            .range(usize::from(glyph_id))?;
        if range.is_empty() {
            return Ok(None);
        }
        self.glyph_variation_data_array_scope
            .offset_length(range.start, range.len())?
            .read_dep::<TupleVariationStore<'_>>((self.axis_count, num_points.get()))
            .map(Some)
    }

    /// The shared tuple at `index`.
    pub fn shared_tuple(&self, index: u16) -> Result<Tuple<'a>, ParseError> {
        if index >= self.shared_tuple_count {
            return Err(ParseError::BadIndex);
        }
        let axis_count = usize::from(self.axis_count);
        let offset = usize::from(index) * axis_count * F2Dot14::SIZE;
        self.shared_tuples_scope
            .offset(offset)
            .ctxt()
            .read_array::<F2Dot14>(axis_count)
    }

    /// The scalar for `header` at the normalised location `coords`, resolving shared peak tuples.
    pub fn tuple_scalar(
        &self,
        header: &TupleVariationHeader<'_>,
        coords: &[F2Dot14],
    ) -> Result<f32, ParseError> {
        let scalar = match (header.peak_tuple(), header.tuple_index()) {
            (Some(peak), _) => tuple_scalar(peak, header.intermediate_region(), coords),
            (None, Some(index)) => {
                let peak = self.shared_tuple(index)?;
                tuple_scalar(&peak, header.intermediate_region(), coords)
            }
            (None, None) => return Err(ParseError::MissingValue),
        };
        Ok(scalar)
    }
}

impl ReadBinary for GvarTable<'_> {
    type HostType<'a> = GvarTable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let scope = ctxt.scope();
        let major_version = ctxt.read_u16be()?;
        ctxt.check_version(major_version == 1)?;
        let minor_version = ctxt.read_u16be()?;
        let axis_count = ctxt.read_u16be()?;
        let shared_tuple_count = ctxt.read_u16be()?;
        let shared_tuples_offset = ctxt.read_u32be()?;
        let glyph_count = ctxt.read_u16be()?;
        let flags = ctxt.read_u16be()?;
        let glyph_variation_data_array_offset = ctxt.read_u32be()?;
        // Short offsets are stored divided by two, the same as `loca`.
        let offset_format = if flags & 1 == 1 {
            IndexToLocFormat::Long
        } else {
            IndexToLocFormat::Short
        };
        let glyph_variation_data_offsets =
            LocaOffsets::read(ctxt, usize::from(glyph_count) + 1, offset_format)?;

        let shared_tuples_len =
            usize::from(shared_tuple_count) * usize::from(axis_count) * F2Dot14::SIZE;
        let shared_tuples_scope =
            scope.offset_length(usize::safe_from(shared_tuples_offset), shared_tuples_len)?;

        let data_len = glyph_variation_data_offsets
            .last()
            .ok_or(ParseError::BadIndex)?;
        let glyph_variation_data_array_scope = scope.offset_length(
            usize::safe_from(glyph_variation_data_array_offset),
            usize::safe_from(data_len),
        )?;

        Ok(GvarTable {
            major_version,
            minor_version,
            axis_count,
            shared_tuple_count,
            shared_tuples_scope,
            glyph_count,
            flags,
            glyph_variation_data_array_scope,
            glyph_variation_data_offsets,
        })
    }
}
