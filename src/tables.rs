//! OpenType font table parsing.

pub mod glyf;
pub mod loca;
pub mod variable_fonts;

use crate::binary::read::{
    ReadArray, ReadArrayCow, ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom, ReadScope,
};
use crate::binary::source::{ByteSource, SourceCursor};
use crate::binary::{I16Be, U16Be, U32Be};
use crate::error::ParseError;
use crate::{size, tag, GlyphId};

/// Magic number identifying TrueType 1.0
///
/// The version number 1.0 as a 16.16 fixed-point value, indicating TrueType glyph data.
pub const TTF_MAGIC: u32 = 0x00010000;

/// Magic value identifying a CFF font (`OTTO`)
pub const CFF_MAGIC: u32 = tag::OTTO;

/// 32-bit signed fixed-point number (16.16)
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Fixed(i32);

/// The F2DOT14 format consists of a signed, 2’s complement integer and an unsigned fraction.
///
/// To compute the actual value, take the integer and add the fraction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct F2Dot14(u16);

/// The size of the offsets in the `loca` table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/loca>
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Hash)]
pub enum IndexToLocFormat {
    /// Offsets are 16-bit. The actual local offset divided by 2 is stored.
    Short,
    /// Offsets are 32-bit. The actual local offset is stored.
    Long,
}

/// Location of a table within a font file.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TableRange {
    pub offset: usize,
    pub length: usize,
}

/// Something that knows where the tables of a font are.
pub trait TableLocator {
    fn locate(&self, tag: u32) -> Option<TableRange>;

    fn require(&self, tag: u32) -> Result<TableRange, ParseError> {
        self.locate(tag).ok_or(ParseError::MissingTable(tag))
    }
}

/// The table directory at the start of an sfnt (OpenType/TrueType) font file.
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/otff#organization-of-an-opentype-font>
#[derive(Debug, Clone)]
pub struct SfntDirectory {
    pub sfnt_version: u32,
    pub table_records: Vec<TableRecord>,
}

/// An entry in the table directory
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TableRecord {
    pub table_tag: u32,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

/// The parts of the `head` table needed to read glyphs.
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/head>
#[derive(Debug, Clone, PartialEq)]
pub struct HeadTable {
    pub units_per_em: u16,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    pub index_to_loc_format: IndexToLocFormat,
}

/// `maxp` - the number of glyphs in the font.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxpTable {
    pub num_glyphs: u16,
    pub max_component_depth: Option<u16>,
}

/// `hhea` - only the count of long metrics is retained.
#[derive(Debug, Clone, PartialEq)]
pub struct HheaTable {
    pub num_h_metrics: u16,
}

/// `hmtx` horizontal metrics table
///
/// <https://docs.microsoft.com/en-us/typography/opentype/spec/hmtx>
#[derive(Debug)]
pub struct HmtxTable<'a> {
    pub h_metrics: ReadArrayCow<'a, LongHorMetric>,
    pub left_side_bearings: ReadArrayCow<'a, I16Be>,
}

/// A `longHorMetric` record in the `hmtx` table.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct LongHorMetric {
    pub advance_width: u16,
    pub lsb: i16,
}

/// Source of horizontal metrics, used to place the phantom points of TrueType glyphs.
pub trait HorizontalMetrics {
    /// Advance width and left side bearing of `glyph_id`.
    fn horizontal_metrics(&self, glyph_id: GlyphId) -> Option<LongHorMetric>;
}

impl SfntDirectory {
    /// Read the table directory from the start of `source`.
    pub fn load<S: ByteSource>(cursor: &mut SourceCursor<S>) -> Result<Self, ParseError> {
        cursor.seek(0)?;
        let sfnt_version = cursor.read_u32be()?;
        match sfnt_version {
            TTF_MAGIC | CFF_MAGIC | tag::TRUE => {}
            _ => return Err(ParseError::BadVersion),
        }
        let num_tables = cursor.read_u16be()?;
        // searchRange, entrySelector, rangeShift
        cursor.seek(cursor.tell() + 3 * size::U16)?;
        let table_records = (0..num_tables)
            .map(|_| {
                Ok(TableRecord {
                    table_tag: cursor.read_u32be()?,
                    checksum: cursor.read_u32be()?,
                    offset: cursor.read_u32be()?,
                    length: cursor.read_u32be()?,
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;
        Ok(SfntDirectory {
            sfnt_version,
            table_records,
        })
    }

    pub fn find_table_record(&self, tag: u32) -> Option<TableRecord> {
        self.table_records
            .iter()
            .copied()
            .find(|record| record.table_tag == tag)
    }
}

impl TableLocator for SfntDirectory {
    fn locate(&self, tag: u32) -> Option<TableRange> {
        self.find_table_record(tag).map(|record| TableRange {
            offset: usize::try_from(record.offset).unwrap_or(usize::MAX),
            length: usize::try_from(record.length).unwrap_or(0),
        })
    }
}

impl TableRange {
    /// Load the bytes of this table from `cursor`.
    pub fn load<S: ByteSource>(&self, cursor: &mut SourceCursor<S>) -> Result<Box<[u8]>, ParseError> {
        cursor.seek(self.offset)?;
        Ok(cursor.read_bytes(self.length)?)
    }
}

impl ReadBinary for HeadTable {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let major_version = ctxt.read_u16be()?;
        ctxt.check_version(major_version == 1)?;
        let _minor_version = ctxt.read_u16be()?;
        let _font_revision = ctxt.read::<Fixed>()?;
        let _check_sum_adjustment = ctxt.read_u32be()?;
        let magic_number = ctxt.read_u32be()?;
        ctxt.check(magic_number == 0x5F0F3CF5)?;
        let _flags = ctxt.read_u16be()?;
        let units_per_em = ctxt.read_u16be()?;
        // created, modified
        let _dates = ctxt.read_slice(16)?;
        let x_min = ctxt.read_i16be()?;
        let y_min = ctxt.read_i16be()?;
        let x_max = ctxt.read_i16be()?;
        let y_max = ctxt.read_i16be()?;
        // macStyle, lowestRecPPEM, fontDirectionHint
        let _ = ctxt.read_slice(6)?;
        let index_to_loc_format = ctxt.read::<IndexToLocFormat>()?;

        Ok(HeadTable {
            units_per_em,
            x_min,
            y_min,
            x_max,
            y_max,
            index_to_loc_format,
        })
    }
}

impl ReadBinary for MaxpTable {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let version = ctxt.read_u32be()?;
        let num_glyphs = ctxt.read_u16be()?;
        let max_component_depth = if version == 0x00010000 {
            // Skip to maxComponentDepth, the last field of the version 1.0 table
            let _ = ctxt.read_slice(12 * size::U16)?;
            Some(ctxt.read_u16be()?)
        } else {
            None
        };
        Ok(MaxpTable {
            num_glyphs,
            max_component_depth,
        })
    }
}

impl ReadBinary for HheaTable {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let version = ctxt.read_u32be()?;
        ctxt.check_version(version == 0x00010000)?;
        // ascender through metricDataFormat
        let _ = ctxt.read_slice(15 * size::U16)?;
        let num_h_metrics = ctxt.read_u16be()?;
        Ok(HheaTable { num_h_metrics })
    }
}

impl ReadBinaryDep for HmtxTable<'_> {
    type Args<'a> = (usize, usize); // num_glyphs, num_h_metrics
    type HostType<'a> = HmtxTable<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (num_glyphs, num_h_metrics): (usize, usize),
    ) -> Result<HmtxTable<'a>, ParseError> {
        let h_metrics = ctxt.read_array::<LongHorMetric>(num_h_metrics)?;
        let left_side_bearings =
            ctxt.read_array::<I16Be>(num_glyphs.saturating_sub(num_h_metrics))?;
        Ok(HmtxTable {
            h_metrics: ReadArrayCow::Borrowed(h_metrics),
            left_side_bearings: ReadArrayCow::Borrowed(left_side_bearings),
        })
    }
}

impl HorizontalMetrics for HmtxTable<'_> {
    fn horizontal_metrics(&self, glyph_id: GlyphId) -> Option<LongHorMetric> {
        // As an optimization, the number of records can be less than the number of glyphs, in
        // which case the advance width value of the last record applies to all remaining glyph
        // IDs. -- https://docs.microsoft.com/en-us/typography/opentype/spec/hmtx
        let glyph = usize::from(glyph_id);
        let num_h_metrics = self.h_metrics.len();
        if glyph < num_h_metrics {
            self.h_metrics.get_item(glyph)
        } else {
            let last = self.h_metrics.get_item(num_h_metrics.checked_sub(1)?)?;
            let lsb = self.left_side_bearings.get_item(glyph - num_h_metrics)?;
            Some(LongHorMetric {
                advance_width: last.advance_width,
                lsb,
            })
        }
    }
}

impl HorizontalMetrics for [LongHorMetric] {
    fn horizontal_metrics(&self, glyph_id: GlyphId) -> Option<LongHorMetric> {
        self.get(usize::from(glyph_id)).copied()
    }
}

impl HorizontalMetrics for Vec<LongHorMetric> {
    fn horizontal_metrics(&self, glyph_id: GlyphId) -> Option<LongHorMetric> {
        self.as_slice().horizontal_metrics(glyph_id)
    }
}

impl ReadFrom for LongHorMetric {
    type ReadType = (U16Be, I16Be);
    fn read_from((advance_width, lsb): (u16, i16)) -> Self {
        LongHorMetric { advance_width, lsb }
    }
}

impl ReadFrom for TableRecord {
    type ReadType = ((U32Be, U32Be), (U32Be, U32Be));
    fn read_from(((table_tag, checksum), (offset, length)): ((u32, u32), (u32, u32))) -> Self {
        TableRecord {
            table_tag,
            checksum,
            offset,
            length,
        }
    }
}

impl TableRecord {
    pub fn read_table<'a>(&self, scope: &ReadScope<'a>) -> Result<ReadScope<'a>, ParseError> {
        let offset = usize::try_from(self.offset)?;
        let length = usize::try_from(self.length)?;
        scope.offset_length(offset, length)
    }
}

/// Read the table records of an in-memory sfnt font.
pub fn read_table_records<'a>(
    scope: ReadScope<'a>,
) -> Result<ReadArray<'a, TableRecord>, ParseError> {
    let mut ctxt = scope.ctxt();
    let sfnt_version = ctxt.read_u32be()?;
    ctxt.check_version(matches!(sfnt_version, TTF_MAGIC | CFF_MAGIC | tag::TRUE))?;
    let num_tables = ctxt.read_u16be()?;
    let _ = ctxt.read_slice(3 * size::U16)?;
    ctxt.read_array::<TableRecord>(usize::from(num_tables))
}

impl ReadBinary for IndexToLocFormat {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let index_to_loc_format = ctxt.read_i16be()?;

        match index_to_loc_format {
            0 => Ok(IndexToLocFormat::Short),
            1 => Ok(IndexToLocFormat::Long),
            _ => Err(ParseError::BadValue),
        }
    }
}

impl Fixed {
    pub const ONE: Fixed = Fixed(0x10000);

    pub fn from_raw(value: i32) -> Fixed {
        Fixed(value)
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    /// Convert to 16.16, rounding to the nearest representable value.
    pub fn from_f64(value: f64) -> Fixed {
        Fixed((value * 65536.0).round() as i32)
    }

    /// The nearest integer, with halves rounded away from zero.
    pub fn round(self) -> i32 {
        if self.0 >= 0 {
            (self.0 + 0x8000) >> 16
        } else {
            -((-self.0 + 0x8000) >> 16)
        }
    }
}

impl ReadFrom for Fixed {
    type ReadType = U32Be;

    fn read_from(value: u32) -> Self {
        Fixed(value as i32)
    }
}

impl From<Fixed> for f32 {
    fn from(value: Fixed) -> f32 {
        (f64::from(value.0) / 65536.0) as f32
    }
}

impl From<Fixed> for f64 {
    fn from(value: Fixed) -> f64 {
        f64::from(value.0) / 65536.0
    }
}

impl F2Dot14 {
    pub fn new(value: u16) -> Self {
        F2Dot14(value)
    }

    pub fn raw_value(self) -> u16 {
        self.0
    }

    /// Convert from a float, clamping to the representable range.
    pub fn from_f32(value: f32) -> Self {
        let clamped = value.clamp(-2.0, 1.999_939);
        F2Dot14((clamped * 16384.0).round() as i16 as u16)
    }
}

impl ReadFrom for F2Dot14 {
    type ReadType = U16Be;

    fn read_from(value: u16) -> Self {
        F2Dot14(value)
    }
}

impl From<F2Dot14> for f32 {
    fn from(value: F2Dot14) -> Self {
        f32::from(value.0 as i16) / 16384.
    }
}
