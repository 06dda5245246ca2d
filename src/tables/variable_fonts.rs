#![deny(missing_docs)]

//! Common tables pertaining to variable fonts.

use std::borrow::Cow;
use std::convert::TryFrom;
use std::iter;

use tinyvec::TinyVec;

use crate::binary::read::{
    ReadArray, ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom, ReadScope, ReadUnchecked,
};
use crate::binary::{I16Be, U16Be, U32Be, I8, U8};
use crate::error::ParseError;
use crate::tables::F2Dot14;
use crate::SafeFrom;

pub mod gvar;

/// Flag indicating that some or all tuple variation tables reference a shared set of “point”
/// numbers.
const SHARED_POINT_NUMBERS: u16 = 0x8000;
/// Mask for the low bits to give the number of tuple variation tables.
const COUNT_MASK: u16 = 0x0FFF;
/// Flag indicating the point numbers in this run are stored as uint16 rather than uint8.
const POINTS_ARE_WORDS: u8 = 0x80;
/// Mask for the low 7 bits of the control byte to give the number of point number elements, minus
/// 1.
const POINT_RUN_COUNT_MASK: u8 = 0x7F;

/// Flag indicating that this tuple variation header includes an embedded peak tuple record,
/// immediately after the tupleIndex field.
const EMBEDDED_PEAK_TUPLE: u16 = 0x8000;
/// Flag indicating that this tuple variation table applies to an intermediate region within the
/// variation space.
const INTERMEDIATE_REGION: u16 = 0x4000;
/// Flag indicating that the serialized data for this tuple variation table includes packed “point”
/// number data.
const PRIVATE_POINT_NUMBERS: u16 = 0x2000;
/// Mask for the low 12 bits to give the shared tuple records index.
const TUPLE_INDEX_MASK: u16 = 0x0FFF;

/// Flag indicating that this run contains no data, and that the deltas for this run are all zero.
const DELTAS_ARE_ZERO: u8 = 0x80;
/// Flag indicating the run contains int16 rather than int8 deltas.
const DELTAS_ARE_WORDS: u8 = 0x40;
/// Mask for the low 6 bits to provide the number of delta values in the run, minus one.
const DELTA_RUN_COUNT_MASK: u8 = 0x3F;

/// Coordinate array specifying a position within the font’s variation space.
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/otvarcommonformats#tuple-records>
pub type Tuple<'a> = ReadArray<'a, F2Dot14>;

/// A normalised design-space location held in memory.
///
/// Most fonts have one or two axes; four fits in the same space as the heap variant.
pub type OwnedTuple = TinyVec<[F2Dot14; 4]>;

/// Tuple Variation Store for one glyph of a `gvar` table.
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/otvarcommonformats#tuple-variation-store-header>
pub struct TupleVariationStore<'a> {
    /// The number of points in the glyph this store is for, including phantom points.
    num_points: u32,
    /// Shared point number data, present if the corresponding flag is set in the header.
    shared_point_numbers: Option<PointNumbers>,
    tuple_variation_headers: Vec<TupleVariationHeader<'a>>,
}

/// Tuple variation header.
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/otvarcommonformats#tuplevariationheader>
pub struct TupleVariationHeader<'a> {
    /// The size in bytes of the serialized data for this tuple variation table.
    variation_data_size: u16,
    /// Flags in the high 4 bits, shared tuple index in the low 12 bits.
    tuple_flags_and_index: u16,
    peak_tuple: Option<Tuple<'a>>,
    intermediate_region: Option<(Tuple<'a>, Tuple<'a>)>,
    /// The serialized data for this tuple variation.
    data: &'a [u8],
}

/// Glyph variation data.
///
/// (x, y) deltas for numbered points.
pub struct GvarVariationData<'a> {
    point_numbers: Cow<'a, PointNumbers>,
    x_coord_deltas: Vec<i16>,
    y_coord_deltas: Vec<i16>,
}

/// The points a tuple variation supplies deltas for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PointNumbers {
    /// Every point of the glyph, including phantom points.
    All(u32),
    /// The listed points; other points have inferred deltas.
    Specific(Vec<u16>),
}

/// Iterator over [PointNumbers].
pub struct PointNumbersIter<'a> {
    numbers: &'a PointNumbers,
    index: usize,
}

/// Item Variation Store, as used by `CFF2` for `blend`.
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/otvarcommonformats#item-variation-store>
pub struct ItemVariationStore<'a> {
    /// Format of the store, always 1.
    pub format: u16,
    variation_region_list: VariationRegionList<'a>,
    item_variation_data: Vec<ItemVariationData<'a>>,
}

/// The regions referenced by an [ItemVariationStore].
pub struct VariationRegionList<'a> {
    axis_count: u16,
    region_count: u16,
    scope: ReadScope<'a>,
}

/// A region of the variation space: one (start, peak, end) triple per axis.
pub struct VariationRegion<'a> {
    region_axes: ReadArray<'a, RegionAxisCoordinates>,
}

/// (start, peak, end) for one axis of a [VariationRegion].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RegionAxisCoordinates {
    /// The region start coordinate value for the current axis.
    pub start_coord: F2Dot14,
    /// The region peak coordinate value for the current axis.
    pub peak_coord: F2Dot14,
    /// The region end coordinate value for the current axis.
    pub end_coord: F2Dot14,
}

/// One subtable of delta sets and the regions those deltas apply to.
pub struct ItemVariationData<'a> {
    item_count: u16,
    word_delta_count: u16,
    region_indexes: ReadArray<'a, U16Be>,
    delta_sets: ReadScope<'a>,
}

impl<'a> TupleVariationStore<'a> {
    /// Iterate over the tuple variation headers.
    pub fn headers(&self) -> impl Iterator<Item = &TupleVariationHeader<'a>> {
        self.tuple_variation_headers.iter()
    }

    /// The shared point numbers, if present.
    pub fn shared_point_numbers(&self) -> Option<&PointNumbers> {
        self.shared_point_numbers.as_ref()
    }

    /// The number of points, including phantom points, this store was read for.
    pub fn num_points(&self) -> u32 {
        self.num_points
    }

    /// Retrieve the variation data for the variation tuple at the given index.
    pub fn variation_data(&self, index: u16) -> Result<GvarVariationData<'_>, ParseError> {
        let header = self
            .tuple_variation_headers
            .get(usize::from(index))
            .ok_or(ParseError::BadIndex)?;
        header.variation_data(self.num_points, self.shared_point_numbers.as_ref())
    }
}

impl ReadBinaryDep for TupleVariationStore<'_> {
    type Args<'a> = (u16, u32);
    type HostType<'a> = TupleVariationStore<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (axis_count, num_points): (u16, u32),
    ) -> Result<Self::HostType<'a>, ParseError> {
        let axis_count = usize::from(axis_count);

        let scope = ctxt.scope();
        let tuple_variation_flags_and_count = ctxt.read_u16be()?;
        let tuple_variation_count = usize::from(tuple_variation_flags_and_count & COUNT_MASK);
        let data_offset = ctxt.read_u16be()?;

        let mut tuple_variation_headers = (0..tuple_variation_count)
            .map(|_| ctxt.read_dep::<TupleVariationHeader<'_>>(axis_count))
            .collect::<Result<Vec<_>, _>>()?;

        let mut data_ctxt = scope.offset(usize::from(data_offset)).ctxt();

        let shared_point_numbers = ((tuple_variation_flags_and_count & SHARED_POINT_NUMBERS)
            == SHARED_POINT_NUMBERS)
            .then(|| read_packed_point_numbers(&mut data_ctxt, num_points))
            .transpose()?;

        // The serialized data of each tuple follows on from the previous one.
        for header in tuple_variation_headers.iter_mut() {
            header.data = data_ctxt.read_slice(usize::from(header.variation_data_size))?;
        }

        Ok(TupleVariationStore {
            num_points,
            shared_point_numbers,
            tuple_variation_headers,
        })
    }
}

impl PointNumbers {
    /// Returns the number of point numbers contained by this value
    pub fn len(&self) -> usize {
        match self {
            PointNumbers::All(n) => usize::safe_from(*n),
            PointNumbers::Specific(vec) => vec.len(),
        }
    }

    /// Returns true if there are no point numbers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the point numbers contained by this value.
    pub fn iter(&self) -> PointNumbersIter<'_> {
        PointNumbersIter {
            numbers: self,
            index: 0,
        }
    }
}

impl Iterator for PointNumbersIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.numbers.len() {
            return None;
        }

        let index = self.index;
        self.index += 1;
        match self.numbers {
            PointNumbers::All(_n) => u32::try_from(index).ok(),
            PointNumbers::Specific(numbers) => numbers.get(index).copied().map(u32::from),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.numbers.len() - self.index;
        (remaining, Some(remaining))
    }
}

/// Read packed point numbers for a glyph with `num_points` points.
///
/// `num_points` is expected to already have the four phantom points added to it.
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/otvarcommonformats#packed-point-numbers>
fn read_packed_point_numbers(
    ctxt: &mut ReadCtxt<'_>,
    num_points: u32,
) -> Result<PointNumbers, ParseError> {
    let count = read_count(ctxt)?;
    // A count of zero means deltas are supplied for all points.
    if count == 0 {
        return Ok(PointNumbers::All(num_points));
    }

    let mut point_numbers = Vec::with_capacity(usize::from(count));
    // Point numbers are deltas from the previous number, continuing across runs.
    let mut prev = 0u16;
    while point_numbers.len() < usize::from(count) {
        let control_byte = ctxt.read_u8()?;
        let point_run_count = usize::from(control_byte & POINT_RUN_COUNT_MASK) + 1;
        if (control_byte & POINTS_ARE_WORDS) == POINTS_ARE_WORDS {
            let array = ctxt.read_array::<U16Be>(point_run_count)?;
            for diff in array.iter() {
                prev = prev.wrapping_add(diff);
                point_numbers.push(prev);
            }
        } else {
            let array = ctxt.read_array::<U8>(point_run_count)?;
            for diff in array.iter() {
                prev = prev.wrapping_add(u16::from(diff));
                point_numbers.push(prev);
            }
        }
    }
    point_numbers.truncate(usize::from(count));
    Ok(PointNumbers::Specific(point_numbers))
}

// The count may be stored in one or two bytes:
//
// * If the first byte is 0, then a second count byte is not used. This value has a special
//   meaning: the tuple variation data provides deltas for all glyph points.
// * If the first byte is non-zero and the high bit is clear (value is 1 to 127), then a second
//   count byte is not used. The point count is equal to the value of the first byte.
// * If the high bit of the first byte is set, then a second byte is used. The count is read from
//   interpreting the two bytes as a big-endian uint16 value with the high-order bit masked out.
fn read_count(ctxt: &mut ReadCtxt<'_>) -> Result<u16, ParseError> {
    let count1 = u16::from(ctxt.read_u8()?);
    let count = match count1 {
        0 => 0,
        1..=127 => count1,
        128.. => {
            let count2 = ctxt.read_u8()?;
            ((count1 & 0x7F) << 8) | u16::from(count2)
        }
    };
    Ok(count)
}

/// Read `num_deltas` packed deltas.
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/otvarcommonformats#packed-deltas>
fn read_packed_deltas(ctxt: &mut ReadCtxt<'_>, num_deltas: usize) -> Result<Vec<i16>, ParseError> {
    let mut deltas = Vec::with_capacity(num_deltas);

    while deltas.len() < num_deltas {
        let control_byte = ctxt.read_u8()?;
        // The count is stored minus one
        let count = usize::from(control_byte & DELTA_RUN_COUNT_MASK) + 1;

        if (control_byte & DELTAS_ARE_ZERO) == DELTAS_ARE_ZERO {
            deltas.extend(iter::repeat(0).take(count));
        } else if (control_byte & DELTAS_ARE_WORDS) == DELTAS_ARE_WORDS {
            let array = ctxt.read_array::<I16Be>(count)?;
            deltas.extend(array.iter())
        } else {
            let array = ctxt.read_array::<I8>(count)?;
            deltas.extend(array.iter().map(i16::from));
        };
    }

    // A run may not overshoot the number of deltas
    if deltas.len() != num_deltas {
        return Err(ParseError::BadValue);
    }
    Ok(deltas)
}

impl GvarVariationData<'_> {
    /// Iterates over the point numbers and (x, y) deltas.
    pub fn iter(&self) -> impl Iterator<Item = (u32, (i16, i16))> + '_ {
        let deltas = self
            .x_coord_deltas
            .iter()
            .copied()
            .zip(self.y_coord_deltas.iter().copied());
        self.point_numbers.iter().zip(deltas)
    }

    /// Returns true if this variation supplies a delta for every point.
    pub fn covers_all_points(&self) -> bool {
        matches!(*self.point_numbers, PointNumbers::All(_))
    }

    /// Returns the number of point numbers.
    pub fn len(&self) -> usize {
        self.point_numbers.len()
    }

    /// Returns true if there are no deltas.
    pub fn is_empty(&self) -> bool {
        self.point_numbers.is_empty()
    }
}

impl<'data> TupleVariationHeader<'data> {
    /// Read the variation data for `gvar`.
    ///
    /// `num_points` is the number of points in the glyph this variation relates to.
    pub fn variation_data<'a>(
        &'a self,
        num_points: u32,
        shared_point_numbers: Option<&'a PointNumbers>,
    ) -> Result<GvarVariationData<'a>, ParseError> {
        let mut ctxt = ReadScope::new(self.data).ctxt();

        let point_numbers = self.read_point_numbers(&mut ctxt, num_points, shared_point_numbers)?;
        let num_deltas = point_numbers.len();

        // The deltas are stored X, followed by Y but the delta runs can span the boundary of the
        // two so they need to be read as a single span of packed deltas and then split.
        let mut x_coord_deltas = read_packed_deltas(&mut ctxt, 2 * num_deltas)?;
        let y_coord_deltas = x_coord_deltas.split_off(num_deltas);

        Ok(GvarVariationData {
            point_numbers,
            x_coord_deltas,
            y_coord_deltas,
        })
    }

    /// Returns the index of the shared tuple that this header relates to.
    ///
    /// The value returned from this method will be `None` if the header has an embedded
    /// peak tuple.
    pub fn tuple_index(&self) -> Option<u16> {
        self.peak_tuple
            .is_none()
            .then_some(self.tuple_flags_and_index & TUPLE_INDEX_MASK)
    }

    /// Returns the embedded peak tuple if present.
    pub fn peak_tuple(&self) -> Option<&Tuple<'data>> {
        self.peak_tuple.as_ref()
    }

    /// Returns the start and end tuples of the intermediate region if present.
    pub fn intermediate_region(&self) -> Option<&(Tuple<'data>, Tuple<'data>)> {
        self.intermediate_region.as_ref()
    }

    /// Returns true if this tuple carries its own point numbers.
    pub fn has_private_point_numbers(&self) -> bool {
        (self.tuple_flags_and_index & PRIVATE_POINT_NUMBERS) == PRIVATE_POINT_NUMBERS
    }

    /// Read the point numbers for this tuple.
    ///
    /// This method will return either the embedded private point numbers or the shared numbers
    /// if private points are not present.
    fn read_point_numbers<'a>(
        &'a self,
        ctxt: &mut ReadCtxt<'data>,
        num_points: u32,
        shared_point_numbers: Option<&'a PointNumbers>,
    ) -> Result<Cow<'a, PointNumbers>, ParseError> {
        if self.has_private_point_numbers() {
            read_packed_point_numbers(ctxt, num_points).map(Cow::Owned)
        } else {
            // Either private or shared point numbers must be present.
            shared_point_numbers
                .map(Cow::Borrowed)
                .ok_or(ParseError::MissingValue)
        }
    }
}

impl ReadBinaryDep for TupleVariationHeader<'_> {
    type Args<'a> = usize;
    type HostType<'a> = TupleVariationHeader<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        axis_count: usize,
    ) -> Result<Self::HostType<'a>, ParseError> {
        let variation_data_size = ctxt.read_u16be()?;
        let tuple_flags_and_index = ctxt.read_u16be()?;
        // Without an embedded peak the low bits of `tuple_flags_and_index` index the shared
        // tuples of the `gvar` table.
        let peak_tuple = ((tuple_flags_and_index & EMBEDDED_PEAK_TUPLE) == EMBEDDED_PEAK_TUPLE)
            .then(|| ctxt.read_array(axis_count))
            .transpose()?;
        let intermediate_region =
            if (tuple_flags_and_index & INTERMEDIATE_REGION) == INTERMEDIATE_REGION {
                let start = ctxt.read_array(axis_count)?;
                let end = ctxt.read_array(axis_count)?;
                Some((start, end))
            } else {
                None
            };
        Ok(TupleVariationHeader {
            variation_data_size,
            tuple_flags_and_index,
            peak_tuple,
            intermediate_region,
            data: &[], // filled in later
        })
    }
}

/// Compute the scalar of a tuple variation for the normalised location `coords`.
///
/// Without an intermediate region the region of applicability runs from zero to the peak on each
/// axis. Axes missing from `coords` are at their default (zero).
///
/// <https://learn.microsoft.com/en-us/typography/opentype/spec/otvaroverview#algorithm-for-interpolation-of-instance-values>
pub fn tuple_scalar(
    peak: &Tuple<'_>,
    intermediate_region: Option<&(Tuple<'_>, Tuple<'_>)>,
    coords: &[F2Dot14],
) -> f32 {
    let mut scalar = 1.0;
    for (axis, peak) in peak.iter().enumerate() {
        let peak = f32::from(peak);
        // If the peak is zero for some axis, then ignore the axis.
        if peak == 0.0 {
            continue;
        }
        let coord = coords.get(axis).copied().map_or(0.0, f32::from);
        if coord == peak {
            continue;
        }
        let (start, end) = match intermediate_region {
            Some((start, end)) => (
                start.get_item(axis).map_or(0.0, f32::from),
                end.get_item(axis).map_or(0.0, f32::from),
            ),
            None => (peak.min(0.0), peak.max(0.0)),
        };
        if coord <= start || coord >= end {
            return 0.0;
        } else if coord < peak {
            scalar *= (coord - start) / (peak - start);
        } else {
            scalar *= (end - coord) / (end - peak);
        }
    }
    scalar
}

impl<'a> ItemVariationStore<'a> {
    /// The number of regions referenced by the ItemVariationData at `index` (the CFF2 `vsindex`).
    pub fn region_count(&self, index: u16) -> Result<u16, ParseError> {
        let data = self.data(index)?;
        u16::try_from(data.region_indexes.len()).map_err(ParseError::from)
    }

    /// Scalars for each region referenced by the ItemVariationData at `index`, in the order the
    /// deltas of a blend appear.
    pub fn region_scalars(
        &self,
        index: u16,
        coords: &[F2Dot14],
    ) -> Result<TinyVec<[f32; 8]>, ParseError> {
        let data = self.data(index)?;
        data.region_indexes
            .iter()
            .map(|region_index| {
                self.variation_region_list
                    .region(region_index)
                    .map(|region| region.scalar(coords))
            })
            .collect()
    }

    /// The number of ItemVariationData subtables.
    pub fn data_count(&self) -> usize {
        self.item_variation_data.len()
    }

    /// The regions of this store.
    pub fn regions(&self) -> &VariationRegionList<'a> {
        &self.variation_region_list
    }

    fn data(&self, index: u16) -> Result<&ItemVariationData<'a>, ParseError> {
        self.item_variation_data
            .get(usize::from(index))
            .ok_or(ParseError::BadIndex)
    }
}

impl ReadBinary for ItemVariationStore<'_> {
    type HostType<'a> = ItemVariationStore<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let scope = ctxt.scope();
        let format = ctxt.read_u16be()?;
        ctxt.check_version(format == 1)?;
        let variation_region_list_offset = ctxt.read_u32be()?;
        let item_variation_data_count = ctxt.read_u16be()?;
        let item_variation_data_offsets =
            ctxt.read_array::<U32Be>(usize::from(item_variation_data_count))?;
        let variation_region_list = scope
            .offset(usize::safe_from(variation_region_list_offset))
            .read::<VariationRegionList<'_>>()?;
        let item_variation_data = item_variation_data_offsets
            .iter()
            .map(|offset| {
                scope
                    .offset(usize::safe_from(offset))
                    .read::<ItemVariationData<'_>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Every region index must refer to a region in the list.
        let region_count = variation_region_list.region_count;
        for data in &item_variation_data {
            if data.region_indexes.iter().any(|index| index >= region_count) {
                return Err(ParseError::BadIndex);
            }
        }

        Ok(ItemVariationStore {
            format,
            variation_region_list,
            item_variation_data,
        })
    }
}

impl<'a> VariationRegionList<'a> {
    /// The number of variation axes each region covers.
    pub fn axis_count(&self) -> u16 {
        self.axis_count
    }

    /// The number of regions in the list.
    pub fn region_count(&self) -> u16 {
        self.region_count
    }

    /// The region at `index`.
    pub fn region(&self, index: u16) -> Result<VariationRegion<'a>, ParseError> {
        if index >= self.region_count {
            return Err(ParseError::BadIndex);
        }
        let axis_count = usize::from(self.axis_count);
        let record_size = axis_count * RegionAxisCoordinates::SIZE;
        let region_axes = self
            .scope
            .offset(usize::from(index) * record_size)
            .ctxt()
            .read_array::<RegionAxisCoordinates>(axis_count)?;
        Ok(VariationRegion { region_axes })
    }
}

impl ReadBinary for VariationRegionList<'_> {
    type HostType<'a> = VariationRegionList<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let axis_count = ctxt.read_u16be()?;
        let region_count = ctxt.read_u16be()?;
        let record_count = usize::from(axis_count) * usize::from(region_count);
        let scope = ctxt.scope();
        // Check all the records are present
        ctxt.read_array::<RegionAxisCoordinates>(record_count)?;
        Ok(VariationRegionList {
            axis_count,
            region_count,
            scope,
        })
    }
}

impl VariationRegion<'_> {
    /// Compute the scalar of this region at the normalised location `coords`.
    ///
    /// Axes with an invalid triple, a zero peak, or a range spanning zero do not contribute.
    pub fn scalar(&self, coords: &[F2Dot14]) -> f32 {
        let mut scalar = 1.0;
        for (i, axis) in self.region_axes.iter().enumerate() {
            let coord = coords.get(i).copied().map_or(0.0, f32::from);
            let start = f32::from(axis.start_coord);
            let peak = f32::from(axis.peak_coord);
            let end = f32::from(axis.end_coord);
            if start > peak || peak > end || peak == 0.0 || (start < 0.0 && end > 0.0) {
                continue;
            } else if coord < start || coord > end {
                return 0.0;
            } else if coord == peak {
                continue;
            } else if coord < peak {
                scalar *= (coord - start) / (peak - start);
            } else {
                scalar *= (end - coord) / (end - peak);
            }
        }
        scalar
    }
}

impl ReadFrom for RegionAxisCoordinates {
    type ReadType = (F2Dot14, F2Dot14, F2Dot14);

    fn read_from((start_coord, peak_coord, end_coord): (F2Dot14, F2Dot14, F2Dot14)) -> Self {
        RegionAxisCoordinates {
            start_coord,
            peak_coord,
            end_coord,
        }
    }
}

impl ItemVariationData<'_> {
    /// The number of delta sets (rows) in this subtable.
    pub fn item_count(&self) -> u16 {
        self.item_count
    }

    /// The region indexes the deltas of each row apply to.
    pub fn region_indexes(&self) -> impl Iterator<Item = u16> + '_ {
        self.region_indexes.iter()
    }

    /// The deltas of the row at `item`, one per region.
    pub fn delta_set(&self, item: u16) -> Result<Vec<i32>, ParseError> {
        if item >= self.item_count {
            return Err(ParseError::BadIndex);
        }
        let (word_size, word_count, region_count) = self.row_layout();
        let row_size = row_size(word_size, word_count, region_count);
        let mut ctxt = self
            .delta_sets
            .offset_length(usize::from(item) * row_size, row_size)?
            .ctxt();
        (0..region_count)
            .map(|i| match (i < word_count, word_size) {
                (true, 4) => ctxt.read_i32be().map_err(ParseError::from),
                (true, _) | (false, 4) => ctxt.read_i16be().map(i32::from).map_err(ParseError::from),
                (false, _) => ctxt.read_i8().map(i32::from).map_err(ParseError::from),
            })
            .collect()
    }

    // (size of a word delta, number of word deltas, number of regions)
    fn row_layout(&self) -> (usize, usize, usize) {
        let long_words = self.word_delta_count & 0x8000 != 0;
        let word_size = if long_words { 4 } else { 2 };
        let word_count = usize::from(self.word_delta_count & 0x7FFF);
        (word_size, word_count, self.region_indexes.len())
    }
}

fn row_size(word_size: usize, word_count: usize, region_count: usize) -> usize {
    word_count * word_size + region_count.saturating_sub(word_count) * (word_size / 2)
}

impl ReadBinary for ItemVariationData<'_> {
    type HostType<'a> = ItemVariationData<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let item_count = ctxt.read_u16be()?;
        let word_delta_count = ctxt.read_u16be()?;
        let region_index_count = ctxt.read_u16be()?;
        let region_indexes = ctxt.read_array::<U16Be>(usize::from(region_index_count))?;
        ctxt.check(usize::from(word_delta_count & 0x7FFF) <= usize::from(region_index_count))?;
        let mut data = ItemVariationData {
            item_count,
            word_delta_count,
            region_indexes,
            delta_sets: ReadScope::new(&[]),
        };
        let (word_size, word_count, region_count) = data.row_layout();
        let len = usize::from(item_count) * row_size(word_size, word_count, region_count);
        data.delta_sets = ctxt.read_scope(len)?;
        Ok(data)
    }
}
