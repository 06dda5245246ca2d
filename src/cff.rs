//! CFF font handling.
//!
//! Refer to [Technical Note #5176](http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/font/pdfs/5176.CFF.pdf)
//! for more information. CFF2 differences are described in the
//! [OpenType CFF2 chapter](https://learn.microsoft.com/en-us/typography/opentype/spec/cff2).

use std::convert::TryFrom;
use std::fmt;
use std::iter;
use std::marker::PhantomData;
use std::mem;
use std::ops;

use byteorder::{BigEndian, ByteOrder};
use itertools::Itertools;
use lazy_static::lazy_static;
use log::warn;
use num_traits as num;
use pathfinder_geometry::vector::{vec2f, Vector2F};
use tinyvec::{tiny_vec, TinyVec};

use crate::binary::read::{
    ReadArray, ReadArrayCow, ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom, ReadScope,
};
use crate::binary::source::SourceError;
use crate::binary::{U16Be, U32Be, U8};
use crate::error::ParseError;
use crate::{GlyphId, SafeFrom};

pub mod blend;
pub mod cff2;
pub mod charstring;
pub mod font;
pub mod strings;

use blend::{BlendValue, Blender};
use strings::{EXPERT_CHARSET, EXPERT_ENCODING, EXPERT_SUBSET_CHARSET, SID, STANDARD_ENCODING};

pub use font::{CFFFontReader, GlyphErrorPolicy, OwnedCFFFont, ReaderState};
pub use strings::StringPool;

// CFF Spec: An operator may be preceded by up to a maximum of 48 operands.
pub const MAX_OPERANDS: usize = 48;
const END_OF_FLOAT_FLAG: u8 = 0xf;

const OPERAND_ZERO: [Operand; 1] = [Operand::Integer(0)];
const DEFAULT_UNDERLINE_POSITION: [Operand; 1] = [Operand::Integer(-100)];
const DEFAULT_UNDERLINE_THICKNESS: [Operand; 1] = [Operand::Integer(50)];
const DEFAULT_CHARSTRING_TYPE: [Operand; 1] = [Operand::Integer(2)];
lazy_static! {
    static ref DEFAULT_FONT_MATRIX: [Operand; 6] = {
        let real_0_001 = Operand::Real(Real(tiny_vec![0x0a, 0x00, 0x1f])); // 0.001
        [
            real_0_001.clone(),
            Operand::Integer(0),
            Operand::Integer(0),
            real_0_001,
            Operand::Integer(0),
            Operand::Integer(0),
        ]
    };
}
const DEFAULT_BBOX: [Operand; 4] = [
    Operand::Integer(0),
    Operand::Integer(0),
    Operand::Integer(0),
    Operand::Integer(0),
];
const DEFAULT_CID_COUNT: [Operand; 1] = [Operand::Integer(8720)];
const DEFAULT_BLUE_SHIFT: [Operand; 1] = [Operand::Integer(7)];
const DEFAULT_BLUE_FUZZ: [Operand; 1] = [Operand::Integer(1)];
lazy_static! {
    static ref DEFAULT_BLUE_SCALE: [Operand; 1] =
        [Operand::Real(Real(tiny_vec![0x0a, 0x03, 0x96, 0x25, 0xff]))]; // 0.039625
    static ref DEFAULT_EXPANSION_FACTOR: [Operand; 1] =
        [Operand::Real(Real(tiny_vec![0x0a, 0x06, 0xff]))]; // 0.06
}

const ISO_ADOBE_LAST_SID: u16 = 228;
const DEFAULT_UNITS_PER_EM: u16 = 1000;

/// CFF Font Header described in Section 6 of Technical Note #5176
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub major: u8,
    pub minor: u8,
    pub hdr_size: u8,
    pub off_size: u8,
}

/// The flavour of an INDEX, which determines the size of its count field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexFormat {
    /// 16-bit count, as used by CFF.
    Cff,
    /// 32-bit count, as used by CFF2.
    Cff2,
}

/// A CFF INDEX described in Section 5 of Technical Note #5176
#[derive(Clone)]
pub struct Index<'a> {
    pub count: usize,
    off_size: u8,
    offset_array: &'a [u8],
    data_array: &'a [u8],
    format: IndexFormat,
}

/// Reads an `Index` with a 16-bit count.
pub struct IndexU16;

/// Reads an `Index` with a 32-bit count.
pub struct IndexU32;

/// Options for parsing CFF structures.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Skip unknown DICT operators instead of failing.
    pub lenient: bool,
}

/// A list of errors that can occur when reading CFF fonts and interpreting their CharStrings.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum CFFError {
    ParseError(ParseError),
    SourceStream,
    BadFont,
    NoCharStrings,
    NoFDArray,
    NoFDSelect,
    InvalidOperator,
    UnsupportedOperator,
    MissingEndChar,
    DataAfterEndChar,
    NestingLimitReached,
    ArgumentsStackLimitReached,
    StackUnderflow,
    InvalidArgumentsStackLength,
    IndexBounds,
    RollBounds,
    PutBounds,
    GetBounds,
    DivideByZero,
    SqrtDomain,
    BboxOverflow,
    MissingMoveTo,
    InvalidSubroutineIndex { global: bool },
    NoLocalSubroutines,
    InvalidSeacCode,
    BadSeacComponent,
    DuplicateVsIndex,
    MissingVariationStore,
    Quit,
    SinkFailed,
}

// Encoding data is located via the offset operand to the Encoding operator in the Top DICT. Only
// one Encoding operator can be specified per font except for CIDFonts which specify no encoding.
#[derive(Clone)]
pub enum Encoding<'a> {
    Standard,
    Expert,
    Custom(CustomEncoding<'a>),
}

#[derive(Clone)]
pub enum Charset<'a> {
    ISOAdobe,
    Expert,
    ExpertSubset,
    Custom(CustomCharset<'a>),
}

/// An encoding stored in the font, with optional supplementary codes.
#[derive(Clone)]
pub struct CustomEncoding<'a> {
    pub codes: EncodingCodes<'a>,
    pub supplements: ReadArray<'a, Supplement>,
}

#[derive(Clone)]
pub enum EncodingCodes<'a> {
    Format0 { codes: ReadArray<'a, U8> },
    Format1 { ranges: ReadArray<'a, Range<u8, u8>> },
}

/// An extra code for the glyph named by `sid`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Supplement {
    pub code: u8,
    pub sid: SID,
}

#[derive(Clone)]
pub enum CustomCharset<'a> {
    Format0 {
        glyphs: ReadArrayCow<'a, U16Be>,
    },
    Format1 {
        ranges: ReadArrayCow<'a, Range<SID, u8>>,
    },
    Format2 {
        ranges: ReadArrayCow<'a, Range<SID, u16>>,
    },
}

/// The encoding codes of every glyph in a font.
#[derive(Debug, Clone, Default)]
pub struct GlyphEncodings {
    codes: Vec<TinyVec<[u8; 2]>>,
}

/// A Range from `first` to `first + n_left`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Range<F, N> {
    pub first: F,
    pub n_left: N,
}

/// A CFF DICT described in Section 4 of Technical Note #5176
#[derive(Debug, PartialEq, Clone)]
pub struct Dict<T>
where
    T: DictDefault,
{
    dict: Vec<(Operator, Vec<Operand>)>,
    default: PhantomData<T>,
}

/// The parameters of a DICT read.
#[derive(Copy, Clone)]
pub struct DictArgs<'a> {
    /// Operands allowed before an operator: 48 for CFF, 513 for CFF2.
    pub max_operands: usize,
    /// Skip unknown operators instead of failing.
    pub lenient: bool,
    /// Resolves `blend` operators. Without one `blend` is a `MissingValue` error.
    pub blender: Option<Blender<'a>>,
}

/// The default values of a DICT
pub trait DictDefault {
    /// Returns the default operand(s) if any for the supplied `op`.
    fn default(op: Operator) -> Option<&'static [Operand]>;
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

/// Font DICT select as described in Section 19 of Technical Note #5176
#[derive(Clone, Debug)]
pub enum FDSelect<'a> {
    Format0 {
        glyph_font_dict_indices: ReadArrayCow<'a, U8>,
    },
    // Formats 1 and 2 are not defined
    Format3 {
        ranges: ReadArrayCow<'a, Range<u16, u8>>,
        sentinel: u16,
    },
    /// CFF2 only
    Format4 {
        ranges: ReadArrayCow<'a, Range<u32, u16>>,
        sentinel: u32,
    },
}

/// The transform from glyph space to text space, `[a b c d e f]`.
///
/// A point maps as `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FontMatrix(pub [f64; 6]);

/// CFF DICT operator
#[derive(Debug, PartialEq)]
enum Op {
    Operator(Operator),
    Operand(Operand),
    Unknown(u16),
}

/// CFF operand to an operator
#[derive(Debug, PartialEq, Clone)]
pub enum Operand {
    Integer(i32),
    Offset(i32),
    Real(Real),
    /// Result of a CFF2 `blend`.
    Blend(BlendValue),
}

// On a corpus of 23945 CFF fonts real values were encountered as follows:
//     572 2 bytes
//     776 3 bytes
//    1602 4 bytes
//   14037 5 bytes
//    3491 6 bytes
//      36 7 bytes

/// A real number
///
/// To parse the value into `f64` use the `TryFrom`/`TryInto` impl.
#[derive(Debug, PartialEq, Clone)]
pub struct Real(TinyVec<[u8; 7]>);

#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Operator {
    Version = 0,
    Notice = 1,
    FullName = 2,
    FamilyName = 3,
    Weight = 4,
    FontBBox = 5,
    BlueValues = 6,
    OtherBlues = 7,
    FamilyBlues = 8,
    FamilyOtherBlues = 9,
    StdHW = 10,
    StdVW = 11,
    UniqueID = 13,
    XUID = 14,
    Charset = 15,
    Encoding = 16,
    CharStrings = 17,
    Private = 18,
    Subrs = 19,
    DefaultWidthX = 20,
    NominalWidthX = 21,
    VSIndex = 22,
    Blend = 23,
    VStore = 24,
    Copyright = op2(0),
    IsFixedPitch = op2(1),
    ItalicAngle = op2(2),
    UnderlinePosition = op2(3),
    UnderlineThickness = op2(4),
    PaintType = op2(5),
    CharstringType = op2(6),
    FontMatrix = op2(7),
    StrokeWidth = op2(8),
    BlueScale = op2(9),
    BlueShift = op2(10),
    BlueFuzz = op2(11),
    StemSnapH = op2(12),
    StemSnapV = op2(13),
    ForceBold = op2(14),
    LanguageGroup = op2(17),
    ExpansionFactor = op2(18),
    InitialRandomSeed = op2(19),
    SyntheticBase = op2(20),
    PostScript = op2(21),
    BaseFontName = op2(22),
    BaseFontBlend = op2(23),
    MaxStack = op2(25),
    ROS = op2(30),
    CIDFontVersion = op2(31),
    CIDFontRevision = op2(32),
    CIDFontType = op2(33),
    CIDCount = op2(34),
    UIDBase = op2(35),
    FDArray = op2(36),
    FDSelect = op2(37),
    FontName = op2(38),
}

const fn op2(value: u8) -> u16 {
    (12 << 8) | (value as u16)
}

/// The bias added to subroutine numbers, which depends on the number of subroutines.
///
/// Adobe Technical Note #5176, Chapter 16 "Local / Global Subrs INDEXes"
pub fn subr_bias(count: usize) -> i32 {
    if count < 1240 {
        107
    } else if count < 33900 {
        1131
    } else {
        32768
    }
}

impl CFFError {
    /// True if this error means the font as a whole cannot be read, rather than one glyph.
    pub fn is_font_error(&self) -> bool {
        match self {
            CFFError::BadFont
            | CFFError::NoCharStrings
            | CFFError::NoFDArray
            | CFFError::NoFDSelect
            | CFFError::SourceStream => true,
            CFFError::ParseError(error) => error.is_structural(),
            _ => false,
        }
    }
}

impl From<ParseError> for CFFError {
    fn from(error: ParseError) -> CFFError {
        CFFError::ParseError(error)
    }
}

impl From<SourceError> for CFFError {
    fn from(_error: SourceError) -> CFFError {
        CFFError::SourceStream
    }
}

impl fmt::Display for CFFError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CFFError::ParseError(parse_error) => {
                write!(f, "parse error: ")?;
                parse_error.fmt(f)
            }
            CFFError::SourceStream => write!(f, "unable to read from the font source"),
            CFFError::BadFont => write!(f, "not a CFF or CFF2 font"),
            CFFError::NoCharStrings => write!(f, "font has no CharStrings"),
            CFFError::NoFDArray => write!(f, "CID font has no FDArray"),
            CFFError::NoFDSelect => write!(f, "CID font has no FDSelect"),
            CFFError::InvalidOperator => write!(f, "an invalid operator occurred"),
            CFFError::UnsupportedOperator => write!(f, "an unsupported operator occurred"),
            CFFError::MissingEndChar => write!(f, "the 'endchar' operator is missing"),
            CFFError::DataAfterEndChar => write!(f, "unused data left after 'endchar' operator"),
            CFFError::NestingLimitReached => write!(f, "subroutines nesting limit reached"),
            CFFError::ArgumentsStackLimitReached => write!(f, "arguments stack limit reached"),
            CFFError::StackUnderflow => write!(f, "arguments stack underflow"),
            CFFError::InvalidArgumentsStackLength => {
                write!(f, "an invalid amount of items are in an arguments stack")
            }
            CFFError::IndexBounds => write!(f, "'index' operand out of bounds"),
            CFFError::RollBounds => write!(f, "'roll' operand out of bounds"),
            CFFError::PutBounds => write!(f, "'put' operand out of bounds"),
            CFFError::GetBounds => write!(f, "'get' operand out of bounds"),
            CFFError::DivideByZero => write!(f, "division by zero"),
            CFFError::SqrtDomain => write!(f, "square root of a negative number"),
            CFFError::BboxOverflow => write!(f, "outline's bounding box is too large"),
            CFFError::MissingMoveTo => write!(f, "missing moveto operator"),
            CFFError::InvalidSubroutineIndex { global: true } => {
                write!(f, "an invalid global subroutine index")
            }
            CFFError::InvalidSubroutineIndex { global: false } => {
                write!(f, "an invalid local subroutine index")
            }
            CFFError::NoLocalSubroutines => write!(f, "no local subroutines"),
            CFFError::InvalidSeacCode => write!(f, "invalid seac code"),
            CFFError::BadSeacComponent => write!(f, "seac component has no glyph"),
            CFFError::DuplicateVsIndex => write!(f, "duplicate vsindex operator"),
            CFFError::MissingVariationStore => write!(f, "blend used without a variation store"),
            CFFError::Quit => write!(f, "stopped by the outline sink"),
            CFFError::SinkFailed => write!(f, "the outline sink failed"),
        }
    }
}

impl std::error::Error for CFFError {}

impl ReadBinary for Header {
    type HostType<'b> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        // From section 6 of Technical Note #5176:
        // If the major version number is understood by an implementation it can safely proceed
        // with reading the font.
        let major = ctxt.read_u8()?;
        ctxt.check_version(major == 1)?;
        let minor = ctxt.read_u8()?;
        let hdr_size = ctxt.read_u8()?;
        let off_size = ctxt.read_u8()?;

        if hdr_size < 4 {
            return Err(ParseError::BadValue);
        }

        if !(1..=4).contains(&off_size) {
            return Err(ParseError::BadValue);
        }

        let _unknown = ctxt.read_slice(usize::from(hdr_size - 4))?;

        Ok(Header {
            major,
            minor,
            hdr_size,
            off_size,
        })
    }
}

impl ReadBinaryDep for Index<'_> {
    type Args<'a> = IndexFormat;
    type HostType<'a> = Index<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        format: IndexFormat,
    ) -> Result<Self::HostType<'a>, ParseError> {
        let count = match format {
            IndexFormat::Cff => usize::from(ctxt.read_u16be()?),
            IndexFormat::Cff2 => usize::safe_from(ctxt.read_u32be()?),
        };

        if count == 0 {
            return Ok(Index {
                count,
                off_size: 1,
                offset_array: &[],
                data_array: &[],
                format,
            });
        }

        let off_size = ctxt.read_u8()?;
        if !(1..=4).contains(&off_size) {
            return Err(ParseError::BadValue);
        }

        let offset_array_size = count
            .checked_add(1)
            .and_then(|n| n.checked_mul(usize::from(off_size)))
            .ok_or(ParseError::LimitExceeded)?;
        let offset_array = ctxt.read_slice(offset_array_size)?;

        // Offsets are relative to the byte preceding the data, so the first is always 1.
        if format == IndexFormat::Cff && lookup_offset_index(off_size, offset_array, 0) != 1 {
            return Err(ParseError::BadOffset);
        }

        let last_offset_index = lookup_offset_index(off_size, offset_array, count);
        if last_offset_index < 1 {
            return Err(ParseError::BadOffset);
        }

        let data_array = ctxt.read_slice(last_offset_index - 1)?;

        Ok(Index {
            count,
            off_size,
            offset_array,
            data_array,
            format,
        })
    }
}

impl ReadBinary for IndexU16 {
    type HostType<'a> = Index<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        ctxt.read_dep::<Index<'_>>(IndexFormat::Cff)
    }
}

impl ReadBinary for IndexU32 {
    type HostType<'a> = Index<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        ctxt.read_dep::<Index<'_>>(IndexFormat::Cff2)
    }
}

impl<'a> Index<'a> {
    /// An INDEX with no elements.
    pub fn empty(format: IndexFormat) -> Self {
        Index {
            count: 0,
            off_size: 1,
            offset_array: &[],
            data_array: &[],
            format,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn format(&self) -> IndexFormat {
        self.format
    }

    /// The byte range of element `index` within the data of this INDEX.
    pub fn get(&self, index: usize) -> Result<ops::Range<usize>, ParseError> {
        if index >= self.count {
            return Err(ParseError::BadIndex);
        }
        let start = lookup_offset_index(self.off_size, self.offset_array, index);
        let end = lookup_offset_index(self.off_size, self.offset_array, index + 1);
        if start < 1 || end < start || end - 1 > self.data_array.len() {
            return Err(ParseError::BadOffset);
        }
        if self.format == IndexFormat::Cff && end - start > usize::from(u16::MAX) {
            return Err(ParseError::BadOffset);
        }
        Ok(start - 1..end - 1)
    }

    /// The bytes of element `index`.
    pub fn read_object(&self, index: usize) -> Result<&'a [u8], ParseError> {
        let range = self.get(index)?;
        self.data_array.get(range).ok_or(ParseError::BadOffset)
    }

    /// Read element `index` as a `T`.
    pub fn read_item<T: ReadBinaryDep>(
        &self,
        index: usize,
        args: T::Args<'a>,
    ) -> Result<T::HostType<'a>, ParseError> {
        let data = self.read_object(index)?;
        ReadScope::new(data).read_dep::<T>(args)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<&'a [u8], ParseError>> + '_ {
        (0..self.count).map(move |i| self.read_object(i))
    }

    /// The number of bytes this INDEX occupies.
    pub fn byte_len(&self) -> usize {
        let count_size = match self.format {
            IndexFormat::Cff => 2,
            IndexFormat::Cff2 => 4,
        };
        if self.count == 0 {
            count_size
        } else {
            count_size + 1 + self.offset_array.len() + self.data_array.len()
        }
    }

    /// Returns the size of the data held by this INDEX.
    pub fn data_len(&self) -> usize {
        self.data_array.len()
    }
}

impl<'a> DictArgs<'a> {
    /// Arguments for reading CFF DICTs.
    pub fn cff(options: ParseOptions) -> Self {
        DictArgs {
            max_operands: MAX_OPERANDS,
            lenient: options.lenient,
            blender: None,
        }
    }

    /// Arguments for reading CFF2 DICTs.
    pub fn cff2(options: ParseOptions, blender: Option<Blender<'a>>) -> Self {
        DictArgs {
            max_operands: cff2::MAX_OPERANDS,
            lenient: options.lenient,
            blender,
        }
    }
}

impl Default for DictArgs<'_> {
    fn default() -> Self {
        DictArgs::cff(ParseOptions::default())
    }
}

impl<T> ReadBinaryDep for Dict<T>
where
    T: DictDefault,
{
    type Args<'a> = DictArgs<'a>;
    type HostType<'a> = Self;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, args: DictArgs<'a>) -> Result<Self, ParseError> {
        let mut dict = Vec::new();
        let mut operands = Vec::new();
        let mut vsindex = 0;

        while ctxt.bytes_available() {
            match Op::read(ctxt)? {
                Op::Operator(Operator::Blend) => {
                    let blender = args.blender.ok_or(ParseError::MissingValue)?;
                    blend_dict_operands(&mut operands, &blender, vsindex)?;
                }
                Op::Operator(operator) => {
                    if operator == Operator::VSIndex {
                        vsindex = match operands.as_slice() {
                            [Operand::Integer(index)] => u16::try_from(*index)?,
                            _ => return Err(ParseError::BadValue),
                        };
                    }
                    integer_to_offset(operator, &mut operands);
                    dict.push((operator, mem::take(&mut operands)));
                }
                Op::Unknown(code) => {
                    if !args.lenient {
                        return Err(ParseError::BadValue);
                    }
                    warn!(
                        "skipping unknown dict operator {} with {} operands",
                        code,
                        operands.len()
                    );
                    operands.clear();
                }
                Op::Operand(operand) => {
                    operands.push(operand);
                    if operands.len() > args.max_operands {
                        return Err(ParseError::LimitExceeded);
                    }
                }
            }
        }

        Ok(Dict {
            dict,
            default: PhantomData,
        })
    }
}

fn blend_dict_operands(
    operands: &mut Vec<Operand>,
    blender: &Blender<'_>,
    vsindex: u16,
) -> Result<(), ParseError> {
    let values = operands
        .iter()
        .map(Operand::to_f64)
        .collect::<Result<Vec<_>, _>>()?;
    let region_count = blender.region_count(vsindex)?;
    let scalars = blender.scalars(vsindex)?;
    let blended = blend::blend_operands(&values, region_count, &scalars)?;
    let consumed = 1 + blended.len() * (region_count + 1);
    operands.truncate(operands.len() - consumed);
    operands.extend(blended.into_iter().map(Operand::Blend));
    Ok(())
}

// Special case handling for operands that are offsets. This function swaps them from an
// Integer to an Offset.
fn integer_to_offset(operator: Operator, operands: &mut [Operand]) {
    match (operator, &operands) {
        // Encodings 0..=1 indicate predefined encodings and are not offsets
        (Operator::Encoding, [Operand::Integer(offset)]) if *offset > 1 => {
            operands[0] = Operand::Offset(*offset);
        }
        (Operator::Charset, [Operand::Integer(offset)]) if *offset > 2 => {
            operands[0] = Operand::Offset(*offset);
        }
        (Operator::CharStrings, [Operand::Integer(offset)])
        | (Operator::Subrs, [Operand::Integer(offset)])
        | (Operator::FDArray, [Operand::Integer(offset)])
        | (Operator::FDSelect, [Operand::Integer(offset)])
        | (Operator::VStore, [Operand::Integer(offset)]) => {
            operands[0] = Operand::Offset(*offset);
        }
        (Operator::Private, [Operand::Integer(length), Operand::Integer(offset)]) => {
            let offset = *offset;
            operands[0] = Operand::Offset(*length);
            operands[1] = Operand::Offset(offset);
        }
        _ => {}
    }
}

impl ReadBinary for Op {
    type HostType<'b> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self, ParseError> {
        let b0 = ctxt.read_u8()?;

        match b0 {
            0..=11 | 13..=24 => Ok(operator_or_unknown(u16::from(b0))),
            12 => Ok(operator_or_unknown(op2(ctxt.read_u8()?))),
            28 => {
                let num = ctxt.read_i16be()?;
                ok_int(i32::from(num))
            }
            29 => ok_int(ctxt.read_i32be()?),
            30 => ok_real(ctxt.read_until_nibble(END_OF_FLOAT_FLAG)?),
            32..=246 => ok_int(i32::from(b0) - 139),
            247..=250 => {
                let b1 = ctxt.read_u8()?;
                ok_int((i32::from(b0) - 247) * 256 + i32::from(b1) + 108)
            }
            251..=254 => {
                let b1 = ctxt.read_u8()?;
                ok_int(-(i32::from(b0) - 251) * 256 - i32::from(b1) - 108)
            }
            25..=27 | 31 | 255 => Ok(Op::Unknown(u16::from(b0))), // reserved
        }
    }
}

fn operator_or_unknown(code: u16) -> Op {
    Operator::try_from(code).map_or(Op::Unknown(code), Op::Operator)
}

fn ok_int(num: i32) -> Result<Op, ParseError> {
    Ok(Op::Operand(Operand::Integer(num)))
}

fn ok_real(slice: &[u8]) -> Result<Op, ParseError> {
    Ok(Op::Operand(Operand::Real(Real(TinyVec::from(slice)))))
}

const FLOAT_BUF_LEN: usize = 64;

// Portions of this try_from impl derived from ttf-parser, licenced under Apache-2.0.
// https://github.com/RazrFalcon/ttf-parser/blob/ba2d9c8b9a207951b7b07e9481bc74688762bd21/src/tables/cff/dict.rs#L188
impl TryFrom<&Real> for f64 {
    type Error = ParseError;

    /// Try to parse this `Real` into an `f64`.
    fn try_from(real: &Real) -> Result<Self, Self::Error> {
        let mut buf = [0u8; FLOAT_BUF_LEN];
        let mut used = 0;

        for &byte in real.0.iter() {
            let nibble1 = byte >> 4;
            let nibble2 = byte & 0xF;

            if nibble1 == END_OF_FLOAT_FLAG {
                break;
            }
            parse_float_nibble(nibble1, &mut used, &mut buf)?;
            if nibble2 == END_OF_FLOAT_FLAG {
                break;
            }
            parse_float_nibble(nibble2, &mut used, &mut buf)?;
        }

        // The buffer only ever holds ASCII so this can't fail, but a bad float is a bad value.
        let s = std::str::from_utf8(&buf[..used]).map_err(|_| ParseError::BadValue)?;
        s.parse().map_err(|_| ParseError::BadValue)
    }
}

impl TryFrom<Real> for f64 {
    type Error = ParseError;

    fn try_from(real: Real) -> Result<Self, Self::Error> {
        f64::try_from(&real)
    }
}

// Adobe Technical Note #5176, Table 5 Nibble Definitions
fn parse_float_nibble(nibble: u8, idx: &mut usize, data: &mut [u8]) -> Result<(), ParseError> {
    if *idx == FLOAT_BUF_LEN {
        return Err(ParseError::LimitExceeded);
    }

    match nibble {
        0..=9 => {
            data[*idx] = b'0' + nibble;
        }
        10 => {
            data[*idx] = b'.';
        }
        11 => {
            data[*idx] = b'E';
        }
        12 => {
            if *idx + 1 == FLOAT_BUF_LEN {
                return Err(ParseError::LimitExceeded);
            }

            data[*idx] = b'E';
            *idx += 1;
            data[*idx] = b'-';
        }
        14 => {
            data[*idx] = b'-';
        }
        _ => return Err(ParseError::BadValue),
    }

    *idx += 1;
    Ok(())
}

impl ReadFrom for Range<u8, u8> {
    type ReadType = (U8, U8);
    fn read_from((first, n_left): (u8, u8)) -> Self {
        Range { first, n_left }
    }
}

impl ReadFrom for Range<SID, u8> {
    type ReadType = (U16Be, U8);
    fn read_from((first, n_left): (SID, u8)) -> Self {
        Range { first, n_left }
    }
}

impl ReadFrom for Range<SID, u16> {
    type ReadType = (U16Be, U16Be);
    fn read_from((first, n_left): (SID, u16)) -> Self {
        Range { first, n_left }
    }
}

impl ReadFrom for Range<u32, u16> {
    type ReadType = (U32Be, U16Be);
    fn read_from((first, n_left): (u32, u16)) -> Self {
        Range { first, n_left }
    }
}

impl ReadFrom for Supplement {
    type ReadType = (U8, U16Be);
    fn read_from((code, sid): (u8, u16)) -> Self {
        Supplement { code, sid }
    }
}

impl<F, N> Range<F, N>
where
    N: num::Unsigned + Copy,
    usize: From<N>,
{
    pub fn len(&self) -> usize {
        usize::from(self.n_left) + 1
    }
}

impl<F, N> Range<F, N>
where
    F: num::Unsigned + Copy,
    N: num::Unsigned + Copy,
    u32: From<F> + From<N>,
{
    /// The values covered by this range. Values past `u16::MAX` are dropped.
    pub fn iter(&self) -> impl Iterator<Item = u16> {
        let first = u32::from(self.first);
        let last = first + u32::from(self.n_left);
        (first..=last).map_while(|value| u16::try_from(value).ok())
    }
}

impl<'b> ReadBinary for CustomEncoding<'b> {
    type HostType<'a> = CustomEncoding<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        // First byte indicates the format of the encoding data. A set high bit indicates that
        // supplementary codes follow the encoding.
        let format = ctxt.read::<U8>()?;
        let codes = match format & 0x7F {
            0 => {
                let ncodes = ctxt.read::<U8>()?;
                let codes = ctxt.read_array::<U8>(usize::from(ncodes))?;
                EncodingCodes::Format0 { codes }
            }
            1 => {
                let nranges = ctxt.read::<U8>()?;
                let ranges = ctxt.read_array::<Range<u8, u8>>(usize::from(nranges))?;
                EncodingCodes::Format1 { ranges }
            }
            _ => return Err(ParseError::BadValue),
        };
        let supplements = if format & 0x80 == 0x80 {
            let nsups = ctxt.read::<U8>()?;
            ctxt.read_array::<Supplement>(usize::from(nsups))?
        } else {
            ReadArray::empty()
        };

        Ok(CustomEncoding { codes, supplements })
    }
}

impl Encoding<'_> {
    /// The glyph for `code`, without supplements. `charset` maps SIDs of the predefined
    /// encodings to glyphs.
    pub fn glyph_for_code(&self, code: u8, charset: &Charset<'_>) -> Option<GlyphId> {
        match self {
            Encoding::Standard => sid_glyph(STANDARD_ENCODING[usize::from(code)], charset),
            Encoding::Expert => sid_glyph(EXPERT_ENCODING[usize::from(code)], charset),
            Encoding::Custom(custom) => custom.glyph_for_code(code),
        }
    }
}

fn sid_glyph(sid: SID, charset: &Charset<'_>) -> Option<GlyphId> {
    match sid {
        0 => None,
        sid => charset.sid_to_gid(sid),
    }
}

impl CustomEncoding<'_> {
    fn glyph_for_code(&self, code: u8) -> Option<GlyphId> {
        match &self.codes {
            // The codes of glyph 1 onwards, .notdef is never encoded.
            EncodingCodes::Format0 { codes } => codes
                .iter()
                .position(|c| c == code)
                .and_then(|index| u16::try_from(index + 1).ok()),
            EncodingCodes::Format1 { ranges } => {
                let mut glyph_id = 1u32;
                for range in ranges.iter() {
                    let first = u32::from(range.first);
                    let code = u32::from(code);
                    if first <= code && code <= first + u32::from(range.n_left) {
                        return u16::try_from(glyph_id + code - first).ok();
                    }
                    glyph_id += u32::from(range.n_left) + 1;
                }
                None
            }
        }
    }
}

impl GlyphEncodings {
    /// Resolve the codes of all `num_glyphs` glyphs.
    pub fn new(encoding: &Encoding<'_>, charset: &Charset<'_>, num_glyphs: usize) -> Self {
        let mut encodings = GlyphEncodings {
            codes: vec![TinyVec::new(); num_glyphs],
        };

        match encoding {
            Encoding::Standard | Encoding::Expert => {
                let table = match encoding {
                    Encoding::Expert => &EXPERT_ENCODING,
                    _ => &STANDARD_ENCODING,
                };
                for (code, &sid) in (0..=u8::MAX).zip(table.iter()) {
                    if let Some(glyph_id) = sid_glyph(sid, charset) {
                        encodings.push(glyph_id, code);
                    }
                }
            }
            Encoding::Custom(custom) => {
                match &custom.codes {
                    EncodingCodes::Format0 { codes } => {
                        for (glyph_id, code) in (1..=u16::MAX).zip(codes.iter()) {
                            encodings.push(glyph_id, code);
                        }
                    }
                    EncodingCodes::Format1 { ranges } => {
                        let codes = ranges.iter().flat_map(|range| {
                            let first = u16::from(range.first);
                            (first..=first + u16::from(range.n_left))
                                .filter_map(|code| u8::try_from(code).ok())
                        });
                        for (glyph_id, code) in (1..=u16::MAX).zip(codes) {
                            encodings.push(glyph_id, code);
                        }
                    }
                }
                for Supplement { code, sid } in custom.supplements.iter() {
                    match charset.sid_to_gid(sid) {
                        Some(glyph_id) if usize::from(glyph_id) < num_glyphs => {
                            encodings.push(glyph_id, code)
                        }
                        _ => warn!(
                            "ignoring encoding supplement for code {}, sid {} has no glyph",
                            code, sid
                        ),
                    }
                }
            }
        }

        encodings
    }

    fn push(&mut self, glyph_id: GlyphId, code: u8) {
        if let Some(codes) = self.codes.get_mut(usize::from(glyph_id)) {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
    }

    /// The codes of `glyph_id`, primary code first.
    pub fn codes(&self, glyph_id: GlyphId) -> &[u8] {
        self.codes
            .get(usize::from(glyph_id))
            .map_or(&[], |codes| codes.as_slice())
    }

    /// The first glyph encoded by `code`.
    pub fn glyph_for_code(&self, code: u8) -> Option<GlyphId> {
        self.codes
            .iter()
            .position(|codes| codes.contains(&code))
            .and_then(|index| u16::try_from(index).ok())
    }
}

impl<'a> Charset<'a> {
    /// Returns the id of the SID (Type 1 font) or CID (CID keyed font) of the name of the supplied glyph
    pub fn id_for_glyph(&self, glyph_id: GlyphId) -> Option<u16> {
        match self {
            // In ISOAdobe glyph ID maps to SID
            Charset::ISOAdobe => {
                if glyph_id <= ISO_ADOBE_LAST_SID {
                    Some(glyph_id)
                } else {
                    None
                }
            }
            Charset::Expert => EXPERT_CHARSET.get(usize::from(glyph_id)).copied(),
            Charset::ExpertSubset => EXPERT_SUBSET_CHARSET.get(usize::from(glyph_id)).copied(),
            Charset::Custom(custom) => custom.id_for_glyph(glyph_id),
        }
    }

    /// Returns the glyph id of the supplied string id.
    pub fn sid_to_gid(&self, sid: SID) -> Option<GlyphId> {
        if sid == 0 {
            return Some(0);
        }

        match self {
            Charset::ISOAdobe => (sid <= ISO_ADOBE_LAST_SID).then_some(sid),
            Charset::Expert => position_of(&EXPERT_CHARSET, sid),
            Charset::ExpertSubset => position_of(&EXPERT_SUBSET_CHARSET, sid),
            Charset::Custom(custom) => custom.sid_to_gid(sid),
        }
    }
}

fn position_of(table: &[u16], sid: SID) -> Option<GlyphId> {
    table
        .iter()
        .position(|&s| s == sid)
        .and_then(|index| u16::try_from(index).ok())
}

impl<'b> ReadBinaryDep for CustomCharset<'b> {
    type Args<'a> = usize;
    type HostType<'a> = CustomCharset<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        n_glyphs: usize,
    ) -> Result<Self::HostType<'a>, ParseError> {
        // (There is one less element in the glyph name array than nGlyphs because the .notdef
        // glyph name is omitted.)
        let n_glyphs = n_glyphs.checked_sub(1).ok_or(ParseError::BadValue)?;
        match ctxt.read::<U8>()? {
            0 => {
                let glyphs = ctxt
                    .read_array::<U16Be>(n_glyphs)
                    .map_err(|_| ParseError::BadValue)?;
                Ok(CustomCharset::Format0 {
                    glyphs: ReadArrayCow::Borrowed(glyphs),
                })
            }
            1 => {
                let ranges = read_range_array(ctxt, n_glyphs)?;
                Ok(CustomCharset::Format1 {
                    ranges: ReadArrayCow::Borrowed(ranges),
                })
            }
            2 => {
                let ranges = read_range_array(ctxt, n_glyphs)?;
                Ok(CustomCharset::Format2 {
                    ranges: ReadArrayCow::Borrowed(ranges),
                })
            }
            _ => Err(ParseError::BadValue),
        }
    }
}

impl<'a> CustomCharset<'a> {
    pub fn iter(&'a self) -> Box<dyn Iterator<Item = u16> + 'a> {
        let notdef = iter::once(0);
        match &self {
            CustomCharset::Format0 { glyphs } => Box::new(notdef.chain(glyphs.iter())),
            CustomCharset::Format1 { ranges } => {
                Box::new(notdef.chain(ranges.iter().flat_map(|range| range.iter())))
            }
            CustomCharset::Format2 { ranges } => {
                Box::new(notdef.chain(ranges.iter().flat_map(|range| range.iter())))
            }
        }
    }

    /// Returns the SID (Type 1 font) or CID (CID keyed font) of the name of the supplied glyph
    pub fn id_for_glyph(&self, glyph_id: GlyphId) -> Option<u16> {
        // Section 11 of Technical Note #5176:
        // By definition the first glyph (GID 0) is “.notdef” and must be present in all fonts.
        // Consequently the charset arrays always begin with GID 1.
        if glyph_id == 0 {
            return Some(0);
        }

        match self {
            CustomCharset::Format0 { glyphs } => glyphs.get_item(usize::from(glyph_id - 1)),
            CustomCharset::Format1 { ranges } => Self::id_for_glyph_in_ranges(ranges, glyph_id),
            CustomCharset::Format2 { ranges } => Self::id_for_glyph_in_ranges(ranges, glyph_id),
        }
    }

    pub fn sid_to_gid(&self, sid: SID) -> Option<GlyphId> {
        match self {
            CustomCharset::Format0 { glyphs } => {
                // First glyph is omitted, so we have to add 1.
                glyphs
                    .iter()
                    .position(|n| n == sid)
                    .and_then(|n| u16::try_from(n + 1).ok())
            }
            CustomCharset::Format1 { ranges } => Self::glyph_id_for_sid_in_ranges(ranges, sid),
            CustomCharset::Format2 { ranges } => Self::glyph_id_for_sid_in_ranges(ranges, sid),
        }
    }

    fn glyph_id_for_sid_in_ranges<N>(
        ranges: &ReadArrayCow<'a, Range<SID, N>>,
        sid: SID,
    ) -> Option<GlyphId>
    where
        N: num::Unsigned + Copy,
        u32: From<N> + From<u16>,
        Range<SID, N>: ReadFrom,
    {
        let sid = <u32 as From<u16>>::from(sid);
        let mut glyph_id = 1u32;
        for range in ranges.iter() {
            let first = <u32 as From<u16>>::from(range.first);
            let n_left = <u32 as From<N>>::from(range.n_left);
            if first <= sid && sid <= first + n_left {
                return u16::try_from(glyph_id + sid - first).ok();
            }

            glyph_id += n_left + 1;
        }

        None
    }

    fn id_for_glyph_in_ranges<N>(
        ranges: &ReadArrayCow<'a, Range<SID, N>>,
        glyph_id: GlyphId,
    ) -> Option<u16>
    where
        N: num::Unsigned + Copy,
        usize: From<N> + From<u16>,
        Range<SID, N>: ReadFrom,
    {
        let glyph_id = <usize as From<u16>>::from(glyph_id);

        ranges
            .iter()
            .scan(0usize, |glyphs_covered, range| {
                *glyphs_covered += range.len();
                Some((*glyphs_covered, range))
            })
            .find(|(glyphs_covered, _range)| glyph_id <= *glyphs_covered)
            .and_then(|(glyphs_covered, range)| {
                let first = <usize as From<u16>>::from(range.first);
                u16::try_from(first + (glyph_id - (glyphs_covered - range.len()) - 1)).ok()
            })
    }
}

fn read_range_array<'a, F, N>(
    ctxt: &mut ReadCtxt<'a>,
    n_glyphs: usize,
) -> Result<ReadArray<'a, Range<F, N>>, ParseError>
where
    Range<F, N>: ReadFrom,
    usize: From<N>,
    N: num::Unsigned + Copy,
{
    let mut peek = ctxt.scope().ctxt();
    let mut range_count = 0;
    let mut glyphs_covered = 0;
    while glyphs_covered < n_glyphs {
        // Running out of ranges means the charset covers fewer glyphs than the font has.
        let range = peek
            .read::<Range<F, N>>()
            .map_err(|_| ParseError::BadValue)?;
        range_count += 1;
        glyphs_covered += range.len();
    }

    ctxt.read_array::<Range<F, N>>(range_count)
}

impl<'b> ReadBinaryDep for FDSelect<'b> {
    type Args<'a> = usize;
    type HostType<'a> = FDSelect<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        n_glyphs: usize,
    ) -> Result<Self::HostType<'a>, ParseError> {
        match ctxt.read::<U8>()? {
            0 => {
                let glyph_font_dict_indices = ctxt.read_array::<U8>(n_glyphs)?;
                Ok(FDSelect::Format0 {
                    glyph_font_dict_indices: ReadArrayCow::Borrowed(glyph_font_dict_indices),
                })
            }
            3 => {
                let nranges = usize::from(ctxt.read::<U16Be>()?);
                let ranges = ctxt.read_array(nranges)?;
                let sentinel = ctxt.read::<U16Be>()?;
                Ok(FDSelect::Format3 {
                    ranges: ReadArrayCow::Borrowed(ranges),
                    sentinel,
                })
            }
            4 => {
                let nranges = usize::safe_from(ctxt.read::<U32Be>()?);
                let ranges = ctxt.read_array(nranges)?;
                let sentinel = ctxt.read::<U32Be>()?;
                Ok(FDSelect::Format4 {
                    ranges: ReadArrayCow::Borrowed(ranges),
                    sentinel,
                })
            }
            _ => Err(ParseError::BadValue),
        }
    }
}

impl<'a> FDSelect<'a> {
    /// Returns the index of the Font DICT for the supplied `glyph_id`
    pub fn font_dict_index(&self, glyph_id: GlyphId) -> Option<u16> {
        match self {
            FDSelect::Format0 {
                glyph_font_dict_indices,
            } => glyph_font_dict_indices
                .get_item(usize::from(glyph_id))
                .map(u16::from),
            FDSelect::Format3 { ranges, sentinel } => lookup_fd_range(
                ranges
                    .iter()
                    .map(|range| (u32::from(range.first), u16::from(range.n_left))),
                u32::from(*sentinel),
                glyph_id,
            ),
            FDSelect::Format4 { ranges, sentinel } => lookup_fd_range(
                ranges.iter().map(|range| (range.first, range.n_left)),
                *sentinel,
                glyph_id,
            ),
        }
    }
}

// Each range runs from its first glyph up to the first glyph of the next range, or the sentinel.
fn lookup_fd_range(
    ranges: impl Iterator<Item = (u32, u16)>,
    sentinel: u32,
    glyph_id: GlyphId,
) -> Option<u16> {
    let glyph_id = u32::from(glyph_id);
    #[rustfmt::skip]
    let range_windows = ranges
        .map(|(first, fd_index)| (first, Some(fd_index)))
        .chain(iter::once((sentinel, None)))
        .tuple_windows();

    for ((first, fd_index), (last, _)) in range_windows {
        if glyph_id >= first && glyph_id < last {
            return fd_index;
        }
    }

    None
}

impl DictDefault for TopDictDefault {
    fn default(op: Operator) -> Option<&'static [Operand]> {
        match op {
            Operator::IsFixedPitch => Some(&OPERAND_ZERO),
            Operator::ItalicAngle => Some(&OPERAND_ZERO),
            Operator::UnderlinePosition => Some(&DEFAULT_UNDERLINE_POSITION),
            Operator::UnderlineThickness => Some(&DEFAULT_UNDERLINE_THICKNESS),
            Operator::PaintType => Some(&OPERAND_ZERO),
            Operator::CharstringType => Some(&DEFAULT_CHARSTRING_TYPE),
            Operator::FontMatrix => Some(DEFAULT_FONT_MATRIX.as_ref()),
            Operator::FontBBox => Some(&DEFAULT_BBOX),
            Operator::StrokeWidth => Some(&OPERAND_ZERO),
            Operator::Charset => Some(&OPERAND_ZERO),
            Operator::Encoding => Some(&OPERAND_ZERO),
            Operator::CIDFontVersion => Some(&OPERAND_ZERO),
            Operator::CIDFontRevision => Some(&OPERAND_ZERO),
            Operator::CIDFontType => Some(&OPERAND_ZERO),
            Operator::CIDCount => Some(&DEFAULT_CID_COUNT),
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
            Operator::ForceBold => Some(&OPERAND_ZERO),
            Operator::LanguageGroup => Some(&OPERAND_ZERO),
            Operator::ExpansionFactor => Some(DEFAULT_EXPANSION_FACTOR.as_ref()),
            Operator::InitialRandomSeed => Some(&OPERAND_ZERO),
            Operator::StrokeWidth => Some(&OPERAND_ZERO),
            Operator::DefaultWidthX => Some(&OPERAND_ZERO),
            Operator::NominalWidthX => Some(&OPERAND_ZERO),
            Operator::VSIndex => Some(&OPERAND_ZERO),
            _ => None,
        }
    }
}

impl<'a, T> Dict<T>
where
    T: DictDefault,
{
    pub fn new() -> Self {
        Dict {
            dict: Vec::new(),
            default: PhantomData,
        }
    }

    pub fn get_with_default(&self, key: Operator) -> Option<&[Operand]> {
        self.get(key).or_else(|| T::default(key))
    }

    pub fn get(&self, key: Operator) -> Option<&[Operand]> {
        self.dict.iter().find_map(|(op, args)| {
            if *op == key {
                Some(args.as_slice())
            } else {
                None
            }
        })
    }

    /// Returns the i32 value of this operator if the operands hold a single Integer.
    pub fn get_i32(&self, key: Operator) -> Option<Result<i32, ParseError>> {
        self.get_with_default(key).map(|operands| match operands {
            [Operand::Integer(number)] => Ok(*number),
            [Operand::Offset(number)] => Ok(*number),
            [] => Err(ParseError::MissingValue),
            _ => Err(ParseError::BadValue),
        })
    }

    /// Returns the value of this operator if the operands hold a single number of any kind.
    pub fn get_f64(&self, key: Operator) -> Option<Result<f64, ParseError>> {
        self.get_with_default(key).map(|operands| match operands {
            [operand] => operand.to_f64(),
            [] => Err(ParseError::MissingValue),
            _ => Err(ParseError::BadValue),
        })
    }

    /// Returns the operands of this operator as numbers.
    pub fn get_f64_array(&self, key: Operator) -> Option<Result<Vec<f64>, ParseError>> {
        self.get_with_default(key)
            .map(|operands| operands.iter().map(Operand::to_f64).collect())
    }

    /// Returns a delta-encoded array, such as BlueValues, as absolute values.
    ///
    /// Blended entries keep their deltas, accumulated region by region.
    pub fn get_delta_array(&self, key: Operator) -> Option<Result<Vec<BlendValue>, ParseError>> {
        self.get_with_default(key).map(|operands| {
            let mut current = BlendValue::constant(0.0);
            operands
                .iter()
                .map(|operand| {
                    let value = match operand {
                        Operand::Blend(value) => value.clone(),
                        other => BlendValue::constant(other.to_f64()?),
                    };
                    current = current.add(&value);
                    Ok(current.clone())
                })
                .collect()
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Operator, Vec<Operand>)> {
        self.dict.iter()
    }

    /// Returns the first operator of this DICT or `None` if the DICT is empty.
    pub fn first_operator(&self) -> Option<Operator> {
        self.iter().next().map(|(operator, _)| *operator)
    }

    /// The FontMatrix of this DICT, if present or defaulted.
    pub fn font_matrix(&self) -> Option<Result<FontMatrix, ParseError>> {
        self.get_with_default(Operator::FontMatrix)
            .map(FontMatrix::from_operands)
    }

    /// Read a PrivateDict from this Dict returning it and its offset within `scope` on success.
    ///
    /// A Private DICT is required, but may be specified as having a length of 0 if there are no
    /// non-default values to be stored.
    pub fn read_private_dict<P: DictDefault>(
        &self,
        scope: &ReadScope<'a>,
        args: DictArgs<'a>,
    ) -> Result<(Dict<P>, usize), ParseError> {
        let (private_dict_offset, private_dict_length) =
            match self.get_with_default(Operator::Private) {
                Some([Operand::Offset(length), Operand::Offset(offset)]) => {
                    Ok((usize::try_from(*offset)?, usize::try_from(*length)?))
                }
                Some(_) => Err(ParseError::BadValue),
                None => Err(ParseError::MissingValue),
            }?;
        scope
            .offset_length(private_dict_offset, private_dict_length)?
            .read_dep::<Dict<P>>(args)
            .map(|dict| (dict, private_dict_offset))
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }
}

impl<T: DictDefault> Default for Dict<T> {
    fn default() -> Self {
        Dict::new()
    }
}

impl TopDict {
    /// A Top DICT that starts with ROS describes a CID-keyed font.
    pub fn is_cid_keyed(&self) -> bool {
        self.get(Operator::ROS).is_some()
    }
}

impl TryFrom<u16> for Operator {
    type Error = ParseError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if (value & 0xFF00) == (12 << 8) {
            match value as u8 {
                0 => Ok(Operator::Copyright),
                1 => Ok(Operator::IsFixedPitch),
                2 => Ok(Operator::ItalicAngle),
                3 => Ok(Operator::UnderlinePosition),
                4 => Ok(Operator::UnderlineThickness),
                5 => Ok(Operator::PaintType),
                6 => Ok(Operator::CharstringType),
                7 => Ok(Operator::FontMatrix),
                8 => Ok(Operator::StrokeWidth),
                9 => Ok(Operator::BlueScale),
                10 => Ok(Operator::BlueShift),
                11 => Ok(Operator::BlueFuzz),
                12 => Ok(Operator::StemSnapH),
                13 => Ok(Operator::StemSnapV),
                14 => Ok(Operator::ForceBold),
                17 => Ok(Operator::LanguageGroup),
                18 => Ok(Operator::ExpansionFactor),
                19 => Ok(Operator::InitialRandomSeed),
                20 => Ok(Operator::SyntheticBase),
                21 => Ok(Operator::PostScript),
                22 => Ok(Operator::BaseFontName),
                23 => Ok(Operator::BaseFontBlend),
                25 => Ok(Operator::MaxStack),
                30 => Ok(Operator::ROS),
                31 => Ok(Operator::CIDFontVersion),
                32 => Ok(Operator::CIDFontRevision),
                33 => Ok(Operator::CIDFontType),
                34 => Ok(Operator::CIDCount),
                35 => Ok(Operator::UIDBase),
                36 => Ok(Operator::FDArray),
                37 => Ok(Operator::FDSelect),
                38 => Ok(Operator::FontName),
                _ => Err(ParseError::BadValue),
            }
        } else {
            match value {
                0 => Ok(Operator::Version),
                1 => Ok(Operator::Notice),
                2 => Ok(Operator::FullName),
                3 => Ok(Operator::FamilyName),
                4 => Ok(Operator::Weight),
                5 => Ok(Operator::FontBBox),
                6 => Ok(Operator::BlueValues),
                7 => Ok(Operator::OtherBlues),
                8 => Ok(Operator::FamilyBlues),
                9 => Ok(Operator::FamilyOtherBlues),
                10 => Ok(Operator::StdHW),
                11 => Ok(Operator::StdVW),
                13 => Ok(Operator::UniqueID),
                14 => Ok(Operator::XUID),
                15 => Ok(Operator::Charset),
                16 => Ok(Operator::Encoding),
                17 => Ok(Operator::CharStrings),
                18 => Ok(Operator::Private),
                19 => Ok(Operator::Subrs),
                20 => Ok(Operator::DefaultWidthX),
                21 => Ok(Operator::NominalWidthX),
                22 => Ok(Operator::VSIndex),
                23 => Ok(Operator::Blend),
                24 => Ok(Operator::VStore),
                _ => Err(ParseError::BadValue),
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Operand {
    pub fn is_offset(&self) -> bool {
        matches!(self, Operand::Offset(_))
    }

    /// The numeric value of this operand. Blends yield their resolved value.
    pub fn to_f64(&self) -> Result<f64, ParseError> {
        match self {
            Operand::Integer(value) | Operand::Offset(value) => Ok(f64::from(*value)),
            Operand::Real(real) => f64::try_from(real),
            Operand::Blend(blend) => Ok(blend.value),
        }
    }
}

impl FontMatrix {
    /// The matrix of a font with 1000 units per em.
    pub const DEFAULT: FontMatrix = FontMatrix([0.001, 0.0, 0.0, 0.001, 0.0, 0.0]);

    pub fn from_operands(operands: &[Operand]) -> Result<FontMatrix, ParseError> {
        match operands {
            [a, b, c, d, e, f] => Ok(FontMatrix([
                a.to_f64()?,
                b.to_f64()?,
                c.to_f64()?,
                d.to_f64()?,
                e.to_f64()?,
                f.to_f64()?,
            ])),
            _ => Err(ParseError::BadValue),
        }
    }

    pub fn is_default(&self) -> bool {
        *self == FontMatrix::DEFAULT
    }

    /// The matrix that applies `self` and then `outer`.
    pub fn concat(&self, outer: &FontMatrix) -> FontMatrix {
        let [a, b, c, d, e, f] = self.0;
        let [oa, ob, oc, od, oe, of] = outer.0;
        FontMatrix([
            a * oa + b * oc,
            a * ob + b * od,
            c * oa + d * oc,
            c * ob + d * od,
            e * oa + f * oc + oe,
            e * ob + f * od + of,
        ])
    }

    pub fn transform(&self, point: Vector2F) -> Vector2F {
        let [a, b, c, d, e, f] = self.0;
        let (x, y) = (f64::from(point.x()), f64::from(point.y()));
        vec2f((a * x + c * y + e) as f32, (b * x + d * y + f) as f32)
    }

    /// The units per em implied by the scale of this matrix.
    pub fn units_per_em(&self) -> u16 {
        let [a, b, c, d, _, _] = self.0;
        let scale = a.abs().max(b.abs()).max(c.abs()).max(d.abs());
        if scale == 0.0 {
            return DEFAULT_UNITS_PER_EM;
        }
        num::cast::<f64, u16>((1.0 / scale).round()).unwrap_or(DEFAULT_UNITS_PER_EM)
    }
}

impl Default for FontMatrix {
    fn default() -> Self {
        FontMatrix::DEFAULT
    }
}

fn lookup_offset_index(off_size: u8, offset_array: &[u8], index: usize) -> usize {
    let buf = &offset_array[index * usize::from(off_size)..];
    match off_size {
        1 => usize::from(buf[0]),
        2 => usize::from(BigEndian::read_u16(buf)),
        3 => usize::safe_from(BigEndian::read_u24(buf)),
        // off_size is validated to be 1..=4 on read
        _ => usize::safe_from(BigEndian::read_u32(buf)),
    }
}

pub(crate) fn read_encoding<'a>(
    scope: &ReadScope<'a>,
    top_dict: &TopDict,
) -> Result<Encoding<'a>, ParseError> {
    let offset = top_dict
        .get_i32(Operator::Encoding)
        .ok_or(ParseError::MissingValue)??;
    let encoding = match offset {
        0 => Encoding::Standard,
        1 => Encoding::Expert,
        _ => Encoding::Custom(
            scope
                .offset(usize::try_from(offset)?)
                .read::<CustomEncoding<'_>>()?,
        ),
    };

    Ok(encoding)
}

pub(crate) fn read_charset<'a>(
    scope: &ReadScope<'a>,
    top_dict: &TopDict,
    char_strings_count: usize,
) -> Result<Charset<'a>, ParseError> {
    let offset = top_dict
        .get_i32(Operator::Charset)
        .ok_or(ParseError::MissingValue)??;
    let charset = match offset {
        0 => Charset::ISOAdobe,
        1 => Charset::Expert,
        2 => Charset::ExpertSubset,
        _ => Charset::Custom(
            scope
                .offset(usize::try_from(offset)?)
                .read_dep::<CustomCharset<'_>>(char_strings_count)?,
        ),
    };

    Ok(charset)
}

pub(crate) fn read_local_subr_index<'a, T: DictDefault>(
    scope: &ReadScope<'a>,
    private_dict: &Dict<T>,
    private_dict_offset: usize,
    format: IndexFormat,
) -> Result<Option<Index<'a>>, ParseError> {
    // Local subrs are stored in an INDEX structure which is located via the offset operand
    // of the Subrs operator in the Private DICT. A font without local subrs has no Subrs
    // operator in the Private DICT. The local subrs offset is relative to the beginning of
    // the Private DICT data.
    private_dict
        .get_i32(Operator::Subrs)
        .transpose()?
        .map(|offset| {
            let offset = usize::try_from(offset)?;
            scope
                .offset(private_dict_offset + offset)
                .read_dep::<Index<'_>>(format)
        })
        .transpose()
}
