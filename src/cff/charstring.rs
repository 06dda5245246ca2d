//! Interpretation of Type 2 charstrings.
//!
//! Refer to [Adobe Technical Note #5177](https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf)
//! for the CFF flavour and to the
//! [CFF2 charstring format](https://learn.microsoft.com/en-us/typography/opentype/spec/cff2charstr)
//! for the additions of variable fonts.

// Portions of this file derived from ttf-parser, licenced under Apache-2.0.
// https://github.com/RazrFalcon/ttf-parser/blob/439aaaebd50eb8aed66302e3c1b51fae047f85b2/src/tables/cff/charstring.rs

use std::convert::TryFrom;

use log::{debug, warn};
use num_traits as num;
use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::rect::{RectF, RectI};
use pathfinder_geometry::vector::{vec2f, vec2i, Vector2F};

use crate::binary::read::{ReadCtxt, ReadScope};
use crate::binary::{I16Be, U8};
use crate::cff::blend::{self, BlendValue, Blender, Scalars};
use crate::cff::strings::STANDARD_ENCODING;
use crate::cff::{cff2, subr_bias, CFFError, Charset, FontMatrix, Index};
use crate::error::ParseError;
use crate::outline::{BeginGlyph, CounterStrategy, GlyphInfo, OutlineSink, StemFlags};
use crate::tables::Fixed;
use crate::GlyphId;

mod argstack;

pub use argstack::ArgumentsStack;

// Limits according to the Adobe Technical Note #5177 Appendix B.
pub(crate) const MAX_ARGUMENTS_STACK_LEN: usize = 48;
const TRANSIENT_ARRAY_LEN: usize = 32;

pub(crate) const TWO_BYTE_OPERATOR_MARK: u8 = 12;

const DEFAULT_FLEX_DEPTH: f32 = 50.0;
const MAX_FLATTEN_DEPTH: u8 = 32;
const STEM3_TOLERANCE: f64 = 0.01;

/// Settings of a `Type2Interpreter`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Deepest nesting of subroutine calls and seac components.
    pub max_subr_depth: u8,
    /// Seed of the `random` operator.
    pub random_seed: i32,
    /// Skip unknown operators instead of failing.
    pub lenient: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_subr_depth: 10,
            random_seed: 1,
            lenient: false,
        }
    }
}

/// A value on the operand stack or in the transient array.
#[derive(Debug, Clone, PartialEq)]
pub enum StackValue {
    Int(i32),
    Fixed(Fixed),
    Real(f64),
    Blend(BlendValue),
}

/// Private DICT values of the Font DICT a glyph is interpreted with.
#[derive(Clone, Default)]
pub struct FontDictContext<'a> {
    pub local_subrs: Option<Index<'a>>,
    pub default_width_x: f64,
    pub nominal_width_x: f64,
    /// Matrix of a CID-keyed Font DICT, if it has one.
    pub font_matrix: Option<FontMatrix>,
    pub language_group: i32,
    /// Initial `vsindex` of CFF2 charstrings.
    pub vsindex: u16,
    pub blues: BlueZones,
}

/// Alignment zones and standard stems from a Private DICT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlueZones {
    pub blue_values: Vec<BlendValue>,
    pub other_blues: Vec<BlendValue>,
    pub family_blues: Vec<BlendValue>,
    pub family_other_blues: Vec<BlendValue>,
    pub stem_snap_h: Vec<BlendValue>,
    pub stem_snap_v: Vec<BlendValue>,
}

/// Everything a charstring may refer to.
///
/// `'f` is the lifetime of the borrows, `'a` that of the font data.
#[derive(Clone, Copy)]
pub struct FontContext<'f, 'a> {
    pub char_strings: &'f Index<'a>,
    pub global_subrs: &'f Index<'a>,
    /// Charset of a name-keyed font, used to find `seac` components.
    pub charset: Option<&'f Charset<'a>>,
    pub font_dict: &'f FontDictContext<'a>,
    pub blender: Option<Blender<'f>>,
    pub is_cff2: bool,
}

/// The advance width and bounding box of an interpreted glyph.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyphMetrics {
    pub width: f32,
    /// Bounds of the path, `None` for glyphs without one or when only the width was asked for.
    pub bbox: Option<RectI>,
}

/// Interprets the charstrings of a font, one glyph at a time.
///
/// The state of the `random` operator lives here so that it carries across glyphs.
#[derive(Debug)]
pub struct Type2Interpreter {
    config: InterpreterConfig,
    seed: i32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SeacPhase {
    None,
    Base,
    AccentPreMove,
    AccentPostMove,
}

#[derive(Debug, Copy, Clone)]
struct Stem {
    is_vertical: bool,
    edge0: f64,
    edge1: f64,
}

#[derive(Debug, Copy, Clone)]
struct BBox {
    x_min: f32,
    y_min: f32,
    x_max: f32,
    y_max: f32,
}

struct CharStringRunner<'f, 'a, S: OutlineSink> {
    font: &'f FontContext<'f, 'a>,
    config: &'f InterpreterConfig,
    seed: &'f mut i32,
    sink: &'f mut S,
    stack: ArgumentsStack<StackValue>,
    transient: Vec<Option<StackValue>>,
    x: BlendValue,
    y: BlendValue,
    last: Vector2F,
    bbox: BBox,
    has_move_to: bool,
    is_first_move_to: bool,
    width: Option<f64>,
    width_parsed: bool,
    width_only: bool,
    stopped: bool,
    seen_endchar: bool,
    /// Subroutine depth of the `endchar` that ended the glyph.
    endchar_depth: u8,
    stems: Vec<Stem>,
    counter_strategy: Option<CounterStrategy>,
    seac: SeacPhase,
    seac_offset: (f64, f64),
    vsindex: Option<u16>,
    seen_blend: bool,
    scalars: Option<(u16, usize, Scalars)>,
    accepts_hints: bool,
    vf_output: bool,
}

impl StackValue {
    pub fn to_f64(&self) -> f64 {
        match self {
            StackValue::Int(n) => f64::from(*n),
            StackValue::Fixed(n) => f64::from(*n),
            StackValue::Real(n) => *n,
            StackValue::Blend(value) => value.value,
        }
    }

    pub fn to_blend(&self) -> BlendValue {
        match self {
            StackValue::Blend(value) => value.clone(),
            _ => BlendValue::constant(self.to_f64()),
        }
    }

    /// The value as an integer, rounding halves away from zero.
    pub fn to_i32(&self) -> Option<i32> {
        match self {
            StackValue::Int(n) => Some(*n),
            StackValue::Fixed(n) => Some(n.round()),
            _ => num::cast::<f64, i32>(round_half_away(self.to_f64())),
        }
    }

    fn is_zero(&self) -> bool {
        self.to_f64() == 0.0
    }
}

fn round_half_away(value: f64) -> f64 {
    if value >= 0.0 {
        (value + 0.5).floor()
    } else {
        -(-value + 0.5).floor()
    }
}

impl GlyphMetrics {
    /// The bounding box mapped through `matrix`.
    pub fn transformed(&self, matrix: &FontMatrix) -> Option<RectF> {
        let rect = self.bbox?.to_f32();
        let corners = [
            rect.origin(),
            rect.upper_right(),
            rect.lower_left(),
            rect.lower_right(),
        ]
        .map(|corner| matrix.transform(corner));
        let min = corners.iter().fold(corners[0], |min, p| min.min(*p));
        let max = corners.iter().fold(corners[0], |max, p| max.max(*p));
        Some(RectF::from_points(min, max))
    }
}

impl Type2Interpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        Type2Interpreter {
            config,
            seed: initial_seed(config.random_seed),
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Interpret the charstring of `info.glyph_id`, delivering the outline to `sink`.
    ///
    /// Returns `None` when the sink chose to skip the glyph.
    pub fn interpret<S: OutlineSink>(
        &mut self,
        font: &FontContext<'_, '_>,
        info: &GlyphInfo,
        sink: &mut S,
    ) -> Result<Option<GlyphMetrics>, CFFError> {
        let width_only = match sink.begin_glyph(info) {
            BeginGlyph::Continue => false,
            BeginGlyph::WidthOnly => true,
            BeginGlyph::Skip => return Ok(None),
            BeginGlyph::Quit => return Err(CFFError::Quit),
            BeginGlyph::Fail => return Err(CFFError::SinkFailed),
        };
        let char_string = font.char_strings.read_object(usize::from(info.glyph_id))?;

        let mut runner = CharStringRunner::new(font, &self.config, &mut self.seed, sink, width_only);
        if font.is_cff2 {
            // CFF2 charstrings carry no width
            runner.width_parsed = true;
            runner.report_width(font.font_dict.default_width_x);
        }
        if !runner.stopped {
            runner.execute(char_string, 0)?;
        }
        let metrics = runner.finish()?;
        sink.end_glyph();
        Ok(Some(metrics))
    }
}

fn initial_seed(seed: i32) -> i32 {
    if (1..i32::MAX).contains(&seed) {
        seed
    } else {
        1
    }
}

/// Advance the Park-Miller generator in `seed`, returning a value in (0, 1].
fn next_random(seed: &mut i32) -> Fixed {
    const A: i32 = 48271;
    const M: i32 = i32::MAX;
    const Q: i32 = M / A;
    const R: i32 = M % A;

    let hi = *seed / Q;
    let lo = *seed % Q;
    let mut next = A * lo - R * hi;
    if next <= 0 {
        next += M;
    }
    *seed = next;
    Fixed::from_raw((next & 0xFFFF) + 1)
}

impl<'f, 'a, S: OutlineSink> CharStringRunner<'f, 'a, S> {
    fn new(
        font: &'f FontContext<'f, 'a>,
        config: &'f InterpreterConfig,
        seed: &'f mut i32,
        sink: &'f mut S,
        width_only: bool,
    ) -> Self {
        let max_len = if font.is_cff2 {
            cff2::MAX_OPERANDS
        } else {
            MAX_ARGUMENTS_STACK_LEN
        };
        let accepts_hints = sink.accepts_hints();
        let vf_output = font.blender.is_some() && sink.accepts_blend();
        CharStringRunner {
            font,
            config,
            seed,
            sink,
            stack: ArgumentsStack::new(max_len),
            transient: vec![None; TRANSIENT_ARRAY_LEN],
            x: BlendValue::constant(0.0),
            y: BlendValue::constant(0.0),
            last: Vector2F::zero(),
            bbox: BBox::new(),
            has_move_to: false,
            is_first_move_to: true,
            width: None,
            width_parsed: false,
            width_only,
            stopped: false,
            seen_endchar: false,
            endchar_depth: 0,
            stems: Vec::new(),
            counter_strategy: None,
            seac: SeacPhase::None,
            seac_offset: (0.0, 0.0),
            vsindex: None,
            seen_blend: false,
            scalars: None,
            accepts_hints,
            vf_output,
        }
    }

    fn done(&self) -> bool {
        self.stopped || self.seen_endchar
    }

    fn execute(&mut self, char_string: &[u8], depth: u8) -> Result<(), CFFError> {
        let mut s = ReadScope::new(char_string).ctxt();
        while s.bytes_available() {
            if self.done() {
                // An endchar in a subroutine also ends every caller
                if self.seen_endchar && self.endchar_depth == depth && !self.config.lenient {
                    return Err(CFFError::DataAfterEndChar);
                }
                debug!("ignoring data after the end of the charstring");
                break;
            }

            let op = s.read::<U8>()?;
            match op {
                0 | 2 | 9 | 13 | 17 => self.unknown_operator(u16::from(op))?,
                operator::HORIZONTAL_STEM
                | operator::VERTICAL_STEM
                | operator::HORIZONTAL_STEM_HINT_MASK
                | operator::VERTICAL_STEM_HINT_MASK => {
                    // If the stack length is uneven, then the first value is a `width`.
                    if self.parse_width(self.stack.len() % 2 == 1)? {
                        break;
                    }
                    let is_vertical =
                        op == operator::VERTICAL_STEM || op == operator::VERTICAL_STEM_HINT_MASK;
                    let hint_mask = op == operator::HORIZONTAL_STEM_HINT_MASK
                        || op == operator::VERTICAL_STEM_HINT_MASK;
                    self.add_stems(is_vertical, hint_mask)?;
                }
                operator::VERTICAL_MOVE_TO => {
                    if self.parse_width(self.stack.len() == 2)? {
                        break;
                    }
                    self.parse_move_to(false, true)?;
                }
                operator::LINE_TO => self.parse_line_to()?,
                operator::HORIZONTAL_LINE_TO => self.parse_alternating_line_to(true)?,
                operator::VERTICAL_LINE_TO => self.parse_alternating_line_to(false)?,
                operator::CURVE_TO => self.parse_curve_to()?,
                operator::CALL_LOCAL_SUBROUTINE => {
                    let font_dict = self.font.font_dict;
                    let subrs = font_dict
                        .local_subrs
                        .as_ref()
                        .ok_or(CFFError::NoLocalSubroutines)?;
                    self.call_subr(subrs, false, depth)?;
                }
                operator::RETURN => {
                    if self.font.is_cff2 {
                        self.unknown_operator(u16::from(op))?;
                    } else {
                        return Ok(());
                    }
                }
                operator::ENDCHAR => {
                    if self.font.is_cff2 {
                        self.unknown_operator(u16::from(op))?;
                    } else {
                        self.parse_endchar(depth)?;
                    }
                }
                operator::VS_INDEX => {
                    if self.font.is_cff2 {
                        self.parse_vsindex()?;
                    } else {
                        self.unknown_operator(u16::from(op))?;
                    }
                }
                operator::BLEND => {
                    if self.font.is_cff2 {
                        self.parse_blend()?;
                    } else {
                        self.unknown_operator(u16::from(op))?;
                    }
                }
                operator::HINT_MASK | operator::COUNTER_MASK => {
                    if self.parse_mask(&mut s, op == operator::COUNTER_MASK)? {
                        break;
                    }
                }
                operator::MOVE_TO => {
                    if self.parse_width(self.stack.len() == 3)? {
                        break;
                    }
                    self.parse_move_to(true, true)?;
                }
                operator::HORIZONTAL_MOVE_TO => {
                    if self.parse_width(self.stack.len() == 2)? {
                        break;
                    }
                    self.parse_move_to(true, false)?;
                }
                operator::CURVE_LINE => self.parse_curve_line()?,
                operator::LINE_CURVE => self.parse_line_curve()?,
                operator::VV_CURVE_TO => self.parse_vv_curve_to()?,
                operator::HH_CURVE_TO => self.parse_hh_curve_to()?,
                operator::SHORT_INT => {
                    let n = s.read::<I16Be>()?;
                    self.stack.push(StackValue::Int(i32::from(n)))?;
                }
                operator::CALL_GLOBAL_SUBROUTINE => {
                    let subrs = self.font.global_subrs;
                    self.call_subr(subrs, true, depth)?;
                }
                operator::VH_CURVE_TO => self.parse_hv_vh_curve_to(false)?,
                operator::HV_CURVE_TO => self.parse_hv_vh_curve_to(true)?,
                TWO_BYTE_OPERATOR_MARK => {
                    let op2 = s.read::<U8>()?;
                    self.execute_escape(op2)?;
                }
                32..=246 => {
                    self.stack.push(parse_int1(op))?;
                }
                247..=250 => {
                    self.stack.push(parse_int2(op, &mut s)?)?;
                }
                251..=254 => {
                    self.stack.push(parse_int3(op, &mut s)?)?;
                }
                operator::FIXED_16_16 => {
                    let n = s.read::<Fixed>()?;
                    self.stack.push(StackValue::Fixed(n))?;
                }
            }
        }

        Ok(())
    }

    fn execute_escape(&mut self, op: u8) -> Result<(), CFFError> {
        match op {
            operator::DOTSECTION => {
                // Deprecated, treated as a no-op
                self.stack.clear();
                Ok(())
            }
            operator::AND
            | operator::OR
            | operator::NOT
            | operator::ABS
            | operator::ADD
            | operator::SUB
            | operator::DIV
            | operator::NEG
            | operator::EQ
            | operator::DROP
            | operator::PUT
            | operator::GET
            | operator::IFELSE
            | operator::RANDOM
            | operator::MUL
            | operator::SQRT
            | operator::DUP
            | operator::EXCH
            | operator::INDEX
            | operator::ROLL => self.parse_arithmetic(op),
            operator::HFLEX => self.parse_hflex(),
            operator::FLEX => self.parse_flex(),
            operator::HFLEX1 => self.parse_hflex1(),
            operator::FLEX1 => self.parse_flex1(),
            _ => self.unknown_operator((u16::from(TWO_BYTE_OPERATOR_MARK) << 8) | u16::from(op)),
        }
    }

    fn unknown_operator(&mut self, opcode: u16) -> Result<(), CFFError> {
        let operands = self
            .stack
            .all()
            .iter()
            .map(StackValue::to_f64)
            .collect::<Vec<_>>();
        self.sink.generic_op(opcode, &operands);
        if self.config.lenient {
            warn!("skipping unknown charstring operator {}", opcode);
            self.stack.clear();
            Ok(())
        } else {
            Err(CFFError::InvalidOperator)
        }
    }

    fn finish(mut self) -> Result<GlyphMetrics, CFFError> {
        if !self.stopped {
            if self.font.is_cff2 {
                // The end of a CFF2 charstring ends the glyph
                self.close_path();
            } else if !self.seen_endchar {
                return Err(CFFError::MissingEndChar);
            }
        }

        let width = self.width.unwrap_or(self.font.font_dict.default_width_x);
        let bbox = if self.stopped {
            None
        } else {
            self.bbox.to_rect()?
        };
        Ok(GlyphMetrics {
            width: width as f32,
            bbox,
        })
    }

    /// Consume the width operand of the first stack clearing operator.
    ///
    /// Returns `true` when interpretation should stop because only the width was wanted.
    fn parse_width(&mut self, has_width: bool) -> Result<bool, CFFError> {
        if self.width_parsed {
            return Ok(false);
        }
        self.width_parsed = true;

        let font_dict = self.font.font_dict;
        let width = if has_width {
            let operand = self.stack.remove_bottom(1)?;
            font_dict.nominal_width_x + operand[0].to_f64()
        } else {
            font_dict.default_width_x
        };
        if self.seac == SeacPhase::None {
            self.report_width(width);
        }
        Ok(self.stopped)
    }

    fn report_width(&mut self, width: f64) {
        self.width = Some(width);
        self.sink.width(width as f32);
        if self.width_only {
            self.stopped = true;
        }
    }

    fn take_args(&mut self) -> Vec<BlendValue> {
        self.stack
            .pop_all()
            .iter()
            .map(StackValue::to_blend)
            .collect()
    }

    fn stem_flags(&self, hint_mask: bool, width: f64) -> StemFlags {
        let mut flags = StemFlags::empty();
        if hint_mask {
            flags |= StemFlags::HINT_MASK;
        }
        if width == -20.0 || width == -21.0 {
            flags |= StemFlags::GHOST;
        }
        if matches!(
            self.seac,
            SeacPhase::AccentPreMove | SeacPhase::AccentPostMove
        ) {
            flags |= StemFlags::ACCENT;
        }
        flags
    }

    fn add_stems(&mut self, is_vertical: bool, hint_mask: bool) -> Result<(), CFFError> {
        let args = self.take_args();
        if args.len() % 2 != 0 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        let offset = if is_vertical {
            self.seac_offset.0
        } else {
            self.seac_offset.1
        };
        // Edges are relative to the previous edge of the same operator
        let mut edge = BlendValue::constant(offset);
        for pair in args.chunks_exact(2) {
            let edge0 = edge.add(&pair[0]);
            let edge1 = edge0.add(&pair[1]);
            let flags = self.stem_flags(hint_mask, pair[1].value);
            self.stems.push(Stem {
                is_vertical,
                edge0: edge0.value,
                edge1: edge1.value,
            });
            if self.accepts_hints {
                if self.vf_output {
                    self.sink.stem_vf(is_vertical, &edge0, &edge1, flags);
                } else {
                    self.sink
                        .stem_hint(is_vertical, edge0.value as f32, edge1.value as f32, flags);
                }
            }
            edge = edge1;
        }

        Ok(())
    }

    /// Returns `true` when interpretation should stop because only the width was wanted.
    fn parse_mask(&mut self, s: &mut ReadCtxt<'_>, is_counter: bool) -> Result<bool, CFFError> {
        if self.parse_width(self.stack.len() % 2 == 1)? {
            return Ok(true);
        }
        // Operands before a mask are an implied vstem
        if !self.stack.is_empty() {
            self.add_stems(true, true)?;
        }

        let len = (self.stems.len() + 7) / 8;
        let mut mask = s.read_slice(len).map_err(ParseError::from)?.to_vec();
        let unused = len * 8 - self.stems.len();
        if let Some(last) = mask.last_mut() {
            let keep = 0xFFu8 << unused;
            if *last & !keep != 0 {
                debug!("clearing unused bits of hint mask");
                *last &= keep;
            }
        }

        if is_counter && self.counter_strategy.is_none() {
            let strategy = if self.font.font_dict.language_group == 1 || is_stem3(&self.stems) {
                CounterStrategy::GlobalColoring
            } else {
                CounterStrategy::HintSubstitution
            };
            self.counter_strategy = Some(strategy);
            if self.accepts_hints {
                self.sink.counter_strategy(strategy);
            }
        }
        if self.accepts_hints {
            self.sink.hint_mask(is_counter, &mask);
        }

        Ok(false)
    }

    fn call_subr(&mut self, subrs: &Index<'_>, global: bool, depth: u8) -> Result<(), CFFError> {
        if depth >= self.config.max_subr_depth {
            return Err(CFFError::NestingLimitReached);
        }

        let index = self
            .stack
            .pop()?
            .to_i32()
            .and_then(|index| index.checked_add(subr_bias(subrs.len())))
            .and_then(|index| usize::try_from(index).ok())
            .ok_or(CFFError::InvalidSubroutineIndex { global })?;
        let char_string = subrs
            .read_object(index)
            .map_err(|_| CFFError::InvalidSubroutineIndex { global })?;
        self.execute(char_string, depth + 1)
    }

    fn parse_endchar(&mut self, depth: u8) -> Result<(), CFFError> {
        let len = self.stack.len();
        if self.parse_width(len == 1 || len == 5)? {
            return Ok(());
        }

        match self.stack.len() {
            0 => {}
            4 => self.parse_seac(depth)?,
            _ => return Err(CFFError::InvalidArgumentsStackLength),
        }

        self.close_path();
        self.seen_endchar = true;
        self.endchar_depth = depth;
        Ok(())
    }

    fn parse_seac(&mut self, depth: u8) -> Result<(), CFFError> {
        // adx ady bchar achar
        let args = self.stack.pop_all();
        let (adx, ady) = (args[0].to_f64(), args[1].to_f64());
        let base_code = seac_code(&args[2])?;
        let accent_code = seac_code(&args[3])?;

        if depth >= self.config.max_subr_depth {
            return Err(CFFError::NestingLimitReached);
        }
        let charset = self.font.charset.ok_or(CFFError::BadSeacComponent)?;
        let char_strings = self.font.char_strings;
        let base = seac_glyph(charset, base_code)
            .and_then(|glyph_id| char_strings.read_object(usize::from(glyph_id)).ok())
            .ok_or(CFFError::BadSeacComponent)?;
        let accent = seac_glyph(charset, accent_code)
            .and_then(|glyph_id| char_strings.read_object(usize::from(glyph_id)).ok())
            .ok_or(CFFError::BadSeacComponent)?;

        self.sink
            .seac(adx as f32, ady as f32, base_code, accent_code);

        self.begin_component(SeacPhase::Base, (0.0, 0.0));
        self.execute(base, depth + 1)?;
        self.begin_component(SeacPhase::AccentPreMove, (adx, ady));
        self.execute(accent, depth + 1)?;

        self.seac = SeacPhase::None;
        self.seac_offset = (0.0, 0.0);
        Ok(())
    }

    fn begin_component(&mut self, phase: SeacPhase, offset: (f64, f64)) {
        self.close_path();
        self.seac = phase;
        self.seac_offset = offset;
        self.stack.clear();
        self.stems.clear();
        self.width_parsed = false;
        self.seen_endchar = false;
        self.has_move_to = false;
        self.is_first_move_to = true;
        self.x = BlendValue::constant(offset.0);
        self.y = BlendValue::constant(offset.1);
    }

    fn parse_vsindex(&mut self) -> Result<(), CFFError> {
        if self.vsindex.is_some() || self.seen_blend {
            return Err(CFFError::DuplicateVsIndex);
        }
        if self.stack.len() != 1 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }
        let vsindex = self
            .stack
            .pop()?
            .to_i32()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or(CFFError::InvalidArgumentsStackLength)?;
        self.vsindex = Some(vsindex);
        Ok(())
    }

    fn region_scalars(&mut self, blender: &Blender<'_>) -> Result<(usize, Scalars), CFFError> {
        let vsindex = self.vsindex.unwrap_or(self.font.font_dict.vsindex);
        match &self.scalars {
            Some((cached, region_count, scalars)) if *cached == vsindex => {
                Ok((*region_count, scalars.clone()))
            }
            _ => {
                let region_count = blender.region_count(vsindex)?;
                let scalars = blender.scalars(vsindex)?;
                self.scalars = Some((vsindex, region_count, scalars.clone()));
                Ok((region_count, scalars))
            }
        }
    }

    fn parse_blend(&mut self) -> Result<(), CFFError> {
        let blender = self.font.blender.ok_or(CFFError::MissingVariationStore)?;
        self.seen_blend = true;
        let (region_count, scalars) = self.region_scalars(&blender)?;

        let operands = self
            .stack
            .all()
            .iter()
            .map(StackValue::to_f64)
            .collect::<Vec<_>>();
        let values = blend::blend_operands(&operands, region_count, &scalars)
            .map_err(|_| CFFError::InvalidArgumentsStackLength)?;
        self.stack.pop_n(values.len() * (region_count + 1) + 1)?;
        for value in values {
            self.stack.push(StackValue::Blend(value))?;
        }
        Ok(())
    }

    fn parse_arithmetic(&mut self, op: u8) -> Result<(), CFFError> {
        match op {
            operator::AND => {
                let (a, b) = self.pop2()?;
                self.push_bool(!a.is_zero() && !b.is_zero())
            }
            operator::OR => {
                let (a, b) = self.pop2()?;
                self.push_bool(!a.is_zero() || !b.is_zero())
            }
            operator::NOT => {
                let a = self.stack.pop()?;
                self.push_bool(a.is_zero())
            }
            operator::EQ => {
                let (a, b) = self.pop2()?;
                self.push_bool(a.to_f64() == b.to_f64())
            }
            operator::ABS => {
                let value = match self.stack.pop()? {
                    StackValue::Int(n) => n
                        .checked_abs()
                        .map(StackValue::Int)
                        .unwrap_or_else(|| StackValue::Real(f64::from(n).abs())),
                    other => StackValue::Real(other.to_f64().abs()),
                };
                self.stack.push(value)
            }
            operator::NEG => {
                let value = match self.stack.pop()? {
                    StackValue::Int(n) => n
                        .checked_neg()
                        .map(StackValue::Int)
                        .unwrap_or_else(|| StackValue::Real(-f64::from(n))),
                    other => StackValue::Real(-other.to_f64()),
                };
                self.stack.push(value)
            }
            operator::ADD => {
                let (a, b) = self.pop2()?;
                self.stack
                    .push(int_op(&a, &b, i32::checked_add, |a, b| a + b))
            }
            operator::SUB => {
                let (a, b) = self.pop2()?;
                self.stack
                    .push(int_op(&a, &b, i32::checked_sub, |a, b| a - b))
            }
            operator::MUL => {
                let (a, b) = self.pop2()?;
                self.stack
                    .push(int_op(&a, &b, i32::checked_mul, |a, b| a * b))
            }
            operator::DIV => {
                let (a, b) = self.pop2()?;
                if b.is_zero() {
                    return Err(CFFError::DivideByZero);
                }
                let exact = |a: i32, b: i32| {
                    if a.checked_rem(b)? == 0 {
                        a.checked_div(b)
                    } else {
                        None
                    }
                };
                self.stack.push(int_op(&a, &b, exact, |a, b| a / b))
            }
            operator::SQRT => {
                let a = self.stack.pop()?.to_f64();
                if a < 0.0 {
                    return Err(CFFError::SqrtDomain);
                }
                self.stack.push(StackValue::Real(a.sqrt()))
            }
            operator::DROP => self.stack.pop().map(drop),
            operator::DUP => {
                let top = self.top()?.clone();
                self.stack.push(top)
            }
            operator::EXCH => {
                let (a, b) = self.pop2()?;
                self.stack.push(b)?;
                self.stack.push(a)
            }
            operator::PUT => {
                let index = self.stack.pop()?;
                let value = self.stack.pop()?;
                let slot = transient_index(&index)
                    .and_then(|i| self.transient.get_mut(i))
                    .ok_or(CFFError::PutBounds)?;
                *slot = Some(value);
                Ok(())
            }
            operator::GET => {
                let index = self.stack.pop()?;
                let value = transient_index(&index)
                    .and_then(|i| self.transient.get(i))
                    .ok_or(CFFError::GetBounds)?
                    .clone()
                    .unwrap_or(StackValue::Int(0));
                self.stack.push(value)
            }
            operator::IFELSE => {
                // s1 s2 v1 v2 ifelse
                let v2 = self.stack.pop()?;
                let v1 = self.stack.pop()?;
                let (s1, s2) = self.pop2()?;
                self.stack
                    .push(if v1.to_f64() <= v2.to_f64() { s1 } else { s2 })
            }
            operator::RANDOM => {
                let value = next_random(self.seed);
                self.stack.push(StackValue::Fixed(value))
            }
            operator::INDEX => {
                let i = self.stack.pop()?.to_i32().ok_or(CFFError::IndexBounds)?;
                let len = self.stack.len();
                // A negative index copies the top element
                let i = usize::try_from(i.max(0)).map_err(|_| CFFError::IndexBounds)?;
                if i >= len {
                    return Err(CFFError::IndexBounds);
                }
                let value = self.stack.at(len - 1 - i)?.clone();
                self.stack.push(value)
            }
            operator::ROLL => {
                let j = self.stack.pop()?.to_i32().ok_or(CFFError::RollBounds)?;
                let n = self.stack.pop()?.to_i32().ok_or(CFFError::RollBounds)?;
                let len = self.stack.len();
                let n = usize::try_from(n).map_err(|_| CFFError::RollBounds)?;
                if n > len {
                    return Err(CFFError::RollBounds);
                }
                if n == 0 {
                    return Ok(());
                }
                let shift = usize::try_from(j.rem_euclid(n as i32)).map_err(|_| CFFError::RollBounds)?;
                self.stack.all_mut()[len - n..].rotate_right(shift);
                Ok(())
            }
            _ => Err(CFFError::InvalidOperator),
        }
    }

    /// Pop the top two values, returning them in stack order.
    fn pop2(&mut self) -> Result<(StackValue, StackValue), CFFError> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        Ok((a, b))
    }

    fn top(&self) -> Result<&StackValue, CFFError> {
        let len = self.stack.len();
        if len == 0 {
            return Err(CFFError::StackUnderflow);
        }
        self.stack.at(len - 1)
    }

    fn push_bool(&mut self, value: bool) -> Result<(), CFFError> {
        self.stack.push(StackValue::Int(i32::from(value)))
    }

    fn check_move_to(&self) -> Result<(), CFFError> {
        if self.has_move_to {
            Ok(())
        } else {
            Err(CFFError::MissingMoveTo)
        }
    }

    fn close_path(&mut self) {
        if !self.is_first_move_to {
            self.is_first_move_to = true;
            self.sink.close();
        }
    }

    fn emit_move(&mut self) {
        let to = point(&self.x, &self.y);
        self.bbox.extend_by(to);
        self.last = to;
        if self.vf_output {
            self.sink.move_to_vf(&self.x, &self.y);
        } else {
            self.sink.move_to(to);
        }
    }

    fn emit_line(&mut self) {
        let to = point(&self.x, &self.y);
        self.bbox.extend_by(to);
        self.last = to;
        if self.vf_output {
            self.sink.line_to_vf(&self.x, &self.y);
        } else {
            self.sink.line_to(to);
        }
    }

    /// Emit a curve from the current point, ending at `self.x`, `self.y`.
    fn emit_curve(&mut self, x1: BlendValue, y1: BlendValue, x2: BlendValue, y2: BlendValue) {
        let ctrl1 = point(&x1, &y1);
        let ctrl2 = point(&x2, &y2);
        let to = point(&self.x, &self.y);
        self.bbox.extend_by_curve(self.last, ctrl1, ctrl2, to, 0);
        self.last = to;
        if self.vf_output {
            self.sink
                .curve_to_vf(&[x1, y1, x2, y2, self.x.clone(), self.y.clone()]);
        } else {
            self.sink
                .cubic_curve_to(LineSegment2F::new(ctrl1, ctrl2), to);
        }
    }

    /// Emit a curve relative to the current point.
    fn rel_curve(
        &mut self,
        dxa: &BlendValue,
        dya: &BlendValue,
        dxb: &BlendValue,
        dyb: &BlendValue,
        dxc: &BlendValue,
        dyc: &BlendValue,
    ) {
        let x1 = self.x.add(dxa);
        let y1 = self.y.add(dya);
        let x2 = x1.add(dxb);
        let y2 = y1.add(dyb);
        self.x = x2.add(dxc);
        self.y = y2.add(dyc);
        self.emit_curve(x1, y1, x2, y2);
    }

    /// Emit the two curves of a flex ending at `self.x`, `self.y`.
    fn emit_flex(&mut self, depth: f32, points: [(BlendValue, BlendValue); 5]) {
        let [(x1, y1), (x2, y2), (x3, y3), (x4, y4), (x5, y5)] = points;
        let flex = [
            point(&x1, &y1),
            point(&x2, &y2),
            point(&x3, &y3),
            point(&x4, &y4),
            point(&x5, &y5),
            point(&self.x, &self.y),
        ];
        self.bbox
            .extend_by_curve(self.last, flex[0], flex[1], flex[2], 0);
        self.bbox
            .extend_by_curve(flex[2], flex[3], flex[4], flex[5], 0);
        self.last = flex[5];
        if self.vf_output {
            self.sink.curve_to_vf(&[x1, y1, x2, y2, x3, y3]);
            self.sink
                .curve_to_vf(&[x4, y4, x5, y5, self.x.clone(), self.y.clone()]);
        } else {
            self.sink.flex_hint(depth, flex);
        }
    }

    fn parse_move_to(&mut self, has_dx: bool, has_dy: bool) -> Result<(), CFFError> {
        // rmoveto: dx1 dy1
        // hmoveto: dx1
        // vmoveto: dy1
        let args = self.take_args();
        let expected = usize::from(has_dx) + usize::from(has_dy);
        if args.len() != expected {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        self.close_path();
        self.is_first_move_to = false;
        self.has_move_to = true;
        if self.seac == SeacPhase::AccentPreMove {
            self.seac = SeacPhase::AccentPostMove;
        }

        let mut args = args.iter();
        if has_dx {
            if let Some(dx) = args.next() {
                self.x = self.x.add(dx);
            }
        }
        if has_dy {
            if let Some(dy) = args.next() {
                self.y = self.y.add(dy);
            }
        }
        self.emit_move();
        Ok(())
    }

    fn parse_line_to(&mut self) -> Result<(), CFFError> {
        // {dxa dya}+
        self.check_move_to()?;
        let args = self.take_args();
        if args.len() % 2 != 0 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        for pair in args.chunks_exact(2) {
            self.x = self.x.add(&pair[0]);
            self.y = self.y.add(&pair[1]);
            self.emit_line();
        }
        Ok(())
    }

    fn parse_alternating_line_to(&mut self, horizontal_first: bool) -> Result<(), CFFError> {
        // hlineto: dx1 {dya dxb}*  or {dxa dyb}+
        // vlineto: dy1 {dxa dyb}*  or {dya dxb}+
        self.check_move_to()?;
        let args = self.take_args();
        if args.is_empty() {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        let mut horizontal = horizontal_first;
        for delta in &args {
            if horizontal {
                self.x = self.x.add(delta);
            } else {
                self.y = self.y.add(delta);
            }
            self.emit_line();
            horizontal = !horizontal;
        }
        Ok(())
    }

    fn parse_curve_to(&mut self) -> Result<(), CFFError> {
        // {dxa dya dxb dyb dxc dyc}+
        self.check_move_to()?;
        let args = self.take_args();
        if args.len() % 6 != 0 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        for c in args.chunks_exact(6) {
            self.rel_curve(&c[0], &c[1], &c[2], &c[3], &c[4], &c[5]);
        }
        Ok(())
    }

    fn parse_curve_line(&mut self) -> Result<(), CFFError> {
        // {dxa dya dxb dyb dxc dyc}+ dxd dyd
        self.check_move_to()?;
        let args = self.take_args();
        if args.len() < 8 || (args.len() - 2) % 6 != 0 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        let (curves, line) = args.split_at(args.len() - 2);
        for c in curves.chunks_exact(6) {
            self.rel_curve(&c[0], &c[1], &c[2], &c[3], &c[4], &c[5]);
        }
        self.x = self.x.add(&line[0]);
        self.y = self.y.add(&line[1]);
        self.emit_line();
        Ok(())
    }

    fn parse_line_curve(&mut self) -> Result<(), CFFError> {
        // {dxa dya}+ dxb dyb dxc dyc dxd dyd
        self.check_move_to()?;
        let args = self.take_args();
        if args.len() < 8 || (args.len() - 6) % 2 != 0 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        let (lines, c) = args.split_at(args.len() - 6);
        for pair in lines.chunks_exact(2) {
            self.x = self.x.add(&pair[0]);
            self.y = self.y.add(&pair[1]);
            self.emit_line();
        }
        self.rel_curve(&c[0], &c[1], &c[2], &c[3], &c[4], &c[5]);
        Ok(())
    }

    fn parse_hh_curve_to(&mut self) -> Result<(), CFFError> {
        // dy1? {dxa dxb dyb dxc}+
        self.check_move_to()?;
        let args = self.take_args();
        let zero = BlendValue::constant(0.0);

        // The odd argument count indicates an Y position.
        let (first_dy, curves) = if args.len() % 2 == 1 {
            (Some(&args[0]), &args[1..])
        } else {
            (None, &args[..])
        };
        if curves.is_empty() || curves.len() % 4 != 0 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        for (i, c) in curves.chunks_exact(4).enumerate() {
            let dya = first_dy.filter(|_| i == 0).unwrap_or(&zero);
            self.rel_curve(&c[0], dya, &c[1], &c[2], &c[3], &zero);
        }
        Ok(())
    }

    fn parse_vv_curve_to(&mut self) -> Result<(), CFFError> {
        // dx1? {dya dxb dyb dyc}+
        self.check_move_to()?;
        let args = self.take_args();
        let zero = BlendValue::constant(0.0);

        // The odd argument count indicates an X position.
        let (first_dx, curves) = if args.len() % 2 == 1 {
            (Some(&args[0]), &args[1..])
        } else {
            (None, &args[..])
        };
        if curves.is_empty() || curves.len() % 4 != 0 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        for (i, c) in curves.chunks_exact(4).enumerate() {
            let dxa = first_dx.filter(|_| i == 0).unwrap_or(&zero);
            self.rel_curve(dxa, &c[0], &c[1], &c[2], &zero, &c[3]);
        }
        Ok(())
    }

    fn parse_hv_vh_curve_to(&mut self, horizontal_first: bool) -> Result<(), CFFError> {
        // hvcurveto: dx1 dx2 dy2 dy3 {dya dxb dyb dxc dxd dxe dye dyf}* dxf?
        //                            {dxa dxb dyb dyc dyd dxe dye dxf}+ dyf?
        // vhcurveto: dy1 dx2 dy2 dx3 {dxa dxb dyb dyc dyd dxe dye dxf}* dyf?
        //                            {dya dxb dyb dxc dxd dxe dye dyf}+ dxf?
        self.check_move_to()?;
        let args = self.take_args();
        if args.len() < 4 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }
        let zero = BlendValue::constant(0.0);

        let mut horizontal = horizontal_first;
        let mut i = 0;
        while i < args.len() {
            let remaining = args.len() - i;
            if remaining < 4 {
                return Err(CFFError::InvalidArgumentsStackLength);
            }
            // A single trailing operand moves the end point off the axis
            let last = if remaining == 5 { &args[i + 4] } else { &zero };
            let c = &args[i..i + 4];
            if horizontal {
                self.rel_curve(&c[0], &zero, &c[1], &c[2], last, &c[3]);
            } else {
                self.rel_curve(&zero, &c[0], &c[1], &c[2], &c[3], last);
            }
            i += if remaining == 5 { 5 } else { 4 };
            horizontal = !horizontal;
        }
        Ok(())
    }

    /// The five intermediate points of a flex from the first ten deltas in `d`.
    fn flex_points(&self, d: &[BlendValue]) -> [(BlendValue, BlendValue); 5] {
        let x1 = self.x.add(&d[0]);
        let y1 = self.y.add(&d[1]);
        let x2 = x1.add(&d[2]);
        let y2 = y1.add(&d[3]);
        let x3 = x2.add(&d[4]);
        let y3 = y2.add(&d[5]);
        let x4 = x3.add(&d[6]);
        let y4 = y3.add(&d[7]);
        let x5 = x4.add(&d[8]);
        let y5 = y4.add(&d[9]);
        [(x1, y1), (x2, y2), (x3, y3), (x4, y4), (x5, y5)]
    }

    fn parse_flex(&mut self) -> Result<(), CFFError> {
        // dx1 dy1 dx2 dy2 dx3 dy3 dx4 dy4 dx5 dy5 dx6 dy6 fd
        self.check_move_to()?;
        let args = self.take_args();
        if args.len() != 13 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        let points = self.flex_points(&args);
        let (x5, y5) = &points[4];
        self.x = x5.add(&args[10]);
        self.y = y5.add(&args[11]);
        self.emit_flex(args[12].value as f32, points);
        Ok(())
    }

    fn parse_flex1(&mut self) -> Result<(), CFFError> {
        // dx1 dy1 dx2 dy2 dx3 dy3 dx4 dy4 dx5 dy5 d6
        self.check_move_to()?;
        let args = self.take_args();
        if args.len() != 11 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        let points = self.flex_points(&args);
        let (x5, y5) = &points[4];
        // The last operand goes to the dominant axis, the other returns to the start
        if (x5.value - self.x.value).abs() > (y5.value - self.y.value).abs() {
            self.x = x5.add(&args[10]);
        } else {
            self.y = y5.add(&args[10]);
        }
        self.emit_flex(DEFAULT_FLEX_DEPTH, points);
        Ok(())
    }

    fn parse_hflex(&mut self) -> Result<(), CFFError> {
        // dx1 dx2 dy2 dx3 dx4 dx5 dx6
        self.check_move_to()?;
        let args = self.take_args();
        if args.len() != 7 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        let x1 = self.x.add(&args[0]);
        let y1 = self.y.clone();
        let x2 = x1.add(&args[1]);
        let y2 = y1.add(&args[2]);
        let x3 = x2.add(&args[3]);
        let y3 = y2.clone();
        let x4 = x3.add(&args[4]);
        let y4 = y2.clone();
        let x5 = x4.add(&args[5]);
        let y5 = self.y.clone();
        self.x = x5.add(&args[6]);
        self.emit_flex(
            DEFAULT_FLEX_DEPTH,
            [(x1, y1), (x2, y2), (x3, y3), (x4, y4), (x5, y5)],
        );
        Ok(())
    }

    fn parse_hflex1(&mut self) -> Result<(), CFFError> {
        // dx1 dy1 dx2 dy2 dx3 dx4 dx5 dy5 dx6
        self.check_move_to()?;
        let args = self.take_args();
        if args.len() != 9 {
            return Err(CFFError::InvalidArgumentsStackLength);
        }

        let x1 = self.x.add(&args[0]);
        let y1 = self.y.add(&args[1]);
        let x2 = x1.add(&args[2]);
        let y2 = y1.add(&args[3]);
        let x3 = x2.add(&args[4]);
        let y3 = y2.clone();
        let x4 = x3.add(&args[5]);
        let y4 = y2.clone();
        let x5 = x4.add(&args[6]);
        let y5 = y4.add(&args[7]);
        self.x = x5.add(&args[8]);
        self.emit_flex(
            DEFAULT_FLEX_DEPTH,
            [(x1, y1), (x2, y2), (x3, y3), (x4, y4), (x5, y5)],
        );
        Ok(())
    }
}

fn point(x: &BlendValue, y: &BlendValue) -> Vector2F {
    vec2f(x.value as f32, y.value as f32)
}

/// Apply an integer operation when both operands are integers and the result fits, otherwise a
/// real one.
fn int_op(
    a: &StackValue,
    b: &StackValue,
    int: impl Fn(i32, i32) -> Option<i32>,
    real: impl Fn(f64, f64) -> f64,
) -> StackValue {
    match (a, b) {
        (StackValue::Int(a), StackValue::Int(b)) => int(*a, *b)
            .map(StackValue::Int)
            .unwrap_or_else(|| StackValue::Real(real(f64::from(*a), f64::from(*b)))),
        _ => StackValue::Real(real(a.to_f64(), b.to_f64())),
    }
}

fn transient_index(value: &StackValue) -> Option<usize> {
    value.to_i32().and_then(|i| usize::try_from(i).ok())
}

fn seac_code(value: &StackValue) -> Result<u8, CFFError> {
    value
        .to_i32()
        .and_then(|code| u8::try_from(code).ok())
        .ok_or(CFFError::InvalidSeacCode)
}

/// The glyph of a Standard Encoding code in a name-keyed font.
fn seac_glyph(charset: &Charset<'_>, code: u8) -> Option<GlyphId> {
    match STANDARD_ENCODING[usize::from(code)] {
        0 => None,
        sid => charset.sid_to_gid(sid),
    }
}

/// Three stems on one axis of equal width and evenly spaced.
fn is_stem3(stems: &[Stem]) -> bool {
    [false, true].iter().any(|&is_vertical| {
        let mut group = stems
            .iter()
            .filter(|stem| stem.is_vertical == is_vertical)
            .collect::<Vec<_>>();
        if group.len() != 3 {
            return false;
        }
        group.sort_by(|a, b| a.edge0.total_cmp(&b.edge0));
        let width = |stem: &Stem| stem.edge1 - stem.edge0;
        let middle = |stem: &Stem| (stem.edge0 + stem.edge1) / 2.0;
        let close = |a: f64, b: f64| (a - b).abs() < STEM3_TOLERANCE;
        close(width(group[0]), width(group[1]))
            && close(width(group[1]), width(group[2]))
            && close(
                middle(group[1]) - middle(group[0]),
                middle(group[2]) - middle(group[1]),
            )
    })
}

fn parse_int1(op: u8) -> StackValue {
    StackValue::Int(i32::from(op) - 139)
}

fn parse_int2(op: u8, s: &mut ReadCtxt<'_>) -> Result<StackValue, CFFError> {
    let b1 = s.read::<U8>()?;
    let n = (i32::from(op) - 247) * 256 + i32::from(b1) + 108;
    debug_assert!((108..=1131).contains(&n));
    Ok(StackValue::Int(n))
}

fn parse_int3(op: u8, s: &mut ReadCtxt<'_>) -> Result<StackValue, CFFError> {
    let b1 = s.read::<U8>()?;
    let n = -(i32::from(op) - 251) * 256 - i32::from(b1) - 108;
    debug_assert!((-1131..=-108).contains(&n));
    Ok(StackValue::Int(n))
}

impl BBox {
    fn new() -> BBox {
        BBox {
            x_min: f32::MAX,
            y_min: f32::MAX,
            x_max: f32::MIN,
            y_max: f32::MIN,
        }
    }

    fn is_default(&self) -> bool {
        self.x_min == f32::MAX
            && self.y_min == f32::MAX
            && self.x_max == f32::MIN
            && self.y_max == f32::MIN
    }

    fn extend_by(&mut self, p: Vector2F) {
        self.x_min = self.x_min.min(p.x());
        self.y_min = self.y_min.min(p.y());
        self.x_max = self.x_max.max(p.x());
        self.y_max = self.y_max.max(p.y());
    }

    /// Extend by the extent of a cubic curve.
    ///
    /// Curves with control points inside the box of their end points (give or take half a unit)
    /// contribute just the end points. Others are split in half until they do.
    fn extend_by_curve(&mut self, p0: Vector2F, p1: Vector2F, p2: Vector2F, p3: Vector2F, depth: u8) {
        let min = p0.min(p3) - vec2f(0.5, 0.5);
        let max = p0.max(p3) + vec2f(0.5, 0.5);
        let inside = |p: Vector2F| {
            p.x() >= min.x() && p.y() >= min.y() && p.x() <= max.x() && p.y() <= max.y()
        };

        if inside(p1) && inside(p2) {
            self.extend_by(p0);
            self.extend_by(p3);
        } else if depth >= MAX_FLATTEN_DEPTH {
            self.extend_by(p0);
            self.extend_by(p1);
            self.extend_by(p2);
            self.extend_by(p3);
        } else {
            let p01 = (p0 + p1) * 0.5;
            let p12 = (p1 + p2) * 0.5;
            let p23 = (p2 + p3) * 0.5;
            let p012 = (p01 + p12) * 0.5;
            let p123 = (p12 + p23) * 0.5;
            let mid = (p012 + p123) * 0.5;
            self.extend_by_curve(p0, p01, p012, mid, depth + 1);
            self.extend_by_curve(mid, p123, p23, p3, depth + 1);
        }
    }

    fn to_rect(&self) -> Result<Option<RectI>, CFFError> {
        if self.is_default() {
            return Ok(None);
        }

        let to_i16 = |value: f32| {
            num::cast::<f32, i16>(value)
                .map(i32::from)
                .ok_or(CFFError::BboxOverflow)
        };
        let min = vec2i(to_i16(self.x_min.floor())?, to_i16(self.y_min.floor())?);
        let max = vec2i(to_i16(self.x_max.ceil())?, to_i16(self.y_max.ceil())?);
        Ok(Some(RectI::from_points(min, max)))
    }
}

/// Operators defined in Adobe Technical Note #5177, The Type  2 Charstring Format.
pub(crate) mod operator {
    pub const HORIZONTAL_STEM: u8 = 1;
    pub const VERTICAL_STEM: u8 = 3;
    pub const VERTICAL_MOVE_TO: u8 = 4;
    pub const LINE_TO: u8 = 5;
    pub const HORIZONTAL_LINE_TO: u8 = 6;
    pub const VERTICAL_LINE_TO: u8 = 7;
    pub const CURVE_TO: u8 = 8;
    pub const CALL_LOCAL_SUBROUTINE: u8 = 10;
    pub const RETURN: u8 = 11;
    pub const ENDCHAR: u8 = 14;
    pub const VS_INDEX: u8 = 15; // CFF2
    pub const BLEND: u8 = 16; // CFF2
    pub const HORIZONTAL_STEM_HINT_MASK: u8 = 18;
    pub const HINT_MASK: u8 = 19;
    pub const COUNTER_MASK: u8 = 20;
    pub const MOVE_TO: u8 = 21;
    pub const HORIZONTAL_MOVE_TO: u8 = 22;
    pub const VERTICAL_STEM_HINT_MASK: u8 = 23;
    pub const CURVE_LINE: u8 = 24;
    pub const LINE_CURVE: u8 = 25;
    pub const VV_CURVE_TO: u8 = 26;
    pub const HH_CURVE_TO: u8 = 27;
    pub const SHORT_INT: u8 = 28;
    pub const CALL_GLOBAL_SUBROUTINE: u8 = 29;
    pub const VH_CURVE_TO: u8 = 30;
    pub const HV_CURVE_TO: u8 = 31;
    pub const FIXED_16_16: u8 = 255;

    // Two byte operators, following TWO_BYTE_OPERATOR_MARK
    pub const DOTSECTION: u8 = 0;
    pub const AND: u8 = 3;
    pub const OR: u8 = 4;
    pub const NOT: u8 = 5;
    pub const ABS: u8 = 9;
    pub const ADD: u8 = 10;
    pub const SUB: u8 = 11;
    pub const DIV: u8 = 12;
    pub const NEG: u8 = 14;
    pub const EQ: u8 = 15;
    pub const DROP: u8 = 18;
    pub const PUT: u8 = 20;
    pub const GET: u8 = 21;
    pub const IFELSE: u8 = 22;
    pub const RANDOM: u8 = 23;
    pub const MUL: u8 = 24;
    pub const SQRT: u8 = 26;
    pub const DUP: u8 = 27;
    pub const EXCH: u8 = 28;
    pub const INDEX: u8 = 29;
    pub const ROLL: u8 = 30;
    pub const HFLEX: u8 = 34;
    pub const FLEX: u8 = 35;
    pub const HFLEX1: u8 = 36;
    pub const FLEX1: u8 = 37;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cff::IndexFormat;
    use crate::tests::writer::{cff_index, charstring, Cs};
    use crate::tests::{assert_close, RecordingSink, SinkEvent};

    fn read_index(data: &[u8]) -> Index<'_> {
        ReadScope::new(data)
            .read_dep::<Index<'_>>(IndexFormat::Cff)
            .unwrap()
    }

    fn run_with(
        glyphs: &[Vec<u8>],
        global: &[Vec<u8>],
        local: Option<&[Vec<u8>]>,
        glyph_id: GlyphId,
        sink: &mut RecordingSink,
    ) -> Result<Option<GlyphMetrics>, CFFError> {
        let char_strings_data = cff_index(glyphs);
        let global_data = cff_index(global);
        let local_data = local.map(cff_index);
        let char_strings = read_index(&char_strings_data);
        let global_subrs = read_index(&global_data);
        let font_dict = FontDictContext {
            local_subrs: local_data
                .as_ref()
                .map(|data| read_index(data)),
            default_width_x: 500.0,
            nominal_width_x: 600.0,
            ..FontDictContext::default()
        };
        let charset = Charset::ISOAdobe;
        let font = FontContext {
            char_strings: &char_strings,
            global_subrs: &global_subrs,
            charset: Some(&charset),
            font_dict: &font_dict,
            blender: None,
            is_cff2: false,
        };
        let info = GlyphInfo {
            glyph_id,
            sid: None,
            cid: None,
            font_dict_index: None,
        };
        Type2Interpreter::new(InterpreterConfig::default()).interpret(&font, &info, sink)
    }

    fn run(char_string: &[Cs]) -> (Result<Option<GlyphMetrics>, CFFError>, RecordingSink) {
        let mut sink = RecordingSink::default();
        let result = run_with(&[charstring(char_string)], &[], None, 0, &mut sink);
        (result, sink)
    }

    /// Run `ops` followed by `endchar` and return the operand stack left at the first
    /// `generic_op` of an unknown operator.
    fn stack_after(ops: &[Cs]) -> Vec<f64> {
        let mut program = ops.to_vec();
        program.push(Cs::Op(0));
        let mut sink = RecordingSink::default();
        let result = run_with(&[charstring(&program)], &[], None, 0, &mut sink);
        assert_eq!(result, Err(CFFError::InvalidOperator));
        match sink.events.last() {
            Some(SinkEvent::GenericOp(0, operands)) => operands.clone(),
            other => panic!("expected generic op, got {:?}", other),
        }
    }

    #[test]
    fn square() {
        let (result, sink) = run(&[
            Cs::Int(0),
            Cs::Int(100),
            Cs::Op(operator::MOVE_TO),
            Cs::Int(500),
            Cs::Op(operator::HORIZONTAL_LINE_TO),
            Cs::Int(500),
            Cs::Op(operator::VERTICAL_LINE_TO),
            Cs::Int(-500),
            Cs::Op(operator::HORIZONTAL_LINE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        let metrics = result.unwrap().unwrap();
        assert_eq!(metrics.width, 500.0);
        assert_eq!(
            metrics.bbox,
            Some(RectI::from_points(vec2i(0, 100), vec2i(500, 600)))
        );
        assert_eq!(
            sink.events,
            vec![
                SinkEvent::BeginGlyph(0),
                SinkEvent::Width(500.0),
                SinkEvent::MoveTo(vec2f(0., 100.)),
                SinkEvent::LineTo(vec2f(500., 100.)),
                SinkEvent::LineTo(vec2f(500., 600.)),
                SinkEvent::LineTo(vec2f(0., 600.)),
                SinkEvent::Close,
                SinkEvent::EndGlyph,
            ]
        );
    }

    #[test]
    fn width_operand() {
        let (result, sink) = run(&[
            Cs::Int(-50),
            Cs::Int(10),
            Cs::Op(operator::HORIZONTAL_MOVE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        assert_eq!(result.unwrap().unwrap().width, 550.0);
        assert_eq!(sink.widths(), vec![550.0]);

        let (result, _) = run(&[Cs::Int(20), Cs::Op(operator::ENDCHAR)]);
        assert_eq!(result.unwrap().unwrap().width, 620.0);
    }

    #[test]
    fn width_only() {
        let mut sink = RecordingSink {
            begin: BeginGlyph::WidthOnly,
            ..RecordingSink::default()
        };
        let glyph = charstring(&[
            Cs::Int(10),
            Cs::Int(0),
            Cs::Int(100),
            Cs::Op(operator::MOVE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        let metrics = run_with(&[glyph], &[], None, 0, &mut sink).unwrap().unwrap();
        assert_eq!(metrics.width, 610.0);
        assert_eq!(metrics.bbox, None);
        assert_eq!(
            sink.events,
            vec![
                SinkEvent::BeginGlyph(0),
                SinkEvent::Width(610.0),
                SinkEvent::EndGlyph
            ]
        );
    }

    #[test]
    fn skip_glyph() {
        let mut sink = RecordingSink {
            begin: BeginGlyph::Skip,
            ..RecordingSink::default()
        };
        let glyph = charstring(&[Cs::Op(operator::ENDCHAR)]);
        assert_eq!(run_with(&[glyph.clone()], &[], None, 0, &mut sink), Ok(None));

        let mut sink = RecordingSink {
            begin: BeginGlyph::Quit,
            ..RecordingSink::default()
        };
        assert_eq!(
            run_with(&[glyph], &[], None, 0, &mut sink),
            Err(CFFError::Quit)
        );
    }

    #[test]
    fn stack_discipline() {
        let mut ops = (0..48).map(Cs::Int).collect::<Vec<_>>();
        ops.push(Cs::Int(1));
        let (result, _) = run(&ops);
        assert_eq!(result, Err(CFFError::ArgumentsStackLimitReached));

        let (result, _) = run(&[Cs::Op(operator::CALL_GLOBAL_SUBROUTINE)]);
        assert_eq!(result, Err(CFFError::StackUnderflow));
    }

    #[test]
    fn hv_curve_to_parity() {
        let prefix = [Cs::Int(0), Cs::Int(0), Cs::Op(operator::MOVE_TO)];

        // Four operands: the curve ends on the vertical tangent
        let mut ops = prefix.to_vec();
        ops.extend([
            Cs::Int(10),
            Cs::Int(20),
            Cs::Int(30),
            Cs::Int(40),
            Cs::Op(operator::HV_CURVE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        let (result, sink) = run(&ops);
        assert!(result.is_ok());
        assert_eq!(
            sink.curves(),
            vec![(vec2f(10., 0.), vec2f(30., 30.), vec2f(30., 70.))]
        );

        // A fifth operand moves the end point along x
        let mut ops = prefix.to_vec();
        ops.extend([
            Cs::Int(10),
            Cs::Int(20),
            Cs::Int(30),
            Cs::Int(40),
            Cs::Int(5),
            Cs::Op(operator::HV_CURVE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        let (_, sink) = run(&ops);
        assert_eq!(
            sink.curves(),
            vec![(vec2f(10., 0.), vec2f(30., 30.), vec2f(35., 70.))]
        );

        let mut ops = prefix.to_vec();
        ops.extend([
            Cs::Int(10),
            Cs::Int(20),
            Cs::Int(30),
            Cs::Int(40),
            Cs::Int(5),
            Cs::Op(operator::VH_CURVE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        let (_, sink) = run(&ops);
        assert_eq!(
            sink.curves(),
            vec![(vec2f(0., 10.), vec2f(20., 40.), vec2f(60., 45.))]
        );

        // Six operands are neither form
        let mut ops = prefix.to_vec();
        ops.extend((1..=6).map(Cs::Int));
        ops.push(Cs::Op(operator::HV_CURVE_TO));
        let (result, _) = run(&ops);
        assert_eq!(result, Err(CFFError::InvalidArgumentsStackLength));
    }

    #[test]
    fn alternating_hv_curves() {
        let (_, sink) = run(&[
            Cs::Int(0),
            Cs::Int(0),
            Cs::Op(operator::MOVE_TO),
            Cs::Int(10),
            Cs::Int(10),
            Cs::Int(10),
            Cs::Int(10),
            Cs::Int(10),
            Cs::Int(10),
            Cs::Int(10),
            Cs::Int(10),
            Cs::Op(operator::HV_CURVE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        assert_eq!(
            sink.curves(),
            vec![
                (vec2f(10., 0.), vec2f(20., 10.), vec2f(20., 20.)),
                (vec2f(20., 30.), vec2f(30., 40.), vec2f(40., 40.)),
            ]
        );
    }

    #[test]
    fn missing_move_to() {
        let (result, _) = run(&[
            Cs::Int(10),
            Cs::Int(10),
            Cs::Op(operator::LINE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        assert_eq!(result, Err(CFFError::MissingMoveTo));
    }

    #[test]
    fn missing_endchar() {
        let (result, _) = run(&[Cs::Int(0), Cs::Int(0), Cs::Op(operator::MOVE_TO)]);
        assert_eq!(result, Err(CFFError::MissingEndChar));
    }

    #[test]
    fn data_after_endchar() {
        let (result, _) = run(&[Cs::Op(operator::ENDCHAR), Cs::Int(1)]);
        assert_eq!(result, Err(CFFError::DataAfterEndChar));
    }

    #[test]
    fn endchar_in_subroutine() {
        let bias = subr_bias(1);
        let local = charstring(&[
            Cs::Int(500),
            Cs::Op(operator::HORIZONTAL_LINE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        let glyph = charstring(&[
            Cs::Int(0),
            Cs::Int(100),
            Cs::Op(operator::MOVE_TO),
            Cs::Int(-bias),
            Cs::Op(operator::CALL_LOCAL_SUBROUTINE),
            Cs::Int(300),
            Cs::Op(operator::VERTICAL_LINE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        let mut sink = RecordingSink::default();
        let local_subrs = [local];
        let metrics = run_with(&[glyph], &[], Some(&local_subrs), 0, &mut sink)
            .unwrap()
            .unwrap();
        assert_eq!(metrics.width, 500.0);
        // The caller's remaining operators are never run
        assert!(!sink.events.contains(&SinkEvent::LineTo(vec2f(500., 400.))));
        assert_eq!(sink.events.last(), Some(&SinkEvent::EndGlyph));

        // Bytes after endchar in the subroutine itself are still rejected
        let local = charstring(&[Cs::Op(operator::ENDCHAR), Cs::Int(1)]);
        let glyph = charstring(&[Cs::Int(-bias), Cs::Op(operator::CALL_LOCAL_SUBROUTINE)]);
        let mut sink = RecordingSink::default();
        let local_subrs = [local];
        assert_eq!(
            run_with(&[glyph], &[], Some(&local_subrs), 0, &mut sink),
            Err(CFFError::DataAfterEndChar)
        );
    }

    #[test]
    fn unknown_operator_lenient() {
        let glyph = charstring(&[
            Cs::Int(7),
            Cs::Op(2),
            Cs::Int(0),
            Cs::Int(0),
            Cs::Op(operator::MOVE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        let char_strings_data = cff_index(&[glyph]);
        let global_data = cff_index(&[]);
        let char_strings = read_index(&char_strings_data);
        let global_subrs = read_index(&global_data);
        let font_dict = FontDictContext::default();
        let font = FontContext {
            char_strings: &char_strings,
            global_subrs: &global_subrs,
            charset: None,
            font_dict: &font_dict,
            blender: None,
            is_cff2: false,
        };
        let info = GlyphInfo {
            glyph_id: 0,
            sid: None,
            cid: None,
            font_dict_index: None,
        };
        let config = InterpreterConfig {
            lenient: true,
            ..InterpreterConfig::default()
        };
        let mut sink = RecordingSink::default();
        let metrics = Type2Interpreter::new(config)
            .interpret(&font, &info, &mut sink)
            .unwrap();
        assert!(metrics.is_some());
        assert!(sink
            .events
            .contains(&SinkEvent::GenericOp(2, vec![7.0])));

        let mut sink = RecordingSink::default();
        let result = Type2Interpreter::new(InterpreterConfig::default())
            .interpret(&font, &info, &mut sink);
        assert_eq!(result, Err(CFFError::InvalidOperator));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(
            stack_after(&[Cs::Int(7), Cs::Int(5), Cs::Esc(operator::SUB)]),
            vec![2.0]
        );
        assert_eq!(
            stack_after(&[Cs::Int(7), Cs::Int(2), Cs::Esc(operator::DIV)]),
            vec![3.5]
        );
        assert_eq!(
            stack_after(&[Cs::Int(-3), Cs::Esc(operator::ABS), Cs::Esc(operator::NEG)]),
            vec![-3.0]
        );
        assert_eq!(
            stack_after(&[Cs::Int(9), Cs::Esc(operator::SQRT)]),
            vec![3.0]
        );
        assert_eq!(
            stack_after(&[Cs::Int(1), Cs::Int(0), Cs::Esc(operator::AND)]),
            vec![0.0]
        );
        assert_eq!(
            stack_after(&[Cs::Int(1), Cs::Int(0), Cs::Esc(operator::OR)]),
            vec![1.0]
        );
        assert_eq!(
            stack_after(&[Cs::Int(4), Cs::Int(4), Cs::Esc(operator::EQ)]),
            vec![1.0]
        );
        // s1 s2 v1 v2 ifelse
        assert_eq!(
            stack_after(&[
                Cs::Int(1),
                Cs::Int(2),
                Cs::Int(5),
                Cs::Int(3),
                Cs::Esc(operator::IFELSE)
            ]),
            vec![2.0]
        );
        assert_eq!(
            stack_after(&[Cs::Int(1), Cs::Int(2), Cs::Esc(operator::EXCH)]),
            vec![2.0, 1.0]
        );
        assert_eq!(
            stack_after(&[Cs::Int(1), Cs::Esc(operator::DUP), Cs::Esc(operator::ADD)]),
            vec![2.0]
        );
        assert_eq!(
            stack_after(&[
                Cs::Int(42),
                Cs::Int(3),
                Cs::Esc(operator::PUT),
                Cs::Int(3),
                Cs::Esc(operator::GET)
            ]),
            vec![42.0]
        );
    }

    #[test]
    fn arithmetic_errors() {
        let (result, _) = run(&[Cs::Int(1), Cs::Int(0), Cs::Esc(operator::DIV)]);
        assert_eq!(result, Err(CFFError::DivideByZero));

        let (result, _) = run(&[Cs::Int(-4), Cs::Esc(operator::SQRT)]);
        assert_eq!(result, Err(CFFError::SqrtDomain));

        let (result, _) = run(&[Cs::Int(1), Cs::Int(32), Cs::Esc(operator::PUT)]);
        assert_eq!(result, Err(CFFError::PutBounds));

        let (result, _) = run(&[Cs::Int(-1), Cs::Esc(operator::GET)]);
        assert_eq!(result, Err(CFFError::GetBounds));

        let (result, _) = run(&[Cs::Int(1), Cs::Int(1), Cs::Esc(operator::INDEX)]);
        assert_eq!(result, Err(CFFError::IndexBounds));

        let (result, _) = run(&[Cs::Int(1), Cs::Int(2), Cs::Int(1), Cs::Esc(operator::ROLL)]);
        assert_eq!(result, Err(CFFError::RollBounds));
    }

    #[test]
    fn index_and_roll() {
        assert_eq!(
            stack_after(&[Cs::Int(1), Cs::Int(2), Cs::Int(1), Cs::Esc(operator::INDEX)]),
            vec![1.0, 2.0, 1.0]
        );
        // A negative index copies the top
        assert_eq!(
            stack_after(&[Cs::Int(1), Cs::Int(2), Cs::Int(-3), Cs::Esc(operator::INDEX)]),
            vec![1.0, 2.0, 2.0]
        );
        assert_eq!(
            stack_after(&[
                Cs::Int(1),
                Cs::Int(2),
                Cs::Int(3),
                Cs::Int(3),
                Cs::Int(1),
                Cs::Esc(operator::ROLL)
            ]),
            vec![3.0, 1.0, 2.0]
        );
        assert_eq!(
            stack_after(&[
                Cs::Int(1),
                Cs::Int(2),
                Cs::Int(3),
                Cs::Int(3),
                Cs::Int(-1),
                Cs::Esc(operator::ROLL)
            ]),
            vec![2.0, 3.0, 1.0]
        );
        assert_eq!(
            stack_after(&[Cs::Int(1), Cs::Int(0), Cs::Int(5), Cs::Esc(operator::ROLL)]),
            vec![1.0]
        );
    }

    #[test]
    fn random_is_deterministic() {
        let mut a = initial_seed(1);
        let mut b = initial_seed(1);
        let first = (0..5).map(|_| next_random(&mut a)).collect::<Vec<_>>();
        let second = (0..5).map(|_| next_random(&mut b)).collect::<Vec<_>>();
        assert_eq!(first, second);
        assert_eq!(first[0], Fixed::from_raw((48271 & 0xFFFF) + 1));
        for value in first {
            assert!(value.raw() > 0 && value.raw() <= 0x10000);
        }
        assert_eq!(initial_seed(0), 1);
    }

    #[test]
    fn nesting_limit() {
        // A global subroutine that calls itself forever
        let bias = subr_bias(1);
        let recurse = charstring(&[Cs::Int(-bias), Cs::Op(operator::CALL_GLOBAL_SUBROUTINE)]);
        let glyph = charstring(&[Cs::Int(-bias), Cs::Op(operator::CALL_GLOBAL_SUBROUTINE)]);
        let mut sink = RecordingSink::default();
        let result = run_with(&[glyph], &[recurse], None, 0, &mut sink);
        assert_eq!(result, Err(CFFError::NestingLimitReached));
    }

    #[test]
    fn subroutines() {
        let bias = subr_bias(1);
        let local = charstring(&[
            Cs::Int(100),
            Cs::Op(operator::HORIZONTAL_LINE_TO),
            Cs::Op(operator::RETURN),
        ]);
        let global = charstring(&[Cs::Op(operator::ENDCHAR)]);
        let glyph = charstring(&[
            Cs::Int(0),
            Cs::Int(0),
            Cs::Op(operator::MOVE_TO),
            Cs::Int(-bias),
            Cs::Op(operator::CALL_LOCAL_SUBROUTINE),
            Cs::Int(-bias),
            Cs::Op(operator::CALL_GLOBAL_SUBROUTINE),
        ]);
        let mut sink = RecordingSink::default();
        let local_subrs = [local];
        let result = run_with(&[glyph.clone()], &[global], Some(&local_subrs), 0, &mut sink);
        assert!(result.unwrap().is_some());
        assert!(sink.events.contains(&SinkEvent::LineTo(vec2f(100., 0.))));

        let mut sink = RecordingSink::default();
        let result = run_with(&[glyph], &[], None, 0, &mut sink);
        assert_eq!(result, Err(CFFError::NoLocalSubroutines));

        let glyph = charstring(&[Cs::Int(5), Cs::Op(operator::CALL_GLOBAL_SUBROUTINE)]);
        let mut sink = RecordingSink::default();
        let result = run_with(&[glyph], &[], None, 0, &mut sink);
        assert_eq!(result, Err(CFFError::InvalidSubroutineIndex { global: true }));
    }

    #[test]
    fn seac() {
        // ISOAdobe charset: glyph 34 is SID 34, "A" (code 65). Glyph 124 is SID 124,
        // "grave" (code 193).
        let mut glyphs = vec![charstring(&[Cs::Op(operator::ENDCHAR)]); 125];
        glyphs[34] = charstring(&[
            Cs::Int(0),
            Cs::Int(0),
            Cs::Op(operator::MOVE_TO),
            Cs::Int(400),
            Cs::Op(operator::HORIZONTAL_LINE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        glyphs[124] = charstring(&[
            Cs::Int(0),
            Cs::Int(0),
            Cs::Op(operator::MOVE_TO),
            Cs::Int(50),
            Cs::Op(operator::VERTICAL_LINE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        glyphs[0] = charstring(&[
            Cs::Int(100),
            Cs::Int(200),
            Cs::Int(65),
            Cs::Int(193),
            Cs::Op(operator::ENDCHAR),
        ]);
        let mut sink = RecordingSink::default();
        let metrics = run_with(&glyphs, &[], None, 0, &mut sink).unwrap().unwrap();
        assert_eq!(metrics.width, 500.0);
        assert_eq!(
            metrics.bbox,
            Some(RectI::from_points(vec2i(0, 0), vec2i(400, 250)))
        );
        assert!(sink.events.contains(&SinkEvent::Seac(65, 193)));
        assert!(sink.events.contains(&SinkEvent::MoveTo(vec2f(100., 200.))));
        assert!(sink.events.contains(&SinkEvent::LineTo(vec2f(100., 250.))));
        assert_eq!(sink.widths(), vec![500.0]);

        glyphs[0] = charstring(&[
            Cs::Int(0),
            Cs::Int(0),
            Cs::Int(300),
            Cs::Int(193),
            Cs::Op(operator::ENDCHAR),
        ]);
        let mut sink = RecordingSink::default();
        let result = run_with(&glyphs, &[], None, 0, &mut sink);
        assert_eq!(result, Err(CFFError::InvalidSeacCode));

        // Code 1 is not in the Standard Encoding
        glyphs[0] = charstring(&[
            Cs::Int(0),
            Cs::Int(0),
            Cs::Int(1),
            Cs::Int(193),
            Cs::Op(operator::ENDCHAR),
        ]);
        let mut sink = RecordingSink::default();
        let result = run_with(&glyphs, &[], None, 0, &mut sink);
        assert_eq!(result, Err(CFFError::BadSeacComponent));
    }

    #[test]
    fn hints() {
        let mut sink = RecordingSink {
            hints: true,
            ..RecordingSink::default()
        };
        let glyph = charstring(&[
            Cs::Int(10),
            Cs::Int(20),
            Cs::Int(100),
            Cs::Int(-20),
            Cs::Op(operator::HORIZONTAL_STEM_HINT_MASK),
            Cs::Int(30),
            Cs::Int(40),
            Cs::Op(operator::HINT_MASK),
            Cs::Raw(0xFF),
            Cs::Int(0),
            Cs::Int(0),
            Cs::Op(operator::MOVE_TO),
            Cs::Op(operator::ENDCHAR),
        ]);
        run_with(&[glyph], &[], None, 0, &mut sink).unwrap();
        assert_eq!(
            sink.stems(),
            vec![
                (false, 10.0, 30.0, StemFlags::HINT_MASK),
                (false, 130.0, 110.0, StemFlags::HINT_MASK | StemFlags::GHOST),
                (true, 30.0, 70.0, StemFlags::HINT_MASK),
            ]
        );
        // Three stems use the top three bits
        assert!(sink
            .events
            .contains(&SinkEvent::HintMask(false, vec![0xE0])));
    }

    #[test]
    fn counter_strategy() {
        let stem = |edge0, edge1| Stem {
            is_vertical: true,
            edge0,
            edge1,
        };
        assert!(is_stem3(&[
            stem(10.0, 30.0),
            stem(110.0, 130.0),
            stem(210.0, 230.0)
        ]));
        assert!(!is_stem3(&[
            stem(10.0, 30.0),
            stem(110.0, 140.0),
            stem(210.0, 230.0)
        ]));
        assert!(!is_stem3(&[stem(10.0, 30.0), stem(110.0, 130.0)]));

        let mut sink = RecordingSink {
            hints: true,
            ..RecordingSink::default()
        };
        let glyph = charstring(&[
            Cs::Int(10),
            Cs::Int(20),
            Cs::Op(operator::HORIZONTAL_STEM_HINT_MASK),
            Cs::Op(operator::COUNTER_MASK),
            Cs::Raw(0x80),
            Cs::Op(operator::ENDCHAR),
        ]);
        run_with(&[glyph], &[], None, 0, &mut sink).unwrap();
        assert!(sink
            .events
            .contains(&SinkEvent::CounterStrategy(CounterStrategy::HintSubstitution)));
    }

    #[test]
    fn flex() {
        let mut ops = vec![Cs::Int(0), Cs::Int(0), Cs::Op(operator::MOVE_TO)];
        ops.extend((1..=12).map(|_| Cs::Int(10)));
        ops.push(Cs::Int(25));
        ops.push(Cs::Esc(operator::FLEX));
        ops.push(Cs::Op(operator::ENDCHAR));
        let (result, sink) = run(&ops);
        assert!(result.is_ok());
        assert!(sink.events.contains(&SinkEvent::Flex(
            25.0,
            [
                vec2f(10., 10.),
                vec2f(20., 20.),
                vec2f(30., 30.),
                vec2f(40., 40.),
                vec2f(50., 50.),
                vec2f(60., 60.)
            ]
        )));

        // flex1 with a dominant x axis returns to the starting y
        let mut ops = vec![Cs::Int(0), Cs::Int(0), Cs::Op(operator::MOVE_TO)];
        ops.extend([
            Cs::Int(10),
            Cs::Int(5),
            Cs::Int(10),
            Cs::Int(5),
            Cs::Int(10),
            Cs::Int(0),
            Cs::Int(10),
            Cs::Int(-5),
            Cs::Int(10),
            Cs::Int(-5),
            Cs::Int(10),
            Cs::Esc(operator::FLEX1),
            Cs::Op(operator::ENDCHAR),
        ]);
        let (_, sink) = run(&ops);
        match sink.events.iter().find(|e| matches!(e, SinkEvent::Flex(..))) {
            Some(SinkEvent::Flex(depth, points)) => {
                assert_eq!(*depth, 50.0);
                assert_eq!(points[5], vec2f(60., 0.));
            }
            other => panic!("expected flex, got {:?}", other),
        }
    }

    #[test]
    fn curve_bbox_fast_path() {
        // Control points within the end point box
        for (p1, p2) in [
            (vec2f(10., 20.), vec2f(90., 80.)),
            (vec2f(90., 5.), vec2f(5., 95.)),
        ] {
            let (p0, p3) = (vec2f(0., 0.), vec2f(100., 100.));
            let mut fast = BBox::new();
            fast.extend_by_curve(p0, p1, p2, p3, 0);
            let mut subdivided = BBox::new();
            subdivide(&mut subdivided, [p0, p1, p2, p3], 6);
            assert_eq!(fast.to_rect(), subdivided.to_rect());
            assert_eq!(
                fast.to_rect(),
                Ok(Some(RectI::from_points(vec2i(0, 0), vec2i(100, 100))))
            );
        }
    }

    /// Split a curve `levels` times and extend `bbox` by the control points of every piece.
    fn subdivide(bbox: &mut BBox, [p0, p1, p2, p3]: [Vector2F; 4], levels: u8) {
        if levels == 0 {
            [p0, p1, p2, p3].into_iter().for_each(|p| bbox.extend_by(p));
            return;
        }
        let p01 = (p0 + p1) * 0.5;
        let p12 = (p1 + p2) * 0.5;
        let p23 = (p2 + p3) * 0.5;
        let p012 = (p01 + p12) * 0.5;
        let p123 = (p12 + p23) * 0.5;
        let mid = (p012 + p123) * 0.5;
        subdivide(bbox, [p0, p01, p012, mid], levels - 1);
        subdivide(bbox, [mid, p123, p23, p3], levels - 1);
    }

    #[test]
    fn curve_bbox_subdivision() {
        // The control points overshoot: the extremum of the curve is at y = 75
        let (p0, p1, p2, p3) = (
            vec2f(0., 0.),
            vec2f(0., 100.),
            vec2f(100., 100.),
            vec2f(100., 0.),
        );
        let mut bbox = BBox::new();
        bbox.extend_by_curve(p0, p1, p2, p3, 0);
        assert_close(bbox.y_max, 75.0);
        assert_eq!(bbox.x_min, 0.0);
        assert_eq!(bbox.x_max, 100.0);
    }

    #[test]
    fn bbox_overflow() {
        let mut bbox = BBox::new();
        bbox.extend_by(vec2f(0., 0.));
        bbox.extend_by(vec2f(40000., 0.));
        assert_eq!(bbox.to_rect(), Err(CFFError::BboxOverflow));
        assert_eq!(BBox::new().to_rect(), Ok(None));
    }

    #[test]
    fn stack_value_rounding() {
        assert_eq!(StackValue::Real(2.5).to_i32(), Some(3));
        assert_eq!(StackValue::Real(-2.5).to_i32(), Some(-3));
        assert_eq!(StackValue::Real(-2.4).to_i32(), Some(-2));
        assert_eq!(StackValue::Fixed(Fixed::from_f64(1.5)).to_i32(), Some(2));
        assert_eq!(StackValue::Real(1e12).to_i32(), None);
    }

    #[test]
    fn transformed_metrics() {
        let metrics = GlyphMetrics {
            width: 500.0,
            bbox: Some(RectI::from_points(vec2i(0, -100), vec2i(500, 700))),
        };
        let rect = metrics.transformed(&FontMatrix::DEFAULT).unwrap();
        assert_close(rect.min_x(), 0.0);
        assert_close(rect.min_y(), -0.1);
        assert_close(rect.max_x(), 0.5);
        assert_close(rect.max_y(), 0.7);
    }
}
