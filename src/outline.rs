//! Delivery of glyph outlines.
//!
//! The readers in this crate decode glyph programs into a series of drawing callbacks on an
//! `OutlineSink`. Besides the path itself a sink can opt in to hints, to the design-space deltas
//! of variable fonts, and to control over which glyphs are interpreted at all.

use bitflags::bitflags;
use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::vector::{vec2f, Vector2F};

use crate::cff::blend::BlendValue;
use crate::GlyphId;

/// The answer of a sink to `OutlineSink::begin_glyph`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BeginGlyph {
    /// Interpret the glyph.
    Continue,
    /// Stop interpreting once the advance width is known.
    WidthOnly,
    /// Do not interpret this glyph.
    Skip,
    /// Stop with `CFFError::Quit`.
    Quit,
    /// Stop with `CFFError::SinkFailed`.
    Fail,
}

/// The glyph about to be delivered to a sink.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GlyphInfo {
    pub glyph_id: GlyphId,
    /// String id of the glyph name in name-keyed CFF fonts.
    pub sid: Option<u16>,
    /// CID of the glyph in CID-keyed CFF fonts.
    pub cid: Option<u16>,
    /// Index of the Font DICT the glyph belongs to in CID-keyed and CFF2 fonts.
    pub font_dict_index: Option<u16>,
}

bitflags! {
    /// Properties of a stem delivered through `OutlineSink::stem_hint`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct StemFlags: u8 {
        /// Declared by `hstemhm`/`vstemhm` or implied by operands before a mask.
        const HINT_MASK = 0x01;
        /// An edge hint: a stem of width -20 or -21.
        const GHOST = 0x02;
        /// Belongs to the accent of a `seac` composite.
        const ACCENT = 0x04;
    }
}

/// How the counter masks of a glyph are to be applied.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CounterStrategy {
    /// Counters are controlled globally, as for ideographic fonts or stem3 groups.
    GlobalColoring,
    /// Counter masks take part in hint substitution.
    HintSubstitution,
}

// `OutlineSink` started out as the trait from font-kit, font-kit/src/outline.rs:
//
// Copyright © 2020 The Pathfinder Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// A trait for visiting a glyph outline
///
/// Only the four path methods are required. Everything else has a default that either ignores
/// the event or forwards it to the path methods.
pub trait OutlineSink {
    /// Moves the pen to a point.
    fn move_to(&mut self, to: Vector2F);
    /// Draws a line to a point.
    fn line_to(&mut self, to: Vector2F);
    /// Draws a cubic Bézier curve to a point.
    fn cubic_curve_to(&mut self, ctrl: LineSegment2F, to: Vector2F);
    /// Closes the path, returning to the first point in it.
    fn close(&mut self);

    /// Called before a glyph is interpreted.
    fn begin_glyph(&mut self, _info: &GlyphInfo) -> BeginGlyph {
        BeginGlyph::Continue
    }

    /// Called after a glyph was delivered successfully.
    fn end_glyph(&mut self) {}

    /// The advance width of the glyph, in font units.
    fn width(&mut self, _width: f32) {}

    /// Whether stem and mask callbacks should be made.
    fn accepts_hints(&self) -> bool {
        false
    }

    /// Whether the `_vf` callbacks should be made for variable fonts.
    fn accepts_blend(&self) -> bool {
        false
    }

    /// A flex: two curves that may be drawn as a straight line when flatter than `depth` 1/100ths
    /// of a device pixel.
    fn flex_hint(&mut self, _depth: f32, points: [Vector2F; 6]) {
        self.cubic_curve_to(LineSegment2F::new(points[0], points[1]), points[2]);
        self.cubic_curve_to(LineSegment2F::new(points[3], points[4]), points[5]);
    }

    /// A horizontal (`is_vertical == false`) or vertical stem between two edges.
    fn stem_hint(&mut self, _is_vertical: bool, _edge0: f32, _edge1: f32, _flags: StemFlags) {}

    /// The bytes of a `hintmask` or, when `is_counter` is set, a `cntrmask`.
    fn hint_mask(&mut self, _is_counter: bool, _mask: &[u8]) {}

    /// Reported once per glyph, on the first `cntrmask`.
    fn counter_strategy(&mut self, _strategy: CounterStrategy) {}

    /// The glyph is an accented composite of two Standard Encoding codes.
    fn seac(&mut self, _adx: f32, _ady: f32, _base_code: u8, _accent_code: u8) {}

    /// An operator the interpreter does not know, with its operands.
    fn generic_op(&mut self, _opcode: u16, _operands: &[f64]) {}

    fn move_to_vf(&mut self, x: &BlendValue, y: &BlendValue) {
        self.move_to(blend_point(x, y));
    }

    fn line_to_vf(&mut self, x: &BlendValue, y: &BlendValue) {
        self.line_to(blend_point(x, y));
    }

    /// A cubic curve as `x1 y1 x2 y2 x3 y3`.
    fn curve_to_vf(&mut self, points: &[BlendValue; 6]) {
        let [x1, y1, x2, y2, x3, y3] = points;
        self.cubic_curve_to(
            LineSegment2F::new(blend_point(x1, y1), blend_point(x2, y2)),
            blend_point(x3, y3),
        );
    }

    fn stem_vf(&mut self, is_vertical: bool, edge0: &BlendValue, edge1: &BlendValue, flags: StemFlags) {
        self.stem_hint(is_vertical, edge0.value as f32, edge1.value as f32, flags);
    }
}

fn blend_point(x: &BlendValue, y: &BlendValue) -> Vector2F {
    vec2f(x.value as f32, y.value as f32)
}

/// Sink that ignores all outline data.
pub struct NullSink;

impl OutlineSink for NullSink {
    fn move_to(&mut self, _to: Vector2F) {}

    fn line_to(&mut self, _to: Vector2F) {}

    fn cubic_curve_to(&mut self, _ctrl: LineSegment2F, _to: Vector2F) {}

    fn close(&mut self) {}
}
