//! Shared test code.

use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::vector::Vector2F;

use crate::outline::{BeginGlyph, CounterStrategy, GlyphInfo, OutlineSink, StemFlags};
use crate::GlyphId;

include!("../tests/common.rs");

pub(crate) mod writer {
    //! Builders for synthetic font data.

    pub use super::{
        cff_index, charstring, head_table, hmtx_tables, maxp_table, sfnt, CffBuilder, Cs,
        GlyfBuilder, GvarBuilder, GvarTuple, TestComponent, TestGlyph,
    };
}

/// A callback received by a `RecordingSink`.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    BeginGlyph(GlyphId),
    EndGlyph,
    Width(f32),
    MoveTo(Vector2F),
    LineTo(Vector2F),
    CurveTo(Vector2F, Vector2F, Vector2F),
    Close,
    Stem(bool, f32, f32, StemFlags),
    HintMask(bool, Vec<u8>),
    CounterStrategy(CounterStrategy),
    Seac(u8, u8),
    GenericOp(u16, Vec<f64>),
    Flex(f32, [Vector2F; 6]),
}

/// Sink that records every callback it receives.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
    /// The answer given to `begin_glyph`.
    pub begin: BeginGlyph,
    pub hints: bool,
}

impl Default for RecordingSink {
    fn default() -> Self {
        RecordingSink {
            events: Vec::new(),
            begin: BeginGlyph::Continue,
            hints: false,
        }
    }
}

impl RecordingSink {
    pub fn widths(&self) -> Vec<f32> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Width(width) => Some(*width),
                _ => None,
            })
            .collect()
    }

    pub fn curves(&self) -> Vec<(Vector2F, Vector2F, Vector2F)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::CurveTo(ctrl0, ctrl1, to) => Some((*ctrl0, *ctrl1, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn stems(&self) -> Vec<(bool, f32, f32, StemFlags)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Stem(is_vertical, edge0, edge1, flags) => {
                    Some((*is_vertical, *edge0, *edge1, *flags))
                }
                _ => None,
            })
            .collect()
    }
}

impl OutlineSink for RecordingSink {
    fn move_to(&mut self, to: Vector2F) {
        self.events.push(SinkEvent::MoveTo(to));
    }

    fn line_to(&mut self, to: Vector2F) {
        self.events.push(SinkEvent::LineTo(to));
    }

    fn cubic_curve_to(&mut self, ctrl: LineSegment2F, to: Vector2F) {
        self.events
            .push(SinkEvent::CurveTo(ctrl.from(), ctrl.to(), to));
    }

    fn close(&mut self) {
        self.events.push(SinkEvent::Close);
    }

    fn begin_glyph(&mut self, info: &GlyphInfo) -> BeginGlyph {
        self.events.push(SinkEvent::BeginGlyph(info.glyph_id));
        self.begin
    }

    fn end_glyph(&mut self) {
        self.events.push(SinkEvent::EndGlyph);
    }

    fn width(&mut self, width: f32) {
        self.events.push(SinkEvent::Width(width));
    }

    fn accepts_hints(&self) -> bool {
        self.hints
    }

    fn flex_hint(&mut self, depth: f32, points: [Vector2F; 6]) {
        self.events.push(SinkEvent::Flex(depth, points));
    }

    fn stem_hint(&mut self, is_vertical: bool, edge0: f32, edge1: f32, flags: StemFlags) {
        self.events
            .push(SinkEvent::Stem(is_vertical, edge0, edge1, flags));
    }

    fn hint_mask(&mut self, is_counter: bool, mask: &[u8]) {
        self.events.push(SinkEvent::HintMask(is_counter, mask.to_vec()));
    }

    fn counter_strategy(&mut self, strategy: CounterStrategy) {
        self.events.push(SinkEvent::CounterStrategy(strategy));
    }

    fn seac(&mut self, _adx: f32, _ady: f32, base_code: u8, accent_code: u8) {
        self.events.push(SinkEvent::Seac(base_code, accent_code));
    }

    fn generic_op(&mut self, opcode: u16, operands: &[f64]) {
        self.events
            .push(SinkEvent::GenericOp(opcode, operands.to_vec()));
    }
}
