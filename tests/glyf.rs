#![warn(rust_2018_idioms)]

#[allow(dead_code)]
mod common;

use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::vector::{vec2f, Vector2F};

use fontprog::binary::source::SliceSource;
use fontprog::error::ParseError;
use fontprog::outline::{BeginGlyph, GlyphInfo, OutlineSink};
use fontprog::tables::glyf::{CurveMode, GlyfConfig, GlyfError, TrueTypeTables};
use fontprog::tables::F2Dot14;

use crate::common::{
    assert_close, head_table, hmtx_tables, maxp_table, sfnt, GlyfBuilder, GvarBuilder, GvarTuple,
    TestComponent, TestGlyph,
};

const TRUETYPE: u32 = 0x0001_0000;

#[derive(Debug, Default)]
struct PathSink {
    moves: Vec<Vector2F>,
    lines: Vec<Vector2F>,
    curves: Vec<(Vector2F, Vector2F, Vector2F)>,
    closes: usize,
    widths: Vec<f32>,
    begin: Option<BeginGlyph>,
}

impl OutlineSink for PathSink {
    fn move_to(&mut self, to: Vector2F) {
        self.moves.push(to);
    }

    fn line_to(&mut self, to: Vector2F) {
        self.lines.push(to);
    }

    fn cubic_curve_to(&mut self, ctrl: LineSegment2F, to: Vector2F) {
        self.curves.push((ctrl.from(), ctrl.to(), to));
    }

    fn close(&mut self) {
        self.closes += 1;
    }

    fn begin_glyph(&mut self, _info: &GlyphInfo) -> BeginGlyph {
        self.begin.unwrap_or(BeginGlyph::Continue)
    }

    fn width(&mut self, width: f32) {
        self.widths.push(width);
    }
}

fn square(x: i16, y: i16, size: i16) -> TestGlyph {
    TestGlyph::Simple(vec![vec![
        (x, y, true),
        (x, y + size, true),
        (x + size, y + size, true),
        (x + size, y, true),
    ]])
}

fn arch() -> TestGlyph {
    TestGlyph::Simple(vec![vec![
        (0, 0, true),
        (0, 300, false),
        (300, 300, false),
        (300, 0, true),
    ]])
}

/// 0: empty, 1: square, 2: the square moved by (200, 0), 3: refers to itself, 4: an arch of two
/// quadratics.
fn test_font(gvar: Option<Vec<u8>>) -> Vec<u8> {
    let glyphs = vec![
        TestGlyph::Empty,
        square(0, 0, 100),
        TestGlyph::Composite(vec![TestComponent::offset(1, 200, 0)]),
        TestGlyph::Composite(vec![TestComponent::offset(3, 0, 0)]),
        arch(),
    ];
    let (glyf, loca) = GlyfBuilder::new(glyphs).build();
    let (hhea, hmtx) = hmtx_tables(&[(500, 0), (600, 0), (600, 200), (600, 0), (400, 0)]);
    let mut tables = vec![
        (*b"glyf", glyf),
        (*b"head", head_table(1000)),
        (*b"hhea", hhea),
        (*b"hmtx", hmtx),
        (*b"loca", loca),
        (*b"maxp", maxp_table(5)),
    ];
    if let Some(gvar) = gvar {
        tables.insert(1, (*b"gvar", gvar));
    }
    sfnt(TRUETYPE, &tables)
}

fn test_gvar() -> Vec<u8> {
    let mut builder = GvarBuilder::new(1);
    builder.shared_tuple(&[1.0]);
    builder.glyph(&[]);
    // Square: every point moves right by 10 and the advance grows by 20
    builder.glyph(&[GvarTuple::shared(
        0,
        None,
        &[(10, 0), (10, 0), (10, 0), (10, 0), (0, 0), (20, 0), (0, 0), (0, 0)],
    )]);
    // Composite: the component offset moves up by 40
    builder.glyph(&[GvarTuple::shared(
        0,
        None,
        &[(0, 40), (0, 0), (0, 0), (0, 0), (0, 0)],
    )]);
    builder.glyph(&[]);
    builder.glyph(&[]);
    builder.build()
}

#[test]
fn draw_glyphs() {
    let font = test_font(None);
    let tables = TrueTypeTables::load(SliceSource::new(&font)).unwrap();
    let reader = tables.reader(GlyfConfig::default()).unwrap();
    assert_eq!(reader.glyph_count(), 5);

    let mut sink = PathSink::default();
    let metrics = reader.get_glyph(2, &mut sink).unwrap().unwrap();
    assert_eq!(metrics.advance, Some(600.));
    assert_eq!(sink.widths, vec![600.]);
    assert_eq!(sink.moves, vec![vec2f(200., 0.)]);
    assert_eq!(
        sink.lines,
        vec![vec2f(200., 100.), vec2f(300., 100.), vec2f(300., 0.)]
    );
    assert_eq!(sink.closes, 1);
    let bbox = metrics.bbox.unwrap();
    assert_eq!(bbox.origin(), vec2f(200., 0.));
    assert_eq!(bbox.lower_right(), vec2f(300., 100.));

    let mut sink = PathSink::default();
    let metrics = reader.get_glyph(0, &mut sink).unwrap().unwrap();
    assert_eq!(metrics.bbox, None);
    assert!(sink.moves.is_empty());
}

#[test]
fn width_only_and_skip() {
    let font = test_font(None);
    let tables = TrueTypeTables::load(SliceSource::new(&font)).unwrap();
    let reader = tables.reader(GlyfConfig::default()).unwrap();

    let mut sink = PathSink {
        begin: Some(BeginGlyph::WidthOnly),
        ..PathSink::default()
    };
    let metrics = reader.get_glyph(4, &mut sink).unwrap().unwrap();
    assert_eq!(metrics.advance, Some(400.));
    assert_eq!(metrics.bbox, None);
    assert!(sink.curves.is_empty());

    let mut sink = PathSink {
        begin: Some(BeginGlyph::Skip),
        ..PathSink::default()
    };
    assert_eq!(reader.get_glyph(4, &mut sink), Ok(None));
    assert!(sink.widths.is_empty());

    let mut sink = PathSink {
        begin: Some(BeginGlyph::Fail),
        ..PathSink::default()
    };
    assert_eq!(reader.get_glyph(4, &mut sink), Err(GlyfError::SinkFailed));
}

#[test]
fn self_referencing_composite() {
    let font = test_font(None);
    let tables = TrueTypeTables::load(SliceSource::new(&font)).unwrap();
    let reader = tables.reader(GlyfConfig::default()).unwrap();
    let mut sink = PathSink::default();
    assert_eq!(
        reader.get_glyph(3, &mut sink),
        Err(GlyfError::ParseError(ParseError::LimitExceeded))
    );
    // Nothing is drawn for a glyph that fails
    assert!(sink.moves.is_empty());
    assert_eq!(sink.closes, 0);
}

#[test]
fn curve_modes() {
    let font = test_font(None);
    let tables = TrueTypeTables::load(SliceSource::new(&font)).unwrap();

    let reader = tables.reader(GlyfConfig::default()).unwrap();
    let mut sink = PathSink::default();
    reader.get_glyph(4, &mut sink).unwrap();
    assert_eq!(sink.curves.len(), 2);
    assert_eq!(sink.curves[0].2, vec2f(150., 300.));

    let config = GlyfConfig {
        curve_mode: CurveMode::Approximate,
        ..GlyfConfig::default()
    };
    let reader = tables.reader(config).unwrap();
    let mut sink = PathSink::default();
    reader.get_glyph(4, &mut sink).unwrap();
    assert_eq!(sink.curves.len(), 1);
    let (ctrl0, ctrl1, to) = sink.curves[0];
    assert_close(ctrl0.y(), 400.);
    assert_close(ctrl1.y(), 400.);
    assert_eq!(to, vec2f(300., 0.));
}

#[test]
fn variations() {
    let font = test_font(Some(test_gvar()));
    let tables = TrueTypeTables::load(SliceSource::new(&font)).unwrap();
    let config = GlyfConfig {
        hmetrics_via_variation: true,
        ..GlyfConfig::default()
    };
    let mut reader = tables.reader(config).unwrap();

    // The default location is unchanged
    let outline = reader.glyph_outline(1).unwrap();
    assert_eq!(outline.points[0].x, 0.);

    reader.set_variation_coords(&[F2Dot14::from_f32(0.5)]);
    let outline = reader.glyph_outline(1).unwrap();
    assert_close(outline.points[0].x, 5.);
    assert_close(outline.points[2].x, 105.);

    let mut sink = PathSink::default();
    let metrics = reader.get_glyph(1, &mut sink).unwrap().unwrap();
    assert_close(metrics.advance.unwrap(), 610.);

    // The component is varied and then moved by its varied offset
    let outline = reader.glyph_outline(2).unwrap();
    assert_close(outline.points[0].x, 205.);
    assert_close(outline.points[0].y, 20.);

    // Without variation metrics the advance comes from hmtx
    let reader = tables.reader(GlyfConfig::default()).unwrap();
    let mut sink = PathSink::default();
    let metrics = reader.get_glyph(1, &mut sink).unwrap().unwrap();
    assert_eq!(metrics.advance, Some(600.));
}

#[test]
fn truncated_font() {
    let font = test_font(None);
    let result = TrueTypeTables::load(SliceSource::new(&font[..20]));
    assert!(matches!(result, Err(ParseError::BadEof)));

    let result = TrueTypeTables::load(SliceSource::with_chunk_size(&font[..font.len() - 40], 8));
    assert!(matches!(result, Err(ParseError::BadEof)));
}

#[test]
fn missing_tables() {
    let font = sfnt(TRUETYPE, &[(*b"head", head_table(1000))]);
    let result = TrueTypeTables::load(SliceSource::new(&font));
    assert!(matches!(result, Err(ParseError::MissingTable(_))));
}
