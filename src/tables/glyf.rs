//! Reading of TrueType glyph outlines from the `glyf` table.
//!
//! > This table contains information that describes the glyphs in the font in the TrueType outline
//! > format. Information regarding the rasterizer (scaler) refers to the TrueType rasterizer.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/glyf>
//!
//! [TrueTypeGlyphReader] composes compound glyphs, applies `gvar` deltas for a location in the
//! design space, and delivers the quadratic outlines to an [OutlineSink] as cubic curves.

mod outline;
mod variation;

use std::fmt;
use std::iter;

use bitflags::bitflags;
use log::warn;
use pathfinder_geometry::rect::RectF;
use pathfinder_geometry::transform2d::Matrix2x2F;
use pathfinder_geometry::vector::{vec2f, Vector2F};

use crate::binary::read::{ReadBinary, ReadBinaryDep, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::source::{ByteSource, SourceCursor};
use crate::binary::{I16Be, U16Be, U8};
use crate::error::ParseError;
use crate::outline::{BeginGlyph, GlyphInfo, OutlineSink};
use crate::tables::loca::LocaTable;
use crate::tables::variable_fonts::gvar::GvarTable;
use crate::tables::{
    F2Dot14, HeadTable, HheaTable, HmtxTable, HorizontalMetrics, LongHorMetric, MaxpTable,
    SfntDirectory, TableLocator,
};
use crate::{tag, GlyphId};

/// Components may nest this deep. `maxComponentDepth` in `maxp` is not trusted.
pub const COMPOSITE_GLYPH_RECURSION_LIMIT: u16 = 500;

bitflags! {
    #[rustfmt::skip]
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct SimpleGlyphFlag: u8 {
        const ON_CURVE_POINT                       = 0b00000001;
        const X_SHORT_VECTOR                       = 0b00000010;
        const Y_SHORT_VECTOR                       = 0b00000100;
        const REPEAT_FLAG                          = 0b00001000;
        const X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR = 0b00010000;
        const Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR = 0b00100000;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct CompositeGlyphFlag: u16 {
        /// Bit 0: If this is set, the arguments are 16-bit (uint16 or int16); otherwise, they are
        /// bytes (uint8 or int8).
        const ARG_1_AND_2_ARE_WORDS = 0x0001;
        /// Bit 1: If this is set, the arguments are signed xy values; otherwise, they are unsigned
        /// point numbers.
        const ARGS_ARE_XY_VALUES = 0x0002;
        /// Bit 2: For the xy values if the preceding is true.
        const ROUND_XY_TO_GRID = 0x0004;
        /// Bit 3: This indicates that there is a simple scale for the component. Otherwise, scale = 1.0.
        const WE_HAVE_A_SCALE = 0x0008;
        /// Bit 5: Indicates at least one more glyph after this one.
        const MORE_COMPONENTS = 0x0020;
        /// Bit 6: The x direction will use a different scale from the y direction.
        const WE_HAVE_AN_X_AND_Y_SCALE = 0x0040;
        /// Bit 7: There is a 2 by 2 transformation that will be used to scale the component.
        const WE_HAVE_A_TWO_BY_TWO = 0x0080;
        /// Bit 8: Following the last component are instructions for the composite character.
        const WE_HAVE_INSTRUCTIONS = 0x0100;
        /// Bit 9: If set, this forces the aw and lsb (and rsb) for the composite to be equal to
        /// those from this original glyph.
        const USE_MY_METRICS = 0x0200;
        /// Bit 10: If set, the components of the compound glyph overlap.
        const OVERLAP_COMPOUND = 0x0400;
        /// Bit 11: The composite is designed to have the component offset scaled.
        const SCALED_COMPONENT_OFFSET = 0x0800;
        /// Bit 12: The composite is designed not to have the component offset scaled.
        const UNSCALED_COMPONENT_OFFSET = 0x1000;
    }
}

/// How quadratic segments are turned into cubic curves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CurveMode {
    /// Every quadratic becomes the equivalent cubic.
    #[default]
    Exact,
    /// Pairs of quadratics joined at an implied on-curve point are merged into one cubic when
    /// the result stays close to the original.
    Approximate,
}

/// Settings for a [TrueTypeGlyphReader].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GlyfConfig {
    pub curve_mode: CurveMode,
    /// Report the advance width after `gvar` deltas have moved the phantom points.
    pub hmetrics_via_variation: bool,
    /// `CurveMode::Approximate` is ignored below 1000 units per em.
    pub units_per_em: u16,
}

impl Default for GlyfConfig {
    fn default() -> Self {
        GlyfConfig {
            curve_mode: CurveMode::Exact,
            hmetrics_via_variation: false,
            units_per_em: 1000,
        }
    }
}

/// Errors from reading TrueType glyphs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlyfError {
    ParseError(ParseError),
    /// The sink answered `BeginGlyph::Quit`.
    Quit,
    /// The sink answered `BeginGlyph::Fail`.
    SinkFailed,
}

/// A parsed glyph.
#[derive(Debug, PartialEq, Clone)]
pub struct Glyph<'a> {
    pub number_of_contours: i16,
    pub bounding_box: BoundingBox,
    pub data: GlyphData<'a>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum GlyphData<'a> {
    Simple(SimpleGlyph<'a>),
    Composite {
        components: Vec<CompositeGlyphComponent>,
        instructions: &'a [u8],
    },
}

#[derive(Debug, PartialEq, Clone)]
pub struct SimpleGlyph<'a> {
    pub end_pts_of_contours: Vec<u16>,
    pub instructions: &'a [u8],
    pub flags: Vec<SimpleGlyphFlag>,
    pub coordinates: Vec<Point>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CompositeGlyphComponent {
    pub flags: CompositeGlyphFlag,
    pub glyph_index: u16,
    pub argument1: CompositeGlyphArgument,
    pub argument2: CompositeGlyphArgument,
    pub scale: Option<CompositeGlyphScale>,
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum CompositeGlyphArgument {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum CompositeGlyphScale {
    Scale(F2Dot14),
    XY { x_scale: F2Dot14, y_scale: F2Dot14 },
    Matrix([[F2Dot14; 2]; 2]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point(pub i16, pub i16);

#[derive(Debug, PartialEq, Clone)]
pub struct BoundingBox {
    pub x_min: i16,
    pub x_max: i16,
    pub y_min: i16,
    pub y_max: i16,
}

/// A point of a glyph outline, after composition and variation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyfPoint {
    pub x: f32,
    pub y: f32,
    pub on_curve: bool,
}

/// The points of a glyph, ready to be drawn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlyphOutline {
    pub points: Vec<GlyfPoint>,
    /// The exclusive end of each contour in `points`.
    pub contour_ends: Vec<usize>,
    /// Horizontal origin, horizontal advance, vertical origin and vertical advance.
    pub phantom_points: [Vector2F; 4],
}

/// What `TrueTypeGlyphReader::get_glyph` learnt about a glyph.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyfMetrics {
    /// The advance width, when horizontal metrics are available.
    pub advance: Option<f32>,
    /// The bounds of all points, including off-curve points. `None` for an empty glyph or when
    /// only the width was requested.
    pub bbox: Option<RectF>,
}

/// Reads glyphs from a `glyf` table.
pub struct TrueTypeGlyphReader<'a> {
    glyf: ReadScope<'a>,
    loca: LocaTable<'a>,
    gvar: Option<GvarTable<'a>>,
    metrics: Option<Box<dyn HorizontalMetrics + 'a>>,
    config: GlyfConfig,
    coords: Vec<F2Dot14>,
}

/// The tables a [TrueTypeGlyphReader] needs, loaded from a byte source.
#[derive(Debug)]
pub struct TrueTypeTables {
    pub head: HeadTable,
    pub maxp: MaxpTable,
    pub hhea: Option<HheaTable>,
    loca: Box<[u8]>,
    glyf: Box<[u8]>,
    gvar: Option<Box<[u8]>>,
    hmtx: Option<Box<[u8]>>,
}

impl<'a> TrueTypeGlyphReader<'a> {
    pub fn new(glyf: &'a [u8], loca: LocaTable<'a>, config: GlyfConfig) -> Self {
        TrueTypeGlyphReader {
            glyf: ReadScope::new(glyf),
            loca,
            gvar: None,
            metrics: None,
            config,
            coords: Vec::new(),
        }
    }

    /// Apply the deltas of `gvar`. Its glyph count must match `loca`.
    pub fn with_gvar(mut self, gvar: GvarTable<'a>) -> Result<Self, ParseError> {
        if usize::from(gvar.glyph_count) != self.loca.num_glyphs() {
            return Err(ParseError::BadValue);
        }
        self.gvar = Some(gvar);
        Ok(self)
    }

    /// Use `metrics` to place the phantom points and report advance widths.
    pub fn with_metrics(mut self, metrics: impl HorizontalMetrics + 'a) -> Self {
        self.metrics = Some(Box::new(metrics));
        self
    }

    /// Select the location in the design space, as normalised coordinates.
    pub fn set_variation_coords(&mut self, coords: &[F2Dot14]) {
        self.coords.clear();
        self.coords.extend_from_slice(coords);
    }

    pub fn variation_coords(&self) -> &[F2Dot14] {
        &self.coords
    }

    pub fn glyph_count(&self) -> usize {
        self.loca.num_glyphs()
    }

    pub fn config(&self) -> &GlyfConfig {
        &self.config
    }

    /// The curve mode in effect, taking `units_per_em` into account.
    pub fn curve_mode(&self) -> CurveMode {
        if self.config.units_per_em < 1000 {
            CurveMode::Exact
        } else {
            self.config.curve_mode
        }
    }

    /// Read `glyph_id` and deliver it to `sink`.
    ///
    /// Returns `None` if the sink skipped the glyph. The whole outline is decoded before the sink
    /// sees any of it, so an error never leaves a partial path behind.
    pub fn get_glyph<S: OutlineSink>(
        &self,
        glyph_id: GlyphId,
        sink: &mut S,
    ) -> Result<Option<GlyfMetrics>, GlyfError> {
        let info = GlyphInfo {
            glyph_id,
            sid: None,
            cid: None,
            font_dict_index: None,
        };
        let begin = sink.begin_glyph(&info);
        match begin {
            BeginGlyph::Continue | BeginGlyph::WidthOnly => {}
            BeginGlyph::Skip => return Ok(None),
            BeginGlyph::Quit => return Err(GlyfError::Quit),
            BeginGlyph::Fail => return Err(GlyfError::SinkFailed),
        }

        let outline = self.glyph_outline(glyph_id)?;
        let advance = self.advance(glyph_id, &outline);
        if let Some(advance) = advance {
            sink.width(advance);
        }
        if begin == BeginGlyph::WidthOnly {
            sink.end_glyph();
            return Ok(Some(GlyfMetrics {
                advance,
                bbox: None,
            }));
        }

        outline::draw_outline(&outline, self.curve_mode(), sink);
        sink.end_glyph();
        Ok(Some(GlyfMetrics {
            advance,
            bbox: outline.bounds(),
        }))
    }

    /// The composed and varied points of `glyph_id`.
    pub fn glyph_outline(&self, glyph_id: GlyphId) -> Result<GlyphOutline, ParseError> {
        self.load_outline(glyph_id, 0)
    }

    /// Read the glyph record of `glyph_id`, or `None` if the glyph is empty.
    pub fn read_glyph(&self, glyph_id: GlyphId) -> Result<Option<Glyph<'a>>, ParseError> {
        let range = self.loca.glyph_range(glyph_id)?;
        if range.is_empty() {
            return Ok(None);
        }
        match self.glyf.offset_length(range.start, range.len()) {
            Ok(scope) => scope.read::<Glyph<'_>>().map(Some),
            Err(ParseError::BadEof) => {
                // The length given by `loca` runs past the end of `glyf`. Some fonts get the
                // last offset wrong but still hold a valid glyph, so try without the limit.
                warn!("glyph {} length out of bounds, trying to parse", glyph_id);
                self.glyf.offset(range.start).read::<Glyph<'_>>().map(Some)
            }
            Err(err) => Err(err),
        }
    }

    fn advance(&self, glyph_id: GlyphId, outline: &GlyphOutline) -> Option<f32> {
        let metrics = self.metrics.as_ref()?.horizontal_metrics(glyph_id)?;
        if self.config.hmetrics_via_variation {
            let [origin, advance, _, _] = outline.phantom_points;
            Some(advance.x() - origin.x())
        } else {
            Some(f32::from(metrics.advance_width))
        }
    }

    fn load_outline(&self, glyph_id: GlyphId, depth: u16) -> Result<GlyphOutline, ParseError> {
        if depth > COMPOSITE_GLYPH_RECURSION_LIMIT {
            return Err(ParseError::LimitExceeded);
        }

        match self.read_glyph(glyph_id)? {
            None => self.simple_outline(glyph_id, 0, Vec::new(), Vec::new()),
            Some(Glyph {
                bounding_box,
                data: GlyphData::Simple(glyph),
                ..
            }) => {
                let points = glyph
                    .coordinates
                    .iter()
                    .zip(&glyph.flags)
                    .map(|(&Point(x, y), flag)| GlyfPoint {
                        x: f32::from(x),
                        y: f32::from(y),
                        on_curve: flag.is_on_curve(),
                    })
                    .collect();
                let contour_ends = glyph
                    .end_pts_of_contours
                    .iter()
                    .map(|&end| usize::from(end) + 1)
                    .collect();
                self.simple_outline(glyph_id, bounding_box.x_min, points, contour_ends)
            }
            Some(Glyph {
                bounding_box,
                data: GlyphData::Composite { components, .. },
                ..
            }) => self.composite_outline(glyph_id, bounding_box.x_min, &components, depth),
        }
    }

    fn simple_outline(
        &self,
        glyph_id: GlyphId,
        x_min: i16,
        mut points: Vec<GlyfPoint>,
        contour_ends: Vec<usize>,
    ) -> Result<GlyphOutline, ParseError> {
        let mut phantom_points = self.phantom_points(glyph_id, x_min);
        if let Some(deltas) = self.deltas(glyph_id, &points, &contour_ends)? {
            for (point, delta) in points.iter_mut().zip(&deltas) {
                point.x += delta.x();
                point.y += delta.y();
            }
            for (point, delta) in phantom_points.iter_mut().zip(&deltas[points.len()..]) {
                *point = *point + *delta;
            }
        }
        Ok(GlyphOutline {
            points,
            contour_ends,
            phantom_points,
        })
    }

    fn composite_outline(
        &self,
        glyph_id: GlyphId,
        x_min: i16,
        components: &[CompositeGlyphComponent],
        depth: u16,
    ) -> Result<GlyphOutline, ParseError> {
        // Each component contributes one point, its offset, to the variation data
        let mut offsets = components
            .iter()
            .map(|component| {
                let (x, y) = if component.flags.args_are_xy_values() {
                    (
                        i32::from(component.argument1) as f32,
                        i32::from(component.argument2) as f32,
                    )
                } else {
                    (0.0, 0.0)
                };
                GlyfPoint {
                    x,
                    y,
                    on_curve: true,
                }
            })
            .collect::<Vec<_>>();
        let mut phantom_points = self.phantom_points(glyph_id, x_min);
        if let Some(deltas) = self.deltas(glyph_id, &offsets, &[])? {
            for ((offset, component), delta) in offsets.iter_mut().zip(components).zip(&deltas) {
                if component.flags.args_are_xy_values() {
                    offset.x += delta.x();
                    offset.y += delta.y();
                }
            }
            for (point, delta) in phantom_points.iter_mut().zip(&deltas[offsets.len()..]) {
                *point = *point + *delta;
            }
        }

        let mut outline = GlyphOutline {
            points: Vec::new(),
            contour_ends: Vec::new(),
            phantom_points,
        };
        for (component, offset) in components.iter().zip(&offsets) {
            let child = self.load_outline(component.glyph_index, depth + 1)?;
            let matrix = component
                .scale
                .map_or(Matrix2x2F::from_scale(1.0), Matrix2x2F::from);
            let mut points = child
                .points
                .iter()
                .map(|point| {
                    let transformed = matrix * vec2f(point.x, point.y);
                    GlyfPoint {
                        x: transformed.x(),
                        y: transformed.y(),
                        on_curve: point.on_curve,
                    }
                })
                .collect::<Vec<_>>();

            let translation = if component.flags.args_are_xy_values() {
                let offset = vec2f(offset.x, offset.y);
                if component.flags.scaled_component_offset() {
                    matrix * offset
                } else {
                    offset
                }
            } else {
                // Point matching: the child's point `argument2` lands on the parent's point
                // `argument1`, where the parent's points are those of the preceding components.
                let parent = usize::try_from(i32::from(component.argument1))?;
                let child_point = usize::try_from(i32::from(component.argument2))?;
                let parent = outline.points.get(parent).ok_or(ParseError::BadIndex)?;
                let child_point = points.get(child_point).ok_or(ParseError::BadIndex)?;
                vec2f(parent.x - child_point.x, parent.y - child_point.y)
            };
            for point in points.iter_mut() {
                point.x += translation.x();
                point.y += translation.y();
            }

            let base = outline.points.len();
            outline
                .contour_ends
                .extend(child.contour_ends.iter().map(|end| base + end));
            outline.points.extend(points);
            if component.flags.use_my_metrics() {
                outline.phantom_points = child.phantom_points;
            }
        }

        Ok(outline)
    }

    fn phantom_points(&self, glyph_id: GlyphId, x_min: i16) -> [Vector2F; 4] {
        let metrics = self
            .metrics
            .as_ref()
            .and_then(|metrics| metrics.horizontal_metrics(glyph_id))
            .unwrap_or(LongHorMetric {
                advance_width: 0,
                lsb: x_min,
            });
        let origin = f32::from(x_min) - f32::from(metrics.lsb);
        [
            vec2f(origin, 0.0),
            vec2f(origin + f32::from(metrics.advance_width), 0.0),
            Vector2F::zero(),
            Vector2F::zero(),
        ]
    }

    /// Deltas for `points` followed by the four phantom points, or `None` if nothing varies.
    fn deltas(
        &self,
        glyph_id: GlyphId,
        points: &[GlyfPoint],
        contour_ends: &[usize],
    ) -> Result<Option<Vec<Vector2F>>, ParseError> {
        match &self.gvar {
            Some(gvar) if self.coords.iter().any(|coord| coord.raw_value() != 0) => {
                variation::glyph_deltas(gvar, glyph_id, &self.coords, points, contour_ends)
            }
            _ => Ok(None),
        }
    }
}

impl fmt::Debug for TrueTypeGlyphReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrueTypeGlyphReader")
            .field("glyph_count", &self.glyph_count())
            .field("gvar", &self.gvar.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("config", &self.config)
            .field("coords", &self.coords)
            .finish()
    }
}

impl TrueTypeTables {
    /// Load the glyph tables of the sfnt font in `source`.
    pub fn load<S: ByteSource>(source: S) -> Result<Self, ParseError> {
        let mut cursor = SourceCursor::new(source)?;
        let directory = SfntDirectory::load(&mut cursor)?;
        Self::load_from(&mut cursor, &directory)
    }

    /// Load the glyph tables found by `locator`.
    pub fn load_from<S: ByteSource, L: TableLocator>(
        cursor: &mut SourceCursor<S>,
        locator: &L,
    ) -> Result<Self, ParseError> {
        let head_data = locator.require(tag::HEAD)?.load(cursor)?;
        let head = ReadScope::new(&head_data).read::<HeadTable>()?;
        let maxp_data = locator.require(tag::MAXP)?.load(cursor)?;
        let maxp = ReadScope::new(&maxp_data).read::<MaxpTable>()?;
        let loca = locator.require(tag::LOCA)?.load(cursor)?;
        let glyf = locator.require(tag::GLYF)?.load(cursor)?;
        let gvar = locator
            .locate(tag::GVAR)
            .map(|range| range.load(cursor))
            .transpose()?;
        let hhea = locator
            .locate(tag::HHEA)
            .map(|range| {
                let data = range.load(cursor)?;
                ReadScope::new(&data).read::<HheaTable>()
            })
            .transpose()?;
        let hmtx = match hhea {
            Some(_) => locator
                .locate(tag::HMTX)
                .map(|range| range.load(cursor))
                .transpose()?,
            None => None,
        };

        Ok(TrueTypeTables {
            head,
            maxp,
            hhea,
            loca,
            glyf,
            gvar,
            hmtx,
        })
    }

    /// A reader over these tables. `units_per_em` in `config` is taken from `head`.
    pub fn reader(&self, config: GlyfConfig) -> Result<TrueTypeGlyphReader<'_>, ParseError> {
        let loca = ReadScope::new(&self.loca).read_dep::<LocaTable<'_>>((
            self.maxp.num_glyphs,
            self.head.index_to_loc_format,
        ))?;
        let config = GlyfConfig {
            units_per_em: self.head.units_per_em,
            ..config
        };
        let mut reader = TrueTypeGlyphReader::new(&self.glyf, loca, config);
        if let Some(gvar) = &self.gvar {
            reader = reader.with_gvar(ReadScope::new(gvar).read::<GvarTable<'_>>()?)?;
        }
        if let (Some(hhea), Some(hmtx)) = (&self.hhea, &self.hmtx) {
            let hmtx = ReadScope::new(hmtx).read_dep::<HmtxTable<'_>>((
                usize::from(self.maxp.num_glyphs),
                usize::from(hhea.num_h_metrics),
            ))?;
            reader = reader.with_metrics(hmtx);
        }
        Ok(reader)
    }
}

impl GlyphOutline {
    /// The points of each contour.
    pub fn contours(&self) -> impl Iterator<Item = &[GlyfPoint]> {
        self.contour_ends.iter().scan(0, move |start, &end| {
            let contour = self.points.get(*start..end);
            *start = end;
            contour
        })
    }

    pub fn bounds(&self) -> Option<RectF> {
        let (first, rest) = self.points.split_first()?;
        let first = vec2f(first.x, first.y);
        let rect = rest.iter().fold(RectF::new(first, Vector2F::zero()), |rect, point| {
            rect.union_point(vec2f(point.x, point.y))
        });
        Some(rect)
    }
}

impl ReadBinary for Glyph<'_> {
    type HostType<'a> = Glyph<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Glyph<'a>, ParseError> {
        let number_of_contours = ctxt.read_i16be()?;
        let bounding_box = ctxt.read::<BoundingBox>()?;

        if number_of_contours >= 0 {
            // Simple glyph
            // Cast is safe as we've checked value is positive above
            let glyph = ctxt.read_dep::<SimpleGlyph<'_>>(number_of_contours as u16)?;

            Ok(Glyph {
                number_of_contours,
                bounding_box,
                data: GlyphData::Simple(glyph),
            })
        } else {
            // Composite glyph
            let (components, have_instructions) = read_components(ctxt)?;
            let instruction_length = if have_instructions {
                usize::from(ctxt.read::<U16Be>()?)
            } else {
                0
            };
            let instructions = ctxt.read_slice(instruction_length)?;

            Ok(Glyph {
                number_of_contours,
                bounding_box,
                data: GlyphData::Composite {
                    components,
                    instructions,
                },
            })
        }
    }
}

impl ReadBinaryDep for SimpleGlyph<'_> {
    type Args<'a> = u16;
    type HostType<'a> = SimpleGlyph<'a>;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        number_of_contours: u16,
    ) -> Result<SimpleGlyph<'a>, ParseError> {
        let number_of_contours = usize::from(number_of_contours);
        let end_pts_of_contours = ctxt.read_array::<U16Be>(number_of_contours)?.to_vec();
        // Each contour must end after the previous one
        let mut next_start = 0;
        for &end in &end_pts_of_contours {
            let end = usize::from(end);
            if end < next_start {
                return Err(ParseError::BadValue);
            }
            next_start = end + 1;
        }
        let instruction_length = ctxt.read::<U16Be>()?;
        let instructions = ctxt.read_slice(usize::from(instruction_length))?;
        // end_pts_of_contours stores the index of the end points.
        // Therefore the number of coordinates is the last index + 1
        let number_of_coordinates = next_start;

        // Read all the flags
        let mut flags = Vec::with_capacity(number_of_coordinates);
        while flags.len() < number_of_coordinates {
            let flag = ctxt.read::<SimpleGlyphFlag>()?;
            if flag.is_repeated() {
                let count = usize::from(ctxt.read::<U8>()?) + 1; // + 1 to include the current entry
                flags.extend(iter::repeat(flag).take(count))
            } else {
                flags.push(flag);
            }
        }
        // A repeat may run past the last point
        flags.truncate(number_of_coordinates);

        // Read the x coordinates
        let mut coordinates = flags
            .iter()
            .map(|flag| {
                if flag.x_is_short() {
                    ctxt.read::<U8>()
                        .map(|val| i16::from(val) * flag.x_short_sign())
                } else if flag.x_is_same_or_positive() {
                    Ok(0)
                } else {
                    ctxt.read::<I16Be>()
                }
                .map(|x| Point(x, 0))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Read y coordinates, updating the Points in `coordinates`
        let mut prev_point = Point(0, 0);
        for (flag, point) in flags.iter().zip(coordinates.iter_mut()) {
            let y = if flag.y_is_short() {
                ctxt.read::<U8>()
                    .map(|val| i16::from(val) * flag.y_short_sign())?
            } else if flag.y_is_same_or_positive() {
                0
            } else {
                ctxt.read::<I16Be>()?
            };

            // The x and y coordinates are stored as deltas against the previous point, with the
            // first one being implicitly against (0, 0). Here we resolve these deltas into
            // absolute (x, y) values.
            prev_point = Point(
                prev_point.0.wrapping_add(point.0),
                prev_point.1.wrapping_add(y),
            );
            *point = prev_point
        }

        Ok(SimpleGlyph {
            end_pts_of_contours,
            instructions,
            flags,
            coordinates,
        })
    }
}

impl ReadFrom for SimpleGlyphFlag {
    type ReadType = U8;

    fn read_from(flag: u8) -> Self {
        SimpleGlyphFlag::from_bits_truncate(flag)
    }
}

fn read_components(
    ctxt: &mut ReadCtxt<'_>,
) -> Result<(Vec<CompositeGlyphComponent>, bool), ParseError> {
    let mut have_instructions = false;
    let mut components = Vec::new();
    loop {
        let flags = ctxt.read::<CompositeGlyphFlag>()?;
        let component = ctxt.read_dep::<CompositeGlyphComponent>(flags)?;

        if flags.we_have_instructions() {
            have_instructions = true;
        }

        components.push(component);

        if !flags.more_components() {
            break;
        }
    }

    Ok((components, have_instructions))
}

impl SimpleGlyphFlag {
    pub fn is_on_curve(self) -> bool {
        self.contains(Self::ON_CURVE_POINT)
    }

    pub fn x_is_short(self) -> bool {
        self.contains(Self::X_SHORT_VECTOR)
    }

    pub fn y_is_short(self) -> bool {
        self.contains(Self::Y_SHORT_VECTOR)
    }

    pub fn is_repeated(self) -> bool {
        self.contains(Self::REPEAT_FLAG)
    }

    pub fn x_short_sign(self) -> i16 {
        if self.x_is_same_or_positive() {
            1
        } else {
            -1
        }
    }

    pub fn y_short_sign(self) -> i16 {
        if self.y_is_same_or_positive() {
            1
        } else {
            -1
        }
    }

    pub fn x_is_same_or_positive(self) -> bool {
        self.contains(Self::X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR)
    }

    pub fn y_is_same_or_positive(self) -> bool {
        self.contains(Self::Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR)
    }
}

impl ReadFrom for CompositeGlyphFlag {
    type ReadType = U16Be;

    fn read_from(flag: u16) -> Self {
        CompositeGlyphFlag::from_bits_truncate(flag)
    }
}

impl ReadBinaryDep for CompositeGlyphArgument {
    type Args<'a> = CompositeGlyphFlag;
    type HostType<'a> = Self;

    fn read_dep(ctxt: &mut ReadCtxt<'_>, flags: CompositeGlyphFlag) -> Result<Self, ParseError> {
        let arg = match (flags.arg_1_and_2_are_words(), flags.args_are_xy_values()) {
            (true, true) => CompositeGlyphArgument::I16(ctxt.read_i16be()?),
            (true, false) => CompositeGlyphArgument::U16(ctxt.read_u16be()?),
            (false, true) => CompositeGlyphArgument::I8(ctxt.read_i8()?),
            (false, false) => CompositeGlyphArgument::U8(ctxt.read_u8()?),
        };

        Ok(arg)
    }
}

impl ReadBinaryDep for CompositeGlyphComponent {
    type Args<'a> = CompositeGlyphFlag;
    type HostType<'a> = Self;

    fn read_dep(ctxt: &mut ReadCtxt<'_>, flags: CompositeGlyphFlag) -> Result<Self, ParseError> {
        let glyph_index = ctxt.read_u16be()?;
        let argument1 = ctxt.read_dep::<CompositeGlyphArgument>(flags)?;
        let argument2 = ctxt.read_dep::<CompositeGlyphArgument>(flags)?;

        let scale = if flags.we_have_a_scale() {
            Some(CompositeGlyphScale::Scale(ctxt.read::<F2Dot14>()?))
        } else if flags.we_have_an_x_and_y_scale() {
            Some(CompositeGlyphScale::XY {
                x_scale: ctxt.read::<F2Dot14>()?,
                y_scale: ctxt.read::<F2Dot14>()?,
            })
        } else if flags.we_have_a_two_by_two() {
            Some(CompositeGlyphScale::Matrix([
                [ctxt.read::<F2Dot14>()?, ctxt.read::<F2Dot14>()?],
                [ctxt.read::<F2Dot14>()?, ctxt.read::<F2Dot14>()?],
            ]))
        } else {
            None
        };

        Ok(CompositeGlyphComponent {
            flags,
            glyph_index,
            argument1,
            argument2,
            scale,
        })
    }
}

impl ReadBinary for BoundingBox {
    type HostType<'a> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let x_min = ctxt.read::<I16Be>()?;
        let y_min = ctxt.read::<I16Be>()?;
        let x_max = ctxt.read::<I16Be>()?;
        let y_max = ctxt.read::<I16Be>()?;

        Ok(BoundingBox {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }
}

impl CompositeGlyphFlag {
    pub fn arg_1_and_2_are_words(self) -> bool {
        self.contains(Self::ARG_1_AND_2_ARE_WORDS)
    }

    pub fn args_are_xy_values(self) -> bool {
        self.contains(Self::ARGS_ARE_XY_VALUES)
    }

    pub fn we_have_a_scale(self) -> bool {
        self.contains(Self::WE_HAVE_A_SCALE)
    }

    pub fn we_have_an_x_and_y_scale(self) -> bool {
        self.contains(Self::WE_HAVE_AN_X_AND_Y_SCALE)
    }

    pub fn we_have_a_two_by_two(self) -> bool {
        self.contains(Self::WE_HAVE_A_TWO_BY_TWO)
    }

    pub fn more_components(self) -> bool {
        self.contains(Self::MORE_COMPONENTS)
    }

    pub fn we_have_instructions(self) -> bool {
        self.contains(Self::WE_HAVE_INSTRUCTIONS)
    }

    pub fn use_my_metrics(self) -> bool {
        self.contains(Self::USE_MY_METRICS)
    }

    /// Set when the component offset is transformed along with the points. Unscaled is the
    /// default when neither flag is given.
    pub fn scaled_component_offset(self) -> bool {
        self.contains(Self::SCALED_COMPONENT_OFFSET)
            && !self.contains(Self::UNSCALED_COMPONENT_OFFSET)
    }
}

impl From<CompositeGlyphArgument> for i32 {
    fn from(arg: CompositeGlyphArgument) -> Self {
        match arg {
            CompositeGlyphArgument::U8(value) => i32::from(value),
            CompositeGlyphArgument::I8(value) => i32::from(value),
            CompositeGlyphArgument::U16(value) => i32::from(value),
            CompositeGlyphArgument::I16(value) => i32::from(value),
        }
    }
}

impl From<CompositeGlyphScale> for Matrix2x2F {
    fn from(scale: CompositeGlyphScale) -> Self {
        match scale {
            CompositeGlyphScale::Scale(scale) => Matrix2x2F::from_scale(f32::from(scale)),
            CompositeGlyphScale::XY { x_scale, y_scale } => {
                Matrix2x2F::from_scale(vec2f(f32::from(x_scale), f32::from(y_scale)))
            }
            // Stored as xscale, scale01, scale10, yscale where
            // x' = xscale * x + scale10 * y and y' = scale01 * x + yscale * y
            CompositeGlyphScale::Matrix([[xx, xy], [yx, yy]]) => Matrix2x2F::row_major(
                f32::from(xx),
                f32::from(yx),
                f32::from(xy),
                f32::from(yy),
            ),
        }
    }
}

impl From<ParseError> for GlyfError {
    fn from(error: ParseError) -> GlyfError {
        GlyfError::ParseError(error)
    }
}

impl fmt::Display for GlyfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlyfError::ParseError(error) => write!(f, "glyf: {}", error),
            GlyfError::Quit => write!(f, "glyph processing stopped by the sink"),
            GlyfError::SinkFailed => write!(f, "the sink failed"),
        }
    }
}

impl std::error::Error for GlyfError {}
