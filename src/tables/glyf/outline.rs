//! Delivering TrueType outlines to an `OutlineSink`.

use pathfinder_geometry::line_segment::LineSegment2F;
use pathfinder_geometry::vector::Vector2F;

use super::{CurveMode, GlyphOutline};
use crate::outline::OutlineSink;

use contour::{Contour, CurvePoint};

/// Quadratics turning by less than this are treated as straight.
const STRAIGHT_EPSILON: f32 = 1e-3;

/// Draw each contour of `outline` into `sink`.
pub(crate) fn draw_outline<S: OutlineSink>(outline: &GlyphOutline, mode: CurveMode, sink: &mut S) {
    for points in outline.contours() {
        if points.is_empty() {
            continue;
        }
        let contour = Contour::new(points);
        let mut pen = Pen {
            sink: &mut *sink,
            mode,
            pending: None,
        };

        // Determine origin of the contour and move to it
        let origin = contour.origin();
        pen.sink.move_to(origin);
        let mut current = origin;

        // Consume the stream of points...
        let mut points = contour.points();
        // It's assumed that the current location is on curve each time through this loop
        while let Some(next) = points.next() {
            match next {
                CurvePoint::OnCurve(to) | CurvePoint::Implied(to) => {
                    pen.line_to(to);
                    current = to;
                }
                CurvePoint::Control(control) => match points.next() {
                    Some(CurvePoint::OnCurve(to)) => {
                        pen.quad_to(current, control, to, false);
                        current = to;
                    }
                    Some(CurvePoint::Implied(to)) => {
                        pen.quad_to(current, control, to, true);
                        current = to;
                    }
                    // The Points iterator inserts an implied point between consecutive
                    // control points
                    Some(CurvePoint::Control(_)) => {}
                    None => {
                        // Wrap around to the first point
                        pen.quad_to(current, control, origin, false);
                        break;
                    }
                },
            }
        }

        pen.flush();
        pen.sink.close();
    }
}

/// A quadratic segment from `from` through `control` to `to`.
#[derive(Debug, Copy, Clone)]
struct Quad {
    from: Vector2F,
    control: Vector2F,
    to: Vector2F,
}

struct Pen<'s, S: OutlineSink> {
    sink: &'s mut S,
    mode: CurveMode,
    /// A quadratic ending at an implied point, held back so it can be merged with the next one.
    pending: Option<Quad>,
}

impl<S: OutlineSink> Pen<'_, S> {
    fn line_to(&mut self, to: Vector2F) {
        self.flush();
        self.sink.line_to(to);
    }

    fn quad_to(&mut self, from: Vector2F, control: Vector2F, to: Vector2F, implied: bool) {
        let quad = Quad { from, control, to };
        if self.mode == CurveMode::Exact {
            self.emit(quad);
            return;
        }

        match self.pending.take() {
            Some(first) => match merge_quadratics(first, quad) {
                Some((ctrl, to)) => self.sink.cubic_curve_to(ctrl, to),
                None => {
                    self.emit(first);
                    self.hold_or_emit(quad, implied);
                }
            },
            None => self.hold_or_emit(quad, implied),
        }
    }

    fn hold_or_emit(&mut self, quad: Quad, implied: bool) {
        if implied {
            self.pending = Some(quad);
        } else {
            self.emit(quad);
        }
    }

    fn flush(&mut self) {
        if let Some(quad) = self.pending.take() {
            self.emit(quad);
        }
    }

    fn emit(&mut self, quad: Quad) {
        let Quad { from, control, to } = quad;
        let ctrl0 = from + (control - from) * (2. / 3.);
        let ctrl1 = to + (control - to) * (2. / 3.);
        self.sink
            .cubic_curve_to(LineSegment2F::new(ctrl0, ctrl1), to);
    }
}

/// Replace two quadratics that meet at an implied point with a single cubic.
///
/// Only done when both bend the same way and the halves are of similar length, so the cubic
/// stays close to the pair it replaces.
fn merge_quadratics(first: Quad, second: Quad) -> Option<(LineSegment2F, Vector2F)> {
    let (a, b, m) = (first.from, first.control, first.to);
    let (c, d) = (second.control, second.to);

    let turn0 = (b - a).det(m - b);
    let turn1 = (c - m).det(d - c);
    if turn0.abs() < STRAIGHT_EPSILON
        || turn1.abs() < STRAIGHT_EPSILON
        || turn0.signum() != turn1.signum()
    {
        return None;
    }

    let first_length = (m - a).length();
    let second_length = (d - m).length();
    if first_length > 2. * second_length || second_length > 2. * first_length {
        return None;
    }

    let ctrl0 = a + (b - a) * (4. / 3.);
    let ctrl1 = d + (c - d) * (4. / 3.);
    Some((LineSegment2F::new(ctrl0, ctrl1), d))
}

mod contour {
    use pathfinder_geometry::vector::{vec2f, Vector2F};

    use crate::tables::glyf::GlyfPoint;

    pub struct Contour<'points> {
        points: &'points [GlyfPoint],
    }

    #[derive(Debug, PartialEq)]
    pub enum CurvePoint {
        OnCurve(Vector2F),
        Control(Vector2F),
        /// The on-curve mid point between two consecutive control points.
        Implied(Vector2F),
    }

    pub struct Points<'a, 'points> {
        contour: &'a Contour<'points>,
        i: usize,
        until: usize,
        mid: Option<Vector2F>,
    }

    impl<'points> Contour<'points> {
        /// `points` must not be empty.
        pub fn new(points: &'points [GlyfPoint]) -> Self {
            Contour { points }
        }

        pub fn origin(&self) -> Vector2F {
            self.calculate_origin().0
        }

        fn calculate_origin(&self) -> (Vector2F, usize, usize) {
            match (self.first(), self.last()) {
                (CurvePoint::Control(first), CurvePoint::Control(last)) => {
                    // Origin is the mid-point between first and last control points.
                    // Start on the first point
                    (first.lerp(last, 0.5), 0, self.len())
                }
                (CurvePoint::Control(_), CurvePoint::OnCurve(last) | CurvePoint::Implied(last)) => {
                    // Origin is the last point, so start on the first point and consider
                    // the last point already processed
                    (last, 0, self.len() - 1)
                }
                (CurvePoint::OnCurve(first) | CurvePoint::Implied(first), _) => {
                    // Origin is the first point, so start on the second point
                    (first, 1, self.len())
                }
            }
        }

        pub fn points<'a>(&'a self) -> Points<'a, 'points> {
            let (_, start, until) = self.calculate_origin();
            Points {
                contour: self,
                i: start,
                until,
                mid: None,
            }
        }

        fn first(&self) -> CurvePoint {
            self.get(0)
        }

        fn last(&self) -> CurvePoint {
            self.get(self.len().saturating_sub(1))
        }

        fn len(&self) -> usize {
            self.points.len()
        }

        fn get(&self, index: usize) -> CurvePoint {
            match self.points.get(index) {
                Some(point) if point.on_curve => CurvePoint::OnCurve(vec2f(point.x, point.y)),
                Some(point) => CurvePoint::Control(vec2f(point.x, point.y)),
                None => CurvePoint::OnCurve(Vector2F::zero()),
            }
        }
    }

    impl Iterator for Points<'_, '_> {
        type Item = CurvePoint;

        fn next(&mut self) -> Option<Self::Item> {
            if let Some(mid) = self.mid.take() {
                return Some(CurvePoint::Implied(mid));
            }

            if self.i >= self.until {
                return None;
            }

            let point = match self.contour.get(self.i) {
                CurvePoint::Control(control) => {
                    // Check the next point, wrapping around if needed
                    if let CurvePoint::Control(control2) =
                        self.contour.get((self.i + 1) % self.contour.len())
                    {
                        // Next point is a control point, yield mid point as on curve point
                        // after this one
                        self.mid = Some(control.lerp(control2, 0.5));
                    }
                    CurvePoint::Control(control)
                }
                point => point,
            };

            self.i += 1;
            Some(point)
        }
    }
}
