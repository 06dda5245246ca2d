//! Applying `gvar` deltas to glyph points.
//!
//! <https://learn.microsoft.com/en-us/typography/opentype/spec/gvar>

use itertools::Itertools;
use pathfinder_geometry::vector::{vec2f, Vector2F};

use super::GlyfPoint;
use crate::error::ParseError;
use crate::tables::variable_fonts::gvar::{GvarTable, NumPoints};
use crate::tables::F2Dot14;
use crate::SafeFrom;

/// The number of phantom points that follow the outline points.
const PHANTOM_POINT_COUNT: usize = 4;

/// Compute the deltas for `points` of `glyph_id` at `coords`.
///
/// The result holds one delta per point followed by one for each phantom point. `None` is
/// returned if the glyph has no variation data.
pub(crate) fn glyph_deltas(
    gvar: &GvarTable<'_>,
    glyph_id: u16,
    coords: &[F2Dot14],
    points: &[GlyfPoint],
    contour_ends: &[usize],
) -> Result<Option<Vec<Vector2F>>, ParseError> {
    let num_points = NumPoints::new(u16::try_from(points.len())?);
    let Some(store) = gvar.glyph_variation_data(glyph_id, num_points)? else {
        return Ok(None);
    };

    let total = points.len() + PHANTOM_POINT_COUNT;
    let mut deltas = vec![Vector2F::zero(); total];
    let mut tuple_deltas: Vec<Option<Vector2F>> = Vec::with_capacity(total);
    for header in store.headers() {
        let scalar = gvar.tuple_scalar(header, coords)?;
        if scalar == 0. {
            continue;
        }
        let data = header.variation_data(num_points.get(), store.shared_point_numbers())?;

        if data.covers_all_points() {
            for (point, (x, y)) in data.iter() {
                let delta = deltas
                    .get_mut(usize::safe_from(point))
                    .ok_or(ParseError::BadIndex)?;
                *delta = *delta + vec2f(f32::from(x), f32::from(y)) * scalar;
            }
            continue;
        }

        tuple_deltas.clear();
        tuple_deltas.resize(total, None);
        for (point, (x, y)) in data.iter() {
            let delta = tuple_deltas
                .get_mut(usize::safe_from(point))
                .ok_or(ParseError::BadIndex)?;
            *delta = Some(vec2f(f32::from(x), f32::from(y)));
        }

        // Untouched outline points take deltas inferred from their neighbours. Phantom points
        // are never inferred.
        let mut start = 0;
        for &end in contour_ends {
            if end > points.len() || end < start {
                return Err(ParseError::BadIndex);
            }
            infer_contour(&points[start..end], &mut tuple_deltas[start..end]);
            start = end;
        }

        for (delta, tuple_delta) in deltas.iter_mut().zip(&tuple_deltas) {
            if let Some(tuple_delta) = tuple_delta {
                *delta = *delta + *tuple_delta * scalar;
            }
        }
    }

    Ok(Some(deltas))
}

/// Fill in the deltas of the untouched points of one contour.
fn infer_contour(points: &[GlyfPoint], deltas: &mut [Option<Vector2F>]) {
    let touched = deltas
        .iter()
        .positions(|delta| delta.is_some())
        .collect::<Vec<_>>();
    match touched.as_slice() {
        [] => {}
        &[only] => {
            let shift = deltas[only];
            deltas.iter_mut().for_each(|delta| *delta = shift);
        }
        _ => {
            for (prev, next) in touched.iter().copied().circular_tuple_windows() {
                // Points strictly between `prev` and `next`, wrapping around the contour
                let untouched = (prev + 1..)
                    .map(|index| index % points.len())
                    .take_while(|&index| index != next);
                for target in untouched.collect::<Vec<_>>() {
                    deltas[target] = infer_delta(points, deltas, target, prev, next);
                }
            }
        }
    }
}

fn infer_delta(
    points: &[GlyfPoint],
    deltas: &[Option<Vector2F>],
    target: usize,
    prev: usize,
    next: usize,
) -> Option<Vector2F> {
    let prev_delta = deltas[prev]?;
    let next_delta = deltas[next]?;
    let (prev_point, target_point, next_point) = (points[prev], points[target], points[next]);
    let x = do_infer(
        prev_point.x,
        target_point.x,
        next_point.x,
        prev_delta.x(),
        next_delta.x(),
    );
    let y = do_infer(
        prev_point.y,
        target_point.y,
        next_point.y,
        prev_delta.y(),
        next_delta.y(),
    );
    Some(vec2f(x, y))
}

fn do_infer(prev_coord: f32, target_coord: f32, next_coord: f32, prev_delta: f32, next_delta: f32) -> f32 {
    if prev_coord == next_coord {
        if prev_delta == next_delta {
            prev_delta
        } else {
            0.
        }
    } else if target_coord <= prev_coord.min(next_coord) {
        if prev_coord < next_coord {
            prev_delta
        } else {
            next_delta
        }
    } else if target_coord >= prev_coord.max(next_coord) {
        if prev_coord > next_coord {
            prev_delta
        } else {
            next_delta
        }
    } else {
        // The target lies between the two, so interpolate. The coordinates differ here.
        let proportion = (target_coord - prev_coord) / (next_coord - prev_coord);
        (1. - proportion) * prev_delta + proportion * next_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::tests::writer::{GvarBuilder, GvarTuple};

    fn on(x: f32, y: f32) -> GlyfPoint {
        GlyfPoint {
            x,
            y,
            on_curve: true,
        }
    }

    fn square() -> Vec<GlyfPoint> {
        vec![on(0., 0.), on(0., 100.), on(100., 100.), on(100., 0.)]
    }

    #[test]
    fn infer_between_neighbours() {
        assert_eq!(do_infer(0., 50., 100., 10., 20.), 15.);
        // Outside the range takes the delta of the nearer neighbour
        assert_eq!(do_infer(0., -5., 100., 10., 20.), 10.);
        assert_eq!(do_infer(100., 150., 0., 10., 20.), 10.);
        // Same coordinate with different deltas gives no movement
        assert_eq!(do_infer(50., 70., 50., 10., 20.), 0.);
        assert_eq!(do_infer(50., 70., 50., 10., 10.), 10.);
    }

    #[test]
    fn single_touched_point_shifts_contour() {
        let points = square();
        let mut deltas = vec![None, Some(vec2f(5., -5.)), None, None];
        infer_contour(&points, &mut deltas);
        assert!(deltas.iter().all(|delta| *delta == Some(vec2f(5., -5.))));
    }

    #[test]
    fn untouched_contour_is_left_alone() {
        let points = square();
        let mut deltas = vec![None; 4];
        infer_contour(&points, &mut deltas);
        assert!(deltas.iter().all(Option::is_none));
    }

    #[test]
    fn private_point_numbers() {
        // Points 0 and 2 are opposite corners of the square
        let mut builder = GvarBuilder::new(1);
        builder.glyph(&[GvarTuple::embedded(
            &[1.0],
            Some(&[0, 2]),
            &[(0, 0), (20, 10)],
        )]);
        let data = builder.build();
        let gvar = ReadScope::new(&data).read::<GvarTable<'_>>().unwrap();

        let points = square();
        let deltas = glyph_deltas(&gvar, 0, &[F2Dot14::from_f32(1.0)], &points, &[4])
            .unwrap()
            .unwrap();
        assert_eq!(deltas.len(), 8);
        assert_eq!(deltas[0], vec2f(0., 0.));
        assert_eq!(deltas[2], vec2f(20., 10.));
        // (0, 100) takes x from point 0 and y from point 2
        assert_eq!(deltas[1], vec2f(0., 10.));
        // (100, 0) takes x from point 2 and y from point 0
        assert_eq!(deltas[3], vec2f(20., 0.));
        assert_eq!(deltas[4..], [Vector2F::zero(); 4]);

        let half = glyph_deltas(&gvar, 0, &[F2Dot14::from_f32(0.5)], &points, &[4])
            .unwrap()
            .unwrap();
        assert_eq!(half[2], vec2f(10., 5.));
    }

    #[test]
    fn point_number_out_of_range() {
        let mut builder = GvarBuilder::new(1);
        builder.glyph(&[GvarTuple::embedded(&[1.0], Some(&[0, 30]), &[(1, 1), (1, 1)])]);
        let data = builder.build();
        let gvar = ReadScope::new(&data).read::<GvarTable<'_>>().unwrap();
        let result = glyph_deltas(&gvar, 0, &[F2Dot14::from_f32(1.0)], &square(), &[4]);
        assert_eq!(result, Err(ParseError::BadIndex));
    }
}
