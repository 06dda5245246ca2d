//! Blending of CFF2 operands for variable fonts.
//!
//! The `blend` operator, in DICTs and charstrings alike, replaces a default value and one delta
//! per variation region with the value at the current location in design space.

use tinyvec::TinyVec;

use crate::error::ParseError;
use crate::tables::variable_fonts::ItemVariationStore;
use crate::tables::F2Dot14;

/// Region scalars for one ItemVariationData subtable.
pub type Scalars = TinyVec<[f32; 8]>;

/// Source of the region scalars a [Blender] applies.
pub trait RegionStore {
    fn region_count(&self, vsindex: u16) -> Result<u16, ParseError>;

    fn region_scalars(&self, vsindex: u16, coords: &[F2Dot14]) -> Result<Scalars, ParseError>;
}

impl RegionStore for ItemVariationStore<'_> {
    fn region_count(&self, vsindex: u16) -> Result<u16, ParseError> {
        ItemVariationStore::region_count(self, vsindex)
    }

    fn region_scalars(&self, vsindex: u16, coords: &[F2Dot14]) -> Result<Scalars, ParseError> {
        ItemVariationStore::region_scalars(self, vsindex, coords)
    }
}

/// Resolves blends against an ItemVariationStore at a normalised location.
#[derive(Copy, Clone)]
pub struct Blender<'a> {
    store: &'a (dyn RegionStore + 'a),
    coords: &'a [F2Dot14],
}

/// A blended operand: the default value, its per-region deltas, and the resolved value.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendValue {
    pub default: f64,
    pub deltas: TinyVec<[f64; 4]>,
    pub value: f64,
}

impl<'a> Blender<'a> {
    pub fn new(store: &'a ItemVariationStore<'_>, coords: &'a [F2Dot14]) -> Self {
        Blender { store, coords }
    }

    /// The number of regions (deltas per blended value) of `vsindex`.
    pub fn region_count(&self, vsindex: u16) -> Result<usize, ParseError> {
        self.store.region_count(vsindex).map(usize::from)
    }

    /// The scalar of each region of `vsindex` at the location of this blender.
    pub fn scalars(&self, vsindex: u16) -> Result<Scalars, ParseError> {
        self.store.region_scalars(vsindex, self.coords)
    }

    /// The normalised location blends are resolved at.
    pub fn coords(&self) -> &'a [F2Dot14] {
        self.coords
    }
}

impl BlendValue {
    /// Blend `default` with one delta per entry in `scalars`.
    pub fn new(default: f64, deltas: &[f64], scalars: &[f32]) -> Self {
        let value = default
            + deltas
                .iter()
                .zip(scalars)
                .map(|(delta, scalar)| delta * f64::from(*scalar))
                .sum::<f64>();
        BlendValue {
            default,
            deltas: deltas.iter().copied().collect(),
            value,
        }
    }

    /// A value with no deltas.
    pub fn constant(value: f64) -> Self {
        BlendValue {
            default: value,
            deltas: TinyVec::new(),
            value,
        }
    }

    /// Sum of two values, adding deltas region by region.
    pub fn add(&self, other: &BlendValue) -> BlendValue {
        let len = self.deltas.len().max(other.deltas.len());
        let deltas = (0..len)
            .map(|i| {
                self.deltas.get(i).copied().unwrap_or(0.0)
                    + other.deltas.get(i).copied().unwrap_or(0.0)
            })
            .collect();
        BlendValue {
            default: self.default + other.default,
            deltas,
            value: self.value + other.value,
        }
    }
}

/// Pop a blend from `operands`, a stack of `(default, deltas)` pairs.
///
/// The last operand is the count `n`. It is preceded by `n` defaults and then `n * regions`
/// deltas. The `n` blended values are returned in order.
pub fn blend_operands(
    operands: &[f64],
    region_count: usize,
    scalars: &[f32],
) -> Result<Vec<BlendValue>, ParseError> {
    let (&n, rest) = operands.split_last().ok_or(ParseError::MissingValue)?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(ParseError::BadValue);
    }
    let n = n as usize;
    let needed = n
        .checked_mul(region_count + 1)
        .ok_or(ParseError::LimitExceeded)?;
    if rest.len() < needed {
        return Err(ParseError::MissingValue);
    }
    let operands = &rest[rest.len() - needed..];
    let (defaults, deltas) = operands.split_at(n);
    Ok(defaults
        .iter()
        .enumerate()
        .map(|(i, default)| {
            let deltas = &deltas[i * region_count..(i + 1) * region_count];
            BlendValue::new(*default, deltas, scalars)
        })
        .collect())
}
