//! Ordered dark/clear resolution with polygon booleans.
//!
//! Consecutive primitives of the same polarity form a run. A dark run is
//! unioned into the accumulated shape, a clear run is subtracted from it.
//! Grouping is exact: with consistently oriented input, a `NonZero` union of
//! a whole run equals unioning its members one by one.

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;

use crate::gerber::Polarity;

use super::types::{signed_area, PolygonSet, Ring};

/// Accumulates primitive shapes in file order.
#[derive(Debug, Default)]
pub struct PolarityAccumulator {
    shapes: PolygonSet,
    run: PolygonSet,
    run_polarity: Polarity,
    operations: u32,
}

impl PolarityAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one primitive's shape with its polarity.
    pub fn push(&mut self, polarity: Polarity, shape: PolygonSet) {
        if shape.is_empty() {
            return;
        }
        if polarity != self.run_polarity && !self.run.is_empty() {
            self.flush();
        }
        self.run_polarity = polarity;
        self.run.extend(shape.into_iter().map(orient));
    }

    /// Number of boolean operations performed so far.
    pub const fn operations(&self) -> u32 {
        self.operations
    }

    /// Resolves the pending run and returns the final polygon set.
    pub fn finish(mut self) -> PolygonSet {
        self.flush();
        self.shapes
    }

    fn flush(&mut self) {
        let run = std::mem::take(&mut self.run);
        if run.is_empty() {
            return;
        }
        match self.run_polarity {
            Polarity::Dark => {
                self.shapes = if self.shapes.is_empty() {
                    union_all(&run)
                } else {
                    self.shapes
                        .overlay(&run, OverlayRule::Union, FillRule::NonZero)
                };
            }
            Polarity::Clear => {
                // A clear run with nothing painted yet has nothing to cut.
                if self.shapes.is_empty() {
                    return;
                }
                self.shapes = self
                    .shapes
                    .overlay(&run, OverlayRule::Difference, FillRule::NonZero);
            }
        }
        self.operations = self.operations.saturating_add(1);
    }
}

/// Union of every polygon in `shapes` under the non-zero rule.
pub fn union_all(shapes: &PolygonSet) -> PolygonSet {
    let empty = PolygonSet::new();
    shapes.overlay(&empty, OverlayRule::Subject, FillRule::NonZero)
}

/// Fill loose rings with the even-odd rule so nested rings become holes.
pub fn fill_even_odd(rings: Vec<Ring>) -> PolygonSet {
    let subject: PolygonSet = rings.into_iter().map(|ring| vec![ring]).collect();
    let empty = PolygonSet::new();
    subject.overlay(&empty, OverlayRule::Subject, FillRule::EvenOdd)
}

/// Subtract `cutter` from `shape`.
pub fn difference(shape: &PolygonSet, cutter: &PolygonSet) -> PolygonSet {
    shape.overlay(cutter, OverlayRule::Difference, FillRule::NonZero)
}

/// Outer ring counter-clockwise, holes clockwise.
fn orient(mut polygon: Vec<Ring>) -> Vec<Ring> {
    for (index, ring) in polygon.iter_mut().enumerate() {
        if (signed_area(ring) > 0.0) != (index == 0) {
            ring.reverse();
        }
    }
    polygon
}
