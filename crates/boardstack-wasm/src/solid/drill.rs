//! Drill subtraction.
//!
//! Every solid and every drill is a vertical prism, and a drill always
//! reaches past both caps of the solid it cuts, so the 3-D difference is the
//! planar difference of the footprints kept at the solid's heights. The
//! checks in [`subtract`] reject the cases where that equivalence does not
//! hold.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::DrillAlgorithm;
use crate::error::{BooleanError, BooleanResult};
use crate::geometry::polarity::{difference, union_all};
use crate::geometry::types::{signed_area, BoundingBox, PolygonSet};
use crate::geometry::{DrillFootprint, LayerShape};

use super::extrude::{DrillSolid, Solid};

const MIN_CUTTER_AREA: f64 = 1e-9;

/// Drill outcome totals.
///
/// Each bucket counts drill records, not physical holes: a routed slot is
/// split into one record per tool-radius segment and every segment is
/// counted on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillCounters {
    /// Records subtracted from every solid they touch.
    pub drilled: u32,
    /// Records left undrilled because a subtraction failed.
    pub failed: u32,
    /// Records filtered out or outside every solid, or not drilled by choice.
    pub skipped: u32,
}

impl DrillCounters {
    /// Sum of all buckets.
    pub const fn total(&self) -> u32 {
        self.drilled
            .saturating_add(self.failed)
            .saturating_add(self.skipped)
    }
}

/// Drills split into per-tick batches.
#[derive(Debug, Clone, Default)]
pub struct DrillPlan {
    algorithm: DrillAlgorithm,
    batches: Vec<Vec<DrillSolid>>,
    next: usize,
}

impl DrillPlan {
    /// Filter drills below `min_diameter` and split the rest into batches.
    ///
    /// Filtered drills, and every drill under [`DrillAlgorithm::Skip`], are
    /// counted as skipped in the returned counters.
    pub fn new(
        drills: Vec<DrillSolid>,
        algorithm: DrillAlgorithm,
        min_diameter: f64,
        batch_size: usize,
    ) -> (Self, DrillCounters) {
        let mut counters = DrillCounters::default();
        let (kept, small): (Vec<DrillSolid>, Vec<DrillSolid>) = drills
            .into_iter()
            .partition(|drill| drill.footprint.diameter >= min_diameter);
        counters.skipped = saturate(small.len());
        if !small.is_empty() {
            debug!(count = small.len(), min_diameter, "drills below minimum diameter skipped");
        }

        let batches = if algorithm == DrillAlgorithm::Skip {
            counters.skipped = counters.skipped.saturating_add(saturate(kept.len()));
            Vec::new()
        } else {
            let size = batch_size.max(1);
            let mut batches = Vec::with_capacity(kept.len().div_ceil(size));
            let mut remaining = kept.into_iter().peekable();
            while remaining.peek().is_some() {
                batches.push(remaining.by_ref().take(size).collect());
            }
            batches
        };

        (
            Self {
                algorithm,
                batches,
                next: 0,
            },
            counters,
        )
    }

    /// Number of batches, one tick each.
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Batches not yet drilled.
    pub fn remaining(&self) -> usize {
        self.batches.len().saturating_sub(self.next)
    }

    /// Whether every batch has been drilled.
    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    /// Drill the next batch into `solids`. The batch's cutters are released
    /// before returning.
    pub fn drill_next(&mut self, solids: &mut [Solid]) -> DrillCounters {
        let Some(slot) = self.batches.get_mut(self.next) else {
            return DrillCounters::default();
        };
        let batch = std::mem::take(slot);
        self.next += 1;
        match self.algorithm {
            DrillAlgorithm::PerPair => drill_per_pair(&batch, solids),
            DrillAlgorithm::Batched => drill_batched(&batch, solids),
            DrillAlgorithm::Skip => DrillCounters {
                skipped: saturate(batch.len()),
                ..DrillCounters::default()
            },
        }
    }
}

/// One subtraction per overlapping (solid, drill) pair. A drill's cuts are
/// committed only if every solid it touches accepts them.
fn drill_per_pair(batch: &[DrillSolid], solids: &mut [Solid]) -> DrillCounters {
    let mut counters = DrillCounters::default();
    for drill in batch {
        if let Err(err) = validate_cutter(&drill.footprint) {
            warn!(error = %err, "drill skipped as degenerate");
            tally(&mut counters, true, true);
            continue;
        }
        let cutter = vec![vec![drill.footprint.polygon.clone()]];
        let cutter_bounds = drill.footprint.bounds();
        let mut staged = Vec::new();
        let mut failed = false;
        for (index, solid) in solids.iter().enumerate() {
            if !solid.footprint.bounds().intersects(&cutter_bounds) {
                continue;
            }
            match cut(solid, &cutter, drill.z_min, drill.z_max) {
                Ok(shape) => staged.push((index, shape)),
                Err(err) => {
                    warn!(
                        role = solid.role.label(),
                        x = drill.footprint.center.x,
                        y = drill.footprint.center.y,
                        error = %err,
                        "drill subtraction failed; hole left undrilled"
                    );
                    failed = true;
                }
            }
        }
        let touched = failed || !staged.is_empty();
        if !failed {
            commit(solids, staged);
        }
        tally(&mut counters, touched, failed);
    }
    counters
}

/// One subtraction per solid with the union of the batch's cutters. The
/// results are committed only if every solid accepts the cut.
fn drill_batched(batch: &[DrillSolid], solids: &mut [Solid]) -> DrillCounters {
    let count = saturate(batch.len());
    let fail_all = |err: &BooleanError| {
        warn!(drills = count, error = %err, "batched drill subtraction failed; batch left undrilled");
        DrillCounters {
            failed: count,
            ..DrillCounters::default()
        }
    };

    let (Some(z_min), Some(z_max)) = (
        batch.iter().map(|d| d.z_min).reduce(f64::max),
        batch.iter().map(|d| d.z_max).reduce(f64::min),
    ) else {
        return DrillCounters::default();
    };
    if let Some(err) = batch
        .iter()
        .find_map(|drill| validate_cutter(&drill.footprint).err())
    {
        return fail_all(&err);
    }

    let cutters: PolygonSet = batch
        .iter()
        .map(|drill| vec![drill.footprint.polygon.clone()])
        .collect();
    let cutter = union_all(&cutters);
    let cutter_bounds = BoundingBox::of_polygons(&cutter);
    let mut touched = vec![false; batch.len()];
    let mut staged = Vec::new();
    for (index, solid) in solids.iter().enumerate() {
        let solid_bounds = solid.footprint.bounds();
        if !solid_bounds.intersects(&cutter_bounds) {
            continue;
        }
        for (drill, hit) in batch.iter().zip(touched.iter_mut()) {
            *hit |= solid_bounds.intersects(&drill.footprint.bounds());
        }
        match cut(solid, &cutter, z_min, z_max) {
            Ok(shape) => staged.push((index, shape)),
            Err(err) => return fail_all(&err),
        }
    }
    commit(solids, staged);

    let mut counters = DrillCounters::default();
    for hit in touched {
        tally(&mut counters, hit, false);
    }
    counters
}

fn commit(solids: &mut [Solid], staged: Vec<(usize, LayerShape)>) {
    for (index, shape) in staged {
        if let Some(solid) = solids.get_mut(index) {
            solid.footprint = shape;
        }
    }
}

fn tally(counters: &mut DrillCounters, touched: bool, failed: bool) {
    match (touched, failed) {
        (_, true) => counters.failed = counters.failed.saturating_add(1),
        (true, false) => counters.drilled = counters.drilled.saturating_add(1),
        (false, false) => counters.skipped = counters.skipped.saturating_add(1),
    }
}

/// Subtract a vertical cutter spanning `z_min..z_max` from `solid`.
///
/// # Errors
///
/// See [`cut`]; on error `solid` is unchanged.
pub fn subtract(solid: &mut Solid, cutter: &PolygonSet, z_min: f64, z_max: f64) -> BooleanResult<()> {
    solid.footprint = cut(solid, cutter, z_min, z_max)?;
    Ok(())
}

/// Footprint of `solid` after removing a vertical cutter spanning
/// `z_min..z_max`.
///
/// # Errors
///
/// - [`BooleanError::CoplanarFaces`] if the cutter does not reach strictly
///   past both caps of the solid.
/// - [`BooleanError::DegenerateCutter`] if the cutter has no area.
/// - [`BooleanError::NumericalError`] if the cutter or the result contains
///   non-finite coordinates.
pub fn cut(solid: &Solid, cutter: &PolygonSet, z_min: f64, z_max: f64) -> BooleanResult<LayerShape> {
    if !(z_min < solid.z_min && z_max > solid.z_max) {
        return Err(BooleanError::CoplanarFaces {
            details: format!(
                "cutter spans {z_min}..{z_max}, solid spans {}..{}",
                solid.z_min, solid.z_max
            ),
        });
    }
    if !all_finite(cutter) {
        return Err(BooleanError::NumericalError {
            details: "cutter has non-finite coordinates".to_string(),
        });
    }
    let area: f64 = cutter
        .iter()
        .flatten()
        .map(|ring| signed_area(ring).abs())
        .sum();
    if area < MIN_CUTTER_AREA {
        return Err(BooleanError::DegenerateCutter {
            details: format!("cutter area {area}"),
        });
    }

    let result = difference(&solid.footprint.polygons, cutter);
    if !all_finite(&result) {
        return Err(BooleanError::NumericalError {
            details: "difference produced non-finite coordinates".to_string(),
        });
    }
    Ok(LayerShape::from_polygons(result))
}

fn validate_cutter(footprint: &DrillFootprint) -> BooleanResult<()> {
    if footprint.is_valid() {
        Ok(())
    } else {
        Err(BooleanError::DegenerateCutter {
            details: format!(
                "drill at ({}, {}) with diameter {}",
                footprint.center.x, footprint.center.y, footprint.diameter
            ),
        })
    }
}

fn all_finite(polygons: &PolygonSet) -> bool {
    polygons
        .iter()
        .flatten()
        .flatten()
        .all(|[x, y]| x.is_finite() && y.is_finite())
}

fn saturate(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excellon::{DrillKind, DrillRecord};
    use crate::geometry::Point;
    use crate::layer::LayerRole;

    fn board() -> Vec<Solid> {
        let square = vec![vec![vec![
            [0.0, 0.0],
            [10.0, 0.0],
            [10.0, 10.0],
            [0.0, 10.0],
        ]]];
        vec![
            Solid::extrude(LayerRole::Outline, LayerShape::from_polygons(square.clone()), 1.6),
            Solid::extrude(LayerRole::TopCopper, LayerShape::from_polygons(square), 1.6),
        ]
    }

    fn drill(x: f64, y: f64, diameter: f64) -> DrillSolid {
        DrillSolid::extrude(
            DrillFootprint::from_record(&DrillRecord {
                tool: 1,
                diameter,
                position: Point::new(x, y),
                kind: DrillKind::Plunge,
            }),
            1.6,
        )
    }

    #[test]
    fn ut_dri_001_per_pair_drills_through_every_layer() {
        let mut solids = board();
        let (mut plan, skipped) =
            DrillPlan::new(vec![drill(5.0, 5.0, 0.8)], DrillAlgorithm::PerPair, 0.0, 64);
        assert_eq!(skipped.total(), 0);
        assert_eq!(plan.batch_count(), 1);
        let counters = plan.drill_next(&mut solids);
        assert_eq!(counters.drilled, 1);
        assert!(plan.is_done());
        for solid in &solids {
            assert_eq!(solid.footprint.hole_count(), 1);
            assert_eq!(solid.footprint.ring_count(), 2);
            assert!(solid.footprint.area() < 100.0 - 0.45);
        }
    }

    #[test]
    fn ut_dri_002_batched_matches_per_pair_area() {
        let drills = || vec![drill(2.0, 2.0, 0.8), drill(8.0, 8.0, 1.0), drill(2.0, 8.0, 0.6)];
        let mut per_pair = board();
        let mut batched = board();
        let (mut plan_a, _) = DrillPlan::new(drills(), DrillAlgorithm::PerPair, 0.0, 2);
        let (mut plan_b, _) = DrillPlan::new(drills(), DrillAlgorithm::Batched, 0.0, 2);
        assert_eq!(plan_a.batch_count(), 2);
        let mut a = DrillCounters::default();
        while !plan_a.is_done() {
            a.drilled += plan_a.drill_next(&mut per_pair).drilled;
        }
        let mut b = DrillCounters::default();
        while !plan_b.is_done() {
            b.drilled += plan_b.drill_next(&mut batched).drilled;
        }
        assert_eq!(a.drilled, 3);
        assert_eq!(b.drilled, 3);
        for (x, y) in per_pair.iter().zip(&batched) {
            assert!((x.footprint.area() - y.footprint.area()).abs() < 1e-6);
        }
    }

    #[test]
    fn ut_dri_003_min_diameter_filter_skips() {
        let mut solids = board();
        let (mut plan, counters) = DrillPlan::new(
            vec![drill(5.0, 5.0, 0.2), drill(3.0, 3.0, 0.8)],
            DrillAlgorithm::PerPair,
            0.3,
            64,
        );
        assert_eq!(counters.skipped, 1);
        let drilled = plan.drill_next(&mut solids);
        assert_eq!(drilled.drilled, 1);
        assert!(solids.iter().all(|s| s.footprint.hole_count() == 1));
    }

    #[test]
    fn ut_dri_004_skip_algorithm_counts_everything_skipped() {
        let (plan, counters) = DrillPlan::new(
            vec![drill(5.0, 5.0, 0.8), drill(3.0, 3.0, 0.8)],
            DrillAlgorithm::Skip,
            0.0,
            64,
        );
        assert_eq!(counters.skipped, 2);
        assert!(plan.is_done());
    }

    #[test]
    fn bc_dri_001_short_cutter_is_coplanar_error() {
        for solid in &mut board() {
            let cutter = vec![vec![drill(5.0, 5.0, 0.8).footprint.polygon]];
            let (z_min, z_max) = (solid.z_min, solid.z_max + 0.2);
            let result = subtract(solid, &cutter, z_min, z_max);
            assert!(matches!(result, Err(BooleanError::CoplanarFaces { .. })));
            assert_eq!(solid.footprint.hole_count(), 0);
        }
    }

    #[test]
    fn bc_dri_002_degenerate_drill_fails_whole_batch() {
        let mut solids = board();
        let (mut plan, _) = DrillPlan::new(
            vec![drill(5.0, 5.0, 0.8), drill(3.0, 3.0, 0.0)],
            DrillAlgorithm::Batched,
            0.0,
            64,
        );
        let counters = plan.drill_next(&mut solids);
        assert_eq!(counters.failed, 2);
        assert!(solids.iter().all(|s| s.footprint.hole_count() == 0));
    }

    #[test]
    fn bc_dri_003_drill_outside_board_is_skipped() {
        let mut solids = board();
        let (mut plan, _) =
            DrillPlan::new(vec![drill(50.0, 50.0, 0.8)], DrillAlgorithm::PerPair, 0.0, 64);
        let counters = plan.drill_next(&mut solids);
        assert_eq!(counters.skipped, 1);
    }

    /// Outline solid, then a copper solid taller than a 1.6 mm drill.
    fn board_with_tall_copper() -> Vec<Solid> {
        let mut solids = board();
        if let Some(copper) = solids.get_mut(1) {
            copper.z_max = 5.0;
        }
        solids
    }

    #[test]
    fn bc_dri_004_failed_per_pair_drill_leaves_every_solid_undrilled() {
        let mut solids = board_with_tall_copper();
        let (mut plan, _) =
            DrillPlan::new(vec![drill(5.0, 5.0, 0.8)], DrillAlgorithm::PerPair, 0.0, 64);
        let counters = plan.drill_next(&mut solids);
        assert_eq!(counters.drilled, 0);
        assert_eq!(counters.failed, 1);
        assert!(solids.iter().all(|s| s.footprint.hole_count() == 0));
    }

    #[test]
    fn bc_dri_005_failed_batch_leaves_every_solid_undrilled() {
        let mut solids = board_with_tall_copper();
        let (mut plan, _) = DrillPlan::new(
            vec![drill(5.0, 5.0, 0.8), drill(2.0, 2.0, 0.8)],
            DrillAlgorithm::Batched,
            0.0,
            64,
        );
        let counters = plan.drill_next(&mut solids);
        assert_eq!(counters.drilled, 0);
        assert_eq!(counters.failed, 2);
        assert!(solids.iter().all(|s| s.footprint.hole_count() == 0));
    }

    #[test]
    fn ut_dri_005_routed_slot_counts_each_segment() {
        let parsed = crate::excellon::parse(b"M48\nMETRIC\nT1C1.0\n%\nT1\nX3.0Y5.0G85X5.0Y5.0\nM30\n");
        assert!(parsed.is_ok());
        let Ok(parsed) = parsed else {
            return;
        };
        let drills: Vec<DrillSolid> = parsed
            .records
            .iter()
            .map(|record| DrillSolid::extrude(DrillFootprint::from_record(record), 1.6))
            .collect();
        assert_eq!(drills.len(), 4);

        let mut solids = board();
        let (mut plan, _) = DrillPlan::new(drills, DrillAlgorithm::PerPair, 0.0, 64);
        let counters = plan.drill_next(&mut solids);
        assert_eq!(counters.drilled, 4);
        assert_eq!(counters.total(), 4);
        assert!(solids.iter().all(|s| s.footprint.hole_count() == 1));
    }
}
