//! Pipeline stages and the transition function.

use std::mem;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::geometry::{build_outline_layer, build_plot_layer, footprints};
use crate::layer::LayerRole;
use crate::solid::{merge, DrillPlan, DrillSolid, FinishSet, Solid};
use crate::{excellon, gerber};

use super::session::ImportSession;

/// Import stages. `Finished` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Classify input files by suffix.
    DiscoverFiles,
    /// Parse one discovered file per tick.
    ParseFiles,
    /// Build layer shapes and drop degenerate geometry.
    RemoveRedundantGeometry,
    /// Give every layer its thickness and height.
    Extrude,
    /// Resolve a finish for every solid.
    AssignMaterials,
    /// Subtract one drill batch per tick.
    Drill,
    /// Release drill solids and drop emptied solids.
    CleanDrillArtifacts,
    /// Concatenate the solids into the board mesh.
    MergeLayers,
    /// Import complete.
    Finished,
    /// Import failed; see the session's last error.
    Error,
}

/// Ticks taken by the stages that run exactly once.
pub(crate) const FIXED_TICKS: u32 = 6;

impl Stage {
    /// Whether no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

/// Run the current stage of `session` and move it to the next one.
///
/// A stage error is stored as the session's last error and the session moves
/// to [`Stage::Error`]. On a terminal stage this does nothing.
pub fn advance(session: &mut ImportSession) -> Stage {
    let current = session.stage;
    if current.is_terminal() {
        return current;
    }
    session.ticks = session.ticks.saturating_add(1);

    let outcome = match current {
        Stage::DiscoverFiles => discover_files(session),
        Stage::ParseFiles => parse_next_file(session),
        Stage::RemoveRedundantGeometry => remove_redundant_geometry(session),
        Stage::Extrude => extrude(session),
        Stage::AssignMaterials => assign_materials(session),
        Stage::Drill => drill_next_batch(session),
        Stage::CleanDrillArtifacts => clean_drill_artifacts(session),
        Stage::MergeLayers => merge_layers(session),
        Stage::Finished | Stage::Error => Ok(current),
    };

    session.stage = match outcome {
        Ok(next) => {
            debug!(from = ?current, to = ?next, "stage complete");
            next
        }
        Err(err) => {
            warn!(stage = ?current, error = %err, "import failed");
            session.last_error = Some(err.to_string());
            Stage::Error
        }
    };
    session.stage
}

fn discover_files(session: &mut ImportSession) -> Result<Stage, PipelineError> {
    session.resolved = session.settings.resolve()?;
    session.warnings.append(&mut session.resolved.warnings);

    for file in mem::take(&mut session.files) {
        let Some(role) = LayerRole::from_filename(&file.name) else {
            debug!(name = %file.name, "ignoring file with unknown suffix");
            continue;
        };
        if session.discovered.iter().any(|(known, _)| *known == role) {
            warn!(name = %file.name, role = role.label(), "duplicate layer file ignored");
            session.warnings.push(format!(
                "{}: a {} file was already found; ignored",
                file.name,
                role.label()
            ));
            continue;
        }
        session.discovered.push((role, file));
    }

    if session.discovered.is_empty() {
        return Err(PipelineError::NoLayerFiles);
    }
    info!(files = session.discovered.len(), "discovered layer files");
    Ok(Stage::ParseFiles)
}

fn parse_next_file(session: &mut ImportSession) -> Result<Stage, PipelineError> {
    let index = session.next_file;
    session.next_file += 1;
    if let Some((role, file)) = session.discovered.get_mut(index) {
        let role = *role;
        let name = file.name.clone();
        let bytes = mem::take(&mut file.bytes);

        if role.is_plot() {
            match gerber::parse(&bytes) {
                Ok(plot) => {
                    session.parse.layers_parsed += 1;
                    session.parse.primitives_dropped =
                        session.parse.primitives_dropped.saturating_add(plot.dropped);
                    session
                        .warnings
                        .extend(plot.warnings.iter().map(|w| format!("{name}: {w}")));
                    session.plots.insert(role, plot);
                }
                Err(err) => drop_layer(session, &name, &err.to_string()),
            }
        } else {
            match excellon::parse(&bytes) {
                Ok(drill) => {
                    session.parse.layers_parsed += 1;
                    session.parse.lines.absorb(drill.counters);
                    session
                        .warnings
                        .extend(drill.warnings.iter().map(|w| format!("{name}: {w}")));
                    session.drill = Some(drill);
                }
                Err(err) => drop_layer(session, &name, &err.to_string()),
            }
        }
    }

    if session.next_file < session.discovered.len() {
        Ok(Stage::ParseFiles)
    } else {
        Ok(Stage::RemoveRedundantGeometry)
    }
}

fn drop_layer(session: &mut ImportSession, name: &str, reason: &str) {
    warn!(name, reason, "layer dropped");
    session.parse.layers_dropped += 1;
    session.warnings.push(format!("{name}: layer dropped: {reason}"));
}

fn remove_redundant_geometry(session: &mut ImportSession) -> Result<Stage, PipelineError> {
    for (role, plot) in mem::take(&mut session.plots) {
        let build = match role {
            LayerRole::Outline => build_outline_layer(&plot),
            _ => build_plot_layer(&plot),
        };
        session
            .warnings
            .extend(build.warnings.into_iter().map(|w| format!("{}: {w}", role.label())));
        if build.shape.is_empty() {
            drop_layer(session, role.label(), "no geometry left after cleanup");
            continue;
        }
        session.shapes.insert(role, build.shape);
    }

    if session.shapes.is_empty() {
        return Err(PipelineError::NoUsableLayers);
    }
    Ok(Stage::Extrude)
}

fn extrude(session: &mut ImportSession) -> Result<Stage, PipelineError> {
    let thickness = session.resolved.thickness.millimeters();
    session.solids = mem::take(&mut session.shapes)
        .into_iter()
        .map(|(role, shape)| Solid::extrude(role, shape, thickness))
        .collect();
    if let Some(drill) = session.drill.take() {
        session.drill_solids = footprints(&drill.records)
            .into_iter()
            .map(|footprint| DrillSolid::extrude(footprint, thickness))
            .collect();
    }
    debug!(
        solids = session.solids.len(),
        drills = session.drill_solids.len(),
        thickness,
        "extruded layers"
    );
    Ok(Stage::AssignMaterials)
}

fn assign_materials(session: &mut ImportSession) -> Result<Stage, PipelineError> {
    let finishes = FinishSet {
        board: session.resolved.board,
        copper: session.resolved.copper,
        silk: session.resolved.silk,
    };
    for solid in &session.solids {
        if let Some(finish) = finishes.for_role(solid.role) {
            debug!(role = solid.role.label(), finish = finish.name, "material assigned");
        }
    }
    session.finishes = Some(finishes);

    let (plan, skipped) = DrillPlan::new(
        mem::take(&mut session.drill_solids),
        session.resolved.drill_algorithm,
        session.resolved.min_drill_diameter,
        session.resolved.drill_batch_size,
    );
    session.drills.skipped = session.drills.skipped.saturating_add(skipped.skipped);
    session.drill_plan = plan;
    Ok(Stage::Drill)
}

fn drill_next_batch(session: &mut ImportSession) -> Result<Stage, PipelineError> {
    if !session.drill_plan.is_done() {
        let batch = session.drill_plan.drill_next(&mut session.solids);
        let totals = &mut session.drills;
        totals.drilled = totals.drilled.saturating_add(batch.drilled);
        totals.failed = totals.failed.saturating_add(batch.failed);
        totals.skipped = totals.skipped.saturating_add(batch.skipped);
    }
    if session.drill_plan.is_done() {
        Ok(Stage::CleanDrillArtifacts)
    } else {
        Ok(Stage::Drill)
    }
}

fn clean_drill_artifacts(session: &mut ImportSession) -> Result<Stage, PipelineError> {
    session.drill_plan = DrillPlan::default();
    let before = session.solids.len();
    session.solids.retain(|solid| !solid.is_empty());
    let removed = before - session.solids.len();
    if removed > 0 {
        debug!(removed, "dropped solids emptied by drilling");
    }
    info!(
        drilled = session.drills.drilled,
        failed = session.drills.failed,
        skipped = session.drills.skipped,
        "drilling complete"
    );
    Ok(Stage::MergeLayers)
}

fn merge_layers(session: &mut ImportSession) -> Result<Stage, PipelineError> {
    let finishes = session
        .finishes
        .ok_or_else(|| PipelineError::NothingToMerge("materials were never assigned".to_string()))?;
    let solids = mem::take(&mut session.solids);
    let board = merge(&solids, &finishes, &session.resolved.mesh_name)?;
    session.board = Some(board);
    Ok(Stage::Finished)
}
