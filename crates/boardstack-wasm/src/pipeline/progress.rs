//! Progress snapshots and the final import summary.

use serde::Serialize;

use crate::solid::DrillCounters;

use super::session::{ImportSession, ParseCounters};
use super::stage::{Stage, FIXED_TICKS};

/// State of the import after one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Stage the next tick will run.
    pub stage: Stage,
    /// 0 to 100; 100 only once finished.
    pub percent: u8,
    /// Human-readable description of the next step.
    pub text: String,
    /// Whether a terminal stage was reached.
    pub done: bool,
    /// Error message when the import failed.
    pub error: Option<String>,
}

impl Progress {
    /// Snapshot of `session`.
    pub fn of(session: &ImportSession) -> Self {
        let stage = session.stage();
        Self {
            stage,
            percent: percent(session),
            text: describe(session),
            done: stage.is_terminal(),
            error: session.last_error().map(str::to_string),
        }
    }
}

fn expected_ticks(session: &ImportSession) -> u32 {
    let files = if session.discovered.is_empty() {
        session.files.len()
    } else {
        session.discovered.len()
    };
    let batches = session.drill_plan.batch_count().max(1);
    let extra = u32::try_from(files.saturating_add(batches)).unwrap_or(u32::MAX);
    FIXED_TICKS.saturating_add(extra)
}

fn percent(session: &ImportSession) -> u8 {
    match session.stage() {
        Stage::Finished => 100,
        _ => {
            let total = u64::from(expected_ticks(session).max(1));
            let done = u64::from(session.ticks);
            u8::try_from((done * 100 / total).min(99)).unwrap_or(99)
        }
    }
}

fn describe(session: &ImportSession) -> String {
    match session.stage() {
        Stage::DiscoverFiles => "Discovering layer files".to_string(),
        Stage::ParseFiles => session
            .discovered
            .get(session.next_file)
            .map_or_else(
                || "Parsing files".to_string(),
                |(role, file)| format!("Parsing {} ({})", role.label(), file.name),
            ),
        Stage::RemoveRedundantGeometry => "Removing redundant geometry".to_string(),
        Stage::Extrude => "Extruding layers".to_string(),
        Stage::AssignMaterials => "Assigning materials".to_string(),
        Stage::Drill => {
            let total = session.drill_plan.batch_count();
            let current = total - session.drill_plan.remaining() + 1;
            format!("Drilling holes, batch {current} of {}", total.max(1))
        }
        Stage::CleanDrillArtifacts => "Cleaning drill artifacts".to_string(),
        Stage::MergeLayers => "Merging layers".to_string(),
        Stage::Finished => "Import finished".to_string(),
        Stage::Error => format!(
            "Import failed: {}",
            session.last_error().unwrap_or("unknown error")
        ),
    }
}

/// Totals reported once the import ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Stage the session ended in.
    pub stage: Stage,
    /// Parse totals.
    pub parse: ParseCounters,
    /// Hole totals.
    pub drills: DrillCounters,
    /// Every non-fatal problem, prefixed by its source.
    pub warnings: Vec<String>,
    /// Vertices in the merged mesh.
    pub vertex_count: u32,
    /// Triangles in the merged mesh.
    pub triangle_count: u32,
    /// Error message when the import failed.
    pub error: Option<String>,
}

impl ImportSummary {
    /// Summary of `session` as it stands.
    pub fn of(session: &ImportSession) -> Self {
        let (vertices, triangles) = session
            .board()
            .map_or((0, 0), |board| (board.mesh.vertex_count(), board.mesh.triangle_count()));
        Self {
            stage: session.stage(),
            parse: session.parse_counters(),
            drills: session.drill_counters(),
            warnings: session.warnings().to_vec(),
            vertex_count: u32::try_from(vertices).unwrap_or(u32::MAX),
            triangle_count: u32::try_from(triangles).unwrap_or(u32::MAX),
            error: session.last_error().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportSettings;
    use crate::pipeline::session::InputFile;
    use crate::pipeline::stage::advance;

    #[test]
    fn ut_prg_001_percent_is_monotonic_and_reaches_100_at_finish() {
        let mut session = ImportSession::new(
            vec![InputFile::new(
                "board.gm1",
                b"%FSLAX46Y46*%\n%MOMM*%\n%ADD10C,0.1*%\nD10*\nX0Y0D02*\nX5000000Y0D01*\nX5000000Y5000000D01*\nX0Y5000000D01*\nX0Y0D01*\nM02*\n".as_slice(),
            )],
            ImportSettings::default(),
        );
        let mut last = Progress::of(&session).percent;
        while !session.is_done() {
            advance(&mut session);
            let progress = Progress::of(&session);
            assert!(progress.percent >= last);
            if !progress.done {
                assert!(progress.percent < 100);
            }
            last = progress.percent;
        }
        let done = Progress::of(&session);
        assert_eq!(done.stage, Stage::Finished);
        assert_eq!(done.percent, 100);
        assert!(done.error.is_none());
    }

    #[test]
    fn bc_prg_001_error_snapshot_carries_message() {
        let mut session = ImportSession::new(Vec::new(), ImportSettings::default());
        advance(&mut session);
        let progress = Progress::of(&session);
        assert!(progress.done);
        assert!(progress.percent < 100);
        assert_eq!(progress.error.as_deref(), Some("no PCB layer files found"));
        let summary = ImportSummary::of(&session);
        assert_eq!(summary.stage, Stage::Error);
        assert_eq!(summary.vertex_count, 0);
    }
}
