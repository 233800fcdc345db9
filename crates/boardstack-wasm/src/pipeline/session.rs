//! The state owned by one import.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{ImportSettings, ResolvedSettings};
use crate::excellon::{ExcellonResult, LineCounters};
use crate::geometry::LayerShape;
use crate::gerber::ParsedPlot;
use crate::layer::LayerRole;
use crate::solid::{BoardMesh, DrillCounters, DrillPlan, DrillSolid, FinishSet, Solid};

use super::stage::Stage;

/// A raw input file handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// File name; only its suffix matters.
    pub name: String,
    /// Raw contents.
    pub bytes: Vec<u8>,
}

impl InputFile {
    /// Wrap a name and its contents.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Parse outcome totals for the import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseCounters {
    /// Drill-file line outcomes.
    pub lines: LineCounters,
    /// Layers parsed without a fatal error.
    pub layers_parsed: u32,
    /// Layers dropped for a fatal parse error or for having no geometry.
    pub layers_dropped: u32,
    /// Vector-plot draws and flashes dropped for an undefined aperture.
    pub primitives_dropped: u32,
}

/// Everything one import owns, from raw files to the merged mesh.
///
/// Created fresh for every import and never reused.
#[derive(Debug)]
pub struct ImportSession {
    pub(crate) files: Vec<InputFile>,
    pub(crate) settings: ImportSettings,
    pub(crate) resolved: ResolvedSettings,
    pub(crate) discovered: Vec<(LayerRole, InputFile)>,
    pub(crate) next_file: usize,
    pub(crate) plots: BTreeMap<LayerRole, ParsedPlot>,
    pub(crate) drill: Option<ExcellonResult>,
    pub(crate) shapes: BTreeMap<LayerRole, LayerShape>,
    pub(crate) solids: Vec<Solid>,
    pub(crate) drill_solids: Vec<DrillSolid>,
    pub(crate) drill_plan: DrillPlan,
    pub(crate) finishes: Option<FinishSet>,
    pub(crate) stage: Stage,
    pub(crate) ticks: u32,
    pub(crate) parse: ParseCounters,
    pub(crate) drills: DrillCounters,
    pub(crate) warnings: Vec<String>,
    pub(crate) last_error: Option<String>,
    pub(crate) board: Option<BoardMesh>,
}

impl ImportSession {
    /// Start a session over `files` with `settings`.
    pub fn new(files: Vec<InputFile>, settings: ImportSettings) -> Self {
        Self {
            files,
            settings,
            resolved: ResolvedSettings::default(),
            discovered: Vec::new(),
            next_file: 0,
            plots: BTreeMap::new(),
            drill: None,
            shapes: BTreeMap::new(),
            solids: Vec::new(),
            drill_solids: Vec::new(),
            drill_plan: DrillPlan::default(),
            finishes: None,
            stage: Stage::DiscoverFiles,
            ticks: 0,
            parse: ParseCounters::default(),
            drills: DrillCounters::default(),
            warnings: Vec::new(),
            last_error: None,
            board: None,
        }
    }

    /// Add a file before discovery has run. Returns `false` once the
    /// session has started.
    pub fn add_file(&mut self, file: InputFile) -> bool {
        if self.stage != Stage::DiscoverFiles || self.ticks > 0 {
            return false;
        }
        self.files.push(file);
        true
    }

    /// Current stage.
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Roles discovered so far, in discovery order.
    pub fn discovered_roles(&self) -> Vec<LayerRole> {
        self.discovered.iter().map(|(role, _)| *role).collect()
    }

    /// Layer shapes after redundant-geometry removal, until extrusion.
    pub const fn shapes(&self) -> &BTreeMap<LayerRole, LayerShape> {
        &self.shapes
    }

    /// Board solids, from extrusion until merge.
    pub fn solids(&self) -> &[Solid] {
        &self.solids
    }

    /// Parse totals.
    pub const fn parse_counters(&self) -> ParseCounters {
        self.parse
    }

    /// Hole totals.
    pub const fn drill_counters(&self) -> DrillCounters {
        self.drills
    }

    /// Non-fatal problems collected so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Message of the error that ended the session, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The merged board once the session has finished.
    pub const fn board(&self) -> Option<&BoardMesh> {
        self.board.as_ref()
    }

    /// Take the merged board out of the session.
    pub fn take_board(&mut self) -> Option<BoardMesh> {
        self.board.take()
    }

    /// Whether the session reached a terminal stage.
    pub const fn is_done(&self) -> bool {
        self.stage.is_terminal()
    }
}
