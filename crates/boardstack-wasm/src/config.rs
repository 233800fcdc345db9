//! Import settings received from the host.
//!
//! [`ImportSettings`] is the raw, serde-friendly form handed over by
//! JavaScript (camelCase keys, every field optional). [`ImportSettings::resolve`]
//! validates it into [`ResolvedSettings`], which the pipeline consumes.
//!
//! ```
//! use boardstack_wasm::config::{DrillAlgorithm, ImportSettings};
//!
//! let settings = ImportSettings::default()
//!     .with_board_thickness(1.2)
//!     .with_drill_algorithm(DrillAlgorithm::Batched);
//! let resolved = settings.resolve().unwrap();
//! assert!((resolved.thickness.millimeters() - 1.2).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::solid::material::{self, Finish, FinishKind};

/// Copper foil thickness in millimetres.
pub const COPPER_THICKNESS: f64 = 0.035;
/// Silkscreen ink thickness in millimetres.
pub const SILK_THICKNESS: f64 = 0.02;
/// Gap between copper plane and silkscreen in millimetres.
pub const SILK_CLEARANCE: f64 = 0.001;
/// Distance a drill cylinder extends beyond both faces of the board.
pub const DRILL_MARGIN: f64 = 0.2;

const DEFAULT_BATCH_SIZE: usize = 64;
const DEFAULT_MESH_NAME: &str = "PCB";

/// Supported substrate thicknesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoardThickness {
    /// 1.6 mm, the usual FR-4 stock.
    #[default]
    Mm1_6,
    /// 1.4 mm.
    Mm1_4,
    /// 1.2 mm.
    Mm1_2,
    /// 1.0 mm.
    Mm1_0,
}

impl BoardThickness {
    /// All accepted choices, thickest first.
    pub const CHOICES: [Self; 4] = [Self::Mm1_6, Self::Mm1_4, Self::Mm1_2, Self::Mm1_0];

    /// Thickness in millimetres.
    pub const fn millimeters(self) -> f64 {
        match self {
            Self::Mm1_6 => 1.6,
            Self::Mm1_4 => 1.4,
            Self::Mm1_2 => 1.2,
            Self::Mm1_0 => 1.0,
        }
    }

    /// Match a millimetre value against the accepted choices.
    pub fn from_millimeters(value: f64) -> Option<Self> {
        Self::CHOICES
            .into_iter()
            .find(|choice| (choice.millimeters() - value).abs() < 1e-6)
    }
}

/// How drill holes are subtracted from the board solids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DrillAlgorithm {
    /// One subtraction per (solid, drill) pair.
    #[default]
    PerPair,
    /// Cutters are unioned per batch and subtracted once.
    Batched,
    /// Holes are not drilled.
    Skip,
}

/// Raw import settings as received from the host.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportSettings {
    /// Substrate thickness in millimetres; must be one of [`BoardThickness::CHOICES`].
    pub board_thickness: f64,
    /// Substrate finish preset name.
    pub board_finish: String,
    /// Copper finish preset name.
    pub copper_finish: String,
    /// Silkscreen finish preset name.
    pub silk_finish: String,
    /// Drill subtraction strategy.
    pub drill_algorithm: DrillAlgorithm,
    /// Holes with a smaller diameter (mm) are never drilled.
    pub min_drill_diameter: f64,
    /// Number of drills processed per tick.
    pub drill_batch_size: usize,
    /// Name given to the merged board mesh.
    pub mesh_name: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            board_thickness: BoardThickness::default().millimeters(),
            board_finish: material::DEFAULT_BOARD_FINISH.to_string(),
            copper_finish: material::DEFAULT_COPPER_FINISH.to_string(),
            silk_finish: material::DEFAULT_SILK_FINISH.to_string(),
            drill_algorithm: DrillAlgorithm::default(),
            min_drill_diameter: 0.0,
            drill_batch_size: DEFAULT_BATCH_SIZE,
            mesh_name: DEFAULT_MESH_NAME.to_string(),
        }
    }
}

impl ImportSettings {
    /// Set the substrate thickness in millimetres.
    #[must_use]
    pub const fn with_board_thickness(mut self, millimeters: f64) -> Self {
        self.board_thickness = millimeters;
        self
    }

    /// Set the substrate finish preset.
    #[must_use]
    pub fn with_board_finish(mut self, name: impl Into<String>) -> Self {
        self.board_finish = name.into();
        self
    }

    /// Set the copper finish preset.
    #[must_use]
    pub fn with_copper_finish(mut self, name: impl Into<String>) -> Self {
        self.copper_finish = name.into();
        self
    }

    /// Set the silkscreen finish preset.
    #[must_use]
    pub fn with_silk_finish(mut self, name: impl Into<String>) -> Self {
        self.silk_finish = name.into();
        self
    }

    /// Set the drill subtraction strategy.
    #[must_use]
    pub const fn with_drill_algorithm(mut self, algorithm: DrillAlgorithm) -> Self {
        self.drill_algorithm = algorithm;
        self
    }

    /// Set the minimum drilled diameter in millimetres.
    #[must_use]
    pub const fn with_min_drill_diameter(mut self, millimeters: f64) -> Self {
        self.min_drill_diameter = millimeters;
        self
    }

    /// Set how many drills are processed per tick.
    #[must_use]
    pub const fn with_drill_batch_size(mut self, size: usize) -> Self {
        self.drill_batch_size = size;
        self
    }

    /// Validate the settings.
    ///
    /// Unknown finish names fall back to the default preset and are reported
    /// in [`ResolvedSettings::warnings`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] for an unsupported thickness,
    /// a negative or non-finite minimum diameter, or a zero batch size.
    pub fn resolve(&self) -> Result<ResolvedSettings, PipelineError> {
        let thickness = BoardThickness::from_millimeters(self.board_thickness).ok_or_else(|| {
            PipelineError::InvalidSettings(format!(
                "board thickness {} mm is not one of 1.6, 1.4, 1.2, 1.0",
                self.board_thickness
            ))
        })?;

        if !self.min_drill_diameter.is_finite() || self.min_drill_diameter < 0.0 {
            return Err(PipelineError::InvalidSettings(format!(
                "minimum drill diameter {} must be a non-negative number",
                self.min_drill_diameter
            )));
        }

        if self.drill_batch_size == 0 {
            return Err(PipelineError::InvalidSettings(
                "drill batch size must be at least 1".to_string(),
            ));
        }

        let mut warnings = Vec::new();
        let board = lookup_finish(FinishKind::Board, &self.board_finish, &mut warnings);
        let copper = lookup_finish(FinishKind::Copper, &self.copper_finish, &mut warnings);
        let silk = lookup_finish(FinishKind::Silk, &self.silk_finish, &mut warnings);

        let mesh_name = if self.mesh_name.trim().is_empty() {
            DEFAULT_MESH_NAME.to_string()
        } else {
            self.mesh_name.clone()
        };

        Ok(ResolvedSettings {
            thickness,
            board,
            copper,
            silk,
            drill_algorithm: self.drill_algorithm,
            min_drill_diameter: self.min_drill_diameter,
            drill_batch_size: self.drill_batch_size,
            mesh_name,
            warnings,
        })
    }
}

fn lookup_finish(kind: FinishKind, name: &str, warnings: &mut Vec<String>) -> Finish {
    material::finish_by_name(kind, name).unwrap_or_else(|| {
        let fallback = material::default_finish(kind);
        warnings.push(format!(
            "unknown {} finish `{name}`; using `{}`",
            kind.label(),
            fallback.name
        ));
        fallback
    })
}

/// Validated settings consumed by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    /// Substrate thickness.
    pub thickness: BoardThickness,
    /// Substrate finish.
    pub board: Finish,
    /// Copper finish.
    pub copper: Finish,
    /// Silkscreen finish.
    pub silk: Finish,
    /// Drill subtraction strategy.
    pub drill_algorithm: DrillAlgorithm,
    /// Holes below this diameter are skipped.
    pub min_drill_diameter: f64,
    /// Drills per tick.
    pub drill_batch_size: usize,
    /// Name of the merged mesh.
    pub mesh_name: String,
    /// Non-fatal problems found while resolving.
    pub warnings: Vec<String>,
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        Self {
            thickness: BoardThickness::default(),
            board: material::default_finish(FinishKind::Board),
            copper: material::default_finish(FinishKind::Copper),
            silk: material::default_finish(FinishKind::Silk),
            drill_algorithm: DrillAlgorithm::default(),
            min_drill_diameter: 0.0,
            drill_batch_size: DEFAULT_BATCH_SIZE,
            mesh_name: DEFAULT_MESH_NAME.to_string(),
            warnings: Vec::new(),
        }
    }
}
