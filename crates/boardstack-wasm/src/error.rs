//! Error types for parsing, geometry, drilling and the import pipeline.

use thiserror::Error;

/// Errors that can occur while parsing a fabrication file or building its geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// An aperture definition is missing or invalid.
    #[error("invalid aperture: {0}")]
    InvalidAperture(String),

    /// Geometry collapsed to zero area or contains non-finite coordinates.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Arc parameters could not be resolved.
    #[error("arc error: {0}")]
    ArcError(String),

    /// An aperture macro could not be evaluated.
    #[error("macro error: {0}")]
    MacroError(String),

    /// A numeric token or command could not be parsed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Triangulation produced out-of-range indices.
    #[error("mesh error: {0}")]
    MeshError(String),
}

/// Errors raised by a single drill subtraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BooleanError {
    /// The cutter has no usable area.
    #[error("degenerate cutter: {details}")]
    DegenerateCutter {
        /// Description of the problem.
        details: String,
    },

    /// Cutter and solid share a cap plane or the cutter does not pass fully through.
    #[error("cutter does not span solid: {details}")]
    CoplanarFaces {
        /// Description of the problem.
        details: String,
    },

    /// Coordinates are NaN or infinite.
    #[error("numerical error: {details}")]
    NumericalError {
        /// Description of the problem.
        details: String,
    },
}

/// Result type for drill subtractions.
pub type BooleanResult<T> = Result<T, BooleanError>;

/// Failures that end an import session in the error state.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No file in the import set matched a known layer suffix.
    #[error("no PCB layer files found")]
    NoLayerFiles,

    /// Every layer was dropped during parsing or cleanup.
    #[error("no layer produced usable geometry")]
    NoUsableLayers,

    /// Nothing was left to merge into the board mesh.
    #[error("nothing to merge: {0}")]
    NothingToMerge(String),

    /// Import settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A geometry failure that could not be contained to one layer.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// A drilling failure that could not be contained to one hole.
    #[error(transparent)]
    Boolean(#[from] BooleanError),
}
