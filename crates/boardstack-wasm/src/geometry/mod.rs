//! Planar geometry: aperture shapes, stroke sweeps, polarity resolution and
//! drill footprints.

pub mod aperture;
pub mod build;
pub mod cleanup;
pub mod drill;
pub mod polarity;
pub mod stroke;
pub mod types;

pub use build::{build_outline_layer, build_plot_layer, LayerBuild};
pub use drill::{footprints, DrillFootprint};
pub use types::{BoundingBox, LayerShape, Point, PolygonSet, Ring};
