//! RS-274X (Gerber) vector-plot parsing.
//!
//! [`parser::parse`] turns a plot file into [`ParsedPlot`]: primitives in
//! file order plus the aperture table they reference. All coordinates and
//! aperture sizes are converted to millimetres.

pub mod arc;
pub mod macro_eval;
pub mod normalize;
pub mod parser;
pub mod types;

pub use parser::parse;
pub use types::{
    Aperture, ApertureShape, InterpolationMode, MacroOutline, ParsedPlot, Polarity, Primitive,
    QuadrantMode, Stroke, Units,
};
