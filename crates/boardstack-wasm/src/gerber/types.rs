//! Vector-plot primitives and aperture definitions.

use std::collections::HashMap;

use crate::geometry::Point;

/// Unit declared by `%MO` (or legacy `G70`/`G71`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    /// Millimetres.
    #[default]
    Millimeters,
    /// Inches.
    Inches,
}

impl Units {
    /// Factor converting a value in these units to millimetres.
    pub const fn to_mm(self) -> f64 {
        match self {
            Self::Millimeters => 1.0,
            Self::Inches => 25.4,
        }
    }
}

/// Whether a primitive adds or removes material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    /// Adds material.
    #[default]
    Dark,
    /// Removes material painted by earlier primitives.
    Clear,
}

/// Interpolation mode state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    /// Linear interpolation (G01).
    #[default]
    Linear,
    /// Clockwise circular interpolation (G02).
    ClockwiseArc,
    /// Counter-clockwise circular interpolation (G03).
    CounterClockwiseArc,
}

/// Arc quadrant mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuadrantMode {
    /// G74: arcs never exceed 90 degrees and offsets are unsigned.
    Single,
    /// G75: offsets are signed and arcs may sweep a full circle.
    #[default]
    Multi,
}

/// One exposure-tagged outline of an evaluated aperture macro, in millimetres,
/// relative to the flash point.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroOutline {
    /// Dark outlines add, clear outlines cut.
    pub polarity: Polarity,
    /// Closed contour.
    pub contour: Vec<Point>,
}

/// Shape of a defined aperture. Dimensions are millimetres.
#[derive(Debug, Clone, PartialEq)]
pub enum ApertureShape {
    /// Standard circle.
    Circle {
        /// Outer diameter.
        diameter: f64,
        /// Optional centre hole diameter.
        hole: Option<f64>,
    },
    /// Axis-aligned rectangle.
    Rectangle {
        /// X size.
        width: f64,
        /// Y size.
        height: f64,
        /// Optional centre hole diameter.
        hole: Option<f64>,
    },
    /// Stadium: rectangle with semicircular short ends.
    Obround {
        /// X size.
        width: f64,
        /// Y size.
        height: f64,
        /// Optional centre hole diameter.
        hole: Option<f64>,
    },
    /// Regular polygon.
    Polygon {
        /// Circumscribed diameter.
        diameter: f64,
        /// Vertex count, 3 to 12.
        vertices: u32,
        /// Rotation in degrees, counter-clockwise.
        rotation: f64,
        /// Optional centre hole diameter.
        hole: Option<f64>,
    },
    /// Aperture macro evaluated at definition time.
    Macro {
        /// Macro template name.
        name: String,
        /// Evaluated outlines in application order.
        outlines: Vec<MacroOutline>,
    },
}

/// A defined aperture.
#[derive(Debug, Clone, PartialEq)]
pub struct Aperture {
    /// D-code, 10 or above.
    pub code: u32,
    /// Shape.
    pub shape: ApertureShape,
}

impl Aperture {
    /// Diameter of a round aperture; `None` for every other shape.
    pub const fn round_diameter(&self) -> Option<f64> {
        match self.shape {
            ApertureShape::Circle { diameter, .. } => Some(diameter),
            _ => None,
        }
    }
}

/// A drawn line: the aperture swept along the centerline.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    /// Aperture D-code.
    pub aperture: u32,
    /// Polarity in effect when the draw was issued.
    pub polarity: Polarity,
    /// Centerline from start to end; arcs are already tessellated.
    pub points: Vec<Point>,
}

/// One drawing primitive, in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// D01 outside region mode.
    Line(Stroke),
    /// D03.
    Flash {
        /// Flash position.
        point: Point,
        /// Aperture D-code.
        aperture: u32,
        /// Polarity in effect.
        polarity: Polarity,
    },
    /// G36 ... G37 block.
    Region {
        /// Closed contours; nested contours become holes.
        contours: Vec<Vec<Point>>,
        /// Polarity in effect.
        polarity: Polarity,
    },
}

impl Primitive {
    /// Polarity of the primitive.
    pub const fn polarity(&self) -> Polarity {
        match self {
            Self::Line(stroke) => stroke.polarity,
            Self::Flash { polarity, .. } | Self::Region { polarity, .. } => *polarity,
        }
    }
}

/// Output of the vector-plot parser.
#[derive(Debug, Clone, Default)]
pub struct ParsedPlot {
    /// Primitives in file order.
    pub primitives: Vec<Primitive>,
    /// Aperture table keyed by D-code.
    pub apertures: HashMap<u32, Aperture>,
    /// Units declared by the file; coordinates are already converted to mm.
    pub units: Units,
    /// Non-fatal problems.
    pub warnings: Vec<String>,
    /// Number of commands processed.
    pub command_count: u32,
    /// Draws and flashes dropped for an undefined or unselected aperture.
    pub dropped: u32,
}
