//! RS-274X command interpreter.
//!
//! The text is normalised, handed to `gerber_parser`, and the resulting
//! commands are replayed in file order. Each command updates the graphics
//! state and emits at most one [`Primitive`].
//!
//! Error policy: commands the parser rejects are skipped with a warning,
//! draws with an undefined aperture are dropped with a warning, and any
//! malformed coordinate, format, aperture parameter or macro aborts the
//! whole file.

use std::collections::HashMap;
use std::io::{BufReader, Cursor};

use gerber_types::{
    Aperture as PlotAperture, ApertureDefinition, ApertureMacro, Command, DCode, ExtendedCode,
    FunctionCode, GCode, Operation, StepAndRepeat, Unit,
};
use tracing::{debug, warn};

use crate::error::GeometryError;
use crate::geometry::Point;

use super::arc::{multi_quadrant_points, single_quadrant_points, ArcDirection};
use super::macro_eval;
use super::normalize::{normalize, Normalized};
use super::types::{
    Aperture, ApertureShape, InterpolationMode, ParsedPlot, Polarity, Primitive, QuadrantMode,
    Stroke, Units,
};

#[derive(Debug, Default)]
struct RegionBuilder {
    contours: Vec<Vec<Point>>,
    current: Vec<Point>,
}

impl RegionBuilder {
    fn close_contour(&mut self) {
        let mut contour = std::mem::take(&mut self.current);
        if contour.len() > 1 && contour.first() == contour.last() {
            contour.pop();
        }
        if !contour.is_empty() {
            self.contours.push(contour);
        }
    }
}

#[derive(Debug, Default)]
struct PlotState {
    scale: f64,
    macro_names: Vec<String>,
    current: Point,
    aperture: Option<u32>,
    polarity: Polarity,
    interpolation: InterpolationMode,
    quadrant: QuadrantMode,
    region: Option<RegionBuilder>,
    macros: HashMap<String, ApertureMacro>,
    apertures: HashMap<u32, Aperture>,
    primitives: Vec<Primitive>,
    warnings: Vec<String>,
    command_count: u32,
    dropped: u32,
    ended: bool,
}

/// Parse a Gerber file into primitives.
///
/// # Errors
///
/// Returns [`GeometryError::ParseError`] for empty or non-UTF-8 input, a
/// malformed coordinate or format statement and an unreadable aperture
/// definition; [`GeometryError::MacroError`] for a macro that cannot be read
/// or evaluated. Either error drops the whole layer.
pub fn parse(data: &[u8]) -> Result<ParsedPlot, GeometryError> {
    if data.is_empty() {
        return Err(GeometryError::ParseError("empty input".to_string()));
    }
    let content = std::str::from_utf8(data)
        .map_err(|err| GeometryError::ParseError(format!("invalid UTF-8 input: {err}")))?;

    let Normalized {
        text,
        legacy_units,
        aperture_codes,
        macro_names,
        coordinate_blocks,
        warnings,
    } = normalize(content)?;

    let doc = match gerber_parser::parse(BufReader::new(Cursor::new(text.as_bytes()))) {
        Ok(doc) => doc,
        Err((_, err)) => {
            return Err(GeometryError::ParseError(format!("unreadable plot: {err:?}")));
        }
    };

    if coordinate_blocks > 0 && doc.format_specification.is_none() {
        return Err(GeometryError::ParseError(
            "coordinate data without a readable %FS format statement".to_string(),
        ));
    }
    if let Some(code) = aperture_codes
        .into_iter()
        .find(|code| !doc.apertures.contains_key(code))
    {
        return Err(GeometryError::ParseError(format!(
            "aperture definition D{code} could not be read"
        )));
    }

    let units = match doc.units {
        Some(Unit::Millimeters) => Units::Millimeters,
        Some(Unit::Inches) => Units::Inches,
        None => legacy_units.unwrap_or_default(),
    };

    let mut state = PlotState {
        scale: units.to_mm(),
        macro_names,
        warnings,
        ..PlotState::default()
    };
    if doc.units.is_none() && legacy_units.is_none() {
        state.warn("units not declared; assuming millimetres".to_string());
    }
    for error in doc.errors() {
        warn!(error = %error, "plot command skipped");
        state.warn(error.to_string());
    }

    for command in doc.commands() {
        if state.ended {
            break;
        }
        state.command_count = state.command_count.saturating_add(1);
        state.command(command)?;
    }

    if state.region.is_some() {
        state.warn("file ended inside a region; region closed".to_string());
        state.end_region();
    }

    debug!(
        primitives = state.primitives.len(),
        apertures = state.apertures.len(),
        warnings = state.warnings.len(),
        "parsed plot"
    );

    Ok(ParsedPlot {
        primitives: state.primitives,
        apertures: state.apertures,
        units,
        warnings: state.warnings,
        command_count: state.command_count,
        dropped: state.dropped,
    })
}

impl PlotState {
    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    fn command(&mut self, command: &Command) -> Result<(), GeometryError> {
        match command {
            Command::FunctionCode(FunctionCode::DCode(DCode::SelectAperture(code))) => {
                self.aperture = u32::try_from(*code).ok();
            }
            Command::FunctionCode(FunctionCode::DCode(DCode::Operation(operation))) => {
                self.operation(operation);
            }
            Command::FunctionCode(FunctionCode::GCode(code)) => self.g_code(code),
            Command::FunctionCode(FunctionCode::MCode(_)) => self.ended = true,
            Command::ExtendedCode(code) => self.extended(code)?,
        }
        Ok(())
    }

    fn g_code(&mut self, code: &GCode) {
        match code {
            GCode::InterpolationMode(mode) => {
                self.interpolation = match mode {
                    gerber_types::InterpolationMode::Linear => InterpolationMode::Linear,
                    gerber_types::InterpolationMode::ClockwiseCircular => {
                        InterpolationMode::ClockwiseArc
                    }
                    gerber_types::InterpolationMode::CounterclockwiseCircular => {
                        InterpolationMode::CounterClockwiseArc
                    }
                };
            }
            GCode::QuadrantMode(mode) => {
                self.quadrant = match mode {
                    gerber_types::QuadrantMode::Single => QuadrantMode::Single,
                    gerber_types::QuadrantMode::Multi => QuadrantMode::Multi,
                };
            }
            GCode::RegionMode(true) => {
                if self.region.is_some() {
                    self.warn("G36 inside a region; previous region closed".to_string());
                    self.end_region();
                }
                self.region = Some(RegionBuilder::default());
            }
            GCode::RegionMode(false) => {
                if self.region.is_some() {
                    self.end_region();
                } else {
                    self.warn("G37 without G36 ignored".to_string());
                }
            }
            _ => {}
        }
    }

    fn extended(&mut self, code: &ExtendedCode) -> Result<(), GeometryError> {
        match code {
            ExtendedCode::ApertureMacro(macro_def) => {
                if self.macros.contains_key(&macro_def.name) {
                    self.warn(format!(
                        "macro `{}` redefined; last definition wins",
                        macro_def.name
                    ));
                }
                self.macros.insert(macro_def.name.clone(), macro_def.clone());
            }
            ExtendedCode::ApertureDefinition(definition) => self.define_aperture(definition)?,
            ExtendedCode::LoadPolarity(polarity) => {
                self.polarity = match polarity {
                    gerber_types::Polarity::Dark => Polarity::Dark,
                    gerber_types::Polarity::Clear => Polarity::Clear,
                };
            }
            ExtendedCode::StepAndRepeat(StepAndRepeat::Open {
                repeat_x, repeat_y, ..
            }) => {
                if *repeat_x > 1 || *repeat_y > 1 {
                    self.warn(format!(
                        "step and repeat {repeat_x}x{repeat_y} is not applied; geometry emitted once"
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn define_aperture(&mut self, definition: &ApertureDefinition) -> Result<(), GeometryError> {
        let Ok(code) = u32::try_from(definition.code) else {
            return Ok(());
        };
        let scale = self.scale;
        let shape = match &definition.aperture {
            PlotAperture::Circle(circle) => ApertureShape::Circle {
                diameter: circle.diameter * scale,
                hole: circle.hole_diameter.map(|h| h * scale),
            },
            PlotAperture::Rectangle(rect) => ApertureShape::Rectangle {
                width: rect.x * scale,
                height: rect.y * scale,
                hole: rect.hole_diameter.map(|h| h * scale),
            },
            PlotAperture::Obround(rect) => ApertureShape::Obround {
                width: rect.x * scale,
                height: rect.y * scale,
                hole: rect.hole_diameter.map(|h| h * scale),
            },
            PlotAperture::Polygon(polygon) => {
                let vertices = u32::from(polygon.vertices).clamp(3, 12);
                if vertices != u32::from(polygon.vertices) {
                    self.warn(format!(
                        "polygon aperture D{code} has {} vertices; using {vertices}",
                        polygon.vertices
                    ));
                }
                ApertureShape::Polygon {
                    diameter: polygon.diameter * scale,
                    vertices,
                    rotation: polygon.rotation.unwrap_or(0.0),
                    hole: polygon.hole_diameter.map(|h| h * scale),
                }
            }
            PlotAperture::Macro(name, params) => {
                let Some(macro_def) = self.macros.get(name) else {
                    if self.macro_names.contains(name) {
                        return Err(GeometryError::MacroError(format!(
                            "macro `{name}` could not be read"
                        )));
                    }
                    self.warn(format!(
                        "aperture D{code} uses undefined macro `{name}`; definition ignored"
                    ));
                    return Ok(());
                };
                let values = macro_eval::resolve_params(params.as_deref(), &mut self.warnings)?;
                let outlines =
                    macro_eval::evaluate(macro_def, &values, scale, &mut self.warnings)?;
                ApertureShape::Macro {
                    name: name.clone(),
                    outlines,
                }
            }
        };

        self.apertures.insert(code, Aperture { code, shape });
        Ok(())
    }

    fn operation(&mut self, operation: &Operation) {
        let (coordinates, offset) = match operation {
            Operation::Interpolate(coordinates, offset) => (coordinates, offset.as_ref()),
            Operation::Move(coordinates) | Operation::Flash(coordinates) => (coordinates, None),
        };
        let scale = self.scale;
        let axis = |value: Option<gerber_types::CoordinateNumber>, current: f64| {
            value.map_or(current, |v| f64::from(v) * scale)
        };
        let target = coordinates.as_ref().map_or(self.current, |c| {
            Point::new(axis(c.x, self.current.x), axis(c.y, self.current.y))
        });
        let offset = offset.map_or_else(Point::default, |o| {
            Point::new(axis(o.x, 0.0), axis(o.y, 0.0))
        });

        match operation {
            Operation::Move(_) => {
                if let Some(region) = self.region.as_mut() {
                    region.close_contour();
                }
            }
            Operation::Interpolate(..) => {
                let path = self.path_to(target, offset);
                if let Some(region) = self.region.as_mut() {
                    if region.current.is_empty() {
                        region.current.push(self.current);
                    }
                    region.current.extend(path.into_iter().skip(1));
                } else if let Some(aperture) = self.usable_aperture("draw") {
                    self.primitives.push(Primitive::Line(Stroke {
                        aperture,
                        polarity: self.polarity,
                        points: path,
                    }));
                }
            }
            Operation::Flash(_) => {
                if self.region.is_some() {
                    self.warn("flash inside a region ignored".to_string());
                } else if let Some(aperture) = self.usable_aperture("flash") {
                    self.primitives.push(Primitive::Flash {
                        point: target,
                        aperture,
                        polarity: self.polarity,
                    });
                }
            }
        }
        self.current = target;
    }

    fn usable_aperture(&mut self, what: &str) -> Option<u32> {
        match self.aperture {
            Some(code) if self.apertures.contains_key(&code) => Some(code),
            Some(code) => {
                self.dropped = self.dropped.saturating_add(1);
                self.warn(format!("{what} with undefined aperture D{code} dropped"));
                None
            }
            None => {
                self.dropped = self.dropped.saturating_add(1);
                self.warn(format!("{what} without a selected aperture dropped"));
                None
            }
        }
    }

    fn path_to(&mut self, target: Point, offset: Point) -> Vec<Point> {
        let from = self.current;
        let direction = match self.interpolation {
            InterpolationMode::Linear => return vec![from, target],
            InterpolationMode::ClockwiseArc => ArcDirection::Clockwise,
            InterpolationMode::CounterClockwiseArc => ArcDirection::CounterClockwise,
        };
        let result = match self.quadrant {
            QuadrantMode::Multi => {
                multi_quadrant_points(from, target, offset, direction, &mut self.warnings)
            }
            QuadrantMode::Single => {
                single_quadrant_points(from, target, offset, direction, &mut self.warnings)
            }
        };
        result.unwrap_or_else(|err| {
            self.warn(format!("{err}; drawn as a straight segment"));
            vec![from, target]
        })
    }

    fn end_region(&mut self) {
        let Some(mut region) = self.region.take() else {
            return;
        };
        region.close_contour();

        let total = region.contours.len();
        let contours: Vec<Vec<Point>> = region
            .contours
            .into_iter()
            .filter(|contour| contour.len() >= 3)
            .collect();
        if contours.len() < total {
            self.warn(format!(
                "{} region contour(s) with fewer than 3 points dropped",
                total - contours.len()
            ));
        }
        if contours.is_empty() {
            self.warn("region without a usable contour dropped".to_string());
            return;
        }
        self.primitives.push(Primitive::Region {
            contours,
            polarity: self.polarity,
        });
    }
}
