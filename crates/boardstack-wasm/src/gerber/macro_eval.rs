//! Aperture macro evaluation.
//!
//! When an `%AD` command instantiates a macro, [`evaluate`] binds the
//! parameters to `$1..$n`, runs the variable definitions and turns every
//! primitive into an exposure-tagged outline. Flashing the aperture later
//! only translates those outlines.

use std::collections::HashMap;

use gerber_types::{
    ApertureMacro, CenterLinePrimitive, CirclePrimitive, MacroBoolean, MacroContent, MacroDecimal,
    MacroInteger, OutlinePrimitive, PolygonPrimitive, ThermalPrimitive, VectorLinePrimitive,
};

use crate::error::GeometryError;
use crate::geometry::aperture::{
    circle_contour, rectangle_contour, regular_polygon_contour, rotate_point, CIRCLE_SEGMENTS,
};
use crate::geometry::Point;

use super::types::{MacroOutline, Polarity};

const DIVISION_BY_ZERO: &str = "division by zero in macro expression; evaluating to 0";
const MAX_NEST_WARN: u32 = 10;

/// Resolve `%AD` macro parameters. Each value becomes visible as `$n` to the
/// parameters after it.
///
/// # Errors
///
/// Returns [`GeometryError::MacroError`] for a malformed expression.
pub fn resolve_params(
    params: Option<&[MacroDecimal]>,
    warnings: &mut Vec<String>,
) -> Result<Vec<f64>, GeometryError> {
    let Some(params) = params else {
        return Ok(Vec::new());
    };
    let mut vars = HashMap::new();
    let mut resolved = Vec::with_capacity(params.len());
    for (number, param) in (1..).zip(params) {
        let value = Scope {
            vars: &vars,
            warnings: &mut *warnings,
        }
        .decimal(param)?;
        vars.insert(number, value);
        resolved.push(value);
    }
    Ok(resolved)
}

/// Evaluate `macro_def` with resolved `%AD` parameters. Coordinates are
/// multiplied by `scale` to reach millimetres.
///
/// # Errors
///
/// Returns [`GeometryError::MacroError`] for malformed expressions.
pub fn evaluate(
    macro_def: &ApertureMacro,
    params: &[f64],
    scale: f64,
    warnings: &mut Vec<String>,
) -> Result<Vec<MacroOutline>, GeometryError> {
    let mut vars: HashMap<u32, f64> = (1..).zip(params.iter().copied()).collect();

    let mut outlines = Vec::new();
    for content in &macro_def.content {
        let mut scope = Scope {
            vars: &vars,
            warnings: &mut *warnings,
        };
        match content {
            MacroContent::VariableDefinition(definition) => {
                let value = evaluate_expression(&definition.expression, &vars, warnings)?;
                vars.insert(definition.number, value);
            }
            MacroContent::Circle(circle) => scope.circle(circle, &mut outlines)?,
            MacroContent::VectorLine(line) => scope.vector_line(line, &mut outlines)?,
            MacroContent::CenterLine(line) => scope.center_line(line, &mut outlines)?,
            MacroContent::Outline(outline) => scope.outline(outline, &mut outlines)?,
            MacroContent::Polygon(polygon) => scope.polygon(polygon, &mut outlines)?,
            MacroContent::Thermal(thermal) => scope.thermal(thermal, &mut outlines)?,
            MacroContent::Moire(_) => warnings.push(format!(
                "moire primitive in macro `{}` is not supported; skipped",
                macro_def.name
            )),
            MacroContent::Comment(_) => {}
        }
    }

    for outline in &mut outlines {
        for point in &mut outline.contour {
            point.x *= scale;
            point.y *= scale;
        }
    }

    Ok(outlines)
}

/// Variable bindings in effect for one primitive.
struct Scope<'a> {
    vars: &'a HashMap<u32, f64>,
    warnings: &'a mut Vec<String>,
}

impl Scope<'_> {
    fn decimal(&mut self, value: &MacroDecimal) -> Result<f64, GeometryError> {
        match value {
            MacroDecimal::Value(v) => Ok(*v),
            MacroDecimal::Variable(n) => Ok(self.variable(*n)),
            MacroDecimal::Expression(expr) => evaluate_expression(expr, self.vars, self.warnings),
        }
    }

    fn point(&mut self, (x, y): &(MacroDecimal, MacroDecimal)) -> Result<Point, GeometryError> {
        Ok(Point::new(self.decimal(x)?, self.decimal(y)?))
    }

    fn exposure(&mut self, value: &MacroBoolean) -> Result<Polarity, GeometryError> {
        let on = match value {
            MacroBoolean::Value(on) => *on,
            MacroBoolean::Variable(n) => self.variable(*n) > 0.0,
            MacroBoolean::Expression(expr) => {
                evaluate_expression(expr, self.vars, self.warnings)? > 0.0
            }
        };
        Ok(if on { Polarity::Dark } else { Polarity::Clear })
    }

    fn integer(&mut self, value: &MacroInteger) -> Result<f64, GeometryError> {
        match value {
            MacroInteger::Value(v) => Ok(f64::from(*v)),
            MacroInteger::Variable(n) => Ok(self.variable(*n)),
            MacroInteger::Expression(expr) => evaluate_expression(expr, self.vars, self.warnings),
        }
    }

    fn variable(&mut self, number: u32) -> f64 {
        self.vars.get(&number).copied().unwrap_or_else(|| {
            self.warnings
                .push(format!("macro variable ${number} is undefined; using 0"));
            0.0
        })
    }

    fn circle(
        &mut self,
        circle: &CirclePrimitive,
        outlines: &mut Vec<MacroOutline>,
    ) -> Result<(), GeometryError> {
        let polarity = self.exposure(&circle.exposure)?;
        let diameter = self.decimal(&circle.diameter)?;
        let center = self.point(&circle.center)?;
        let angle = match &circle.angle {
            Some(angle) => self.decimal(angle)?,
            None => 0.0,
        };
        if diameter > 0.0 {
            push(
                outlines,
                polarity,
                circle_contour(center, diameter / 2.0, CIRCLE_SEGMENTS),
                angle,
            );
        }
        Ok(())
    }

    fn vector_line(
        &mut self,
        line: &VectorLinePrimitive,
        outlines: &mut Vec<MacroOutline>,
    ) -> Result<(), GeometryError> {
        let polarity = self.exposure(&line.exposure)?;
        let width = self.decimal(&line.width)?;
        let start = self.point(&line.start)?;
        let end = self.point(&line.end)?;
        let angle = self.decimal(&line.angle)?;

        let length = start.distance(end);
        if width <= 0.0 || length <= f64::EPSILON {
            return Ok(());
        }
        let half = width / 2.0;
        let nx = -(end.y - start.y) / length * half;
        let ny = (end.x - start.x) / length * half;
        let contour = vec![
            start.offset(-nx, -ny),
            end.offset(-nx, -ny),
            end.offset(nx, ny),
            start.offset(nx, ny),
        ];
        push(outlines, polarity, contour, angle);
        Ok(())
    }

    fn center_line(
        &mut self,
        line: &CenterLinePrimitive,
        outlines: &mut Vec<MacroOutline>,
    ) -> Result<(), GeometryError> {
        let polarity = self.exposure(&line.exposure)?;
        let width = self.decimal(&line.dimensions.0)?;
        let height = self.decimal(&line.dimensions.1)?;
        let center = self.point(&line.center)?;
        let angle = self.decimal(&line.angle)?;
        if width > 0.0 && height > 0.0 {
            push(
                outlines,
                polarity,
                rectangle_contour(center, width, height),
                angle,
            );
        }
        Ok(())
    }

    fn outline(
        &mut self,
        outline: &OutlinePrimitive,
        outlines: &mut Vec<MacroOutline>,
    ) -> Result<(), GeometryError> {
        let polarity = self.exposure(&outline.exposure)?;
        let mut contour = outline
            .points
            .iter()
            .map(|point| self.point(point))
            .collect::<Result<Vec<_>, _>>()?;
        let angle = self.decimal(&outline.angle)?;

        if contour.len() > 1 && contour.first() == contour.last() {
            contour.pop();
        }
        if contour.len() >= 3 {
            push(outlines, polarity, contour, angle);
        }
        Ok(())
    }

    fn polygon(
        &mut self,
        polygon: &PolygonPrimitive,
        outlines: &mut Vec<MacroOutline>,
    ) -> Result<(), GeometryError> {
        let polarity = self.exposure(&polygon.exposure)?;
        let vertices_raw = self.integer(&polygon.vertices)?;
        let center = self.point(&polygon.center)?;
        let diameter = self.decimal(&polygon.diameter)?;
        let angle = self.decimal(&polygon.angle)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let vertices = vertices_raw.round().clamp(3.0, 12.0) as u32;
        if diameter > 0.0 {
            push(
                outlines,
                polarity,
                regular_polygon_contour(center, diameter, vertices, 0.0),
                angle,
            );
        }
        Ok(())
    }

    /// Ring with two perpendicular gaps. Always dark.
    fn thermal(
        &mut self,
        thermal: &ThermalPrimitive,
        outlines: &mut Vec<MacroOutline>,
    ) -> Result<(), GeometryError> {
        let center = self.point(&thermal.center)?;
        let outer = self.decimal(&thermal.outer_diameter)?;
        let inner = self.decimal(&thermal.inner_diameter)?;
        let gap = self.decimal(&thermal.gap)?;
        let angle = self.decimal(&thermal.angle)?;
        if outer <= 0.0 || inner >= outer {
            return Ok(());
        }

        push(
            outlines,
            Polarity::Dark,
            circle_contour(center, outer / 2.0, CIRCLE_SEGMENTS),
            angle,
        );
        if inner > 0.0 {
            push(
                outlines,
                Polarity::Clear,
                circle_contour(center, inner / 2.0, CIRCLE_SEGMENTS),
                angle,
            );
        }
        if gap > 0.0 {
            let span = outer * 1.1;
            push(
                outlines,
                Polarity::Clear,
                rectangle_contour(center, span, gap),
                angle,
            );
            push(
                outlines,
                Polarity::Clear,
                rectangle_contour(center, gap, span),
                angle,
            );
        }
        Ok(())
    }
}

fn push(outlines: &mut Vec<MacroOutline>, polarity: Polarity, contour: Vec<Point>, angle: f64) {
    let contour = contour
        .into_iter()
        .map(|point| rotate_point(point, angle))
        .collect();
    outlines.push(MacroOutline { polarity, contour });
}

/// Evaluate a macro arithmetic expression (`+ - x /`, parentheses, `$n`).
///
/// # Errors
///
/// Returns [`GeometryError::MacroError`] when the expression is malformed.
pub fn evaluate_expression(
    expr: &str,
    vars: &HashMap<u32, f64>,
    warnings: &mut Vec<String>,
) -> Result<f64, GeometryError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(0.0);
    }
    let tokens = tokenize(expr)?;
    let mut parser = ExprParser { vars, warnings };
    let (value, rest) = parser.additive(&tokens, 0)?;
    if rest.is_empty() {
        Ok(value)
    } else {
        Err(GeometryError::MacroError(format!(
            "unexpected tokens in expression `{expr}`"
        )))
    }
}

#[derive(Debug, Clone)]
enum Token {
    Number(f64),
    Variable(u32),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, GeometryError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' => {}
            '+' | '-' | '/' => tokens.push(Token::Op(c)),
            'x' | 'X' => tokens.push(Token::Op('x')),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '$' => {
                let mut num = String::new();
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    num.push(d);
                }
                let n: u32 = num.parse().map_err(|_| {
                    GeometryError::MacroError(format!("invalid variable `${num}`"))
                })?;
                tokens.push(Token::Variable(n));
            }
            '0'..='9' | '.' => {
                let mut num = String::from(c);
                while let Some(d) = chars.next_if(|p| p.is_ascii_digit() || *p == '.') {
                    num.push(d);
                }
                let v: f64 = num
                    .parse()
                    .map_err(|_| GeometryError::MacroError(format!("invalid number `{num}`")))?;
                tokens.push(Token::Number(v));
            }
            _ => {
                return Err(GeometryError::MacroError(format!(
                    "unexpected character `{c}` in expression"
                )));
            }
        }
    }

    Ok(tokens)
}

struct ExprParser<'a> {
    vars: &'a HashMap<u32, f64>,
    warnings: &'a mut Vec<String>,
}

type Parsed<'t> = Result<(f64, &'t [Token]), GeometryError>;

impl ExprParser<'_> {
    fn additive<'t>(&mut self, tokens: &'t [Token], depth: u32) -> Parsed<'t> {
        let (mut left, mut rest) = self.multiplicative(tokens, depth)?;
        while let Some((Token::Op(op @ ('+' | '-')), tail)) = rest.split_first() {
            let (right, new_rest) = self.multiplicative(tail, depth)?;
            left = if *op == '+' { left + right } else { left - right };
            rest = new_rest;
        }
        Ok((left, rest))
    }

    fn multiplicative<'t>(&mut self, tokens: &'t [Token], depth: u32) -> Parsed<'t> {
        let (mut left, mut rest) = self.unary(tokens, depth)?;
        while let Some((Token::Op(op @ ('x' | '/')), tail)) = rest.split_first() {
            let (right, new_rest) = self.unary(tail, depth)?;
            left = if *op == 'x' {
                left * right
            } else if right.abs() < f64::EPSILON {
                self.warnings.push(DIVISION_BY_ZERO.to_string());
                0.0
            } else {
                left / right
            };
            rest = new_rest;
        }
        Ok((left, rest))
    }

    fn unary<'t>(&mut self, tokens: &'t [Token], depth: u32) -> Parsed<'t> {
        let Some((first, tail)) = tokens.split_first() else {
            return Err(GeometryError::MacroError(
                "expression ended early".to_string(),
            ));
        };
        match first {
            Token::Op('+') => self.unary(tail, depth),
            Token::Op('-') => {
                let (v, rest) = self.unary(tail, depth)?;
                Ok((-v, rest))
            }
            Token::LParen => {
                let depth = depth + 1;
                if depth == MAX_NEST_WARN + 1 {
                    self.warnings
                        .push(format!("expression nesting exceeds {MAX_NEST_WARN} levels"));
                }
                let (v, rest) = self.additive(tail, depth)?;
                match rest.split_first() {
                    Some((Token::RParen, after)) => Ok((v, after)),
                    _ => Err(GeometryError::MacroError("missing ')'".to_string())),
                }
            }
            Token::Number(n) => Ok((*n, tail)),
            Token::Variable(n) => {
                let value = self.vars.get(n).copied().unwrap_or_else(|| {
                    self.warnings
                        .push(format!("macro variable ${n} is undefined; using 0"));
                    0.0
                });
                Ok((value, tail))
            }
            Token::Op(_) | Token::RParen => Err(GeometryError::MacroError(
                "expected number, variable, or '('".to_string(),
            )),
        }
    }
}
