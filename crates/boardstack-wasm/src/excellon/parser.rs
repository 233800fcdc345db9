//! Excellon drill parser.
//!
//! Two passes over the file. The first reads the `M48` header: units, zero
//! format and the tool table. The second walks the body. Each line is parsed
//! on its own into a `Result`, and a fold sorts it into the succeeded,
//! failed or skipped counter, so a malformed line never aborts the file.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::GeometryError;
use crate::geometry::Point;

use super::types::{
    DrillKind, DrillRecord, ExcellonResult, ExcellonUnits, LineCounters, ToolDefinition,
};

/// Which zeros are omitted from integer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZeroSuppression {
    /// `TZ`: trailing zeros kept, leading zeros omitted; values are right-aligned.
    Leading,
    /// `LZ`: leading zeros kept, trailing zeros omitted; values are left-aligned.
    Trailing,
}

/// Digit layout of coordinates written without a decimal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DigitFormat {
    integer: u8,
    decimal: u8,
    omitted: ZeroSuppression,
}

impl DigitFormat {
    /// 2.4 for inch files, 3.3 for metric files.
    const fn for_units(units: ExcellonUnits, omitted: ZeroSuppression) -> Self {
        match units {
            ExcellonUnits::Metric => Self {
                integer: 3,
                decimal: 3,
                omitted,
            },
            ExcellonUnits::Imperial => Self {
                integer: 2,
                decimal: 4,
                omitted,
            },
        }
    }

    /// Decode one axis value, in file units.
    fn decode(self, raw: &str) -> Result<f64, GeometryError> {
        if raw.contains('.') {
            return number(raw, "coordinate");
        }
        let (negative, digits) = raw.strip_prefix('-').map_or_else(
            || (false, raw.strip_prefix('+').unwrap_or(raw)),
            |digits| (true, digits),
        );
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GeometryError::ParseError(format!(
                "coordinate `{raw}` is not a number"
            )));
        }

        let magnitude: f64 = number(digits, "coordinate")?;
        // Left-aligned values are short by their omitted trailing zeros.
        let padding = match self.omitted {
            ZeroSuppression::Leading => 0,
            ZeroSuppression::Trailing => {
                let width = usize::from(self.integer) + usize::from(self.decimal);
                i32::try_from(width.saturating_sub(digits.len())).unwrap_or(0)
            }
        };
        let value = magnitude * 10f64.powi(padding) / 10f64.powi(i32::from(self.decimal));
        Ok(if negative { -value } else { value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Drill,
    Rapid,
    Linear,
}

/// What a successfully parsed line did.
#[derive(Debug, Clone, PartialEq)]
enum LineOutcome {
    Applied,
    Skipped(String),
}

/// A `Tnn` word: a bare selection, or a definition when it carries a `C` diameter.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ToolWord {
    Select(u32),
    Define(u32, f64),
}

#[derive(Debug)]
struct ParserState {
    units: ExcellonUnits,
    format: DigitFormat,
    declared_units: bool,
    explicit_digits: bool,
    tools: HashMap<u32, f64>,
    current_tool: Option<u32>,
    position: Point,
    incremental: bool,
    mode: Mode,
    tool_down: bool,
    ended: bool,
    records: Vec<DrillRecord>,
    warnings: Vec<String>,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            units: ExcellonUnits::Imperial,
            format: DigitFormat::for_units(ExcellonUnits::Imperial, ZeroSuppression::Leading),
            declared_units: false,
            explicit_digits: false,
            tools: HashMap::new(),
            current_tool: None,
            position: Point::default(),
            incremental: false,
            mode: Mode::Drill,
            tool_down: false,
            ended: false,
            records: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Parse an Excellon drill file.
///
/// # Errors
///
/// Returns [`GeometryError::ParseError`] only if the input is empty or not
/// valid UTF-8. Malformed lines are counted in [`ExcellonResult::counters`].
pub fn parse(data: &[u8]) -> Result<ExcellonResult, GeometryError> {
    if data.is_empty() {
        return Err(GeometryError::ParseError("drill file is empty".to_string()));
    }
    let content = std::str::from_utf8(data)
        .map_err(|err| GeometryError::ParseError(format!("drill file is not UTF-8: {err}")))?;

    let lines = classify_lines(content);
    let mut state = ParserState::default();

    let header_counters = lines
        .iter()
        .filter(|(section, _, _)| *section == Section::Header)
        .fold(LineCounters::default(), |counters, (_, number, line)| {
            let outcome = parse_header_line(line, &mut state);
            record_outcome(counters, &mut state, *number, outcome)
        });

    let body_counters = lines
        .iter()
        .filter(|(section, _, _)| *section == Section::Body)
        .fold(LineCounters::default(), |counters, (_, number, line)| {
            let outcome = if state.ended {
                Ok(LineOutcome::Skipped(format!(
                    "line {number}: after end of program"
                )))
            } else {
                parse_body_line(line, &mut state)
            };
            record_outcome(counters, &mut state, *number, outcome)
        });

    let mut counters = header_counters;
    counters.absorb(body_counters);

    let mut tools: Vec<ToolDefinition> = state
        .tools
        .iter()
        .map(|(number, diameter)| ToolDefinition {
            number: *number,
            diameter: *diameter,
        })
        .collect();
    tools.sort_by_key(|tool| tool.number);

    debug!(
        records = state.records.len(),
        tools = tools.len(),
        succeeded = counters.succeeded,
        failed = counters.failed,
        skipped = counters.skipped,
        "parsed drill file"
    );

    Ok(ExcellonResult {
        records: state.records,
        tools,
        units: state.units,
        warnings: state.warnings,
        counters,
    })
}

/// Pass one: split non-blank, non-comment lines into header and body.
fn classify_lines(content: &str) -> Vec<(Section, usize, String)> {
    let mut section = Section::Body;
    let mut lines = Vec::new();
    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        let normalized = line.to_ascii_uppercase();
        match normalized.as_str() {
            "M48" => {
                section = Section::Header;
                lines.push((Section::Header, index + 1, normalized));
            }
            "%" | "M95" if section == Section::Header => {
                lines.push((Section::Header, index + 1, normalized));
                section = Section::Body;
            }
            _ => lines.push((section, index + 1, normalized)),
        }
    }
    lines
}

fn record_outcome(
    mut counters: LineCounters,
    state: &mut ParserState,
    number: usize,
    outcome: Result<LineOutcome, GeometryError>,
) -> LineCounters {
    match outcome {
        Ok(LineOutcome::Applied) => counters.succeeded = counters.succeeded.saturating_add(1),
        Ok(LineOutcome::Skipped(reason)) => {
            counters.skipped = counters.skipped.saturating_add(1);
            state.warnings.push(reason);
        }
        Err(err) => {
            counters.failed = counters.failed.saturating_add(1);
            warn!(line = number, error = %err, "drill line skipped");
            state.warnings.push(format!("line {number}: {err}"));
        }
    }
    counters
}

fn parse_header_line(line: &str, state: &mut ParserState) -> Result<LineOutcome, GeometryError> {
    if matches!(line, "M48" | "%" | "M95") {
        return Ok(LineOutcome::Applied);
    }
    if apply_units_directive(line, state)? {
        return Ok(LineOutcome::Applied);
    }
    match tool_word(line)? {
        Some(ToolWord::Define(tool, diameter)) => return Ok(register_tool(state, tool, diameter)),
        Some(ToolWord::Select(tool)) => {
            return Ok(LineOutcome::Skipped(format!(
                "tool selection T{tool} in header ignored"
            )))
        }
        None => {}
    }
    if ["FMAT", "VER", "ICI", "DETECT", "ATC", "OFF", "R,", "G"]
        .iter()
        .any(|prefix| line.starts_with(prefix))
    {
        return Ok(LineOutcome::Skipped(format!(
            "header command `{line}` not applied"
        )));
    }
    Err(GeometryError::ParseError(format!(
        "unrecognised header line `{line}`"
    )))
}

fn parse_body_line(line: &str, state: &mut ParserState) -> Result<LineOutcome, GeometryError> {
    if apply_units_directive(line, state)? {
        return Ok(LineOutcome::Applied);
    }

    match line {
        "%" | "M48" | "M95" | "M47" => return Ok(LineOutcome::Applied),
        "M30" | "M00" => {
            state.ended = true;
            return Ok(LineOutcome::Applied);
        }
        "M15" => {
            state.tool_down = true;
            return Ok(LineOutcome::Applied);
        }
        "M16" | "M17" => {
            state.tool_down = false;
            return Ok(LineOutcome::Applied);
        }
        "G05" | "G81" => {
            state.mode = Mode::Drill;
            state.tool_down = false;
            return Ok(LineOutcome::Applied);
        }
        "G90" => {
            state.incremental = false;
            return Ok(LineOutcome::Applied);
        }
        "G91" => {
            state.incremental = true;
            return Ok(LineOutcome::Applied);
        }
        _ => {}
    }

    match tool_word(line)? {
        Some(ToolWord::Define(tool, diameter)) => {
            let outcome = register_tool(state, tool, diameter);
            if outcome == LineOutcome::Applied {
                state.current_tool = Some(tool);
            }
            return Ok(outcome);
        }
        Some(ToolWord::Select(0)) => {
            state.current_tool = None;
            return Ok(LineOutcome::Applied);
        }
        Some(ToolWord::Select(tool)) => {
            if state.tools.contains_key(&tool) {
                state.current_tool = Some(tool);
                return Ok(LineOutcome::Applied);
            }
            state.current_tool = None;
            return Ok(LineOutcome::Skipped(format!(
                "tool T{tool} selected but not defined"
            )));
        }
        None => {}
    }

    if let Some((first, second)) = line.split_once("G85") {
        let start = parse_xy(first, state)?;
        let end = parse_xy_from(second, start, state)?;
        state.position = end;
        return Ok(emit_route(state, start, end));
    }

    for (prefix, mode) in [("G00", Mode::Rapid), ("G01", Mode::Linear)] {
        if let Some(rest) = line.strip_prefix(prefix) {
            state.mode = mode;
            if rest.is_empty() {
                return Ok(LineOutcome::Applied);
            }
            return move_to(rest, state);
        }
    }

    for prefix in ["G02", "G03"] {
        if let Some(rest) = line.strip_prefix(prefix) {
            if !rest.is_empty() {
                state.position = parse_xy(rest, state)?;
            }
            return Ok(LineOutcome::Skipped(format!(
                "circular route `{line}` not supported"
            )));
        }
    }

    if line.starts_with('X') || line.starts_with('Y') {
        return move_to(line, state);
    }

    if ["G93", "G40", "G41", "G42", "R", "M97", "M98", "M25", "M01", "M02", "M08", "M09"]
        .iter()
        .any(|prefix| line.starts_with(prefix))
    {
        return Ok(LineOutcome::Skipped(format!("command `{line}` not supported")));
    }

    Err(GeometryError::ParseError(format!(
        "unrecognised line `{line}`"
    )))
}

/// Apply a coordinate line under the current mode.
fn move_to(coordinates: &str, state: &mut ParserState) -> Result<LineOutcome, GeometryError> {
    let start = state.position;
    let target = parse_xy(coordinates, state)?;
    state.position = target;
    match state.mode {
        Mode::Drill => Ok(emit_plunge(state, target)),
        Mode::Rapid => Ok(LineOutcome::Applied),
        Mode::Linear if state.tool_down => Ok(emit_route(state, start, target)),
        Mode::Linear => Ok(LineOutcome::Applied),
    }
}

fn selected_tool(state: &ParserState) -> Result<(u32, f64), String> {
    let Some(tool) = state.current_tool else {
        return Err("no tool selected".to_string());
    };
    state
        .tools
        .get(&tool)
        .map(|diameter| (tool, *diameter))
        .ok_or_else(|| format!("selected tool T{tool} is undefined"))
}

fn emit_plunge(state: &mut ParserState, at: Point) -> LineOutcome {
    match selected_tool(state) {
        Ok((tool, diameter)) => {
            state.records.push(DrillRecord {
                tool,
                diameter,
                position: at,
                kind: DrillKind::Plunge,
            });
            LineOutcome::Applied
        }
        Err(reason) => LineOutcome::Skipped(format!("hole at ({}, {}) skipped: {reason}", at.x, at.y)),
    }
}

/// Emit a route as a chain of records no longer than one tool radius each.
fn emit_route(state: &mut ParserState, start: Point, end: Point) -> LineOutcome {
    let (tool, diameter) = match selected_tool(state) {
        Ok(selected) => selected,
        Err(reason) => {
            return LineOutcome::Skipped(format!(
                "route to ({}, {}) skipped: {reason}",
                end.x, end.y
            ))
        }
    };

    let length = start.distance(end);
    let radius = diameter / 2.0;
    if length <= f64::EPSILON {
        return emit_plunge(state, start);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pieces = ((length / radius).ceil() as u32).max(1);
    let step = |i: u32| {
        let t = f64::from(i) / f64::from(pieces);
        Point::new(
            (end.x - start.x).mul_add(t, start.x),
            (end.y - start.y).mul_add(t, start.y),
        )
    };
    for i in 0..pieces {
        state.records.push(DrillRecord {
            tool,
            diameter,
            position: step(i),
            kind: DrillKind::Route { end: step(i + 1) },
        });
    }
    LineOutcome::Applied
}

/// Apply `METRIC`/`INCH`/`M71`/`M72` with their `TZ`, `LZ` and `000.000` options.
fn apply_units_directive(line: &str, state: &mut ParserState) -> Result<bool, GeometryError> {
    let directive = [
        ("METRIC", ExcellonUnits::Metric),
        ("INCH", ExcellonUnits::Imperial),
        ("M71", ExcellonUnits::Metric),
        ("M72", ExcellonUnits::Imperial),
    ]
    .into_iter()
    .find_map(|(word, units)| line.strip_prefix(word).map(|options| (units, options)));
    let Some((units, options)) = directive else {
        return Ok(false);
    };

    let mut omitted = state.format.omitted;
    let mut layout = state
        .explicit_digits
        .then_some((state.format.integer, state.format.decimal));
    for option in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        match option {
            "TZ" => omitted = ZeroSuppression::Leading,
            "LZ" => omitted = ZeroSuppression::Trailing,
            other => layout = Some(digit_layout(other)?),
        }
    }

    if state.declared_units && state.units != units {
        state
            .warnings
            .push("conflicting unit declarations; the last one applies".to_string());
    }
    state.units = units;
    state.declared_units = true;
    state.explicit_digits = layout.is_some();
    state.format = layout.map_or(
        DigitFormat::for_units(units, omitted),
        |(integer, decimal)| DigitFormat {
            integer,
            decimal,
            omitted,
        },
    );
    Ok(true)
}

/// `000.000`: digit counts before and after the implied point.
fn digit_layout(option: &str) -> Result<(u8, u8), GeometryError> {
    let invalid = || GeometryError::ParseError(format!("unknown unit option `{option}`"));
    let (integer, decimal) = option.split_once('.').ok_or_else(invalid)?;
    if !integer.bytes().chain(decimal.bytes()).all(|b| b == b'0') {
        return Err(invalid());
    }
    let count = |part: &str| u8::try_from(part.len()).map_err(|_| invalid());
    Ok((count(integer)?, count(decimal)?))
}

fn register_tool(state: &mut ParserState, tool: u32, diameter: f64) -> LineOutcome {
    if diameter <= 0.0 {
        return LineOutcome::Skipped(format!(
            "T{tool} ignored: diameter {diameter} is not positive"
        ));
    }
    let millimeters = diameter * state.units.to_mm();
    if state.tools.insert(tool, millimeters).is_some() {
        state
            .warnings
            .push(format!("T{tool} redefined; the later diameter applies"));
    }
    LineOutcome::Applied
}

/// `Tnn`, optionally followed by letter fields such as `C0.8`, `F200` or `S30`.
fn tool_word(line: &str) -> Result<Option<ToolWord>, GeometryError> {
    let Some(after_t) = line.strip_prefix('T') else {
        return Ok(None);
    };
    let split = after_t
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_t.len());
    let (tool_raw, mut fields) = after_t.split_at(split);
    if tool_raw.is_empty() {
        return Err(GeometryError::ParseError(format!(
            "tool word `{line}` has no number"
        )));
    }
    let tool = number(tool_raw, "tool number")?;

    let mut diameter = None;
    while let Some(letter) = fields.chars().next() {
        if !letter.is_ascii_uppercase() {
            return Err(GeometryError::ParseError(format!(
                "unexpected `{letter}` in tool word `{line}`"
            )));
        }
        let body = fields.get(1..).unwrap_or_default();
        let end = body
            .find(|c: char| c.is_ascii_uppercase())
            .unwrap_or(body.len());
        let (value, next) = body.split_at(end);
        if letter == 'C' {
            diameter = Some(number::<f64>(value, "tool diameter")?);
        }
        fields = next;
    }

    Ok(Some(diameter.map_or(ToolWord::Select(tool), |diameter| {
        ToolWord::Define(tool, diameter)
    })))
}

fn parse_xy(raw: &str, state: &ParserState) -> Result<Point, GeometryError> {
    parse_xy_from(raw, state.position, state)
}

/// Parse `X..Y..`, either axis optional. Missing axes keep `base`.
fn parse_xy_from(raw: &str, base: Point, state: &ParserState) -> Result<Point, GeometryError> {
    let (x_raw, y_raw) = if let Some(after_x) = raw.strip_prefix('X') {
        after_x
            .split_once('Y')
            .map_or((Some(after_x), None), |(x, y)| (Some(x), Some(y)))
    } else if let Some(after_y) = raw.strip_prefix('Y') {
        (None, Some(after_y))
    } else {
        return Err(GeometryError::ParseError(format!(
            "`{raw}` is not a coordinate"
        )));
    };

    let scale = state.units.to_mm();
    let resolve = |raw: Option<&str>, current: f64| -> Result<f64, GeometryError> {
        let Some(raw) = raw else {
            return Ok(current);
        };
        let value = state.format.decode(raw)? * scale;
        Ok(if state.incremental { current + value } else { value })
    };
    Ok(Point::new(resolve(x_raw, base.x)?, resolve(y_raw, base.y)?))
}

fn number<T>(raw: &str, what: &str) -> Result<T, GeometryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|err| GeometryError::ParseError(format!("bad {what} `{raw}`: {err}")))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const FIXTURE: &[u8] = include_bytes!("../../tests/fixtures/minimal/board_drill.txt");

    fn records(input: &[u8]) -> Vec<DrillRecord> {
        parse(input).map(|parsed| parsed.records).unwrap_or_default()
    }

    fn first_position(input: &[u8]) -> Option<(f64, f64)> {
        records(input)
            .first()
            .map(|record| (record.position.x, record.position.y))
    }

    #[test]
    fn ut_exc_001_fixture_tools_and_holes() {
        let result = parse(FIXTURE);
        assert!(result.is_ok(), "fixture should parse: {:?}", result.as_ref().err());
        let Ok(parsed) = result else {
            return;
        };
        assert_eq!(parsed.tools.len(), 2);
        assert_eq!(parsed.records.len(), 5);
        assert_eq!(parsed.counters.failed, 0);
        let first = parsed.records.first();
        assert!(first.is_some(), "first hole missing");
        if let Some(first) = first {
            assert_relative_eq!(first.position.x, 2.54, epsilon = 1e-9);
            assert_relative_eq!(first.position.y, 2.54, epsilon = 1e-9);
            assert_relative_eq!(first.diameter, 0.8, epsilon = 1e-9);
        }
    }

    #[test]
    fn ut_exc_002_fixture_is_metric() {
        assert!(parse(FIXTURE).is_ok_and(|parsed| parsed.units == ExcellonUnits::Metric));
    }

    #[test]
    fn ut_exc_003_inch_values_become_millimetres() {
        let parsed = parse(b"M48\nINCH,TZ\nT1C0.04\n%\nT1\nX10000Y20000\nM30\n");
        assert!(parsed.as_ref().is_ok_and(|p| p.units == ExcellonUnits::Imperial));
        let hole = parsed.ok().and_then(|p| p.records.first().copied());
        assert!(hole.is_some(), "hole missing");
        if let Some(hole) = hole {
            assert_relative_eq!(hole.position.x, 25.4, epsilon = 1e-9);
            assert_relative_eq!(hole.position.y, 50.8, epsilon = 1e-9);
            assert_relative_eq!(hole.diameter, 1.016, epsilon = 1e-9);
        }
    }

    #[test]
    fn ut_exc_004_tz_values_are_right_aligned() {
        let position = first_position(b"M48\nMETRIC,TZ\nT1C1.0\n%\nT1\nX1500Y2500\nM30\n");
        assert!(position.is_some_and(|(x, y)| (x - 1.5).abs() < 1e-9 && (y - 2.5).abs() < 1e-9));
    }

    #[test]
    fn ut_exc_005_lz_values_are_left_aligned() {
        let position = first_position(b"M48\nMETRIC,LZ\nT1C1.0\n%\nT1\nX0015Y025\nM30\n");
        assert!(position.is_some_and(|(x, y)| (x - 1.5).abs() < 1e-9 && (y - 25.0).abs() < 1e-9));
    }

    #[test]
    fn ut_exc_006_explicit_digit_layout() {
        let position = first_position(b"M48\nMETRIC,TZ,0000.00\nT1C1.0\n%\nT1\nX150Y250\nM30\n");
        assert!(position.is_some_and(|(x, y)| (x - 1.5).abs() < 1e-9 && (y - 2.5).abs() < 1e-9));
    }

    #[test]
    fn ut_exc_007_missing_axis_keeps_previous_value() {
        let holes = records(b"M48\nMETRIC\nT1C0.8\n%\nT1\nX1.0Y2.0\nX3.0\nY4.0\nM30\n");
        let positions: Vec<(f64, f64)> = holes.iter().map(|r| (r.position.x, r.position.y)).collect();
        assert_eq!(positions, vec![(1.0, 2.0), (3.0, 2.0), (3.0, 4.0)]);
    }

    #[test]
    fn ut_exc_008_route_is_split_into_radius_pieces() {
        let holes = records(b"M48\nMETRIC\nT1C1.0\n%\nT1\nG00X0.0Y0.0\nM15\nG01X2.0Y0.0\nM16\nM30\n");
        assert_eq!(holes.len(), 4);
        assert!(holes.iter().all(|hole| matches!(
            hole.kind,
            DrillKind::Route { end } if end.distance(hole.position) <= 0.5 + 1e-9
        )));
        let last_end = holes.last().and_then(|r| match r.kind {
            DrillKind::Route { end } => Some(end.x),
            DrillKind::Plunge => None,
        });
        assert!(last_end.is_some_and(|x| (x - 2.0).abs() < 1e-9));
    }

    #[test]
    fn ut_exc_009_g85_slot_is_routed() {
        let holes = records(b"M48\nMETRIC\nT1C1.0\n%\nT1\nX0.0Y0.0G85X1.0Y0.0\nM30\n");
        assert_eq!(holes.len(), 2);
        assert!(holes.iter().all(|r| matches!(r.kind, DrillKind::Route { .. })));
    }

    #[test]
    fn ut_exc_010_every_line_is_counted_once() {
        let input = b"; comment\nM48\nMETRIC\nT1C0.8\n%\nT1\nX1.0Y1.0\nXZZY1.0\nG93X0Y0\n\nX2.0Y2.0\nM30\nX3.0Y3.0\n";
        let result = parse(input);
        assert!(result.is_ok());
        if let Ok(parsed) = result {
            let LineCounters {
                succeeded,
                failed,
                skipped,
            } = parsed.counters;
            assert_eq!((succeeded, failed, skipped), (8, 1, 2));
            assert_eq!(parsed.records.len(), 2);
        }
    }

    #[test]
    fn ut_exc_012_header_pass_counts_and_registers_tools() {
        let result = parse(b"M48\nMETRIC\nT1C0.8\nFMAT,2\nBOGUS\n%\nM30\n");
        assert!(result.is_ok());
        if let Ok(parsed) = result {
            let LineCounters {
                succeeded,
                failed,
                skipped,
            } = parsed.counters;
            assert_eq!((succeeded, failed, skipped), (5, 1, 1));
            assert_eq!(parsed.tools.len(), 1);
            assert!(parsed.warnings.iter().any(|w| w.starts_with("line 5:")));
        }
    }

    #[test]
    fn ut_exc_011_digit_format_decoding() {
        let tz = DigitFormat::for_units(ExcellonUnits::Metric, ZeroSuppression::Leading);
        let lz = DigitFormat {
            omitted: ZeroSuppression::Trailing,
            ..tz
        };
        assert!(tz.decode("-1500").is_ok_and(|v| (v + 1.5).abs() < 1e-12));
        assert!(lz.decode("+0015").is_ok_and(|v| (v - 1.5).abs() < 1e-12));
        assert!(lz.decode("2.25").is_ok_and(|v| (v - 2.25).abs() < 1e-12));
        assert!(tz.decode("-").is_err());
        assert!(tz.decode("12a").is_err());
    }

    #[test]
    fn bc_exc_001_empty_or_binary_input_is_an_error() {
        assert!(parse(&[]).is_err());
        assert!(parse(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn bc_exc_002_header_without_body_has_no_holes() {
        let parsed = parse(b"M48\nT1C0.8\n%\nM30\n");
        assert!(parsed.is_ok_and(|p| p.tools.len() == 1 && p.records.is_empty()));
    }

    #[test]
    fn bc_exc_003_headerless_file_uses_inch_defaults() {
        let input = b"T1C0.01\nT1\nX10000Y20000\nM30\n";
        assert!(parse(input).is_ok_and(|p| p.units == ExcellonUnits::Imperial));
        let position = first_position(input);
        assert!(position.is_some_and(|(x, y)| (x - 25.4).abs() < 1e-9 && (y - 50.8).abs() < 1e-9));
    }

    #[test]
    fn bc_exc_004_non_positive_tool_is_skipped() {
        let result = parse(b"M48\nMETRIC\nT1C0.0\nT2C0.8\n%\nT1\nX1.0Y1.0\nT2\nX2.0Y2.0\nM30\n");
        assert!(result.is_ok());
        if let Ok(parsed) = result {
            assert_eq!(parsed.tools.len(), 1);
            assert_eq!(parsed.records.len(), 1);
            assert!(parsed.warnings.iter().any(|w| w.contains("is not positive")));
        }
    }

    #[test]
    fn bc_exc_005_redefined_tool_uses_last_diameter() {
        let result = parse(b"M48\nMETRIC\nT1C0.8\nT1C1.0\n%\nT1\nX1.0Y1.0\nM30\n");
        assert!(result.is_ok());
        if let Ok(parsed) = result {
            assert_eq!(parsed.tools.len(), 1);
            assert!(parsed.records.first().is_some_and(|h| (h.diameter - 1.0).abs() < 1e-9));
            assert!(parsed.warnings.iter().any(|w| w.contains("T1 redefined")));
        }
    }

    #[test]
    fn bc_exc_006_hole_without_tool_is_skipped() {
        let result = parse(b"M48\nMETRIC\nT1C0.8\n%\nX1.0Y1.0\nT1\nX2.0Y2.0\nM30\n");
        assert!(result.is_ok());
        if let Ok(parsed) = result {
            assert_eq!(parsed.records.len(), 1);
            assert_eq!(parsed.counters.skipped, 1);
            assert!(parsed.warnings.iter().any(|w| w.contains("no tool selected")));
        }
    }

    #[test]
    fn bc_exc_007_conflicting_units_last_applies() {
        let result = parse(b"M48\nMETRIC\nINCH\nT1C0.8\n%\nT1\nX1.0Y1.0\nM30\n");
        assert!(result.is_ok());
        if let Ok(parsed) = result {
            assert_eq!(parsed.units, ExcellonUnits::Imperial);
            assert!(parsed.warnings.iter().any(|w| w.contains("conflicting unit")));
        }
    }

    #[test]
    fn bc_exc_008_bad_line_fails_alone() {
        let result = parse(b"M48\nMETRIC\nT1C0.8\n%\nT1\nX1.0Y1.0\nX1.0.0Y2\nX2.0Y2.0\nM30\n");
        assert!(result.is_ok());
        if let Ok(parsed) = result {
            assert_eq!(parsed.records.len(), 2);
            assert_eq!(parsed.counters.failed, 1);
            assert!(parsed.warnings.iter().any(|w| w.starts_with("line 7:")));
        }
    }

    #[test]
    fn bc_exc_009_feed_and_speed_fields_are_ignored() {
        let holes = records(b"M48\nMETRIC\nT01F00S00C0.300\n%\nT01\nX1.0Y1.0\nM30\n");
        assert!(holes.first().is_some_and(|h| (h.diameter - 0.3).abs() < 1e-9));
        assert!(tool_word("T3F200S30").is_ok_and(|w| w == Some(ToolWord::Select(3))));
        assert!(tool_word("TYPE=PLATED").is_err());
    }
}
