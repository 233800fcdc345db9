//! Rewrites RS-274X text into the dialect `gerber_parser` reads.
//!
//! The parser expects one statement per line, absolute coordinates with
//! leading zeros omitted and a D code on every coordinate block. Legacy
//! forms (`G54Dnn`, `G70`/`G71`, `G91`, trailing-zero formats, modal
//! coordinate blocks, macro primitives 2 and 22) are rewritten here.
//!
//! Coordinate words are checked strictly: the parser reads `X1.2.3` as a
//! valid number, so any malformed coordinate aborts the layer at this point.

use crate::error::GeometryError;

use super::types::Units;

/// Extended commands that change geometry in ways this importer does not
/// apply, with the forms that are no-ops.
const UNAPPLIED_COMMANDS: [(&str, &[&str]); 8] = [
    ("LM", &["LMN"]),
    ("LR", &["LR0"]),
    ("LS", &["LS1"]),
    ("OF", &["OF", "OFA0B0", "OFA0", "OFB0"]),
    ("SF", &["SF", "SFA1B1"]),
    ("MI", &["MI", "MIA0B0"]),
    ("AS", &["ASAXBY"]),
    ("IR", &["IR0"]),
];

/// Extended commands accepted without effect.
const IGNORED_COMMANDS: [&str; 6] = ["TF", "TA", "TO", "TD", "IN", "LN"];

/// Text ready for `gerber_parser`, plus what the rewrite learned on the way.
#[derive(Debug, Default)]
pub struct Normalized {
    /// One statement per line.
    pub text: String,
    /// Units from `G70`/`G71`, used when the file has no `%MO`.
    pub legacy_units: Option<Units>,
    /// Every `%ADD` code (10 and above) in the source.
    pub aperture_codes: Vec<i32>,
    /// Every `%AM` name in the source.
    pub macro_names: Vec<String>,
    /// Number of coordinate blocks.
    pub coordinate_blocks: u32,
    /// Warnings for commands that are accepted but not applied.
    pub warnings: Vec<String>,
}

#[derive(Debug)]
enum Statement {
    Extended(Vec<String>),
    Word(String),
}

#[derive(Debug, Default)]
struct Dialect {
    trailing_zeros: bool,
    incremental: bool,
    digits: Option<usize>,
    operation: Option<u8>,
    current: [i64; 2],
}

/// Split `content` into statements and rewrite them line by line.
///
/// # Errors
///
/// Returns [`GeometryError::ParseError`] for a malformed coordinate block or
/// an aperture definition with too few parameters.
pub fn normalize(content: &str) -> Result<Normalized, GeometryError> {
    let mut out = Normalized::default();
    let mut lines = Vec::new();
    let mut dialect = Dialect::default();

    for statement in split_statements(content, &mut out.warnings) {
        match statement {
            Statement::Extended(blocks) => {
                extended(&blocks, &mut dialect, &mut out, &mut lines)?;
            }
            Statement::Word(word) => word_command(&word, &mut dialect, &mut out, &mut lines)?,
        }
    }

    out.text = lines.join("\n");
    out.text.push('\n');
    Ok(out)
}

fn split_statements(content: &str, warnings: &mut Vec<String>) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut buffer = String::new();
    let mut blocks: Option<Vec<String>> = None;

    for c in content.chars() {
        match c {
            '\r' | '\n' => {}
            '%' => match blocks.take() {
                Some(mut open) => {
                    if !buffer.trim().is_empty() {
                        open.push(buffer.trim().to_string());
                    }
                    buffer.clear();
                    if !open.is_empty() {
                        statements.push(Statement::Extended(open));
                    }
                }
                None => {
                    if !buffer.trim().is_empty() {
                        warnings.push(format!("unterminated command `{}` dropped", buffer.trim()));
                    }
                    buffer.clear();
                    blocks = Some(Vec::new());
                }
            },
            '*' => {
                let block = buffer.trim().to_string();
                buffer.clear();
                match blocks.as_mut() {
                    Some(open) => open.push(block),
                    None if !block.is_empty() => statements.push(Statement::Word(block)),
                    None => {}
                }
            }
            _ => buffer.push(c),
        }
    }

    if blocks.is_some() {
        warnings.push("unterminated extended command at end of file".to_string());
    } else if !buffer.trim().is_empty() {
        warnings.push(format!("unterminated command `{}` dropped", buffer.trim()));
    }

    statements
}

fn extended(
    blocks: &[String],
    dialect: &mut Dialect,
    out: &mut Normalized,
    lines: &mut Vec<String>,
) -> Result<(), GeometryError> {
    let Some(first) = blocks.first() else {
        return Ok(());
    };
    if let Some(name) = first.strip_prefix("AM") {
        let name = name.trim();
        let body = macro_body(name, blocks.get(1..).unwrap_or_default(), &mut out.warnings);
        out.macro_names.push(name.to_string());
        lines.push(format!("%AM{name}*{}*%", body.join("*")));
        return Ok(());
    }

    for block in blocks.iter().filter(|block| !block.is_empty()) {
        let code = block.get(..2).unwrap_or(block.as_str());
        let body = block.get(2..).unwrap_or_default();
        match code {
            "FS" => lines.push(format_statement(body, dialect)?),
            "AD" => {
                if let Some(code) = aperture_code(body)? {
                    out.aperture_codes.push(code);
                }
                lines.push(format!("%{block}*%"));
            }
            "IP" => {
                if body == "NEG" {
                    out.warnings
                        .push("negative image polarity (IPNEG) is not applied".to_string());
                }
            }
            _ if IGNORED_COMMANDS.contains(&code) => {}
            _ => match UNAPPLIED_COMMANDS.iter().find(|(c, _)| *c == code) {
                Some((_, trivial)) => {
                    if !trivial.contains(&block.as_str()) {
                        out.warnings
                            .push(format!("`{block}` is not applied; geometry emitted once"));
                    }
                }
                None => lines.push(format!("%{block}*%")),
            },
        }
    }
    Ok(())
}

/// Rewrite macro primitives the parser lacks: 2 becomes 20, 22 becomes 21
/// with its corner moved to the centre, and moiré (6) is dropped.
fn macro_body(name: &str, blocks: &[String], warnings: &mut Vec<String>) -> Vec<String> {
    let mut body = Vec::with_capacity(blocks.len());
    for block in blocks.iter().map(|b| b.trim()).filter(|b| !b.is_empty()) {
        let fields: Vec<&str> = block.split(',').map(str::trim).collect();
        match fields.as_slice() {
            ["2", rest @ ..] => body.push(format!("20,{}", rest.join(","))),
            ["22", exposure, width, height, x, y, rest @ ..] => {
                let mut line = format!(
                    "21,{exposure},{width},{height},({x})+({width})/2,({y})+({height})/2"
                );
                for field in rest {
                    line.push(',');
                    line.push_str(field);
                }
                body.push(line);
            }
            ["6", ..] => warnings.push(format!(
                "moire primitive in macro `{name}` is not supported; skipped"
            )),
            _ => body.push(block.to_string()),
        }
    }
    body
}

/// Re-emit `%FS` as leading-zero absolute; remember what the file declared.
fn format_statement(body: &str, dialect: &mut Dialect) -> Result<String, GeometryError> {
    let split = body.find('X').unwrap_or(body.len());
    let (flags, digits) = body.split_at(split);
    dialect.trailing_zeros = flags.contains('T');
    dialect.incremental = flags.contains('I');
    dialect.digits = digits
        .get(1..3)
        .and_then(|pair| {
            let mut chars = pair.chars();
            Some((chars.next()?.to_digit(10)?, chars.next()?.to_digit(10)?))
        })
        .and_then(|(integer, decimal)| usize::try_from(integer + decimal).ok());
    if dialect.digits.is_none() {
        return Err(GeometryError::ParseError(format!(
            "malformed format statement `FS{body}`"
        )));
    }
    Ok(format!("%FSLA{digits}*%"))
}

/// Code of an `ADDnn` definition, rejecting standard templates that lack
/// required parameters.
fn aperture_code(body: &str) -> Result<Option<i32>, GeometryError> {
    let Some(after_d) = body.strip_prefix('D') else {
        return Ok(None);
    };
    let split = after_d
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_d.len());
    let (code_raw, rest) = after_d.split_at(split);
    let Ok(code) = code_raw.parse::<i32>() else {
        return Ok(None);
    };
    if code < 10 {
        return Ok(None);
    }

    let (template, params) = rest.split_once(',').unwrap_or((rest, ""));
    let required = match template {
        "C" => 1,
        "R" | "O" | "P" => 2,
        _ => 0,
    };
    let given = params.split('X').filter(|p| !p.trim().is_empty()).count();
    if given < required {
        return Err(GeometryError::ParseError(format!(
            "aperture D{code} template {template} needs {required} parameter(s), got {given}"
        )));
    }
    Ok(Some(code))
}

fn word_command(
    word: &str,
    dialect: &mut Dialect,
    out: &mut Normalized,
    lines: &mut Vec<String>,
) -> Result<(), GeometryError> {
    if word.starts_with("G04") || word == "G4" || word.starts_with("G4 ") {
        return Ok(());
    }

    let mut rest = word.trim();
    while let Some(after_g) = rest.strip_prefix('G') {
        let split = after_g
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_g.len());
        let (digits, tail) = after_g.split_at(split);
        let Ok(code) = digits.parse::<u32>() else {
            lines.push(format!("{rest}*"));
            return Ok(());
        };
        match code {
            1..=3 => lines.push(format!("G0{code}*")),
            36 | 37 | 74 | 75 => lines.push(format!("G{code}*")),
            70 => out.legacy_units = Some(Units::Inches),
            71 => out.legacy_units = Some(Units::Millimeters),
            90 => dialect.incremental = false,
            91 => dialect.incremental = true,
            54 | 55 => {}
            other => lines.push(format!("G{other}*")),
        }
        rest = tail.trim_start();
    }

    if rest.is_empty() {
        return Ok(());
    }
    if is_coordinate_block(rest) {
        out.coordinate_blocks = out.coordinate_blocks.saturating_add(1);
        lines.push(coordinate_block(rest, dialect, &mut out.warnings)?);
        return Ok(());
    }
    if let Some(code) = rest.strip_prefix('M') {
        match code.parse::<u32>() {
            Ok(0 | 2 | 30) => lines.push("M02*".to_string()),
            Ok(1) => {}
            _ => out.warnings.push(format!("unknown M code `{rest}` ignored")),
        }
        return Ok(());
    }
    if let Some(code) = rest.strip_prefix('D').and_then(|c| c.parse::<u8>().ok()) {
        if (1..=3).contains(&code) {
            dialect.operation = Some(code);
            lines.push(format!("D0{code}*"));
            return Ok(());
        }
    }
    lines.push(format!("{rest}*"));
    Ok(())
}

fn fields_have_position(word: &str) -> bool {
    word.contains(['X', 'Y'])
}

fn is_coordinate_block(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some('X' | 'Y' | 'I' | 'J'))
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
}

/// Validate and rewrite `X..Y..I..J..[Dnn]` in absolute, leading-zero form.
fn coordinate_block(
    word: &str,
    dialect: &mut Dialect,
    warnings: &mut Vec<String>,
) -> Result<String, GeometryError> {
    let malformed = || GeometryError::ParseError(format!("malformed coordinate block `{word}`"));

    let mut fields: Vec<(char, &str)> = Vec::new();
    let mut rest = word;
    while let Some(letter) = rest.chars().next() {
        let tail = rest.get(1..).unwrap_or_default();
        let end = tail
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(tail.len());
        let (value, next) = tail.split_at(end);
        fields.push((letter, value));
        rest = next;
    }

    let mut operation = None;
    let mut line = String::new();
    for (letter, value) in fields {
        let digits = value
            .strip_prefix(|c| c == '+' || c == '-')
            .unwrap_or(value);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }
        match letter {
            'X' | 'Y' | 'I' | 'J' if operation.is_none() => {
                let raw = dialect.widen(value).ok_or_else(malformed)?;
                let value = match letter {
                    'X' => dialect.absolute(0, raw).ok_or_else(malformed)?,
                    'Y' => dialect.absolute(1, raw).ok_or_else(malformed)?,
                    _ => raw,
                };
                line.push(letter);
                line.push_str(&value.to_string());
            }
            'D' => match digits.parse::<u8>() {
                Ok(code @ 1..=3) => operation = Some(code),
                _ => return Err(malformed()),
            },
            _ => return Err(malformed()),
        }
    }

    if !fields_have_position(word) {
        line = format!("X{}Y{}{line}", dialect.current[0], dialect.current[1]);
    }

    let operation = match operation.or(dialect.operation) {
        Some(code) => code,
        None => {
            warnings.push(format!(
                "coordinates without operation in `{word}`; treated as move"
            ));
            2
        }
    };
    dialect.operation = Some(operation);
    Ok(format!("{line}D0{operation}*"))
}

impl Dialect {
    /// Parse a signed value, padding trailing-zero formats on the right.
    fn widen(&self, value: &str) -> Option<i64> {
        let (negative, digits) = match value.strip_prefix('-') {
            Some(digits) => (true, digits),
            None => (false, value.strip_prefix('+').unwrap_or(value)),
        };
        let mut padded = digits.to_string();
        if self.trailing_zeros {
            if let Some(width) = self.digits {
                while padded.len() < width {
                    padded.push('0');
                }
            }
        }
        let magnitude = padded.parse::<i64>().ok()?;
        Some(if negative { -magnitude } else { magnitude })
    }

    /// Resolve an axis value against the current point and remember it.
    fn absolute(&mut self, axis: usize, raw: i64) -> Option<i64> {
        let current = self.current.get_mut(axis)?;
        let value = if self.incremental {
            current.checked_add(raw)?
        } else {
            raw
        };
        *current = value;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &str) -> Vec<String> {
        normalize(input)
            .map(|n| n.text.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    #[test]
    fn ut_nrm_001_one_statement_per_line() {
        let out = lines("%FSLAX26Y26*MOMM*%\nD10*X0Y0D02*X1Y1D01*M02*");
        assert_eq!(
            out,
            vec!["%FSLAX26Y26*%", "%MOMM*%", "D10*", "X0Y0D02*", "X1Y1D01*", "M02*"]
        );
    }

    #[test]
    fn ut_nrm_002_legacy_words_are_rewritten() {
        let result = normalize("G70*\nG54D10*\nG01X100Y0D01*\nY200*\nG04 note*\n");
        assert!(result.is_ok());
        if let Ok(n) = result {
            assert_eq!(n.legacy_units, Some(Units::Inches));
            let out: Vec<&str> = n.text.lines().collect();
            assert_eq!(out, vec!["D10*", "G01*", "X100Y0D01*", "Y200D01*"]);
            assert_eq!(n.coordinate_blocks, 2);
        }
    }

    #[test]
    fn ut_nrm_003_trailing_zero_and_incremental_become_absolute() {
        let out = lines("%FSTIX23Y23*%\nX1Y1D02*\nX1D01*\n");
        assert_eq!(out, vec!["%FSLAX23Y23*%", "X10000Y10000D02*", "X20000D01*"]);
    }

    #[test]
    fn ut_nrm_004_legacy_macro_primitives_are_rewritten() {
        let result = normalize("%AMOLD*2,1,0.1,0,0,1,0*22,1,2,1,0,0,0*6,0,0,1,0.1,0.1,2,0.01,1,0*%\n");
        assert!(result.is_ok());
        if let Ok(n) = result {
            assert_eq!(n.macro_names, vec!["OLD".to_string()]);
            assert_eq!(
                n.text.trim_end(),
                "%AMOLD*20,1,0.1,0,0,1,0*21,1,2,1,(0)+(2)/2,(0)+(1)/2,0*%"
            );
            assert!(n.warnings.iter().any(|w| w.contains("moire")));
        }
    }

    #[test]
    fn ut_nrm_005_aperture_codes_are_collected() {
        let result = normalize("%ADD10C,0.5*%\n%ADD11R,1X2*%\n%ADD3C,1*%\n");
        assert!(result.is_ok_and(|n| n.aperture_codes == vec![10, 11]));
    }

    #[test]
    fn bc_nrm_001_malformed_coordinates_are_rejected() {
        assert!(normalize("X1.2.3Y0D03*\n").is_err());
        assert!(normalize("X12.5Y0D03*\n").is_err());
        assert!(normalize("X1Y-D01*\n").is_err());
        assert!(normalize("X1Y2D10*\n").is_err());
    }

    #[test]
    fn bc_nrm_002_short_aperture_definition_is_rejected() {
        assert!(normalize("%ADD11R,1.6*%\n").is_err());
        assert!(normalize("%ADD12C*%\n").is_err());
    }

    #[test]
    fn bc_nrm_003_unapplied_commands_warn_and_vanish() {
        let result = normalize("%LMX*%\n%LMN*%\n%IPNEG*%\n%TF.Part,Single*%\n");
        assert!(result.is_ok());
        if let Ok(n) = result {
            assert!(n.text.trim().is_empty());
            assert_eq!(n.warnings.len(), 2);
        }
    }

    #[test]
    fn bc_nrm_004_modal_block_without_history_is_a_move() {
        let result = normalize("X5Y5*\n");
        assert!(result.is_ok());
        if let Ok(n) = result {
            assert_eq!(n.text.trim_end(), "X5Y5D02*");
            assert_eq!(n.warnings.len(), 1);
        }
    }

    #[test]
    fn bc_nrm_005_unreadable_format_statement_is_rejected() {
        assert!(matches!(
            normalize("%FSLAXbadY46*%\n"),
            Err(GeometryError::ParseError(_))
        ));
    }

    #[test]
    fn ut_nrm_006_offset_only_block_gets_current_position() {
        let out = lines("%FSLAX26Y26*%\nX100Y200D02*\nG03I-100J0D01*\n");
        assert_eq!(out.last().map(String::as_str), Some("X100Y200I-100J0D01*"));
    }
}
