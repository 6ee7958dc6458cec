use std::path::Path;

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Outcome of reading one value cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Value(f64),
    /// Empty, a missing code, or a configured missing token.
    Missing,
    /// Non-empty text that is not a number.
    Unparsable,
}

/// Parse a cell as a number, mapping blanks, missing codes and missing
/// tokens to `Cell::Missing`.
pub fn parse_cell(raw: &str, missing_codes: &[f64], missing_tokens: &[String]) -> Cell {
    let s = clean_str(raw);
    if s.is_empty() || missing_tokens.iter().any(|t| t == s) {
        return Cell::Missing;
    }
    match s.parse::<f64>() {
        Ok(v) if !v.is_finite() => Cell::Unparsable,
        Ok(v) if missing_codes.contains(&v) => Cell::Missing,
        Ok(v) => Cell::Value(v),
        Err(_) => Cell::Unparsable,
    }
}

/// Parse an id cell; ids are integers, but `123.0` is accepted.
pub fn parse_id(raw: &str) -> Option<i64> {
    let s = clean_str(raw);
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 => Some(v as i64),
        _ => None,
    }
}

/// Field delimiter for input files.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Delimiter {
    /// `.csv` is comma separated, anything else is tab separated.
    #[default]
    Auto,
    Tab,
    Comma,
}

impl Delimiter {
    pub fn byte_for(self, path: &Path) -> u8 {
        match self {
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
            Delimiter::Auto => {
                let is_csv = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
                if is_csv {
                    b','
                } else {
                    b'\t'
                }
            }
        }
    }
}
