//! Value codec: numeric literal parsing and linear raw/physical conversion.
//!
//! Bound cross-checks compare a stored physical value against the one
//! reconstructed from its raw counterpart via `raw * scale + offset`. Two
//! tolerances exist because upstream sheets store minimums exactly but often
//! round maximums to whole physical units; pick per check.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LiteralError {
    #[error("malformed literal {0:?}: expected 0x-prefixed hex or decimal")]
    MalformedLiteral(String),
    #[error("scale is zero: no linear raw mapping exists")]
    DivisionByZeroScale,
}

/// Parses `0x`-prefixed hexadecimal or plain decimal into a raw value.
pub fn parse_raw_literal(text: &str) -> Result<u64, LiteralError> {
    let t = text.trim();
    let parsed = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        t.parse::<u64>()
    };
    parsed.map_err(|_| LiteralError::MalformedLiteral(t.to_string()))
}

/// `raw * scale + offset`.
pub fn to_physical(raw: u64, scale: f64, offset: f64) -> f64 {
    raw as f64 * scale + offset
}

/// `round((physical - offset) / scale)`. Callers doing bound cross-checks
/// treat [`LiteralError::DivisionByZeroScale`] as "no linear mapping, skip".
pub fn to_raw(physical: f64, scale: f64, offset: f64) -> Result<i64, LiteralError> {
    if scale == 0.0 {
        return Err(LiteralError::DivisionByZeroScale);
    }
    Ok(((physical - offset) / scale).round() as i64)
}

/// Floating reconciliation tolerance for physical-vs-raw bound checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    /// Relative, `|a - b| <= rel * max(|a|, |b|)`.
    Relative(f64),
    /// Absolute, in physical units. Used where the sheet stores
    /// already-rounded bounds.
    AbsoluteUnits(f64),
}

impl Tolerance {
    /// The tight default used for minimum-bound checks.
    pub fn default_relative() -> Self {
        Tolerance::Relative(1e-9)
    }

    /// One physical unit of slack, for upstream-rounded maximum bounds.
    pub fn rounded_bounds() -> Self {
        Tolerance::AbsoluteUnits(1.0)
    }

    pub fn matches(self, expected: f64, actual: f64) -> bool {
        match self {
            Tolerance::Relative(rel) => {
                (expected - actual).abs() <= rel * expected.abs().max(actual.abs())
            }
            Tolerance::AbsoluteUnits(abs) => (expected - actual).abs() <= abs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_hex_and_decimal() {
        assert_eq!(parse_raw_literal("0x1A"), Ok(0x1A));
        assert_eq!(parse_raw_literal("0X1a"), Ok(0x1A));
        assert_eq!(parse_raw_literal("26"), Ok(26));
        assert_eq!(parse_raw_literal("  0x7FF "), Ok(0x7FF));
        assert!(matches!(
            parse_raw_literal("0xZZ"),
            Err(LiteralError::MalformedLiteral(_))
        ));
        assert!(matches!(
            parse_raw_literal("26.5"),
            Err(LiteralError::MalformedLiteral(_))
        ));
        assert!(matches!(
            parse_raw_literal(""),
            Err(LiteralError::MalformedLiteral(_))
        ));
    }

    #[test]
    fn linear_round_trip() {
        // to_raw(to_physical(r)) == r for non-zero scale
        for raw in [0u64, 1, 7, 255, 4095] {
            for (scale, offset) in [(0.25, -40.0), (1.0, 0.0), (0.1, 10.0)] {
                let phys = to_physical(raw, scale, offset);
                assert_eq!(to_raw(phys, scale, offset).unwrap(), raw as i64);
            }
        }
    }

    #[test]
    fn zero_scale_is_reported_not_computed() {
        assert_eq!(to_raw(5.0, 0.0, 0.0), Err(LiteralError::DivisionByZeroScale));
        // to_physical stays total
        assert_eq!(to_physical(5, 0.0, 3.0), 3.0);
    }

    #[test]
    fn tolerances() {
        let tight = Tolerance::default_relative();
        assert!(tight.matches(100.0, 100.0 + 1e-8));
        assert!(!tight.matches(100.0, 100.1));
        assert!(tight.matches(0.0, 0.0));

        let loose = Tolerance::rounded_bounds();
        assert!(loose.matches(6553.5, 6553.0));
        assert!(!loose.matches(6553.5, 6551.0));
    }
}
