//! Parse free-text value-description cells into [`ValueDescription`] entries.
//!
//! The cells come in three shapes, tried in this order per fragment:
//! explicit ranges (`0xA~0xB: label`), runs of single entries separated by
//! whitespace or line breaks (`0xA: label 0xB: label`), and semicolon pairs
//! (`key: label; key: label`). Parsing is total: unrecognized fragments are
//! returned as strays for the caller to report, never as errors.

use crate::model::ValueDescription;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "vdesc.pest"]
struct VdescParser;

/// Best-effort parse result: the entries that parsed, ordered by raw value,
/// plus the fragments that did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedValueDescriptions {
    pub entries: Vec<ValueDescription>,
    pub strays: Vec<String>,
}

impl ParsedValueDescriptions {
    pub fn is_clean(&self) -> bool {
        self.strays.is_empty()
    }
}

/// Parses one value-description cell. Total: never fails, never panics.
pub fn parse(text: &str) -> ParsedValueDescriptions {
    let mut out = ParsedValueDescriptions::default();

    // The sheets wrap entries across lines; normalize all whitespace runs
    // to single spaces before parsing.
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return out;
    }

    let document = match VdescParser::parse(Rule::document, &normalized) {
        Ok(mut pairs) => match pairs.next() {
            Some(p) => p,
            None => return out,
        },
        Err(_) => {
            // The grammar has a catch-all, so a refusal is unexpected; keep
            // the whole cell as one stray fragment rather than dropping it.
            out.strays.push(normalized.clone());
            return out;
        }
    };

    for pair in document.into_inner() {
        match pair.as_rule() {
            Rule::range_entry => {
                let text = pair.as_str().to_string();
                let mut inner = pair.into_inner();
                let lo = inner.next().and_then(|p| parse_key(p.as_str()));
                let hi = inner.next().and_then(|p| parse_key(p.as_str()));
                let label = inner
                    .next()
                    .map(|p| p.as_str().trim().to_string())
                    .unwrap_or_default();
                match (lo, hi) {
                    (Some(lo), Some(hi)) if lo <= hi && !label.is_empty() => {
                        if lo == hi {
                            out.entries.push(ValueDescription::Single { raw: lo, label });
                        } else {
                            out.entries.push(ValueDescription::Range {
                                lo,
                                hi: hi + 1,
                                label,
                            });
                        }
                    }
                    _ => out.strays.push(text.trim().to_string()),
                }
            }
            Rule::entry => {
                let text = pair.as_str().to_string();
                let mut inner = pair.into_inner();
                let raw = inner.next().and_then(|p| parse_key(p.as_str()));
                let label = inner
                    .next()
                    .map(|p| p.as_str().trim().to_string())
                    .unwrap_or_default();
                match raw {
                    Some(raw) if !label.is_empty() => {
                        out.entries.push(ValueDescription::Single { raw, label });
                    }
                    _ => out.strays.push(text.trim().to_string()),
                }
            }
            Rule::stray => {
                let s = pair.as_str().trim();
                if !s.is_empty() && s != ";" {
                    out.strays.push(s.to_string());
                }
            }
            Rule::EOI => {}
            _ => {}
        }
    }

    out.entries.sort_by_key(ValueDescription::first_raw);
    out
}

fn parse_key(text: &str) -> Option<u64> {
    let t = text.trim();
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        t.parse::<u64>().ok()
    }
}
