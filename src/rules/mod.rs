//! Protocol legality rules, table-driven per protocol variant.
//!
//! Every rule takes a fully-built [`Message`] and returns zero or more
//! findings; rules never panic and never see raw strings — malformed cells
//! were already normalized into findings by the row builder. The tables are
//! immutable statics grouped by the category each rule reports under, so the
//! orchestrator can run one category in isolation.

pub mod can;
pub mod lin;

use crate::codec::{self, Tolerance};
use crate::layout;
use crate::model::{Message, ProtocolVariant};
use crate::report::{Category, Finding, Subject};

/// One legality rule over a built message.
pub type Rule = fn(&Message) -> Vec<Finding>;

const NO_RULES: &[Rule] = &[];

/// Rules for one protocol family, grouped by finding category.
pub struct RuleTable {
    pub naming: &'static [Rule],
    pub range: &'static [Rule],
    pub layout: &'static [Rule],
    pub consistency: &'static [Rule],
}

impl RuleTable {
    pub fn rules(&self, category: Category) -> &'static [Rule] {
        match category {
            // Literal findings are produced while building the model.
            Category::Literal => NO_RULES,
            Category::Naming => self.naming,
            Category::Range => self.range,
            Category::Layout => self.layout,
            Category::Consistency => self.consistency,
        }
    }
}

static CAN_RULES: RuleTable = RuleTable {
    naming: &[name_charset, can::name_lengths, can::class_matches_name],
    range: &[
        can::id_range,
        can::message_send_type,
        can::frame_length,
        can::brs_value,
        can::signal_geometry,
        signal_widths,
    ],
    layout: &[signal_overlaps, frame_fit],
    consistency: &[
        can::brs_format,
        can::signal_send_types,
        can::cycle_time_presence,
        bound_reconciliation,
        min_le_max,
    ],
};

static LIN_RULES: RuleTable = RuleTable {
    naming: &[name_charset, lin::name_lengths],
    range: &[
        lin::id_range,
        lin::protected_id_range,
        lin::frame_length,
        lin::signal_geometry,
        signal_widths,
    ],
    layout: &[signal_overlaps, frame_fit],
    consistency: &[
        lin::frame_type_ids,
        lin::protected_id,
        lin::checksum,
        bound_reconciliation,
        min_le_max,
    ],
};

pub fn rules_for(variant: ProtocolVariant) -> &'static RuleTable {
    match variant {
        ProtocolVariant::Can | ProtocolVariant::CanFd => &CAN_RULES,
        ProtocolVariant::Lin => &LIN_RULES,
    }
}

fn allowed_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Message and signal names carry only `[A-Za-z0-9_-]`.
fn name_charset(message: &Message) -> Vec<Finding> {
    let mut out = Vec::new();
    if !allowed_name(&message.name) {
        out.push(Finding::error(
            Subject::message(&message.name),
            Category::Naming,
            format!("message name {:?} contains prohibited characters", message.name),
            "Allowed characters: A-Z, a-z, 0-9, _, -",
        ));
    }
    for signal in &message.signals {
        if !allowed_name(&signal.name) {
            out.push(Finding::error(
                Subject::signal(&message.name, &signal.name),
                Category::Naming,
                format!("signal name {:?} contains prohibited characters", signal.name),
                "Allowed characters: A-Z, a-z, 0-9, _, -",
            ));
        }
    }
    out
}

/// Signed signals need a sign bit plus payload; float signals are IEEE
/// widths only.
fn signal_widths(message: &Message) -> Vec<Finding> {
    let mut out = Vec::new();
    for signal in &message.signals {
        if signal.bit_length < 1 {
            out.push(Finding::error(
                Subject::signal(&message.name, &signal.name),
                Category::Range,
                format!("bit length {} is not a signal", signal.bit_length),
                "signals are at least one bit long",
            ));
        }
        if signal.signed && signal.bit_length < 2 {
            out.push(Finding::error(
                Subject::signal(&message.name, &signal.name),
                Category::Range,
                format!("signed signal of {} bit(s)", signal.bit_length),
                "signed signals need at least 2 bits",
            ));
        }
        if signal.float && !matches!(signal.bit_length, 32 | 64) {
            out.push(Finding::error(
                Subject::signal(&message.name, &signal.name),
                Category::Range,
                format!("float signal of {} bits", signal.bit_length),
                "float signals must be 32 or 64 bits",
            ));
        }
    }
    out
}

/// Bit-interval intersection across the message's signals. Corrupted
/// layouts cannot be serialized safely, so overlaps are always errors.
fn signal_overlaps(message: &Message) -> Vec<Finding> {
    layout::find_overlaps(&message.signals)
        .into_iter()
        .map(|o| {
            Finding::error(
                Subject::message(&message.name),
                Category::Layout,
                format!("signals {} and {} overlap at bit {}", o.a, o.b, o.bit),
                "signal bit intervals must not overlap",
            )
        })
        .collect()
}

/// Every signal must fit the declared frame length.
fn frame_fit(message: &Message) -> Vec<Finding> {
    let mut out = Vec::new();
    for signal in &message.signals {
        if let Err(err) = layout::interval_for(signal, message.length) {
            out.push(Finding::error(
                Subject::signal(&message.name, &signal.name),
                Category::Layout,
                err.to_string(),
                format!("signals must fit the declared {}-byte frame", message.length),
            ));
        }
    }
    out
}

/// Physical bounds must reconstruct from their raw counterparts through the
/// linear conversion. Zero scale means no linear mapping: skip, don't fail.
/// Minimums use the tight relative tolerance; maximums tolerate one unit of
/// upstream rounding.
fn bound_reconciliation(message: &Message) -> Vec<Finding> {
    let mut out = Vec::new();
    for signal in &message.signals {
        if signal.scale == 0.0 {
            continue;
        }
        let checks = [
            ("minimum", signal.min_phys, signal.min_raw, Tolerance::default_relative()),
            ("maximum", signal.max_phys, signal.max_raw, Tolerance::rounded_bounds()),
        ];
        for (bound, phys, raw, tolerance) in checks {
            let (Some(phys), Some(raw)) = (phys, raw) else {
                continue;
            };
            let reconstructed = codec::to_physical(raw, signal.scale, signal.offset);
            if !tolerance.matches(phys, reconstructed) {
                out.push(Finding::error(
                    Subject::signal(&message.name, &signal.name),
                    Category::Consistency,
                    format!(
                        "physical {} {} does not match raw 0x{:X} (reconstructs to {}, difference {})",
                        bound,
                        phys,
                        raw,
                        reconstructed,
                        (reconstructed - phys).abs()
                    ),
                    "physical bounds must equal raw * resolution + offset",
                ));
            }
        }
    }
    out
}

fn min_le_max(message: &Message) -> Vec<Finding> {
    let mut out = Vec::new();
    for signal in &message.signals {
        if let (Some(min), Some(max)) = (signal.min_phys, signal.max_phys) {
            if min > max {
                out.push(Finding::error(
                    Subject::signal(&message.name, &signal.name),
                    Category::Consistency,
                    format!("minimum {} exceeds maximum {}", min, max),
                    "Minimum value must be less than or equal to maximum value",
                ));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ByteOrder, Signal};

    fn message_with(signals: Vec<Signal>) -> Message {
        let mut m = Message::new("M", 0x123, ProtocolVariant::Can, 8);
        m.signals = signals;
        m
    }

    #[test]
    fn charset_rule_flags_both_levels() {
        let mut m = message_with(vec![Signal::new("bad name", 0, 0, 8, ByteOrder::Intel)]);
        m.name = "Msg/1".to_string();
        let findings = name_charset(&m);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.category == Category::Naming));
    }

    #[test]
    fn bound_reconciliation_uses_both_tolerances() {
        let mut sig = Signal::new("S", 0, 0, 16, ByteOrder::Intel);
        sig.scale = 0.1;
        sig.offset = 0.0;
        sig.min_phys = Some(0.0);
        sig.min_raw = Some(0);
        // raw 0xFFFF * 0.1 = 6553.5; sheet rounded to 6553 -> within one unit
        sig.max_phys = Some(6553.0);
        sig.max_raw = Some(0xFFFF);
        let m = message_with(vec![sig.clone()]);
        assert!(bound_reconciliation(&m).is_empty());

        // the same slack is not granted to the minimum
        sig.min_phys = Some(0.5);
        let m = message_with(vec![sig]);
        let findings = bound_reconciliation(&m);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].detail.contains("minimum"));
    }

    #[test]
    fn zero_scale_skips_reconciliation() {
        let mut sig = Signal::new("S", 0, 0, 8, ByteOrder::Intel);
        sig.scale = 0.0;
        sig.min_phys = Some(1.0);
        sig.min_raw = Some(99);
        let m = message_with(vec![sig]);
        assert!(bound_reconciliation(&m).is_empty());
    }

    #[test]
    fn widths_for_signed_and_float() {
        let mut signed = Signal::new("S1", 0, 0, 1, ByteOrder::Intel);
        signed.signed = true;
        let mut float = Signal::new("S2", 1, 0, 16, ByteOrder::Intel);
        float.float = true;
        let m = message_with(vec![signed, float]);
        let findings = signal_widths(&m);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.category == Category::Range));
    }

    #[test]
    fn overlap_findings_name_both_signals_and_the_first_bit() {
        let m = message_with(vec![
            Signal::new("A", 0, 0, 8, ByteOrder::Intel),
            Signal::new("B", 0, 4, 8, ByteOrder::Intel),
        ]);
        let findings = signal_overlaps(&m);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].detail.contains('A'));
        assert!(findings[0].detail.contains('B'));
        assert!(findings[0].detail.contains("bit 4"));
    }

    #[test]
    fn frame_fit_reports_out_of_frame_signals() {
        let m = message_with(vec![Signal::new("S", 7, 4, 8, ByteOrder::Intel)]);
        let findings = frame_fit(&m);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::Layout);
    }
}
