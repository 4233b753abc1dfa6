//! Structural diff between two canonical matrices.
//!
//! Used for round-trip reconciliation: an external collaborator rebuilds a
//! canonical model from a generated bus description, and this diff proves
//! (or disproves) that it matches the model built from the original rows.
//! Pure structure comparison; no rules run here.

use crate::layout;
use crate::model::{Matrix, Message, Signal};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Difference {
    MessageOnlyIn {
        side: Side,
        name: String,
    },
    MessageField {
        name: String,
        field: &'static str,
        left: String,
        right: String,
    },
    SignalOnlyIn {
        side: Side,
        message: String,
        name: String,
    },
    SignalField {
        message: String,
        name: String,
        field: &'static str,
        left: String,
        right: String,
    },
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::MessageOnlyIn { side, name } => {
                write!(f, "message {} only in {:?} model", name, side)
            }
            Difference::MessageField {
                name,
                field,
                left,
                right,
            } => write!(f, "message {}: {} differs ({} vs {})", name, field, left, right),
            Difference::SignalOnlyIn {
                side,
                message,
                name,
            } => write!(f, "signal {}/{} only in {:?} model", message, name, side),
            Difference::SignalField {
                message,
                name,
                field,
                left,
                right,
            } => write!(
                f,
                "signal {}/{}: {} differs ({} vs {})",
                message, name, field, left, right
            ),
        }
    }
}

/// Compares two matrices message-by-message and signal-by-signal.
/// Empty result means the models are round-trip equal.
pub fn diff(left: &Matrix, right: &Matrix) -> Vec<Difference> {
    let mut out = Vec::new();

    for message in &left.messages {
        match right.message(&message.name) {
            Some(other) => diff_message(message, other, &mut out),
            None => out.push(Difference::MessageOnlyIn {
                side: Side::Left,
                name: message.name.clone(),
            }),
        }
    }
    for message in &right.messages {
        if left.message(&message.name).is_none() {
            out.push(Difference::MessageOnlyIn {
                side: Side::Right,
                name: message.name.clone(),
            });
        }
    }
    out
}

fn push_field(
    out: &mut Vec<Difference>,
    name: &str,
    field: &'static str,
    left: String,
    right: String,
) {
    if left != right {
        out.push(Difference::MessageField {
            name: name.to_string(),
            field,
            left,
            right,
        });
    }
}

fn diff_message(left: &Message, right: &Message, out: &mut Vec<Difference>) {
    let name = &left.name;
    push_field(out, name, "id", format!("0x{:X}", left.id), format!("0x{:X}", right.id));
    push_field(out, name, "length", left.length.to_string(), right.length.to_string());
    push_field(out, name, "class", format!("{:?}", left.class), format!("{:?}", right.class));
    push_field(
        out,
        name,
        "send_type",
        format!("{:?}", left.send_type),
        format!("{:?}", right.send_type),
    );
    push_field(
        out,
        name,
        "lin_frame_type",
        format!("{:?}", left.lin_frame_type),
        format!("{:?}", right.lin_frame_type),
    );
    push_field(
        out,
        name,
        "frame_format",
        format!("{:?}", left.frame_format),
        format!("{:?}", right.frame_format),
    );
    push_field(out, name, "brs", format!("{:?}", left.brs), format!("{:?}", right.brs));
    push_field(
        out,
        name,
        "checksum_mode",
        format!("{:?}", left.checksum_mode),
        format!("{:?}", right.checksum_mode),
    );
    push_field(
        out,
        name,
        "protected_id",
        format!("{:?}", left.protected_id),
        format!("{:?}", right.protected_id),
    );
    push_field(
        out,
        name,
        "cycle_time_ms",
        format!("{:?}", left.cycle_time_ms),
        format!("{:?}", right.cycle_time_ms),
    );
    push_field(
        out,
        name,
        "senders",
        format!("{:?}", left.senders),
        format!("{:?}", right.senders),
    );
    push_field(
        out,
        name,
        "receivers",
        format!("{:?}", left.receivers),
        format!("{:?}", right.receivers),
    );

    for signal in &left.signals {
        match right.signal(&signal.name) {
            Some(other) => diff_signal(name, signal, other, out),
            None => out.push(Difference::SignalOnlyIn {
                side: Side::Left,
                message: name.clone(),
                name: signal.name.clone(),
            }),
        }
    }
    for signal in &right.signals {
        if left.signal(&signal.name).is_none() {
            out.push(Difference::SignalOnlyIn {
                side: Side::Right,
                message: name.clone(),
                name: signal.name.clone(),
            });
        }
    }
}

fn diff_signal(message: &str, left: &Signal, right: &Signal, out: &mut Vec<Difference>) {
    let mut push = |field: &'static str, l: String, r: String| {
        if l != r {
            out.push(Difference::SignalField {
                message: message.to_string(),
                name: left.name.clone(),
                field,
                left: l,
                right: r,
            });
        }
    };

    // Span equality covers start byte/bit and byte order together: two
    // encodings of the same physical placement compare equal.
    let left_span = layout::bit_positions(left);
    let right_span = layout::bit_positions(right);
    push("bit_positions", format!("{:?}", left_span), format!("{:?}", right_span));
    push("byte_order", format!("{:?}", left.byte_order), format!("{:?}", right.byte_order));
    push("signed", left.signed.to_string(), right.signed.to_string());
    push("scale", left.scale.to_string(), right.scale.to_string());
    push("offset", left.offset.to_string(), right.offset.to_string());
    push("raw_initial", format!("{:?}", left.raw_initial), format!("{:?}", right.raw_initial));
    push("raw_invalid", format!("{:?}", left.raw_invalid), format!("{:?}", right.raw_invalid));
    push("min_phys", format!("{:?}", left.min_phys), format!("{:?}", right.min_phys));
    push("max_phys", format!("{:?}", left.max_phys), format!("{:?}", right.max_phys));
    push("unit", left.unit.clone(), right.unit.clone());
    push(
        "value_descriptions",
        format!("{:?}", left.value_descriptions),
        format!("{:?}", right.value_descriptions),
    );
    push("receivers", format!("{:?}", left.receivers), format!("{:?}", right.receivers));
}
