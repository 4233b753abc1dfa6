//! LIN legality rules, including protected-ID parity.

use crate::model::{ChecksumMode, LinFrameType, Message};
use crate::report::{Category, Finding, Subject};

/// Computes the protected ID for a 6-bit frame identifier:
/// `P0 = ID0^ID1^ID2^ID4`, `P1 = !(ID1^ID3^ID4^ID5)`, packed above the ID.
pub fn protected_id_for(frame_id: u8) -> u8 {
    let bit = |i: u8| (frame_id >> i) & 1;
    let p0 = bit(0) ^ bit(1) ^ bit(2) ^ bit(4);
    let p1 = 1 ^ (bit(1) ^ bit(3) ^ bit(4) ^ bit(5));
    (frame_id & 0x3F) | (p0 << 6) | (p1 << 7)
}

/// Frame IDs live in `[0x00, 0x3D]`; `0x3E`/`0x3F` are reserved.
pub fn id_range(message: &Message) -> Vec<Finding> {
    let mut out = Vec::new();
    let subject = || Subject::message(&message.name);
    if message.id > 0x3D {
        out.push(Finding::error(
            subject(),
            Category::Range,
            format!("frame ID 0x{:02X} is out of range", message.id),
            "LIN IDs must be between 0x00 and 0x3D (0-61 decimal)",
        ));
    }
    if matches!(message.id, 0x3E | 0x3F) {
        out.push(Finding::error(
            subject(),
            Category::Range,
            format!("frame ID 0x{:02X} is reserved", message.id),
            "IDs 0x3E and 0x3F (62-63) are reserved and cannot be used",
        ));
    }
    out
}

/// Unconditional and diagnostic frames each own an ID sub-range.
pub fn frame_type_ids(message: &Message) -> Vec<Finding> {
    let subject = || Subject::message(&message.name);
    match message.lin_frame_type {
        Some(LinFrameType::Unconditional) if message.id > 0x3B => {
            vec![Finding::error(
                subject(),
                Category::Consistency,
                format!("unconditional frame with ID 0x{:02X}", message.id),
                "Unconditional Frames must use IDs 0x00-0x3B (0-59)",
            )]
        }
        Some(LinFrameType::Diagnostic) if !matches!(message.id, 0x3C | 0x3D) => {
            vec![Finding::error(
                subject(),
                Category::Consistency,
                format!("diagnostic frame with ID 0x{:02X}", message.id),
                "Diagnostic Frames must use IDs 0x3C (Master Request) or 0x3D (Slave Response)",
            )]
        }
        _ => Vec::new(),
    }
}

/// The protected ID is an 8-bit value.
pub fn protected_id_range(message: &Message) -> Vec<Finding> {
    match message.protected_id {
        Some(pid) if pid > 0xFF => vec![Finding::error(
            Subject::message(&message.name),
            Category::Range,
            format!("protected ID 0x{:X} is wider than 8 bits", pid),
            "Protected ID must be an 8-bit value (0x00-0xFF)",
        )],
        _ => Vec::new(),
    }
}

/// Recomputes the protected ID from the frame ID and compares. The whole
/// value and the two parity bits are checked independently: a transcription
/// error can corrupt one without the other.
pub fn protected_id(message: &Message) -> Vec<Finding> {
    let Some(pid) = message.protected_id else {
        return Vec::new();
    };
    if pid > 0xFF || message.id > 0x3F {
        return Vec::new();
    }
    let subject = || Subject::message(&message.name);
    let declared = pid as u8;
    let expected = protected_id_for(message.id as u8);
    let mut out = Vec::new();
    if declared != expected {
        out.push(Finding::error(
            subject(),
            Category::Consistency,
            format!(
                "declared protected ID 0x{:02X}, expected 0x{:02X} for frame ID 0x{:02X}",
                declared, expected, message.id
            ),
            "Protected ID is Frame ID (bits 0-5) + P0 (bit 6) + P1 (bit 7)",
        ));
    }
    let declared_parity = declared >> 6;
    let expected_parity = expected >> 6;
    if declared_parity != expected_parity {
        out.push(Finding::error(
            subject(),
            Category::Consistency,
            format!(
                "declared parity bits P0={} P1={}, expected P0={} P1={}",
                declared_parity & 1,
                declared_parity >> 1,
                expected_parity & 1,
                expected_parity >> 1
            ),
            "P0 = ID0^ID1^ID2^ID4, P1 = !(ID1^ID3^ID4^ID5)",
        ));
    }
    out
}

/// LIN frames are 1, 2, 4 or 8 bytes.
pub fn frame_length(message: &Message) -> Vec<Finding> {
    if matches!(message.length, 1 | 2 | 4 | 8) {
        return Vec::new();
    }
    vec![Finding::error(
        Subject::message(&message.name),
        Category::Range,
        format!("frame length {} bytes", message.length),
        "LIN message length must be 1, 2, 4, or 8 bytes",
    )]
}

/// Diagnostic frames use the classic checksum.
pub fn checksum(message: &Message) -> Vec<Finding> {
    if message.lin_frame_type == Some(LinFrameType::Diagnostic)
        && message.checksum_mode == Some(ChecksumMode::Enhanced)
    {
        return vec![Finding::error(
            Subject::message(&message.name),
            Category::Consistency,
            "diagnostic frame with enhanced checksum".to_string(),
            "Diagnostic frames use the Classic checksum",
        )];
    }
    Vec::new()
}

/// LIN names stay within 32 characters.
pub fn name_lengths(message: &Message) -> Vec<Finding> {
    let mut out = Vec::new();
    if message.name.len() > 32 {
        out.push(Finding::warning(
            Subject::message(&message.name),
            Category::Naming,
            format!("message name is {} characters long", message.name.len()),
            "LIN message names should stay within 32 characters",
        ));
    }
    for signal in &message.signals {
        if signal.name.len() > 32 {
            out.push(Finding::warning(
                Subject::signal(&message.name, &signal.name),
                Category::Naming,
                format!("signal name is {} characters long", signal.name.len()),
                "LIN signal names should stay within 32 characters",
            ));
        }
    }
    out
}

/// Positions within the 8-bit-word addressing model: start byte/bit inside
/// the frame, 1..=16 bit signals, and no byte straddling — a short signal
/// stays inside its byte, a longer one starts byte-aligned.
pub fn signal_geometry(message: &Message) -> Vec<Finding> {
    let mut out = Vec::new();
    for signal in &message.signals {
        let subject = || Subject::signal(&message.name, &signal.name);
        if signal.start_byte >= message.length.max(1) || signal.start_byte > 7 {
            out.push(Finding::error(
                subject(),
                Category::Range,
                format!(
                    "start byte {} in a {}-byte frame",
                    signal.start_byte, message.length
                ),
                "Start byte must be between 0 and 7 for LIN",
            ));
        }
        if signal.start_bit > 7 {
            out.push(Finding::error(
                subject(),
                Category::Range,
                format!("start bit {}", signal.start_bit),
                "Start bit must be between 0 and 7 for LIN",
            ));
        }
        if !(1..=16).contains(&signal.bit_length) {
            out.push(Finding::error(
                subject(),
                Category::Range,
                format!("bit length {}", signal.bit_length),
                "Signal length must be between 1 and 16 bits for LIN",
            ));
            continue;
        }
        if signal.start_bit <= 7 {
            let straddles = if signal.bit_length <= 8 {
                signal.start_bit % 8 + signal.bit_length > 8
            } else {
                signal.start_bit % 8 != 0
            };
            if straddles {
                out.push(Finding::error(
                    subject(),
                    Category::Range,
                    format!(
                        "signal starts at bit {} and runs {} bits across a byte boundary",
                        signal.start_bit, signal.bit_length
                    ),
                    "LIN signals must not cross a byte boundary: short signals fit one byte, longer ones start at bit 0",
                ));
            }
        }
    }
    out
}
