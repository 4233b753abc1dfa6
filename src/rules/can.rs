//! Classical CAN and CAN-FD legality rules.

use crate::model::{
    FrameFormat, Message, MessageClass, MessageSendType, ProtocolVariant, SignalSendType,
};
use crate::report::{Category, Finding, Subject};

/// Message IDs live in `[0x001, 0x7FF]`; the top and NM sub-ranges are
/// reserved for their message classes.
pub fn id_range(message: &Message) -> Vec<Finding> {
    let mut out = Vec::new();
    let subject = || Subject::message(&message.name);
    if !(0x001..=0x7FF).contains(&message.id) {
        out.push(Finding::error(
            subject(),
            Category::Range,
            format!("message ID 0x{:03X} is out of range", message.id),
            "Msg ID must be in the range 0x001 to 0x7FF",
        ));
    }
    if (0x700..=0x7FF).contains(&message.id) && message.class != Some(MessageClass::Diag) {
        out.push(Finding::error(
            subject(),
            Category::Range,
            format!(
                "message ID 0x{:03X} requires type Diag, declared {}",
                message.id,
                declared_class(message)
            ),
            "IDs 0x700 to 0x7FF are reserved for Diag messages",
        ));
    }
    if (0x500..=0x5FF).contains(&message.id) && message.class != Some(MessageClass::Nm) {
        out.push(Finding::error(
            subject(),
            Category::Range,
            format!(
                "message ID 0x{:03X} requires type NM, declared {}",
                message.id,
                declared_class(message)
            ),
            "IDs 0x500 to 0x5FF are reserved for NM messages",
        ));
    }
    out
}

fn declared_class(message: &Message) -> &'static str {
    message.class.map(MessageClass::as_str).unwrap_or("nothing")
}

/// The class implied by the name prefix must match the declared class.
pub fn class_matches_name(message: &Message) -> Vec<Finding> {
    let Some(declared) = message.class else {
        return Vec::new();
    };
    let derived = MessageClass::derive_from_name(&message.name);
    if derived != MessageClass::Normal && derived != declared {
        return vec![Finding::error(
            Subject::message(&message.name),
            Category::Naming,
            format!(
                "name {:?} implies type {} but {} is declared",
                message.name,
                derived.as_str(),
                declared.as_str()
            ),
            "NM, if Msg Name starts with 'NM_' and Diag, if Msg Name starts with 'Diag'",
        )];
    }
    Vec::new()
}

/// CAN message names stay within 64 characters; signals additionally get a
/// shortening nudge above 36.
pub fn name_lengths(message: &Message) -> Vec<Finding> {
    let mut out = Vec::new();
    if message.name.len() > 64 {
        out.push(Finding::warning(
            Subject::message(&message.name),
            Category::Naming,
            format!("message name is {} characters long", message.name.len()),
            "message names should stay within 64 characters",
        ));
    }
    for signal in &message.signals {
        if signal.name.len() > 64 {
            out.push(Finding::warning(
                Subject::signal(&message.name, &signal.name),
                Category::Naming,
                format!("signal name is {} characters long", signal.name.len()),
                "signal names should stay within 64 characters",
            ));
        } else if signal.name.len() > 36 {
            out.push(Finding::warning(
                Subject::signal(&message.name, &signal.name),
                Category::Naming,
                format!("signal name is {} characters long", signal.name.len()),
                "Please, try to make the signal name shorter (36 characters)",
            ));
        }
    }
    out
}

/// Message-level send types are the cyclic/event/mixed family.
pub fn message_send_type(message: &Message) -> Vec<Finding> {
    match message.send_type {
        None => Vec::new(),
        Some(
            MessageSendType::Cyclic | MessageSendType::Event | MessageSendType::CyclicEvent,
        ) => Vec::new(),
        Some(other) => vec![Finding::error(
            Subject::message(&message.name),
            Category::Range,
            format!("send type {} is not allowed at message level", other.as_str()),
            "Send Type should be 'Cycle', 'Event' or 'CE'",
        )],
    }
}

/// Classical CAN frames are 8 bytes; FD frames follow the frame format.
pub fn frame_length(message: &Message) -> Vec<Finding> {
    let subject = || Subject::message(&message.name);
    match message.variant {
        ProtocolVariant::Can => {
            if message.length != 8 {
                return vec![Finding::error(
                    subject(),
                    Category::Range,
                    format!("frame length {} bytes", message.length),
                    "Classical CAN frames are 8 bytes",
                )];
            }
            Vec::new()
        }
        ProtocolVariant::CanFd => match message.frame_format {
            Some(FrameFormat::StandardCan) if message.length != 8 => {
                vec![Finding::error(
                    subject(),
                    Category::Range,
                    format!("frame length {} bytes with StandardCAN", message.length),
                    "StandardCAN frames are 8 bytes",
                )]
            }
            Some(FrameFormat::StandardCanFd) if !matches!(message.length, 8 | 64) => {
                vec![Finding::error(
                    subject(),
                    Category::Range,
                    format!("frame length {} bytes with StandardCAN_FD", message.length),
                    "StandardCAN_FD frames are 8 or 64 bytes",
                )]
            }
            _ => Vec::new(),
        },
        ProtocolVariant::Lin => Vec::new(),
    }
}

/// The bit-rate-switch flag is a plain 0/1.
pub fn brs_value(message: &Message) -> Vec<Finding> {
    match message.brs {
        Some(v) if v > 1 => vec![Finding::error(
            Subject::message(&message.name),
            Category::Range,
            format!("BRS value {}", v),
            "BRS should be '1' or '0'",
        )],
        _ => Vec::new(),
    }
}

/// BRS and frame format must agree: 0 pairs with StandardCAN, 1 with
/// StandardCAN_FD.
pub fn brs_format(message: &Message) -> Vec<Finding> {
    let (Some(brs), Some(format)) = (message.brs, message.frame_format) else {
        return Vec::new();
    };
    let expected = match brs {
        0 => FrameFormat::StandardCan,
        1 => FrameFormat::StandardCanFd,
        _ => return Vec::new(),
    };
    if format != expected {
        return vec![Finding::error(
            Subject::message(&message.name),
            Category::Consistency,
            format!("BRS={} with frame format {}", brs, format.as_str()),
            "BRS=0 should be with StandardCAN, BRS=1 should be with StandardCAN_FD",
        )];
    }
    Vec::new()
}

fn allowed_signal_types(send_type: MessageSendType) -> &'static [SignalSendType] {
    match send_type {
        MessageSendType::CyclicIfActive => {
            &[SignalSendType::Cyclic, SignalSendType::IfActiveWithRepetition]
        }
        MessageSendType::CyclicEvent => &[
            SignalSendType::Cyclic,
            SignalSendType::OnWrite,
            SignalSendType::OnChange,
            SignalSendType::OnWriteWithRepetition,
            SignalSendType::OnChangeWithRepetition,
        ],
        MessageSendType::Cyclic => &[SignalSendType::Cyclic],
        MessageSendType::Event => &[
            SignalSendType::OnWrite,
            SignalSendType::OnChange,
            SignalSendType::OnWriteWithRepetition,
            SignalSendType::OnChangeWithRepetition,
        ],
        MessageSendType::IfActive => &[SignalSendType::IfActive],
    }
}

/// Signal send types must belong to the allowed subset for the message's
/// send type.
pub fn signal_send_types(message: &Message) -> Vec<Finding> {
    let Some(message_type) = message.send_type else {
        return Vec::new();
    };
    let allowed = allowed_signal_types(message_type);
    let mut out = Vec::new();
    for signal in &message.signals {
        let Some(signal_type) = signal.send_type else {
            continue;
        };
        if !allowed.contains(&signal_type) {
            let expected: Vec<&str> = allowed.iter().map(|t| t.as_str()).collect();
            out.push(Finding::error(
                Subject::signal(&message.name, &signal.name),
                Category::Consistency,
                format!(
                    "signal send type {} under message send type {}",
                    signal_type.as_str(),
                    message_type.as_str()
                ),
                format!("expected one of: {}", expected.join(", ")),
            ));
        }
    }
    out
}

/// Cyclic families should declare a cycle time, purely event-driven
/// messages should not. Kept at warning level: the upstream tool never
/// enforced this and existing matrices must stay serializable.
pub fn cycle_time_presence(message: &Message) -> Vec<Finding> {
    let Some(send_type) = message.send_type else {
        return Vec::new();
    };
    if send_type.is_cyclic_family() && message.cycle_time_ms.is_none() {
        return vec![Finding::warning(
            Subject::message(&message.name),
            Category::Consistency,
            format!("send type {} without a cycle time", send_type.as_str()),
            "cyclic messages declare a cycle time in milliseconds",
        )];
    }
    if send_type == MessageSendType::Event && message.cycle_time_ms.is_some() {
        return vec![Finding::warning(
            Subject::message(&message.name),
            Category::Consistency,
            "event message declares a cycle time".to_string(),
            "purely event-driven messages carry no cycle time",
        )];
    }
    Vec::new()
}

/// Start positions must sit inside the frame; start bits are within-byte.
pub fn signal_geometry(message: &Message) -> Vec<Finding> {
    let mut out = Vec::new();
    for signal in &message.signals {
        if signal.start_byte >= message.length {
            out.push(Finding::error(
                Subject::signal(&message.name, &signal.name),
                Category::Range,
                format!(
                    "start byte {} in a {}-byte frame",
                    signal.start_byte, message.length
                ),
                format!("Start Byte is only a number, in the range from 0 to {}", message.length.saturating_sub(1)),
            ));
        }
        if signal.start_bit > 7 {
            out.push(Finding::error(
                Subject::signal(&message.name, &signal.name),
                Category::Range,
                format!("start bit {}", signal.start_bit),
                "Start Bit is only a number, in the range from 0 to 7",
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ByteOrder, Signal};

    fn can_message(name: &str, id: u32) -> Message {
        let mut m = Message::new(name, id, ProtocolVariant::Can, 8);
        m.class = Some(MessageClass::Normal);
        m.send_type = Some(MessageSendType::Cyclic);
        m.cycle_time_ms = Some(100);
        m
    }

    #[test]
    fn diag_range_requires_diag_class() {
        let mut m = can_message("GatewayReq", 0x701);
        let findings = id_range(&m);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::Range);

        m.class = Some(MessageClass::Diag);
        assert!(id_range(&m).is_empty());
    }

    #[test]
    fn nm_range_requires_nm_class() {
        let mut m = can_message("NM_Wakeup", 0x503);
        // declared Normal: both the ID range rule and the naming rule fire
        assert_eq!(id_range(&m).len(), 1);
        let naming = class_matches_name(&m);
        assert_eq!(naming.len(), 1);
        assert_eq!(naming[0].category, Category::Naming);

        m.class = Some(MessageClass::Nm);
        assert!(id_range(&m).is_empty());
        assert!(class_matches_name(&m).is_empty());
    }

    #[test]
    fn id_outside_eleven_bits_is_rejected() {
        let m = can_message("M", 0x800);
        assert_eq!(id_range(&m).len(), 1);
        let m = can_message("M", 0x000);
        assert_eq!(id_range(&m).len(), 1);
    }

    #[test]
    fn fd_length_follows_frame_format() {
        let mut m = Message::new("M", 0x123, ProtocolVariant::CanFd, 32);
        m.frame_format = Some(FrameFormat::StandardCanFd);
        let findings = frame_length(&m);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::Range);
        assert!(findings[0].expected.contains("8 or 64"));

        m.length = 64;
        assert!(frame_length(&m).is_empty());
        m.length = 8;
        assert!(frame_length(&m).is_empty());

        m.frame_format = Some(FrameFormat::StandardCan);
        m.length = 64;
        assert_eq!(frame_length(&m).len(), 1);
    }

    #[test]
    fn classical_frames_are_eight_bytes() {
        let mut m = can_message("M", 0x123);
        m.length = 4;
        assert_eq!(frame_length(&m).len(), 1);
    }

    #[test]
    fn brs_pairs_with_frame_format() {
        let mut m = Message::new("M", 0x123, ProtocolVariant::CanFd, 64);
        m.brs = Some(1);
        m.frame_format = Some(FrameFormat::StandardCanFd);
        assert!(brs_format(&m).is_empty());

        m.brs = Some(0);
        assert_eq!(brs_format(&m).len(), 1);

        m.brs = Some(3);
        assert_eq!(brs_value(&m).len(), 1);
        assert!(brs_format(&m).is_empty());
    }

    #[test]
    fn cyclic_message_only_allows_cyclic_signals() {
        let mut m = can_message("M", 0x123);
        let mut sig = Signal::new("S", 0, 0, 8, ByteOrder::Intel);
        sig.send_type = Some(SignalSendType::OnChange);
        m.signals.push(sig);
        let findings = signal_send_types(&m);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::Consistency);

        m.signals[0].send_type = Some(SignalSendType::Cyclic);
        assert!(signal_send_types(&m).is_empty());
    }

    #[test]
    fn mixed_message_allows_the_wider_set() {
        let mut m = can_message("M", 0x123);
        m.send_type = Some(MessageSendType::CyclicEvent);
        let mut sig = Signal::new("S", 0, 0, 8, ByteOrder::Intel);
        sig.send_type = Some(SignalSendType::OnWriteWithRepetition);
        m.signals.push(sig);
        assert!(signal_send_types(&m).is_empty());

        m.signals[0].send_type = Some(SignalSendType::IfActive);
        assert_eq!(signal_send_types(&m).len(), 1);
    }

    #[test]
    fn cycle_time_presence_warns_never_errors() {
        let mut m = can_message("M", 0x123);
        m.cycle_time_ms = None;
        let findings = cycle_time_presence(&m);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, crate::report::Severity::Warning);

        m.send_type = Some(MessageSendType::Event);
        m.cycle_time_ms = Some(50);
        let findings = cycle_time_presence(&m);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, crate::report::Severity::Warning);

        m.cycle_time_ms = None;
        assert!(cycle_time_presence(&m).is_empty());
    }

    #[test]
    fn ca_message_level_type_is_rejected() {
        let mut m = can_message("M", 0x123);
        m.send_type = Some(MessageSendType::CyclicIfActive);
        assert_eq!(message_send_type(&m).len(), 1);
        m.send_type = Some(MessageSendType::CyclicEvent);
        assert!(message_send_type(&m).is_empty());
    }

    #[test]
    fn geometry_bounds() {
        let mut m = can_message("M", 0x123);
        m.signals.push(Signal::new("A", 8, 0, 8, ByteOrder::Intel));
        m.signals.push(Signal::new("B", 0, 9, 4, ByteOrder::Intel));
        let findings = signal_geometry(&m);
        assert_eq!(findings.len(), 2);
    }
}
