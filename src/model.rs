//! Canonical entities for one bus matrix: nodes, messages, signals and
//! value descriptions, normalized from row data and immutable once built.

use crate::report::{Category, Finding, Subject};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel node name used when a message has no sender or receiver marks.
/// Downstream serializers treat it specially and emit no sender attribute.
pub const UNSPECIFIED_NODE: &str = "Vector__XXX";

/// A bus participant (ECU).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Node { name: name.into() }
    }

    pub fn unspecified() -> Self {
        Node::new(UNSPECIFIED_NODE)
    }

    pub fn is_unspecified(&self) -> bool {
        self.name == UNSPECIFIED_NODE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVariant {
    Can,
    CanFd,
    Lin,
}

impl ProtocolVariant {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "can" => Some(ProtocolVariant::Can),
            "canfd" | "can-fd" | "can_fd" => Some(ProtocolVariant::CanFd),
            "lin" => Some(ProtocolVariant::Lin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolVariant::Can => "CAN",
            ProtocolVariant::CanFd => "CANFD",
            ProtocolVariant::Lin => "LIN",
        }
    }
}

/// Bit-numbering convention for locating a signal's bits within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    /// Little-endian ("Intel").
    Intel,
    /// Big-endian ("Motorola MSB").
    Motorola,
}

impl ByteOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Intel" => Some(ByteOrder::Intel),
            "Motorola MSB" | "Motorola" => Some(ByteOrder::Motorola),
            _ => None,
        }
    }
}

/// Message-level send classification for CAN matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageSendType {
    Cyclic,
    Event,
    /// "CE": cyclic with event-triggered sends in between.
    CyclicEvent,
    /// "CA": cyclic while a condition is active.
    CyclicIfActive,
    IfActive,
}

impl MessageSendType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Cycle" | "Cyclic" => Some(MessageSendType::Cyclic),
            "Event" => Some(MessageSendType::Event),
            "CE" => Some(MessageSendType::CyclicEvent),
            "CA" => Some(MessageSendType::CyclicIfActive),
            "IfActive" => Some(MessageSendType::IfActive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageSendType::Cyclic => "Cyclic",
            MessageSendType::Event => "Event",
            MessageSendType::CyclicEvent => "CE",
            MessageSendType::CyclicIfActive => "CA",
            MessageSendType::IfActive => "IfActive",
        }
    }

    /// True for the families that are expected to carry a cycle time.
    pub fn is_cyclic_family(self) -> bool {
        matches!(
            self,
            MessageSendType::Cyclic
                | MessageSendType::CyclicEvent
                | MessageSendType::CyclicIfActive
        )
    }
}

/// Signal-level send classification, finer-grained than the message level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalSendType {
    Cyclic,
    OnWrite,
    OnChange,
    OnWriteWithRepetition,
    OnChangeWithRepetition,
    IfActive,
    IfActiveWithRepetition,
}

impl SignalSendType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Cycle" | "Cyclic" => Some(SignalSendType::Cyclic),
            "OnWrite" => Some(SignalSendType::OnWrite),
            "OnChange" => Some(SignalSendType::OnChange),
            "OnWriteWithRepetition" => Some(SignalSendType::OnWriteWithRepetition),
            "OnChangeWithRepetition" => Some(SignalSendType::OnChangeWithRepetition),
            "IfActive" => Some(SignalSendType::IfActive),
            "IfActiveWithRepetition" => Some(SignalSendType::IfActiveWithRepetition),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalSendType::Cyclic => "Cyclic",
            SignalSendType::OnWrite => "OnWrite",
            SignalSendType::OnChange => "OnChange",
            SignalSendType::OnWriteWithRepetition => "OnWriteWithRepetition",
            SignalSendType::OnChangeWithRepetition => "OnChangeWithRepetition",
            SignalSendType::IfActive => "IfActive",
            SignalSendType::IfActiveWithRepetition => "IfActiveWithRepetition",
        }
    }
}

/// LIN frame classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinFrameType {
    Unconditional,
    Event,
    Sporadic,
    Diagnostic,
}

impl LinFrameType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "UF" => Some(LinFrameType::Unconditional),
            "EF" => Some(LinFrameType::Event),
            "SF" => Some(LinFrameType::Sporadic),
            "DF" => Some(LinFrameType::Diagnostic),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LinFrameType::Unconditional => "UF",
            LinFrameType::Event => "EF",
            LinFrameType::Sporadic => "SF",
            LinFrameType::Diagnostic => "DF",
        }
    }
}

/// Reserved message classes bound to ID sub-ranges on CAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageClass {
    Normal,
    Diag,
    Nm,
}

impl MessageClass {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Normal" => Some(MessageClass::Normal),
            "Diag" => Some(MessageClass::Diag),
            "NM" => Some(MessageClass::Nm),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageClass::Normal => "Normal",
            MessageClass::Diag => "Diag",
            MessageClass::Nm => "NM",
        }
    }

    /// Class implied by the naming convention: `NM_` prefix is network
    /// management, `Diag` prefix is diagnostic, everything else is normal.
    pub fn derive_from_name(name: &str) -> Self {
        if name.starts_with("NM_") {
            MessageClass::Nm
        } else if name.starts_with("Diag") {
            MessageClass::Diag
        } else {
            MessageClass::Normal
        }
    }
}

/// CAN-FD frame format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    StandardCan,
    StandardCanFd,
}

impl FrameFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "StandardCAN" => Some(FrameFormat::StandardCan),
            "StandardCAN_FD" => Some(FrameFormat::StandardCanFd),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameFormat::StandardCan => "StandardCAN",
            FrameFormat::StandardCanFd => "StandardCAN_FD",
        }
    }
}

/// LIN checksum model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumMode {
    Classic,
    Enhanced,
}

impl ChecksumMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Some(ChecksumMode::Classic),
            "enhanced" => Some(ChecksumMode::Enhanced),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChecksumMode::Classic => "Classic",
            ChecksumMode::Enhanced => "Enhanced",
        }
    }
}

/// A label for one raw value or a contiguous raw-value range (half-open `hi`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueDescription {
    Single { raw: u64, label: String },
    Range { lo: u64, hi: u64, label: String },
}

impl ValueDescription {
    pub fn label(&self) -> &str {
        match self {
            ValueDescription::Single { label, .. } => label,
            ValueDescription::Range { label, .. } => label,
        }
    }

    pub fn covers(&self, raw: u64) -> bool {
        match self {
            ValueDescription::Single { raw: r, .. } => *r == raw,
            ValueDescription::Range { lo, hi, .. } => (*lo..*hi).contains(&raw),
        }
    }

    /// Ordering key: the first raw value the entry covers.
    pub fn first_raw(&self) -> u64 {
        match self {
            ValueDescription::Single { raw, .. } => *raw,
            ValueDescription::Range { lo, .. } => *lo,
        }
    }
}

/// One field packed into a message's payload bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub start_byte: u32,
    pub start_bit: u32,
    pub bit_length: u32,
    pub byte_order: ByteOrder,
    pub signed: bool,
    pub float: bool,
    pub scale: f64,
    pub offset: f64,
    pub raw_initial: Option<u64>,
    pub raw_invalid: Option<u64>,
    pub raw_inactive: Option<u64>,
    pub min_phys: Option<f64>,
    pub max_phys: Option<f64>,
    pub min_raw: Option<u64>,
    pub max_raw: Option<u64>,
    pub unit: String,
    pub description: String,
    pub value_descriptions: Vec<ValueDescription>,
    pub send_type: Option<SignalSendType>,
    pub receivers: Vec<Node>,
}

impl Signal {
    /// A minimal signal for building up in tests and model constructors.
    pub fn new(name: impl Into<String>, start_byte: u32, start_bit: u32, bit_length: u32, byte_order: ByteOrder) -> Self {
        Signal {
            name: name.into(),
            start_byte,
            start_bit,
            bit_length,
            byte_order,
            signed: false,
            float: false,
            scale: 1.0,
            offset: 0.0,
            raw_initial: None,
            raw_invalid: None,
            raw_inactive: None,
            min_phys: None,
            max_phys: None,
            min_raw: None,
            max_raw: None,
            unit: String::new(),
            description: String::new(),
            value_descriptions: Vec::new(),
            send_type: None,
            receivers: vec![Node::unspecified()],
        }
    }
}

/// One bus frame definition with its carried signals and derived endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    pub id: u32,
    pub variant: ProtocolVariant,
    pub class: Option<MessageClass>,
    /// Declared frame length in bytes.
    pub length: u32,
    pub send_type: Option<MessageSendType>,
    pub lin_frame_type: Option<LinFrameType>,
    pub frame_format: Option<FrameFormat>,
    pub brs: Option<u8>,
    pub checksum_mode: Option<ChecksumMode>,
    pub protected_id: Option<u64>,
    pub cycle_time_ms: Option<u32>,
    pub signals: Vec<Signal>,
    pub senders: Vec<Node>,
    pub receivers: Vec<Node>,
}

impl Message {
    pub fn new(name: impl Into<String>, id: u32, variant: ProtocolVariant, length: u32) -> Self {
        Message {
            name: name.into(),
            id,
            variant,
            class: None,
            length,
            send_type: None,
            lin_frame_type: None,
            frame_format: None,
            brs: None,
            checksum_mode: None,
            protected_id: None,
            cycle_time_ms: None,
            signals: Vec::new(),
            senders: vec![Node::unspecified()],
            receivers: vec![Node::unspecified()],
        }
    }

    pub fn frame_bits(&self) -> u32 {
        self.length * 8
    }

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name == name)
    }
}

/// A fully built matrix: the node list in discovery order, messages in
/// first-appearance order, and a by-name index.
#[derive(Debug, Clone)]
pub struct Matrix {
    pub variant: ProtocolVariant,
    pub nodes: Vec<Node>,
    pub messages: Vec<Message>,
    by_name: HashMap<String, usize>,
}

impl Matrix {
    /// Indexes messages by name. Duplicate names are errors (the index
    /// keeps the last occurrence); duplicate IDs under different names are
    /// tolerated with a warning.
    pub fn resolve(
        variant: ProtocolVariant,
        nodes: Vec<Node>,
        messages: Vec<Message>,
    ) -> (Self, Vec<Finding>) {
        let mut findings = Vec::new();
        let mut by_name = HashMap::new();
        let mut by_id: HashMap<u32, String> = HashMap::new();
        for (i, m) in messages.iter().enumerate() {
            if by_name.insert(m.name.clone(), i).is_some() {
                findings.push(Finding::error(
                    Subject::message(&m.name),
                    Category::Naming,
                    format!("duplicate message name {:?}", m.name),
                    "message names must be unique within a matrix",
                ));
            }
            if let Some(other) = by_id.insert(m.id, m.name.clone()) {
                if other != m.name {
                    findings.push(Finding::warning(
                        Subject::message(&m.name),
                        Category::Naming,
                        format!("message ID 0x{:03X} is also used by {:?}", m.id, other),
                        "each frame ID should map to one message",
                    ));
                }
            }
        }
        (
            Matrix {
                variant,
                nodes,
                messages,
                by_name,
            },
            findings,
        )
    }

    pub fn message(&self, name: &str) -> Option<&Message> {
        self.by_name.get(name).map(|&i| &self.messages[i])
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
