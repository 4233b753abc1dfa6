//! Typed row schema: logical-column mapping, node-column discovery, and
//! building the canonical matrix from already-materialized rows.
//!
//! The ingestion collaborator hands over a [`Table`]: the sheet's column
//! headers plus loosely-typed cells. Everything string-keyed stops here; the
//! rest of the crate sees only typed [`Message`]/[`Signal`] data. A missing
//! required column is the single fatal condition ([`SchemaError`]); every
//! defect a sheet author could produce becomes a [`Finding`] instead.

use crate::codec;
use crate::model::{
    ByteOrder, ChecksumMode, FrameFormat, LinFrameType, Matrix, Message, MessageClass,
    MessageSendType, Node, ProtocolVariant, Signal, SignalSendType,
};
use crate::report::{Category, Finding, Report, Subject};
use crate::vdesc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// One sheet cell. Number-shaped JSON becomes `Number`, strings `Text`,
/// `null` `Blank`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Blank,
}

const BLANK: Cell = Cell::Blank;

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(t) => t.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Trimmed, non-empty text content.
    pub fn text(&self) -> Option<&str> {
        match self {
            Cell::Text(t) => {
                let t = t.trim();
                (!t.is_empty()).then_some(t)
            }
            _ => None,
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(t) => t.trim().parse().ok(),
            Cell::Blank => None,
        }
    }

    fn display(&self) -> String {
        match self {
            Cell::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Text(t) => t.trim().to_string(),
            Cell::Blank => String::new(),
        }
    }
}

/// Row-major table as delivered by the ingestion collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&BLANK)
    }
}

/// Fatal input-shape defects. Unlike findings these abort the run: with a
/// required column absent no further validation is meaningful.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("required column {0:?} is missing from the input table")]
    MissingColumn(&'static str),
}

/// Logical columns of the matrix schema. Sheets carry bilingual headers; we
/// match on the first header line only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    MsgId,
    MsgName,
    CycleTime,
    MsgType,
    SendType,
    MsgLength,
    FrameFormat,
    Brs,
    ProtectedId,
    ChecksumMode,
    SignalName,
    StartByte,
    StartBit,
    BitLength,
    Resolution,
    Offset,
    ByteOrder,
    DataType,
    Unit,
    InitialValue,
    InvalidValue,
    InactiveValue,
    MinPhys,
    MaxPhys,
    MinHex,
    MaxHex,
    Description,
    ValueDescription,
    SignalSendType,
}

const COLUMN_COUNT: usize = 29;

/// Message-level columns: forward-filled down the group and required to stay
/// identical across it.
const MESSAGE_COLUMNS: [Column; 10] = [
    Column::MsgId,
    Column::MsgName,
    Column::CycleTime,
    Column::MsgType,
    Column::SendType,
    Column::MsgLength,
    Column::FrameFormat,
    Column::Brs,
    Column::ProtectedId,
    Column::ChecksumMode,
];

impl Column {
    fn index(self) -> usize {
        self as usize
    }

    fn headers(self) -> &'static [&'static str] {
        match self {
            Column::MsgId => &["Msg ID", "Msg ID(hex)"],
            Column::MsgName => &["Msg Name"],
            Column::CycleTime => &["Msg Cycle Time (ms)", "Msg Cycle Time(ms)"],
            Column::MsgType => &["Msg Type"],
            Column::SendType => &["Msg Send Type"],
            Column::MsgLength => &["Msg Length (Byte)", "Msg Length(Byte)"],
            Column::FrameFormat => &["Frame Format"],
            Column::Brs => &["BRS"],
            Column::ProtectedId => &["Protected ID (hex)", "Protected ID(hex)"],
            Column::ChecksumMode => &["Checksum mode", "Checksum Mode"],
            Column::SignalName => &["Signal Name"],
            Column::StartByte => &["Start Byte"],
            Column::StartBit => &["Start Bit"],
            Column::BitLength => &["Bit Length (Bit)", "Bit Length(Bit)"],
            Column::Resolution => &["Resolution"],
            Column::Offset => &["Offset"],
            Column::ByteOrder => &["Byte Order"],
            Column::DataType => &["Data Type"],
            Column::Unit => &["Unit"],
            Column::InitialValue => &["Initial Value (Hex)", "Initial Value(Hex)"],
            Column::InvalidValue => &["Invalid Value(Hex)", "Invalid Value (Hex)"],
            Column::InactiveValue => &["Inactive Value (Hex)", "Inactive Value(Hex)"],
            Column::MinPhys => &["Signal Min. Value (phys)", "Signal Min. Value(phys)"],
            Column::MaxPhys => &["Signal Max. Value (phys)", "Signal Max. Value(phys)"],
            Column::MinHex => &["Signal Min. Value(Hex)", "Signal Min. Value (Hex)"],
            Column::MaxHex => &["Signal Max. Value(Hex)", "Signal Max. Value (Hex)"],
            Column::Description => &["Signal Description"],
            Column::ValueDescription => {
                &["Signal Value Description", "Signal Value Description(hex)"]
            }
            Column::SignalSendType => &["Signal Send Type"],
        }
    }

    fn name(self) -> &'static str {
        self.headers()[0]
    }

    fn all() -> [Column; COLUMN_COUNT] {
        [
            Column::MsgId,
            Column::MsgName,
            Column::CycleTime,
            Column::MsgType,
            Column::SendType,
            Column::MsgLength,
            Column::FrameFormat,
            Column::Brs,
            Column::ProtectedId,
            Column::ChecksumMode,
            Column::SignalName,
            Column::StartByte,
            Column::StartBit,
            Column::BitLength,
            Column::Resolution,
            Column::Offset,
            Column::ByteOrder,
            Column::DataType,
            Column::Unit,
            Column::InitialValue,
            Column::InvalidValue,
            Column::InactiveValue,
            Column::MinPhys,
            Column::MaxPhys,
            Column::MinHex,
            Column::MaxHex,
            Column::Description,
            Column::ValueDescription,
            Column::SignalSendType,
        ]
    }

    fn required_for(variant: ProtocolVariant) -> &'static [Column] {
        const COMMON: [Column; 8] = [
            Column::MsgId,
            Column::MsgName,
            Column::SendType,
            Column::MsgLength,
            Column::SignalName,
            Column::StartByte,
            Column::StartBit,
            Column::BitLength,
        ];
        const CAN: [Column; 11] = [
            COMMON[0],
            COMMON[1],
            COMMON[2],
            COMMON[3],
            COMMON[4],
            COMMON[5],
            COMMON[6],
            COMMON[7],
            Column::ByteOrder,
            Column::DataType,
            Column::MsgType,
        ];
        const CANFD: [Column; 13] = [
            CAN[0],
            CAN[1],
            CAN[2],
            CAN[3],
            CAN[4],
            CAN[5],
            CAN[6],
            CAN[7],
            CAN[8],
            CAN[9],
            CAN[10],
            Column::FrameFormat,
            Column::Brs,
        ];
        const LIN: [Column; 10] = [
            COMMON[0],
            COMMON[1],
            COMMON[2],
            COMMON[3],
            COMMON[4],
            COMMON[5],
            COMMON[6],
            COMMON[7],
            Column::ProtectedId,
            Column::ChecksumMode,
        ];
        match variant {
            ProtocolVariant::Can => &CAN,
            ProtocolVariant::CanFd => &CANFD,
            ProtocolVariant::Lin => &LIN,
        }
    }
}

/// Resolved column positions plus the discovered node columns, built once
/// per table and passed around explicitly.
struct SchemaMap {
    idx: [Option<usize>; COLUMN_COUNT],
    nodes: Vec<(usize, Node)>,
}

impl SchemaMap {
    fn resolve(variant: ProtocolVariant, table: &Table) -> Result<Self, SchemaError> {
        let mut idx = [None; COLUMN_COUNT];
        for (i, header) in table.columns.iter().enumerate() {
            let key = header.lines().next().unwrap_or("").trim();
            for column in Column::all() {
                if idx[column.index()].is_none() && column.headers().contains(&key) {
                    idx[column.index()] = Some(i);
                }
            }
        }
        for &column in Column::required_for(variant) {
            if idx[column.index()].is_none() {
                return Err(SchemaError::MissingColumn(column.name()));
            }
        }

        // Node columns: unmapped, unit-less columns whose non-blank cells
        // are exclusively S/R marks.
        let mut nodes = Vec::new();
        for (i, header) in table.columns.iter().enumerate() {
            if idx.iter().any(|&m| m == Some(i)) {
                continue;
            }
            let mut marks = 0usize;
            let mut only_marks = true;
            for r in 0..table.rows.len() {
                let cell = table.cell(r, i);
                if cell.is_blank() {
                    continue;
                }
                match cell.text() {
                    Some("S") | Some("R") => marks += 1,
                    _ => {
                        only_marks = false;
                        break;
                    }
                }
            }
            if only_marks && marks > 0 {
                let name = header.lines().next().unwrap_or("").trim().to_string();
                nodes.push((i, Node::new(name)));
            }
        }
        Ok(SchemaMap { idx, nodes })
    }

    fn col(&self, column: Column) -> Option<usize> {
        self.idx[column.index()]
    }

    fn cell<'t>(&self, table: &'t Table, row: usize, column: Column) -> &'t Cell {
        match self.col(column) {
            Some(i) => table.cell(row, i),
            None => &BLANK,
        }
    }
}

/// A non-negative integer cell; `None` when blank, `Err` with the cell text
/// when malformed.
fn int_cell(cell: &Cell) -> Option<Result<u64, String>> {
    if cell.is_blank() {
        return None;
    }
    match cell.number() {
        Some(n) if n.fract() == 0.0 && n >= 0.0 && n <= u64::MAX as f64 => Some(Ok(n as u64)),
        _ => Some(Err(cell.display())),
    }
}

/// A float cell; `None` when blank.
fn float_cell(cell: &Cell) -> Option<Result<f64, String>> {
    if cell.is_blank() {
        return None;
    }
    match cell.number() {
        Some(n) => Some(Ok(n)),
        None => Some(Err(cell.display())),
    }
}

/// A raw-literal cell: hex/decimal text or an exact integer number.
fn raw_cell(cell: &Cell) -> Option<Result<u64, String>> {
    match cell {
        Cell::Blank => None,
        Cell::Number(n) => {
            if n.fract() == 0.0 && *n >= 0.0 {
                Some(Ok(*n as u64))
            } else {
                Some(Err(cell.display()))
            }
        }
        Cell::Text(t) => {
            let t = t.trim();
            if t.is_empty() {
                None
            } else {
                Some(codec::parse_raw_literal(t).map_err(|_| t.to_string()))
            }
        }
    }
}

fn normalize_unit(unit: &str) -> String {
    unit.replace('Ω', "Ohm").replace('℃', "degC")
}

struct GroupState {
    /// None when the header row was too broken to carry a message.
    message: Option<Message>,
    /// Message-level cells as established at the group's first row.
    established: Vec<(Column, Cell)>,
}

/// Builds the canonical matrix from the table. Fatal only on missing schema;
/// everything else is reported through the returned findings.
pub fn build_matrix(
    variant: ProtocolVariant,
    table: &Table,
) -> Result<(Matrix, Report), SchemaError> {
    let schema = SchemaMap::resolve(variant, table)?;
    let nodes: Vec<Node> = schema.nodes.iter().map(|(_, n)| n.clone()).collect();
    let mut report = Report::new();

    // Forward-fill state for message-level columns, carried across the whole
    // sheet as the source does.
    let mut filled: [Cell; COLUMN_COUNT] = std::array::from_fn(|_| Cell::Blank);

    let mut groups: Vec<GroupState> = Vec::new();
    let mut group_index: HashMap<(String, String), usize> = HashMap::new();

    for r in 0..table.rows.len() {
        for column in MESSAGE_COLUMNS {
            let cell = schema.cell(table, r, column);
            if !cell.is_blank() {
                filled[column.index()] = cell.clone();
            }
        }

        let signal_cell = schema.cell(table, r, Column::SignalName);
        let msg_name = filled[Column::MsgName.index()].text().map(str::to_string);
        if msg_name.is_none() {
            if let Some(sig) = signal_cell.text() {
                report.push(Finding::error(
                    Subject::signal("<unnamed>", sig),
                    Category::Literal,
                    format!("row {}: signal {:?} has no message name", r + 1, sig),
                    "every signal row must belong to a named message",
                ));
            }
            continue;
        }
        let msg_name = msg_name.unwrap_or_default();
        let id_key = filled[Column::MsgId.index()].display();

        let group_idx = match group_index.get(&(id_key.clone(), msg_name.clone())) {
            Some(&i) => {
                check_group_consistency(&schema, table, r, &groups[i], &msg_name, &mut report);
                i
            }
            None => {
                let state = open_group(variant, &filled, &msg_name, &mut report);
                groups.push(state);
                group_index.insert((id_key, msg_name.clone()), groups.len() - 1);
                groups.len() - 1
            }
        };

        // Node marks apply to the message even on signal-less rows.
        let mut row_senders = Vec::new();
        let mut row_receivers = Vec::new();
        for (col, node) in &schema.nodes {
            match table.cell(r, *col).text() {
                Some("S") => row_senders.push(node.clone()),
                Some("R") => row_receivers.push(node.clone()),
                _ => {}
            }
        }

        let group = &mut groups[group_idx];
        if let Some(message) = group.message.as_mut() {
            for node in &row_senders {
                if !message.senders.contains(node) {
                    message.senders.push(node.clone());
                }
            }
            for node in &row_receivers {
                if !message.receivers.contains(node) {
                    message.receivers.push(node.clone());
                }
            }
        }

        if let Some(signal_name) = signal_cell.text() {
            let signal = build_signal(
                variant,
                &schema,
                table,
                r,
                &msg_name,
                signal_name,
                row_receivers,
                &mut report,
            );
            if let (Some(message), Some(signal)) = (groups[group_idx].message.as_mut(), signal) {
                message.signals.push(signal);
            }
        }
    }

    let mut messages = Vec::new();
    for group in groups {
        if let Some(mut message) = group.message {
            if message.senders.is_empty() {
                message.senders.push(Node::unspecified());
            }
            if message.receivers.is_empty() {
                message.receivers.push(Node::unspecified());
            }
            messages.push(message);
        }
    }

    debug!(
        protocol = variant.as_str(),
        nodes = nodes.len(),
        messages = messages.len(),
        findings = report.len(),
        "built matrix from rows"
    );

    let (matrix, resolve_findings) = Matrix::resolve(variant, nodes, messages);
    report.extend(resolve_findings);
    Ok((matrix, report))
}

/// Establishes a new message group from the forward-filled header cells.
fn open_group(
    variant: ProtocolVariant,
    filled: &[Cell; COLUMN_COUNT],
    msg_name: &str,
    report: &mut Report,
) -> GroupState {
    let subject = || Subject::message(msg_name);
    let established: Vec<(Column, Cell)> = MESSAGE_COLUMNS
        .iter()
        .map(|&c| (c, filled[c.index()].clone()))
        .collect();

    let id = match raw_cell(&filled[Column::MsgId.index()]) {
        Some(Ok(id)) if id <= u32::MAX as u64 => Some(id as u32),
        Some(Ok(id)) => {
            report.push(Finding::error(
                subject(),
                Category::Literal,
                format!("message ID 0x{:X} does not fit a frame identifier", id),
                "Msg ID must be a 0x-prefixed hex or decimal frame identifier",
            ));
            None
        }
        Some(Err(text)) => {
            report.push(Finding::error(
                subject(),
                Category::Literal,
                format!("malformed message ID {:?}", text),
                "Msg ID must be a 0x-prefixed hex or decimal frame identifier",
            ));
            None
        }
        None => {
            report.push(Finding::error(
                subject(),
                Category::Literal,
                "message has no ID".to_string(),
                "Msg ID must be a 0x-prefixed hex or decimal frame identifier",
            ));
            None
        }
    };

    let length = match int_cell(&filled[Column::MsgLength.index()]) {
        Some(Ok(len)) if len <= u32::MAX as u64 => Some(len as u32),
        Some(_) => {
            report.push(Finding::error(
                subject(),
                Category::Literal,
                format!(
                    "malformed message length {:?}",
                    filled[Column::MsgLength.index()].display()
                ),
                "Msg Length must be a byte count",
            ));
            None
        }
        None => {
            report.push(Finding::error(
                subject(),
                Category::Literal,
                "message has no length".to_string(),
                "Msg Length must be a byte count",
            ));
            None
        }
    };

    let (id, length) = match (id, length) {
        (Some(id), Some(length)) => (id, length),
        _ => {
            return GroupState {
                message: None,
                established,
            }
        }
    };

    let mut message = Message::new(msg_name, id, variant, length);
    message.senders.clear();
    message.receivers.clear();

    let cycle_cell = &filled[Column::CycleTime.index()];
    if !cycle_cell.is_blank() {
        match cycle_cell.number() {
            Some(n) if n >= 0.0 => message.cycle_time_ms = Some(n.round() as u32),
            _ => report.push(Finding::warning(
                subject(),
                Category::Literal,
                format!("malformed cycle time {:?}", cycle_cell.display()),
                "Msg Cycle Time must be a millisecond count",
            )),
        }
    }

    match variant {
        ProtocolVariant::Can | ProtocolVariant::CanFd => {
            open_can_group(variant, filled, &mut message, msg_name, report);
        }
        ProtocolVariant::Lin => {
            open_lin_group(filled, &mut message, msg_name, report);
        }
    }

    GroupState {
        message: Some(message),
        established,
    }
}

fn open_can_group(
    variant: ProtocolVariant,
    filled: &[Cell; COLUMN_COUNT],
    message: &mut Message,
    msg_name: &str,
    report: &mut Report,
) {
    let subject = || Subject::message(msg_name);

    match filled[Column::MsgType.index()].text() {
        Some(text) => match MessageClass::parse(text) {
            Some(class) => message.class = Some(class),
            None => report.push(Finding::error(
                subject(),
                Category::Naming,
                format!("unknown message type {:?}", text),
                "list of allowed values 'Normal', 'Diag', 'NM'",
            )),
        },
        None => report.push(Finding::error(
            subject(),
            Category::Naming,
            "message type is missing".to_string(),
            "list of allowed values 'Normal', 'Diag', 'NM'",
        )),
    }

    match filled[Column::SendType.index()].text() {
        Some(text) => match MessageSendType::parse(text) {
            Some(st) => message.send_type = Some(st),
            None => report.push(Finding::error(
                subject(),
                Category::Literal,
                format!("unknown send type {:?}", text),
                "Send Type should be 'Cycle', 'Event' or 'CE'",
            )),
        },
        None => report.push(Finding::error(
            subject(),
            Category::Literal,
            "send type is missing".to_string(),
            "Send Type should be 'Cycle', 'Event' or 'CE'",
        )),
    }

    if variant == ProtocolVariant::CanFd {
        match filled[Column::FrameFormat.index()].text() {
            Some(text) => match FrameFormat::parse(text) {
                Some(ff) => message.frame_format = Some(ff),
                None => report.push(Finding::error(
                    subject(),
                    Category::Literal,
                    format!("unknown frame format {:?}", text),
                    "Frame format should be 'StandardCAN_FD' or 'StandardCAN'",
                )),
            },
            None => report.push(Finding::error(
                subject(),
                Category::Literal,
                "frame format is missing".to_string(),
                "Frame format should be 'StandardCAN_FD' or 'StandardCAN'",
            )),
        }

        match int_cell(&filled[Column::Brs.index()]) {
            Some(Ok(v)) if v <= u8::MAX as u64 => message.brs = Some(v as u8),
            Some(_) => report.push(Finding::error(
                subject(),
                Category::Literal,
                format!(
                    "malformed BRS value {:?}",
                    filled[Column::Brs.index()].display()
                ),
                "BRS should be '1' or '0'",
            )),
            None => report.push(Finding::error(
                subject(),
                Category::Literal,
                "BRS value is missing".to_string(),
                "BRS should be '1' or '0'",
            )),
        }
    }
}

fn open_lin_group(
    filled: &[Cell; COLUMN_COUNT],
    message: &mut Message,
    msg_name: &str,
    report: &mut Report,
) {
    let subject = || Subject::message(msg_name);

    match filled[Column::SendType.index()].text() {
        Some(text) => match LinFrameType::parse(text) {
            Some(ft) => message.lin_frame_type = Some(ft),
            None => report.push(Finding::error(
                subject(),
                Category::Literal,
                format!("unknown frame type {:?}", text),
                "Send Type should be: UF (Unconditional), EF (Event), SF (Sporadic), DF (Diagnostic)",
            )),
        },
        None => report.push(Finding::error(
            subject(),
            Category::Literal,
            "frame type is missing".to_string(),
            "Send Type should be: UF (Unconditional), EF (Event), SF (Sporadic), DF (Diagnostic)",
        )),
    }

    match raw_cell(&filled[Column::ProtectedId.index()]) {
        Some(Ok(pid)) => message.protected_id = Some(pid),
        Some(Err(text)) => report.push(Finding::error(
            subject(),
            Category::Literal,
            format!("malformed protected ID {:?}", text),
            "Protected ID must be a 0x-prefixed hex or decimal value",
        )),
        None => report.push(Finding::error(
            subject(),
            Category::Literal,
            "protected ID is missing".to_string(),
            "Protected ID must be a 0x-prefixed hex or decimal value",
        )),
    }

    match filled[Column::ChecksumMode.index()].text() {
        Some(text) => match ChecksumMode::parse(text) {
            Some(mode) => message.checksum_mode = Some(mode),
            None => report.push(Finding::error(
                subject(),
                Category::Literal,
                format!("unknown checksum mode {:?}", text),
                "Checksum mode should be 'Classic' or 'Enhanced'",
            )),
        },
        None => report.push(Finding::error(
            subject(),
            Category::Literal,
            "checksum mode is missing".to_string(),
            "Checksum mode should be 'Classic' or 'Enhanced'",
        )),
    }
}

/// Later rows of a group must not contradict the established header cells.
fn check_group_consistency(
    schema: &SchemaMap,
    table: &Table,
    row: usize,
    group: &GroupState,
    msg_name: &str,
    report: &mut Report,
) {
    for (column, established) in &group.established {
        let cell = schema.cell(table, row, *column);
        if cell.is_blank() {
            continue;
        }
        if !cell_eq(cell, established) {
            report.push(Finding::error(
                Subject::message(msg_name),
                Category::Layout,
                format!(
                    "row {}: column {:?} is {:?} but the group established {:?}",
                    row + 1,
                    column.name(),
                    cell.display(),
                    established.display()
                ),
                "message-level columns must be identical across all rows of one message",
            ));
        }
    }
}

fn cell_eq(a: &Cell, b: &Cell) -> bool {
    match (a.number(), b.number()) {
        (Some(x), Some(y)) => x == y,
        _ => a.text() == b.text(),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_signal(
    variant: ProtocolVariant,
    schema: &SchemaMap,
    table: &Table,
    row: usize,
    msg_name: &str,
    signal_name: &str,
    receivers: Vec<Node>,
    report: &mut Report,
) -> Option<Signal> {
    let subject = || Subject::signal(msg_name, signal_name);

    let mut geometry = [0u32; 3];
    let geometry_cols = [
        (0, Column::StartByte, "Start Byte"),
        (1, Column::StartBit, "Start Bit"),
        (2, Column::BitLength, "Bit Length"),
    ];
    let mut complete = true;
    for (slot, column, label) in geometry_cols {
        match int_cell(schema.cell(table, row, column)) {
            Some(Ok(v)) if v <= u32::MAX as u64 => geometry[slot] = v as u32,
            Some(_) => {
                report.push(Finding::error(
                    subject(),
                    Category::Literal,
                    format!(
                        "malformed {} {:?}",
                        label,
                        schema.cell(table, row, column).display()
                    ),
                    "bit geometry must be non-negative integers",
                ));
                complete = false;
            }
            None => {
                report.push(Finding::error(
                    subject(),
                    Category::Literal,
                    format!("{} is missing", label),
                    "bit geometry must be non-negative integers",
                ));
                complete = false;
            }
        }
    }
    if !complete {
        return None;
    }

    // LIN sheets carry no byte-order column; LDF packing is little-endian.
    let byte_order = match variant {
        ProtocolVariant::Lin => ByteOrder::Intel,
        _ => match schema.cell(table, row, Column::ByteOrder).text() {
            Some(text) => match ByteOrder::parse(text) {
                Some(order) => order,
                None => {
                    report.push(Finding::error(
                        subject(),
                        Category::Literal,
                        format!("unknown byte order {:?}", text),
                        "Byte Order must be 'Intel' or 'Motorola MSB'",
                    ));
                    ByteOrder::Motorola
                }
            },
            None => {
                report.push(Finding::error(
                    subject(),
                    Category::Literal,
                    "byte order is missing".to_string(),
                    "Byte Order must be 'Intel' or 'Motorola MSB'",
                ));
                ByteOrder::Motorola
            }
        },
    };

    let mut signal = Signal::new(signal_name, geometry[0], geometry[1], geometry[2], byte_order);
    signal.receivers = receivers;
    if signal.receivers.is_empty() {
        signal.receivers.push(Node::unspecified());
    }

    if let Some(data_type) = schema.cell(table, row, Column::DataType).text() {
        signal.signed = data_type.contains("Signed");
        signal.float = data_type.contains("Float");
    }

    for (column, slot, label) in [
        (Column::Resolution, 0usize, "resolution"),
        (Column::Offset, 1, "offset"),
    ] {
        match float_cell(schema.cell(table, row, column)) {
            Some(Ok(v)) => {
                if slot == 0 {
                    signal.scale = v;
                } else {
                    signal.offset = v;
                }
            }
            Some(Err(text)) => report.push(Finding::warning(
                subject(),
                Category::Literal,
                format!("malformed {} {:?}", label, text),
                "resolution and offset must be numeric",
            )),
            None => {}
        }
    }

    for (column, label, slot) in [
        (Column::InitialValue, "initial value", 0usize),
        (Column::InvalidValue, "invalid value", 1),
        (Column::InactiveValue, "inactive value", 2),
        (Column::MinHex, "raw minimum", 3),
        (Column::MaxHex, "raw maximum", 4),
    ] {
        match raw_cell(schema.cell(table, row, column)) {
            Some(Ok(v)) => match slot {
                0 => signal.raw_initial = Some(v),
                1 => signal.raw_invalid = Some(v),
                2 => signal.raw_inactive = Some(v),
                3 => signal.min_raw = Some(v),
                _ => signal.max_raw = Some(v),
            },
            Some(Err(text)) => report.push(Finding::error(
                subject(),
                Category::Literal,
                format!("malformed {} {:?}", label, text),
                "Values should be in hex (0xXX) or decimal format",
            )),
            None => {}
        }
    }

    for (column, label, is_min) in [
        (Column::MinPhys, "physical minimum", true),
        (Column::MaxPhys, "physical maximum", false),
    ] {
        match float_cell(schema.cell(table, row, column)) {
            Some(Ok(v)) => {
                if is_min {
                    signal.min_phys = Some(v);
                } else {
                    signal.max_phys = Some(v);
                }
            }
            Some(Err(text)) => report.push(Finding::error(
                subject(),
                Category::Literal,
                format!("malformed {} {:?}", label, text),
                "physical bounds must be numeric",
            )),
            None => {}
        }
    }

    if let Some(unit) = schema.cell(table, row, Column::Unit).text() {
        signal.unit = normalize_unit(unit);
    }
    if let Some(description) = schema.cell(table, row, Column::Description).text() {
        signal.description = description.to_string();
    }

    if let Some(text) = schema.cell(table, row, Column::ValueDescription).text() {
        let parsed = vdesc::parse(text);
        for stray in &parsed.strays {
            report.push(Finding::warning(
                subject(),
                Category::Literal,
                format!("unparsed value-description fragment {:?}", stray),
                "value descriptions are 'raw: label' entries, ranges 'lo~hi: label', or ';'-separated pairs",
            ));
        }
        signal.value_descriptions = parsed.entries;
    }

    if matches!(variant, ProtocolVariant::Can | ProtocolVariant::CanFd) {
        match schema.cell(table, row, Column::SignalSendType).text() {
            Some(text) => match SignalSendType::parse(text) {
                Some(st) => signal.send_type = Some(st),
                None => report.push(Finding::error(
                    subject(),
                    Category::Literal,
                    format!("unknown signal send type {:?}", text),
                    "signal send types are Cyclic, OnWrite, OnChange, OnWriteWithRepetition, OnChangeWithRepetition, IfActive, IfActiveWithRepetition",
                )),
            },
            None => {
                if schema.col(Column::SignalSendType).is_some() {
                    report.push(Finding::error(
                        subject(),
                        Category::Literal,
                        "signal send type is missing".to_string(),
                        "signal send types are Cyclic, OnWrite, OnChange, OnWriteWithRepetition, OnChangeWithRepetition, IfActive, IfActiveWithRepetition",
                    ));
                }
            }
        }
    }

    Some(signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    fn can_table() -> Table {
        Table {
            columns: vec![
                "Msg ID\n报文标识符".into(),
                "Msg Name\n报文名称".into(),
                "Msg Type\n报文类型".into(),
                "Msg Send Type\n报文发送类型".into(),
                "Msg Cycle Time (ms)\n报文周期时间".into(),
                "Msg Length (Byte)\n报文长度".into(),
                "Signal Name\n信号名称".into(),
                "Start Byte\n起始字节".into(),
                "Start Bit\n起始位".into(),
                "Bit Length (Bit)\n信号长度".into(),
                "Byte Order\n排列格式(Intel/Motorola)".into(),
                "Data Type\n数据类型".into(),
                "Unit\n单位".into(),
                "BCM".into(),
                "EPS".into(),
            ],
            rows: vec![
                vec![
                    text("0x123"),
                    text("EngineData"),
                    text("Normal"),
                    text("Cycle"),
                    num(100.0),
                    num(8.0),
                    text("EngineSpeed"),
                    num(0.0),
                    num(0.0),
                    num(8.0),
                    text("Intel"),
                    text("Unsigned"),
                    text("rpm"),
                    text("S"),
                    text("R"),
                ],
                vec![
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                    Cell::Blank,
                    text("EngineTemp"),
                    num(1.0),
                    num(0.0),
                    num(8.0),
                    text("Intel"),
                    text("Signed"),
                    text("℃"),
                    Cell::Blank,
                    text("R"),
                ],
            ],
        }
    }

    #[test]
    fn discovers_nodes_in_column_order() {
        let table = can_table();
        let (matrix, _) = build_matrix(ProtocolVariant::Can, &table).unwrap();
        let names: Vec<_> = matrix.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["BCM", "EPS"]);
    }

    #[test]
    fn forward_fills_message_columns_and_groups_rows() {
        let table = can_table();
        let (matrix, _) = build_matrix(ProtocolVariant::Can, &table).unwrap();
        assert_eq!(matrix.messages.len(), 1);
        let message = matrix.message("EngineData").unwrap();
        assert_eq!(message.id, 0x123);
        assert_eq!(message.length, 8);
        assert_eq!(message.cycle_time_ms, Some(100));
        assert_eq!(message.signals.len(), 2);
    }

    #[test]
    fn derives_senders_and_receivers() {
        let table = can_table();
        let (matrix, _) = build_matrix(ProtocolVariant::Can, &table).unwrap();
        let message = matrix.message("EngineData").unwrap();
        assert_eq!(message.senders, vec![Node::new("BCM")]);
        assert_eq!(message.receivers, vec![Node::new("EPS")]);
        assert_eq!(message.signals[0].receivers, vec![Node::new("EPS")]);
    }

    #[test]
    fn unit_normalization_and_signedness() {
        let table = can_table();
        let (matrix, _) = build_matrix(ProtocolVariant::Can, &table).unwrap();
        let message = matrix.message("EngineData").unwrap();
        let temp = message.signal("EngineTemp").unwrap();
        assert_eq!(temp.unit, "degC");
        assert!(temp.signed);
    }

    #[test]
    fn senderless_message_gets_the_sentinel() {
        let mut table = can_table();
        // drop the S mark
        table.rows[0][13] = Cell::Blank;
        let (matrix, _) = build_matrix(ProtocolVariant::Can, &table).unwrap();
        let message = matrix.message("EngineData").unwrap();
        assert_eq!(message.senders, vec![Node::unspecified()]);
        assert!(message.senders[0].is_unspecified());
    }

    #[test]
    fn group_divergence_is_a_layout_error() {
        let mut table = can_table();
        // second row declares a different length for the same message
        table.rows[1][5] = num(64.0);
        let (_, report) = build_matrix(ProtocolVariant::Can, &table).unwrap();
        let layout: Vec<_> = report.by_category(Category::Layout).collect();
        assert_eq!(layout.len(), 1);
        assert!(layout[0].detail.contains("Msg Length"));
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let mut table = can_table();
        table.columns.remove(0);
        for row in &mut table.rows {
            row.remove(0);
        }
        let err = build_matrix(ProtocolVariant::Can, &table).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn("Msg ID")));
    }

    #[test]
    fn malformed_message_id_is_a_literal_finding_not_a_panic() {
        let mut table = can_table();
        table.rows[0][0] = text("0xZZZ");
        let (matrix, report) = build_matrix(ProtocolVariant::Can, &table).unwrap();
        assert!(matrix.messages.is_empty());
        assert!(report.by_category(Category::Literal).count() >= 1);
        assert!(!report.is_valid());
    }

    #[test]
    fn a_mixed_content_column_is_not_a_node() {
        let mut table = can_table();
        table.columns.push("Remark\n备注".into());
        table.rows[0].push(text("S"));
        table.rows[1].push(text("checked by hand"));
        let (matrix, _) = build_matrix(ProtocolVariant::Can, &table).unwrap();
        let names: Vec<_> = matrix.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["BCM", "EPS"]);
    }

    #[test]
    fn cells_deserialize_from_loose_json() {
        let table: Table = serde_json::from_value(serde_json::json!({
            "columns": ["Msg ID", "Msg Name"],
            "rows": [["0x100", "M"], [null, 7.5]]
        }))
        .unwrap();
        assert_eq!(table.rows[0][0], Cell::Text("0x100".into()));
        assert_eq!(table.rows[1][0], Cell::Blank);
        assert_eq!(table.rows[1][1], Cell::Number(7.5));
    }
}
