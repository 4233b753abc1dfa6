//! End-to-end LIN fixtures: protected-ID parity, frame typing, geometry.

use busmatrix::row::Cell;
use busmatrix::{validate_table, Category, ProtocolVariant, Severity, Table};

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

fn num(n: f64) -> Cell {
    Cell::Number(n)
}

const LIN_COLUMNS: [&str; 12] = [
    "Msg ID(hex)\n报文标识符",
    "Msg Name\n报文名称",
    "Protected ID (hex)\n保护标识符",
    "Msg Send Type\n报文发送类型",
    "Checksum mode\n校验方式",
    "Msg Length(Byte)\n报文长度",
    "Signal Name\n信号名称",
    "Start Byte\n起始字节",
    "Start Bit\n起始位",
    "Bit Length(Bit)\n信号长度",
    "LinMaster",
    "DoorModule",
];

#[allow(clippy::too_many_arguments)]
fn head_row(
    id: &str,
    name: &str,
    pid: &str,
    frame_type: &str,
    checksum: &str,
    length: f64,
    signal: &str,
    start_byte: f64,
    start_bit: f64,
    bit_length: f64,
    marks: (&str, &str),
) -> Vec<Cell> {
    vec![
        text(id),
        text(name),
        text(pid),
        text(frame_type),
        text(checksum),
        num(length),
        text(signal),
        num(start_byte),
        num(start_bit),
        num(bit_length),
        if marks.0.is_empty() { Cell::Blank } else { text(marks.0) },
        if marks.1.is_empty() { Cell::Blank } else { text(marks.1) },
    ]
}

fn lin_table(rows: Vec<Vec<Cell>>) -> Table {
    Table {
        columns: LIN_COLUMNS.iter().map(|s| s.to_string()).collect(),
        rows,
    }
}

#[test]
fn clean_lin_frame_validates() {
    let table = lin_table(vec![head_row(
        "0x17", "DoorStatus", "0x97", "UF", "Enhanced", 8.0,
        "DoorLatch", 0.0, 0.0, 8.0, ("S", "R"),
    )]);
    let (matrix, report) = validate_table(ProtocolVariant::Lin, &table).unwrap();
    assert!(report.is_valid(), "unexpected: {:?}", report.findings());
    let message = matrix.message("DoorStatus").unwrap();
    assert_eq!(message.id, 0x17);
    assert_eq!(message.protected_id, Some(0x97));
    assert_eq!(message.senders[0].name, "LinMaster");
}

#[test]
fn wrong_protected_id_reports_value_and_parity_separately() {
    // 0x57 corrupts both the whole value and the parity bits of 0x97
    let table = lin_table(vec![head_row(
        "0x17", "DoorStatus", "0x57", "UF", "Enhanced", 8.0,
        "DoorLatch", 0.0, 0.0, 8.0, ("S", "R"),
    )]);
    let (_, report) = validate_table(ProtocolVariant::Lin, &table).unwrap();
    let consistency: Vec<_> = report.by_category(Category::Consistency).collect();
    assert_eq!(consistency.len(), 2);
    assert!(consistency[0].detail.contains("0x97"));
    assert!(consistency[1].detail.contains("P0"));
    assert!(!report.is_valid());
}

#[test]
fn reserved_frame_ids_are_rejected() {
    let table = lin_table(vec![head_row(
        "0x3E", "Ghost", "0xFE", "UF", "Classic", 8.0,
        "Unused", 0.0, 0.0, 8.0, ("S", ""),
    )]);
    let (_, report) = validate_table(ProtocolVariant::Lin, &table).unwrap();
    let range: Vec<_> = report.by_category(Category::Range).collect();
    // out of the 0x00-0x3D window and inside the reserved pair
    assert_eq!(range.len(), 2);
}

#[test]
fn diagnostic_frames_are_pinned_to_their_ids_and_checksum() {
    let table = lin_table(vec![head_row(
        "0x10", "MasterReq", "0x50", "DF", "Enhanced", 8.0,
        "ReqByte0", 0.0, 0.0, 8.0, ("S", "R"),
    )]);
    let (_, report) = validate_table(ProtocolVariant::Lin, &table).unwrap();
    let consistency: Vec<_> = report.by_category(Category::Consistency).collect();
    assert!(consistency.iter().any(|f| f.detail.contains("diagnostic frame with ID")));
    assert!(consistency
        .iter()
        .any(|f| f.detail.contains("enhanced checksum")));
}

#[test]
fn unconditional_frames_stay_below_the_diagnostic_ids() {
    let table = lin_table(vec![head_row(
        "0x3C", "NotDiag", "0x3C", "UF", "Classic", 8.0,
        "Payload", 0.0, 0.0, 8.0, ("S", "R"),
    )]);
    let (_, report) = validate_table(ProtocolVariant::Lin, &table).unwrap();
    assert!(report
        .by_category(Category::Consistency)
        .any(|f| f.detail.contains("unconditional frame")));
}

#[test]
fn lin_frame_lengths_are_1_2_4_or_8() {
    let table = lin_table(vec![head_row(
        "0x20", "OddFrame", "0x20", "UF", "Classic", 3.0,
        "Payload", 0.0, 0.0, 8.0, ("S", "R"),
    )]);
    let (_, report) = validate_table(ProtocolVariant::Lin, &table).unwrap();
    assert!(report
        .by_category(Category::Range)
        .any(|f| f.expected.contains("1, 2, 4, or 8")));
}

#[test]
fn byte_straddling_signals_are_rejected() {
    let table = lin_table(vec![head_row(
        "0x21", "SwitchBank", "0x61", "UF", "Classic", 8.0,
        "Switches", 0.0, 6.0, 4.0, ("S", "R"),
    )]);
    let (_, report) = validate_table(ProtocolVariant::Lin, &table).unwrap();
    assert!(report
        .by_category(Category::Range)
        .any(|f| f.detail.contains("byte boundary")));
}

#[test]
fn sixteen_bit_signals_must_start_aligned() {
    let table = lin_table(vec![head_row(
        "0x22", "WheelSpeed", "0xE2", "UF", "Enhanced", 8.0,
        "Speed", 2.0, 0.0, 16.0, ("S", "R"),
    )]);
    let (_, report) = validate_table(ProtocolVariant::Lin, &table).unwrap();
    assert!(
        report.is_valid(),
        "aligned 16-bit signal should pass: {:?}",
        report.findings()
    );
}

#[test]
fn long_lin_names_warn_at_32() {
    let table = lin_table(vec![head_row(
        "0x23", "ThisLinFrameNameIsFarTooLongForTheBus", "0x23", "UF", "Classic", 8.0,
        "Payload", 0.0, 0.0, 8.0, ("S", "R"),
    )]);
    let (_, report) = validate_table(ProtocolVariant::Lin, &table).unwrap();
    assert!(report
        .by_category(Category::Naming)
        .any(|f| f.severity == Severity::Warning && f.detail.contains("characters")));
}

#[test]
fn min_greater_than_max_is_a_consistency_error() {
    let mut columns: Vec<String> = LIN_COLUMNS.iter().map(|s| s.to_string()).collect();
    columns.push("Signal Min. Value(phys)\n物理最小值".to_string());
    columns.push("Signal Max. Value(phys)\n物理最大值".to_string());

    let mut row = head_row(
        "0x24", "Levels", "0x24", "UF", "Classic", 8.0,
        "Level", 0.0, 0.0, 8.0, ("S", "R"),
    );
    row.extend([num(10.0), num(2.0)]);

    let table = Table { columns, rows: vec![row] };
    let (_, report) = validate_table(ProtocolVariant::Lin, &table).unwrap();
    assert!(report
        .by_category(Category::Consistency)
        .any(|f| f.detail.contains("exceeds")));
}

#[test]
fn malformed_protected_id_is_a_literal_finding() {
    let table = lin_table(vec![head_row(
        "0x17", "DoorStatus", "0xGG", "UF", "Enhanced", 8.0,
        "DoorLatch", 0.0, 0.0, 8.0, ("S", "R"),
    )]);
    let (matrix, report) = validate_table(ProtocolVariant::Lin, &table).unwrap();
    assert!(report
        .by_category(Category::Literal)
        .any(|f| f.detail.contains("0xGG")));
    // the field is treated as absent afterwards: no parity findings
    assert_eq!(report.by_category(Category::Consistency).count(), 0);
    assert_eq!(matrix.message("DoorStatus").unwrap().protected_id, None);
}
