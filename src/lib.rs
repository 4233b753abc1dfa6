//! # busmatrix — Bus-Matrix Signal Models and Protocol Rules
//!
//! Turns row-oriented CAN/CAN-FD/LIN matrix data into validated, bit-exact
//! message/signal models, and enforces the numeric, positional and naming
//! rules the bus standards impose.
//!
//! ## Pipeline
//!
//! - **Rows**: an ingestion collaborator delivers a [`row::Table`] (headers
//!   plus loosely-typed cells). [`row::build_matrix`] discovers the node
//!   columns, folds row groups into messages and produces a typed
//!   [`model::Matrix`] plus build findings.
//! - **Codec**: [`codec`] parses raw literals and does the linear
//!   raw/physical conversion; [`vdesc`] parses value-description cells
//!   (best-effort, total).
//! - **Layout**: [`layout`] resolves each signal's bit interval across both
//!   byte orders, finds overlaps, and can pack raw values into a frame
//!   image.
//! - **Rules**: [`rules`] holds the per-protocol legality tables
//!   (ID ranges, send types, CAN-FD format/BRS coupling, LIN protected-ID
//!   parity, ...).
//! - **Report**: [`validate::Validator`] runs the rules and aggregates an
//!   ordered [`report::Report`]; `is_valid()` means no errors (warnings
//!   permitted).
//! - **Reconciliation**: [`diff`] compares two canonical models for
//!   round-trip equality.
//!
//! Everything a sheet author could get wrong becomes a [`report::Finding`];
//! the only hard failure is a missing required column
//! ([`row::SchemaError`]).
//!
//! ## Example
//!
//! ```no_run
//! use busmatrix::{validate_table, ProtocolVariant, Table};
//!
//! let table: Table = serde_json::from_str(r#"{"columns": [], "rows": []}"#)?;
//! let (matrix, report) = validate_table(ProtocolVariant::Can, &table)?;
//! for finding in report.findings() {
//!     println!("{}", finding);
//! }
//! println!("valid: {}", report.is_valid());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
pub mod diff;
pub mod layout;
pub mod model;
pub mod report;
pub mod row;
pub mod rules;
pub mod validate;
pub mod vdesc;

pub use model::{
    ByteOrder, Matrix, Message, MessageClass, MessageSendType, Node, ProtocolVariant, Signal,
    SignalSendType, ValueDescription,
};
pub use report::{Category, Finding, Report, Severity, Subject};
pub use row::{build_matrix, Cell, SchemaError, Table};
pub use validate::{validate_table, Validator};
