//! Validation orchestrator: runs the protocol rule tables over a built
//! matrix and collects one ordered report.
//!
//! Messages are validated independently of each other (the model is
//! immutable and rules share no state), so a caller may fan message
//! validation out across threads; within one message, overlap detection
//! works on that message's own signal set. Single categories can be run in
//! isolation for interactive, incremental use.

use crate::model::{Matrix, ProtocolVariant};
use crate::report::{Category, Report};
use crate::row::{self, SchemaError, Table};
use crate::rules::{self, RuleTable};
use tracing::{debug, trace};

pub struct Validator<'a> {
    matrix: &'a Matrix,
    table: &'static RuleTable,
}

impl<'a> Validator<'a> {
    pub fn new(matrix: &'a Matrix) -> Self {
        Validator {
            matrix,
            table: rules::rules_for(matrix.variant),
        }
    }

    /// Runs the rules of one category over every message.
    pub fn run(&self, category: Category) -> Report {
        let mut report = Report::new();
        for message in &self.matrix.messages {
            debug!(message = %message.name, category = category.id(), "validating");
            for rule in self.table.rules(category) {
                let findings = rule(message);
                for finding in &findings {
                    trace!(%finding, "finding");
                }
                report.extend(findings);
            }
        }
        report
    }

    /// Runs every category, in taxonomy order.
    pub fn run_all(&self) -> Report {
        let mut report = Report::new();
        for category in Category::ALL {
            report.merge(self.run(category));
        }
        report
    }
}

/// Builds the model from rows and validates it in one step. The returned
/// report holds the build findings followed by the rule findings; the only
/// error is a fatal input-schema defect.
pub fn validate_table(
    variant: ProtocolVariant,
    table: &Table,
) -> Result<(Matrix, Report), SchemaError> {
    let (matrix, mut report) = row::build_matrix(variant, table)?;
    report.merge(Validator::new(&matrix).run_all());
    Ok((matrix, report))
}
