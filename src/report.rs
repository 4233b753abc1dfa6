//! Validation findings: severity, category, subject, and the ordered report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// Which family of rule produced the finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Unparseable numeric literal or value-description fragment.
    Literal,
    /// Disallowed characters, length violations, name/classification mismatch.
    Naming,
    /// Message ID, frame length, signal bit length or position outside legal bounds.
    Range,
    /// Bit-interval overlap, signal exceeding the frame, group inconsistency.
    Layout,
    /// Cross-field consistency: bounds vs scale/offset, send-type coupling,
    /// BRS/frame-format/length coupling, protected-ID mismatches.
    Consistency,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Literal,
        Category::Naming,
        Category::Range,
        Category::Layout,
        Category::Consistency,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Category::Literal => "literal",
            Category::Naming => "naming",
            Category::Range => "range",
            Category::Layout => "layout",
            Category::Consistency => "consistency",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.id() == id)
    }
}

/// What a finding is about: a whole message or one signal within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    Message(String),
    Signal { message: String, name: String },
}

impl Subject {
    pub fn message(name: impl Into<String>) -> Self {
        Subject::Message(name.into())
    }

    pub fn signal(message: impl Into<String>, name: impl Into<String>) -> Self {
        Subject::Signal {
            message: message.into(),
            name: name.into(),
        }
    }

    /// Name of the owning message, for either subject kind.
    pub fn message_name(&self) -> &str {
        match self {
            Subject::Message(m) => m,
            Subject::Signal { message, .. } => message,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Message(m) => write!(f, "{}", m),
            Subject::Signal { message, name } => write!(f, "{}/{}", message, name),
        }
    }
}

/// A single reported defect. `expected` carries the human rule text
/// ("Msg ID must be in the range 0x001 to 0x7FF"), `detail` the observed data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub subject: Subject,
    pub category: Category,
    pub detail: String,
    pub expected: String,
}

impl Finding {
    pub fn error(
        subject: Subject,
        category: Category,
        detail: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Finding {
            severity: Severity::Error,
            subject,
            category,
            detail: detail.into(),
            expected: expected.into(),
        }
    }

    pub fn warning(
        subject: Subject,
        category: Category,
        detail: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Finding {
            severity: Severity::Warning,
            subject,
            category,
            detail: detail.into(),
            expected: expected.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{}: {}: {} [{}]",
            self.subject,
            severity,
            self.detail,
            self.category.id()
        )
    }
}

/// Ordered, append-only collection of findings for one validation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    findings: Vec<Finding>,
}

impl Report {
    pub fn new() -> Self {
        Report::default()
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    pub fn merge(&mut self, other: Report) {
        self.findings.extend(other.findings);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// A matrix is valid when no error-level finding is present; warnings are permitted.
    pub fn is_valid(&self) -> bool {
        !self
            .findings
            .iter()
            .any(|f| f.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(move |f| f.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_validity_tracks_errors_only() {
        let mut report = Report::new();
        assert!(report.is_valid());
        report.push(Finding::warning(
            Subject::message("MsgA"),
            Category::Naming,
            "name is 70 characters long",
            "names should stay within 64 characters",
        ));
        assert!(report.is_valid());
        report.push(Finding::error(
            Subject::signal("MsgA", "SigB"),
            Category::Layout,
            "overlaps SigC at bit 4",
            "signal bit intervals must not overlap",
        ));
        assert!(!report.is_valid());
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.by_category(Category::Layout).count(), 1);
    }

    #[test]
    fn category_ids_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::from_id(c.id()), Some(c));
        }
        assert_eq!(Category::from_id("nonsense"), None);
    }

    #[test]
    fn subject_display() {
        assert_eq!(Subject::message("M").to_string(), "M");
        assert_eq!(Subject::signal("M", "S").to_string(), "M/S");
    }
}
