//! Rendering a validation run: counts, exit status, text and JSON output.

use crate::issue::{Issue, Severity};
use serde::Serialize;

/// Identifier of the JSON report schema.
pub const REPORT_SCHEMA: &str = "https://ktx-rs.dev/schemas/validation-report-v1.json";

/// The outcome of one validation run.
#[derive(Debug, Default)]
pub struct ValidationReport {
    issues: Vec<Issue>,
    warnings_as_errors: bool,
}

impl ValidationReport {
    /// Empty report; `warnings_as_errors` promotes every warning when
    /// counting errors and judging validity.
    pub fn new(warnings_as_errors: bool) -> Self {
        Self {
            issues: Vec::new(),
            warnings_as_errors,
        }
    }

    /// Appends an issue.
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// All issues in the order the stages emitted them.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Number of warnings (before promotion).
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity() == Severity::Warning)
            .count()
    }

    /// Number of errors, counting promoted warnings and fatals.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| match i.severity() {
                Severity::Error | Severity::Fatal => true,
                Severity::Warning => self.warnings_as_errors,
            })
            .count()
    }

    /// True when a fatal issue ended the run early.
    pub fn has_fatal(&self) -> bool {
        self.issues.iter().any(|i| i.severity() == Severity::Fatal)
    }

    /// True when the file passed: no errors, no fatals, and no warnings
    /// if they are promoted.
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    /// Process exit code: 0 for valid, 2 for an invalid file.
    pub fn exit_code(&self) -> i32 {
        if self.is_valid() { 0 } else { 2 }
    }

    /// Text rendering: two lines per issue, then a summary line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for issue in &self.issues {
            out.push_str(&format!(
                "{}-{:04}: {}\n    {}\n",
                issue.severity(),
                issue.id(),
                issue.code.message,
                issue.details
            ));
        }
        out.push_str(&format!(
            "{} error{}, {} warning{}.\n",
            self.error_count(),
            if self.error_count() == 1 { "" } else { "s" },
            self.warning_count(),
            if self.warning_count() == 1 { "" } else { "s" },
        ));
        out
    }

    /// Pretty-printed JSON rendering.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.json_value()).expect("report serializes")
    }

    /// JSON with all optional whitespace stripped.
    pub fn to_mini_json(&self) -> String {
        serde_json::to_string(&self.json_value()).expect("report serializes")
    }

    fn json_value(&self) -> JsonReport<'_> {
        JsonReport {
            schema: REPORT_SCHEMA,
            valid: self.is_valid(),
            messages: self
                .issues
                .iter()
                .map(|issue| JsonMessage {
                    id: issue.id(),
                    kind: issue.severity().as_str(),
                    message: issue.code.message,
                    details: &issue.details,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(rename = "$schema")]
    schema: &'static str,
    valid: bool,
    messages: Vec<JsonMessage<'a>>,
}

#[derive(Serialize)]
struct JsonMessage<'a> {
    id: u16,
    #[serde(rename = "type")]
    kind: &'a str,
    message: &'a str,
    details: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::codes;

    fn report_with_issues() -> ValidationReport {
        let mut report = ValidationReport::new(false);
        report.push(Issue {
            code: &codes::UNKNOWN_FORMAT,
            details: "vkFormat is 1000123456".to_owned(),
        });
        report.push(Issue {
            code: &codes::PADDING_NOT_ZERO,
            details: "byte at offset 127 is 0xFF in the padding before the key/value data".to_owned(),
        });
        report
    }

    #[test]
    fn counts_and_exit_codes() {
        let report = report_with_issues();
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.error_count(), 1);
        assert!(!report.is_valid());
        assert_eq!(report.exit_code(), 2);

        let clean = ValidationReport::new(false);
        assert!(clean.is_valid());
        assert_eq!(clean.exit_code(), 0);
    }

    #[test]
    fn warnings_promote() {
        let mut report = ValidationReport::new(true);
        report.push(Issue {
            code: &codes::UNKNOWN_FORMAT,
            details: String::new(),
        });
        assert_eq!(report.error_count(), 1);
        assert!(!report.is_valid());
    }

    #[test]
    fn text_format_is_two_lines_per_issue() {
        let text = report_with_issues().to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("warning-3003: "));
        assert!(lines[1].starts_with("    "));
        assert!(lines[2].starts_with("error-7011: "));
        assert_eq!(lines[4], "1 error, 1 warning.");
    }

    #[test]
    fn json_carries_schema_and_messages() {
        let report = report_with_issues();
        let parsed: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(parsed["$schema"], REPORT_SCHEMA);
        assert_eq!(parsed["valid"], false);
        assert_eq!(parsed["messages"][0]["id"], 3003);
        assert_eq!(parsed["messages"][0]["type"], "warning");
        assert_eq!(parsed["messages"][1]["id"], 7011);

        let mini = report.to_mini_json();
        assert!(!mini.contains('\n'));
        assert!(!mini.contains(": "));
    }
}
