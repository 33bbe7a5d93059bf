// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! JSON diagnostic output, selected with `--format json`.

use serde::Serialize;

use crate::{codes::ErrorCodeRegistry, Diagnostic, Severity};

/// Everything one command reported about one input.
#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    pub version: u32,
    pub file: String,
    /// Which command produced the report, e.g. `lower`.
    pub phase: String,
    pub success: bool,
    pub errors: usize,
    pub warnings: usize,
    pub diagnostics: Vec<JsonDiagnostic>,
}

#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Registry category of `code`, e.g. `Internal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<JsonLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// 1-based line and column.
#[derive(Debug, Serialize)]
pub struct JsonLocation {
    pub file: u32,
    pub line: u32,
    pub column: u32,
}

pub fn to_json_report(diagnostics: &[Diagnostic], file: &str, phase: &str) -> DiagnosticReport {
    let registry = ErrorCodeRegistry;
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();

    DiagnosticReport {
        version: 1,
        file: file.to_string(),
        phase: phase.to_string(),
        success: errors == 0,
        errors,
        warnings: diagnostics.len() - errors,
        diagnostics: diagnostics.iter().map(|d| convert(d, &registry)).collect(),
    }
}

fn convert(d: &Diagnostic, registry: &ErrorCodeRegistry) -> JsonDiagnostic {
    JsonDiagnostic {
        severity: d.severity,
        code: d.code.clone(),
        category: d
            .code
            .as_deref()
            .and_then(|c| registry.get(c))
            .map(|info| info.category.to_string()),
        message: d.message.clone(),
        item: d.item.clone(),
        location: d.span.map(|s| JsonLocation {
            file: s.file.0,
            line: s.line,
            column: s.col,
        }),
        label: d.label.clone(),
        notes: d.notes.clone(),
        help: d.help.clone(),
    }
}

pub fn report_to_string(report: &DiagnosticReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ast::{FileId, Span};

    #[test]
    fn report_counts_and_categories() {
        let diags = vec![
            Diagnostic::error("result not set")
                .with_code("E0611")
                .at(Span::new(FileId(1), 4, 2), "here")
                .in_item("pick"),
            Diagnostic::warning("procedure discarded"),
        ];
        let report = to_json_report(&diags, "main.json", "lower");
        assert!(!report.success);
        assert_eq!(report.errors, 1);
        assert_eq!(report.warnings, 1);
        let first = &report.diagnostics[0];
        assert_eq!(first.category.as_deref(), Some("Internal"));
        assert_eq!(first.location.as_ref().map(|l| l.line), Some(4));

        let text = report_to_string(&report);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["diagnostics"][0]["code"], "E0611");
        assert_eq!(value["diagnostics"][0]["severity"], "error");
        assert_eq!(value["diagnostics"][0]["item"], "pick");
        assert!(value["diagnostics"][1].get("code").is_none());
    }
}
