// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal rendering of diagnostics.
//!
//! ```text
//! error[E0611]: result not set
//!   --> util:12:5 (in `pick`)
//!    |
//! 12 |     let x = pick(a)
//!    |     ^ value expected here
//!    = note: this is a bug in the compiler, not in your code
//! ```
//!
//! Without source text for the file, the label follows the location line.

use std::collections::HashMap;

use colored::Colorize;

use kiln_ast::{FileId, Span};

use crate::{Diagnostic, Severity};

/// Renders diagnostics, resolving file ids to names and source text.
#[derive(Default)]
pub struct DiagnosticFormatter<'a> {
    names: HashMap<FileId, &'a str>,
    texts: HashMap<FileId, &'a str>,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: FileId, name: &'a str) -> Self {
        self.names.insert(file, name);
        self
    }

    pub fn with_source(mut self, file: FileId, name: &'a str, text: &'a str) -> Self {
        self.texts.insert(file, text);
        self.with_file(file, name)
    }

    pub fn format(&self, d: &Diagnostic) -> String {
        let mut out = self.header(d);
        let gutter = d.span.map_or(2, |s| s.line.to_string().len().max(2));
        let pad = " ".repeat(gutter + 1);
        let bar = "|".blue();

        let mut location = d.span.map(|s| self.location(s));
        if let Some(item) = &d.item {
            let within = format!("(in `{}`)", item);
            location = Some(match location {
                Some(loc) => format!("{} {}", loc, within.dimmed()),
                None => within.dimmed().to_string(),
            });
        }
        if let Some(loc) = location {
            out.push_str(&format!("{}{} {}\n", " ".repeat(gutter), "-->".blue(), loc));
        }

        let label = d.label.as_deref().unwrap_or("");
        match d.span.and_then(|s| self.source_line(s).map(|text| (s, text))) {
            Some((span, text)) => {
                let caret = " ".repeat(span.col.saturating_sub(1) as usize);
                out.push_str(&format!("{}{}\n", pad, bar));
                out.push_str(&format!("{:>gutter$} {} {}\n", span.line.to_string().blue(), bar, text));
                out.push_str(&format!("{}{} {}{} {}\n", pad, bar, caret, "^".red().bold(), label));
            }
            None if !label.is_empty() && d.span.is_some() => {
                out.push_str(&format!("{}{} {}\n", pad, "=".blue(), label));
            }
            None => {}
        }

        for note in &d.notes {
            out.push_str(&format!("{}{} {}: {}\n", pad, "=".blue(), "note".bold(), note));
        }
        if let Some(help) = &d.help {
            out.push_str(&format!("{}{} {}: {}\n", pad, "=".blue(), "help".bold(), help));
        }
        out
    }

    fn header(&self, d: &Diagnostic) -> String {
        let severity = match d.severity {
            Severity::Error => d.severity.as_str().red().bold(),
            Severity::Warning => d.severity.as_str().yellow().bold(),
        };
        let code = d
            .code
            .as_ref()
            .map(|c| format!("[{}]", c).bold().to_string())
            .unwrap_or_default();
        format!("{}{}: {}\n", severity, code, d.message.bold())
    }

    fn location(&self, span: Span) -> String {
        match self.names.get(&span.file) {
            Some(name) => format!("{}:{}:{}", name, span.line, span.col),
            None => span.to_string(),
        }
    }

    fn source_line(&self, span: Span) -> Option<&'a str> {
        let text = self.texts.get(&span.file)?;
        text.lines().nth(span.line.checked_sub(1)? as usize)
    }
}

/// Format a batch of diagnostics, separated by blank lines.
pub fn format_all(formatter: &DiagnosticFormatter<'_>, diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| formatter.format(d))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn excerpt_with_caret() {
        plain();
        let d = Diagnostic::error("result not set")
            .with_code("E0611")
            .at(Span::new(FileId(0), 2, 5), "value expected here")
            .in_item("pick")
            .with_note("this is a bug in the compiler");
        let f = DiagnosticFormatter::new().with_source(FileId(0), "util", "first\n    let x = pick(a)\n");
        let out = f.format(&d);
        assert!(out.starts_with("error[E0611]: result not set\n"));
        assert!(out.contains("--> util:2:5 (in `pick`)"));
        assert!(out.contains("    let x = pick(a)"));
        assert!(out.contains("    ^ value expected here"));
        assert!(out.contains("= note: this is a bug in the compiler"));
    }

    #[test]
    fn without_source_text() {
        plain();
        let d = Diagnostic::warning("procedure discarded").at(Span::new(FileId(3), 7, 1), "here");
        let out = DiagnosticFormatter::new().format(&d);
        assert!(out.starts_with("warning: procedure discarded\n"));
        assert!(out.contains("--> #3:7:1"));
        assert!(out.contains("= here"));
    }
}
