// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Command implementations.

pub mod explain;
pub mod lower;
pub mod run;

use std::fs;
use std::path::Path;

use kiln_ast::Program;
use kiln_diagnostics::formatter::{format_all, DiagnosticFormatter};
use kiln_diagnostics::json::{report_to_string, to_json_report};
use kiln_diagnostics::{has_errors, Diagnostic};
use kiln_lower::{CallChecking, LowerConfig};

use crate::{output, Checking, Format, LowerOpts};

pub fn load_program(path: &Path) -> Result<Program, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", output::path(path), e))?;
    let program: Program = serde_json::from_str(&text)
        .map_err(|e| format!("{} is not a typed program: {}", path.display(), e))?;
    log::debug!(
        "loaded {} modules, {} symbols from {}",
        program.modules.len(),
        program.symbols.len(),
        path.display()
    );
    Ok(program)
}

/// Config file first, then command-line overrides.
pub fn load_config(opts: &LowerOpts) -> Result<LowerConfig, String> {
    let mut config = match &opts.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("invalid config {}: {}", path.display(), e))?
        }
        None => LowerConfig::default(),
    };
    if let Some(checking) = opts.checking {
        config.call_checking = match checking {
            Checking::Off => CallChecking::Off,
            Checking::Precise => CallChecking::Precise,
            Checking::Conservative => CallChecking::Conservative,
        };
    }
    if opts.jobs.is_some() {
        config.jobs = opts.jobs;
    }
    if opts.no_source_locations {
        config.emit_source_locations = false;
    }
    log::debug!("lowering config: {:?}", config);
    Ok(config)
}

/// Print diagnostics to stderr. Returns true if any is an error.
pub fn show_diagnostics(diagnostics: &[Diagnostic], file: &str, format: Format) -> bool {
    let failed = has_errors(diagnostics);
    match format {
        Format::Json => {
            let report = to_json_report(diagnostics, file, "lower");
            eprintln!("{}", report_to_string(&report));
        }
        Format::Human => {
            if !diagnostics.is_empty() {
                let formatter = DiagnosticFormatter::new();
                eprint!("{}", format_all(&formatter, diagnostics));
            }
            let errors = diagnostics.iter().filter(|d| d.is_error()).count();
            eprintln!("{}", output::summary(errors, diagnostics.len() - errors));
        }
    }
    failed
}

pub fn fail(msg: &str) -> i32 {
    eprintln!("{}: {}", output::error_label(), msg);
    1
}
