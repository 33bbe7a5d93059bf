// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The `lower` command.

use std::path::Path;

use kiln_diagnostics::Diagnostic;
use kiln_ir::IrModule;

use super::{fail, load_config, load_program, show_diagnostics};
use crate::{Format, LowerOpts};

pub fn cmd_lower(input: &Path, opts: &LowerOpts, module: Option<&str>) -> i32 {
    let program = match load_program(input) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let config = match load_config(opts) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let modules: Vec<IrModule> = match module {
        Some(path) => {
            let Some(m) = program.modules.iter().find(|m| m.path == path) else {
                return fail(&format!("no module named '{}'", path));
            };
            match kiln_lower::lower_module(&program, m.id, &config, &mut diagnostics) {
                Ok(ir) => vec![ir],
                Err(e) => return fail(&e.to_string()),
            }
        }
        None => kiln_lower::lower_program(&program, &config, &mut diagnostics),
    };

    match opts.format {
        Format::Human => {
            for ir in &modules {
                print!("{}", ir);
            }
        }
        Format::Json => match serde_json::to_string_pretty(&modules) {
            Ok(json) => println!("{}", json),
            Err(e) => return fail(&format!("cannot serialize IR: {}", e)),
        },
    }

    let failed = show_diagnostics(&diagnostics, &input.display().to_string(), opts.format);
    if failed {
        1
    } else {
        0
    }
}
