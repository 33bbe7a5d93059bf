// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The `run` command: lower everything, then interpret.

use std::path::Path;

use kiln_diagnostics::Diagnostic;
use kiln_interp::{InterpError, Machine};

use super::{fail, load_config, load_program, show_diagnostics};
use crate::LowerOpts;

pub fn cmd_run(input: &Path, opts: &LowerOpts, module: &str, entry: Option<&str>) -> i32 {
    let program = match load_program(input) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let config = match load_config(opts) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let modules = kiln_lower::lower_program(&program, &config, &mut diagnostics);
    if !diagnostics.is_empty()
        && show_diagnostics(&diagnostics, &input.display().to_string(), opts.format)
    {
        return 1;
    }

    let mut machine = Machine::new(modules);
    let result = machine.run(module, entry);
    print!("{}", machine.output());

    match result {
        Ok(value) => {
            log::debug!("{} returned {}", entry.unwrap_or(module), value);
            machine.exit_code().map_or(0, |code| code as i32)
        }
        Err(InterpError::Unhandled(name)) => fail(&format!("unhandled exception: {}", name)),
        Err(e) => fail(&e.to_string()),
    }
}
