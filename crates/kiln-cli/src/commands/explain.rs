// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The `explain` command.

use colored::Colorize;
use kiln_diagnostics::codes::ErrorCodeRegistry;

use super::fail;

pub fn cmd_explain(code: &str) -> i32 {
    let registry = ErrorCodeRegistry;
    let code = code.to_uppercase();
    let Some(info) = registry.get(&code) else {
        return fail(&format!("unknown error code '{}'", code));
    };
    println!("{} {}", info.code.bold(), info.title);
    println!("  category: {}", info.category);
    0
}
