// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Styling for the CLI's own messages. Honors NO_COLOR and FORCE_COLOR.

use std::path::Path;

use colored::{ColoredString, Colorize};

pub fn init() {
    let set = |var: &str| std::env::var_os(var).is_some();
    match (set("NO_COLOR"), set("FORCE_COLOR")) {
        (true, _) => colored::control::set_override(false),
        (false, true) => colored::control::set_override(true),
        (false, false) => {}
    }
}

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn path(p: &Path) -> ColoredString {
    p.display().to_string().cyan()
}

/// One-line outcome of a lowering run.
pub fn summary(discarded: usize, warnings: usize) -> String {
    let plural = |n: usize| if n == 1 { "" } else { "s" };
    if discarded == 0 {
        let mut line = "lowered".green().bold().to_string();
        if warnings > 0 {
            line.push_str(&format!(" with {} warning{}", warnings, plural(warnings)));
        }
        return line;
    }
    format!(
        "{} {} item{} discarded",
        "lowering failed:".red().bold(),
        discarded,
        plural(discarded)
    )
}
