// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Error code registry for the lowering stage.
//!
//! Codes live in `E06xx`: `E060x` unsupported, `E061x` internal,
//! `E062x` restrictions. Used by `kiln explain <code>` and by the JSON
//! report.

use std::fmt;

use ErrorCategory::{Internal, Restriction, Unsupported};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No lowering exists for the construct
    Unsupported,
    /// The front end or the lowering engine broke a contract
    Internal,
    /// Not allowed at this stage; the user can work around it
    Restriction,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
pub struct ErrorCodeInfo {
    pub code: &'static str,
    pub title: &'static str,
    pub category: ErrorCategory,
}

const fn info(code: &'static str, title: &'static str, category: ErrorCategory) -> ErrorCodeInfo {
    ErrorCodeInfo { code, title, category }
}

static CODES: [ErrorCodeInfo; 12] = [
    info("E0601", "unsupported construct", Unsupported),
    info("E0602", "unsupported built-in operation", Unsupported),
    info("E0610", "unresolved break target", Internal),
    info("E0611", "result not set", Internal),
    info("E0612", "missing descriptor", Internal),
    info("E0613", "temporary outlives its scope", Internal),
    info("E0614", "label never placed", Internal),
    info("E0615", "label placed twice", Internal),
    info("E0619", "internal lowering error", Internal),
    info("E0620", "layout query on incomplete type", Restriction),
    info("E0621", "dynamic dispatch needs static resolution", Restriction),
    info("E0622", "missing runtime routine", Restriction),
];

/// Lookup table over every code lowering can report.
#[derive(Default)]
pub struct ErrorCodeRegistry;

impl ErrorCodeRegistry {
    pub fn get(&self, code: &str) -> Option<&'static ErrorCodeInfo> {
        CODES.iter().find(|i| i.code == code)
    }

    pub fn all(&self) -> impl Iterator<Item = &'static ErrorCodeInfo> {
        CODES.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        let reg = ErrorCodeRegistry;
        let info = reg.get("E0611").unwrap();
        assert_eq!(info.title, "result not set");
        assert_eq!(info.category, ErrorCategory::Internal);
        assert!(reg.get("E9999").is_none());
    }

    #[test]
    fn ranges_match_categories() {
        for i in ErrorCodeRegistry.all() {
            let expected = match &i.code[..4] {
                "E060" => ErrorCategory::Unsupported,
                "E061" => ErrorCategory::Internal,
                _ => ErrorCategory::Restriction,
            };
            assert_eq!(i.category, expected, "{}", i.code);
        }
    }
}
