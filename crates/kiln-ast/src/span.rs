// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Source location tracking.

/// A source file known to the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileId(pub u32);

/// A resolved position in the source code. Line and column are 1-based;
/// 0 means "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub file: FileId,
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub fn new(file: FileId, line: u32, col: u32) -> Self {
        Self { file, line, col }
    }

    /// Span for synthesized nodes with no source counterpart.
    pub const fn unknown() -> Self {
        Self { file: FileId(0), line: 0, col: 0 }
    }

    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}:{}:{}", self.file.0, self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_span() {
        assert!(Span::unknown().is_unknown());
        assert!(!Span::new(FileId(1), 3, 7).is_unknown());
    }

    #[test]
    fn display() {
        assert_eq!(Span::new(FileId(2), 10, 4).to_string(), "#2:10:4");
    }
}
