// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Lowering configuration.

use serde::Deserialize;

/// Which calls get the checked (exception-propagating) form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallChecking {
    /// No call is checked; exceptions are not routed
    Off,
    /// Checked when the callee is declared or inferred to raise
    Precise,
    /// Checked unless the callee carries a known-safe marker
    #[default]
    Conservative,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LowerConfig {
    /// Width of the target's native integer.
    pub int_bits: u8,
    pub call_checking: CallChecking,
    /// Precede each statement with a `SourceLoc` marker.
    pub emit_source_locations: bool,
    /// Worker threads for procedure lowering; `None` uses all cores.
    pub jobs: Option<usize>,
}

impl Default for LowerConfig {
    fn default() -> Self {
        Self {
            int_bits: 64,
            call_checking: CallChecking::Conservative,
            emit_source_locations: true,
            jobs: None,
        }
    }
}

impl LowerConfig {
    pub fn jobs(&self) -> usize {
        self.jobs
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: LowerConfig =
            serde_json::from_str(r#"{"call_checking": "precise", "jobs": 2}"#).unwrap();
        assert_eq!(cfg.call_checking, CallChecking::Precise);
        assert_eq!(cfg.int_bits, 64);
        assert!(cfg.emit_source_locations);
        assert_eq!(cfg.jobs(), 2);
    }

    #[test]
    fn zero_jobs_means_one() {
        let cfg = LowerConfig {
            jobs: Some(0),
            ..LowerConfig::default()
        };
        assert_eq!(cfg.jobs(), 1);
    }
}
