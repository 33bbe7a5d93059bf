// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! TreeBuilder - append-only instruction sequence under construction.

use indexmap::IndexSet;

use crate::{Instr, LabelId};

#[derive(Debug, Default)]
pub struct TreeBuilder {
    body: Vec<Instr>,
    placed: IndexSet<LabelId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instr: Instr) {
        self.body.push(instr);
    }

    /// Place a label marker. Returns false if the label was already placed.
    pub fn place(&mut self, label: LabelId) -> bool {
        if !self.placed.insert(label) {
            return false;
        }
        self.body.push(Instr::Label(label));
        true
    }

    /// Place a loop head marker. Returns false if the label was already placed.
    pub fn place_loop(&mut self, label: LabelId) -> bool {
        if !self.placed.insert(label) {
            return false;
        }
        self.body.push(Instr::LoopLabel(label));
        true
    }

    pub fn finish(self) -> Vec<Instr> {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_placement_is_refused() {
        let mut b = TreeBuilder::new();
        assert!(b.place(LabelId(0)));
        assert!(!b.place(LabelId(0)));
        assert!(!b.place_loop(LabelId(0)));
        b.push(Instr::Goto(LabelId(0)));
        let body = b.finish();
        assert_eq!(body.len(), 2);
        assert!(body[1].is_jump());
    }
}
