// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Built-in ("magic") operation tags.
//!
//! A magic is attached to a routine symbol by the front end, or referenced
//! directly through `NodeKind::Builtin` by synthesized code.

macro_rules! magics {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Magic {
            $($(#[$doc])* $name,)*
        }

        impl Magic {
            /// Every tag, in declaration order.
            pub const ALL: &'static [Magic] = &[$(Magic::$name,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Magic::$name => stringify!($name),)*
                }
            }
        }
    };
}

magics! {
    // Integer arithmetic
    AddI, SubI, MulI, DivI, ModI,
    AddU, SubU, MulU, DivU, ModU,
    AddF, SubF, MulF, DivF,
    ShlI, ShrI, AshrI, BitandI, BitorI, BitxorI,
    // Comparisons
    EqI, LeI, LtI, EqU, LeU, LtU, EqF, LeF, LtF,
    EqB, LeB, LtB, EqCh, LeCh, LtCh,
    EqEnum, LeEnum, LtEnum, EqRef, EqProc,
    Xor,
    // Unary
    UnaryMinusI, UnaryMinusF, BitnotI, Not, UnaryPlus,
    // Conversions
    Ord, Chr, ToFloat, ToInt, ToU8, ToU16, ToU32,
    Addr,
    /// Short-circuit `and`
    And,
    /// Short-circuit `or`
    Or,
    // Runtime-backed operations
    IntToStr, FloatToStr, BoolToStr, CharToStr, CStrToStr,
    LengthStr, LengthSeq, ConStrStr,
    AppendStrCh, AppendStrStr, AppendSeqElem,
    SetLengthStr, SetLengthSeq, NewSeq,
    EqStr, LeStr, LtStr,
    Echo, New, Quit, IsNil,
    // Expressed through other constructs
    High, Low, LengthArray, Inc, Dec, Succ, Pred,
    EnumToStr, Swap, GetCurrentException, StrToStr,
    // Need complete layouts
    SizeOf, AlignOf, OffsetOf,
    // Reflection and meta-programming
    TypeTrait, GetTypeInfo, Compiles, Defined, DeclaredInScope, AstToStr, Quote, NimNodeOp,
    // Set operations
    Incl, Excl, Card, InSet, PlusSet, MinusSet, MulSet, EqSet, LeSet, LtSet,
    // Pointer/integer reinterpretation
    PtrToInt, IntToPtr,
    /// Defaulted destructor with no body
    Destroy,
    /// Documentation-only code block
    RunnableExamples,
}

impl std::fmt::Display for Magic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_complete_and_named() {
        assert_eq!(Magic::ALL.first(), Some(&Magic::AddI));
        assert_eq!(Magic::ALL.last(), Some(&Magic::RunnableExamples));
        assert_eq!(Magic::Swap.name(), "Swap");
        let mut seen = std::collections::HashSet::new();
        for m in Magic::ALL {
            assert!(seen.insert(*m), "duplicate tag {}", m);
        }
    }
}
