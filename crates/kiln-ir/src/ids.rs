// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Index types shared by the IR and its producers.

macro_rules! id_type {
    ($($(#[$doc:meta])* $name:ident => $prefix:literal),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
            pub struct $name(pub u32);

            impl $name {
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}{}", $prefix, self.0)
                }
            }
        )*
    };
}

id_type! {
    /// Branch target within one procedure
    LabelId => "L",
    /// Storage slot within one procedure
    SlotId => "_",
    /// Canonical IR type
    IrTypeId => "t",
    /// Interned string
    StrId => "s",
    /// Interned integer
    IntId => "i",
    /// Packed source location
    LocId => "@",
}
