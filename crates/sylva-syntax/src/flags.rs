//! Bit flags carried by every fact node.

bitflags::bitflags! {
    /// Summary bits of a fact node and, for the inheritable ones, its subtree.
    ///
    /// A composite carries the bitwise-OR of its children's inheritable bits,
    /// plus `CONTAINS_DIAGNOSTICS` when it owns diagnostics itself.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct NodeFlags: u8 {
        const CONTAINS_DIAGNOSTICS = 1 << 0;
        const CONTAINS_SKIPPED_TEXT = 1 << 1;
        /// Some terminal in the subtree is missing.
        const CONTAINS_MISSING = 1 << 2;
        /// Some terminal in the subtree is present. Its absence means the
        /// whole subtree is missing.
        const IS_NOT_MISSING = 1 << 3;
    }
}

impl NodeFlags {
    /// Bits a composite takes over from its children.
    pub const INHERITABLE: Self = Self::CONTAINS_DIAGNOSTICS
        .union(Self::CONTAINS_SKIPPED_TEXT)
        .union(Self::CONTAINS_MISSING)
        .union(Self::IS_NOT_MISSING);

    /// Bits a terminal takes over from its leading trivia. Trivia never turns a
    /// missing terminal into a present one.
    pub(crate) const FROM_TRIVIA: Self = Self::INHERITABLE.difference(Self::IS_NOT_MISSING);

    #[inline]
    pub fn is_missing(self) -> bool {
        !self.contains(Self::IS_NOT_MISSING)
    }

    #[inline]
    pub fn contains_diagnostics(self) -> bool {
        self.contains(Self::CONTAINS_DIAGNOSTICS)
    }

    #[inline]
    pub fn contains_skipped_text(self) -> bool {
        self.contains(Self::CONTAINS_SKIPPED_TEXT)
    }

    #[inline]
    pub(crate) fn inherited(self) -> Self {
        self.intersection(Self::INHERITABLE)
    }
}
