use std::fmt;

use crate::SyntaxKind;

const _: () = assert!((SyntaxKind::TOMBSTONE as u32) < u64::BITS, "SyntaxSet needs a wider word");

/// Set of [`SyntaxKind`]s packed into one word, usable in `const` recovery
/// and lookahead sets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SyntaxSet(u64);

impl SyntaxSet {
    pub const EMPTY: Self = Self(0);

    #[inline]
    const fn bit(kind: SyntaxKind) -> u64 {
        1 << kind as u32
    }

    pub const fn new<const N: usize>(kinds: [SyntaxKind; N]) -> Self {
        let mut set = Self::EMPTY;
        let mut i = 0;
        while i < N {
            set = set.with(kinds[i]);
            i += 1;
        }
        set
    }

    #[must_use]
    pub const fn with(self, kind: SyntaxKind) -> Self {
        Self(self.0 | Self::bit(kind))
    }

    #[must_use]
    pub const fn without(self, kind: SyntaxKind) -> Self {
        Self(self.0 & !Self::bit(kind))
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        self.0 & Self::bit(kind) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }
}

impl fmt::Debug for SyntaxSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyntaxSet({:#b})", self.0)
    }
}
