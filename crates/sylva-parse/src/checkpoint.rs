use bitflags::bitflags;
use sylva_syntax::GreenElement;

bitflags! {
    /// Grammar context the parser is currently in.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ContextFlags: u8 {
        const IN_FUNCTION = 1 << 0;
        const IN_LOOP = 1 << 1;
        const IN_CONDITION = 1 << 2;
        /// Inside a production that may still be rolled back.
        const SPECULATING = 1 << 3;
    }
}

/// Context flags plus how many contexts deep the parser is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ParseContext {
    flags: ContextFlags,
    depth: u16,
}

impl ParseContext {
    #[inline]
    pub fn flags(self) -> ContextFlags {
        self.flags
    }

    #[inline]
    pub fn depth(self) -> u16 {
        self.depth
    }

    #[inline]
    pub fn contains(self, flags: ContextFlags) -> bool {
        self.flags.contains(flags)
    }

    /// The context one level deeper with `flags` added.
    #[must_use]
    pub fn enter(self, flags: ContextFlags) -> Self {
        Self { flags: self.flags | flags, depth: self.depth.saturating_add(1) }
    }
}

/// Output the parser has produced but not yet wrapped into a node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pending {
    /// Number of completed children on the parser's stack.
    pub(crate) children: usize,
    /// Write stamp of the most recent write to that stack.
    pub(crate) stamp: u64,
    /// Skipped text waiting to become trivia of the next token.
    pub(crate) skipped: Vec<GreenElement>,
}

/// Immutable snapshot of parser and lexer state.
///
/// Handing the same checkpoint back to the parser any number of times
/// resumes at exactly the same place: the lexer snapshot, the context and
/// the parser's pending output are all part of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint<L> {
    context: ParseContext,
    lexer: L,
    offset: u32,
    pending: Pending,
}

impl<L> Checkpoint<L> {
    /// Bundles a context, a lexer snapshot and the token offset it was taken
    /// at.
    pub fn capture(context: ParseContext, lexer: L, offset: u32) -> Self {
        Self { context, lexer, offset, pending: Pending::default() }
    }

    #[must_use]
    pub(crate) fn with_pending(mut self, pending: Pending) -> Self {
        self.pending = pending;
        self
    }

    #[inline]
    pub fn context(&self) -> ParseContext {
        self.context
    }

    #[inline]
    pub fn lexer(&self) -> &L {
        &self.lexer
    }

    /// Number of tokens consumed when the checkpoint was captured.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    pub(crate) fn pending(&self) -> &Pending {
        &self.pending
    }
}
