use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

use sylva_errors::Diagnostic;
use text_size::TextSize;
use triomphe::Arc;

use super::{Diagnostics, GreenElement, SubtreeDiagnostics, content_hasher, memo_hash};
use crate::{NodeFlags, NodeOrToken, SyntaxKind};

/// Terminal fact: a token with optional leading trivia.
///
/// A missing token is a zero-width terminal manufactured during error
/// recovery; it always carries at least one diagnostic.
#[derive(Clone)]
pub struct GreenToken {
    data: Arc<GreenTokenData>,
}

struct GreenTokenData {
    kind: SyntaxKind,
    flags: NodeFlags,
    width: TextSize,
    hash: AtomicU32,
    leading: Option<GreenElement>,
    diagnostics: Diagnostics,
}

impl GreenToken {
    /// Creates a present token without trivia.
    pub fn new(kind: SyntaxKind, width: TextSize) -> Self {
        Self::with_trivia(None, kind, width)
    }

    /// Creates a present token preceded by `leading` trivia.
    pub fn with_trivia(leading: Option<GreenElement>, kind: SyntaxKind, width: TextSize) -> Self {
        Self::alloc(leading, kind, width, false, Diagnostics::default())
    }

    /// Creates a missing token. Panics if `diagnostics` is empty.
    #[track_caller]
    pub fn missing(kind: SyntaxKind, diagnostics: impl IntoIterator<Item = Diagnostic>) -> Self {
        Self::missing_with_trivia(None, kind, diagnostics)
    }

    /// Creates a missing token preceded by `leading` trivia.
    #[track_caller]
    pub fn missing_with_trivia(
        leading: Option<GreenElement>,
        kind: SyntaxKind,
        diagnostics: impl IntoIterator<Item = Diagnostic>,
    ) -> Self {
        let diagnostics = Diagnostics::new(diagnostics);
        assert!(!diagnostics.is_empty(), "missing `{kind:?}` token without a diagnostic");
        Self::alloc(leading, kind, TextSize::new(0), true, diagnostics)
    }

    fn alloc(
        leading: Option<GreenElement>,
        kind: SyntaxKind,
        width: TextSize,
        is_missing: bool,
        diagnostics: Diagnostics,
    ) -> Self {
        debug_assert!(
            leading.as_ref().is_none_or(|trivia| trivia.tokens().all(|it| it.kind().is_trivia())),
            "leading trivia of `{kind:?}` holds a non-trivia token"
        );

        let mut flags = if is_missing {
            NodeFlags::CONTAINS_MISSING
        } else {
            NodeFlags::IS_NOT_MISSING
        };
        if kind == SyntaxKind::SKIPPED_TOKENS {
            flags |= NodeFlags::CONTAINS_SKIPPED_TEXT;
        }
        if !diagnostics.is_empty() {
            flags |= NodeFlags::CONTAINS_DIAGNOSTICS;
        }
        if let Some(trivia) = &leading {
            flags |= trivia.flags() & NodeFlags::FROM_TRIVIA;
        }

        let data = GreenTokenData {
            kind,
            flags,
            width,
            hash: AtomicU32::new(0),
            leading,
            diagnostics,
        };
        Self { data: Arc::new(data) }
    }

    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.data.kind
    }

    #[inline]
    pub fn flags(&self) -> NodeFlags {
        self.data.flags
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.data.flags.is_missing()
    }

    /// Width of the token text, trivia excluded.
    #[inline]
    pub fn width(&self) -> TextSize {
        self.data.width
    }

    #[inline]
    pub fn full_width(&self) -> TextSize {
        self.leading_trivia_width() + self.data.width
    }

    #[inline]
    pub fn leading_trivia(&self) -> Option<&GreenElement> {
        self.data.leading.as_ref()
    }

    #[inline]
    pub fn leading_trivia_width(&self) -> TextSize {
        self.data.leading.as_ref().map_or(TextSize::new(0), GreenElement::full_width)
    }

    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.data.diagnostics.as_slice()
    }

    /// Diagnostics of this token and its trivia, resolved against `full_start`.
    pub fn diagnostics_in_subtree(&self, full_start: TextSize) -> SubtreeDiagnostics<'_> {
        SubtreeDiagnostics::new(NodeOrToken::Token(self), full_start)
    }

    /// Returns the same token with different leading trivia.
    #[must_use]
    pub fn with_leading_trivia(&self, leading: Option<GreenElement>) -> Self {
        Self::alloc(
            leading,
            self.kind(),
            self.width(),
            self.is_missing(),
            self.data.diagnostics.clone(),
        )
    }

    /// Returns the same token, sharing its trivia, with `diagnostics`.
    ///
    /// Panics if the token is missing and `diagnostics` is empty.
    #[must_use]
    #[track_caller]
    pub fn with_diagnostics(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) -> Self {
        let diagnostics = Diagnostics::new(diagnostics);
        assert!(
            !self.is_missing() || !diagnostics.is_empty(),
            "missing `{:?}` token without a diagnostic",
            self.kind()
        );
        Self::alloc(
            self.data.leading.clone(),
            self.kind(),
            self.width(),
            self.is_missing(),
            diagnostics,
        )
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Memoized structural hash; never 0.
    pub fn content_hash(&self) -> u32 {
        let memo = self.data.hash.load(Ordering::Relaxed);
        if memo != 0 {
            return memo;
        }

        let mut hasher = content_hasher();
        self.kind().hash(&mut hasher);
        self.flags().hash(&mut hasher);
        self.width().hash(&mut hasher);
        hasher.write_u32(self.data.leading.as_ref().map_or(0, GreenElement::content_hash));

        let hash = memo_hash(hasher.finish());
        self.data.hash.store(hash, Ordering::Relaxed);
        hash
    }
}

impl PartialEq for GreenToken {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.kind() == other.kind()
                && self.flags() == other.flags()
                && self.width() == other.width()
                && self.data.leading == other.data.leading)
    }
}

impl Eq for GreenToken {}

impl Hash for GreenToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.content_hash());
    }
}

impl fmt::Debug for GreenToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("GreenToken");
        s.field("kind", &self.kind()).field("width", &self.width());
        if let Some(leading) = &self.data.leading {
            s.field("leading", leading);
        }
        if self.is_missing() {
            s.field("missing", &true);
        }
        if !self.data.diagnostics.is_empty() {
            s.field("diagnostics", &self.data.diagnostics);
        }
        s.finish()
    }
}
