use sylva_errors::Diagnostic;
use text_size::TextSize;

use super::{GreenNode, GreenToken, SubtreeDiagnostics};
use crate::{NodeFlags, NodeOrToken, SyntaxKind};

/// Any fact node: a composite or a terminal.
pub type GreenElement = NodeOrToken<GreenNode, GreenToken>;

/// Borrowed [`GreenElement`].
pub type GreenElementRef<'a> = NodeOrToken<&'a GreenNode, &'a GreenToken>;

impl From<GreenNode> for GreenElement {
    #[inline]
    fn from(node: GreenNode) -> Self {
        NodeOrToken::Node(node)
    }
}

impl From<GreenToken> for GreenElement {
    #[inline]
    fn from(token: GreenToken) -> Self {
        NodeOrToken::Token(token)
    }
}

impl<'a> GreenElementRef<'a> {
    #[inline]
    pub fn kind(self) -> SyntaxKind {
        match self {
            NodeOrToken::Node(node) => node.kind(),
            NodeOrToken::Token(token) => token.kind(),
        }
    }

    #[inline]
    pub fn flags(self) -> NodeFlags {
        match self {
            NodeOrToken::Node(node) => node.flags(),
            NodeOrToken::Token(token) => token.flags(),
        }
    }

    #[inline]
    pub fn full_width(self) -> TextSize {
        match self {
            NodeOrToken::Node(node) => node.full_width(),
            NodeOrToken::Token(token) => token.full_width(),
        }
    }

    #[inline]
    pub fn width(self) -> TextSize {
        match self {
            NodeOrToken::Node(node) => node.width(),
            NodeOrToken::Token(token) => token.width(),
        }
    }

    #[inline]
    pub fn leading_trivia_width(self) -> TextSize {
        match self {
            NodeOrToken::Node(node) => node.leading_trivia_width(),
            NodeOrToken::Token(token) => token.leading_trivia_width(),
        }
    }

    #[inline]
    pub fn diagnostics(self) -> &'a [Diagnostic] {
        match self {
            NodeOrToken::Node(node) => node.diagnostics(),
            NodeOrToken::Token(token) => token.diagnostics(),
        }
    }

    pub fn first_token(self) -> Option<&'a GreenToken> {
        match self {
            NodeOrToken::Node(node) => node.first_token(),
            NodeOrToken::Token(token) => Some(token),
        }
    }

    pub fn last_token(self) -> Option<&'a GreenToken> {
        match self {
            NodeOrToken::Node(node) => node.last_token(),
            NodeOrToken::Token(token) => Some(token),
        }
    }
}

impl GreenElement {
    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.as_ref().kind()
    }

    #[inline]
    pub fn flags(&self) -> NodeFlags {
        self.as_ref().flags()
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.flags().is_missing()
    }

    #[inline]
    pub fn full_width(&self) -> TextSize {
        self.as_ref().full_width()
    }

    #[inline]
    pub fn width(&self) -> TextSize {
        self.as_ref().width()
    }

    #[inline]
    pub fn leading_trivia_width(&self) -> TextSize {
        self.as_ref().leading_trivia_width()
    }

    /// Number of child slots; 0 for terminals.
    #[inline]
    pub fn count(&self) -> usize {
        match self {
            NodeOrToken::Node(node) => node.count(),
            NodeOrToken::Token(_) => 0,
        }
    }

    /// Child in slot `index` of a composite.
    ///
    /// Terminals have no children; asking one for a child panics.
    #[track_caller]
    pub fn child_at(&self, index: usize) -> Option<&GreenElement> {
        match self {
            NodeOrToken::Node(node) => node.child_at(index),
            NodeOrToken::Token(token) => {
                panic!("`{:?}` is a terminal and has no children", token.kind())
            }
        }
    }

    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.as_ref().diagnostics()
    }

    pub fn diagnostics_in_subtree(&self, full_start: TextSize) -> SubtreeDiagnostics<'_> {
        SubtreeDiagnostics::new(self.as_ref(), full_start)
    }

    pub fn first_token(&self) -> Option<&GreenToken> {
        self.as_ref().first_token()
    }

    pub fn last_token(&self) -> Option<&GreenToken> {
        self.as_ref().last_token()
    }

    /// Every terminal of the subtree in document order, trivia not included.
    pub fn tokens(&self) -> impl Iterator<Item = &GreenToken> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            loop {
                match stack.pop()? {
                    NodeOrToken::Token(token) => return Some(token),
                    NodeOrToken::Node(node) => stack.extend(node.children().rev().flatten()),
                }
            }
        })
    }

    #[inline]
    pub fn content_hash(&self) -> u32 {
        match self {
            NodeOrToken::Node(node) => node.content_hash(),
            NodeOrToken::Token(token) => token.content_hash(),
        }
    }

    /// Whether both handles point at the same fact instance.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeOrToken::Node(lhs), NodeOrToken::Node(rhs)) => lhs.ptr_eq(rhs),
            (NodeOrToken::Token(lhs), NodeOrToken::Token(rhs)) => lhs.ptr_eq(rhs),
            _ => false,
        }
    }
}
