use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

use sylva_errors::Diagnostic;
use text_size::TextSize;
use triomphe::Arc;

use super::children::{Children, Slot};
use super::{
    Diagnostics, GreenElement, GreenToken, ListShape, SubtreeDiagnostics, content_hasher,
    memo_hash,
};
use crate::{NodeFlags, NodeOrToken, SyntaxKind};

/// Composite fact node: a kind and an ordered run of child slots.
///
/// Cloning is a reference-count bump; equality and hashing are structural.
#[derive(Clone)]
pub struct GreenNode {
    data: Arc<GreenNodeData>,
}

struct GreenNodeData {
    kind: SyntaxKind,
    flags: NodeFlags,
    full_width: TextSize,
    /// Memoized content hash, 0 until first computed.
    hash: AtomicU32,
    diagnostics: Diagnostics,
    children: Children,
}

impl GreenNode {
    /// Creates a node, picking the cheapest shape for the number of slots.
    pub fn new(kind: SyntaxKind, children: impl IntoIterator<Item = Option<GreenElement>>) -> Self {
        let children = children.into_iter().collect::<Vec<_>>();
        let shape = ListShape::for_count(children.len());
        Self::with_shape(kind, shape, children)
    }

    /// Creates a node with an explicitly requested shape.
    ///
    /// Panics if `shape` cannot hold `children.len()` children.
    #[track_caller]
    pub fn with_shape(
        kind: SyntaxKind,
        shape: ListShape,
        children: Vec<Option<GreenElement>>,
    ) -> Self {
        Self::alloc(kind, Children::new(shape, children), Diagnostics::default())
    }

    /// Creates a `LIST` node. An empty list is no node at all.
    pub fn list(children: impl IntoIterator<Item = Option<GreenElement>>) -> Option<Self> {
        let children = children.into_iter().collect::<Vec<_>>();
        if children.is_empty() {
            return None;
        }
        Some(Self::new(SyntaxKind::LIST, children))
    }

    fn alloc(kind: SyntaxKind, children: Children, diagnostics: Diagnostics) -> Self {
        let mut flags = NodeFlags::empty();
        let mut full_width = TextSize::new(0);
        for child in children.as_slice().iter().flatten() {
            flags |= child.flags().inherited();
            full_width += child.full_width();
        }
        if !diagnostics.is_empty() {
            flags |= NodeFlags::CONTAINS_DIAGNOSTICS;
        }

        let data = GreenNodeData {
            kind,
            flags,
            full_width,
            hash: AtomicU32::new(0),
            diagnostics,
            children,
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

    #[inline]
    pub fn shape(&self) -> ListShape {
        self.data.children.shape()
    }

    /// Width including the leading trivia of the first terminal.
    #[inline]
    pub fn full_width(&self) -> TextSize {
        self.data.full_width
    }

    /// Width excluding the leading trivia of the first terminal.
    pub fn width(&self) -> TextSize {
        self.full_width() - self.leading_trivia_width()
    }

    pub fn leading_trivia_width(&self) -> TextSize {
        self.first_token().map_or(TextSize::new(0), GreenToken::leading_trivia_width)
    }

    /// Number of child slots, absent ones included.
    #[inline]
    pub fn count(&self) -> usize {
        self.slots().len()
    }

    /// Returns the child in slot `index`; `None` for an absent child or an
    /// index past the end.
    #[inline]
    pub fn child_at(&self, index: usize) -> Option<&GreenElement> {
        self.slots().get(index)?.as_ref()
    }

    /// Iterates over the child slots in order.
    #[inline]
    pub fn children(
        &self,
    ) -> impl DoubleEndedIterator<Item = Option<&GreenElement>> + ExactSizeIterator {
        self.slots().iter().map(Option::as_ref)
    }

    #[inline]
    pub(crate) fn slots(&self) -> &[Slot] {
        self.data.children.as_slice()
    }

    /// Offset of child `index` relative to the start of this node.
    ///
    /// Panics if `index` is not a slot of this node.
    #[track_caller]
    pub fn offset_at(&self, index: usize) -> TextSize {
        self.data.children.offset_at(index)
    }

    /// Index of the child whose full span contains `offset`, which is
    /// relative to the start of this node.
    ///
    /// Panics unless `offset < self.full_width()`.
    #[track_caller]
    pub fn index_at_offset(&self, offset: TextSize) -> usize {
        self.data.children.index_at_offset(offset, self.full_width())
    }

    /// First terminal of the subtree, descending through the first present
    /// child at each level.
    pub fn first_token(&self) -> Option<&GreenToken> {
        self.slots().iter().flatten().find_map(|child| match child {
            NodeOrToken::Node(node) => node.first_token(),
            NodeOrToken::Token(token) => Some(token),
        })
    }

    /// Last terminal of the subtree.
    pub fn last_token(&self) -> Option<&GreenToken> {
        self.slots().iter().rev().flatten().find_map(|child| match child {
            NodeOrToken::Node(node) => node.last_token(),
            NodeOrToken::Token(token) => Some(token),
        })
    }

    /// Diagnostics owned by this exact node; shared empty slice when none.
    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.data.diagnostics.as_slice()
    }

    /// Diagnostics of the whole subtree, resolved against `full_start`.
    pub fn diagnostics_in_subtree(&self, full_start: TextSize) -> SubtreeDiagnostics<'_> {
        SubtreeDiagnostics::new(NodeOrToken::Node(self), full_start)
    }

    /// Returns a node with the same children (by reference) and `diagnostics`.
    #[must_use]
    pub fn with_diagnostics(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) -> Self {
        Self::alloc(self.kind(), self.data.children.clone(), Diagnostics::new(diagnostics))
    }

    /// Returns a node with slot `index` replaced, sharing every other child.
    ///
    /// Panics if `index` is not a slot of this node.
    #[must_use]
    #[track_caller]
    pub fn replace_child(&self, index: usize, child: Option<GreenElement>) -> Self {
        let mut slots = self.slots().to_vec();
        let count = slots.len();
        let slot = slots
            .get_mut(index)
            .unwrap_or_else(|| panic!("child index {index} out of range for {count} children"));
        *slot = child;
        Self::alloc(
            self.kind(),
            Children::new(self.shape(), slots),
            self.data.diagnostics.clone(),
        )
    }

    /// Whether both handles point at the same node instance.
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
        self.full_width().hash(&mut hasher);
        hasher.write_usize(self.count());
        for child in self.slots() {
            hasher.write_u32(child.as_ref().map_or(0, GreenElement::content_hash));
        }

        let hash = memo_hash(hasher.finish());
        self.data.hash.store(hash, Ordering::Relaxed);
        hash
    }

    fn memoized_hash(&self) -> Option<u32> {
        match self.data.hash.load(Ordering::Relaxed) {
            0 => None,
            hash => Some(hash),
        }
    }
}

impl PartialEq for GreenNode {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.kind() != other.kind()
            || self.flags() != other.flags()
            || self.full_width() != other.full_width()
            || self.count() != other.count()
        {
            return false;
        }
        if let (Some(lhs), Some(rhs)) = (self.memoized_hash(), other.memoized_hash())
            && lhs != rhs
        {
            return false;
        }
        // Shapes may differ (an explicit `Long` against an inferred `Short`),
        // so compare slot by slot.
        self.slots().iter().zip(other.slots()).all(|(lhs, rhs)| lhs == rhs)
    }
}

impl Eq for GreenNode {}

impl Hash for GreenNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.content_hash());
    }
}

impl fmt::Debug for GreenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreenNode")
            .field("kind", &self.kind())
            .field("shape", &self.shape())
            .field("full_width", &self.full_width())
            .field("flags", &self.flags())
            .field("diagnostics", &self.data.diagnostics)
            .field("children", &self.slots())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use sylva_errors::DiagnosticCode;

    use super::*;
    use crate::SyntaxKind::*;

    fn token(kind: SyntaxKind, width: u32) -> Option<GreenElement> {
        Some(GreenToken::new(kind, width.into()).into())
    }

    fn missing(kind: SyntaxKind) -> Option<GreenElement> {
        let diagnostic = Diagnostic::error(DiagnosticCode::EXPECTED_TOKEN, 0.into(), 0.into());
        Some(GreenToken::missing(kind, [diagnostic]).into())
    }

    fn widths(widths: &[u32]) -> Vec<Option<GreenElement>> {
        widths.iter().map(|&width| token(NAME, width)).collect()
    }

    #[test]
    fn shape_follows_count() {
        assert_eq!(GreenNode::new(MODULE, []).shape(), ListShape::Empty);
        assert_eq!(GreenNode::new(MODULE, widths(&[1])).shape(), ListShape::One);
        assert_eq!(GreenNode::new(MODULE, widths(&[1, 2])).shape(), ListShape::Two);
        assert_eq!(GreenNode::new(MODULE, widths(&[1; 5])).shape(), ListShape::Short);
        assert_eq!(GreenNode::new(MODULE, widths(&[1; 11])).shape(), ListShape::Long);
        assert!(GreenNode::list([]).is_none());
    }

    #[test]
    fn long_list_offsets() {
        let list = GreenNode::with_shape(LIST, ListShape::Long, widths(&[7, 1, 2]));
        assert_eq!(list.full_width(), 10.into());
        assert_eq!(list.index_at_offset(0.into()), 0);
        assert_eq!(list.index_at_offset(7.into()), 1);
        assert_eq!(list.index_at_offset(8.into()), 2);
        assert_eq!(list.index_at_offset(9.into()), 2);
        assert_eq!(list.offset_at(0), 0.into());
        assert_eq!(list.offset_at(1), 7.into());
        assert_eq!(list.offset_at(2), 8.into());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_at_offset_past_end() {
        let list = GreenNode::with_shape(LIST, ListShape::Long, widths(&[7, 1, 2]));
        list.index_at_offset(10.into());
    }

    #[test]
    #[should_panic(expected = "child index 2 out of range for 2 children")]
    fn offset_at_past_end() {
        GreenNode::new(BINARY_EXPR, widths(&[1, 2])).offset_at(2);
    }

    #[test]
    #[should_panic(expected = "a `One` list cannot hold 2 children")]
    fn explicit_shape_must_fit() {
        GreenNode::with_shape(LIST, ListShape::One, widths(&[1, 2]));
    }

    #[test]
    fn absent_second_child() {
        let node = GreenNode::new(BINARY_EXPR, [token(NUMBER, 4), None]);
        assert_eq!(node.shape(), ListShape::Two);
        assert_eq!(node.count(), 2);
        assert!(node.child_at(1).is_none());
        assert!(node.child_at(0).is_some());
        assert_eq!(node.full_width(), 4.into());
    }

    #[test]
    fn child_at_past_end_is_none() {
        let node = GreenNode::new(PAREN_EXPR, widths(&[1, 3, 1]));
        assert!(node.child_at(3).is_none());
        assert!(node.child_at(usize::MAX).is_none());
    }

    #[test]
    fn missing_flags_distinguish_all_and_none() {
        let all = GreenNode::new(LIST, [missing(SEMICOLON), missing(NAME), missing(COMMA)]);
        let none = GreenNode::new(LIST, widths(&[1, 1, 1]));
        let some = GreenNode::new(LIST, [missing(SEMICOLON), token(NAME, 1), missing(COMMA)]);

        assert!(all.is_missing());
        assert!(all.flags().contains(NodeFlags::CONTAINS_MISSING));
        assert!(!none.is_missing());
        assert!(!none.flags().contains(NodeFlags::CONTAINS_MISSING));
        assert!(!some.is_missing());
        assert!(some.flags().contains(NodeFlags::CONTAINS_MISSING));
        assert_ne!(all.flags(), none.flags());
        assert!(all.flags().contains_diagnostics());
    }

    #[test]
    fn structural_equality() {
        let lhs = GreenNode::new(BINARY_EXPR, [token(NUMBER, 1), token(NUMBER, 2)]);
        let rhs = GreenNode::new(BINARY_EXPR, [token(NUMBER, 1), token(NUMBER, 2)]);
        assert!(!lhs.ptr_eq(&rhs));
        assert_eq!(lhs, rhs);
        assert_eq!(lhs.content_hash(), rhs.content_hash());
        assert_ne!(lhs.content_hash(), 0);

        let other_kind = GreenNode::new(CALL_EXPR, [token(NUMBER, 1), token(NUMBER, 2)]);
        assert_ne!(lhs, other_kind);
        let other_child = GreenNode::new(BINARY_EXPR, [token(NUMBER, 1), token(NAME, 2)]);
        assert_ne!(lhs, other_child);
        let absent_child = GreenNode::new(BINARY_EXPR, [token(NUMBER, 1), None]);
        assert_ne!(lhs, absent_child);
    }

    #[test]
    fn equality_across_shapes() {
        let short = GreenNode::new(LIST, widths(&[1, 2, 3]));
        let long = GreenNode::with_shape(LIST, ListShape::Long, widths(&[1, 2, 3]));
        assert_eq!(short.shape(), ListShape::Short);
        assert_eq!(short, long);
        assert_eq!(short.content_hash(), long.content_hash());
    }

    #[test]
    fn hash_is_memoized() {
        let node = GreenNode::new(LIST, widths(&[1, 2, 3]));
        let first = node.content_hash();
        assert_eq!(node.memoized_hash(), Some(first));
        assert_eq!(node.content_hash(), first);
    }

    #[test]
    fn with_diagnostics_shares_children() {
        let node = GreenNode::new(VAL_STMT, [token(VAL_KW, 3), token(NAME, 1)]);
        let diagnostic = Diagnostic::error(DiagnosticCode::UNEXPECTED_TOKEN, 0.into(), 3.into());
        let annotated = node.with_diagnostics([diagnostic]);

        assert!(!annotated.ptr_eq(&node));
        assert_eq!(annotated.diagnostics(), &[diagnostic]);
        assert!(node.diagnostics().is_empty());
        assert!(!node.flags().contains_diagnostics());
        assert!(annotated.flags().contains_diagnostics());
        assert_eq!(annotated.full_width(), node.full_width());
        assert_eq!(annotated.flags().difference(NodeFlags::CONTAINS_DIAGNOSTICS), node.flags());
        for (lhs, rhs) in node.children().zip(annotated.children()) {
            assert!(lhs.unwrap().ptr_eq(rhs.unwrap()));
        }

        let cleared = annotated.with_diagnostics([]);
        assert!(cleared.diagnostics().is_empty());
        assert_eq!(cleared, node);
    }

    #[test]
    fn replace_child_shares_siblings() {
        let list = GreenNode::new(LIST, widths(&[2; 12]));
        let replaced = list.replace_child(5, token(NUMBER, 6));

        assert_eq!(replaced.shape(), ListShape::Long);
        assert_eq!(replaced.full_width(), 28.into());
        assert_eq!(replaced.offset_at(6), 16.into());
        for index in (0..12).filter(|&index| index != 5) {
            assert!(list.child_at(index).unwrap().ptr_eq(replaced.child_at(index).unwrap()));
        }
        assert_eq!(replaced.child_at(5).unwrap().kind(), NUMBER);
    }

    #[test]
    fn width_excludes_leading_trivia() {
        let trivia = GreenElement::Token(GreenToken::new(WHITESPACE, 2.into()));
        let first = GreenToken::with_trivia(Some(trivia), NAME, 3.into());
        let node = GreenNode::new(NAME_REF, [Some(first.into()), token(DOT, 1)]);

        assert_eq!(node.full_width(), 6.into());
        assert_eq!(node.leading_trivia_width(), 2.into());
        assert_eq!(node.width(), 4.into());
        assert_eq!(node.first_token().unwrap().kind(), NAME);
        assert_eq!(node.last_token().unwrap().kind(), DOT);
    }
}
