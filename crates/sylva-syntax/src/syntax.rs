//! Positioned views over a fact tree.
//!
//! A [`SyntaxTree`] owns an arena of views. Each view wraps one fact, a link
//! to its parent view and its absolute offset; child views are created the
//! first time they are asked for and cached in their parent's slot table.
//! Dropping the tree drops every materialized view with it.
//!
//! The cache uses interior mutability without synchronization, so a
//! `SyntaxTree` is confined to one thread. The fact tree underneath is
//! `Send + Sync` and can back one `SyntaxTree` per thread.

use std::cell::RefCell;
use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};

use la_arena::{Arena, Idx};
use sylva_errors::Diagnostic;
use text_size::{TextRange, TextSize};

use crate::{
    GreenElement, GreenElementRef, GreenNode, GreenToken, NodeFlags, SubtreeDiagnostics, SyntaxKind,
};

type ViewId = Idx<View>;

/// Per-slot cache state of a view's children.
#[derive(Clone, Copy, Debug)]
enum ChildSlot {
    Uncomputed,
    /// The fact slot is empty.
    Absent,
    Present(ViewId),
}

struct View {
    green: GreenElement,
    parent: Option<ViewId>,
    index_in_parent: u32,
    /// Absolute start of the full span.
    offset: TextSize,
    slots: Box<[ChildSlot]>,
}

/// A fact tree together with its materialized positioned views.
pub struct SyntaxTree {
    root: GreenNode,
    root_id: ViewId,
    views: RefCell<Arena<View>>,
}

impl SyntaxTree {
    /// Wraps `root`, which starts at offset 0.
    pub fn new(root: GreenNode) -> Self {
        let mut views = Arena::new();
        let root_id = views.alloc(View {
            slots: vec![ChildSlot::Uncomputed; root.count()].into_boxed_slice(),
            green: root.clone().into(),
            parent: None,
            index_in_parent: 0,
            offset: TextSize::new(0),
        });
        Self { root, root_id, views: RefCell::new(views) }
    }

    /// Returns the root view.
    #[inline]
    pub fn root(&self) -> SyntaxNode<'_> {
        SyntaxNode { tree: self, id: self.root_id }
    }

    /// Returns the fact tree.
    #[inline]
    pub fn green(&self) -> &GreenNode {
        &self.root
    }

    /// Number of views materialized so far, the root included.
    pub fn materialized(&self) -> usize {
        self.views.borrow().len()
    }

    #[inline]
    fn view<R>(&self, id: ViewId, f: impl FnOnce(&View) -> R) -> R {
        f(&self.views.borrow()[id])
    }

    fn element(&self, id: ViewId) -> SyntaxElement<'_> {
        if self.view(id, |view| view.green.as_node().is_some()) {
            NodeOrToken::Node(SyntaxNode { tree: self, id })
        } else {
            NodeOrToken::Token(SyntaxToken { tree: self, id })
        }
    }

    /// Returns the fact behind `id`, borrowed from the root.
    fn green_ref(&self, id: ViewId) -> GreenElementRef<'_> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some((parent, index)) =
            self.view(current, |view| view.parent.map(|parent| (parent, view.index_in_parent)))
        {
            path.push(index as usize);
            current = parent;
        }

        let mut green = NodeOrToken::Node(&self.root);
        for index in path.into_iter().rev() {
            green = match green {
                NodeOrToken::Node(node) => {
                    node.child_at(index).expect("views are only created for present slots").as_ref()
                }
                NodeOrToken::Token(_) => unreachable!("tokens have no child views"),
            };
        }
        green
    }

    /// Returns the view of child `index` of `parent`, creating it on first use.
    fn child(&self, parent: ViewId, index: usize) -> Option<ViewId> {
        match self.view(parent, |view| view.slots.get(index).copied())? {
            ChildSlot::Present(id) => return Some(id),
            ChildSlot::Absent => return None,
            ChildSlot::Uncomputed => {}
        }

        let mut views = self.views.borrow_mut();
        let (child, offset) = {
            let view = &views[parent];
            let NodeOrToken::Node(green) = &view.green else {
                unreachable!("tokens have no child slots")
            };
            (green.child_at(index).cloned(), view.offset + green.offset_at(index))
        };
        let Some(child) = child else {
            views[parent].slots[index] = ChildSlot::Absent;
            return None;
        };

        let id = views.alloc(View {
            slots: vec![ChildSlot::Uncomputed; child.count()].into_boxed_slice(),
            green: child,
            parent: Some(parent),
            index_in_parent: index as u32,
            offset,
        });
        views[parent].slots[index] = ChildSlot::Present(id);
        Some(id)
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("full_width", &self.root.full_width())
            .field("materialized", &self.materialized())
            .finish_non_exhaustive()
    }
}

/// Node view tied to the lifetime of its tree.
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t SyntaxTree,
    id: ViewId,
}

impl<'t> SyntaxNode<'t> {
    #[inline]
    fn view<R>(self, f: impl FnOnce(&View) -> R) -> R {
        self.tree.view(self.id, f)
    }

    #[inline]
    fn node<R>(self, f: impl FnOnce(&GreenNode) -> R) -> R {
        self.view(|view| match &view.green {
            NodeOrToken::Node(node) => f(node),
            NodeOrToken::Token(_) => unreachable!("node view over a token"),
        })
    }

    /// Returns this node's kind.
    #[inline]
    pub fn kind(self) -> SyntaxKind {
        self.node(GreenNode::kind)
    }

    /// Returns the underlying fact node.
    #[inline]
    pub fn green(self) -> GreenNode {
        self.node(GreenNode::clone)
    }

    #[inline]
    pub fn flags(self) -> NodeFlags {
        self.node(GreenNode::flags)
    }

    #[inline]
    pub fn is_missing(self) -> bool {
        self.flags().is_missing()
    }

    #[inline]
    pub fn contains_diagnostics(self) -> bool {
        self.flags().contains_diagnostics()
    }

    #[inline]
    pub fn contains_skipped_text(self) -> bool {
        self.flags().contains_skipped_text()
    }

    /// Absolute start of the full span.
    #[inline]
    pub fn offset(self) -> TextSize {
        self.view(|view| view.offset)
    }

    /// Range including the leading trivia of the first token.
    #[inline]
    pub fn full_span(self) -> TextRange {
        self.view(|view| TextRange::at(view.offset, view.green.full_width()))
    }

    /// Range excluding the leading trivia of the first token.
    #[inline]
    pub fn span(self) -> TextRange {
        self.view(|view| {
            TextRange::at(view.offset + view.green.leading_trivia_width(), view.green.width())
        })
    }

    /// Returns the parent node if any.
    #[inline]
    pub fn parent(self) -> Option<Self> {
        Some(Self { tree: self.tree, id: self.view(|view| view.parent)? })
    }

    /// Slot index of this node in its parent; `None` for the root.
    #[inline]
    pub fn index_in_parent(self) -> Option<usize> {
        self.view(|view| view.parent.map(|_| view.index_in_parent as usize))
    }

    /// Number of child slots, absent ones included.
    #[inline]
    pub fn count(self) -> usize {
        self.view(|view| view.slots.len())
    }

    /// Returns the child in slot `index`; `None` for an absent child or an
    /// index past the end. The view is created once and then cached.
    #[inline]
    pub fn child_at(self, index: usize) -> Option<SyntaxElement<'t>> {
        let id = self.tree.child(self.id, index)?;
        Some(self.tree.element(id))
    }

    /// Returns the child node in slot `index`, if that slot holds a node.
    #[inline]
    pub fn child_node_at(self, index: usize) -> Option<Self> {
        self.child_at(index)?.into_node()
    }

    /// Iterates present children, tokens included.
    pub fn children_with_tokens(self) -> impl DoubleEndedIterator<Item = SyntaxElement<'t>> {
        (0..self.count()).filter_map(move |index| self.child_at(index))
    }

    /// Iterates present child nodes.
    pub fn children(self) -> impl DoubleEndedIterator<Item = SyntaxNode<'t>> {
        self.children_with_tokens().filter_map(NodeOrToken::into_node)
    }

    /// Returns an iterator of ancestors, starting from the parent.
    #[inline]
    pub fn ancestors(self) -> impl Iterator<Item = SyntaxNode<'t>> + Clone {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    /// Returns an iterator of ancestors, starting from this node.
    #[inline]
    pub fn ancestors_and_self(self) -> impl Iterator<Item = SyntaxNode<'t>> + Clone {
        std::iter::successors(Some(self), |node| node.parent())
    }

    /// Returns the closest node, starting from this one, matching `predicate`.
    pub fn first_ancestor_or_self(
        self,
        mut predicate: impl FnMut(SyntaxNode<'t>) -> bool,
    ) -> Option<SyntaxNode<'t>> {
        self.ancestors_and_self().find(|&node| predicate(node))
    }

    /// Returns a preorder iterator over nodes.
    #[inline]
    pub fn preorder(self) -> Preorder<'t> {
        Preorder { inner: PreorderWithTokens::new(self) }
    }

    /// Returns a preorder iterator over nodes and tokens.
    #[inline]
    pub fn preorder_with_tokens(self) -> PreorderWithTokens<'t> {
        PreorderWithTokens::new(self)
    }

    /// Descendant nodes in document order, this node excluded.
    pub fn descendants(self) -> impl Iterator<Item = SyntaxNode<'t>> {
        self.preorder()
            .filter_map(|event| match event {
                WalkEvent::Enter(node) => Some(node),
                WalkEvent::Leave(_) => None,
            })
            .skip(1)
    }

    /// Descendant nodes and tokens in document order, this node excluded.
    pub fn descendants_with_tokens(self) -> impl Iterator<Item = SyntaxElement<'t>> {
        self.preorder_with_tokens()
            .filter_map(|event| match event {
                WalkEventWithTokens::EnterNode(node) => Some(NodeOrToken::Node(node)),
                WalkEventWithTokens::Token(token) => Some(NodeOrToken::Token(token)),
                WalkEventWithTokens::LeaveNode(_) => None,
            })
            .skip(1)
    }

    /// Returns the first token, descending through the first present child at
    /// each level. Missing tokens are skipped unless `include_missing`.
    pub fn first_token(self, include_missing: bool) -> Option<SyntaxToken<'t>> {
        (0..self.count()).find_map(|index| self.first_token_in_slot(index, include_missing))
    }

    /// Returns the last token. Missing tokens are skipped unless
    /// `include_missing`.
    pub fn last_token(self, include_missing: bool) -> Option<SyntaxToken<'t>> {
        (0..self.count()).rev().find_map(|index| self.last_token_in_slot(index, include_missing))
    }

    fn first_token_in_slot(self, index: usize, include_missing: bool) -> Option<SyntaxToken<'t>> {
        if !include_missing && self.slot_is_missing(index) {
            return None;
        }
        match self.child_at(index)? {
            NodeOrToken::Node(node) => node.first_token(include_missing),
            NodeOrToken::Token(token) => Some(token),
        }
    }

    fn last_token_in_slot(self, index: usize, include_missing: bool) -> Option<SyntaxToken<'t>> {
        if !include_missing && self.slot_is_missing(index) {
            return None;
        }
        match self.child_at(index)? {
            NodeOrToken::Node(node) => node.last_token(include_missing),
            NodeOrToken::Token(token) => Some(token),
        }
    }

    /// Checks the fact slot without materializing a view for it.
    fn slot_is_missing(self, index: usize) -> bool {
        self.node(|node| node.child_at(index).is_some_and(GreenElement::is_missing))
    }

    /// Returns the token whose full span contains `offset`, or both tokens
    /// when `offset` sits exactly between two of them.
    pub fn token_at_offset(self, offset: TextSize) -> TokenAtOffset<SyntaxToken<'t>> {
        let range = self.full_span();
        if range.is_empty() || !range.contains_inclusive(offset) {
            return TokenAtOffset::None;
        }
        if offset == range.end() {
            return match self.last_token(false) {
                Some(last) => TokenAtOffset::Single(last),
                None => TokenAtOffset::None,
            };
        }

        let mut node = self;
        let right = loop {
            let index = node.node(|green| green.index_at_offset(offset - node.offset()));
            match node.child_at(index) {
                Some(NodeOrToken::Node(child)) => node = child,
                Some(NodeOrToken::Token(token)) => break token,
                None => unreachable!("offsets never land on an empty slot"),
            }
        };

        if offset == right.offset()
            && let Some(left) = right.prev_token(false)
            && left.full_span().end() == offset
            && range.contains(left.offset())
        {
            TokenAtOffset::Between(left, right)
        } else {
            TokenAtOffset::Single(right)
        }
    }

    /// Returns the innermost node under this one whose full span contains
    /// `span`. When several nested nodes share that exact span, the outermost
    /// of them is returned unless `innermost` is set. An empty `span` enters
    /// zero-width nodes sitting at its offset.
    ///
    /// Panics if `span` is not inside this node.
    #[track_caller]
    pub fn find_child_node_at(self, span: TextRange, innermost: bool) -> SyntaxNode<'t> {
        let full_span = self.full_span();
        assert!(
            full_span.contains_range(span),
            "span {span:?} is not inside the node at {full_span:?}"
        );

        let mut node = self;
        while let Some(NodeOrToken::Node(child)) = node.child_containing(span) {
            node = child;
        }

        if !innermost {
            while node != self
                && let Some(parent) = node.parent()
                && parent.full_span() == node.full_span()
            {
                node = parent;
            }
        }
        node
    }

    fn child_containing(self, span: TextRange) -> Option<SyntaxElement<'t>> {
        let full_span = self.full_span();
        let start = span.start() - full_span.start();
        let index = self.node(|green| {
            let next = if start < green.full_width() {
                green.index_at_offset(start)
            } else {
                green.count()
            };

            // Zero-width slots right before `next` all sit at `start`.
            if span.is_empty() {
                let zero_width_node = (0..next)
                    .rev()
                    .map_while(|index| match green.child_at(index) {
                        None => Some(None),
                        Some(child) if child.full_width() == TextSize::new(0) => {
                            Some(matches!(child, NodeOrToken::Node(_)).then_some(index))
                        }
                        Some(_) => None,
                    })
                    .flatten()
                    .last();
                if zero_width_node.is_some() {
                    return zero_width_node;
                }
            }

            if next < green.count() {
                Some(next)
            } else {
                (0..green.count()).rev().find(|&index| green.child_at(index).is_some())
            }
        })?;
        let child = self.child_at(index)?;
        child.full_span().contains_range(span).then_some(child)
    }

    /// Diagnostics of the whole subtree in document order, with absolute
    /// ranges.
    pub fn diagnostics(self) -> SubtreeDiagnostics<'t> {
        SubtreeDiagnostics::new(self.tree.green_ref(self.id), self.offset())
    }

    /// Diagnostics owned by this node alone.
    pub fn own_diagnostics(self) -> Vec<Diagnostic> {
        self.node(|node| node.diagnostics().to_vec())
    }

    /// Renders the subtree, one element per line.
    pub fn debug_dump(self) -> String {
        let mut buf = String::new();
        self.dump_into(&mut buf, 0);
        buf
    }

    fn dump_into(self, buf: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        _ = write!(buf, "{indent}{:?}@{:?}", self.kind(), self.full_span());
        let span_start = self.span().start();
        for diagnostic in self.node(|node| node.diagnostics().to_vec()) {
            let diagnostic = diagnostic.resolve(span_start);
            _ = write!(buf, " {}@{:?}", diagnostic.code(), diagnostic.range());
        }
        buf.push('\n');

        for index in 0..self.count() {
            match self.child_at(index) {
                Some(NodeOrToken::Node(node)) => node.dump_into(buf, depth + 1),
                Some(NodeOrToken::Token(token)) => token.dump_into(buf, depth + 1),
                None => _ = writeln!(buf, "{indent}  <absent>"),
            }
        }
    }
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

impl Hash for SyntaxNode<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?}", self.kind(), self.full_span())
    }
}

/// Token view tied to the lifetime of its tree.
#[derive(Clone, Copy)]
pub struct SyntaxToken<'t> {
    tree: &'t SyntaxTree,
    id: ViewId,
}

impl<'t> SyntaxToken<'t> {
    #[inline]
    fn token<R>(self, f: impl FnOnce(&GreenToken) -> R) -> R {
        self.tree.view(self.id, |view| match &view.green {
            NodeOrToken::Token(token) => f(token),
            NodeOrToken::Node(_) => unreachable!("token view over a node"),
        })
    }

    /// Returns this token's kind.
    #[inline]
    pub fn kind(self) -> SyntaxKind {
        self.token(GreenToken::kind)
    }

    /// Returns the underlying terminal fact.
    #[inline]
    pub fn green(self) -> GreenToken {
        self.token(GreenToken::clone)
    }

    #[inline]
    pub fn flags(self) -> NodeFlags {
        self.token(GreenToken::flags)
    }

    #[inline]
    pub fn is_missing(self) -> bool {
        self.flags().is_missing()
    }

    /// Absolute start of the full span.
    #[inline]
    pub fn offset(self) -> TextSize {
        self.tree.view(self.id, |view| view.offset)
    }

    /// Range including leading trivia.
    #[inline]
    pub fn full_span(self) -> TextRange {
        TextRange::at(self.offset(), self.token(GreenToken::full_width))
    }

    /// Range of the token text, trivia excluded.
    #[inline]
    pub fn span(self) -> TextRange {
        let (leading, width) = self.token(|token| (token.leading_trivia_width(), token.width()));
        TextRange::at(self.offset() + leading, width)
    }

    /// Range of the leading trivia.
    #[inline]
    pub fn leading_trivia_span(self) -> TextRange {
        TextRange::at(self.offset(), self.token(GreenToken::leading_trivia_width))
    }

    #[inline]
    pub fn leading_trivia(self) -> Option<GreenElement> {
        self.token(|token| token.leading_trivia().cloned())
    }

    /// Returns the parent node.
    #[inline]
    pub fn parent(self) -> SyntaxNode<'t> {
        let parent = self.tree.view(self.id, |view| view.parent);
        SyntaxNode { tree: self.tree, id: parent.expect("tokens always have a parent") }
    }

    #[inline]
    pub fn index_in_parent(self) -> usize {
        self.tree.view(self.id, |view| view.index_in_parent as usize)
    }

    /// Returns an iterator of ancestors, starting from the parent.
    #[inline]
    pub fn ancestors(self) -> impl Iterator<Item = SyntaxNode<'t>> + Clone {
        self.parent().ancestors_and_self()
    }

    /// Returns the next token in document order.
    pub fn next_token(self, include_missing: bool) -> Option<SyntaxToken<'t>> {
        let mut parent = self.parent();
        let mut index = self.index_in_parent();
        loop {
            let next = (index + 1..parent.count())
                .find_map(|index| parent.first_token_in_slot(index, include_missing));
            if next.is_some() {
                return next;
            }
            index = parent.index_in_parent()?;
            parent = parent.parent()?;
        }
    }

    /// Returns the previous token in document order.
    pub fn prev_token(self, include_missing: bool) -> Option<SyntaxToken<'t>> {
        let mut parent = self.parent();
        let mut index = self.index_in_parent();
        loop {
            let prev =
                (0..index).rev().find_map(|index| parent.last_token_in_slot(index, include_missing));
            if prev.is_some() {
                return prev;
            }
            index = parent.index_in_parent()?;
            parent = parent.parent()?;
        }
    }

    /// Diagnostics of this token and its trivia, with absolute ranges.
    pub fn diagnostics(self) -> SubtreeDiagnostics<'t> {
        SubtreeDiagnostics::new(self.tree.green_ref(self.id), self.offset())
    }

    fn dump_into(self, buf: &mut String, depth: usize) {
        _ = write!(buf, "{}{:?}@{:?}", "  ".repeat(depth), self.kind(), self.span());

        if let Some(trivia) = self.leading_trivia() {
            let mut offset = self.offset();
            let pieces = trivia
                .tokens()
                .map(|piece| {
                    let range = TextRange::at(offset, piece.full_width());
                    offset += piece.full_width();
                    let mut text = format!("{:?}@{range:?}", piece.kind());
                    for diagnostic in piece.diagnostics() {
                        let diagnostic = diagnostic.resolve(range.start());
                        _ = write!(text, " {}@{:?}", diagnostic.code(), diagnostic.range());
                    }
                    text
                })
                .collect::<Vec<_>>();
            _ = write!(buf, " ({})", pieces.join(", "));
        }
        if self.is_missing() {
            buf.push_str(" missing");
        }
        let span_start = self.span().start();
        for diagnostic in self.token(|token| token.diagnostics().to_vec()) {
            let diagnostic = diagnostic.resolve(span_start);
            _ = write!(buf, " {}@{:?}", diagnostic.code(), diagnostic.range());
        }
        buf.push('\n');
    }
}

impl PartialEq for SyntaxToken<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxToken<'_> {}

impl Hash for SyntaxToken<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SyntaxToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?}", self.kind(), self.span())
    }
}

/// Node or token view inside the tree.
pub type SyntaxElement<'t> = NodeOrToken<SyntaxNode<'t>, SyntaxToken<'t>>;

impl<'t> SyntaxElement<'t> {
    pub fn kind(self) -> SyntaxKind {
        match self {
            NodeOrToken::Node(node) => node.kind(),
            NodeOrToken::Token(token) => token.kind(),
        }
    }

    pub fn full_span(self) -> TextRange {
        match self {
            NodeOrToken::Node(node) => node.full_span(),
            NodeOrToken::Token(token) => token.full_span(),
        }
    }

    pub fn span(self) -> TextRange {
        match self {
            NodeOrToken::Node(node) => node.span(),
            NodeOrToken::Token(token) => token.span(),
        }
    }

    pub fn parent(self) -> Option<SyntaxNode<'t>> {
        match self {
            NodeOrToken::Node(node) => node.parent(),
            NodeOrToken::Token(token) => Some(token.parent()),
        }
    }
}

/// Preorder traversal over nodes.
#[derive(Clone)]
pub struct Preorder<'t> {
    inner: PreorderWithTokens<'t>,
}

impl Preorder<'_> {
    /// Skips the current subtree during traversal.
    #[inline]
    pub fn skip_subtree(&mut self) {
        self.inner.skip_subtree();
    }
}

impl<'t> Iterator for Preorder<'t> {
    type Item = WalkEvent<'t>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.find_map(|item| match item {
            WalkEventWithTokens::EnterNode(it) => Some(WalkEvent::Enter(it)),
            WalkEventWithTokens::LeaveNode(it) => Some(WalkEvent::Leave(it)),
            WalkEventWithTokens::Token(_) => None,
        })
    }
}

/// Preorder walk event for nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkEvent<'t> {
    Enter(SyntaxNode<'t>),
    Leave(SyntaxNode<'t>),
}

/// Preorder traversal over nodes and tokens.
#[derive(Clone)]
pub struct PreorderWithTokens<'t> {
    /// Open nodes with the next slot to visit.
    stack: Vec<(SyntaxNode<'t>, usize)>,
    root: Option<SyntaxNode<'t>>,
}

impl<'t> PreorderWithTokens<'t> {
    #[inline]
    fn new(start: SyntaxNode<'t>) -> Self {
        Self { stack: Vec::with_capacity(32), root: Some(start) }
    }

    /// Skips the current subtree during traversal.
    #[inline]
    pub fn skip_subtree(&mut self) {
        assert!(self.stack.pop().is_some(), "must have a subtree to skip");
    }
}

impl<'t> Iterator for PreorderWithTokens<'t> {
    type Item = WalkEventWithTokens<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some((node, next)) = self.stack.last_mut() else {
                let root = self.root.take()?;
                self.stack.push((root, 0));
                return Some(WalkEventWithTokens::EnterNode(root));
            };
            let (node, index) = (*node, *next);
            *next += 1;

            if index >= node.count() {
                self.stack.pop();
                return Some(WalkEventWithTokens::LeaveNode(node));
            }
            match node.child_at(index) {
                Some(NodeOrToken::Node(child)) => {
                    self.stack.push((child, 0));
                    return Some(WalkEventWithTokens::EnterNode(child));
                }
                Some(NodeOrToken::Token(token)) => return Some(WalkEventWithTokens::Token(token)),
                None => {}
            }
        }
    }
}

/// Preorder walk event including tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkEventWithTokens<'t> {
    EnterNode(SyntaxNode<'t>),
    LeaveNode(SyntaxNode<'t>),
    Token(SyntaxToken<'t>),
}

/// Stable identifier for a node by kind and span.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxNodePtr {
    /// Node kind used for lookup.
    pub kind: SyntaxKind,
    /// Span used for lookup.
    pub range: TextRange,
}

impl SyntaxNodePtr {
    /// Builds a pointer from a concrete node.
    pub fn new(node: SyntaxNode<'_>) -> Self {
        Self { kind: node.kind(), range: node.span() }
    }

    /// Attempts to resolve this pointer within `root`.
    pub fn try_to_node<'t>(&self, root: SyntaxNode<'t>) -> Option<SyntaxNode<'t>> {
        if root.parent().is_some() || !root.full_span().contains_range(self.range) {
            return None;
        }

        // Several siblings can touch an empty range, so every node whose full
        // span covers it is a candidate.
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.kind() == self.kind && node.span() == self.range {
                return Some(node);
            }
            let children = stack.len();
            stack.extend(
                node.children().filter(|child| child.full_span().contains_range(self.range)),
            );
            stack[children..].reverse();
        }
        None
    }

    #[track_caller]
    pub fn to_node<'t>(&self, root: SyntaxNode<'t>) -> SyntaxNode<'t> {
        self.try_to_node(root).unwrap()
    }
}

/// Node-or-token wrapper used throughout the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeOrToken<N, T> {
    Node(N),
    Token(T),
}

impl<N, T> NodeOrToken<N, T> {
    /// Converts into the node variant, if any.
    pub fn into_node(self) -> Option<N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    /// Converts into the token variant, if any.
    pub fn into_token(self) -> Option<T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }

    /// Returns a shared reference to the node, if any.
    pub fn as_node(&self) -> Option<&N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    /// Returns a shared reference to the token, if any.
    pub fn as_token(&self) -> Option<&T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }

    /// Borrows both variants.
    pub fn as_ref(&self) -> NodeOrToken<&N, &T> {
        match self {
            NodeOrToken::Node(node) => NodeOrToken::Node(node),
            NodeOrToken::Token(token) => NodeOrToken::Token(token),
        }
    }
}

impl<N: fmt::Display, T: fmt::Display> fmt::Display for NodeOrToken<N, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeOrToken::Node(node) => fmt::Display::fmt(node, f),
            NodeOrToken::Token(token) => fmt::Display::fmt(token, f),
        }
    }
}

/// There might be zero, one or two tokens at a given offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenAtOffset<T> {
    /// No tokens at offset.
    None,
    /// Only a single token at offset.
    Single(T),
    /// Offset is exactly between two tokens.
    Between(T, T),
}

impl<T> TokenAtOffset<T> {
    /// Maps tokens to a different type.
    pub fn map<F: Fn(T) -> U, U>(self, f: F) -> TokenAtOffset<U> {
        match self {
            TokenAtOffset::None => TokenAtOffset::None,
            TokenAtOffset::Single(it) => TokenAtOffset::Single(f(it)),
            TokenAtOffset::Between(l, r) => TokenAtOffset::Between(f(l), f(r)),
        }
    }

    /// Convert to option, preferring the right token in case of a tie.
    pub fn right_biased(self) -> Option<T> {
        match self {
            Self::None => None,
            Self::Single(node) => Some(node),
            Self::Between(_, right) => Some(right),
        }
    }

    /// Convert to option, preferring the left token in case of a tie.
    pub fn left_biased(self) -> Option<T> {
        match self {
            Self::None => None,
            Self::Single(node) => Some(node),
            Self::Between(left, _) => Some(left),
        }
    }
}

impl<T> Iterator for TokenAtOffset<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match std::mem::replace(self, Self::None) {
            Self::None => None,
            Self::Single(node) => {
                *self = Self::None;
                Some(node)
            }
            Self::Between(left, right) => {
                *self = Self::Single(right);
                Some(left)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::None => (0, Some(0)),
            Self::Single(_) => (1, Some(1)),
            Self::Between(_, _) => (2, Some(2)),
        }
    }
}

impl<T> ExactSizeIterator for TokenAtOffset<T> {}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use sylva_errors::DiagnosticCode;

    use super::*;
    use crate::SyntaxKind::*;
    use crate::{Builder, TriviaPiece, TriviaPieceKind};

    const SPACE: [TriviaPiece; 1] = [TriviaPiece::new(TriviaPieceKind::Whitespace, TextSize::new(1))];

    /// `val x = 1 + 2` with the trailing semicolon missing.
    fn val_stmt() -> GreenNode {
        let mut builder = Builder::new();
        builder.start_node(MODULE);
        builder.start_node(VAL_STMT);
        builder.token(&[], VAL_KW, 3.into());
        builder.token(&SPACE, NAME, 1.into());
        builder.token(&SPACE, EQ, 1.into());
        builder.start_node(BINARY_EXPR);
        builder.start_node(LITERAL);
        builder.token(&SPACE, NUMBER, 1.into());
        builder.finish_node();
        builder.token(&SPACE, BINARY_OPERATOR, 1.into());
        builder.start_node(LITERAL);
        builder.token(&SPACE, NUMBER, 1.into());
        builder.finish_node();
        builder.finish_node();
        builder.missing(
            SEMICOLON,
            [Diagnostic::error(DiagnosticCode::EXPECTED_TOKEN, 0.into(), 0.into())],
        );
        builder.finish_node();
        builder.finish_node();
        builder.finish()
    }

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(start.into(), end.into())
    }

    #[test]
    fn dump() {
        let tree = SyntaxTree::new(val_stmt());
        expect![[r#"
            MODULE@0..13
              VAL_STMT@0..13
                VAL_KW@0..3
                NAME@4..5 (WHITESPACE@3..4)
                EQ@6..7 (WHITESPACE@5..6)
                BINARY_EXPR@7..13
                  LITERAL@7..9
                    NUMBER@8..9 (WHITESPACE@7..8)
                  BINARY_OPERATOR@10..11 (WHITESPACE@9..10)
                  LITERAL@11..13
                    NUMBER@12..13 (WHITESPACE@11..12)
                SEMICOLON@13..13 missing E0001@13..13
        "#]]
        .assert_eq(&tree.root().debug_dump());
    }

    #[test]
    fn views_are_created_on_demand_and_cached() {
        let tree = SyntaxTree::new(val_stmt());
        let root = tree.root();
        assert_eq!(tree.materialized(), 1);

        let stmt = root.child_node_at(0).unwrap();
        assert_eq!(tree.materialized(), 2);
        assert_eq!(root.child_node_at(0), Some(stmt));
        assert_eq!(tree.materialized(), 2);

        let name = stmt.child_at(1).unwrap().into_token().unwrap();
        assert_eq!(tree.materialized(), 3);
        assert_eq!(name.parent(), stmt);
        assert_eq!(name.index_in_parent(), 1);
        assert_eq!(stmt.parent(), Some(root));
        assert_eq!(root.parent(), None);
        assert_eq!(root.index_in_parent(), None);

        root.debug_dump();
        assert_eq!(tree.materialized(), 12);
        root.debug_dump();
        assert_eq!(tree.materialized(), 12);
    }

    #[test]
    fn absolute_positions() {
        let tree = SyntaxTree::new(val_stmt());
        let stmt = tree.root().child_node_at(0).unwrap();
        let expr = stmt.child_node_at(3).unwrap();
        assert_eq!(expr.kind(), BINARY_EXPR);
        assert_eq!(expr.offset(), 7.into());
        assert_eq!(expr.full_span(), range(7, 13));
        assert_eq!(expr.span(), range(8, 13));

        let rhs = expr.child_node_at(2).unwrap();
        let number = rhs.first_token(false).unwrap();
        assert_eq!(number.full_span(), range(11, 13));
        assert_eq!(number.span(), range(12, 13));
        assert_eq!(number.leading_trivia_span(), range(11, 12));
        assert_eq!(
            number.ancestors().map(SyntaxNode::kind).collect::<Vec<_>>(),
            [LITERAL, BINARY_EXPR, VAL_STMT, MODULE]
        );
    }

    #[test]
    fn absent_slots() {
        let paren = GreenNode::new(
            PAREN_EXPR,
            [
                Some(GreenToken::new(LEFT_PAREN, 1.into()).into()),
                None,
                Some(GreenToken::new(RIGHT_PAREN, 1.into()).into()),
            ],
        );
        let tree = SyntaxTree::new(paren);
        let root = tree.root();

        assert_eq!(root.count(), 3);
        assert!(root.child_at(1).is_none());
        assert!(root.child_at(1).is_none());
        assert_eq!(tree.materialized(), 1);
        assert!(root.child_at(3).is_none());

        let right = root.child_at(2).unwrap();
        assert_eq!(right.full_span(), range(1, 2));
        assert_eq!(root.children_with_tokens().count(), 2);
        assert_eq!(root.children().count(), 0);
    }

    #[test]
    fn token_navigation_skips_missing() {
        let tree = SyntaxTree::new(val_stmt());
        let root = tree.root();
        let first = root.first_token(false).unwrap();
        assert_eq!(first.kind(), VAL_KW);

        let last = root.last_token(false).unwrap();
        assert_eq!(last.kind(), NUMBER);
        assert_eq!(last.span(), range(12, 13));
        assert_eq!(last.next_token(false), None);

        let semicolon = last.next_token(true).unwrap();
        assert_eq!(semicolon.kind(), SEMICOLON);
        assert!(semicolon.is_missing());
        assert_eq!(root.last_token(true), Some(semicolon));
        assert_eq!(semicolon.prev_token(false), Some(last));

        let kinds = std::iter::successors(Some(first), |token| token.next_token(false))
            .map(SyntaxToken::kind)
            .collect::<Vec<_>>();
        assert_eq!(kinds, [VAL_KW, NAME, EQ, NUMBER, BINARY_OPERATOR, NUMBER]);
    }

    #[test]
    fn token_at_offset() {
        let tree = SyntaxTree::new(val_stmt());
        let root = tree.root();
        let kinds = |offset: u32| root.token_at_offset(offset.into()).map(SyntaxToken::kind);

        assert_eq!(kinds(0), TokenAtOffset::Single(VAL_KW));
        assert_eq!(kinds(3), TokenAtOffset::Between(VAL_KW, NAME));
        assert_eq!(kinds(4), TokenAtOffset::Single(NAME));
        assert_eq!(kinds(10), TokenAtOffset::Single(BINARY_OPERATOR));
        assert_eq!(kinds(13), TokenAtOffset::Single(NUMBER));
        assert_eq!(kinds(14), TokenAtOffset::None);
        assert_eq!(root.token_at_offset(3.into()).right_biased().unwrap().kind(), NAME);
        assert_eq!(root.token_at_offset(3.into()).left_biased().unwrap().kind(), VAL_KW);
    }

    #[test]
    fn find_child_node_at() {
        let tree = SyntaxTree::new(val_stmt());
        let root = tree.root();

        assert_eq!(root.find_child_node_at(range(8, 9), true).kind(), LITERAL);
        assert_eq!(root.find_child_node_at(range(7, 13), true).kind(), BINARY_EXPR);
        assert_eq!(root.find_child_node_at(range(8, 12), false).kind(), BINARY_EXPR);
        assert_eq!(root.find_child_node_at(range(0, 13), true).kind(), VAL_STMT);
        assert_eq!(root.find_child_node_at(range(0, 13), false), root);
        assert_eq!(root.find_child_node_at(range(13, 13), true).kind(), VAL_STMT);

        let stmt = root.child_node_at(0).unwrap();
        assert_eq!(stmt.find_child_node_at(range(0, 13), false), stmt);
    }

    #[test]
    #[should_panic(expected = "is not inside the node")]
    fn find_child_node_at_outside() {
        let tree = SyntaxTree::new(val_stmt());
        let expr = tree.root().child_node_at(0).unwrap().child_node_at(3).unwrap();
        expr.find_child_node_at(range(0, 3), true);
    }

    #[test]
    fn diagnostics_are_absolute() {
        let tree = SyntaxTree::new(val_stmt());
        let root = tree.root();
        assert!(root.contains_diagnostics());
        assert!(root.own_diagnostics().is_empty());

        let diagnostics = root.diagnostics().collect::<Vec<_>>();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), DiagnosticCode::EXPECTED_TOKEN);
        assert_eq!(diagnostics[0].range(), range(13, 13));

        let expr = root.child_node_at(0).unwrap().child_node_at(3).unwrap();
        assert!(!expr.contains_diagnostics());
        assert_eq!(expr.diagnostics().count(), 0);
    }

    #[test]
    fn preorder() {
        let tree = SyntaxTree::new(val_stmt());
        let root = tree.root();

        let kinds = root.descendants().map(SyntaxNode::kind).collect::<Vec<_>>();
        assert_eq!(kinds, [VAL_STMT, BINARY_EXPR, LITERAL, LITERAL]);

        let mut preorder = root.preorder();
        let mut entered = Vec::new();
        while let Some(event) = preorder.next() {
            if let WalkEvent::Enter(node) = event {
                entered.push(node.kind());
                if node.kind() == BINARY_EXPR {
                    preorder.skip_subtree();
                }
            }
        }
        assert_eq!(entered, [MODULE, VAL_STMT, BINARY_EXPR]);

        let tokens = root
            .descendants_with_tokens()
            .filter_map(NodeOrToken::into_token)
            .filter(|token| !token.is_missing())
            .count();
        assert_eq!(tokens, 6);
    }

    #[test]
    fn node_ptr() {
        let tree = SyntaxTree::new(val_stmt());
        let root = tree.root();
        let literal = root.find_child_node_at(range(12, 13), true);
        let ptr = SyntaxNodePtr::new(literal);
        assert_eq!(ptr.kind, LITERAL);
        assert_eq!(ptr.to_node(root), literal);
        assert_eq!(ptr.try_to_node(literal), None);
    }

    #[test]
    fn empty_span_enters_zero_width_nodes() {
        let mut builder = Builder::new();
        builder.start_node(MODULE);
        builder.start_node(VAL_STMT);
        builder.token(&[], VAL_KW, 3.into());
        builder.token(&SPACE, NAME, 1.into());
        builder.token(&SPACE, EQ, 1.into());
        builder.start_node(NAME_REF);
        builder.missing(
            NAME,
            [Diagnostic::error(DiagnosticCode::EXPECTED_TOKEN, 0.into(), 0.into())],
        );
        builder.finish_node();
        builder.token(&SPACE, SEMICOLON, 1.into());
        builder.finish_node();
        builder.finish_node();
        let tree = SyntaxTree::new(builder.finish());
        let root = tree.root();

        let name_ref = root.find_child_node_at(range(7, 7), true);
        assert_eq!(name_ref.kind(), NAME_REF);
        assert_eq!(name_ref.full_span(), range(7, 7));
        assert_eq!(root.find_child_node_at(range(7, 7), false), name_ref);
        assert_eq!(root.find_child_node_at(range(7, 9), true).kind(), VAL_STMT);

        let ptr = SyntaxNodePtr::new(name_ref);
        assert_eq!(ptr.range, range(7, 7));
        assert_eq!(ptr.to_node(root), name_ref);
    }

    #[test]
    fn views_of_equal_facts_in_different_trees_differ() {
        let lhs = SyntaxTree::new(val_stmt());
        let rhs = SyntaxTree::new(val_stmt());
        assert_eq!(lhs.green(), rhs.green());
        assert_ne!(lhs.root(), rhs.root());
        assert_eq!(lhs.root().green(), rhs.root().green());
    }
}
