//! Incremental bottom-up builder for fact trees.

use rustc_hash::FxHashMap;
use sylva_errors::Diagnostic;
use text_size::TextSize;

use super::children::Slot;
use super::{GreenElement, GreenNode, GreenToken};
use crate::trivia::trivia_from_pieces;
use crate::{SyntaxKind, TriviaPiece};

const DEFAULT_TREE_DEPTH: usize = 128;
const DEFAULT_TREE_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Opened {
    kind: SyntaxKind,
    first_child: usize,
}

/// Builds a fact tree from start/token/finish events.
///
/// Children of every open node sit on one shared stack; finishing a node
/// drains its children and pushes the node in their place. Trivia-free
/// tokens are cached so equal tokens are shared.
pub struct Builder {
    children: Vec<Slot>,
    opened: Vec<Opened>,
    tokens: FxHashMap<(SyntaxKind, TextSize), GreenToken>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Builder {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.opened.is_empty() {
            panic!("you should call `Builder::finish()`");
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            children: Vec::with_capacity(DEFAULT_TREE_SIZE),
            opened: Vec::with_capacity(DEFAULT_TREE_DEPTH),
            tokens: FxHashMap::default(),
        }
    }

    /// Starts a new node of the given kind.
    pub fn start_node(&mut self, kind: SyntaxKind) {
        self.opened.push(Opened { kind, first_child: self.children.len() });
    }

    /// Finishes the most recently started node.
    #[track_caller]
    pub fn finish_node(&mut self) {
        let Opened { kind, first_child } = self.opened.pop().expect("no opened nodes?");
        let node = GreenNode::new(kind, self.children.drain(first_child..));
        self.children.push(Some(node.into()));
    }

    /// Starts a list under the current node.
    pub fn start_list(&mut self) {
        self.start_node(SyntaxKind::LIST);
    }

    /// Finishes the most recently started list. An empty list leaves an
    /// absent slot behind.
    #[track_caller]
    pub fn finish_list(&mut self) {
        let Opened { kind, first_child } = self.opened.pop().expect("no opened lists?");
        assert!(kind.is_list(), "expected an opened list, found an opened `{kind:?}` node");
        let list = GreenNode::list(self.children.drain(first_child..));
        self.children.push(list.map(GreenElement::Node));
    }

    /// Adds a token with its leading trivia.
    pub fn token(&mut self, leading_trivia: &[TriviaPiece], kind: SyntaxKind, width: TextSize) {
        let token = match trivia_from_pieces(leading_trivia) {
            None => self
                .tokens
                .entry((kind, width))
                .or_insert_with(|| GreenToken::new(kind, width))
                .clone(),
            leading => GreenToken::with_trivia(leading, kind, width),
        };
        self.children.push(Some(token.into()));
    }

    /// Adds a missing token carrying `diagnostics`.
    #[track_caller]
    pub fn missing(&mut self, kind: SyntaxKind, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.children.push(Some(GreenToken::missing(kind, diagnostics).into()));
    }

    /// Adds an absent child slot.
    pub fn absent(&mut self) {
        self.children.push(None);
    }

    /// Adds an already built element, e.g. a subtree reused from an older tree.
    pub fn element(&mut self, element: GreenElement) {
        self.children.push(Some(element));
    }

    /// Finishes building and returns the root node.
    #[track_caller]
    pub fn finish(mut self) -> GreenNode {
        assert!(self.opened.is_empty(), "unfinished nodes: {:?}", self.opened);
        assert_eq!(self.children.len(), 1, "expected exactly one root node");
        match self.children.pop() {
            Some(Some(GreenElement::Node(root))) => root,
            other => panic!("expected a root node, found {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use sylva_errors::DiagnosticCode;

    use super::*;
    use crate::SyntaxKind::*;
    use crate::{ListShape, TriviaPieceKind};

    #[test]
    fn builds_bottom_up() {
        let space = [TriviaPiece::new(TriviaPieceKind::Whitespace, 1.into())];
        let mut builder = Builder::new();
        builder.start_node(MODULE);
        builder.start_node(VAL_STMT);
        builder.token(&[], VAL_KW, 3.into());
        builder.token(&space, NAME, 1.into());
        builder.missing(
            SEMICOLON,
            [Diagnostic::error(DiagnosticCode::EXPECTED_TOKEN, 0.into(), 0.into())],
        );
        builder.finish_node();
        builder.start_list();
        builder.finish_list();
        builder.finish_node();
        let root = builder.finish();

        assert_eq!(root.kind(), MODULE);
        assert_eq!(root.shape(), ListShape::Two);
        assert!(root.child_at(1).is_none());
        assert_eq!(root.full_width(), 5.into());
        assert!(root.flags().contains_diagnostics());

        let stmt = root.child_at(0).unwrap();
        assert_eq!(stmt.kind(), VAL_STMT);
        assert_eq!(stmt.count(), 3);
        assert!(stmt.child_at(2).unwrap().is_missing());
    }

    #[test]
    fn trivia_free_tokens_are_shared() {
        let mut builder = Builder::new();
        builder.start_node(LIST);
        builder.token(&[], COMMA, 1.into());
        builder.token(&[], COMMA, 1.into());
        builder.finish_node();
        let list = builder.finish();

        assert!(list.child_at(0).unwrap().ptr_eq(list.child_at(1).unwrap()));
    }

    #[test]
    #[should_panic(expected = "unfinished nodes")]
    fn finish_with_open_nodes() {
        let mut builder = Builder::new();
        builder.start_node(MODULE);
        builder.finish();
    }
}
