//! Immutable fact ("green") trees with lazily positioned ("red") views.
//!
//! Fact nodes are built once, bottom-up, and shared freely between tree
//! versions. Tooling walks a [`SyntaxTree`], which materializes positioned
//! views with parent links and absolute offsets on demand.

mod delimited;
mod flags;
mod green;
mod syntax;
mod syntax_kind;
mod syntax_set;
mod trivia;

/// Item/separator view over alternating lists.
pub use delimited::DelimitedList;
/// Summary bits propagated up the fact tree.
pub use flags::NodeFlags;
/// Fact tree types and their builder.
pub use green::{
    Builder, GreenElement, GreenElementRef, GreenNode, GreenToken, LONG_LIST_THRESHOLD, ListShape,
    SubtreeDiagnostics,
};
/// Positioned view API.
pub use syntax::{
    NodeOrToken, Preorder, PreorderWithTokens, SyntaxElement, SyntaxNode, SyntaxNodePtr,
    SyntaxToken, SyntaxTree, TokenAtOffset, WalkEvent, WalkEventWithTokens,
};
/// Token and node kinds used throughout the tree.
pub use syntax_kind::SyntaxKind;
/// Compact set for grouping `SyntaxKind` values.
pub use syntax_set::SyntaxSet;
/// Trivia pieces attached to tokens.
pub use trivia::{TriviaPiece, TriviaPieceKind, leading_trivia, trivia_from_pieces};
