//! Trivia pieces attached to tokens.

use text_size::TextSize;

use crate::{GreenElement, GreenNode, GreenToken, SyntaxKind};

/// Kinds of trivia a lexer reports alongside tokens.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TriviaPieceKind {
    Whitespace,
    Newline,
    SingleLineComment,
}

impl TriviaPieceKind {
    /// Maps trivia piece kinds to syntax kinds.
    #[inline]
    pub fn syntax_kind(self) -> SyntaxKind {
        match self {
            TriviaPieceKind::Whitespace => SyntaxKind::WHITESPACE,
            TriviaPieceKind::Newline => SyntaxKind::NEWLINE,
            TriviaPieceKind::SingleLineComment => SyntaxKind::LINE_COMMENT,
        }
    }
}

/// A trivia fragment with its kind and length.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TriviaPiece {
    pub kind: TriviaPieceKind,
    pub len: TextSize,
}

impl TriviaPiece {
    /// Creates a new trivia piece with the given kind and length.
    pub const fn new(kind: TriviaPieceKind, len: TextSize) -> Self {
        Self { kind, len }
    }

    pub fn to_green(self) -> GreenToken {
        GreenToken::new(self.kind.syntax_kind(), self.len)
    }
}

/// Packs trivia facts into the shape a terminal stores as its leading trivia:
/// nothing, the single trivia fact, or a list of them.
pub fn leading_trivia(trivia: impl IntoIterator<Item = GreenElement>) -> Option<GreenElement> {
    let mut trivia = trivia.into_iter().map(Some).collect::<Vec<_>>();
    match trivia.len() {
        0 => None,
        1 => trivia.pop().flatten(),
        _ => GreenNode::list(trivia).map(GreenElement::Node),
    }
}

/// Converts lexer trivia pieces into leading trivia.
pub fn trivia_from_pieces(pieces: &[TriviaPiece]) -> Option<GreenElement> {
    leading_trivia(pieces.iter().map(|piece| GreenElement::Token(piece.to_green())))
}
