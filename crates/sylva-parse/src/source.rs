use std::fmt;

use sylva_syntax::{SyntaxKind, TriviaPiece};
use text_size::TextSize;

/// A token handed over by a lexer, with the trivia in front of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexedToken {
    pub kind: SyntaxKind,
    pub width: TextSize,
    pub leading: Vec<TriviaPiece>,
}

impl LexedToken {
    pub fn new(kind: SyntaxKind, width: TextSize) -> Self {
        Self { kind, width, leading: Vec::new() }
    }

    #[must_use]
    pub fn with_leading(mut self, leading: impl IntoIterator<Item = TriviaPiece>) -> Self {
        self.leading.extend(leading);
        self
    }

    pub fn leading_width(&self) -> TextSize {
        self.leading.iter().map(|piece| piece.len).sum()
    }

    pub fn full_width(&self) -> TextSize {
        self.leading_width() + self.width
    }
}

/// Token stream a [`Parser`](crate::Parser) pulls from.
///
/// A snapshot fully determines where the stream resumes after
/// [`restore`](TokenSource::restore): restoring the same snapshot twice
/// yields the same tokens both times.
pub trait TokenSource {
    type Snapshot: Clone + fmt::Debug;

    /// The token under the cursor; `EOF` once the stream is exhausted.
    fn current(&self) -> &LexedToken;

    /// Moves past the current token. Does nothing at `EOF`.
    fn bump(&mut self);

    /// Number of tokens consumed so far.
    fn offset(&self) -> u32;

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: Self::Snapshot);
}

/// [`TokenSource`] over an already lexed token vector.
#[derive(Clone, Debug)]
pub struct TokenBuffer {
    tokens: Vec<LexedToken>,
    pos: usize,
}

impl TokenBuffer {
    /// Buffers `tokens`, appending an `EOF` token unless the last one is one.
    pub fn new(tokens: impl IntoIterator<Item = LexedToken>) -> Self {
        let mut tokens = tokens.into_iter().collect::<Vec<_>>();
        if tokens.last().is_none_or(|token| token.kind != SyntaxKind::EOF) {
            tokens.push(LexedToken::new(SyntaxKind::EOF, TextSize::new(0)));
        }
        Self { tokens, pos: 0 }
    }

    pub fn tokens(&self) -> &[LexedToken] {
        &self.tokens
    }
}

impl TokenSource for TokenBuffer {
    type Snapshot = usize;

    #[inline]
    fn current(&self) -> &LexedToken {
        &self.tokens[self.pos]
    }

    #[inline]
    fn bump(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    #[inline]
    fn offset(&self) -> u32 {
        self.pos as u32
    }

    #[inline]
    fn snapshot(&self) -> usize {
        self.pos
    }

    #[track_caller]
    fn restore(&mut self, snapshot: usize) {
        assert!(snapshot < self.tokens.len(), "snapshot {snapshot} is past the end of the buffer");
        self.pos = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use sylva_syntax::TriviaPieceKind;

    use super::*;

    #[test]
    fn eof_is_appended_once() {
        let buffer = TokenBuffer::new([LexedToken::new(SyntaxKind::NAME, 3.into())]);
        assert_eq!(buffer.tokens().len(), 2);
        assert_eq!(buffer.tokens()[1].kind, SyntaxKind::EOF);

        let buffer = TokenBuffer::new(buffer.tokens().to_vec());
        assert_eq!(buffer.tokens().len(), 2);
    }

    #[test]
    fn bump_stops_at_eof() {
        let mut buffer = TokenBuffer::new([LexedToken::new(SyntaxKind::NAME, 3.into())]);
        buffer.bump();
        buffer.bump();
        assert_eq!(buffer.current().kind, SyntaxKind::EOF);
        assert_eq!(buffer.offset(), 1);

        buffer.restore(0);
        assert_eq!(buffer.current().kind, SyntaxKind::NAME);
    }

    #[test]
    fn widths() {
        let token = LexedToken::new(SyntaxKind::NAME, 3.into()).with_leading([
            TriviaPiece::new(TriviaPieceKind::Newline, 1.into()),
            TriviaPiece::new(TriviaPieceKind::Whitespace, 4.into()),
        ]);
        assert_eq!(token.leading_width(), 5.into());
        assert_eq!(token.full_width(), 8.into());
    }
}
