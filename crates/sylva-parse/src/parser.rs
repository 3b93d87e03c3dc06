use drop_bomb::DropBomb;
use sylva_errors::{Diagnostic, DiagnosticCode};
use sylva_syntax::{GreenElement, GreenNode, GreenToken, SyntaxKind, SyntaxSet, leading_trivia};
use text_size::TextSize;
use tracing::{debug, trace};

use crate::checkpoint::Pending;
use crate::{Checkpoint, ContextFlags, ParseContext, TokenSource};

/// Why a speculative production gave up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Mismatch {
    #[error("expected `{expected:?}`, found `{found:?}`")]
    Expected { expected: SyntaxKind, found: SyntaxKind },
    #[error("production does not apply here")]
    NotApplicable,
}

/// Builds a fact tree bottom-up while pulling tokens from `S`.
///
/// Completed children sit on one stack; completing a [`Marker`] replaces the
/// children produced since it was started with a single node.
pub struct Parser<S: TokenSource> {
    source: S,
    context: ParseContext,
    children: Vec<Output>,
    skipped: Vec<GreenElement>,
    stamp: u64,
}

/// A completed child, stamped with the write that put it on the stack.
struct Output {
    element: Option<GreenElement>,
    stamp: u64,
}

impl<S: TokenSource> Parser<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            context: ParseContext::default(),
            children: Vec::new(),
            skipped: Vec::new(),
            stamp: 0,
        }
    }

    fn push(&mut self, element: Option<GreenElement>) {
        self.stamp += 1;
        self.children.push(Output { element, stamp: self.stamp });
    }

    #[inline]
    pub fn context(&self) -> ParseContext {
        self.context
    }

    /// Number of tokens consumed or skipped so far.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.source.offset()
    }

    #[inline]
    pub fn peek_kind(&self) -> SyntaxKind {
        self.source.current().kind
    }

    #[inline]
    pub fn at(&self, kind: SyntaxKind) -> bool {
        self.peek_kind() == kind
    }

    #[inline]
    pub fn at_any(&self, set: &SyntaxSet) -> bool {
        set.contains(self.peek_kind())
    }

    /// Consumes the current token. Does nothing at `EOF`.
    pub fn advance(&mut self) {
        if self.at(SyntaxKind::EOF) {
            return;
        }
        self.bump_any();
    }

    fn bump_any(&mut self) {
        let token = self.source.current();
        let (kind, width) = (token.kind, token.width);
        let trivia = token.leading.iter().map(|piece| GreenElement::from(piece.to_green()));
        let leading = leading_trivia(self.skipped.drain(..).chain(trivia));

        self.push(Some(GreenToken::with_trivia(leading, kind, width).into()));
        self.source.bump();
    }

    /// Consumes the current token if it is `kind`.
    pub fn eat(&mut self, kind: SyntaxKind) -> bool {
        if !self.at(kind) {
            return false;
        }
        self.advance();
        true
    }

    /// Consumes `kind`, or inserts a missing `kind` token carrying an
    /// `EXPECTED_TOKEN` diagnostic.
    pub fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.eat(kind) {
            return true;
        }

        trace!(expected = ?kind, found = ?self.peek_kind(), "inserting missing token");
        self.missing(kind);
        false
    }

    /// Consumes `kind` or fails the enclosing speculation.
    pub fn require(&mut self, kind: SyntaxKind) -> Result<(), Mismatch> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(Mismatch::Expected { expected: kind, found: self.peek_kind() })
        }
    }

    /// Inserts a missing `kind` token. Pending skipped text becomes its
    /// leading trivia, so the diagnostic lands after the skipped text.
    pub fn missing(&mut self, kind: SyntaxKind) {
        let diagnostic =
            Diagnostic::error(DiagnosticCode::EXPECTED_TOKEN, TextSize::new(0), TextSize::new(0));
        let leading = leading_trivia(self.skipped.drain(..));
        self.push(Some(GreenToken::missing_with_trivia(leading, kind, [diagnostic]).into()));
    }

    /// Leaves an empty child slot, e.g. for an omitted optional part.
    pub fn absent(&mut self) {
        self.push(None);
    }

    /// Turns the current token into skipped text. It ends up in the leading
    /// trivia of the next token that is consumed. Does nothing at `EOF`.
    pub fn skip(&mut self) {
        if self.at(SyntaxKind::EOF) {
            return;
        }

        let token = self.source.current();
        let width = token.width;
        trace!(kind = ?token.kind, ?width, "skipping token");

        let trivia = token.leading.iter().map(|piece| GreenElement::from(piece.to_green()));
        self.skipped.extend(trivia);

        let diagnostic = Diagnostic::error(DiagnosticCode::SKIPPED_TEXT, TextSize::new(0), width);
        let skipped =
            GreenToken::new(SyntaxKind::SKIPPED_TOKENS, width).with_diagnostics([diagnostic]);
        self.skipped.push(skipped.into());
        self.source.bump();
    }

    /// Skips tokens until one in `recovery` or `EOF` is reached.
    pub fn skip_until(&mut self, recovery: &SyntaxSet) {
        while !self.at(SyntaxKind::EOF) && !self.at_any(recovery) {
            self.skip();
        }
    }

    /// Skips to `recovery`, then inserts a missing `expected` token.
    pub fn error_recover(&mut self, expected: SyntaxKind, recovery: &SyntaxSet) {
        self.skip_until(recovery);
        self.expect(expected);
    }

    pub fn start(&mut self) -> Marker {
        Marker::new(self.children.len() as u32)
    }

    /// Runs `f` one context level deeper with `flags` added.
    pub fn with_context<T>(&mut self, flags: ContextFlags, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.context;
        self.context = saved.enter(flags);
        let result = f(self);
        self.context = saved;
        result
    }

    /// Captures the current state. Capturing has no side effects.
    pub fn checkpoint(&self) -> Checkpoint<S::Snapshot> {
        let offset = self.source.offset();
        trace!(offset, children = self.children.len(), "checkpoint");
        Checkpoint::capture(self.context, self.source.snapshot(), offset).with_pending(Pending {
            children: self.children.len(),
            stamp: self.stamp,
            skipped: self.skipped.clone(),
        })
    }

    /// Restores the state captured by `checkpoint`, dropping everything
    /// produced since.
    ///
    /// Markers started before the checkpoint must not be completed between
    /// capturing and rewinding.
    #[track_caller]
    pub fn rewind(&mut self, checkpoint: &Checkpoint<S::Snapshot>) {
        let pending = checkpoint.pending();
        // Writes after the checkpoint only ever land above its stack height,
        // unless a completion drained below it.
        let kept = pending.children.checked_sub(1).and_then(|index| self.children.get(index));
        assert!(
            self.children.len() >= pending.children
                && kept.is_none_or(|output| output.stamp <= pending.stamp),
            "a marker started before the checkpoint was completed after it"
        );
        trace!(
            offset = checkpoint.offset(),
            dropped = self.children.len() - pending.children,
            "rewind"
        );

        self.children.truncate(pending.children);
        self.skipped.clone_from(&pending.skipped);
        self.source.restore(checkpoint.lexer().clone());
        self.context = checkpoint.context();
    }

    /// Runs a production that may turn out not to apply. On `Err` every
    /// token it consumed is handed back and its output is dropped.
    ///
    /// `f` has to complete or abandon its markers before returning `Err`.
    pub fn speculate<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Mismatch>,
    ) -> Option<T> {
        let checkpoint = self.checkpoint();
        match self.with_context(ContextFlags::SPECULATING, f) {
            Ok(value) => {
                trace!(from = checkpoint.offset(), to = self.source.offset(), "speculation kept");
                Some(value)
            }
            Err(mismatch) => {
                trace!(from = checkpoint.offset(), %mismatch, "speculation rolled back");
                self.rewind(&checkpoint);
                None
            }
        }
    }

    /// Skips whatever is left, consumes `EOF` and wraps everything produced
    /// into a `kind` root node.
    pub fn finish(mut self, kind: SyntaxKind) -> GreenNode {
        self.skip_until(&SyntaxSet::EMPTY);
        self.bump_any();

        let root = GreenNode::new(kind, self.children.into_iter().map(|output| output.element));
        debug!(
            ?kind,
            width = ?root.full_width(),
            diagnostics = root.flags().contains_diagnostics(),
            "finished tree"
        );
        root
    }
}

pub struct Marker {
    position: u32,
    bomb: DropBomb,
}

impl Marker {
    fn new(pos: u32) -> Self {
        Self {
            position: pos,
            bomb: DropBomb::new("Marker must be either completed or abandoned"),
        }
    }

    /// Wraps everything produced since this marker into a `kind` node.
    #[track_caller]
    pub fn complete<S: TokenSource>(
        mut self,
        p: &mut Parser<S>,
        kind: SyntaxKind,
    ) -> CompletedMarker {
        self.bomb.defuse();
        let start = self.start(p);

        let node = GreenNode::new(kind, p.children.drain(start..).map(|output| output.element));
        p.push(Some(node.into()));
        CompletedMarker::new(self.position, kind)
    }

    /// Wraps everything produced since this marker into a `LIST` node. An
    /// empty list leaves an absent slot and no marker.
    #[track_caller]
    pub fn complete_list<S: TokenSource>(mut self, p: &mut Parser<S>) -> Option<CompletedMarker> {
        self.bomb.defuse();
        let start = self.start(p);

        let list = GreenNode::list(p.children.drain(start..).map(|output| output.element));
        let completed =
            list.is_some().then(|| CompletedMarker::new(self.position, SyntaxKind::LIST));
        p.push(list.map(GreenElement::Node));
        completed
    }

    /// Leaves everything produced since this marker to the enclosing node.
    pub fn abandon<S: TokenSource>(mut self, _p: &mut Parser<S>) {
        self.bomb.defuse();
    }

    #[track_caller]
    fn start<S: TokenSource>(&self, p: &Parser<S>) -> usize {
        let start = self.position as usize;
        assert!(start <= p.children.len(), "marker refers to output dropped by a rewind");
        start
    }
}

pub struct CompletedMarker {
    pos: u32,
    kind: SyntaxKind,
}

impl CompletedMarker {
    fn new(pos: u32, kind: SyntaxKind) -> Self {
        Self { pos, kind }
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    /// Starts a marker in front of this node, so that the node becomes the
    /// first child of whatever the new marker completes into.
    pub fn precede<S: TokenSource>(self, _p: &mut Parser<S>) -> Marker {
        Marker::new(self.pos)
    }
}
