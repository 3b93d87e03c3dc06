//! Diagnostics stored inline on fact nodes, and walks over a subtree's
//! diagnostics.

use std::fmt;

use sylva_errors::{Diagnostic, ResolvedDiagnostic};
use text_size::TextSize;
use triomphe::ThinArc;

use super::{GreenElementRef, GreenToken};
use crate::NodeOrToken;

/// Diagnostics owned by a single fact node.
///
/// The common diagnostic-free node stores a null pointer here; nodes with
/// diagnostics share one allocation between the versions that keep them.
#[derive(Clone, Default)]
pub(crate) struct Diagnostics {
    ptr: Option<ThinArc<(), Diagnostic>>,
}

impl Diagnostics {
    pub(crate) fn new(diagnostics: impl IntoIterator<Item = Diagnostic>) -> Self {
        let diagnostics = diagnostics.into_iter().collect::<Vec<_>>();
        if diagnostics.is_empty() {
            return Self::default();
        }
        Self { ptr: Some(ThinArc::from_header_and_slice((), &diagnostics)) }
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[Diagnostic] {
        match &self.ptr {
            None => &[],
            Some(ptr) => &ptr.slice,
        }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

enum Step<'a> {
    /// Walks an element. The flag is set once an ancestor has already
    /// emitted the leading trivia of the element's first token.
    Visit(GreenElementRef<'a>, TextSize, bool),
    Emit(&'a [Diagnostic], TextSize),
}

/// Diagnostics of every node in a subtree, in document order, resolved
/// against the absolute start of the subtree.
///
/// Leading trivia comes first, then the diagnostics of the nodes starting
/// after it, outermost first, then the rest of the subtree. Subtrees without
/// `CONTAINS_DIAGNOSTICS` are not entered.
pub struct SubtreeDiagnostics<'a> {
    stack: Vec<Step<'a>>,
    current: Option<(std::slice::Iter<'a, Diagnostic>, TextSize)>,
}

impl<'a> SubtreeDiagnostics<'a> {
    pub(crate) fn new(root: GreenElementRef<'a>, full_start: TextSize) -> Self {
        Self { stack: vec![Step::Visit(root, full_start, false)], current: None }
    }

    fn visit(&mut self, element: GreenElementRef<'a>, full_start: TextSize, trivia_done: bool) {
        if !element.flags().contains_diagnostics() {
            return;
        }
        let span_start = full_start + element.leading_trivia_width();
        match element {
            NodeOrToken::Node(node) => {
                let own = node.diagnostics();
                let hoist_trivia = !trivia_done && !own.is_empty();

                let children_start = self.stack.len();
                let mut skip_pending = trivia_done || hoist_trivia;
                let mut offset = full_start;
                for child in node.children().flatten() {
                    let child = child.as_ref();
                    let skip_trivia = skip_pending && child.first_token().is_some();
                    skip_pending &= !skip_trivia;
                    self.stack.push(Step::Visit(child, offset, skip_trivia));
                    offset += child.full_width();
                }
                self.stack[children_start..].reverse();
                self.stack.push(Step::Emit(own, span_start));

                if hoist_trivia
                    && let Some(trivia) = node.first_token().and_then(GreenToken::leading_trivia)
                {
                    self.stack.push(Step::Visit(trivia.as_ref(), full_start, false));
                }
            }
            NodeOrToken::Token(token) => {
                self.stack.push(Step::Emit(token.diagnostics(), span_start));
                if !trivia_done && let Some(trivia) = token.leading_trivia() {
                    self.stack.push(Step::Visit(trivia.as_ref(), full_start, false));
                }
            }
        }
    }
}

impl Iterator for SubtreeDiagnostics<'_> {
    type Item = ResolvedDiagnostic;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((diagnostics, span_start)) = &mut self.current {
                if let Some(diagnostic) = diagnostics.next() {
                    return Some(diagnostic.resolve(*span_start));
                }
                self.current = None;
            }

            match self.stack.pop()? {
                Step::Emit(diagnostics, span_start) => {
                    self.current = Some((diagnostics.iter(), span_start));
                }
                Step::Visit(element, full_start, trivia_done) => {
                    self.visit(element, full_start, trivia_done);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use sylva_errors::DiagnosticCode;
    use text_size::TextRange;

    use super::*;
    use crate::GreenNode;
    use crate::SyntaxKind::*;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(start.into(), end.into())
    }

    #[test]
    fn own_diagnostics_follow_leading_trivia() {
        let skipped = GreenToken::new(SKIPPED_TOKENS, 2.into()).with_diagnostics([
            Diagnostic::error(DiagnosticCode::SKIPPED_TEXT, 0.into(), 2.into()),
        ]);
        let number = GreenToken::with_trivia(Some(skipped.into()), NUMBER, 1.into());
        let literal = GreenNode::new(LITERAL, [Some(number.into())]).with_diagnostics([
            Diagnostic::error(DiagnosticCode::UNEXPECTED_TOKEN, 0.into(), 1.into()),
        ]);
        let operator = GreenToken::new(BINARY_OPERATOR, 1.into()).with_diagnostics([
            Diagnostic::error(DiagnosticCode::UNEXPECTED_TOKEN, 0.into(), 1.into()),
        ]);
        let expr = GreenNode::new(BINARY_EXPR, [Some(literal.into()), Some(operator.into())])
            .with_diagnostics([Diagnostic::error(
                DiagnosticCode::EXPECTED_TOKEN,
                0.into(),
                2.into(),
            )]);

        let diagnostics = expr
            .diagnostics_in_subtree(0.into())
            .map(|diagnostic| (diagnostic.code(), diagnostic.range()))
            .collect::<Vec<_>>();
        assert_eq!(
            diagnostics,
            [
                (DiagnosticCode::SKIPPED_TEXT, range(0, 2)),
                (DiagnosticCode::EXPECTED_TOKEN, range(2, 4)),
                (DiagnosticCode::UNEXPECTED_TOKEN, range(2, 3)),
                (DiagnosticCode::UNEXPECTED_TOKEN, range(3, 4)),
            ]
        );
    }

    #[test]
    fn trivia_without_owner_diagnostics_stays_in_place() {
        let skipped = GreenToken::new(SKIPPED_TOKENS, 1.into()).with_diagnostics([
            Diagnostic::error(DiagnosticCode::SKIPPED_TEXT, 0.into(), 1.into()),
        ]);
        let name = GreenToken::with_trivia(Some(skipped.into()), NAME, 1.into());
        let node = GreenNode::new(NAME_REF, [Some(name.into())]);

        let ranges = node
            .diagnostics_in_subtree(3.into())
            .map(|diagnostic| diagnostic.range())
            .collect::<Vec<_>>();
        assert_eq!(ranges, [range(3, 4)]);
    }
}
