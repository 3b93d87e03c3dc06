use crate::{SyntaxElement, SyntaxNode, SyntaxToken};

/// Item/separator view over a list whose slots alternate `item, separator,
/// item, ...`, optionally ending in a trailing separator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelimitedList<'t> {
    list: SyntaxNode<'t>,
}

impl<'t> DelimitedList<'t> {
    pub fn new(list: SyntaxNode<'t>) -> Self {
        Self { list }
    }

    #[inline]
    pub fn syntax(self) -> SyntaxNode<'t> {
        self.list
    }

    /// Number of item slots, absent items included.
    #[inline]
    pub fn item_count(self) -> usize {
        self.list.count().div_ceil(2)
    }

    #[inline]
    pub fn separator_count(self) -> usize {
        self.list.count() / 2
    }

    /// Item `index`; `None` when the item slot is absent or out of range.
    pub fn item(self, index: usize) -> Option<SyntaxElement<'t>> {
        self.list.child_at(index.checked_mul(2)?)
    }

    /// Separator following item `index`.
    pub fn separator(self, index: usize) -> Option<SyntaxToken<'t>> {
        self.list.child_at(index.checked_mul(2)?.checked_add(1)?)?.into_token()
    }

    /// Present items in order.
    pub fn items(self) -> impl DoubleEndedIterator<Item = SyntaxElement<'t>> {
        (0..self.item_count()).filter_map(move |index| self.item(index))
    }

    /// Present separators in order.
    pub fn separators(self) -> impl DoubleEndedIterator<Item = SyntaxToken<'t>> {
        (0..self.separator_count()).filter_map(move |index| self.separator(index))
    }

    /// Whether the list ends in a separator rather than an item.
    pub fn has_trailing_separator(self) -> bool {
        let count = self.list.count();
        count != 0 && count % 2 == 0
    }

    /// Items paired with the separator that follows each of them.
    pub fn pairs(
        self,
    ) -> impl Iterator<Item = (Option<SyntaxElement<'t>>, Option<SyntaxToken<'t>>)> {
        (0..self.item_count()).map(move |index| (self.item(index), self.separator(index)))
    }
}

impl<'t> From<DelimitedList<'t>> for SyntaxNode<'t> {
    fn from(list: DelimitedList<'t>) -> Self {
        list.list
    }
}
