//! Child storage specialized by child count.
//!
//! Most productions have zero, one or two children, so those shapes are
//! stored inline. Longer runs live in a boxed slice; past
//! [`LONG_LIST_THRESHOLD`] the slice is paired with precomputed child offsets
//! so offset lookups are a binary search instead of a scan.

use text_size::TextSize;

use super::GreenElement;

/// A child slot. `None` is a positional placeholder for an absent child.
pub(crate) type Slot = Option<GreenElement>;

/// Child counts above this use [`ListShape::Long`].
pub const LONG_LIST_THRESHOLD: usize = 10;

/// Storage shape of a composite fact node.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ListShape {
    Empty,
    One,
    Two,
    /// Three or more children, offsets computed by a linear scan.
    Short,
    /// Three or more children with a precomputed offset table.
    Long,
}

impl ListShape {
    /// The cheapest shape for `count` children.
    pub const fn for_count(count: usize) -> Self {
        match count {
            0 => ListShape::Empty,
            1 => ListShape::One,
            2 => ListShape::Two,
            n if n <= LONG_LIST_THRESHOLD => ListShape::Short,
            _ => ListShape::Long,
        }
    }

    /// Whether this shape can hold exactly `count` children.
    pub const fn accepts(self, count: usize) -> bool {
        match self {
            ListShape::Empty => count == 0,
            ListShape::One => count == 1,
            ListShape::Two => count == 2,
            ListShape::Short | ListShape::Long => count >= 3,
        }
    }
}

#[derive(Clone)]
pub(crate) enum Children {
    Empty,
    One(Slot),
    Two([Slot; 2]),
    Short(Box<[Slot]>),
    Long { slots: Box<[Slot]>, offsets: Box<[TextSize]> },
}

#[inline]
pub(crate) fn slot_width(slot: &Slot) -> TextSize {
    slot.as_ref().map_or(TextSize::new(0), GreenElement::full_width)
}

impl Children {
    #[track_caller]
    pub(crate) fn new(shape: ListShape, slots: Vec<Slot>) -> Self {
        assert!(
            shape.accepts(slots.len()),
            "a `{shape:?}` list cannot hold {} children",
            slots.len()
        );

        match shape {
            ListShape::Empty => Children::Empty,
            ListShape::One => Children::One(slots.into_iter().next().flatten()),
            ListShape::Two => {
                let mut slots = slots.into_iter();
                Children::Two([slots.next().flatten(), slots.next().flatten()])
            }
            ListShape::Short => Children::Short(slots.into_boxed_slice()),
            ListShape::Long => {
                let mut offset = TextSize::new(0);
                let offsets = slots
                    .iter()
                    .map(|slot| {
                        let start = offset;
                        offset += slot_width(slot);
                        start
                    })
                    .collect();
                Children::Long { slots: slots.into_boxed_slice(), offsets }
            }
        }
    }

    #[inline]
    pub(crate) fn shape(&self) -> ListShape {
        match self {
            Children::Empty => ListShape::Empty,
            Children::One(_) => ListShape::One,
            Children::Two(_) => ListShape::Two,
            Children::Short(_) => ListShape::Short,
            Children::Long { .. } => ListShape::Long,
        }
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[Slot] {
        match self {
            Children::Empty => &[],
            Children::One(slot) => std::slice::from_ref(slot),
            Children::Two(slots) => slots,
            Children::Short(slots) => slots,
            Children::Long { slots, .. } => slots,
        }
    }

    /// Sum of the widths of the children before `index`.
    #[track_caller]
    pub(crate) fn offset_at(&self, index: usize) -> TextSize {
        let slots = self.as_slice();
        assert!(
            index < slots.len(),
            "child index {index} out of range for {} children",
            slots.len()
        );
        match self {
            Children::Long { offsets, .. } => offsets[index],
            _ => slots[..index].iter().map(slot_width).sum(),
        }
    }

    /// Index of the child whose full span contains `offset`.
    #[track_caller]
    pub(crate) fn index_at_offset(&self, offset: TextSize, full_width: TextSize) -> usize {
        assert!(
            offset < full_width,
            "offset {offset:?} out of range for a node of width {full_width:?}"
        );
        match self {
            Children::Long { offsets, .. } => {
                offsets.partition_point(|&start| start <= offset) - 1
            }
            _ => linear_index_at_offset(self.as_slice(), offset),
        }
    }
}

pub(crate) fn linear_index_at_offset(slots: &[Slot], offset: TextSize) -> usize {
    let mut end = TextSize::new(0);
    for (index, slot) in slots.iter().enumerate() {
        end += slot_width(slot);
        if offset < end {
            return index;
        }
    }
    unreachable!("offset {offset:?} is past the last child")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_for_count() {
        assert_eq!(ListShape::for_count(0), ListShape::Empty);
        assert_eq!(ListShape::for_count(1), ListShape::One);
        assert_eq!(ListShape::for_count(2), ListShape::Two);
        assert_eq!(ListShape::for_count(3), ListShape::Short);
        assert_eq!(ListShape::for_count(LONG_LIST_THRESHOLD), ListShape::Short);
        assert_eq!(ListShape::for_count(LONG_LIST_THRESHOLD + 1), ListShape::Long);
    }

    #[test]
    fn accepts() {
        assert!(ListShape::Long.accepts(3));
        assert!(ListShape::Short.accepts(64));
        assert!(!ListShape::Short.accepts(2));
        assert!(!ListShape::Two.accepts(1));
        assert!(ListShape::Empty.accepts(0));
    }

    #[test]
    #[should_panic(expected = "a `Two` list cannot hold 3 children")]
    fn wrong_shape_is_rejected() {
        Children::new(ListShape::Two, vec![None, None, None]);
    }
}
