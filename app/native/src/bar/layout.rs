//! Placement of new blocks on the bar.
//!
//! New blocks are appended to the end of their group. When the group is
//! empty they are attached next to a neighbouring group instead (right of
//! its last block, or left of its first), so the relative order
//! left → center → right is preserved without knowing the final widths.

use super::block::{BlockId, Position};

/// Where the sink should attach a new block widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The bar is empty.
    First,
    /// Immediately to the right of the anchor.
    After(BlockId),
    /// Immediately to the left of the anchor.
    Before(BlockId),
}

/// First and last live block of one group, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub first: BlockId,
    pub last: BlockId,
}

/// The live extent of each group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupSpans {
    pub left: Option<Span>,
    pub center: Option<Span>,
    pub right: Option<Span>,
}

impl GroupSpans {
    /// Builds the spans from blocks in insertion order.
    pub fn from_blocks<I>(blocks: I) -> Self
    where I: IntoIterator<Item = (BlockId, Position)> {
        let mut spans = Self::default();
        for (id, position) in blocks {
            let slot = match position {
                Position::Left => &mut spans.left,
                Position::Center => &mut spans.center,
                Position::Right => &mut spans.right,
            };
            slot.get_or_insert(Span { first: id, last: id }).last = id;
        }
        spans
    }

    /// Computes the placement of a new block in `position`.
    ///
    /// Fallback order is same group, then center, then the opposite side.
    /// A block placed after a group goes right of its last block; one placed
    /// before a group goes left of its first.
    #[must_use]
    pub fn placement_for(&self, position: Position) -> Placement {
        let after = |span: Option<Span>| span.map(|span| Placement::After(span.last));
        let before = |span: Option<Span>| span.map(|span| Placement::Before(span.first));
        let Self { left, center, right } = *self;

        let chosen = match position {
            Position::Left => after(left).or_else(|| before(center)).or_else(|| before(right)),
            Position::Center => after(center).or_else(|| after(left)).or_else(|| before(right)),
            Position::Right => after(right).or_else(|| after(center)).or_else(|| after(left)),
        };

        chosen.unwrap_or(Placement::First)
    }
}

/// A single-row model of the bar, for sinks that do not have a real grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarLayout {
    order: Vec<BlockId>,
}

impl BarLayout {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Inserts `id` according to `placement`.
    ///
    /// An anchor that is not in the row degrades to appending.
    pub fn attach(&mut self, id: BlockId, placement: Placement) {
        self.detach(id);

        let index = match placement {
            Placement::First => None,
            Placement::After(anchor) => self.index_of(anchor).map(|idx| idx + 1),
            Placement::Before(anchor) => self.index_of(anchor),
        };

        match index {
            Some(idx) => self.order.insert(idx, id),
            None => self.order.push(id),
        }
    }

    /// Removes `id` from the row. Returns `false` if it was not present.
    pub fn detach(&mut self, id: BlockId) -> bool {
        let before = self.order.len();
        self.order.retain(|existing| *existing != id);
        self.order.len() != before
    }

    /// Block ids from left to right.
    #[must_use]
    pub fn order(&self) -> &[BlockId] { &self.order }

    #[must_use]
    pub fn len(&self) -> usize { self.order.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    fn index_of(&self, id: BlockId) -> Option<usize> {
        self.order.iter().position(|existing| *existing == id)
    }
}
