//! Reorder kernel.

use ember_compute::{from_morton, to_morton, GridBuffer};

use crate::pyramid::CountPyramid;
use crate::source::KeySource;
use crate::{DIGIT_MASK, GROUP_SIZE, SENTINEL};

/// Routes every output rank to its source element.
///
/// Each output cell resolves independently: a top-down descent through the
/// count pyramid locates the (digit, group) bucket containing the cell's
/// rank, then a source-order rescan of that group's at-most-16 elements
/// picks the exact match. Scanning in source order is what preserves input
/// order among equal digits.
///
/// Cells whose rank falls outside the sorted range write the sentinel pair
/// `(SENTINEL, SENTINEL)`.
pub struct ReorderKernel<'a> {
    keys: KeySource<'a>,
    /// Indices carried from the previous pass; `None` on pass 0, where an
    /// element's index is its own linear id.
    indices: Option<&'a GridBuffer<u32>>,
    pyramid: &'a CountPyramid,
    current_bit: u32,
    element_count: u32,
    size_log2: u32,
    /// The final pass writes row-major ranks for external consumption;
    /// interior passes write Morton ranks.
    output_linear: bool,
}

impl<'a> ReorderKernel<'a> {
    pub(crate) fn new(
        keys: KeySource<'a>,
        indices: Option<&'a GridBuffer<u32>>,
        pyramid: &'a CountPyramid,
        current_bit: u32,
        element_count: u32,
        size_log2: u32,
        output_linear: bool,
    ) -> Self {
        Self {
            keys,
            indices,
            pyramid,
            current_bit,
            element_count,
            size_log2,
            output_linear,
        }
    }

    /// `(key, index)` for the output cell at `(x, y)`.
    pub fn cell(&self, x: u32, y: u32) -> (u32, u32) {
        let rank = if self.output_linear {
            (y << self.size_log2) + x
        } else {
            to_morton(x, y)
        };

        if rank >= self.element_count || rank >= self.pyramid.total() {
            return (SENTINEL, SENTINEL);
        }

        let (prefix, cx, cy) = self.descend(rank);

        // Level-0 cell -> (digit, group), digit-major in Morton scan order.
        let m = to_morton(cx, cy);
        let groups_log2 = 2 * self.size_log2 - GROUP_SIZE.trailing_zeros();
        let digit = m >> groups_log2;
        let group = m & ((1 << groups_log2) - 1);

        let mut remaining = rank - prefix;
        let first = group * GROUP_SIZE;
        for slot in 0..GROUP_SIZE {
            let id = first + slot;
            if id >= self.element_count {
                break;
            }
            let key = self.keys.key(id);
            if (key >> self.current_bit) & DIGIT_MASK == digit {
                if remaining == 0 {
                    let index = match self.indices {
                        Some(grid) => {
                            let (ix, iy) = from_morton(id);
                            grid.at(ix, iy)
                        }
                        None => id,
                    };
                    return (key, index);
                }
                remaining -= 1;
            }
        }

        // The descent bounds the rank by this cell's count; running off the
        // group means the pyramid and the key grid disagree.
        debug_assert!(false, "reorder: rank {rank} missing from its bucket");
        (SENTINEL, SENTINEL)
    }

    /// Walks the pyramid from the root down to a level-0 cell, returning the
    /// prefix sum of all earlier cells plus the cell's coordinate.
    ///
    /// Children are visited bottom-left, bottom-right, top-left, top-right —
    /// the Morton scan order of the count grid. This visitation order is
    /// load-bearing for stability. The fourth child needs no sum check: a
    /// rank inside this node but not in the first three children must be in
    /// the fourth.
    fn descend(&self, rank: u32) -> (u32, u32, u32) {
        let mut prefix = 0u32;
        let (mut cx, mut cy) = (0u32, 0u32);
        let mut level = self.pyramid.top_level();

        while level > 0 {
            level -= 1;
            cx <<= 1;
            cy <<= 1;

            let mut descended = false;
            for (dx, dy) in [(0u32, 0u32), (1, 0), (0, 1)] {
                let sum = self.pyramid.block_sum(level, cx + dx, cy + dy);
                if rank < prefix + sum {
                    cx += dx;
                    cy += dy;
                    descended = true;
                    break;
                }
                prefix += sum;
            }
            if !descended {
                cx += 1;
                cy += 1;
            }
        }

        (prefix, cx, cy)
    }
}
