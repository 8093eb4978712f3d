//! Digit-count kernel.

use ember_compute::to_morton;

use crate::source::KeySource;
use crate::{DIGIT_MASK, GROUP_SIZE};

/// Counts, per output cell, how many keys of one group carry one digit.
///
/// The cell whose Morton linear id is `m` covers digit `m >> groups_log2`
/// and group `m & (num_groups - 1)`. That makes the count grid digit-major
/// in Morton scan order, which is exactly the bucket order the reorder
/// pass's prefix sums accumulate in.
///
/// Counts are written as `f32` so the averaging pyramid can be built on top
/// of the grid directly.
pub struct CountKernel<'a> {
    keys: KeySource<'a>,
    current_bit: u32,
    element_count: u32,
    groups_log2: u32,
}

impl<'a> CountKernel<'a> {
    pub(crate) fn new(
        keys: KeySource<'a>,
        current_bit: u32,
        element_count: u32,
        groups_log2: u32,
    ) -> Self {
        Self {
            keys,
            current_bit,
            element_count,
            groups_log2,
        }
    }

    /// Count for the cell at `(x, y)`: an integer in `0..=16`.
    pub fn cell(&self, x: u32, y: u32) -> f32 {
        let m = to_morton(x, y);
        let digit = m >> self.groups_log2;
        let group = m & ((1 << self.groups_log2) - 1);
        let first = group * GROUP_SIZE;

        let mut count = 0u32;
        if (first as u64) + (GROUP_SIZE as u64) <= self.element_count as u64 {
            // Full group: every slot is in range.
            for slot in 0..GROUP_SIZE {
                count += (self.digit_of(first + slot) == digit) as u32;
            }
        } else {
            // The one group straddling element_count; slots past the end are
            // excluded from the count.
            for slot in 0..GROUP_SIZE {
                let id = first + slot;
                if id >= self.element_count {
                    break;
                }
                count += (self.digit_of(id) == digit) as u32;
            }
        }

        count as f32
    }

    #[inline]
    fn digit_of(&self, id: u32) -> u32 {
        (self.keys.key(id) >> self.current_bit) & DIGIT_MASK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_compute::{dispatch, from_morton, GridBuffer};

    // 4x4 grid: 16 cells, one group, groups_log2 = 0, digit == Morton id.
    fn run_count(keys: Vec<u32>, element_count: u32, current_bit: u32) -> Vec<f32> {
        let grid = GridBuffer::from_vec(4, 4, keys);
        let mut out: GridBuffer<f32> = GridBuffer::new(4, 4);
        let kernel = CountKernel::new(
            KeySource::linear(&grid),
            current_bit,
            element_count,
            0,
        );
        dispatch(&mut out, |x, y| kernel.cell(x, y));

        // Re-read counts by digit (Morton id) for assertion convenience.
        (0..16)
            .map(|m| {
                let (x, y) = from_morton(m);
                out.at(x, y)
            })
            .collect()
    }

    #[test]
    fn uniform_keys_land_in_one_digit_cell() {
        let counts = run_count(vec![7; 16], 16, 0);
        for (digit, &c) in counts.iter().enumerate() {
            assert_eq!(c, if digit == 7 { 16.0 } else { 0.0 });
        }
    }

    #[test]
    fn one_key_per_digit() {
        let counts = run_count((0..16).collect(), 16, 0);
        assert!(counts.iter().all(|&c| c == 1.0));
    }

    #[test]
    fn partial_group_excludes_out_of_range_slots() {
        // Only the first 5 keys exist; the padding carries digit 15 and must
        // not be counted.
        let mut keys = vec![0xF; 16];
        keys[..5].copy_from_slice(&[0, 1, 2, 3, 4]);
        let counts = run_count(keys, 5, 0);
        for digit in 0..5 {
            assert_eq!(counts[digit], 1.0);
        }
        assert_eq!(counts[15], 0.0);
        assert_eq!(counts.iter().sum::<f32>(), 5.0);
    }

    #[test]
    fn current_bit_selects_the_digit_slice() {
        // Keys differ only above bit 4.
        let keys: Vec<u32> = (0..16).map(|i| (i as u32) << 4).collect();
        let low = run_count(keys.clone(), 16, 0);
        assert_eq!(low[0], 16.0);

        let high = run_count(keys, 16, 4);
        assert!(high.iter().all(|&c| c == 1.0));
    }
}
