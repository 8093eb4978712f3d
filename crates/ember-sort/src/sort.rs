//! Sort orchestration, buffer ownership, and resize management.

use anyhow::{ensure, Result};
use ember_compute::{dispatch, dispatch_pair, GridBuffer};
use log::{debug, trace};

use crate::count::CountKernel;
use crate::pyramid::CountPyramid;
use crate::reorder::ReorderKernel;
use crate::source::KeySource;
use crate::{BITS_PER_STEP, GROUP_SIZE, MAX_ELEMENTS, MAX_SORT_BITS};

/// Stable parallel radix sorter over grid-resident keys.
///
/// The sorter owns two ping-pong pairs of (keys, indices) grids plus the
/// count pyramid, all sized to a square power-of-two grid derived from the
/// element count. Buffers persist across calls and are reallocated only when
/// the required grid size changes, so per-frame sorts of stable populations
/// allocate nothing.
///
/// [`RadixSorter::sort`] drives one count → reduce → reorder triple per
/// 4-bit digit of the requested bit width. Kernels of a pass never overlap:
/// each dispatch returns only once its output grid is fully written, and the
/// exclusive borrow of `self` keeps buffers untouched by anything else for
/// the duration of the call.
pub struct RadixSorter {
    /// Internal square grid dimension; 0 until the first sort allocates.
    size: u32,
    size_log2: u32,
    /// Bumped on every storage reallocation; callers can watch this to
    /// confirm buffer reuse across frames.
    generation: u64,
    keys: [GridBuffer<u32>; 2],
    indices: [GridBuffer<u32>; 2],
    pyramid: CountPyramid,
    /// Ping-pong instance holding the most recent result, if any.
    result: Option<usize>,
}

impl RadixSorter {
    pub fn new() -> Self {
        Self {
            size: 0,
            size_log2: 0,
            generation: 0,
            keys: [GridBuffer::default(), GridBuffer::default()],
            indices: [GridBuffer::default(), GridBuffer::default()],
            pyramid: CountPyramid::empty(),
            result: None,
        }
    }

    /// Sorts `element_count` keys by their low `num_bits` bits and returns
    /// the sorted-indices grid.
    ///
    /// `keys` is the caller's grid: row-major, any dimensions, with capacity
    /// for at least `element_count` cells. It is only read. The returned
    /// grid is row-major and square; for each rank `r < element_count`,
    /// cell `r` holds the original linear id of the element with that rank,
    /// ties keeping their input order. Cells at and beyond `element_count`
    /// hold [`SENTINEL`](crate::SENTINEL).
    pub fn sort(
        &mut self,
        keys: &GridBuffer<u32>,
        element_count: u32,
        num_bits: u32,
    ) -> Result<&GridBuffer<u32>> {
        ensure!(element_count > 0, "sort: element_count must be > 0");
        ensure!(
            element_count <= MAX_ELEMENTS,
            "sort: element_count {element_count} exceeds the supported maximum {MAX_ELEMENTS}"
        );
        ensure!(
            (1..=MAX_SORT_BITS).contains(&num_bits),
            "sort: num_bits must be in 1..={MAX_SORT_BITS}, got {num_bits}"
        );
        ensure!(
            keys.len() >= element_count as usize,
            "sort: keys grid holds {} cells, need {element_count}",
            keys.len()
        );

        let num_passes = num_bits.div_ceil(BITS_PER_STEP);
        self.prepare(element_count);

        trace!(
            "sort: n={element_count} bits={num_bits} passes={num_passes} grid={0}x{0}",
            self.size
        );

        let groups_log2 = 2 * self.size_log2 - GROUP_SIZE.trailing_zeros();

        let mut dst = 1usize;
        for pass in 0..num_passes {
            let src = 1 - dst;
            let source_linear = pass == 0;
            let output_linear = pass + 1 == num_passes;
            let current_bit = pass * BITS_PER_STEP;

            // Count: one cell per (digit, group) over this pass's keys.
            {
                let source = if source_linear {
                    KeySource::linear(keys)
                } else {
                    KeySource::morton(&self.keys[src])
                };
                let kernel = CountKernel::new(source, current_bit, element_count, groups_log2);
                dispatch(self.pyramid.base_mut(), |x, y| kernel.cell(x, y));
            }

            // Reduce: rebuild the block-sum levels over the fresh counts.
            self.pyramid.rebuild();

            // Reorder: route every output rank into the other ping-pong
            // instance.
            {
                let (keys_src, keys_dst) = split_pair(&mut self.keys, dst);
                let (indices_src, indices_dst) = split_pair(&mut self.indices, dst);

                let source = if source_linear {
                    KeySource::linear(keys)
                } else {
                    KeySource::morton(keys_src)
                };
                let carried = (!source_linear).then_some(&*indices_src);
                let kernel = ReorderKernel::new(
                    source,
                    carried,
                    &self.pyramid,
                    current_bit,
                    element_count,
                    self.size_log2,
                    output_linear,
                );
                dispatch_pair(keys_dst, indices_dst, |x, y| kernel.cell(x, y));
            }

            dst = src;
        }

        // After num_passes swaps: odd pass counts end in instance 1.
        let final_instance = (num_passes % 2) as usize;
        self.result = Some(final_instance);
        Ok(&self.indices[final_instance])
    }

    /// [`sort`](Self::sort) with the engine's default 16-bit key width.
    pub fn sort_default(
        &mut self,
        keys: &GridBuffer<u32>,
        element_count: u32,
    ) -> Result<&GridBuffer<u32>> {
        self.sort(keys, element_count, crate::DEFAULT_SORT_BITS)
    }

    /// Most recent sorted-indices grid, if a sort has completed since the
    /// last reallocation.
    pub fn sorted_indices(&self) -> Option<&GridBuffer<u32>> {
        self.result.map(|i| &self.indices[i])
    }

    /// Storage generation; unchanged across sorts that reuse buffers.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Internal square grid dimension (0 before the first sort).
    pub fn internal_size(&self) -> u32 {
        self.size
    }

    /// (Re)allocates grid storage when the required power-of-two size
    /// changes; otherwise leaves every buffer in place for reuse.
    fn prepare(&mut self, element_count: u32) {
        let required = required_size(element_count);
        if required == self.size {
            return;
        }

        debug!("radix sort buffers: {0}x{0} -> {1}x{1}", self.size, required);

        self.keys = [
            GridBuffer::new(required, required),
            GridBuffer::new(required, required),
        ];
        self.indices = [
            GridBuffer::new(required, required),
            GridBuffer::new(required, required),
        ];
        // 16 digits x (size^2 / 16) groups = size^2 cells: the count grid
        // shares the key grid's dimension at this radix/group-size pairing.
        self.pyramid = CountPyramid::new(required);
        self.size = required;
        self.size_log2 = required.trailing_zeros();
        self.generation += 1;
        self.result = None;
    }
}

impl Default for RadixSorter {
    fn default() -> Self {
        Self::new()
    }
}

/// Smallest power-of-two `S` with `S^2 >= element_count`, clamped to 4 so
/// the count grid always holds one cell per digit of at least one group.
fn required_size(element_count: u32) -> u32 {
    let side = (element_count - 1).isqrt() + 1;
    side.next_power_of_two().max(4)
}

/// Splits a ping-pong pair into (read instance, write instance).
fn split_pair<T>(pair: &mut [T; 2], dst: usize) -> (&T, &mut T) {
    let (a, b) = pair.split_at_mut(1);
    if dst == 1 {
        (&a[0], &mut b[0])
    } else {
        (&b[0], &mut a[0])
    }
}
