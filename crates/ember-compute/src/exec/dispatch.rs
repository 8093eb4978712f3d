use bytemuck::Pod;
use rayon::prelude::*;

use crate::grid::GridBuffer;

/// Executes `kernel` once per cell of `out` and blocks until every cell has
/// been written.
///
/// Cells are computed independently with no ordering guarantee between them;
/// the kernel must not rely on any cross-cell state. The call returning is
/// the barrier: the output grid is fully written, or the call has not
/// returned.
pub fn dispatch<T, K>(out: &mut GridBuffer<T>, kernel: K)
where
    T: Pod + Send,
    K: Fn(u32, u32) -> T + Sync,
{
    let width = out.width() as usize;
    if width == 0 || out.is_empty() {
        return;
    }

    out.as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = kernel(x as u32, y as u32);
            }
        });
}

/// Executes `kernel` once per cell, writing its pair result into two grids of
/// identical dimensions (the CPU analog of a two-attachment render target).
///
/// Blocks until both grids are fully written.
pub fn dispatch_pair<A, B, K>(out_a: &mut GridBuffer<A>, out_b: &mut GridBuffer<B>, kernel: K)
where
    A: Pod + Send,
    B: Pod + Send,
    K: Fn(u32, u32) -> (A, B) + Sync,
{
    debug_assert!(
        out_a.width() == out_b.width() && out_a.height() == out_b.height(),
        "dispatch_pair: output grids must share dimensions"
    );

    let width = out_a.width() as usize;
    if width == 0 || out_a.is_empty() {
        return;
    }

    out_a
        .as_mut_slice()
        .par_chunks_mut(width)
        .zip(out_b.as_mut_slice().par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (row_a, row_b))| {
            for (x, (cell_a, cell_b)) in row_a.iter_mut().zip(row_b.iter_mut()).enumerate() {
                let (a, b) = kernel(x as u32, y as u32);
                *cell_a = a;
                *cell_b = b;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_writes_every_cell() {
        let mut out: GridBuffer<u32> = GridBuffer::new(16, 16);
        dispatch(&mut out, |x, y| y * 16 + x);
        for (i, &v) in out.as_slice().iter().enumerate() {
            assert_eq!(v as usize, i);
        }
    }

    #[test]
    fn dispatch_empty_grid_is_a_noop() {
        let mut out: GridBuffer<u32> = GridBuffer::new(0, 0);
        dispatch(&mut out, |_, _| 7);
        assert!(out.is_empty());
    }

    #[test]
    fn dispatch_pair_writes_both_grids() {
        let mut a: GridBuffer<u32> = GridBuffer::new(8, 8);
        let mut b: GridBuffer<f32> = GridBuffer::new(8, 8);
        dispatch_pair(&mut a, &mut b, |x, y| (x + y, (x * y) as f32));
        assert_eq!(a.at(3, 5), 8);
        assert_eq!(b.at(3, 5), 15.0);
        assert_eq!(a.at(7, 7), 14);
        assert_eq!(b.at(0, 0), 0.0);
    }

    #[test]
    fn dispatch_kernel_sees_its_own_coordinates() {
        let mut out: GridBuffer<u32> = GridBuffer::new(5, 3);
        dispatch(&mut out, |x, y| x * 100 + y);
        assert_eq!(out.at(4, 2), 402);
        assert_eq!(out.at(0, 1), 1);
    }
}
