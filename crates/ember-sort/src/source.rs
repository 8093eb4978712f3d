use ember_compute::{from_morton, GridBuffer};

/// Resolves an element's linear id to its key for the current pass.
///
/// Pass 0 reads the caller's grid, where an element's id is its row-major
/// offset; every later pass reads an internal grid, where ids are Morton
/// codes.
#[derive(Copy, Clone)]
pub(crate) struct KeySource<'a> {
    grid: &'a GridBuffer<u32>,
    linear: bool,
}

impl<'a> KeySource<'a> {
    /// Row-major id addressing (the external source-keys grid).
    pub fn linear(grid: &'a GridBuffer<u32>) -> Self {
        Self { grid, linear: true }
    }

    /// Morton id addressing (internal ping-pong grids).
    pub fn morton(grid: &'a GridBuffer<u32>) -> Self {
        Self { grid, linear: false }
    }

    #[inline]
    pub fn key(&self, id: u32) -> u32 {
        if self.linear {
            self.grid.get_linear(id)
        } else {
            let (x, y) = from_morton(id);
            self.grid.at(x, y)
        }
    }
}
