//! Ember compute substrate.
//!
//! This crate owns the grid-resident buffer model and the kernel-execution
//! facility used by the engine's data-parallel subsystems. A kernel is a pure
//! function from an output cell coordinate to a cell value; [`exec::dispatch`]
//! applies it across a whole [`grid::GridBuffer`] in parallel and returns only
//! once every cell is written.

pub mod exec;
pub mod grid;
pub mod logging;

pub use exec::{dispatch, dispatch_pair};
pub use grid::{from_morton, to_morton, GridBuffer};
