//! Radix-sort demo: sorts a random key population and verifies the result.
//!
//! Usage: `ember-demo [element_count] [num_bits]`
//! Element count defaults to 1,000,000 and num_bits to 16. Set `RUST_LOG`
//! (e.g. `RUST_LOG=ember_sort=debug`) for engine internals.

use std::time::Instant;

use anyhow::{ensure, Context, Result};
use ember_compute::logging::{init_logging, LoggingConfig};
use ember_compute::GridBuffer;
use ember_sort::{RadixSorter, MAX_ELEMENTS, SENTINEL};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> Result<()> {
    init_logging(LoggingConfig {
        env_filter: None,
        write_style: env_logger::WriteStyle::Auto,
    });

    let mut args = std::env::args().skip(1);
    let element_count: u32 = match args.next() {
        Some(s) => s.parse().context("element_count must be an integer")?,
        None => 1_000_000,
    };
    let num_bits: u32 = match args.next() {
        Some(s) => s.parse().context("num_bits must be an integer")?,
        None => 16,
    };
    ensure!(
        element_count > 0 && element_count <= MAX_ELEMENTS,
        "element_count must be in 1..={MAX_ELEMENTS}"
    );

    println!("ember radix sort demo");
    println!("  elements: {element_count}");
    println!("  key bits: {num_bits}");

    // Caller-side keys grid: row-major, fixed width, as a renderer would
    // hand over a depth-key texture.
    let width = 1024u32;
    let height = element_count.div_ceil(width).max(1);
    let mut rng = StdRng::seed_from_u64(0xE3BE_D000);
    let cells: Vec<u32> = (0..(width * height))
        .map(|_| rng.random::<u32>())
        .collect();
    let keys = GridBuffer::from_vec(width, height, cells);

    let mut sorter = RadixSorter::new();

    // Warm-up allocates buffers; the timed run reuses them.
    let warmup = Instant::now();
    sorter.sort(&keys, element_count, num_bits)?;
    let size = sorter.internal_size();
    log::debug!("warm-up sort took {:?} (grid {size}x{size})", warmup.elapsed());
    let generation = sorter.generation();

    let start = Instant::now();
    let sorted = sorter.sort(&keys, element_count, num_bits)?;
    let elapsed = start.elapsed();

    verify(&keys, sorted, element_count, num_bits)?;
    ensure!(
        sorter.generation() == generation,
        "timed run reallocated buffers"
    );

    let rate = element_count as f64 / elapsed.as_secs_f64() / 1.0e6;
    println!("  sorted {element_count} keys in {elapsed:?} ({rate:.1} Mkeys/s)");
    println!("  result verified: permutation, order, stability");

    Ok(())
}

/// Checks the permutation, order, and stability properties of one result.
fn verify(
    keys: &GridBuffer<u32>,
    sorted: &GridBuffer<u32>,
    element_count: u32,
    num_bits: u32,
) -> Result<()> {
    let mask = (1u32 << num_bits) - 1;
    let ranks = &sorted.as_slice()[..element_count as usize];

    let mut seen = vec![false; element_count as usize];
    let mut prev: Option<(u32, u32)> = None;
    for (rank, &index) in ranks.iter().enumerate() {
        ensure!(index < element_count, "rank {rank}: index {index} out of range");
        ensure!(!seen[index as usize], "rank {rank}: duplicate index {index}");
        seen[index as usize] = true;

        let key = keys.get_linear(index) & mask;
        if let Some((prev_key, prev_index)) = prev {
            ensure!(prev_key <= key, "rank {rank}: keys out of order");
            if prev_key == key {
                ensure!(prev_index < index, "rank {rank}: equal keys reordered");
            }
        }
        prev = Some((key, index));
    }

    ensure!(
        sorted.as_slice()[element_count as usize..]
            .iter()
            .all(|&v| v == SENTINEL),
        "trailing cells are not sentinels"
    );

    Ok(())
}
