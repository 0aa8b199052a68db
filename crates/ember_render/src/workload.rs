//! Workload partitioning and synthetic scene generation.

use std::ops::Range;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::command::{RenderQueue, WorkItem};

/// Splits `len` items into `workers` contiguous ranges.
///
/// Ranges are in worker order, cover `0..len` exactly once, and differ in
/// length by at most one. Workers beyond `len` get empty ranges.
///
/// ```rust
/// use ember_render::partition_ranges;
///
/// let ranges: Vec<_> = partition_ranges(10, 4).collect();
/// assert_eq!(ranges, vec![0..2, 2..5, 5..7, 7..10]);
/// ```
pub fn partition_ranges(len: usize, workers: usize) -> impl Iterator<Item = Range<usize>> {
    let workers = workers.max(1);
    (0..workers).map(move |i| (i * len / workers)..((i + 1) * len / workers))
}

/// Generates a deterministic workload of `count` items.
///
/// Same seed, same items. Roughly 70% opaque, 20% cutoff, 10% transparent,
/// drawn from 32 meshes and 16 materials.
#[must_use]
pub fn synthetic_workload(count: usize, seed: u64) -> Vec<WorkItem> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    (0..count)
        .map(|i| {
            let queue = match rng.gen_range(0..10u8) {
                0..=6 => RenderQueue::Opaque,
                7 | 8 => RenderQueue::Cutoff,
                _ => RenderQueue::Transparent,
            };
            let item_id = u32::try_from(i).unwrap_or(u32::MAX);

            WorkItem {
                item_id,
                mesh_id: rng.gen_range(0..32),
                submesh: rng.gen_range(0..4),
                material_id: rng.gen_range(0..16),
                instance_count: rng.gen_range(1..=8),
                queue,
                priority: queue.default_priority(),
            }
        })
        .collect()
}
