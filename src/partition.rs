//! Splits an ordered item list into service-sized chunks.

/// A contiguous slice of the input plus its starting offset.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a, T> {
    pub offset: usize,
    pub items: &'a [T],
}

/// Partition `items` into chunks of at most `limit` items each.
///
/// Produces `ceil(len / limit)` chunks in input order; every chunk holds
/// exactly `limit` items except possibly the last. Empty input produces no
/// chunks. `limit` must be positive.
pub fn partition<T>(items: &[T], limit: usize) -> Vec<Chunk<'_, T>> {
    assert!(limit > 0, "batch limit must be positive");
    items
        .chunks(limit)
        .enumerate()
        .map(|(i, items)| Chunk {
            offset: i * limit,
            items,
        })
        .collect()
}
