//! Fixed-size batching.

use std::num::NonZeroUsize;

/// Split `items` into contiguous batches of at most `size` elements.
///
/// Lazy; the last batch may be shorter; empty input yields no batches.
pub fn batches<T>(items: &[T], size: NonZeroUsize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.get())
}

/// Number of batches `batches` yields for `len` items.
pub fn batch_count(len: usize, size: NonZeroUsize) -> usize {
    len.div_ceil(size.get())
}
