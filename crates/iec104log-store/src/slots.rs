//! Append-only slot array with lock-free readers.
//!
//! Slots live in chunks that double in size (64, 128, 256, ...), so a chunk
//! never moves once allocated and readers can hold `&T` without a lock. The
//! writer fills a slot, then publishes it by advancing `committed` with
//! release ordering; readers acquire `committed` and only touch slots below it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

const FIRST_CHUNK: usize = 64;
const CHUNK_COUNT: usize = 40;

pub(crate) struct AppendOnlySlots<T> {
    chunks: [OnceLock<Box<[OnceLock<T>]>>; CHUNK_COUNT],
    committed: AtomicUsize,
}

impl<T> AppendOnlySlots<T> {
    pub(crate) fn new() -> Self {
        Self {
            chunks: std::array::from_fn(|_| OnceLock::new()),
            committed: AtomicUsize::new(0),
        }
    }

    /// Number of published slots.
    pub(crate) fn len(&self) -> usize {
        self.committed.load(Ordering::Acquire)
    }

    /// Publish `value` at the next index and return that index.
    ///
    /// Pushes must be serialized by the caller. Returns `None` once every
    /// chunk is full.
    pub(crate) fn push(&self, value: T) -> Option<usize> {
        let index = self.committed.load(Ordering::Relaxed);
        let (chunk, offset) = locate(index)?;
        let slots = self.chunks[chunk].get_or_init(|| {
            (0..FIRST_CHUNK << chunk)
                .map(|_| OnceLock::new())
                .collect::<Vec<_>>()
                .into_boxed_slice()
        });
        let stored = slots[offset].set(value).is_ok();
        debug_assert!(stored, "slot {index} written twice");
        self.committed.store(index + 1, Ordering::Release);
        Some(index)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        let (chunk, offset) = locate(index)?;
        self.chunks[chunk].get()?.get(offset)?.get()
    }

    /// Published slots in `[start, end)`, clamped to the committed length
    /// observed when the call begins.
    pub(crate) fn range(&self, start: usize, end: usize) -> impl Iterator<Item = &T> + '_ {
        let end = end.min(self.len());
        (start..end).filter_map(move |index| {
            let (chunk, offset) = locate(index)?;
            self.chunks[chunk].get()?.get(offset)?.get()
        })
    }
}

/// Map a flat index to `(chunk, offset)`; chunk `k` holds `64 << k` slots.
fn locate(index: usize) -> Option<(usize, usize)> {
    let bucket = index / FIRST_CHUNK + 1;
    let chunk = (usize::BITS - 1 - bucket.leading_zeros()) as usize;
    if chunk >= CHUNK_COUNT {
        return None;
    }
    let chunk_start = FIRST_CHUNK * ((1usize << chunk) - 1);
    Some((chunk, index - chunk_start))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn locate_maps_chunk_boundaries() {
        assert_eq!(locate(0), Some((0, 0)));
        assert_eq!(locate(63), Some((0, 63)));
        assert_eq!(locate(64), Some((1, 0)));
        assert_eq!(locate(191), Some((1, 127)));
        assert_eq!(locate(192), Some((2, 0)));
        assert_eq!(locate(447), Some((2, 255)));
        assert_eq!(locate(448), Some((3, 0)));
    }

    #[test]
    fn push_and_read_across_chunks() {
        let slots = AppendOnlySlots::new();
        for i in 0..1_000u32 {
            assert_eq!(slots.push(i), Some(i as usize));
        }
        assert_eq!(slots.len(), 1_000);
        assert_eq!(slots.get(0), Some(&0));
        assert_eq!(slots.get(999), Some(&999));
        assert_eq!(slots.get(1_000), None);

        let window: Vec<u32> = slots.range(60, 70).copied().collect();
        assert_eq!(window, (60..70).collect::<Vec<_>>());
        assert_eq!(slots.range(995, 5_000).count(), 5);
    }

    #[test]
    fn readers_see_a_gap_free_prefix_while_writer_appends() {
        let slots = Arc::new(AppendOnlySlots::new());
        let writer = {
            let slots = Arc::clone(&slots);
            std::thread::spawn(move || {
                for i in 0..20_000usize {
                    slots.push(i);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let slots = Arc::clone(&slots);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let seen: Vec<usize> = slots.range(0, usize::MAX).copied().collect();
                        for (expected, value) in seen.iter().enumerate() {
                            assert_eq!(*value, expected);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(slots.len(), 20_000);
    }
}
