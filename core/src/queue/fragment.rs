//! Fragment buffers and their identity
//!
//! A fragment is a fixed-size block of interleaved `i16` samples. Every
//! fragment a queue will ever hand out is allocated when the queue is built;
//! afterwards fragments only change hands.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of unique queue identities (used to reject fragments from another queue)
static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of the queue that allocated a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct QueueId(u64);

impl QueueId {
    pub(crate) fn next() -> Self {
        Self(NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Stable index of a fragment within its queue's pool
///
/// Ids run from `0` to `capacity + 1`. They are useful for diagnostics and for
/// tests that track which buffer is where; the queue itself never exposes
/// two live handles with the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentId(usize);

impl FragmentId {
    /// Position of this fragment in the pool
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fixed-size buffer of interleaved signed 16-bit samples.
///
/// Fragments are move-only: whoever holds the value is the only party that
/// can read or write its samples. Handing it to [`FragmentQueue::enqueue`]
/// or [`FragmentQueue::dequeue`] gives up that access.
///
/// [`FragmentQueue::enqueue`]: super::FragmentQueue::enqueue
/// [`FragmentQueue::dequeue`]: super::FragmentQueue::dequeue
pub struct Fragment {
    samples: Box<[i16]>,
    id: FragmentId,
    owner: QueueId,
}

impl Fragment {
    /// Allocate the full pool for one queue, zero-filled.
    pub(crate) fn allocate_pool(
        owner: QueueId,
        count: usize,
        samples_per_fragment: usize,
    ) -> Vec<Self> {
        (0..count)
            .map(|index| Self {
                samples: vec![0; samples_per_fragment].into_boxed_slice(),
                id: FragmentId(index),
                owner,
            })
            .collect()
    }

    /// Pool index of this fragment
    pub fn id(&self) -> FragmentId {
        self.id
    }

    pub(crate) fn owner(&self) -> QueueId {
        self.owner
    }

    /// Sample data (interleaved if stereo)
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Mutable sample data (interleaved if stereo)
    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }
}

impl Deref for Fragment {
    type Target = [i16];

    fn deref(&self) -> &[i16] {
        &self.samples
    }
}

impl DerefMut for Fragment {
    fn deref_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("id", &self.id)
            .field("samples", &self.samples.len())
            .finish()
    }
}
