//! Fragment queue
//!
//! A fixed-capacity queue that is also a pool of reusable sample buffers.
//! The emulation core fills a fragment and returns it through [`enqueue`],
//! receiving a fresh one to fill. The output driver takes fragments for
//! playback through [`dequeue`], returning the one it has just played.
//!
//! `capacity + 2` fragments exist for the lifetime of the queue: up to
//! `capacity` ready for playback, one in the producer's hand and one in the
//! consumer's hand. The two extra fragments start out reserved for each
//! side's first call, when there is nothing to give back yet.
//!
//! [`enqueue`]: FragmentQueue::enqueue
//! [`dequeue`]: FragmentQueue::dequeue

mod error;
mod fragment;
mod ring;

#[cfg(test)]
mod tests;

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, trace, warn};

use crate::metrics::{Counters, QueueStats};

pub use error::{QueueError, Side};
pub use fragment::{Fragment, FragmentId};

use fragment::QueueId;
use ring::Ring;

/// Outcome of [`FragmentQueue::dequeue`]
#[derive(Debug)]
pub enum Dequeued {
    /// The oldest ready fragment, now owned by the consumer
    Ready(Fragment),
    /// Nothing was ready. The fragment passed in (if any) is handed back
    /// unconsumed and must be passed again on the next call.
    Underrun(Option<Fragment>),
}

impl Dequeued {
    /// The fragment the consumer holds after this call
    pub fn into_fragment(self) -> Option<Fragment> {
        match self {
            Self::Ready(fragment) => Some(fragment),
            Self::Underrun(held) => held,
        }
    }

    pub fn is_underrun(&self) -> bool {
        matches!(self, Self::Underrun(_))
    }
}

/// State guarded by the queue mutex
struct Shared {
    ring: Ring,
    /// Handed out by the first `enqueue(None)`
    bootstrap_enqueue: Option<Fragment>,
    /// Parked in the pool by the first successful `dequeue(None)`
    bootstrap_dequeue: Option<Fragment>,
    counters: Counters,
}

/// Thread-safe exchange of audio fragments between one producer and one consumer
///
/// Every call takes a single short lock and only moves fragment handles, so
/// neither side can stall the other for longer than a few pointer swaps.
/// Neither call ever waits for space or data:
/// - when the ready queue is full, `enqueue` drops the oldest ready fragment
/// - when it is empty, `dequeue` reports an underrun
///
/// Share it between threads with `Arc`.
pub struct FragmentQueue {
    id: QueueId,
    fragment_size: usize,
    is_stereo: bool,
    sample_rate: u32,
    capacity: usize,
    shared: Mutex<Shared>,
}

impl FragmentQueue {
    /// Create a new queue and allocate all of its fragments.
    ///
    /// - `fragment_size`: frames per fragment
    /// - `capacity`: ready fragments that can be queued before the oldest is dropped
    /// - `is_stereo`: two interleaved samples per frame instead of one
    /// - `sample_rate`: informational, reported back by [`sample_rate`](Self::sample_rate)
    ///
    /// Arguments are trusted as given. A capacity of zero is allowed: every
    /// enqueued fragment is dropped immediately and every dequeue underruns.
    ///
    /// Each fragment is a separate boxed slice rather than a region of one
    /// shared buffer, so handing one over moves ownership without aliasing.
    /// All of them are allocated here; no later call allocates.
    pub fn new(fragment_size: usize, capacity: usize, is_stereo: bool, sample_rate: u32) -> Self {
        let id = QueueId::next();
        let channels = if is_stereo { 2 } else { 1 };

        let mut pool = Fragment::allocate_pool(id, capacity + 2, fragment_size * channels);
        let bootstrap_dequeue = pool.pop();
        let bootstrap_enqueue = pool.pop();

        debug!(
            "Fragment queue created: {} fragments of {} frames ({}), {}Hz",
            capacity + 2,
            fragment_size,
            if is_stereo { "stereo" } else { "mono" },
            sample_rate
        );

        Self {
            id,
            fragment_size,
            is_stereo,
            sample_rate,
            capacity,
            shared: Mutex::new(Shared {
                ring: Ring::new(pool),
                bootstrap_enqueue,
                bootstrap_dequeue,
                counters: Counters::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| {
            warn!("Fragment queue mutex poisoned; continuing");
            // Only the first recovery warns
            self.shared.clear_poison();
            e.into_inner()
        })
    }

    /// Queue a filled fragment and get the next one to fill.
    ///
    /// Pass `None` only on the very first call; it returns the reserved
    /// bootstrap fragment. Afterwards always pass back the fragment received
    /// from the previous call.
    ///
    /// If the ready queue is already full, its oldest fragment is dropped
    /// and returned as the next fill target. The producer is not told.
    ///
    /// # Errors
    ///
    /// - [`QueueError::BootstrapSpent`] for a second `None` call
    /// - [`QueueError::ForeignFragment`] for a fragment from another queue
    pub fn enqueue(&self, returned: Option<Fragment>) -> Result<Fragment, QueueError> {
        let returned = returned.map(|fragment| self.check_owner(fragment)).transpose()?;

        let mut shared = self.lock();

        let Some(fragment) = returned else {
            return shared
                .bootstrap_enqueue
                .take()
                .ok_or(QueueError::BootstrapSpent { side: Side::Producer });
        };

        let push = shared.ring.push(fragment);
        shared.counters.enqueued += 1;
        if push.evicted {
            shared.counters.evicted += 1;
            trace!(fragment = %push.next.id(), "Ready queue full, dropped oldest fragment");
        }

        Ok(push.next)
    }

    /// Take the oldest ready fragment for playback, returning the one just played.
    ///
    /// Pass `None` only until the first fragment has been received. When
    /// nothing is ready, the fragment passed in comes back in
    /// [`Dequeued::Underrun`] and the caller keeps playing (or silencing)
    /// with it; the consumer's bootstrap fragment is not used up by an
    /// underrun.
    ///
    /// # Errors
    ///
    /// - [`QueueError::BootstrapSpent`] for a `None` call after the first fragment was received
    /// - [`QueueError::ForeignFragment`] for a fragment from another queue
    pub fn dequeue(&self, returned: Option<Fragment>) -> Result<Dequeued, QueueError> {
        let returned = returned.map(|fragment| self.check_owner(fragment)).transpose()?;

        let mut shared = self.lock();

        if returned.is_none() && shared.bootstrap_dequeue.is_none() {
            return Err(QueueError::BootstrapSpent { side: Side::Consumer });
        }

        if shared.ring.is_empty() {
            shared.counters.underruns += 1;
            trace!("Ready queue empty, consumer underrun");
            return Ok(Dequeued::Underrun(returned));
        }

        let replacement = match returned.or_else(|| shared.bootstrap_dequeue.take()) {
            Some(fragment) => fragment,
            None => return Err(QueueError::BootstrapSpent { side: Side::Consumer }),
        };

        match shared.ring.pop(replacement) {
            Ok(oldest) => {
                shared.counters.dequeued += 1;
                Ok(Dequeued::Ready(oldest))
            }
            // Emptiness was checked under the same lock
            Err(replacement) => Ok(Dequeued::Underrun(Some(replacement))),
        }
    }

    fn check_owner(&self, fragment: Fragment) -> Result<Fragment, QueueError> {
        if fragment.owner() == self.id {
            Ok(fragment)
        } else {
            Err(QueueError::ForeignFragment {
                id: fragment.id(),
                fragment,
            })
        }
    }

    /// Number of ready fragments that fit before the oldest is dropped
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of fragments currently ready for playback
    pub fn size(&self) -> usize {
        self.lock().ring.len()
    }

    pub fn is_stereo(&self) -> bool {
        self.is_stereo
    }

    /// Frames per fragment
    pub fn fragment_size(&self) -> usize {
        self.fragment_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved samples per frame (1 or 2)
    pub fn channels(&self) -> usize {
        if self.is_stereo { 2 } else { 1 }
    }

    /// Length of every fragment's sample slice
    pub fn samples_per_fragment(&self) -> usize {
        self.fragment_size * self.channels()
    }

    /// Snapshot of the exchange counters
    pub fn stats(&self) -> QueueStats {
        let shared = self.lock();
        shared.counters.snapshot(self.capacity, shared.ring.len())
    }

    /// Ids of the ready fragments, oldest first.
    ///
    /// Diagnostic only: allocates the returned vector.
    pub fn ready_fragment_ids(&self) -> Vec<FragmentId> {
        self.lock().ring.ready_ids().collect()
    }
}

impl std::fmt::Debug for FragmentQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentQueue")
            .field("fragment_size", &self.fragment_size)
            .field("is_stereo", &self.is_stereo)
            .field("sample_rate", &self.sample_rate)
            .field("capacity", &self.capacity)
            .field("size", &self.size())
            .finish()
    }
}
