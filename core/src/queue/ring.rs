//! Slot ring shared by the ready queue and the free pool
//!
//! Every slot always holds a fragment. Slots `head .. head + len` (modulo
//! capacity) are ready for playback; the rest hold free fragments. Pushing
//! swaps the new fragment into the slot just past the ready region and hands
//! back whatever was there, which is a free fragment unless the ring is full,
//! in which case it is the oldest ready fragment.

use super::fragment::{Fragment, FragmentId};

/// Result of pushing a filled fragment
pub(super) struct Push {
    /// Fragment for the producer to fill next
    pub next: Fragment,
    /// Whether `next` was a ready fragment dropped to make room
    pub evicted: bool,
}

pub(super) struct Ring {
    slots: Vec<Fragment>,
    head: usize,
    len: usize,
}

impl Ring {
    /// Build a ring whose slots all start out free
    pub fn new(slots: Vec<Fragment>) -> Self {
        Self {
            slots,
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a filled fragment at the back of the ready region.
    pub fn push(&mut self, fragment: Fragment) -> Push {
        let capacity = self.capacity();
        if capacity == 0 {
            // Nothing can be queued; the fragment is dropped on arrival.
            return Push {
                next: fragment,
                evicted: true,
            };
        }

        let tail = (self.head + self.len) % capacity;
        let next = std::mem::replace(&mut self.slots[tail], fragment);

        if self.len < capacity {
            self.len += 1;
            Push {
                next,
                evicted: false,
            }
        } else {
            // tail == head: the oldest entry was just overwritten
            self.head = (self.head + 1) % capacity;
            Push {
                next,
                evicted: true,
            }
        }
    }

    /// Remove the oldest ready fragment, parking `replacement` in its slot.
    ///
    /// Returns `Err(replacement)` when nothing is ready.
    pub fn pop(&mut self, replacement: Fragment) -> Result<Fragment, Fragment> {
        if self.is_empty() {
            return Err(replacement);
        }

        let oldest = std::mem::replace(&mut self.slots[self.head], replacement);
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Ok(oldest)
    }

    /// Ids of ready fragments, oldest first
    pub fn ready_ids(&self) -> impl Iterator<Item = FragmentId> + '_ {
        let capacity = self.capacity();
        (0..self.len).map(move |offset| self.slots[(self.head + offset) % capacity].id())
    }
}
