//! Producer and consumer endpoints over a shared fragment queue
//!
//! The queue itself exchanges whole fragments. These endpoints sit on each
//! side of it and deal in samples:
//!
//! ```text
//! Emulation Thread                                   Audio Output Thread
//!       │                                                    │
//! [Generate samples]                                         │
//!       │                                                    │
//! FragmentProducer::write ──enqueue──► FragmentQueue         │
//!                                          │                 │
//!                                          └──dequeue──► FragmentConsumer::fill
//!                                                            │
//!                                                     [Device buffer]
//! ```

mod consumer;
mod producer;


use std::sync::Arc;

use crate::queue::FragmentQueue;

pub use consumer::{FillOutcome, FragmentConsumer, UnderrunPolicy};
pub use producer::FragmentProducer;

/// Split a queue into its producer and consumer endpoints
pub fn channel(
    queue: FragmentQueue,
    policy: UnderrunPolicy,
) -> (FragmentProducer, FragmentConsumer) {
    let queue = Arc::new(queue);
    (
        FragmentProducer::new(queue.clone()),
        FragmentConsumer::new(queue, policy),
    )
}
