//! Audio fragment exchange between an emulation core and an output driver
//!
//! The emulation thread produces samples at its own pace; the output thread
//! consumes them on a real-time deadline. [`FragmentQueue`] connects the two
//! with a fixed pool of sample buffers that change hands instead of being
//! copied or allocated:
//!
//! ```text
//!            enqueue(filled) ─► ┌──────────────────────┐ ─► dequeue(played)
//! Producer                      │ ready: oldest..newest│                    Consumer
//!            ◄─ next to fill    └──────────────────────┘    next to play ─►
//! ```
//!
//! # Usage
//!
//! ```
//! use vcsaudio_core::stream::{self, UnderrunPolicy};
//! use vcsaudio_core::FragmentQueue;
//!
//! let queue = FragmentQueue::new(4, 3, false, 44_100);
//! let (mut producer, mut consumer) = stream::channel(queue, UnderrunPolicy::Silence);
//!
//! producer.write(&[1, 2, 3, 4]).unwrap();
//!
//! let mut device_buffer = [0i16; 4];
//! let outcome = consumer.fill(&mut device_buffer).unwrap();
//! assert!(!outcome.underrun);
//! assert_eq!(device_buffer, [1, 2, 3, 4]);
//! ```

pub mod config;
pub mod metrics;
pub mod queue;
pub mod stream;

// Re-export public API
pub use metrics::{QueueStats, StatsReporter};
pub use queue::{Dequeued, Fragment, FragmentId, FragmentQueue, QueueError, Side};
