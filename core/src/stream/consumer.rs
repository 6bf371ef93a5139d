//! Output-side endpoint

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::queue::{Dequeued, Fragment, FragmentQueue, QueueError};

/// What the consumer plays when no fragment is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnderrunPolicy {
    /// Output zeros
    #[default]
    Silence,
    /// Replay the last fragment (zeros if nothing has been played yet)
    Repeat,
}

/// Result of one [`FragmentConsumer::fill`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillOutcome {
    /// Samples copied from queued fragments
    pub samples_from_queue: usize,
    /// Whether the queue ran dry before `out` was full
    pub underrun: bool,
}

/// Pulls fragments for playback and copies them into device buffers
///
/// Designed to run inside an audio callback: it never blocks, never
/// allocates, and always fills the whole output slice.
pub struct FragmentConsumer {
    queue: Arc<FragmentQueue>,
    current: Option<Fragment>,
    /// Samples of `current` already played
    position: usize,
    policy: UnderrunPolicy,
}

impl FragmentConsumer {
    pub fn new(queue: Arc<FragmentQueue>, policy: UnderrunPolicy) -> Self {
        Self {
            queue,
            current: None,
            position: 0,
            policy,
        }
    }

    pub fn queue(&self) -> &Arc<FragmentQueue> {
        &self.queue
    }

    pub fn policy(&self) -> UnderrunPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: UnderrunPolicy) {
        self.policy = policy;
    }

    /// Fill `out` with interleaved samples.
    ///
    /// Fragments are dequeued as the current one is used up. If the queue
    /// runs dry, the remainder of `out` is covered according to the
    /// underrun policy and the next call tries the queue again.
    pub fn fill(&mut self, out: &mut [i16]) -> Result<FillOutcome, QueueError> {
        let mut written = 0;

        while written < out.len() {
            let exhausted = self
                .current
                .as_ref()
                .is_none_or(|fragment| self.position >= fragment.len());

            if exhausted {
                match self.queue.dequeue(self.current.take())? {
                    Dequeued::Ready(fragment) => {
                        self.current = Some(fragment);
                        self.position = 0;
                    }
                    Dequeued::Underrun(held) => {
                        self.current = held;
                        self.cover_underrun(&mut out[written..]);
                        return Ok(FillOutcome {
                            samples_from_queue: written,
                            underrun: true,
                        });
                    }
                }
            }

            let Some(fragment) = self.current.as_ref() else {
                break;
            };
            if fragment.is_empty() {
                // Zero-length fragments carry nothing to play
                self.cover_underrun(&mut out[written..]);
                break;
            }

            let available = &fragment[self.position..];
            let count = available.len().min(out.len() - written);
            out[written..written + count].copy_from_slice(&available[..count]);
            self.position += count;
            written += count;
        }

        Ok(FillOutcome {
            samples_from_queue: written,
            underrun: false,
        })
    }

    fn cover_underrun(&self, out: &mut [i16]) {
        trace!(samples = out.len(), policy = ?self.policy, "Covering underrun");
        match (self.policy, &self.current) {
            (UnderrunPolicy::Repeat, Some(fragment)) if !fragment.is_empty() => {
                for (sample, &previous) in out.iter_mut().zip(fragment.iter().cycle()) {
                    *sample = previous;
                }
            }
            _ => out.fill(0),
        }
    }
}

impl std::fmt::Debug for FragmentConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentConsumer")
            .field("current", &self.current)
            .field("position", &self.position)
            .field("policy", &self.policy)
            .finish()
    }
}
