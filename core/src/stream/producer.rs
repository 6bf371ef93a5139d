//! Emulation-side endpoint

use std::sync::Arc;

use crate::queue::{Fragment, FragmentQueue, QueueError};

/// Writes generated samples into fragments and submits them when full
///
/// Holds the producer's fragment between calls. The first write performs the
/// queue's bootstrap call, so no fragment is taken until audio is produced.
pub struct FragmentProducer {
    queue: Arc<FragmentQueue>,
    current: Option<Fragment>,
    /// Samples already written into `current`
    position: usize,
}

impl FragmentProducer {
    pub fn new(queue: Arc<FragmentQueue>) -> Self {
        Self {
            queue,
            current: None,
            position: 0,
        }
    }

    pub fn queue(&self) -> &Arc<FragmentQueue> {
        &self.queue
    }

    /// Samples written into the fragment that has not been submitted yet
    pub fn pending(&self) -> usize {
        self.position
    }

    /// Copy interleaved samples into the queue.
    ///
    /// Fragments are submitted as they fill up; a partly filled fragment is
    /// kept until later writes complete it. Returns the number of fragments
    /// submitted by this call.
    pub fn write(&mut self, mut samples: &[i16]) -> Result<usize, QueueError> {
        if self.queue.samples_per_fragment() == 0 {
            return Ok(0);
        }

        let mut submitted = 0;

        while !samples.is_empty() {
            let mut fragment = match self.current.take() {
                Some(fragment) => fragment,
                None => {
                    self.position = 0;
                    self.queue.enqueue(None)?
                }
            };

            let free = &mut fragment[self.position..];
            let count = free.len().min(samples.len());
            free[..count].copy_from_slice(&samples[..count]);
            self.position += count;
            samples = &samples[count..];

            if self.position == fragment.len() {
                self.current = Some(self.queue.enqueue(Some(fragment))?);
                self.position = 0;
                submitted += 1;
            } else {
                self.current = Some(fragment);
            }
        }

        Ok(submitted)
    }

    /// Write a single frame (one sample for mono, a left/right pair for stereo)
    pub fn push_frame(&mut self, frame: &[i16]) -> Result<bool, QueueError> {
        debug_assert_eq!(frame.len(), self.queue.channels());
        Ok(self.write(frame)? > 0)
    }

    /// Hand the current fragment to the queue and start a new one.
    ///
    /// Unwritten samples are zeroed first, since a recycled fragment still
    /// holds audio from an earlier pass.
    pub fn submit(&mut self) -> Result<(), QueueError> {
        if let Some(fragment) = self.current.as_mut() {
            fragment[self.position..].fill(0);
        }
        let next = self.queue.enqueue(self.current.take())?;
        self.current = Some(next);
        self.position = 0;
        Ok(())
    }
}

impl std::fmt::Debug for FragmentProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentProducer")
            .field("current", &self.current)
            .field("position", &self.position)
            .finish()
    }
}
