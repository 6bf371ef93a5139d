//! Error types for fragment exchange

use std::fmt;

use super::fragment::{Fragment, FragmentId};

/// Which end of the queue made a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The emulation thread calling `enqueue`
    Producer,
    /// The output thread calling `dequeue`
    Consumer,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => write!(f, "producer"),
            Self::Consumer => write!(f, "consumer"),
        }
    }
}

/// Protocol violations detected by the queue
///
/// Underruns and overruns are not errors; they are reported through
/// [`Dequeued::Underrun`](super::Dequeued::Underrun) and the queue statistics.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// A call without a fragment was made after the first call on that side
    #[error("{side} already received its bootstrap fragment; pass back the fragment it holds")]
    BootstrapSpent { side: Side },

    /// The returned fragment was allocated by a different queue
    #[error("fragment {id} does not belong to this queue")]
    ForeignFragment { id: FragmentId, fragment: Fragment },
}

impl QueueError {
    /// Recover the fragment carried by the error, if any
    pub fn into_fragment(self) -> Option<Fragment> {
        match self {
            Self::BootstrapSpent { .. } => None,
            Self::ForeignFragment { fragment, .. } => Some(fragment),
        }
    }
}
