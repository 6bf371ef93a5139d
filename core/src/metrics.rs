//! Queue health counters and periodic reporting

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

/// Running totals kept inside the queue's critical section
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub enqueued: u64,
    pub dequeued: u64,
    pub evicted: u64,
    pub underruns: u64,
}

impl Counters {
    pub fn snapshot(&self, capacity: usize, size: usize) -> QueueStats {
        QueueStats {
            capacity,
            size,
            enqueued: self.enqueued,
            dequeued: self.dequeued,
            evicted: self.evicted,
            underruns: self.underruns,
        }
    }
}

/// Point-in-time view of a queue's exchange counters
///
/// Bootstrap calls (`enqueue(None)`, the first `dequeue(None)`) only hand out
/// reserved fragments and are not counted as enqueued fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueueStats {
    /// Configured capacity
    pub capacity: usize,
    /// Fragments ready for playback when the snapshot was taken
    pub size: usize,
    /// Filled fragments handed to the queue
    pub enqueued: u64,
    /// Fragments handed to the consumer for playback
    pub dequeued: u64,
    /// Ready fragments dropped because the queue was full
    pub evicted: u64,
    /// Dequeue calls that found nothing ready
    pub underruns: u64,
}

impl QueueStats {
    /// Every enqueued fragment is accounted for: still queued, dropped, or played
    pub fn reconciles(&self) -> bool {
        self.size <= self.capacity
            && self.enqueued.checked_sub(self.evicted + self.dequeued) == Some(self.size as u64)
    }

    /// Fill level as a percentage of capacity
    pub fn fill_percent(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        (self.size as f64 / self.capacity as f64) * 100.0
    }

    /// Counter increase since an earlier snapshot of the same queue
    pub fn since(&self, earlier: &QueueStats) -> QueueStats {
        QueueStats {
            capacity: self.capacity,
            size: self.size,
            enqueued: self.enqueued.saturating_sub(earlier.enqueued),
            dequeued: self.dequeued.saturating_sub(earlier.dequeued),
            evicted: self.evicted.saturating_sub(earlier.evicted),
            underruns: self.underruns.saturating_sub(earlier.underruns),
        }
    }
}

/// Logs per-interval queue activity at debug level
#[derive(Debug, Clone)]
pub struct StatsReporter {
    interval: Duration,
    last: QueueStats,
    size_min: usize,
    size_max: usize,
    last_log_time: Instant,
}

impl StatsReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: QueueStats::default(),
            size_min: usize::MAX,
            size_max: 0,
            last_log_time: Instant::now(),
        }
    }

    /// Record a snapshot; logs a summary once per interval.
    ///
    /// Returns the per-interval delta when a summary was logged.
    pub fn observe(&mut self, stats: QueueStats) -> Option<QueueStats> {
        self.size_min = self.size_min.min(stats.size);
        self.size_max = self.size_max.max(stats.size);

        if self.last_log_time.elapsed() < self.interval {
            return None;
        }

        let delta = stats.since(&self.last);
        debug!(
            "FRAGMENT QUEUE [tid={:?}]: fill={:.1}% (size={}/{}, min={}, max={}), \
             enqueued={}, dequeued={}, evicted={}, underruns={}",
            std::thread::current().id(),
            stats.fill_percent(),
            stats.size,
            stats.capacity,
            self.size_min,
            self.size_max,
            delta.enqueued,
            delta.dequeued,
            delta.evicted,
            delta.underruns
        );

        // Reset for the next interval
        self.last = stats;
        self.size_min = stats.size;
        self.size_max = stats.size;
        self.last_log_time = Instant::now();
        Some(delta)
    }
}

impl Default for StatsReporter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
