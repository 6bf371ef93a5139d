use super::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

fn queue(capacity: usize) -> FragmentQueue {
    FragmentQueue::new(8, capacity, false, 44_100)
}

/// Fill a fragment with a marker value so it can be recognized after a round trip
fn stamp(fragment: &mut Fragment, marker: i16) {
    fragment.fill(marker);
}

/// Drain everything ready, returning the markers in playback order
fn drain(queue: &FragmentQueue, held: &mut Option<Fragment>) -> Vec<i16> {
    let mut markers = Vec::new();
    loop {
        match queue.dequeue(held.take()).unwrap() {
            Dequeued::Ready(fragment) => {
                markers.push(fragment[0]);
                *held = Some(fragment);
            }
            Dequeued::Underrun(back) => {
                *held = back;
                return markers;
            }
        }
    }
}

// =============================================================
// Bootstrap tests
// =============================================================

#[test]
fn test_bootstrap_round_trip() {
    let q = queue(4);
    let mut producing = q.enqueue(None).unwrap();
    stamp(&mut producing, 42);
    let producing = q.enqueue(Some(producing)).unwrap();
    assert_eq!(q.size(), 1);

    let played = q.dequeue(None).unwrap();
    let Dequeued::Ready(played) = played else {
        panic!("expected a ready fragment");
    };
    assert!(played.iter().all(|&s| s == 42));
    assert_eq!(q.size(), 0);
    assert_ne!(played.id(), producing.id());
}

#[test]
fn test_bootstrap_enqueue_returns_unused_fragment() {
    let q = queue(4);
    let first = q.enqueue(None).unwrap();
    // The bootstrap fragment is one of the two reserved slots
    assert_eq!(first.id().index(), 4);
    assert_eq!(q.size(), 0);
    assert!(q.ready_fragment_ids().is_empty());
}

#[test]
fn test_second_empty_enqueue_is_rejected() {
    let q = queue(4);
    let _first = q.enqueue(None).unwrap();
    let err = q.enqueue(None).unwrap_err();
    assert!(matches!(
        err,
        QueueError::BootstrapSpent {
            side: Side::Producer
        }
    ));
}

#[test]
fn test_underrun_does_not_spend_dequeue_bootstrap() {
    let q = queue(4);
    // Consumer starts before the producer delivers anything
    for _ in 0..3 {
        assert!(matches!(q.dequeue(None).unwrap(), Dequeued::Underrun(None)));
    }

    let fragment = q.enqueue(None).unwrap();
    q.enqueue(Some(fragment)).unwrap();
    assert!(matches!(q.dequeue(None).unwrap(), Dequeued::Ready(_)));
}

#[test]
fn test_second_empty_dequeue_is_rejected() {
    let q = queue(4);
    let mut producing = q.enqueue(None).unwrap();
    for _ in 0..2 {
        producing = q.enqueue(Some(producing)).unwrap();
    }

    let _played = q.dequeue(None).unwrap().into_fragment().unwrap();
    let err = q.dequeue(None).unwrap_err();
    assert!(matches!(
        err,
        QueueError::BootstrapSpent {
            side: Side::Consumer
        }
    ));
    // The rejected call changed nothing
    assert_eq!(q.size(), 1);
}

#[test]
fn test_second_empty_dequeue_is_rejected_on_empty_queue() {
    let q = queue(4);
    let producing = q.enqueue(None).unwrap();
    let _producing = q.enqueue(Some(producing)).unwrap();

    assert!(matches!(q.dequeue(None).unwrap(), Dequeued::Ready(_)));
    assert_eq!(q.size(), 0);

    // Nothing is ready, but the bootstrap is already spent
    let err = q.dequeue(None).unwrap_err();
    assert!(matches!(
        err,
        QueueError::BootstrapSpent {
            side: Side::Consumer
        }
    ));
    assert_eq!(q.stats().underruns, 0);
}

// =============================================================
// Lock poisoning tests
// =============================================================

#[test]
fn test_poisoned_lock_is_recovered() {
    let q = Arc::new(queue(2));
    let producing = q.enqueue(None).unwrap();
    let producing = q.enqueue(Some(producing)).unwrap();

    let poisoner = q.clone();
    let result = thread::spawn(move || {
        let _guard = poisoner.shared.lock().unwrap();
        panic!("panic while holding the queue lock");
    })
    .join();
    assert!(result.is_err());
    assert!(q.shared.is_poisoned());

    assert_eq!(q.size(), 1);
    // Recovery clears the poison flag
    assert!(!q.shared.is_poisoned());

    let _producing = q.enqueue(Some(producing)).unwrap();
    assert_eq!(q.size(), 2);
    assert!(matches!(q.dequeue(None).unwrap(), Dequeued::Ready(_)));
    assert_eq!(q.size(), 1);
    assert!(q.stats().reconciles());
}

// =============================================================
// Ordering and overrun tests
// =============================================================

#[test]
fn test_fifo_order() {
    let q = queue(6);
    let mut producing = q.enqueue(None).unwrap();
    for marker in 0..6 {
        stamp(&mut producing, marker);
        producing = q.enqueue(Some(producing)).unwrap();
    }
    assert_eq!(q.size(), 6);

    let mut held = None;
    assert_eq!(drain(&q, &mut held), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(q.size(), 0);
}

#[test]
fn test_overrun_evicts_oldest() {
    let q = queue(3);
    let mut producing = q.enqueue(None).unwrap();
    for marker in 0..5 {
        stamp(&mut producing, marker);
        producing = q.enqueue(Some(producing)).unwrap();
    }

    assert_eq!(q.size(), 3);
    let stats = q.stats();
    assert_eq!(stats.enqueued, 5);
    assert_eq!(stats.evicted, 2);
    assert!(stats.reconciles());

    // The producer got the dropped fragment back as its next fill target
    assert_eq!(producing[0], 1);

    let mut held = None;
    assert_eq!(drain(&q, &mut held), vec![2, 3, 4]);
}

#[test]
fn test_interleaved_fifo_across_wraparound() {
    let q = queue(3);
    let mut producing = q.enqueue(None).unwrap();
    let mut held = None;
    let mut played = Vec::new();

    for marker in 0..20 {
        stamp(&mut producing, marker);
        producing = q.enqueue(Some(producing)).unwrap();
        if marker % 2 == 1 {
            played.extend(drain(&q, &mut held));
        }
    }

    assert_eq!(played, (0..20).collect::<Vec<_>>());
}

// =============================================================
// Underrun tests
// =============================================================

#[test]
fn test_underrun_hands_fragment_back() {
    let q = queue(2);
    let mut producing = q.enqueue(None).unwrap();
    stamp(&mut producing, 9);
    q.enqueue(Some(producing)).unwrap();

    let played = q.dequeue(None).unwrap().into_fragment().unwrap();
    let played_id = played.id();

    match q.dequeue(Some(played)).unwrap() {
        Dequeued::Underrun(Some(back)) => {
            assert_eq!(back.id(), played_id);
            assert_eq!(back[0], 9);
        }
        other => panic!("expected underrun with fragment, got {:?}", other),
    }
    assert_eq!(q.size(), 0);
    assert_eq!(q.stats().underruns, 1);
}

// =============================================================
// Ownership tests
// =============================================================

#[test]
fn test_foreign_fragment_is_rejected_and_returned() {
    let a = queue(2);
    let b = queue(2);
    let from_a = a.enqueue(None).unwrap();
    let id = from_a.id();

    let err = b.enqueue(Some(from_a)).unwrap_err();
    let back = err.into_fragment().unwrap();
    assert_eq!(back.id(), id);
    assert_eq!(b.size(), 0);

    let err = b.dequeue(Some(back)).unwrap_err();
    assert!(matches!(err, QueueError::ForeignFragment { .. }));
}

#[test]
fn test_no_duplication_and_bounded_pool() {
    let capacity = 4;
    let q = queue(capacity);
    let mut rng = Pcg32::seed_from_u64(0x5eed);

    let mut producing = q.enqueue(None).unwrap();
    let mut held: Option<Fragment> = None;
    let mut seen = HashSet::new();

    for _ in 0..2_000 {
        if rng.random_bool(0.5) {
            producing = q.enqueue(Some(producing)).unwrap();
        } else {
            held = q.dequeue(held.take()).unwrap().into_fragment();
        }

        let ready = q.ready_fragment_ids();
        assert!(ready.len() <= capacity);
        assert_eq!(ready.len(), q.size());

        let mut ids: Vec<FragmentId> = ready;
        ids.push(producing.id());
        ids.extend(held.as_ref().map(Fragment::id));

        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len(), "fragment held in two places");
        seen.extend(unique);
    }

    assert!(seen.len() <= capacity + 2);
    assert!(seen.iter().all(|id| id.index() < capacity + 2));
    assert!(q.stats().reconciles());
}

// =============================================================
// Degenerate capacity
// =============================================================

#[test]
fn test_zero_capacity_drops_everything() {
    let q = queue(0);
    let mut producing = q.enqueue(None).unwrap();
    let id = producing.id();
    for _ in 0..3 {
        producing = q.enqueue(Some(producing)).unwrap();
        assert_eq!(producing.id(), id);
    }
    assert_eq!(q.size(), 0);
    assert!(q.dequeue(None).unwrap().is_underrun());

    let stats = q.stats();
    assert_eq!(stats.evicted, 3);
    assert!(stats.reconciles());
}

// =============================================================
// Accessor tests
// =============================================================

#[test]
fn test_accessors() {
    let q = FragmentQueue::new(512, 5, true, 48_000);
    assert_eq!(q.capacity(), 5);
    assert_eq!(q.size(), 0);
    assert!(q.is_stereo());
    assert_eq!(q.fragment_size(), 512);
    assert_eq!(q.sample_rate(), 48_000);
    assert_eq!(q.channels(), 2);
    assert_eq!(q.samples_per_fragment(), 1024);
}

#[test]
fn test_fragment_length_matches_layout() {
    let mono = FragmentQueue::new(128, 2, false, 44_100);
    assert_eq!(mono.enqueue(None).unwrap().len(), 128);

    let stereo = FragmentQueue::new(128, 2, true, 44_100);
    assert_eq!(stereo.enqueue(None).unwrap().len(), 256);
}
