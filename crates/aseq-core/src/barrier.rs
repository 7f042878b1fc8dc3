//! Start barrier for multi-device reads
//!
//! A countdown starting at the number of participating threads. Each thread
//! calls [`StartBarrier::wait`] once when it reaches its final frame; the
//! thread that brings the count to zero records the release instant and
//! wakes everybody. A participant that gives up early counts down through
//! [`StartBarrier::abandon`]. The wait has no timeout: a participant that
//! never arrives blocks the others for good.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

#[derive(Debug)]
struct State {
    remaining: usize,
    released_at: Option<Instant>,
    broadcasts: usize,
}

/// Countdown barrier releasing all waiters at once
#[derive(Debug)]
pub struct StartBarrier {
    state: Mutex<State>,
    released: Condvar,
}

/// Outcome of [`StartBarrier::wait`] for one thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    is_leader: bool,
    released_at: Instant,
}

impl BarrierWaitResult {
    /// Whether this thread brought the count to zero
    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    /// When the barrier was released
    pub fn released_at(&self) -> Instant {
        self.released_at
    }
}

impl StartBarrier {
    /// Barrier for `participants` threads
    ///
    /// A barrier for zero participants starts out released.
    pub fn new(participants: usize) -> Self {
        Self {
            state: Mutex::new(State {
                remaining: participants,
                released_at: (participants == 0).then(Instant::now),
                broadcasts: 0,
            }),
            released: Condvar::new(),
        }
    }

    /// Count down once and block until every participant has arrived
    ///
    /// Calls made after the release return immediately without touching
    /// the count.
    pub fn wait(&self) -> BarrierWaitResult {
        let mut state = self.lock();
        let is_leader = self.arrive(&mut state);

        let state = self
            .released
            .wait_while(state, |s| s.released_at.is_none())
            .unwrap_or_else(PoisonError::into_inner);

        BarrierWaitResult {
            is_leader,
            // set before any waiter can leave wait_while
            released_at: state.released_at.unwrap_or_else(Instant::now),
        }
    }

    /// Count down once without waiting for the others
    ///
    /// For a participant that gives up before reaching the barrier. Returns
    /// whether this call released the barrier; after the release it does
    /// nothing.
    pub fn abandon(&self) -> bool {
        let mut state = self.lock();
        self.arrive(&mut state)
    }

    /// Participants that have not arrived yet
    pub fn remaining(&self) -> usize {
        self.lock().remaining
    }

    /// How many times the barrier broadcast its release
    pub fn broadcasts(&self) -> usize {
        self.lock().broadcasts
    }

    /// When the barrier was released, if it has been
    pub fn released_at(&self) -> Option<Instant> {
        self.lock().released_at
    }

    /// Decrement the count, releasing the waiters when it reaches zero
    fn arrive(&self, state: &mut State) -> bool {
        if state.remaining == 0 {
            return false;
        }
        state.remaining -= 1;
        if state.remaining > 0 {
            return false;
        }
        state.released_at = Some(Instant::now());
        state.broadcasts += 1;
        log::trace!("Start barrier released");
        self.released.notify_all();
        true
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_releases_all_threads_together() {
        const THREADS: usize = 8;
        let barrier = StartBarrier::new(THREADS);

        let results: Vec<(BarrierWaitResult, Instant)> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        let result = barrier.wait();
                        (result, Instant::now())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let released_at = barrier.released_at().unwrap();
        assert_eq!(barrier.remaining(), 0);
        assert_eq!(barrier.broadcasts(), 1);
        assert_eq!(results.iter().filter(|(r, _)| r.is_leader()).count(), 1);
        for (result, resumed) in &results {
            assert_eq!(result.released_at(), released_at);
            assert!(*resumed >= released_at);
        }
    }

    #[test]
    fn test_late_waiter_passes_through() {
        let barrier = StartBarrier::new(1);
        assert!(barrier.wait().is_leader());
        let late = barrier.wait();
        assert!(!late.is_leader());
        assert_eq!(barrier.remaining(), 0);
        assert_eq!(barrier.broadcasts(), 1);
    }

    #[test]
    fn test_zero_participants_is_open() {
        let barrier = StartBarrier::new(0);
        assert!(barrier.released_at().is_some());
        assert!(!barrier.wait().is_leader());
        assert_eq!(barrier.broadcasts(), 0);
    }

    #[test]
    fn test_blocks_until_last_arrival() {
        let barrier = StartBarrier::new(2);
        thread::scope(|s| {
            let waiter = s.spawn(|| barrier.wait());
            while barrier.remaining() == 2 {
                thread::yield_now();
            }
            assert_eq!(barrier.released_at(), None);
            assert!(!waiter.is_finished());

            let last = barrier.wait();
            assert!(last.is_leader());
            assert!(!waiter.join().unwrap().is_leader());
        });
    }

    #[test]
    fn test_abandon_releases_remaining_waiters() {
        let barrier = StartBarrier::new(2);
        thread::scope(|s| {
            let waiter = s.spawn(|| barrier.wait());
            while barrier.remaining() == 2 {
                thread::yield_now();
            }

            assert!(barrier.abandon());
            assert!(!waiter.join().unwrap().is_leader());
        });
        assert_eq!(barrier.remaining(), 0);
        assert_eq!(barrier.broadcasts(), 1);
    }

    #[test]
    fn test_abandon_after_release_is_a_no_op() {
        let barrier = StartBarrier::new(1);
        barrier.wait();
        assert!(!barrier.abandon());
        assert_eq!(barrier.broadcasts(), 1);

        let partial = StartBarrier::new(3);
        assert!(!partial.abandon());
        assert_eq!(partial.remaining(), 2);
        assert_eq!(partial.released_at(), None);
    }
}
