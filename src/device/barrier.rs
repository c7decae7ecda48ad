//! All-unit barrier
//!
//! Blocks each caller until every participant of the device has arrived,
//! then releases them together. Every arrival may carry a stamp; all
//! released participants observe the maximum stamp of their generation,
//! which lets modelled cycle counters line up on the latest arrival.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    pending_max: u64,
    released_max: u64,
}

/// Reusable barrier for a fixed number of participants
#[derive(Debug)]
pub struct Barrier {
    participants: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl Barrier {
    /// Create a barrier for `participants` callers (at least one)
    #[must_use]
    pub fn new(participants: usize) -> Self {
        Self {
            participants: participants.max(1),
            state: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        }
    }

    /// Number of participants per generation
    #[must_use]
    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Number of completed generations
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock_state().generation
    }

    /// Block until all participants have arrived
    pub fn arrive_and_wait(&self) {
        let _ = self.arrive_with_stamp(0);
    }

    /// Block until all participants have arrived; returns the largest stamp
    /// any participant brought to this generation
    pub fn arrive_with_stamp(&self, stamp: u64) -> u64 {
        let mut state = self.lock_state();
        state.pending_max = state.pending_max.max(stamp);
        state.arrived += 1;

        if state.arrived == self.participants {
            state.released_max = state.pending_max;
            state.pending_max = 0;
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.released.notify_all();
            return state.released_max;
        }

        // A waiter cannot miss its own release: the next generation needs
        // this caller to arrive again before released_max is overwritten.
        let generation = state.generation;
        while state.generation == generation {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.released_max
    }

    fn lock_state(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
