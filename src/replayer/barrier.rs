//! Tick barrier
//!
//! A reusable N-party rendezvous with a release action. Each channel worker calls
//! [`TickBarrier::wait`] after rendering. The last one to arrive runs the release
//! action (the mix step) while the others are still parked, and only then opens the
//! barrier for everyone. Nobody can start the next tick before the current one has
//! been mixed.
//!
//! Waiters poll the stop flag, so raising it always lets every worker out. A worker
//! that dies breaks the barrier instead of leaving the others waiting for ever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::error::SyncError;

/// How often parked workers re-check the stop flag
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which side of the rendezvous a participant ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierRole {
    /// Arrived last and ran the release action
    Leader,
    /// Was released by the leader
    Follower,
}

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    broken: bool,
}

/// N-party barrier whose last arrival runs a release action.
pub struct TickBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
    action: Mutex<Box<dyn FnMut() + Send>>,
}

impl TickBarrier {
    /// Create a barrier for `parties` participants (at least one).
    pub fn new<F>(parties: usize, action: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        TickBarrier {
            parties: parties.max(1),
            state: Mutex::new(BarrierState::default()),
            cvar: Condvar::new(),
            action: Mutex::new(Box::new(action)),
        }
    }

    /// Number of participants
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Completed rendezvous so far
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// True once a participant has died
    pub fn is_broken(&self) -> bool {
        self.state.lock().broken
    }

    /// Arrive and wait for the other participants.
    ///
    /// Returns [`SyncError::Cancelled`] if `stop` is raised before the barrier opens,
    /// and [`SyncError::Broken`] if it was broken.
    pub fn wait(&self, stop: &AtomicBool) -> Result<BarrierRole, SyncError> {
        let mut state = self.state.lock();
        if state.broken {
            return Err(SyncError::Broken);
        }
        if stop.load(Ordering::Acquire) {
            return Err(SyncError::Cancelled);
        }

        state.arrived += 1;
        if state.arrived == self.parties {
            drop(state);
            {
                let mut action = self.action.lock();
                (*action)();
            }

            let mut state = self.state.lock();
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cvar.notify_all();
            return Ok(BarrierRole::Leader);
        }

        let generation = state.generation;
        loop {
            self.cvar.wait_for(&mut state, STOP_POLL_INTERVAL);
            if state.broken {
                return Err(SyncError::Broken);
            }
            if state.generation != generation {
                return Ok(BarrierRole::Follower);
            }
            if stop.load(Ordering::Acquire) {
                state.arrived = state.arrived.saturating_sub(1);
                return Err(SyncError::Cancelled);
            }
        }
    }

    /// Mark the barrier broken and wake every waiter.
    pub fn break_barrier(&self) {
        let mut state = self.state.lock();
        if !state.broken {
            tracing::error!(
                generation = state.generation,
                "tick barrier broken, a participant did not arrive"
            );
        }
        state.broken = true;
        self.cvar.notify_all();
    }
}

impl std::fmt::Debug for TickBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TickBarrier")
            .field("parties", &self.parties)
            .field("arrived", &state.arrived)
            .field("generation", &state.generation)
            .field("broken", &state.broken)
            .finish()
    }
}

/// Breaks the barrier if the owning thread unwinds.
///
/// Hold one for the whole life of each participant.
pub struct BreakOnPanic<'a> {
    barrier: &'a TickBarrier,
}

impl<'a> BreakOnPanic<'a> {
    /// Guard `barrier` for the current thread.
    pub fn new(barrier: &'a TickBarrier) -> Self {
        BreakOnPanic { barrier }
    }
}

impl Drop for BreakOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.barrier.break_barrier();
        }
    }
}
