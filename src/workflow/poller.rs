//! Per-workflow poller state
//!
//! A poller holds at most one timer. Every start, and every stop of an active
//! run, moves it to a new generation; responses tagged with an older
//! generation are stale and must be dropped without touching any state.

use super::scheduler::{Scheduler, TimerHandle};
use crate::types::WorkflowKind;
use log::debug;
use std::time::Duration;

pub type RunId = u64;

#[derive(Debug, Default)]
enum PollerState {
    #[default]
    Idle,
    /// The start request is still on its way; no ticks yet
    Pending,
    Polling {
        timer: Option<TimerHandle>,
        in_flight: bool,
    },
}

#[derive(Debug)]
pub struct Poller {
    kind: WorkflowKind,
    generation: RunId,
    state: PollerState,
}

impl Poller {
    pub fn new(kind: WorkflowKind) -> Self {
        Self {
            kind,
            generation: 0,
            state: PollerState::Idle,
        }
    }

    pub fn generation(&self) -> RunId {
        self.generation
    }

    pub fn is_current(&self, run: RunId) -> bool {
        self.generation == run
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, PollerState::Idle)
    }

    pub fn has_timer(&self) -> bool {
        matches!(self.state, PollerState::Polling { timer: Some(_), .. })
    }

    pub fn in_flight(&self) -> bool {
        matches!(self.state, PollerState::Polling { in_flight: true, .. })
    }

    /// Begin a new run that polls right away, replacing any previous run
    pub fn start(&mut self) -> RunId {
        self.restart(PollerState::Polling {
            timer: None,
            in_flight: false,
        })
    }

    /// Begin a new run that waits for its start request before polling
    pub fn start_pending(&mut self) -> RunId {
        self.restart(PollerState::Pending)
    }

    fn restart(&mut self, state: PollerState) -> RunId {
        // the replaced state drops its timer
        self.state = state;
        self.generation += 1;
        debug!("{} poller started (run {})", self.kind, self.generation);
        self.generation
    }

    /// Move a pending run to polling once its start request was accepted
    pub fn activate(&mut self, run: RunId) -> bool {
        if !self.is_current(run) || !matches!(self.state, PollerState::Pending) {
            return false;
        }

        self.state = PollerState::Polling {
            timer: None,
            in_flight: false,
        };
        true
    }

    /// Stop polling and invalidate everything issued so far
    ///
    /// Stopping an idle poller is a no-op: work that outlives a terminal
    /// status, such as the connection info fetch, stays current.
    pub fn stop(&mut self) {
        if !self.is_active() {
            return;
        }

        debug!("{} poller stopped (run {})", self.kind, self.generation);

        // dropping the old state cancels its timer
        self.state = PollerState::Idle;
        self.generation += 1;
    }

    /// Arm the single timer for the next tick
    ///
    /// Refused while a tick is in flight, while a timer is already armed or
    /// when `run` is stale.
    pub fn schedule<M: Send + 'static>(
        &mut self,
        run: RunId,
        scheduler: &Scheduler<M>,
        delay: Duration,
        message: M,
    ) -> bool {
        if !self.is_current(run) {
            return false;
        }

        match &mut self.state {
            PollerState::Polling {
                timer: timer @ None,
                in_flight: false,
            } => {
                *timer = Some(scheduler.schedule(delay, message));
                true
            }
            _ => false,
        }
    }

    /// Mark a status request as issued; releases the fired timer
    pub fn begin_tick(&mut self, run: RunId) -> bool {
        if !self.is_current(run) {
            return false;
        }

        match &mut self.state {
            PollerState::Polling { timer, in_flight } if !*in_flight => {
                *timer = None;
                *in_flight = true;
                true
            }
            _ => false,
        }
    }

    /// Accept the response of the tick in flight; `false` means discard it
    pub fn finish_tick(&mut self, run: RunId) -> bool {
        if !self.is_current(run) {
            return false;
        }

        match &mut self.state {
            PollerState::Polling { in_flight, .. } if *in_flight => {
                *in_flight = false;
                true
            }
            _ => false,
        }
    }
}
