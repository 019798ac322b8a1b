//! What happens once a workflow reaches a terminal status

use super::{
    controller::{Engine, Message},
    events::{FailureReason, Outcome, WorkflowEvent},
    interpreter::Classification,
    poller::RunId,
};
use crate::{
    device_client::DeviceClient,
    types::{ConnectionInfo, DeviceStatus, WorkflowKind},
};
use anyhow::Result;
use log::{debug, info, warn};

/// Seconds left until the client reloads after a firmware update
///
/// Counts down to zero exactly once and then stays there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebootCountdown {
    remaining: u32,
    reloaded: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownStep {
    Remaining(u32),
    Reload,
}

impl RebootCountdown {
    pub fn new(start: u32) -> Self {
        Self {
            remaining: start,
            reloaded: false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Advance by one tick; `None` once the reload was already requested
    pub fn tick(&mut self) -> Option<CountdownStep> {
        if self.reloaded {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);

        if self.remaining == 0 {
            self.reloaded = true;
            Some(CountdownStep::Reload)
        } else {
            Some(CountdownStep::Remaining(self.remaining))
        }
    }

    pub fn label(&self) -> String {
        format!("Rebooting in: {}", self.remaining)
    }
}

impl<D> Engine<D>
where
    D: DeviceClient + Send + Sync + 'static,
{
    /// Act on a status reading: keep polling or finish the workflow
    pub(super) fn conclude(&mut self, kind: WorkflowKind, run: RunId, status: DeviceStatus) {
        let classification = status.classification();
        debug!("{kind} status {status:?} classified as {classification:?}");

        if classification == Classification::Continue {
            self.continue_polling(kind, run);
            return;
        }

        self.stop_kind(kind);

        match classification {
            Classification::Success => self.on_success(kind),
            Classification::Failure => {
                info!("{kind} failed: {}", status.label());
                self.fail(kind, FailureReason::DeviceReported(status.label().to_string()));
            }
            Classification::Disconnected => {
                info!("{kind} reported disconnected");
                self.emit(WorkflowEvent::completed(kind, Outcome::Disconnected));
            }
            Classification::Continue => {}
        }
    }

    fn on_success(&mut self, kind: WorkflowKind) {
        info!("{kind} succeeded");

        match kind {
            WorkflowKind::FirmwareUpdate => {
                self.emit(WorkflowEvent::completed(kind, Outcome::Success { info: None }));
                self.start_countdown();
            }
            WorkflowKind::WirelessJoin | WorkflowKind::WiredJoin => {
                // a restart or stop before the answer arrives voids it
                let run = self.poller(kind).generation();

                self.request(
                    move |device| async move {
                        match kind {
                            WorkflowKind::WiredJoin => device.eth_connect_info().await,
                            _ => device.wifi_connect_info().await,
                        }
                    },
                    move |result| Message::Info { kind, run, result },
                );
            }
        }
    }

    pub(super) fn on_info(&mut self, kind: WorkflowKind, run: RunId, result: Result<ConnectionInfo>) {
        if !self.poller(kind).is_current(run) {
            debug!("discarding stale {kind} connection info");
            return;
        }

        let info = result
            .inspect_err(|e| warn!("failed to fetch {kind} connection info: {e:#}"))
            .ok();

        self.emit(WorkflowEvent::completed(kind, Outcome::Success { info }));
    }

    fn start_countdown(&mut self) {
        if self.countdown.is_some() {
            debug!("reboot countdown already running");
            return;
        }

        let countdown = RebootCountdown::new(self.config.countdown_start);
        self.emit_status(WorkflowKind::FirmwareUpdate, countdown.label());
        self.countdown = Some(countdown);
        self.schedule_countdown_tick();
    }

    fn schedule_countdown_tick(&mut self) {
        self.countdown_timer = Some(
            self.scheduler
                .schedule(self.config.countdown_tick, Message::CountdownTick),
        );
    }

    pub(super) fn on_countdown_tick(&mut self) {
        self.countdown_timer = None;

        let Some(step) = self.countdown.as_mut().and_then(RebootCountdown::tick) else {
            return;
        };

        match step {
            CountdownStep::Remaining(_) => {
                if let Some(countdown) = &self.countdown {
                    self.emit_status(WorkflowKind::FirmwareUpdate, countdown.label());
                }
                self.schedule_countdown_tick();
            }
            CountdownStep::Reload => {
                info!("reboot countdown finished, requesting reload");
                self.countdown = None;
                self.emit(WorkflowEvent::ReloadRequested);
            }
        }
    }
}
