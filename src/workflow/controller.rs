//! The workflow engine and its public handle
//!
//! One tokio task owns all pollers and handles one message at a time. Device
//! requests and timers run as separate tasks and report back through the
//! internal channel, so workflow state is only ever touched by the engine.

use super::{
    completion::RebootCountdown,
    events::{FailureReason, Outcome, WorkflowEvent},
    poller::{Poller, RunId},
    scheduler::{Scheduler, TimerHandle},
    trigger::{Accepted, FirmwareImage, StartRequest, UploadProgress, WorkflowParams},
};
use crate::{
    config::PollingConfig,
    device_client::DeviceClient,
    error::{ValidationError, WorkflowError},
    types::{ConnectionInfo, DeviceStatus, EthConnectStatus, WifiConnectStatus, WorkflowKind},
};
use anyhow::Result;
use log::{debug, error, info, warn};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::AbortHandle};

/// Requests from the public handle
#[derive(Debug)]
enum Command {
    Start(StartRequest),
    Stop(WorkflowKind),
    Disconnect(WorkflowKind),
    Shutdown,
}

/// Results of requests and timers, posted back to the engine
#[derive(Debug)]
pub(super) enum Message {
    Started {
        kind: WorkflowKind,
        run: RunId,
        result: Result<()>,
    },
    Tick {
        kind: WorkflowKind,
        run: RunId,
    },
    Status {
        kind: WorkflowKind,
        run: RunId,
        result: Result<DeviceStatus>,
    },
    Info {
        kind: WorkflowKind,
        run: RunId,
        result: Result<ConnectionInfo>,
    },
    UploadProgress {
        run: RunId,
        progress: UploadProgress,
    },
    UploadFinished {
        run: RunId,
        result: Result<()>,
    },
    Disconnected {
        kind: WorkflowKind,
        result: Result<()>,
    },
    CountdownTick,
}

/// Handle to the workflow engine
///
/// Cloning is cheap; the engine stops after `shutdown` or once every handle
/// is dropped.
#[derive(Clone)]
pub struct WorkflowController {
    commands: mpsc::UnboundedSender<Command>,
}

impl WorkflowController {
    /// Spawn the engine on the current tokio runtime
    pub fn spawn<D>(device: D, config: PollingConfig) -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>)
    where
        D: DeviceClient + Send + Sync + 'static,
    {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let engine = Engine::new(Arc::new(device), config, internal_tx, events_tx);
        tokio::spawn(engine.run(commands_rx, internal_rx));

        (
            Self {
                commands: commands_tx,
            },
            events_rx,
        )
    }

    /// Validate `params` and hand the workflow to the engine
    ///
    /// Invalid input never reaches the device.
    pub fn start(&self, params: WorkflowParams) -> Result<Accepted, WorkflowError> {
        let kind = params.kind();

        let request = params
            .validate()
            .inspect_err(|e| warn!("rejected {kind} request: {e}"))?;

        self.send(Command::Start(request), "start", kind)?;

        Ok(Accepted { kind })
    }

    /// Stop polling for `kind`; a no-op if it is not running
    pub fn stop(&self, kind: WorkflowKind) -> Result<(), WorkflowError> {
        self.send(Command::Stop(kind), "stop", kind)
    }

    /// Stop polling for `kind` and disconnect the device from that network
    pub fn disconnect(&self, kind: WorkflowKind) -> Result<(), WorkflowError> {
        if kind == WorkflowKind::FirmwareUpdate {
            let mut error = ValidationError::default();
            error.push("a firmware update cannot be disconnected");
            return Err(error.into());
        }

        self.send(Command::Disconnect(kind), "disconnect", kind)
    }

    pub fn shutdown(&self) {
        // already stopped when this fails
        let _ = self.commands.send(Command::Shutdown);
    }

    fn send(
        &self,
        command: Command,
        action: &'static str,
        kind: WorkflowKind,
    ) -> Result<(), WorkflowError> {
        self.commands
            .send(command)
            .map_err(|_| WorkflowError::ControllerGone { action, kind })
    }
}

/// Upload bookkeeping of the current firmware run
///
/// Only the poll issued after the upload finished may fail the workflow;
/// earlier polls race the flashing device and are allowed to fail.
#[derive(Default)]
pub(super) struct FirmwareRun {
    upload: Option<AbortHandle>,
    final_poll_queued: bool,
    final_poll_issued: bool,
}

impl FirmwareRun {
    fn abort(&mut self) {
        if let Some(upload) = self.upload.take() {
            upload.abort();
        }
        *self = Self::default();
    }
}

pub(super) struct Engine<D> {
    device: Arc<D>,
    pub(super) config: PollingConfig,
    pub(super) scheduler: Scheduler<Message>,
    internal: mpsc::UnboundedSender<Message>,
    events: mpsc::UnboundedSender<WorkflowEvent>,
    pollers: [Poller; 3],
    firmware: FirmwareRun,
    pub(super) countdown: Option<RebootCountdown>,
    pub(super) countdown_timer: Option<TimerHandle>,
}

impl<D> Engine<D>
where
    D: DeviceClient + Send + Sync + 'static,
{
    fn new(
        device: Arc<D>,
        config: PollingConfig,
        internal: mpsc::UnboundedSender<Message>,
        events: mpsc::UnboundedSender<WorkflowEvent>,
    ) -> Self {
        Self {
            device,
            config,
            scheduler: Scheduler::new(internal.clone()),
            internal,
            events,
            pollers: WorkflowKind::ALL.map(Poller::new),
            firmware: FirmwareRun::default(),
            countdown: None,
            countdown_timer: None,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Message>,
    ) {
        debug!("workflow engine started");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    }
                }
                Some(message) = internal.recv() => self.handle_message(message),
            }
        }

        for kind in WorkflowKind::ALL {
            self.stop_kind(kind);
        }
        self.countdown_timer = None;

        debug!("workflow engine stopped");
    }

    fn handle_command(&mut self, command: Command) {
        debug!("handling command: {command:?}");

        match command {
            Command::Start(request) => self.start(request),
            Command::Stop(kind) => self.stop_kind(kind),
            Command::Disconnect(kind) => self.disconnect(kind),
            Command::Shutdown => {}
        }
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Started { kind, run, result } => self.on_started(kind, run, result),
            Message::Tick { kind, run } => self.on_tick(kind, run),
            Message::Status { kind, run, result } => self.on_status(kind, run, result),
            Message::Info { kind, run, result } => self.on_info(kind, run, result),
            Message::UploadProgress { run, progress } => self.on_upload_progress(run, progress),
            Message::UploadFinished { run, result } => self.on_upload_finished(run, result),
            Message::Disconnected { kind, result } => self.on_disconnected(kind, result),
            Message::CountdownTick => self.on_countdown_tick(),
        }
    }

    pub(super) fn poller(&self, kind: WorkflowKind) -> &Poller {
        &self.pollers[kind.index()]
    }

    fn poller_mut(&mut self, kind: WorkflowKind) -> &mut Poller {
        &mut self.pollers[kind.index()]
    }

    pub(super) fn emit(&self, event: WorkflowEvent) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }

    pub(super) fn emit_status(&self, kind: WorkflowKind, label: impl Into<String>) {
        self.emit(WorkflowEvent::status(kind, label));
    }

    pub(super) fn fail(&self, kind: WorkflowKind, reason: FailureReason) {
        self.emit(WorkflowEvent::completed(kind, Outcome::Failure { reason }));
    }

    /// Run a device request on its own task and post the result back
    pub(super) fn request<F, Fut, T>(&self, call: F, wrap: impl FnOnce(Result<T>) -> Message + Send + 'static)
    where
        F: FnOnce(Arc<D>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let device = Arc::clone(&self.device);
        let internal = self.internal.clone();

        tokio::spawn(async move {
            let result = call(device).await;
            // the engine is gone when this fails
            let _ = internal.send(wrap(result));
        });
    }

    /// Stop `kind` and cancel whatever it still has running
    pub(super) fn stop_kind(&mut self, kind: WorkflowKind) {
        self.poller_mut(kind).stop();

        if kind == WorkflowKind::FirmwareUpdate {
            self.firmware.abort();
        }
    }

    fn start(&mut self, request: StartRequest) {
        let kind = request.kind();
        info!("starting {kind}");

        match request {
            StartRequest::WirelessJoin(credentials) => {
                let run = self.poller_mut(kind).start();
                self.emit_status(kind, DeviceStatus::Wireless(WifiConnectStatus::Connecting).label());

                // the device answers the join request only once it gave up or
                // succeeded, the status poll is what reports progress
                self.request(
                    move |device| async move { device.connect_wifi(credentials).await },
                    move |result| Message::Started { kind, run, result },
                );
                self.schedule_tick(kind, run);
            }
            StartRequest::WiredJoin(settings) => {
                let run = self.poller_mut(kind).start_pending();
                self.emit_status(kind, DeviceStatus::Wired(EthConnectStatus::Connecting).label());

                self.request(
                    move |device| async move { device.connect_eth(settings).await },
                    move |result| Message::Started { kind, run, result },
                );
            }
            StartRequest::FirmwareUpdate(image) => {
                self.stop_kind(kind);
                let run = self.poller_mut(kind).start();
                self.emit_status(
                    kind,
                    format!("Uploading {}, firmware update in progress...", image.file_name),
                );
                self.upload(run, image);
            }
        }
    }

    fn on_started(&mut self, kind: WorkflowKind, run: RunId, result: Result<()>) {
        match (kind, result) {
            (WorkflowKind::WirelessJoin, Err(e)) => {
                warn!("{kind} request failed, keep polling: {e:#}");
            }
            (WorkflowKind::WiredJoin, Ok(())) => {
                if self.poller_mut(kind).activate(run) {
                    self.schedule_tick(kind, run);
                } else {
                    debug!("discarding stale {kind} start response");
                }
            }
            (WorkflowKind::WiredJoin, Err(e)) => {
                if !self.poller(kind).is_current(run) {
                    debug!("discarding stale {kind} start failure");
                    return;
                }

                error!("failed to start {kind}: {e:#}");
                self.stop_kind(kind);
                self.fail(kind, FailureReason::Transport(format!("{e:#}")));
            }
            _ => {}
        }
    }

    fn interval(&self, kind: WorkflowKind) -> Option<Duration> {
        match kind {
            WorkflowKind::WirelessJoin => Some(self.config.wireless_interval),
            WorkflowKind::WiredJoin => Some(self.config.wired_interval),
            WorkflowKind::FirmwareUpdate => None,
        }
    }

    fn schedule_tick(&mut self, kind: WorkflowKind, run: RunId) {
        let Some(delay) = self.interval(kind) else {
            return;
        };

        let scheduled = self.pollers[kind.index()].schedule(
            run,
            &self.scheduler,
            delay,
            Message::Tick { kind, run },
        );

        if !scheduled {
            debug!("{kind} tick not scheduled (run {run})");
        }
    }

    fn on_tick(&mut self, kind: WorkflowKind, run: RunId) {
        if !self.poller_mut(kind).begin_tick(run) {
            debug!("discarding stale {kind} tick");
            return;
        }

        self.poll_status(kind, run);
    }

    fn poll_status(&self, kind: WorkflowKind, run: RunId) {
        self.request(
            move |device| async move { read_status(&*device, kind).await },
            move |result| Message::Status { kind, run, result },
        );
    }

    fn on_status(&mut self, kind: WorkflowKind, run: RunId, result: Result<DeviceStatus>) {
        if !self.poller_mut(kind).finish_tick(run) {
            debug!("discarding stale {kind} status");
            return;
        }

        match result {
            Ok(status) => {
                self.emit_status(kind, status.label());
                self.conclude(kind, run, status);
            }
            Err(e) if kind == WorkflowKind::FirmwareUpdate && self.firmware.final_poll_issued => {
                error!("failed to read {kind} status after upload: {e:#}");
                self.stop_kind(kind);
                self.fail(kind, FailureReason::Transport(format!("{e:#}")));
            }
            Err(e) => {
                warn!("failed to poll {kind} status: {e:#}");
                self.continue_polling(kind, run);
            }
        }
    }

    /// Issue the next tick for a workflow whose last status was not terminal
    pub(super) fn continue_polling(&mut self, kind: WorkflowKind, run: RunId) {
        if kind != WorkflowKind::FirmwareUpdate {
            self.schedule_tick(kind, run);
            return;
        }

        if self.firmware.final_poll_queued {
            self.final_poll(run);
        }
    }

    fn upload(&mut self, run: RunId, image: FirmwareImage) {
        let device = Arc::clone(&self.device);
        let internal = self.internal.clone();

        let task = tokio::spawn(async move {
            let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
            let upload = device.upload_firmware(image, progress_tx);
            tokio::pin!(upload);

            let result = loop {
                tokio::select! {
                    biased;
                    Some(progress) = progress_rx.recv() => {
                        let _ = internal.send(Message::UploadProgress { run, progress });
                    }
                    result = &mut upload => break result,
                }
            };

            while let Ok(progress) = progress_rx.try_recv() {
                let _ = internal.send(Message::UploadProgress { run, progress });
            }

            let _ = internal.send(Message::UploadFinished { run, result });
        });

        self.firmware.upload = Some(task.abort_handle());
    }

    fn on_upload_progress(&mut self, run: RunId, progress: UploadProgress) {
        let kind = WorkflowKind::FirmwareUpdate;
        if !self.poller(kind).is_current(run) {
            return;
        }

        self.emit(WorkflowEvent::UploadProgress {
            sent: progress.sent,
            total: progress.total,
        });

        // one poll per progress event, but never two at once
        if self.poller_mut(kind).begin_tick(run) {
            self.poll_status(kind, run);
        }
    }

    fn on_upload_finished(&mut self, run: RunId, result: Result<()>) {
        let kind = WorkflowKind::FirmwareUpdate;
        if !self.poller(kind).is_current(run) {
            debug!("discarding stale upload result");
            return;
        }

        self.firmware.upload = None;

        if let Err(e) = result {
            error!("failed to upload firmware: {e:#}");
            self.stop_kind(kind);
            self.fail(kind, FailureReason::Transport(format!("{e:#}")));
            return;
        }

        info!("firmware upload finished");

        if self.poller(kind).in_flight() {
            self.firmware.final_poll_queued = true;
        } else {
            self.final_poll(run);
        }
    }

    fn final_poll(&mut self, run: RunId) {
        let kind = WorkflowKind::FirmwareUpdate;

        if self.poller_mut(kind).begin_tick(run) {
            self.firmware.final_poll_queued = false;
            self.firmware.final_poll_issued = true;
            self.poll_status(kind, run);
        }
    }

    fn disconnect(&mut self, kind: WorkflowKind) {
        self.stop_kind(kind);

        self.request(
            move |device| async move {
                match kind {
                    WorkflowKind::WiredJoin => device.disconnect_eth().await,
                    _ => device.disconnect_wifi().await,
                }
            },
            move |result| Message::Disconnected { kind, result },
        );
    }

    fn on_disconnected(&mut self, kind: WorkflowKind, result: Result<()>) {
        match result {
            Ok(()) => {
                info!("{kind} disconnected");
                self.emit_status(kind, "Disconnected");
            }
            Err(e) => {
                error!("failed to disconnect {kind}: {e:#}");
                self.emit_status(kind, "Failed to disconnect");
            }
        }
    }
}

async fn read_status<D: DeviceClient>(device: &D, kind: WorkflowKind) -> Result<DeviceStatus> {
    let status = match kind {
        WorkflowKind::WirelessJoin => DeviceStatus::Wireless(device.wifi_connect_status().await?),
        WorkflowKind::WiredJoin => DeviceStatus::Wired(device.eth_connect_status().await?),
        WorkflowKind::FirmwareUpdate => {
            DeviceStatus::Firmware(device.ota_status().await?.ota_update_status)
        }
    };

    Ok(status)
}
