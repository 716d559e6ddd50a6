//! Device actor — one tokio task per live device.
//!
//! The task owns the device's [`DeviceState`] and processes envelopes from a
//! bounded FIFO mailbox one at a time, so commands for the same device never
//! overlap while different devices run independently. Callers talk to the
//! task through a cloneable [`DeviceHandle`].
//!
//! A worker stops when asked to, when every handle is dropped, or (for
//! on-demand devices) after an idle period. In every case it first closes the
//! mailbox and then drains what was already queued: each accepted command is
//! answered, later sends fail with `NotFound`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use fluxhub_domain::device::{Command, DeviceState, StatusReport};
use fluxhub_domain::error::{FluxHubError, NotFoundError, TimeoutError};
use fluxhub_domain::id::DeviceId;
use fluxhub_domain::time;

use crate::ports::DeviceStateStore;

type Reply = oneshot::Sender<Result<StatusReport, FluxHubError>>;

#[derive(Debug)]
enum Envelope {
    Command { command: Command, reply: Reply },
    Stop,
}

/// Cloneable address of a live device actor.
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    id: DeviceId,
    mailbox: mpsc::Sender<Envelope>,
}

impl DeviceHandle {
    /// Id of the device behind this handle.
    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// Whether the actor no longer accepts commands.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Submit `command` and wait for its result.
    ///
    /// # Errors
    ///
    /// Returns the state machine's rejection, a storage error from the
    /// persistence hook, or [`FluxHubError::NotFound`] when the actor has
    /// stopped accepting commands.
    pub async fn send(&self, command: Command) -> Result<StatusReport, FluxHubError> {
        match self.enqueue(command).await {
            Ok(pending) => pending.wait().await,
            Err(_) => Err(self.gone()),
        }
    }

    /// Queue `command` without waiting for it to run.
    ///
    /// Gives the command back when the mailbox is closed, so the caller
    /// knows it was never delivered.
    pub(crate) async fn enqueue(&self, command: Command) -> Result<PendingReply, Command> {
        let (reply, response) = oneshot::channel();
        match self.mailbox.send(Envelope::Command { command, reply }).await {
            Ok(()) => Ok(PendingReply {
                id: self.id.clone(),
                response,
            }),
            Err(_) => Err(command),
        }
    }

    fn gone(&self) -> FluxHubError {
        NotFoundError {
            id: self.id.clone(),
        }
        .into()
    }
}

/// Answer to a queued command.
#[derive(Debug)]
pub(crate) struct PendingReply {
    id: DeviceId,
    response: oneshot::Receiver<Result<StatusReport, FluxHubError>>,
}

impl PendingReply {
    /// Wait for the actor to process the command.
    pub(crate) async fn wait(self) -> Result<StatusReport, FluxHubError> {
        // The reply is only dropped unanswered when the worker was aborted.
        self.response
            .await
            .map_err(|_| FluxHubError::from(NotFoundError { id: self.id }))
            .and_then(|result| result)
    }
}

/// Tuning knobs for spawned actors.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActorOptions {
    pub mailbox_capacity: usize,
    pub idle_timeout: Option<Duration>,
}

/// A spawned actor: its handle plus the task running it.
#[derive(Debug)]
pub(crate) struct ActorSlot {
    handle: DeviceHandle,
    task: JoinHandle<()>,
}

impl ActorSlot {
    /// Spawn an actor for device `id` starting from `state`.
    pub(crate) fn spawn<S>(
        id: DeviceId,
        state: DeviceState,
        store: Arc<S>,
        options: ActorOptions,
    ) -> Self
    where
        S: DeviceStateStore + 'static,
    {
        let (sender, receiver) = mpsc::channel(options.mailbox_capacity.max(1));
        let worker = DeviceWorker {
            id: id.clone(),
            state,
            store,
            idle_timeout: options.idle_timeout,
        };
        let task = tokio::spawn(worker.run(receiver));
        Self {
            handle: DeviceHandle {
                id,
                mailbox: sender,
            },
            task,
        }
    }

    pub(crate) fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    /// Handle to the actor, unless it has stopped accepting commands.
    pub(crate) fn live_handle(&self) -> Option<DeviceHandle> {
        (!self.handle.is_closed()).then(|| self.handle.clone())
    }

    /// Wait until the worker task has finished.
    pub(crate) async fn join(self) {
        let _ = self.task.await;
    }

    /// Ask the worker to stop after draining its mailbox, waiting at most
    /// `timeout`. The worker is aborted when the wait runs out.
    ///
    /// # Errors
    ///
    /// Returns [`FluxHubError::Timeout`] when the worker had to be aborted.
    pub(crate) async fn stop(self, timeout: Duration) -> Result<(), FluxHubError> {
        let Self { handle, mut task } = self;
        let graceful = async {
            // A closed mailbox means the worker is already on its way out.
            let _ = handle.mailbox.send(Envelope::Stop).await;
            let _ = (&mut task).await;
        };
        if tokio::time::timeout(timeout, graceful).await.is_err() {
            task.abort();
            tracing::warn!(device_id = %handle.id, ?timeout, "device did not stop in time, aborted");
            return Err(TimeoutError {
                id: handle.id,
                after: timeout,
            }
            .into());
        }
        Ok(())
    }
}

/// Stop every slot concurrently, each bounded by `timeout`.
pub(crate) async fn stop_all(slots: Vec<ActorSlot>, timeout: Duration) {
    let stops: Vec<_> = slots
        .into_iter()
        .map(|slot| tokio::spawn(slot.stop(timeout)))
        .collect();
    for stop in stops {
        if let Ok(Err(err)) = stop.await {
            tracing::warn!(error = %err, "device shutdown incomplete");
        }
    }
}

struct DeviceWorker<S> {
    id: DeviceId,
    state: DeviceState,
    store: Arc<S>,
    idle_timeout: Option<Duration>,
}

impl<S: DeviceStateStore> DeviceWorker<S> {
    async fn run(mut self, mut mailbox: mpsc::Receiver<Envelope>) {
        tracing::debug!(device_id = %self.id, status = %self.state.status, "device actor started");

        loop {
            let next = match self.idle_timeout {
                Some(idle) => match tokio::time::timeout(idle, mailbox.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::debug!(device_id = %self.id, "device idle, deactivating");
                        break;
                    }
                },
                None => mailbox.recv().await,
            };
            match next {
                Some(Envelope::Command { command, reply }) => {
                    let _ = reply.send(self.handle(command).await);
                }
                Some(Envelope::Stop) | None => break,
            }
        }

        mailbox.close();
        while let Some(envelope) = mailbox.recv().await {
            if let Envelope::Command { command, reply } = envelope {
                let _ = reply.send(self.handle(command).await);
            }
        }

        tracing::debug!(device_id = %self.id, "device actor stopped");
    }

    async fn handle(&mut self, command: Command) -> Result<StatusReport, FluxHubError> {
        let now = time::now();
        let next = match self.state.transition(command, now) {
            Ok(next) => next,
            Err(rejection) => {
                tracing::debug!(device_id = %self.id, %rejection, "command rejected");
                return Err(rejection.into());
            }
        };

        if command.is_mutating() {
            self.store.save(&self.id, &next).await?;
            self.state = next;
            tracing::info!(
                device_id = %self.id,
                command = %command.kind(),
                status = %next.status,
                "device updated"
            );
        }

        Ok(self.state.report(&self.id, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_store::{InMemoryStateStore, NoopStateStore};
    use fluxhub_domain::device::DeviceStatus;
    use std::future::Future;

    const OPTIONS: ActorOptions = ActorOptions {
        mailbox_capacity: 8,
        idle_timeout: None,
    };

    fn id(raw: &str) -> DeviceId {
        raw.parse().unwrap()
    }

    struct FailingStore;

    impl DeviceStateStore for FailingStore {
        fn save(
            &self,
            _id: &DeviceId,
            _state: &DeviceState,
        ) -> impl Future<Output = Result<(), FluxHubError>> + Send {
            async { Err(FluxHubError::Storage("disk on fire".into())) }
        }

        fn load(
            &self,
            _id: &DeviceId,
        ) -> impl Future<Output = Result<Option<DeviceState>, FluxHubError>> + Send {
            async { Ok(None) }
        }

        fn delete(&self, _id: &DeviceId) -> impl Future<Output = Result<(), FluxHubError>> + Send {
            async { Ok(()) }
        }
    }

    #[tokio::test]
    async fn should_report_running_after_start() {
        let slot = ActorSlot::spawn(id("a"), DeviceState::default(), Arc::new(NoopStateStore), OPTIONS);
        let handle = slot.handle().clone();

        handle.send(Command::Start).await.unwrap();
        let report = handle.send(Command::ReportStatus).await.unwrap();

        assert_eq!(report.id, id("a"));
        assert_eq!(report.status, DeviceStatus::Running);
        assert_eq!(report.flux_capacitance, 1);
        assert!((report.gravitational_integrity - 1.0).abs() < f64::EPSILON);
        assert!(report.uptime < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn should_return_rejection_and_keep_serving() {
        let slot = ActorSlot::spawn(id("a"), DeviceState::default(), Arc::new(NoopStateStore), OPTIONS);
        let handle = slot.handle().clone();

        let result = handle.send(Command::Pause).await;
        assert!(matches!(result, Err(FluxHubError::InvalidTransition(_))));

        let report = handle.send(Command::ReportStatus).await.unwrap();
        assert_eq!(report.status, DeviceStatus::Stopped);
    }

    #[tokio::test]
    async fn should_save_state_before_acknowledging() {
        let store = Arc::new(InMemoryStateStore::new());
        let slot = ActorSlot::spawn(id("a"), DeviceState::default(), Arc::clone(&store), OPTIONS);

        slot.handle().send(Command::Start).await.unwrap();

        let saved = store.get(&id("a")).unwrap();
        assert_eq!(saved.status, DeviceStatus::Running);
    }

    #[tokio::test]
    async fn should_not_save_on_report_status() {
        let store = Arc::new(InMemoryStateStore::new());
        let slot = ActorSlot::spawn(id("a"), DeviceState::default(), Arc::clone(&store), OPTIONS);

        slot.handle().send(Command::ReportStatus).await.unwrap();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn should_leave_state_unchanged_when_save_fails() {
        let slot = ActorSlot::spawn(id("a"), DeviceState::default(), Arc::new(FailingStore), OPTIONS);
        let handle = slot.handle().clone();

        let result = handle.send(Command::Start).await;
        assert!(matches!(result, Err(FluxHubError::Storage(_))));

        let report = handle.send(Command::ReportStatus).await.unwrap();
        assert_eq!(report.status, DeviceStatus::Stopped);
    }

    #[tokio::test]
    async fn should_process_queued_commands_before_stopping() {
        let slot = ActorSlot::spawn(id("a"), DeviceState::default(), Arc::new(NoopStateStore), OPTIONS);
        let handle = slot.handle().clone();

        let start = handle.enqueue(Command::Start).await.unwrap();
        let flux = handle
            .enqueue(Command::SetFluxCapacitance { farads: 88 })
            .await
            .unwrap();

        slot.stop(Duration::from_secs(5)).await.unwrap();

        assert_eq!(start.wait().await.unwrap().status, DeviceStatus::Running);
        assert_eq!(flux.wait().await.unwrap().flux_capacitance, 88);
        assert!(handle.is_closed());
        assert!(matches!(
            handle.send(Command::ReportStatus).await,
            Err(FluxHubError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn should_give_command_back_when_mailbox_closed() {
        let slot = ActorSlot::spawn(id("a"), DeviceState::default(), Arc::new(NoopStateStore), OPTIONS);
        let handle = slot.handle().clone();
        slot.stop(Duration::from_secs(5)).await.unwrap();

        let returned = handle.enqueue(Command::Resume).await.unwrap_err();
        assert_eq!(returned, Command::Resume);
    }

    #[tokio::test]
    async fn should_deactivate_after_idle_timeout() {
        let options = ActorOptions {
            idle_timeout: Some(Duration::from_millis(20)),
            ..OPTIONS
        };
        let slot = ActorSlot::spawn(id("a"), DeviceState::default(), Arc::new(NoopStateStore), options);
        let handle = slot.handle().clone();
        assert!(slot.live_handle().is_some());

        slot.join().await;

        assert!(handle.is_closed());
    }
}
